//! End-to-end submit/poll flows against a scripted transport.

use bytes::Bytes;
use reqpoll_core::{
    CancelFlag, Context, Error, ErrorKind, HttpSend, PollOutcome, Poller, Result, RetryPolicy,
    Signer, StatusVocabulary, TaskResult,
};
use reqpoll_visual::{
    ImagePayload, RequestSigner, StaticCredentialProvider, TaskClient, TaskEndpoint,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    script: Mutex<VecDeque<(u16, String)>>,
    seen: Mutex<Vec<http::request::Parts>>,
}

/// HttpSend that replays a scripted list of (status, body) responses and
/// records every request it saw.
#[derive(Debug, Clone, Default)]
struct ScriptedHttpSend {
    inner: Arc<Inner>,
}

impl ScriptedHttpSend {
    fn push(&self, status: u16, body: &str) {
        self.inner
            .script
            .lock()
            .unwrap()
            .push_back((status, body.to_string()));
    }

    fn seen(&self) -> Vec<http::request::Parts> {
        std::mem::take(&mut self.inner.seen.lock().unwrap())
    }

    fn request_count(&self) -> usize {
        self.inner.seen.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl HttpSend for ScriptedHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let (parts, _) = req.into_parts();
        self.inner.seen.lock().unwrap().push(parts);

        let (status, body) = self
            .inner
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::unexpected("scripted transport exhausted"))?;
        Ok(http::Response::builder()
            .status(status)
            .body(Bytes::from(body))
            .expect("response must build"))
    }
}

fn client(http: &ScriptedHttpSend) -> TaskClient {
    let _ = env_logger::builder().is_test(true).try_init();

    let ctx = Context::new().with_http_send(http.clone());
    let signer = Signer::new(
        ctx.clone(),
        StaticCredentialProvider::new("AKIDEXAMPLE", "SECRETEXAMPLE"),
        RequestSigner::new("cv", "cn-north-1"),
    );
    TaskClient::new(
        ctx,
        signer,
        TaskEndpoint::sync2async("https://visual.example.com", "seededit_v3.0"),
    )
    .with_retry(RetryPolicy::new(3, Duration::from_millis(1), 2.0))
}

fn poller(max_attempts: usize) -> Poller {
    Poller::new(
        StatusVocabulary::sync2async(),
        Duration::from_millis(1),
        max_attempts,
    )
}

fn ok_body(data: serde_json::Value) -> String {
    json!({"code": 10000, "message": "Success", "data": data}).to_string()
}

#[tokio::test]
async fn test_submit_then_poll_to_url_result() {
    let http = ScriptedHttpSend::default();
    http.push(200, &ok_body(json!({"task_id": "t-100"})));
    http.push(200, &ok_body(json!({"status": "in_queue"})));
    http.push(200, &ok_body(json!({"status": "generating"})));
    http.push(
        200,
        &ok_body(json!({"status": "done", "image_urls": [" `http://x/y.png` "]})),
    );

    let client = client(&http);
    let task_id = client
        .submit_task(json!({"prompt": "red clothes"}))
        .await
        .expect("submit must succeed");
    assert_eq!(task_id, "t-100");

    let outcome = client
        .poll_task(&poller(30), &task_id, &CancelFlag::new())
        .await
        .expect("poll must succeed");

    match outcome {
        PollOutcome::Completed(state) => {
            assert_eq!(state.status, "done");
            assert_eq!(
                state.result,
                Some(TaskResult::Urls(vec!["http://x/y.png".to_string()]))
            );
        }
        other => panic!("expected completion, got {other:?}"),
    }

    // Every request went out signed, with fresh auth material attached.
    let seen = http.seen();
    assert_eq!(seen.len(), 4);
    for parts in &seen {
        let auth = parts.headers[http::header::AUTHORIZATION]
            .to_str()
            .expect("must be ascii");
        assert!(auth.starts_with("HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(parts.headers.contains_key("x-date"));
        assert!(parts.headers.contains_key("x-content-sha256"));
    }
    assert!(seen[0]
        .uri
        .to_string()
        .contains("Action=CVSync2AsyncSubmitTask"));
    assert!(seen[1]
        .uri
        .to_string()
        .contains("Action=CVSync2AsyncGetResult"));
}

#[tokio::test]
async fn test_inline_result_bytes_are_decoded() {
    let http = ScriptedHttpSend::default();
    http.push(200, &ok_body(json!({"task_id": "t-101"})));
    http.push(
        200,
        &ok_body(json!({
            "status": "done",
            "binary_data_base64": [reqpoll_core::hash::base64_encode(b"png bytes")],
        })),
    );

    let client = client(&http);
    let task_id = client.submit_task(json!({})).await.expect("must submit");
    let outcome = client
        .poll_task(&poller(30), &task_id, &CancelFlag::new())
        .await
        .expect("poll must succeed");

    match outcome {
        PollOutcome::Completed(state) => {
            assert_eq!(state.result, Some(TaskResult::Bytes(b"png bytes".to_vec())));
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_provider_failure_code_is_not_retried() {
    let http = ScriptedHttpSend::default();
    http.push(
        200,
        &json!({"code": 50429, "message": "Access Denied"}).to_string(),
    );

    let err = client(&http)
        .submit_task(json!({"prompt": "x"}))
        .await
        .expect_err("provider code must fail");
    assert_eq!(err.kind(), ErrorKind::Provider);
    assert_eq!(err.to_string(), "Access Denied");
    assert_eq!(http.request_count(), 1);
}

#[tokio::test]
async fn test_transient_http_failure_is_retried() {
    let http = ScriptedHttpSend::default();
    http.push(503, "upstream busy");
    http.push(200, &ok_body(json!({"task_id": "t-102"})));

    let task_id = client(&http)
        .submit_task(json!({}))
        .await
        .expect("second attempt must succeed");
    assert_eq!(task_id, "t-102");
    assert_eq!(http.request_count(), 2);
}

#[tokio::test]
async fn test_exhausted_retries_surface_last_response() {
    let http = ScriptedHttpSend::default();
    for _ in 0..3 {
        http.push(502, "bad gateway");
    }

    let err = client(&http)
        .submit_task(json!({}))
        .await
        .expect_err("must exhaust retries");
    assert_eq!(err.kind(), ErrorKind::TransientNetwork);
    assert!(err.to_string().contains("502"));
    assert!(err.to_string().contains("bad gateway"));
    assert_eq!(http.request_count(), 3);
}

#[tokio::test]
async fn test_invalid_image_fails_before_any_request() {
    let http = ScriptedHttpSend::default();

    let image = ImagePayload {
        width: 4096,
        height: 512,
        bytes: vec![0u8; 64],
    };
    let err = client(&http)
        .submit_image_task(&image, json!({"prompt": "x"}))
        .await
        .expect_err("ratio 8.0 must fail");
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(http.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_budget_exhaustion_returns_task_id() {
    let http = ScriptedHttpSend::default();
    http.push(200, &ok_body(json!({"task_id": "t-103"})));
    for _ in 0..5 {
        http.push(200, &ok_body(json!({"status": "in_queue"})));
    }

    let client = client(&http);
    let task_id = client.submit_task(json!({})).await.expect("must submit");
    let outcome = client
        .poll_task(&poller(5), &task_id, &CancelFlag::new())
        .await
        .expect("timeout is not an error");

    match outcome {
        PollOutcome::TimedOut {
            task_id,
            attempts,
            last_status,
        } => {
            assert_eq!(task_id, "t-103");
            assert_eq!(attempts, 5);
            assert_eq!(last_status.as_deref(), Some("in_queue"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}
