use crate::constants::SUCCESS_CODE;
use crate::validate::ImagePayload;
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqpoll_core::hash::{base64_decode, base64_encode};
use reqpoll_core::utils::sanitize_url;
use reqpoll_core::{
    retry_with_backoff, CancelFlag, Context, Error, PollOutcome, Poller, QueryTask, Result,
    RetryPolicy, Signer, TaskResult, TaskState,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// The submit/query action pair of one asynchronous endpoint.
#[derive(Debug, Clone)]
pub struct TaskEndpoint {
    /// Endpoint origin, e.g. `https://visual.example.com`.
    pub endpoint: String,
    /// `Action` of the submit call.
    pub submit_action: String,
    /// `Action` of the status query call.
    pub query_action: String,
    /// API `Version` sent with both calls.
    pub version: String,
    /// Model identifier sent as `req_key` in both bodies.
    pub req_key: String,
}

impl TaskEndpoint {
    /// The sync2async image endpoint pair for the given origin and model.
    pub fn sync2async(endpoint: &str, req_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            submit_action: "CVSync2AsyncSubmitTask".to_string(),
            query_action: "CVSync2AsyncGetResult".to_string(),
            version: "2022-08-31".to_string(),
            req_key: req_key.to_string(),
        }
    }
}

/// Provider response envelope: `code` 10000 is success, anything else is an
/// application-level failure even on HTTP 200.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<ResponseData>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseData {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    image_urls: Option<Vec<String>>,
    #[serde(default)]
    binary_data_base64: Option<Vec<String>>,
}

/// TaskClient submits generation jobs and looks up their status.
///
/// Each outbound call is signed fresh (new `x-date`, new signature) inside
/// the retry loop, so a retried attempt never reuses stale auth material.
#[derive(Debug, Clone)]
pub struct TaskClient {
    ctx: Context,
    signer: Signer<Credential>,
    endpoint: TaskEndpoint,
    retry: RetryPolicy,
}

impl TaskClient {
    /// Create a client for one endpoint pair.
    pub fn new(ctx: Context, signer: Signer<Credential>, endpoint: TaskEndpoint) -> Self {
        Self {
            ctx,
            signer,
            endpoint,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy applied to each network call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn call(&self, action: &str, body: &Value) -> Result<ApiResponse> {
        let uri = format!(
            "{}/?Action={}&Version={}",
            self.endpoint.endpoint, action, self.endpoint.version
        );
        let body = serde_json::to_vec(body)
            .map_err(|e| Error::unexpected("failed to serialize request body").with_source(e))?;

        retry_with_backoff(&self.retry, || {
            let uri = uri.clone();
            let body = body.clone();
            async move {
                let mut parts = http::Request::builder()
                    .method(http::Method::POST)
                    .uri(uri)
                    .body(())?
                    .into_parts()
                    .0;
                self.signer.sign(&mut parts, &body).await?;

                let req = http::Request::from_parts(parts, Bytes::from(body));
                let resp = self.ctx.http_send_checked(req).await?;

                // A garbled body on a 2xx is worth another attempt.
                serde_json::from_str::<ApiResponse>(resp.body()).map_err(|e| {
                    Error::transient_network(format!("malformed response body: {e}"))
                })
            }
        })
        .await
    }

    fn check(resp: ApiResponse) -> Result<ResponseData> {
        if resp.code != SUCCESS_CODE {
            return Err(Error::provider(resp.message.unwrap_or_else(|| {
                format!("request failed with provider code {}", resp.code)
            })));
        }
        Ok(resp.data.unwrap_or_default())
    }

    /// Submit a generation job.
    ///
    /// `body` is the caller-shaped payload; the client adds the `req_key` of
    /// its endpoint. Returns the task id to poll.
    pub async fn submit_task(&self, body: Value) -> Result<String> {
        let mut body = match body {
            Value::Object(map) => map,
            _ => return Err(Error::request_invalid("task body must be a JSON object")),
        };
        body.insert("req_key".to_string(), json!(self.endpoint.req_key));

        let resp = self.call(&self.endpoint.submit_action, &Value::Object(body)).await?;
        let data = Self::check(resp)?;

        let task_id = data
            .task_id
            .ok_or_else(|| Error::provider("submit response carries no task_id"))?;
        debug!("submitted task {task_id}");
        Ok(task_id)
    }

    /// Validate and attach an image payload, then submit.
    ///
    /// Validation happens before any network call; an oversized or distorted
    /// image never leaves the process.
    pub async fn submit_image_task(&self, image: &ImagePayload, body: Value) -> Result<String> {
        image.validate()?;

        let mut body = match body {
            Value::Object(map) => map,
            _ => return Err(Error::request_invalid("task body must be a JSON object")),
        };
        body.insert(
            "binary_data_base64".to_string(),
            json!([base64_encode(&image.bytes)]),
        );

        self.submit_task(Value::Object(body)).await
    }

    /// Query the remote state of a task once.
    pub async fn query_task_state(&self, task_id: &str) -> Result<TaskState> {
        let body = json!({
            "req_key": self.endpoint.req_key,
            "task_id": task_id,
            // Ask for URLs where the provider can serve them; URL results
            // take precedence over inline bytes.
            "req_json": "{\"return_url\":true}",
        });

        let resp = self.call(&self.endpoint.query_action, &body).await?;
        let message = resp.message.clone();
        let data = Self::check(resp)?;

        let result = extract_result(&data)?;
        Ok(TaskState {
            status: data.status.unwrap_or_default(),
            message,
            result,
        })
    }

    /// Drive a submitted task to completion with the given poller.
    pub async fn poll_task(
        &self,
        poller: &Poller,
        task_id: &str,
        cancel: &CancelFlag,
    ) -> Result<PollOutcome> {
        poller.poll(&self.ctx, self, task_id, cancel).await
    }
}

#[async_trait]
impl QueryTask for TaskClient {
    async fn query_task(&self, _: &Context, task_id: &str) -> Result<TaskState> {
        self.query_task_state(task_id).await
    }
}

fn extract_result(data: &ResponseData) -> Result<Option<TaskResult>> {
    if let Some(urls) = &data.image_urls {
        if !urls.is_empty() {
            return Ok(Some(TaskResult::Urls(
                urls.iter().map(|u| sanitize_url(u)).collect(),
            )));
        }
    }
    if let Some(blobs) = &data.binary_data_base64 {
        if let Some(first) = blobs.first() {
            return Ok(Some(TaskResult::Bytes(base64_decode(first)?)));
        }
    }
    Ok(None)
}
