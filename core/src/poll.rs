//! Async task polling.
//!
//! A submitted generation job is driven to a terminal state by repeatedly
//! querying its status endpoint under a bounded attempt budget. Different
//! endpoints use different status vocabularies for the same terminal meaning
//! ("done" vs "succeeded", "error" vs "failed"), so classification is data
//! supplied by the caller, not a fixed set.

use crate::{Context, Error, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Canonical task status, classified from the provider's raw status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task accepted, waiting for a worker.
    InQueue,
    /// Task is being processed.
    Generating,
    /// Task finished with a result payload.
    Succeeded,
    /// Task finished with a provider-side error.
    Failed,
    /// Task id unknown to the provider.
    NotFound,
    /// Task result no longer retained by the provider.
    Expired,
}

impl TaskStatus {
    /// Whether no further transition can occur.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::InQueue | TaskStatus::Generating)
    }
}

/// Case-sensitive mapping from provider status strings to [`TaskStatus`].
///
/// Unmapped strings are treated as non-terminal: the poller logs them and
/// keeps polling rather than guessing a terminal meaning.
#[derive(Debug, Clone, Default)]
pub struct StatusVocabulary {
    map: HashMap<String, TaskStatus>,
}

impl StatusVocabulary {
    /// Create an empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a provider status string to a canonical status.
    pub fn with(mut self, raw: impl Into<String>, status: TaskStatus) -> Self {
        self.map.insert(raw.into(), status);
        self
    }

    /// Classify a raw provider status string.
    pub fn classify(&self, raw: &str) -> Option<TaskStatus> {
        self.map.get(raw).copied()
    }

    /// Vocabulary of the sync2async image endpoints:
    /// in_queue/generating/done/not_found/expired.
    pub fn sync2async() -> Self {
        Self::new()
            .with("in_queue", TaskStatus::InQueue)
            .with("generating", TaskStatus::Generating)
            .with("done", TaskStatus::Succeeded)
            .with("not_found", TaskStatus::NotFound)
            .with("expired", TaskStatus::Expired)
    }

    /// Vocabulary of the content-generation (video) endpoints:
    /// queued/running/succeeded/failed/cancelled.
    pub fn content_generation() -> Self {
        Self::new()
            .with("queued", TaskStatus::InQueue)
            .with("running", TaskStatus::Generating)
            .with("succeeded", TaskStatus::Succeeded)
            .with("failed", TaskStatus::Failed)
            .with("error", TaskStatus::Failed)
            .with("cancelled", TaskStatus::Failed)
    }
}

/// Result payload of a succeeded task.
///
/// URL lists take precedence over inline bytes when a response carries both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// Result addressed by URLs.
    Urls(Vec<String>),
    /// Result delivered inline, already base64-decoded.
    Bytes(Vec<u8>),
}

/// One observation of a remote task.
#[derive(Debug, Clone)]
pub struct TaskState {
    /// Raw provider status string, case preserved.
    pub status: String,
    /// Provider message, verbatim, when present.
    pub message: Option<String>,
    /// Result payload, present once the task succeeded.
    pub result: Option<TaskResult>,
}

/// QueryTask is implemented by service clients that can look up a task.
#[async_trait::async_trait]
pub trait QueryTask: Debug + Send + Sync + 'static {
    /// Query the remote status of the given task.
    async fn query_task(&self, ctx: &Context, task_id: &str) -> Result<TaskState>;
}

/// Outcome of a poll sequence that did not error.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The task reached a successful terminal state.
    Completed(TaskState),
    /// The attempt budget ran out before a terminal state was observed.
    ///
    /// The job may still be running server-side; the task id is returned for
    /// manual follow-up.
    TimedOut {
        /// The polled task id.
        task_id: String,
        /// Attempts performed.
        attempts: usize,
        /// Last raw status observed, if any query succeeded.
        last_status: Option<String>,
    },
    /// The caller cancelled the sequence at an attempt boundary.
    Cancelled {
        /// The polled task id.
        task_id: String,
        /// Attempts performed before cancellation.
        attempts: usize,
    },
}

/// Cooperative cancellation flag, checked at every attempt boundary.
///
/// Cloning shares the flag, so a UI can hold one end while the poll sequence
/// holds the other.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress callback, called with a monotone estimate in `[0.0, 1.0]`.
pub type ProgressFn = dyn Fn(f64) + Send + Sync;

/// Poller drives a submitted task to a terminal state under a bounded budget.
///
/// The poller holds no per-task state; concurrent poll sequences for
/// different tasks are fully independent.
#[derive(Clone)]
pub struct Poller {
    vocabulary: StatusVocabulary,
    interval: Duration,
    max_attempts: usize,
    progress: Option<Arc<ProgressFn>>,
}

impl Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("vocabulary", &self.vocabulary)
            .field("interval", &self.interval)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl Poller {
    /// Create a poller with the given vocabulary and budget.
    ///
    /// Budgets observed in practice: image edits poll 30 times every 2s,
    /// video generation 60 times every 10s.
    pub fn new(vocabulary: StatusVocabulary, interval: Duration, max_attempts: usize) -> Self {
        Self {
            vocabulary,
            interval,
            max_attempts: max_attempts.max(1),
            progress: None,
        }
    }

    /// Subscribe a progress callback.
    ///
    /// The estimate is proportional to attempts over budget and stays below
    /// 1.0 until a terminal success is observed.
    pub fn with_progress(mut self, progress: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    fn report(&self, value: f64) {
        if let Some(cb) = &self.progress {
            cb(value);
        }
    }

    /// Poll the task until terminal state, budget exhaustion, or cancellation.
    ///
    /// Failed tasks surface the provider's message verbatim as a provider
    /// error; not-found and expired tasks are non-retryable failures on first
    /// observation.
    pub async fn poll(
        &self,
        ctx: &Context,
        querier: &dyn QueryTask,
        task_id: &str,
        cancel: &CancelFlag,
    ) -> Result<PollOutcome> {
        let mut last_status = None;

        for attempt in 0..self.max_attempts {
            if cancel.is_cancelled() {
                debug!("poll of task {task_id} cancelled after {attempt} attempts");
                return Ok(PollOutcome::Cancelled {
                    task_id: task_id.to_string(),
                    attempts: attempt,
                });
            }

            self.report((0.1 + 0.9 * attempt as f64 / self.max_attempts as f64).min(0.95));

            let state = querier.query_task(ctx, task_id).await?;
            debug!(
                "task {task_id} attempt {}/{}: status {:?}",
                attempt + 1,
                self.max_attempts,
                state.status
            );
            last_status = Some(state.status.clone());

            match self.vocabulary.classify(&state.status) {
                Some(TaskStatus::Succeeded) => {
                    self.report(1.0);
                    return Ok(PollOutcome::Completed(state));
                }
                Some(TaskStatus::Failed) => {
                    let msg = state
                        .message
                        .unwrap_or_else(|| format!("task {task_id} failed"));
                    return Err(Error::provider(msg));
                }
                Some(TaskStatus::NotFound) => {
                    return Err(Error::provider(format!("task {task_id} not found")));
                }
                Some(TaskStatus::Expired) => {
                    return Err(Error::provider(format!("task {task_id} expired")));
                }
                Some(TaskStatus::InQueue) | Some(TaskStatus::Generating) => {}
                None => {
                    warn!("task {task_id}: unrecognized status {:?}", state.status);
                }
            }

            // Sleep between attempts, but let cancellation win over the wait.
            if attempt + 1 < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Ok(PollOutcome::TimedOut {
            task_id: task_id.to_string(),
            attempts: self.max_attempts,
            last_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use test_case::test_case;

    #[derive(Debug)]
    struct ScriptedQuerier {
        script: Mutex<Vec<TaskState>>,
    }

    impl ScriptedQuerier {
        fn new(statuses: &[&str]) -> Self {
            let script = statuses
                .iter()
                .rev()
                .map(|s| TaskState {
                    status: s.to_string(),
                    message: None,
                    result: None,
                })
                .collect();
            Self {
                script: Mutex::new(script),
            }
        }

        fn with_result(self, result: TaskResult) -> Self {
            {
                let mut script = self.script.lock().unwrap();
                if let Some(first) = script.first_mut() {
                    first.result = Some(result);
                }
            }
            self
        }
    }

    #[async_trait::async_trait]
    impl QueryTask for ScriptedQuerier {
        async fn query_task(&self, _: &Context, _: &str) -> Result<TaskState> {
            let mut script = self.script.lock().unwrap();
            script
                .pop()
                .ok_or_else(|| Error::unexpected("script exhausted"))
        }
    }

    fn poller(max_attempts: usize) -> Poller {
        Poller::new(
            StatusVocabulary::sync2async(),
            Duration::from_secs(2),
            max_attempts,
        )
    }

    #[test_case("done", TaskStatus::Succeeded; "done maps to succeeded")]
    #[test_case("in_queue", TaskStatus::InQueue; "in queue")]
    #[test_case("generating", TaskStatus::Generating; "generating")]
    #[test_case("not_found", TaskStatus::NotFound; "not found")]
    #[test_case("expired", TaskStatus::Expired; "expired")]
    fn test_sync2async_vocabulary(raw: &str, expected: TaskStatus) {
        assert_eq!(StatusVocabulary::sync2async().classify(raw), Some(expected));
    }

    #[test]
    fn test_vocabulary_is_case_sensitive() {
        let vocab = StatusVocabulary::content_generation();
        assert_eq!(vocab.classify("succeeded"), Some(TaskStatus::Succeeded));
        assert_eq!(vocab.classify("Succeeded"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_reaches_success() {
        let querier = ScriptedQuerier::new(&["in_queue", "generating", "done"])
            .with_result(TaskResult::Urls(vec!["http://x/y.png".to_string()]));
        let ctx = Context::new();

        let outcome = poller(30)
            .poll(&ctx, &querier, "t-1", &CancelFlag::new())
            .await
            .expect("must not error");

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
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_budget_exhaustion_is_timeout_not_error() {
        let statuses = vec!["in_queue"; 5];
        let querier = ScriptedQuerier::new(&statuses);
        let ctx = Context::new();

        let outcome = poller(5)
            .poll(&ctx, &querier, "t-2", &CancelFlag::new())
            .await
            .expect("timeout is not an error");

        match outcome {
            PollOutcome::TimedOut {
                task_id,
                attempts,
                last_status,
            } => {
                assert_eq!(task_id, "t-2");
                assert_eq!(attempts, 5);
                assert_eq!(last_status.as_deref(), Some("in_queue"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_not_found_fails_on_first_attempt() {
        let querier = ScriptedQuerier::new(&["not_found"]);
        let ctx = Context::new();

        let err = poller(30)
            .poll(&ctx, &querier, "t-3", &CancelFlag::new())
            .await
            .expect_err("not_found is a failure");
        assert_eq!(err.kind(), crate::ErrorKind::Provider);
        assert!(err.to_string().contains("t-3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failed_surfaces_provider_message() {
        let querier = ScriptedQuerier {
            script: Mutex::new(vec![TaskState {
                status: "failed".to_string(),
                message: Some("content policy violation".to_string()),
                result: None,
            }]),
        };
        let ctx = Context::new();
        let poller = Poller::new(
            StatusVocabulary::content_generation(),
            Duration::from_secs(10),
            60,
        );

        let err = poller
            .poll(&ctx, &querier, "t-4", &CancelFlag::new())
            .await
            .expect_err("failed task is an error");
        assert_eq!(err.to_string(), "content policy violation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_unrecognized_status_keeps_polling() {
        let querier = ScriptedQuerier::new(&["warming_up", "done"]);
        let ctx = Context::new();

        let outcome = poller(30)
            .poll(&ctx, &querier, "t-5", &CancelFlag::new())
            .await
            .expect("must not error");
        assert!(matches!(outcome, PollOutcome::Completed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_cancellation_at_attempt_boundary() {
        let querier = ScriptedQuerier::new(&["in_queue"; 10]);
        let ctx = Context::new();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = poller(10)
            .poll(&ctx, &querier, "t-6", &cancel)
            .await
            .expect("cancellation is not an error");
        assert!(matches!(
            outcome,
            PollOutcome::Cancelled { attempts: 0, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_monotone_and_capped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let querier = ScriptedQuerier::new(&["in_queue", "in_queue", "generating", "done"]);
        let ctx = Context::new();
        let poller = Poller::new(
            StatusVocabulary::sync2async(),
            Duration::from_secs(2),
            4,
        )
        .with_progress(move |p| sink.lock().unwrap().push(p));

        poller
            .poll(&ctx, &querier, "t-7", &CancelFlag::new())
            .await
            .expect("must not error");

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress must be monotone: {seen:?}");
        assert_eq!(*seen.last().unwrap(), 1.0);
        assert!(seen[..seen.len() - 1].iter().all(|p| *p < 1.0));
    }
}
