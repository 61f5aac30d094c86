//! Host-facing operation behind the "call API" action.

use crate::auth::SessionGuard;
use crate::error::TaskLeaseError;
use crate::queue::{TaskOutcome, TaskQueueClient, NO_TASK_AVAILABLE, REQUEST_FAILED};

/// What the host should display after an API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCallReport {
    /// Payload text, or the "no task available" sentinel.
    pub text: String,
    /// Short status line (e.g. `request complete`, `request failed [..]`).
    pub message: String,
    /// `None` when no token could be obtained and the queue was never called.
    pub outcome: Option<TaskOutcome>,
    /// The user has to sign in again before another call can succeed.
    pub requires_authorization: bool,
}

impl From<TaskOutcome> for ApiCallReport {
    fn from(outcome: TaskOutcome) -> Self {
        Self {
            text: outcome.text().to_string(),
            message: outcome.message(),
            outcome: Some(outcome),
            requires_authorization: false,
        }
    }
}

/// Lease and consume one task with a guaranteed-fresh token.
///
/// Concurrent calls are not deduplicated; the host must not trigger a second
/// call while one is in flight if that matters to it.
pub async fn make_api_call(guard: &SessionGuard, queue: &TaskQueueClient) -> ApiCallReport {
    guard
        .with_fresh_token(|tokens| async move {
            match tokens {
                Ok(tokens) => {
                    ApiCallReport::from(queue.fetch_and_consume_task(&tokens.access_token).await)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "no fresh token for API call");
                    let message = format!("{REQUEST_FAILED} [{err}]");
                    ApiCallReport {
                        text: NO_TASK_AVAILABLE.to_string(),
                        message,
                        outcome: None,
                        requires_authorization: TaskLeaseError::from(err)
                            .requires_authorization(),
                    }
                }
            }
        })
        .await
}
