use super::error::QueueError;
use super::types::{LeaseResponse, TaskOutcome};
use super::QueueConfig;
use crate::auth::token_endpoint::shared_client;

/// Leases at most one task per call and deletes it once leased.
///
/// Every call is a single attempt; failures are reported, not retried.
#[derive(Debug, Clone)]
pub struct TaskQueueClient {
    client: reqwest::Client,
    config: QueueConfig,
}

impl TaskQueueClient {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            client: shared_client(),
            config,
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Lease one task, decode its payload and delete it.
    ///
    /// Never fails: transport, parse and decode problems are logged and folded
    /// into the returned [`TaskOutcome`].
    pub async fn fetch_and_consume_task(&self, access_token: &str) -> TaskOutcome {
        let lease = match self.lease(access_token).await {
            Ok(lease) => lease,
            Err(err) => {
                tracing::warn!(error = %err, "task lease request failed");
                return TaskOutcome::Failed { description: None };
            }
        };

        if lease.is_error() {
            let description = lease.error_description();
            tracing::warn!(description = ?description, "task queue returned an error");
            return TaskOutcome::Failed { description };
        }

        let Some(task) = lease.first_task() else {
            tracing::info!("there is no task to lease");
            return TaskOutcome::NoTask;
        };

        let decoded = task.decode_payload();
        let deleted = match self.delete(access_token, &task.id).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(task_id = %task.id, error = %err, "failed to delete leased task");
                false
            }
        };

        match decoded {
            Ok(payload) => TaskOutcome::Consumed {
                task_id: task.id.clone(),
                payload,
                deleted,
            },
            Err(err) => {
                tracing::warn!(task_id = %task.id, error = %err, "leased task payload is undecodable");
                TaskOutcome::Undecodable {
                    task_id: task.id.clone(),
                    reason: err.to_string(),
                    deleted,
                }
            }
        }
    }

    /// Issue the lease call (`numTasks=1`) and parse its body.
    ///
    /// Error bodies the server explains (`{"error": ...}`) come back as `Ok`
    /// so the caller can surface the description.
    pub async fn lease(&self, access_token: &str) -> Result<LeaseResponse, QueueError> {
        let lease_secs = self.config.lease_secs().to_string();
        let resp = self
            .client
            .post(self.config.lease_url())
            .query(&[("leaseSecs", lease_secs.as_str()), ("numTasks", "1")])
            .bearer_auth(access_token)
            .body(Vec::new())
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!(status = status.as_u16(), body = %body, "task queue lease response");

        match serde_json::from_str::<LeaseResponse>(&body) {
            Ok(lease) if status.is_success() || lease.is_error() => Ok(lease),
            Ok(_) => Err(QueueError::Http {
                status: status.as_u16(),
                body,
            }),
            Err(_) if !status.is_success() => Err(QueueError::Http {
                status: status.as_u16(),
                body,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a leased task by id.
    pub async fn delete(&self, access_token: &str, task_id: &str) -> Result<(), QueueError> {
        let resp = self
            .client
            .delete(self.config.delete_url(task_id))
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QueueError::Http {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(task_id = %task_id, "deleted leased task");
        Ok(())
    }
}
