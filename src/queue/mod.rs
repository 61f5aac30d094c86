//! Lease-then-delete client for the pull task queue.

pub mod client;
pub mod error;
pub mod types;

pub use client::TaskQueueClient;
pub use error::QueueError;
pub use types::{
    LeaseResponse, PendingTask, TaskOutcome, NO_TASK_AVAILABLE, REQUEST_COMPLETE, REQUEST_FAILED,
};

use std::time::Duration;

use bon::Builder;

pub const DEFAULT_QUEUE_BASE_URL: &str = "https://www.googleapis.com/taskqueue/v1beta2";
pub const DEFAULT_PROJECT: &str = "testcloudstorage-1470232940384";
pub const DEFAULT_QUEUE_NAME: &str = "pull-queue";
pub const DEFAULT_LEASE_SECS: u64 = 60;

/// Where the queue lives and how long a lease lasts.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tasklease::queue::QueueConfig;
///
/// let config = QueueConfig::builder()
///     .base_url("http://127.0.0.1:9000")
///     .lease(Duration::from_secs(30))
///     .build();
/// assert_eq!(config.lease_secs(), 30);
/// assert_eq!(config.delete_project(), "s~testcloudstorage-1470232940384");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct QueueConfig {
    #[builder(into, default = DEFAULT_QUEUE_BASE_URL.to_string())]
    pub base_url: String,
    #[builder(into, default = DEFAULT_PROJECT.to_string())]
    pub project: String,
    #[builder(into, default = DEFAULT_QUEUE_NAME.to_string())]
    pub queue: String,
    /// Project identifier used in delete paths; the hosted API expects `s~{project}`.
    #[builder(into)]
    pub delete_project: Option<String>,
    #[builder(default = Duration::from_secs(DEFAULT_LEASE_SECS))]
    pub lease: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl QueueConfig {
    /// Load overrides from environment variables (and `.env` if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        if let Ok(value) = std::env::var("TASKLEASE_QUEUE_BASE_URL") {
            config.base_url = value;
        }
        if let Ok(value) = std::env::var("TASKLEASE_QUEUE_PROJECT") {
            config.project = value;
        }
        if let Ok(value) = std::env::var("TASKLEASE_QUEUE_NAME") {
            config.queue = value;
        }
        if let Some(secs) = std::env::var("TASKLEASE_LEASE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.lease = Duration::from_secs(secs);
        }
        config
    }

    pub fn lease_secs(&self) -> u64 {
        self.lease.as_secs()
    }

    pub fn delete_project(&self) -> String {
        self.delete_project
            .clone()
            .unwrap_or_else(|| format!("s~{}", self.project))
    }

    fn tasks_url(&self, project: &str) -> String {
        format!(
            "{}/projects/{project}/taskqueues/{}/tasks",
            self.base_url.trim_end_matches('/'),
            self.queue
        )
    }

    pub fn lease_url(&self) -> String {
        format!("{}/lease", self.tasks_url(&self.project))
    }

    pub fn delete_url(&self, task_id: &str) -> String {
        format!("{}/{task_id}", self.tasks_url(&self.delete_project()))
    }
}
