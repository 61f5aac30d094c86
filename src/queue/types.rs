use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde::Deserialize;

use super::error::QueueError;

/// Text shown when the queue had nothing to lease.
pub const NO_TASK_AVAILABLE: &str = "no task available";
pub const REQUEST_COMPLETE: &str = "request complete";
pub const REQUEST_FAILED: &str = "request failed";
const NO_DESCRIPTION: &str = "No description";

/// One leased queue item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PendingTask {
    pub id: String,
    #[serde(rename = "payloadBase64", default)]
    pub payload_base64: String,
}

impl PendingTask {
    /// Decode the base64 payload as UTF-8 text.
    pub fn decode_payload(&self) -> Result<String, QueueError> {
        let bytes = match STANDARD.decode(self.payload_base64.trim()) {
            Ok(bytes) => bytes,
            Err(_) => URL_SAFE.decode(self.payload_base64.trim())?,
        };
        Ok(String::from_utf8(bytes)?)
    }
}

/// Body of a lease call: either a (possibly empty) item list or an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaseResponse {
    #[serde(default)]
    pub items: Option<Vec<PendingTask>>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl LeaseResponse {
    /// The single task the lease granted, if any.
    pub fn first_task(&self) -> Option<&PendingTask> {
        self.items.as_ref().and_then(|items| items.first())
    }

    pub fn is_error(&self) -> bool {
        self.error.as_ref().is_some_and(|e| !e.is_null())
    }

    /// Server-provided description: `error_description`, or `error.message` for
    /// Google-style error objects.
    pub fn error_description(&self) -> Option<String> {
        if let Some(description) = &self.error_description {
            return Some(description.clone());
        }
        self.error
            .as_ref()
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    }
}

/// Result of one lease-then-delete round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A task was leased and its payload decoded.
    Consumed {
        task_id: String,
        payload: String,
        deleted: bool,
    },
    /// The lease succeeded but the queue was empty.
    NoTask,
    /// A task was leased but its payload was not valid base64/UTF-8.
    Undecodable {
        task_id: String,
        reason: String,
        deleted: bool,
    },
    /// The request failed; carries the server's description when it sent one.
    Failed { description: Option<String> },
}

impl TaskOutcome {
    /// Whether the lease itself returned a task, regardless of decoding.
    pub fn leased(&self) -> bool {
        matches!(self, Self::Consumed { .. } | Self::Undecodable { .. })
    }

    /// Payload text, or the "no task available" sentinel.
    pub fn text(&self) -> &str {
        match self {
            Self::Consumed { payload, .. } => payload,
            _ => NO_TASK_AVAILABLE,
        }
    }

    /// User-facing status line.
    pub fn message(&self) -> String {
        match self {
            Self::Consumed { .. } | Self::NoTask => REQUEST_COMPLETE.to_string(),
            Self::Undecodable { reason, .. } => format!("{REQUEST_FAILED} [{reason}]"),
            Self::Failed { description } => format!(
                "{REQUEST_FAILED} [{}]",
                description.as_deref().unwrap_or(NO_DESCRIPTION)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_standard_base64() {
        let task = PendingTask {
            id: "1".to_string(),
            payload_base64: "aGVsbG8=".to_string(),
        };
        assert_eq!(task.decode_payload().unwrap(), "hello");
    }

    #[test]
    fn decodes_url_safe_base64() {
        let task = PendingTask {
            id: "1".to_string(),
            payload_base64: "Pz8-".to_string(),
        };
        assert_eq!(task.decode_payload().unwrap(), "??>");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let task = PendingTask {
            id: "1".to_string(),
            payload_base64: STANDARD.encode([0xff, 0xfe]),
        };
        assert!(matches!(task.decode_payload(), Err(QueueError::Decode(_))));
    }

    #[test]
    fn null_items_means_no_task() {
        let resp: LeaseResponse = serde_json::from_str(r#"{"items":null}"#).unwrap();
        assert!(resp.first_task().is_none());
        assert!(!resp.is_error());
    }

    #[test]
    fn oauth_style_error_description() {
        let resp: LeaseResponse = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"token expired"}"#,
        )
        .unwrap();
        assert!(resp.is_error());
        assert_eq!(resp.error_description().as_deref(), Some("token expired"));
    }

    #[test]
    fn google_style_error_message() {
        let resp: LeaseResponse = serde_json::from_str(
            r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#,
        )
        .unwrap();
        assert_eq!(resp.error_description().as_deref(), Some("Invalid Credentials"));
    }

    #[test]
    fn messages_match_outcome() {
        assert_eq!(TaskOutcome::NoTask.message(), "request complete");
        assert_eq!(TaskOutcome::NoTask.text(), "no task available");
        assert_eq!(
            TaskOutcome::Failed {
                description: Some("token expired".to_string())
            }
            .message(),
            "request failed [token expired]"
        );
        assert_eq!(
            TaskOutcome::Failed { description: None }.message(),
            "request failed [No description]"
        );
    }

    #[test]
    fn undecodable_task_still_counts_as_leased() {
        let outcome = TaskOutcome::Undecodable {
            task_id: "7".to_string(),
            reason: "bad base64".to_string(),
            deleted: true,
        };
        assert!(outcome.leased());
        assert_eq!(outcome.text(), NO_TASK_AVAILABLE);
        assert!(!TaskOutcome::NoTask.leased());
    }
}
