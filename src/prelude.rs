//! Convenience re-exports for common use.

pub use crate::error::{Result, TaskLeaseError};
pub use crate::auth::{
    AuthError, AuthService, Capabilities, FileSessionStore, FreshTokens, RedirectEvent,
    RedirectOutcome, Session, SessionGuard, SessionStore, SessionStoreConfig, UserAgent,
};
pub use crate::config::{ClientConfig, LoginHintSource, ManagedConfig, WatchedManagedConfig};
pub use crate::flow::{make_api_call, ApiCallReport};
pub use crate::queue::{QueueConfig, TaskOutcome, TaskQueueClient};
