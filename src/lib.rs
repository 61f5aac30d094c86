//! tasklease — OAuth2 session lifecycle and a token-guarded pull task-queue client.
//!
//! A host application starts an authorization-code flow in an external user
//! agent, feeds the redirect back in, and later leases tasks from the queue
//! with a token the session guard keeps fresh.
//!
//! # Quick Start
//!
//! ```no_run
//! use tasklease::prelude::*;
//!
//! # async fn example(svc: &AuthService) {
//! let queue = TaskQueueClient::new(QueueConfig::from_env());
//! let report = make_api_call(svc.guard(), &queue).await;
//! println!("{}: {}", report.message, report.text);
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod flow;
pub mod prelude;
pub mod queue;
