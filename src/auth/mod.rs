//! OAuth2 authorization-code session lifecycle.

pub mod error;
pub mod exchange;
pub mod guard;
pub mod redirect;
pub mod request;
pub mod service;
pub mod session;
pub mod state;
pub mod store;
pub mod token_endpoint;

pub use error::AuthError;
pub use exchange::TokenExchanger;
pub use guard::{FreshTokens, SessionGuard};
pub use redirect::{
    AuthorizationErrorKind, AuthorizationResult, RedirectEvent, RedirectHandler, RedirectOutcome,
    RedirectStatus,
};
pub use request::{AuthorizationRequest, PendingAuthorization, UserAgent};
pub use service::AuthService;
pub use session::{AuthorizationFailure, Session};
pub use state::{Capabilities, SessionState};
pub use store::{FileSessionStore, SessionStore, SessionStoreConfig};
pub use token_endpoint::{TokenEndpoint, TokenRequest, TokenResponse};
