//! Authenticated Session
//!
//! Nothing of the application is built until a principal is signed in.
//!
//! - **IdentityProvider**: the external sign-in/sign-out capability
//! - **SessionGate**: holds the signed-in principal, or nothing
//! - **HttpIdentityProvider**: hosted identity provider over REST
//! - **LocalIdentityProvider**: offline provider paired with the in-process service

mod gate;
mod provider;

pub use gate::{SessionGate, SessionState};
pub use provider::{HttpIdentityProvider, IdentityConfig, LocalIdentityProvider};

use async_trait::async_trait;
use thiserror::Error;

/// The signed-in user that requests are scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable user identifier; the data service stores it as `owner`
    pub user_id: String,
    /// Name the user signed in with
    pub username: String,
    /// Bearer token for the data service
    pub access_token: String,
}

/// Sign-in credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate and open a session
    async fn sign_in(&self, credentials: &Credentials) -> Result<Principal, AuthError>;

    /// Terminate the principal's session
    async fn sign_out(&self, principal: &Principal) -> Result<(), AuthError>;
}

/// Errors that can occur at the session boundary
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Sign-in rejected: {0}")]
    Rejected(String),

    #[error("Identity provider unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Identity provider error {status}: {message}")]
    ApiError { status: u16, message: String },
}
