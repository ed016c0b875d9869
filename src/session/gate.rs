//! Session gate
//!
//! Tracks whether a principal is signed in and hands it out to whoever needs
//! to build per-principal state.

use std::sync::Arc;

use super::{AuthError, Credentials, IdentityProvider, Principal};

/// Current state of the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    SignedIn(Principal),
}

/// Blocks access to the application until sign-in succeeds
pub struct SessionGate {
    provider: Arc<dyn IdentityProvider>,
    state: SessionState,
}

impl SessionGate {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            state: SessionState::SignedOut,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn principal(&self) -> Option<&Principal> {
        match &self.state {
            SessionState::SignedIn(principal) => Some(principal),
            SessionState::SignedOut => None,
        }
    }

    /// The signed-in principal, or `NotAuthenticated`
    pub fn require(&self) -> Result<&Principal, AuthError> {
        self.principal().ok_or(AuthError::NotAuthenticated)
    }

    pub fn is_signed_in(&self) -> bool {
        self.principal().is_some()
    }

    /// Sign in through the provider
    ///
    /// On failure the gate stays signed out.
    pub async fn sign_in(&mut self, credentials: &Credentials) -> Result<&Principal, AuthError> {
        match self.provider.sign_in(credentials).await {
            Ok(principal) => {
                tracing::info!(user_id = %principal.user_id, "Signed in");
                self.state = SessionState::SignedIn(principal);
                self.require()
            }
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "Sign-in failed");
                self.state = SessionState::SignedOut;
                Err(e)
            }
        }
    }

    /// Terminate the session and return to the gate
    ///
    /// The gate is signed out afterwards even if the provider call fails.
    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        let principal = match std::mem::replace(&mut self.state, SessionState::SignedOut) {
            SessionState::SignedIn(principal) => principal,
            SessionState::SignedOut => return Ok(()),
        };

        let result = self.provider.sign_out(&principal).await;
        match &result {
            Ok(()) => tracing::info!(user_id = %principal.user_id, "Signed out"),
            Err(e) => {
                tracing::warn!(user_id = %principal.user_id, error = %e, "Sign-out call failed; session dropped locally");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LocalIdentityProvider;
    use async_trait::async_trait;

    struct FailingSignOut;

    #[async_trait]
    impl IdentityProvider for FailingSignOut {
        async fn sign_in(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
            Ok(Principal {
                user_id: credentials.username.clone(),
                username: credentials.username.clone(),
                access_token: "t".to_string(),
            })
        }

        async fn sign_out(&self, _principal: &Principal) -> Result<(), AuthError> {
            Err(AuthError::Unavailable)
        }
    }

    #[test]
    fn test_starts_signed_out() {
        let gate = SessionGate::new(Arc::new(LocalIdentityProvider::new()));
        assert_eq!(gate.state(), &SessionState::SignedOut);
        assert!(matches!(gate.require(), Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_sign_in_then_out() {
        let mut gate = SessionGate::new(Arc::new(LocalIdentityProvider::new()));

        let principal = gate
            .sign_in(&Credentials::new("alice", "secret"))
            .await
            .unwrap()
            .clone();
        assert_eq!(principal.username, "alice");
        assert_eq!(gate.require().unwrap(), &principal);

        gate.sign_out().await.unwrap();
        assert!(!gate.is_signed_in());
    }

    #[tokio::test]
    async fn test_failed_sign_in_stays_signed_out() {
        let mut gate = SessionGate::new(Arc::new(LocalIdentityProvider::new()));

        let result = gate.sign_in(&Credentials::new("alice", "")).await;
        assert!(matches!(result, Err(AuthError::Rejected(_))));
        assert!(!gate.is_signed_in());
    }

    #[tokio::test]
    async fn test_sign_out_always_returns_to_gate() {
        let mut gate = SessionGate::new(Arc::new(FailingSignOut));
        gate.sign_in(&Credentials::new("alice", "secret")).await.unwrap();

        let result = gate.sign_out().await;
        assert!(matches!(result, Err(AuthError::Unavailable)));
        assert_eq!(gate.state(), &SessionState::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_out_when_signed_out_is_noop() {
        let mut gate = SessionGate::new(Arc::new(FailingSignOut));
        assert!(gate.sign_out().await.is_ok());
    }
}
