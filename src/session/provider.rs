//! Identity provider implementations

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::{AuthError, Credentials, IdentityProvider, Principal};

/// Configuration for the hosted identity provider
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL of the identity provider (e.g., "https://auth.example.com")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090/auth".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Hosted identity provider over REST
pub struct HttpIdentityProvider {
    client: Client,
    config: IdentityConfig,
}

impl HttpIdentityProvider {
    pub fn new(config: IdentityConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let body = SignInRequest {
            username: &credentials.username,
            password: &credentials.password,
        };

        let response = self
            .client
            .post(self.url("sign-in"))
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status.is_success() {
            let session: SignInResponse = response.json().await?;
            return Ok(Principal {
                user_id: session.user_id,
                username: credentials.username.clone(),
                access_token: session.access_token,
            });
        }

        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AuthError::Rejected(message))
            }
            _ => Err(AuthError::ApiError {
                status: status.as_u16(),
                message,
            }),
        }
    }

    async fn sign_out(&self, principal: &Principal) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.url("sign-out"))
            .bearer_auth(&principal.access_token)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        // An expired token is as good as signed out
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(AuthError::ApiError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }
}

fn map_request_error(e: reqwest::Error) -> AuthError {
    if e.is_connect() || e.is_timeout() {
        AuthError::Unavailable
    } else {
        AuthError::Request(e)
    }
}

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    user_id: String,
    access_token: String,
}

/// Offline identity provider
///
/// Accepts any non-blank username and password. The user id is derived from
/// the username so the same user sees the same expenses across sign-ins.
#[derive(Debug, Default)]
pub struct LocalIdentityProvider;

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let username = credentials.username.trim();
        if username.is_empty() {
            return Err(AuthError::Rejected("username is required".to_string()));
        }
        if credentials.password.is_empty() {
            return Err(AuthError::Rejected("password is required".to_string()));
        }

        Ok(Principal {
            user_id: format!("local:{}", username.to_lowercase()),
            username: username.to_string(),
            access_token: Uuid::new_v4().to_string(),
        })
    }

    async fn sign_out(&self, _principal: &Principal) -> Result<(), AuthError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_user_id_is_stable() {
        let provider = LocalIdentityProvider::new();

        let first = provider
            .sign_in(&Credentials::new("Alice", "pw"))
            .await
            .unwrap();
        let second = provider
            .sign_in(&Credentials::new(" alice ", "other"))
            .await
            .unwrap();

        assert_eq!(first.user_id, "local:alice");
        assert_eq!(first.user_id, second.user_id);
        assert_ne!(first.access_token, second.access_token);
    }

    #[tokio::test]
    async fn test_local_rejects_blank_credentials() {
        let provider = LocalIdentityProvider::new();

        let result = provider.sign_in(&Credentials::new("  ", "pw")).await;
        assert!(matches!(result, Err(AuthError::Rejected(_))));

        let result = provider.sign_in(&Credentials::new("alice", "")).await;
        assert!(matches!(result, Err(AuthError::Rejected(_))));
    }

    #[test]
    fn test_http_urls() {
        let provider = HttpIdentityProvider::new(IdentityConfig {
            base_url: "https://auth.example.com/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(provider.url("sign-in"), "https://auth.example.com/sign-in");
    }

    #[tokio::test]
    async fn test_http_unreachable_is_unavailable() {
        let provider = HttpIdentityProvider::new(IdentityConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout_ms: 2_000,
        })
        .unwrap();

        let result = provider.sign_in(&Credentials::new("alice", "pw")).await;
        assert!(matches!(result, Err(AuthError::Unavailable)));
    }
}
