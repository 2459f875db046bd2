//! Access Token Module
//!
//! Provides bearer tokens for the mailbox API:
//! - Static tokens handed over by the caller
//! - OAuth2 refresh-token grants with a single-writer cache

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::config::GmailConfig;
use crate::error::{AppError, Result};

/// Refresh this long before the reported expiry.
const REFRESH_SKEW_SECONDS: i64 = 60;

/// Source of bearer tokens for outgoing API calls
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current access token, refreshing it first if necessary
    async fn access_token(&self) -> Result<String>;
}

/// A token used as-is for the lifetime of a request
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken").field("token", &"***").finish()
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(AppError::Authentication("missing access token".into()));
        }
        Ok(self.token.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::seconds(REFRESH_SKEW_SECONDS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// OAuth2 refresh-token grant
///
/// The cached token lives behind an async mutex that is held across the
/// refresh call, so concurrent scans wait for one refresh and then share its
/// result instead of rotating the token in parallel.
pub struct RefreshingTokenSource {
    client: reqwest::Client,
    token_uri: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshingTokenSource {
    pub fn new(client: reqwest::Client, config: &GmailConfig, refresh_token: &str) -> Self {
        Self {
            client,
            token_uri: config.token_uri.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: refresh_token.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Seed the cache with a token the caller already holds
    pub fn with_access_token(self, access_token: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            cached: Mutex::new(Some(CachedToken {
                access_token: access_token.to_string(),
                expires_at,
            })),
            ..self
        }
    }

    async fn refresh(&self) -> Result<CachedToken> {
        if self.refresh_token.is_empty() {
            return Err(AppError::Authentication(
                "access token expired and no refresh token available".into(),
            ));
        }

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Authentication(format!("token endpoint unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Token refresh rejected");
            return Err(AppError::Authentication(format!(
                "token refresh rejected ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Authentication(format!("unreadable token response: {}", e)))?;

        debug!(expires_in = token.expires_in, "Access token refreshed");
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl TokenSource for RefreshingTokenSource {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let token = self.refresh().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}
