//! Public profile lookup
//!
//! Reads an account's creation time from the X (Twitter) v2 users endpoint.
//! The primary host is tried first and the legacy mirror once after any
//! failure. Lookups never fail the analysis: every problem is logged and
//! yields `None`.

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::config::ProfileConfig;
use crate::error::{AppError, Result};

const MAX_HANDLE_LEN: usize = 15;

#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Account creation time in epoch milliseconds, if it can be found.
    async fn created_at(&self, handle: &str) -> Option<i64>;
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    created_at: Option<String>,
}

pub struct XProfileClient {
    client: reqwest::Client,
    bearer_token: Option<String>,
    bases: [String; 2],
    timeout: Duration,
}

impl XProfileClient {
    pub fn new(client: reqwest::Client, config: &ProfileConfig) -> Self {
        Self {
            client,
            bearer_token: config.bearer_token.clone().filter(|t| !t.is_empty()),
            bases: [
                config.primary_base.trim_end_matches('/').to_string(),
                config.mirror_base.trim_end_matches('/').to_string(),
            ],
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }

    async fn fetch(&self, base: &str, handle: &str, token: &str) -> Result<i64> {
        let url = format!("{}/2/users/by/username/{}", base, handle);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("user.fields", "created_at")])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "profile lookup failed ({})",
                status
            )));
        }

        let envelope: UserEnvelope = response.json().await?;
        let created_at = envelope
            .data
            .and_then(|d| d.created_at)
            .ok_or_else(|| AppError::NotFound(format!("no created_at for @{}", handle)))?;

        let parsed = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| AppError::Serialization(format!("bad created_at {}: {}", created_at, e)))?;
        Ok(parsed.timestamp_millis())
    }
}

#[async_trait]
impl ProfileLookup for XProfileClient {
    async fn created_at(&self, handle: &str) -> Option<i64> {
        let Some(token) = self.bearer_token.as_deref() else {
            debug!("No profile bearer token configured, skipping lookup");
            return None;
        };
        let handle = normalize_handle(handle)?;

        for base in &self.bases {
            match self.fetch(base, &handle, token).await {
                Ok(ts) => {
                    debug!(%base, handle = %handle, created_at_ms = ts, "Profile creation time found");
                    return Some(ts);
                }
                Err(e) => warn!(%base, handle = %handle, error = %e, "Profile lookup failed"),
            }
        }
        None
    }
}

/// Strips a leading `@` and rejects anything that is not a valid handle.
pub fn normalize_handle(raw: &str) -> Option<String> {
    let handle = raw.trim().trim_start_matches('@');
    let valid = !handle.is_empty()
        && handle.len() <= MAX_HANDLE_LEN
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| handle.to_string())
}
