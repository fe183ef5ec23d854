//! Exchanges the long-lived API key for a short-lived bearer token.
use std::time::Duration;

use anyhow::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::error::UpstreamError;

const API_KEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
const DEFAULT_LIFETIME_SECS: i64 = 3600;
// Refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    api_key: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, token_url: &str, api_key: &str) -> Self {
        Self {
            http,
            token_url: token_url.to_string(),
            api_key: api_key.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, exchanging the API key for a new
    /// one when the cached token is missing or about to expire.
    pub async fn token(&self) -> Result<String, Error> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Utc::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn exchange(&self) -> Result<CachedToken, Error> {
        tracing::debug!("Requesting access token from {}", self.token_url);
        let res = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", API_KEY_GRANT_TYPE),
                ("apikey", self.api_key.as_str()),
            ])
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::error!("Token exchange rejected with {}", status);
            return Err(UpstreamError::TokenExchange { status, body: text }.into());
        }

        let resp: TokenResponse = serde_json::from_str(&text)?;
        let lifetime = resp.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS);
        let now = Utc::now();
        // Lifetimes chrono can't represent fall back to the default
        let secs = lifetime.saturating_sub(EXPIRY_MARGIN_SECS).max(0);
        let refresh_at = TimeDelta::try_seconds(secs)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or_else(|| {
                tracing::warn!("Ignoring out of range token lifetime {}", lifetime);
                now + TimeDelta::seconds(DEFAULT_LIFETIME_SECS - EXPIRY_MARGIN_SECS)
            });

        Ok(CachedToken {
            value: resp.access_token,
            refresh_at,
        })
    }
}
