//! TokenCache - amortizes minting the privileged service-account token.
//!
//! A cached token is reused until the current time enters a 5 minute window
//! before its expiry; then a fresh one is minted. The check and the mint run
//! under one async mutex, so concurrent callers share a single mint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::VoiceConfig;
use crate::error::{CredentialError, CredentialResult};

/// Refresh when less than this much lifetime remains
pub const REFRESH_BUFFER_MS: i64 = 5 * 60 * 1000;

/// A minted credential and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountToken {
    pub token: String,
    pub expires_at_ms: i64,
}

impl ServiceAccountToken {
    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms.saturating_sub(REFRESH_BUFFER_MS)
    }
}

/// Mints service-account tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn mint(&self) -> CredentialResult<ServiceAccountToken>;
}

/// Cached token shared by all gateway requests.
pub struct TokenCache {
    issuer: Arc<dyn TokenIssuer>,
    cached: Mutex<Option<ServiceAccountToken>>,
}

impl TokenCache {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            issuer,
            cached: Mutex::new(None),
        }
    }

    /// Current token, minting a fresh one when missing or near expiry.
    pub async fn get_token(&self) -> CredentialResult<String> {
        let mut cached = self.cached.lock().await;
        let now_ms = chrono::Utc::now().timestamp_millis();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh_at(now_ms)) {
            return Ok(token.token.clone());
        }

        tracing::debug!("Minting service account token");
        let fresh = self.issuer.mint().await.map_err(|e| {
            tracing::error!(error = %e, "Service account token mint failed");
            e
        })?;
        tracing::info!(expires_at_ms = fresh.expires_at_ms, "Service account token refreshed");

        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drop the cached token; the next call mints.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

/// Mints tokens through the administrative issuance endpoint.
pub struct AdminTokenIssuer {
    http: Client,
    url: String,
    service_account_id: String,
    admin_key: Option<String>,
}

impl AdminTokenIssuer {
    pub fn new(
        url: impl Into<String>,
        service_account_id: impl Into<String>,
        admin_key: Option<String>,
        timeout: Duration,
    ) -> CredentialResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CredentialError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
            service_account_id: service_account_id.into(),
            admin_key,
        })
    }

    pub fn from_config(config: &VoiceConfig) -> CredentialResult<Self> {
        Self::new(
            config.token_issuer_url.clone(),
            config.service_account_id.clone(),
            config.service_account_admin_key.clone(),
            config.http_timeout,
        )
    }
}

#[async_trait]
impl TokenIssuer for AdminTokenIssuer {
    async fn mint(&self) -> CredentialResult<ServiceAccountToken> {
        let admin_key = self.admin_key.as_deref().ok_or_else(|| {
            CredentialError::NotConfigured("SERVICE_ACCOUNT_ADMIN_KEY is not set".to_string())
        })?;

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(admin_key)
            .json(&serde_json::json!({ "serviceAccountId": self.service_account_id }))
            .send()
            .await
            .map_err(|e| CredentialError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = body.chars().take(200).collect::<String>();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CredentialError::Rejected {
                    status: status.as_u16(),
                    message,
                },
                _ => CredentialError::Issuer {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;
        parse_token_response(&body, chrono::Utc::now().timestamp_millis())
    }
}

/// Accepts `{token | access_token, expiresAt (epoch ms) | expires_in (s)}`.
pub fn parse_token_response(body: &Value, now_ms: i64) -> CredentialResult<ServiceAccountToken> {
    let token = body
        .get("token")
        .or_else(|| body.get("access_token"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CredentialError::Malformed("response carries no token".to_string()))?;

    let expires_at_ms = if let Some(at) = body.get("expiresAt").and_then(Value::as_i64) {
        at
    } else if let Some(secs) = body.get("expires_in").and_then(Value::as_i64) {
        secs.checked_mul(1000)
            .and_then(|ms| now_ms.checked_add(ms))
            .ok_or_else(|| CredentialError::Malformed(format!("expires_in out of range: {}", secs)))?
    } else {
        return Err(CredentialError::Malformed(
            "response carries no expiry".to_string(),
        ));
    };

    Ok(ServiceAccountToken {
        token: token.to_string(),
        expires_at_ms,
    })
}
