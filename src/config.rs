//! VoiceConfig: runtime configuration for the voice command subsystem.
//!
//! Loaded once at startup from environment variables (the web binary loads a
//! `.env` file first via dotenvy).

use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;

use crate::dispatch::DispatchMode;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PUSH_CAPACITY: usize = 256;
const DEFAULT_SERVICE_ACCOUNT: &str = "voice-automation";

/// Server-side configuration. Loaded once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceConfig {
    pub server_port: u16,
    /// Interpretation service endpoint receiving `{tenantId, transcription, context}`
    pub interpreter_url: String,
    /// Administrative endpoint minting service-account tokens
    pub token_issuer_url: String,
    /// Dedicated internal automation identity
    pub service_account_id: String,
    #[serde(skip_serializing)]
    pub service_account_admin_key: Option<String>,
    /// Applied to every outbound call (token mint and interpretation forward)
    pub http_timeout: Duration,
    pub dispatch_mode: DispatchMode,
    /// Capacity of the command insert broadcast channel
    pub push_capacity: usize,
}

impl VoiceConfig {
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("SERVER_PORT", DEFAULT_PORT),
            interpreter_url: env_string(
                "INTERPRETER_URL",
                "http://localhost:54321/functions/v1/voice-command",
            ),
            token_issuer_url: env_string(
                "TOKEN_ISSUER_URL",
                "http://localhost:54321/auth/v1/admin/service-token",
            ),
            service_account_id: env_string("SERVICE_ACCOUNT_ID", DEFAULT_SERVICE_ACCOUNT),
            service_account_admin_key: std::env::var("SERVICE_ACCOUNT_ADMIN_KEY").ok(),
            http_timeout: Duration::from_secs(env_parse(
                "VOICE_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            dispatch_mode: env_parse("VOICE_DISPATCH_MODE", DispatchMode::Broadcast),
            push_capacity: env_parse("VOICE_PUSH_CAPACITY", DEFAULT_PUSH_CAPACITY),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            interpreter_url: "http://localhost:54321/functions/v1/voice-command".to_string(),
            token_issuer_url: "http://localhost:54321/auth/v1/admin/service-token".to_string(),
            service_account_id: DEFAULT_SERVICE_ACCOUNT.to_string(),
            service_account_admin_key: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            dispatch_mode: DispatchMode::Broadcast,
            push_capacity: DEFAULT_PUSH_CAPACITY,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(v) => match v.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("Invalid value for {}: '{}', using default", key, v);
                default
            }
        },
        Err(_) => default,
    }
}
