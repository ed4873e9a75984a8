//! Client for the remote interpretation service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use voice_ops_types::InterpretationRequest;

use crate::config::VoiceConfig;
use crate::error::VoiceResult;

/// Raw reply: upstream status plus its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterReply {
    pub status: u16,
    pub body: Value,
}

impl InterpreterReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Forwards a transcript to the interpretation service.
#[async_trait]
pub trait InterpretationClient: Send + Sync {
    /// Non-success upstream statuses are returned as a reply, not an error.
    /// Errors are transport or decoding failures only.
    async fn interpret(
        &self,
        bearer_token: &str,
        request: &InterpretationRequest,
    ) -> VoiceResult<InterpreterReply>;
}

/// reqwest implementation.
pub struct HttpInterpreter {
    http: Client,
    url: String,
}

impl HttpInterpreter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> VoiceResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn from_config(config: &VoiceConfig) -> VoiceResult<Self> {
        Self::new(config.interpreter_url.clone(), config.http_timeout)
    }
}

#[async_trait]
impl InterpretationClient for HttpInterpreter {
    async fn interpret(
        &self,
        bearer_token: &str,
        request: &InterpretationRequest,
    ) -> VoiceResult<InterpreterReply> {
        tracing::debug!(
            tenant_id = %request.tenant_id,
            url = %self.url,
            "Forwarding transcription to interpretation service"
        );

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(bearer_token)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(InterpreterReply {
            status,
            body: decode_body(&text),
        })
    }
}

/// JSON bodies pass through; anything else is wrapped as `{error: <text>}`.
pub fn decode_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::json!({ "error": text }))
}
