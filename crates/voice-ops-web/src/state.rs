//! Shared application state
//!
//! Everything the routes share is built once here from `VoiceConfig`: the
//! context and selection stores, the token cache, the command store and the
//! gateway wired to the real interpretation service.

use std::sync::Arc;

use anyhow::{Context, Result};
use voice_ops::api::VoiceAppState;
use voice_ops::auth::{AdminTokenIssuer, TokenCache};
use voice_ops::dispatch::{CommandDispatcher, InMemoryCommandStore};
use voice_ops::gateway::{HttpInterpreter, VoiceGateway};
use voice_ops::voice::{ContextStore, SelectionStore};
use voice_ops::VoiceConfig;

/// Shared application state for the web server
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<VoiceConfig>,
    pub voice: VoiceAppState,
}

impl AppState {
    pub fn from_config(config: VoiceConfig) -> Result<Self> {
        let issuer = AdminTokenIssuer::from_config(&config)
            .context("Failed to create token issuer client")?;
        let interpreter = HttpInterpreter::from_config(&config)
            .context("Failed to create interpretation client")?;

        if config.service_account_admin_key.is_none() {
            tracing::warn!(
                "SERVICE_ACCOUNT_ADMIN_KEY not set - voice commands will fail to authenticate"
            );
        }

        let store = Arc::new(InMemoryCommandStore::new(config.push_capacity));
        let dispatcher = CommandDispatcher::new(store, config.dispatch_mode);

        let gateway = VoiceGateway::new(
            Arc::new(TokenCache::new(Arc::new(issuer))),
            Arc::new(interpreter),
            ContextStore::new(),
        )
        .with_dispatcher(dispatcher.clone());

        Ok(Self {
            voice: VoiceAppState::new(gateway, SelectionStore::new(), dispatcher),
            config: Arc::new(config),
        })
    }
}
