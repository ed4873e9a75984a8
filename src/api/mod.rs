//! HTTP surface (feature `server`)
//!
//! - `voice_routes`: the gateway plus context, selection, date and route helpers
//! - `command_routes`: the navigation command queue and its SSE push channel

pub mod command_routes;
pub mod voice_routes;

use axum::{extract::rejection::JsonRejection, Json, Router};

use crate::dispatch::CommandDispatcher;
use crate::error::{VoiceError, VoiceResult};
use crate::gateway::VoiceGateway;
use crate::voice::{ContextStore, SelectionStore};

pub use command_routes::command_routes;
pub use voice_routes::voice_routes;

/// State shared by every voice and command route.
#[derive(Clone)]
pub struct VoiceAppState {
    pub gateway: VoiceGateway,
    pub contexts: ContextStore,
    pub selections: SelectionStore,
    pub dispatcher: CommandDispatcher,
}

impl VoiceAppState {
    /// The gateway and the routes share one context store
    pub fn new(gateway: VoiceGateway, selections: SelectionStore, dispatcher: CommandDispatcher) -> Self {
        Self {
            contexts: gateway.contexts().clone(),
            gateway,
            selections,
            dispatcher,
        }
    }
}

/// Unwrap a JSON body; a malformed body becomes a 400 with an `{error}` body.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> VoiceResult<T> {
    body.map(|Json(value)| value)
        .map_err(|e| VoiceError::Validation(e.body_text()))
}

/// Every voice-ops route, ready to merge into an application router.
pub fn router(state: VoiceAppState) -> Router {
    Router::new()
        .merge(voice_routes(state.clone()))
        .merge(command_routes(state))
}
