//! VoiceGateway - orchestrates one voice turn.
//!
//! validate → token → context → forward → relay, then on success record the
//! turn in the conversational context and dispatch any navigate action the
//! interpreter asked for.

use std::sync::Arc;

use serde_json::{Map, Value};
use voice_ops_types::{
    ContextUpdate, EntityRef, EntityType, InterpretationRequest, NavigateRequest,
    VoiceCommandRequest,
};

use super::interpreter::{InterpretationClient, InterpreterReply};
use crate::auth::TokenCache;
use crate::dispatch::CommandDispatcher;
use crate::error::{VoiceError, VoiceResult};
use crate::voice::{context_payload, ContextStore};

/// Forwards transcripts to the interpretation service with service-account
/// credentials and the caller's conversational context.
#[derive(Clone)]
pub struct VoiceGateway {
    tokens: Arc<TokenCache>,
    interpreter: Arc<dyn InterpretationClient>,
    contexts: ContextStore,
    dispatcher: Option<CommandDispatcher>,
}

impl VoiceGateway {
    pub fn new(
        tokens: Arc<TokenCache>,
        interpreter: Arc<dyn InterpretationClient>,
        contexts: ContextStore,
    ) -> Self {
        Self {
            tokens,
            interpreter,
            contexts,
            dispatcher: None,
        }
    }

    /// Dispatch `navigate` actions returned by the interpreter
    pub fn with_dispatcher(mut self, dispatcher: CommandDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    /// Handle one transcript. Success is `{success: true, ...upstream}`.
    pub async fn handle(&self, request: VoiceCommandRequest) -> VoiceResult<Value> {
        let tenant_id = required(request.tenant_id.as_deref(), "tenantId")?;
        let transcription = required(request.transcription.as_deref(), "transcription")?;
        let user_id = request.user_id.as_deref().filter(|u| !u.trim().is_empty());

        let token = self.tokens.get_token().await?;

        let context = match request.context {
            Some(context) => context,
            None => context_payload(&self.contexts.get_context(tenant_id, user_id).await),
        };

        let forward = InterpretationRequest {
            tenant_id: tenant_id.to_string(),
            transcription: transcription.to_string(),
            context,
        };
        let reply = self.interpreter.interpret(&token, &forward).await?;

        if !reply.is_success() {
            tracing::warn!(
                tenant_id,
                status = reply.status,
                "Interpretation service returned an error"
            );
            return Err(VoiceError::Upstream {
                status: reply.status,
                body: reply.body,
            });
        }

        tracing::info!(tenant_id, "Voice command interpreted");
        let mut response = success_body(reply);

        self.remember_turn(tenant_id, user_id, transcription, &response)
            .await;
        self.dispatch_navigate_action(tenant_id, &mut response).await;

        Ok(Value::Object(response))
    }

    async fn remember_turn(
        &self,
        tenant_id: &str,
        user_id: Option<&str>,
        transcription: &str,
        response: &Map<String, Value>,
    ) {
        self.contexts
            .add_to_history(tenant_id, "user", transcription, user_id)
            .await;
        if let Some(answer) = assistant_text(response) {
            self.contexts
                .add_to_history(tenant_id, "assistant", answer, user_id)
                .await;
        }

        let update = focus_update(response);
        if update != ContextUpdate::default() {
            self.contexts.update_context(tenant_id, update, user_id).await;
        }
    }

    async fn dispatch_navigate_action(&self, tenant_id: &str, response: &mut Map<String, Value>) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        if response.get("action").and_then(Value::as_str) != Some("navigate")
            || response.contains_key("commandId")
        {
            return;
        }
        let Some(page) = response.get("page").and_then(Value::as_str) else {
            return;
        };

        let request = NavigateRequest {
            tenant_id: tenant_id.to_string(),
            page: page.to_string(),
            job_id: string_field(response, "jobId"),
            contact_id: string_field(response, "contactId"),
        };
        match dispatcher.dispatch_navigation(&request).await {
            Ok(navigated) => {
                response.insert("path".into(), Value::String(navigated.path));
                response.insert(
                    "commandId".into(),
                    Value::String(navigated.command_id.to_string()),
                );
            }
            Err(e) => {
                tracing::warn!(tenant_id, page, error = %e, "Navigate action not dispatched");
            }
        }
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> VoiceResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| VoiceError::Validation(format!("{} is required", field)))
}

/// `{success: true}` overlaid with the upstream fields.
fn success_body(reply: InterpreterReply) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    match reply.body {
        Value::Object(fields) => body.extend(fields),
        Value::Null => {}
        other => {
            body.insert("result".into(), other);
        }
    }
    body
}

fn assistant_text(response: &Map<String, Value>) -> Option<&str> {
    ["response", "message"]
        .iter()
        .find_map(|key| response.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

fn string_field(response: &Map<String, Value>, key: &str) -> Option<String> {
    match response.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Entity ids the reply mentions, as `xId` or `x.id`. The first found
/// becomes the current entity.
fn focus_update(response: &Map<String, Value>) -> ContextUpdate {
    let mut update = ContextUpdate::default();
    for entity_type in EntityType::ALL {
        let name = entity_type.as_str();
        let id = string_field(response, &format!("{}Id", name)).or_else(|| {
            response
                .get(name)
                .and_then(Value::as_object)
                .and_then(|nested| string_field(nested, "id"))
        });
        let Some(id) = id else {
            continue;
        };

        if update.current_entity.is_none() {
            update.current_entity = Some(EntityRef::new(entity_type, id.clone()));
        }
        match entity_type {
            EntityType::Job => update.last_job_id = Some(id),
            EntityType::Contact => update.last_contact_id = Some(id),
            EntityType::Conversation => update.last_conversation_id = Some(id),
            EntityType::Invoice => update.last_invoice_id = Some(id),
        }
    }
    update
}
