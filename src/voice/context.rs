//! ContextStore - short-term conversational memory.
//!
//! Keyed by `(tenant[, user])`. A context is created lazily on first write,
//! merged on every interaction and lives until `clear_context` or process exit.
//!
//! The read-merge-write of every mutation happens under a single write lock,
//! so concurrent updates for the same key never lose writes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use voice_ops_types::{
    ContextUpdate, EntityRef, HistoryEntry, VoiceContext, MAX_HISTORY_ENTRIES,
};

/// Number of turns included in summaries and forwarded context payloads
pub const SUMMARY_TURNS: usize = 5;

/// Default character budget for `get_history_summary`
pub const DEFAULT_SUMMARY_LENGTH: usize = 500;

/// Key of one stored context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub tenant_id: String,
    pub user_id: Option<String>,
}

impl ContextKey {
    pub fn new(tenant_id: &str, user_id: Option<&str>) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            user_id: user_id.map(str::to_string),
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user_id {
            Some(user) => write!(f, "{}:{}", self.tenant_id, user),
            None => f.write_str(&self.tenant_id),
        }
    }
}

/// Shared, lock-guarded map of conversational contexts.
#[derive(Clone, Default)]
pub struct ContextStore {
    contexts: Arc<RwLock<HashMap<ContextKey, VoiceContext>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored context, or an empty one if nothing was written yet
    pub async fn get_context(&self, tenant_id: &str, user_id: Option<&str>) -> VoiceContext {
        let key = ContextKey::new(tenant_id, user_id);
        self.contexts
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    /// Shallow-merge `update` into the stored context and return the result
    pub async fn update_context(
        &self,
        tenant_id: &str,
        update: ContextUpdate,
        user_id: Option<&str>,
    ) -> VoiceContext {
        let key = ContextKey::new(tenant_id, user_id);
        let mut contexts = self.contexts.write().await;
        let context = contexts.entry(key).or_default();
        merge_context(context, update);
        context.clone()
    }

    /// Append a turn, evicting the oldest once the window is full
    pub async fn add_to_history(
        &self,
        tenant_id: &str,
        role: &str,
        content: &str,
        user_id: Option<&str>,
    ) -> VoiceContext {
        let key = ContextKey::new(tenant_id, user_id);
        let entry = HistoryEntry {
            role: role.to_string(),
            content: content.to_string(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        };

        let mut contexts = self.contexts.write().await;
        let context = contexts.entry(key).or_default();
        push_history(&mut context.conversation_history, entry);
        context.clone()
    }

    /// Record `entity` as the last of its type and the current focus
    pub async fn record_entity(
        &self,
        tenant_id: &str,
        entity: EntityRef,
        user_id: Option<&str>,
    ) -> VoiceContext {
        tracing::debug!(
            tenant_id,
            entity_type = %entity.entity_type,
            entity_id = %entity.id,
            "Recording voice context focus"
        );
        self.update_context(tenant_id, ContextUpdate::focus(entity), user_id)
            .await
    }

    /// Drop the stored context. Returns whether anything was removed.
    pub async fn clear_context(&self, tenant_id: &str, user_id: Option<&str>) -> bool {
        let key = ContextKey::new(tenant_id, user_id);
        self.contexts.write().await.remove(&key).is_some()
    }
}

/// Apply a partial update: every `Some` field overwrites.
pub fn merge_context(context: &mut VoiceContext, update: ContextUpdate) {
    if let Some(id) = update.last_job_id {
        context.last_job_id = Some(id);
    }
    if let Some(id) = update.last_contact_id {
        context.last_contact_id = Some(id);
    }
    if let Some(id) = update.last_conversation_id {
        context.last_conversation_id = Some(id);
    }
    if let Some(id) = update.last_invoice_id {
        context.last_invoice_id = Some(id);
    }
    if let Some(entity) = update.current_entity {
        context.current_entity = Some(entity);
    }
    if let Some(mut history) = update.conversation_history {
        if history.len() > MAX_HISTORY_ENTRIES {
            history.drain(..history.len() - MAX_HISTORY_ENTRIES);
        }
        context.conversation_history = history;
    }
}

fn push_history(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    history.push(entry);
    while history.len() > MAX_HISTORY_ENTRIES {
        history.remove(0);
    }
}

/// Last few turns as `role: content` lines, truncated to `max_length` chars
/// with a trailing ellipsis.
pub fn get_history_summary(context: &VoiceContext, max_length: usize) -> String {
    let history = &context.conversation_history;
    if history.is_empty() {
        return String::new();
    }

    let start = history.len().saturating_sub(SUMMARY_TURNS);
    let summary = history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n");

    if summary.chars().count() > max_length {
        let truncated: String = summary.chars().take(max_length).collect();
        format!("{}...", truncated)
    } else {
        summary
    }
}

/// Context forwarded to the interpretation service when the client sends none.
pub fn context_payload(context: &VoiceContext) -> serde_json::Value {
    let start = context
        .conversation_history
        .len()
        .saturating_sub(SUMMARY_TURNS);
    let history: Vec<serde_json::Value> = context.conversation_history[start..]
        .iter()
        .map(|turn| serde_json::json!({"role": turn.role, "content": turn.content}))
        .collect();

    let mut payload = serde_json::json!({
        "lastJobId": context.last_job_id,
        "lastContactId": context.last_contact_id,
        "lastConversationId": context.last_conversation_id,
        "lastInvoiceId": context.last_invoice_id,
        "conversationHistory": history,
    });
    if let Some(entity) = &context.current_entity {
        payload["currentEntity"] = serde_json::to_value(entity).unwrap_or_default();
    }
    payload
}
