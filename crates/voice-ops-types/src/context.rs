//! Conversational context types
//!
//! `VoiceContext` is the short-term memory kept per tenant (and optionally per
//! user) between voice turns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of turns retained in `VoiceContext::conversation_history`.
pub const MAX_HISTORY_ENTRIES: usize = 10;

/// Kinds of entity a voice command can refer back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Job,
    Contact,
    Conversation,
    Invoice,
}

impl EntityType {
    /// All entity types, in resolution order.
    pub const ALL: [EntityType; 4] = [
        EntityType::Job,
        EntityType::Contact,
        EntityType::Conversation,
        EntityType::Invoice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Job => "job",
            EntityType::Contact => "contact",
            EntityType::Conversation => "conversation",
            EntityType::Invoice => "invoice",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete entity: `{type, id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self {
            entity_type,
            id: id.into(),
        }
    }
}

/// One turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    /// Epoch milliseconds at which the turn was recorded
    pub timestamp_ms: i64,
}

/// Short-term conversational memory for one `(tenant[, user])` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_invoice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_entity: Option<EntityRef>,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
}

impl VoiceContext {
    /// The most recent id recorded for an entity type.
    pub fn last_id(&self, entity_type: EntityType) -> Option<&str> {
        match entity_type {
            EntityType::Job => self.last_job_id.as_deref(),
            EntityType::Contact => self.last_contact_id.as_deref(),
            EntityType::Conversation => self.last_conversation_id.as_deref(),
            EntityType::Invoice => self.last_invoice_id.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == VoiceContext::default()
    }
}

/// Partial update merged into a stored `VoiceContext`.
///
/// Every `Some` field overwrites the stored value; `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUpdate {
    #[serde(default)]
    pub last_job_id: Option<String>,
    #[serde(default)]
    pub last_contact_id: Option<String>,
    #[serde(default)]
    pub last_conversation_id: Option<String>,
    #[serde(default)]
    pub last_invoice_id: Option<String>,
    #[serde(default)]
    pub current_entity: Option<EntityRef>,
    #[serde(default)]
    pub conversation_history: Option<Vec<HistoryEntry>>,
}

impl ContextUpdate {
    /// Update that records `entity` as both the last-of-its-type and the
    /// current entity.
    pub fn focus(entity: EntityRef) -> Self {
        let mut update = ContextUpdate::default();
        let id = Some(entity.id.clone());
        match entity.entity_type {
            EntityType::Job => update.last_job_id = id,
            EntityType::Contact => update.last_contact_id = id,
            EntityType::Conversation => update.last_conversation_id = id,
            EntityType::Invoice => update.last_invoice_id = id,
        }
        update.current_entity = Some(entity);
        update
    }
}
