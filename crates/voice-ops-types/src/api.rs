//! HTTP request/response bodies
//!
//! Required fields that callers may omit are modelled as `Option` so the
//! handlers can answer with a 400 and a readable error instead of a
//! deserialization rejection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::EntityType;
use crate::selection::{SelectionItem, SelectionState};

// ============================================================================
// ERRORS
// ============================================================================

/// Error body used by every endpoint: `{error, details?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            error: error.into(),
            details: Some(details),
        }
    }
}

// ============================================================================
// VOICE COMMAND GATEWAY
// ============================================================================

/// POST /api/voice-command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCommandRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    /// Client-supplied context; the stored context is sent when absent
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Body forwarded to the interpretation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationRequest {
    pub tenant_id: String,
    pub transcription: String,
    pub context: serde_json::Value,
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Query string selecting a context key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextQuery {
    pub tenant_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Query string selecting a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantQuery {
    pub tenant_id: String,
}

/// DELETE /api/voice/context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearContextResponse {
    pub cleared: bool,
}

// ============================================================================
// SELECTION
// ============================================================================

/// POST /api/voice/selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSelectionRequest {
    pub tenant_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub query: String,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub name_field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSelectionResponse {
    pub state: SelectionState,
    /// Spoken-style prompt enumerating the candidates
    pub prompt: String,
}

/// POST /api/voice/selection/parse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseSelectionRequest {
    pub tenant_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseSelectionResponse {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<SelectionItem>,
}

// ============================================================================
// DATE / TIME
// ============================================================================

/// POST /api/voice/parse-datetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseDateTimeRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDateTimeResponse {
    pub date: String,
    pub time: String,
    /// `<date>T<time>`, naive local
    pub iso: String,
}

// ============================================================================
// NAVIGATION
// ============================================================================

/// Entity named inside a free-text command; both fields empty when none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
}

impl EntityReference {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.entity_type.is_none()
    }
}

/// POST /api/voice/route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub entity: EntityReference,
}

/// POST /api/commands/navigate: the backend "navigate" tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateRequest {
    pub tenant_id: String,
    pub page: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResponse {
    pub success: bool,
    pub message: String,
    pub path: String,
    pub command_id: Uuid,
}

/// POST /api/commands/:id/claim and /api/commands/:id/release
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub client_id: String,
}

// ============================================================================
// HEALTH
// ============================================================================

/// GET /api/voice/health
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dispatch_mode: String,
}
