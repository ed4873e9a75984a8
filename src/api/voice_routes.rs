//! Voice API Routes
//!
//! ## Endpoints
//!
//! - `POST /api/voice-command` - Forward a transcript to the interpretation service
//! - `GET /api/voice/context` - Stored conversational context
//! - `DELETE /api/voice/context` - Forget the conversational context
//! - `POST /api/voice/selection` - Enumerate ambiguous results
//! - `POST /api/voice/selection/parse` - Resolve "the second one"
//! - `POST /api/voice/parse-datetime` - "tomorrow at 2pm" → date/time
//! - `POST /api/voice/route` - Keyword route and entity extraction
//! - `GET /api/voice/health` - Liveness

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use voice_ops_types::{
    ClearContextResponse, ContextQuery, CreateSelectionRequest, CreateSelectionResponse,
    HealthResponse, ParseDateTimeRequest, ParseDateTimeResponse, ParseSelectionRequest,
    ParseSelectionResponse, RouteRequest, RouteResponse, VoiceCommandRequest, VoiceContext,
};

use super::{json_body, VoiceAppState};
use crate::error::VoiceResult;
use crate::navigation::{extract_entity_from_command, get_route_from_command};
use crate::voice::{format_selection_prompt, parse_date_time, ContextKey};

/// Create the voice routes router
pub fn voice_routes(state: VoiceAppState) -> Router {
    Router::new()
        .route("/api/voice-command", post(voice_command))
        .route(
            "/api/voice/context",
            get(get_context).delete(clear_context),
        )
        .route("/api/voice/selection", post(create_selection))
        .route("/api/voice/selection/parse", post(parse_selection))
        .route("/api/voice/parse-datetime", post(parse_datetime))
        .route("/api/voice/route", post(route_command))
        .route("/api/voice/health", get(health))
        .with_state(state)
}

fn selection_key(tenant_id: &str, user_id: Option<&str>) -> ContextKey {
    ContextKey::new(tenant_id, user_id)
}

// ============================================================================
// GATEWAY
// ============================================================================

/// POST /api/voice-command
///
/// Returns `{success: true, ...}` with the interpreter's fields, or relays
/// the interpreter's own status and body when it fails.
async fn voice_command(
    State(state): State<VoiceAppState>,
    body: Result<Json<VoiceCommandRequest>, JsonRejection>,
) -> VoiceResult<Json<Value>> {
    let request = json_body(body)?;
    let response = state.gateway.handle(request).await?;
    Ok(Json(response))
}

// ============================================================================
// CONTEXT
// ============================================================================

/// GET /api/voice/context?tenantId=&userId=
async fn get_context(
    State(state): State<VoiceAppState>,
    Query(query): Query<ContextQuery>,
) -> Json<VoiceContext> {
    Json(
        state
            .contexts
            .get_context(&query.tenant_id, query.user_id.as_deref())
            .await,
    )
}

/// DELETE /api/voice/context?tenantId=&userId=
async fn clear_context(
    State(state): State<VoiceAppState>,
    Query(query): Query<ContextQuery>,
) -> Json<ClearContextResponse> {
    let cleared = state
        .contexts
        .clear_context(&query.tenant_id, query.user_id.as_deref())
        .await;
    Json(ClearContextResponse { cleared })
}

// ============================================================================
// SELECTION
// ============================================================================

/// POST /api/voice/selection
async fn create_selection(
    State(state): State<VoiceAppState>,
    body: Result<Json<CreateSelectionRequest>, JsonRejection>,
) -> VoiceResult<Json<CreateSelectionResponse>> {
    let request = json_body(body)?;
    let key = selection_key(&request.tenant_id, request.user_id.as_deref());
    let selection = state
        .selections
        .create_selection_state(
            &key,
            &request.items,
            &request.query,
            request.name_field.as_deref(),
        )
        .await;
    let prompt = format_selection_prompt(&selection);

    Ok(Json(CreateSelectionResponse {
        state: selection,
        prompt,
    }))
}

/// POST /api/voice/selection/parse
async fn parse_selection(
    State(state): State<VoiceAppState>,
    body: Result<Json<ParseSelectionRequest>, JsonRejection>,
) -> VoiceResult<Json<ParseSelectionResponse>> {
    let request = json_body(body)?;
    let key = selection_key(&request.tenant_id, request.user_id.as_deref());
    let selected = state.selections.parse(&key, &request.command).await;

    Ok(Json(ParseSelectionResponse {
        matched: selected.is_some(),
        selected,
    }))
}

// ============================================================================
// PARSING HELPERS
// ============================================================================

/// POST /api/voice/parse-datetime
async fn parse_datetime(
    body: Result<Json<ParseDateTimeRequest>, JsonRejection>,
) -> VoiceResult<Json<ParseDateTimeResponse>> {
    let request = json_body(body)?;
    let parts = parse_date_time(&request.text);
    let iso = parts.to_iso8601();
    Ok(Json(ParseDateTimeResponse {
        date: parts.date,
        time: parts.time,
        iso,
    }))
}

/// POST /api/voice/route
async fn route_command(
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> VoiceResult<Json<RouteResponse>> {
    let request = json_body(body)?;
    Ok(Json(RouteResponse {
        route: get_route_from_command(&request.command).map(str::to_string),
        entity: extract_entity_from_command(&request.command),
    }))
}

/// GET /api/voice/health
async fn health(State(state): State<VoiceAppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dispatch_mode: state.dispatcher.mode().to_string(),
    })
}
