//! Navigation Command API Routes
//!
//! ## Endpoints
//!
//! - `POST /api/commands/navigate` - Backend "navigate" tool: write a command
//! - `GET /api/commands/stream?tenantId=` - SSE feed: pending commands, then live inserts
//! - `GET /api/commands/pending?tenantId=` - Commands not yet executed
//! - `POST /api/commands/:id/executed` - Client acknowledgment
//! - `POST /api/commands/:id/claim` - Claim before acting (claimed mode)
//! - `POST /api/commands/:id/release` - Give a claim back after a failed navigation

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::{stream, Stream, StreamExt};
use uuid::Uuid;
use voice_ops_types::{
    ClaimRequest, NavigateRequest, NavigateResponse, NavigationCommand, TenantQuery,
};

use super::{json_body, VoiceAppState};
use crate::error::{VoiceError, VoiceResult};

const KEEP_ALIVE_SECS: u64 = 15;

/// Create the command routes router
pub fn command_routes(state: VoiceAppState) -> Router {
    Router::new()
        .route("/api/commands/navigate", post(navigate))
        .route("/api/commands/stream", get(command_stream))
        .route("/api/commands/pending", get(pending_commands))
        .route("/api/commands/:id/executed", post(mark_executed))
        .route("/api/commands/:id/claim", post(claim_command))
        .route("/api/commands/:id/release", post(release_command))
        .with_state(state)
}

/// POST /api/commands/navigate
async fn navigate(
    State(state): State<VoiceAppState>,
    body: Result<Json<NavigateRequest>, JsonRejection>,
) -> VoiceResult<Json<NavigateResponse>> {
    let request = json_body(body)?;
    Ok(Json(state.dispatcher.dispatch_navigation(&request).await?))
}

/// GET /api/commands/stream?tenantId=
///
/// Subscribes first, then emits the tenant's pending commands followed by
/// live inserts, so nothing written in between is missed. Clients dedupe by
/// id and skip records already executed.
async fn command_stream(
    State(state): State<VoiceAppState>,
    Query(query): Query<TenantQuery>,
) -> VoiceResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let tenant_id = query.tenant_id.trim().to_string();
    if tenant_id.is_empty() {
        return Err(VoiceError::Validation("tenantId is required".to_string()));
    }

    let live = state.dispatcher.store().subscribe(&tenant_id).into_stream();
    let pending = state.dispatcher.pending(&tenant_id).await?;
    tracing::debug!(tenant_id = %tenant_id, pending = pending.len(), "Command stream opened");

    let events = stream::iter(pending).chain(live).map(|command| {
        let json = serde_json::to_string(&command).unwrap_or_default();
        Ok(Event::default()
            .event("navigation")
            .id(command.id.to_string())
            .data(json))
    });

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(KEEP_ALIVE_SECS))
            .text("ping"),
    ))
}

/// GET /api/commands/pending?tenantId=
async fn pending_commands(
    State(state): State<VoiceAppState>,
    Query(query): Query<TenantQuery>,
) -> VoiceResult<Json<Vec<NavigationCommand>>> {
    Ok(Json(state.dispatcher.pending(&query.tenant_id).await?))
}

/// POST /api/commands/:id/executed
///
/// Idempotent: acknowledging twice keeps the first `executedAt`.
async fn mark_executed(
    State(state): State<VoiceAppState>,
    Path(id): Path<Uuid>,
) -> VoiceResult<Json<NavigationCommand>> {
    Ok(Json(state.dispatcher.mark_executed(id).await?))
}

/// POST /api/commands/:id/claim
///
/// 409 when another client holds the claim or the command already ran.
async fn claim_command(
    State(state): State<VoiceAppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> VoiceResult<Json<NavigationCommand>> {
    let request = json_body(body)?;
    Ok(Json(state.dispatcher.claim(id, &request.client_id).await?))
}

/// POST /api/commands/:id/release
///
/// 409 when another client holds the claim.
async fn release_command(
    State(state): State<VoiceAppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> VoiceResult<Json<NavigationCommand>> {
    let request = json_body(body)?;
    Ok(Json(state.dispatcher.release(id, &request.client_id).await?))
}
