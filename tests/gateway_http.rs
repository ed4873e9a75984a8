//! HTTP-level tests for the voice gateway, helper routes and command queue.
//!
//! The interpretation service and token issuer are replaced with in-process
//! stubs; everything else is the real router.

#![cfg(feature = "server")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;
use voice_ops::api::{router, VoiceAppState};
use voice_ops::auth::{ServiceAccountToken, TokenCache, TokenIssuer};
use voice_ops::dispatch::{CommandDispatcher, CommandStore, DispatchMode, InMemoryCommandStore};
use voice_ops::error::{CredentialError, CredentialResult, VoiceResult};
use voice_ops::gateway::{InterpretationClient, InterpreterReply, VoiceGateway};
use voice_ops::voice::{ContextStore, SelectionStore};
use voice_ops_types::InterpretationRequest;

// ── Stubs ──────────────────────────────────────────────────────

struct StubIssuer {
    mints: AtomicUsize,
    reject: bool,
}

#[async_trait]
impl TokenIssuer for StubIssuer {
    async fn mint(&self) -> CredentialResult<ServiceAccountToken> {
        if self.reject {
            return Err(CredentialError::Rejected {
                status: 401,
                message: "invalid admin key".into(),
            });
        }
        let n = self.mints.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ServiceAccountToken {
            token: format!("svc-token-{}", n),
            expires_at_ms: chrono::Utc::now().timestamp_millis() + 60 * 60 * 1000,
        })
    }
}

/// Replies with a fixed status/body and records every forwarded call.
struct StubInterpreter {
    reply: InterpreterReply,
    calls: Mutex<Vec<(String, InterpretationRequest)>>,
}

#[async_trait]
impl InterpretationClient for StubInterpreter {
    async fn interpret(
        &self,
        bearer_token: &str,
        request: &InterpretationRequest,
    ) -> VoiceResult<InterpreterReply> {
        self.calls
            .lock()
            .await
            .push((bearer_token.to_string(), request.clone()));
        Ok(self.reply.clone())
    }
}

struct TestApp {
    app: axum::Router,
    issuer: Arc<StubIssuer>,
    interpreter: Arc<StubInterpreter>,
    store: Arc<InMemoryCommandStore>,
    contexts: ContextStore,
}

fn build_test_app(reply: InterpreterReply, reject_credentials: bool) -> TestApp {
    let issuer = Arc::new(StubIssuer {
        mints: AtomicUsize::new(0),
        reject: reject_credentials,
    });
    let interpreter = Arc::new(StubInterpreter {
        reply,
        calls: Mutex::new(Vec::new()),
    });
    let store = Arc::new(InMemoryCommandStore::default());
    let dispatcher = CommandDispatcher::new(store.clone(), DispatchMode::Broadcast);
    let contexts = ContextStore::new();

    let gateway = VoiceGateway::new(
        Arc::new(TokenCache::new(issuer.clone())),
        interpreter.clone(),
        contexts.clone(),
    )
    .with_dispatcher(dispatcher.clone());

    let state = VoiceAppState::new(gateway, SelectionStore::new(), dispatcher);
    TestApp {
        app: router(state),
        issuer,
        interpreter,
        store,
        contexts,
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ── Gateway ────────────────────────────────────────────────────

#[tokio::test]
async fn missing_fields_are_rejected_before_any_call() {
    let t = build_test_app(InterpreterReply::ok(json!({})), false);

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/voice-command",
        Some(json!({"transcription": "show my jobs"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tenantId is required");

    let (status, _) = send(
        &t.app,
        "POST",
        "/api/voice-command",
        Some(json!({"tenantId": "acct-1", "transcription": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(t.issuer.mints.load(Ordering::SeqCst), 0);
    assert!(t.interpreter.calls.lock().await.is_empty());
}

#[tokio::test]
async fn success_is_merged_and_remembered() {
    let t = build_test_app(
        InterpreterReply::ok(json!({"response": "Job J1 is scheduled", "jobId": "J1"})),
        false,
    );

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/voice-command",
        Some(json!({"tenantId": "acct-1", "transcription": "when is job J1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Job J1 is scheduled");

    let calls = t.interpreter.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "svc-token-1");
    assert_eq!(calls[0].1.tenant_id, "acct-1");
    assert_eq!(calls[0].1.transcription, "when is job J1");
    drop(calls);

    let ctx = t.contexts.get_context("acct-1", None).await;
    assert_eq!(ctx.last_job_id.as_deref(), Some("J1"));
    assert_eq!(ctx.conversation_history.len(), 2);
    assert_eq!(ctx.conversation_history[0].role, "user");
    assert_eq!(ctx.conversation_history[1].content, "Job J1 is scheduled");
}

#[tokio::test]
async fn stored_context_is_forwarded_when_client_sends_none() {
    let t = build_test_app(InterpreterReply::ok(json!({"response": "ok"})), false);
    t.contexts
        .record_entity(
            "acct-1",
            voice_ops_types::EntityRef::new(voice_ops_types::EntityType::Contact, "C7"),
            None,
        )
        .await;

    send(
        &t.app,
        "POST",
        "/api/voice-command",
        Some(json!({"tenantId": "acct-1", "transcription": "call them"})),
    )
    .await;
    send(
        &t.app,
        "POST",
        "/api/voice-command",
        Some(json!({"tenantId": "acct-1", "transcription": "again", "context": {"custom": 1}})),
    )
    .await;

    let calls = t.interpreter.calls.lock().await;
    assert_eq!(calls[0].1.context["lastContactId"], "C7");
    assert_eq!(calls[1].1.context, json!({"custom": 1}));
    // one mint for both requests
    assert_eq!(t.issuer.mints.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upstream_failure_is_relayed_unmodified() {
    let t = build_test_app(
        InterpreterReply {
            status: 422,
            body: json!({"error": "could not understand"}),
        },
        false,
    );

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/voice-command",
        Some(json!({"tenantId": "acct-1", "transcription": "mumble"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, json!({"error": "could not understand"}));
    assert!(t.contexts.get_context("acct-1", None).await.is_empty());
}

#[tokio::test]
async fn rejected_credentials_are_401() {
    let t = build_test_app(InterpreterReply::ok(json!({})), true);

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/voice-command",
        Some(json!({"tenantId": "acct-1", "transcription": "show jobs"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Failed to acquire service account token");
    assert!(body["details"].as_str().unwrap().contains("invalid admin key"));
    assert!(t.interpreter.calls.lock().await.is_empty());
}

#[tokio::test]
async fn navigate_action_is_dispatched() {
    let t = build_test_app(
        InterpreterReply::ok(json!({
            "response": "Opening the job",
            "action": "navigate",
            "page": "jobs",
            "jobId": "J42",
        })),
        false,
    );

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/voice-command",
        Some(json!({"tenantId": "acct-1", "transcription": "open job J42"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], "/jobs/J42");

    let pending = t.store.list_pending("acct-1").await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id.to_string(), body["commandId"].as_str().unwrap());
}

// ── Helper routes ──────────────────────────────────────────────

#[tokio::test]
async fn context_can_be_read_and_cleared() {
    let t = build_test_app(InterpreterReply::ok(json!({})), false);
    t.contexts
        .add_to_history("acct-1", "user", "hello", Some("u1"))
        .await;

    let (status, body) = send(&t.app, "GET", "/api/voice/context?tenantId=acct-1&userId=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversationHistory"][0]["content"], "hello");

    let (_, body) = send(&t.app, "DELETE", "/api/voice/context?tenantId=acct-1&userId=u1", None).await;
    assert_eq!(body["cleared"], true);

    let (_, body) = send(&t.app, "GET", "/api/voice/context?tenantId=acct-1&userId=u1", None).await;
    assert_eq!(body["conversationHistory"], json!([]));
}

#[tokio::test]
async fn selection_round_trip_over_http() {
    let t = build_test_app(InterpreterReply::ok(json!({})), false);

    let (status, body) = send(
        &t.app,
        "POST",
        "/api/voice/selection",
        Some(json!({
            "tenantId": "acct-1",
            "query": "smith",
            "items": [
                {"id": "c1", "name": "Jane Smith"},
                {"id": "c2", "name": "John Smith"},
                {"id": "c3", "name": "Ann Smith"}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["prompt"],
        "Found 3 items: Number 1: Jane Smith. Number 2: John Smith. Number 3: Ann Smith. Which one would you like?"
    );

    let (_, body) = send(
        &t.app,
        "POST",
        "/api/voice/selection/parse",
        Some(json!({"tenantId": "acct-1", "command": "the second one"})),
    )
    .await;
    assert_eq!(body["matched"], true);
    assert_eq!(body["selected"]["id"], "c2");

    let (_, body) = send(
        &t.app,
        "POST",
        "/api/voice/selection/parse",
        Some(json!({"tenantId": "acct-1", "command": "number 9"})),
    )
    .await;
    assert_eq!(body["matched"], false);
}

#[tokio::test]
async fn route_and_datetime_helpers() {
    let t = build_test_app(InterpreterReply::ok(json!({})), false);

    let (_, body) = send(
        &t.app,
        "POST",
        "/api/voice/route",
        Some(json!({"command": "open invoice inv-9"})),
    )
    .await;
    assert_eq!(body["route"], "/finance/invoices");
    assert_eq!(body["entity"]["type"], "invoice");
    assert_eq!(body["entity"]["id"], "inv-9");

    let (_, body) = send(
        &t.app,
        "POST",
        "/api/voice/parse-datetime",
        Some(json!({"text": "2025-06-01 at 2pm"})),
    )
    .await;
    assert_eq!(body["date"], "2025-06-01");
    assert_eq!(body["time"], "14:00:00");
    assert_eq!(body["iso"], "2025-06-01T14:00:00");

    let (status, body) = send(&t.app, "GET", "/api/voice/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dispatchMode"], "broadcast");
}

#[tokio::test]
async fn malformed_json_gets_an_error_body() {
    let t = build_test_app(InterpreterReply::ok(json!({})), false);

    for uri in [
        "/api/commands/navigate",
        "/api/voice/selection",
        "/api/voice/route",
    ] {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = t.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string(), "{}", uri);
    }
}

// ── Command queue ──────────────────────────────────────────────

async fn navigate(app: &axum::Router, tenant: &str, page: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/commands/navigate",
        Some(json!({"tenantId": tenant, "page": page})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["commandId"].as_str().unwrap().to_string()
}

/// Read body frames until one complete SSE event (blank-line terminated).
async fn next_event(body: &mut Body) -> String {
    let mut text = String::new();
    while !text.contains("\n\n") {
        let frame = tokio::time::timeout(Duration::from_secs(1), body.frame())
            .await
            .expect("no event within a second")
            .expect("stream ended")
            .unwrap();
        if let Ok(data) = frame.into_data() {
            text.push_str(std::str::from_utf8(&data).unwrap());
        }
    }
    text
}

#[tokio::test]
async fn stream_replays_pending_then_follows_tenant_inserts() {
    let t = build_test_app(InterpreterReply::ok(json!({})), false);

    let done = navigate(&t.app, "acct-1", "tags").await;
    send(&t.app, "POST", &format!("/api/commands/{}/executed", done), None).await;
    let early = navigate(&t.app, "acct-1", "inbox").await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/commands/stream?tenantId=acct-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    let mut body = response.into_body();

    // executed commands are not replayed
    let event = next_event(&mut body).await;
    assert!(event.contains("event: navigation"));
    assert!(event.contains(&format!("id: {}", early)));
    assert!(event.contains("\"route\":\"/inbox\""));
    assert!(!event.contains(&done));

    // another tenant's insert never shows up on this stream
    let foreign = navigate(&t.app, "acct-2", "contacts").await;
    let live = navigate(&t.app, "acct-1", "analytics").await;

    let event = next_event(&mut body).await;
    assert!(event.contains(&format!("id: {}", live)));
    assert!(!event.contains(&foreign));
}

#[tokio::test]
async fn stream_requires_tenant() {
    let t = build_test_app(InterpreterReply::ok(json!({})), false);
    let (status, body) = send(&t.app, "GET", "/api/commands/stream?tenantId=%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tenantId is required");
}

#[tokio::test]
async fn pending_list_and_idempotent_acknowledgment() {
    let t = build_test_app(InterpreterReply::ok(json!({})), false);
    let first = navigate(&t.app, "acct-1", "inbox").await;
    let second = navigate(&t.app, "acct-1", "contacts").await;
    navigate(&t.app, "acct-2", "inbox").await;

    let (status, body) = send(&t.app, "GET", "/api/commands/pending?tenantId=acct-1", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);

    let uri = format!("/api/commands/{}/executed", first);
    let (status, acked) = send(&t.app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(acked["executed"], true);
    assert!(acked["executedAt"].is_string());

    let (status, again) = send(&t.app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["executedAt"], acked["executedAt"]);

    let (_, body) = send(&t.app, "GET", "/api/commands/pending?tenantId=acct-1", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], second.as_str());

    let missing = format!("/api/commands/{}/executed", uuid::Uuid::new_v4());
    let (status, body) = send(&t.app, "POST", &missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn claim_conflicts_are_409_and_release_frees_the_command() {
    let t = build_test_app(InterpreterReply::ok(json!({})), false);
    let id = navigate(&t.app, "acct-1", "inbox").await;
    let claim = format!("/api/commands/{}/claim", id);
    let release = format!("/api/commands/{}/release", id);

    let (status, body) = send(&t.app, "POST", &claim, Some(json!({"clientId": "tab-a"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claimedBy"], "tab-a");

    let (status, body) = send(&t.app, "POST", &claim, Some(json!({"clientId": "tab-b"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("tab-a"));

    // only the holder may give the claim back
    let (status, _) = send(&t.app, "POST", &release, Some(json!({"clientId": "tab-b"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, body) = send(&t.app, "POST", &release, Some(json!({"clientId": "tab-a"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("claimedBy").is_none());

    let (status, _) = send(&t.app, "POST", &claim, Some(json!({"clientId": "tab-b"}))).await;
    assert_eq!(status, StatusCode::OK);

    send(&t.app, "POST", &format!("/api/commands/{}/executed", id), None).await;
    let (status, _) = send(&t.app, "POST", &claim, Some(json!({"clientId": "tab-b"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
