//! End-to-end dispatch protocol: backend writes a command, a running client
//! executor picks it up, navigates, and acknowledges.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;
use voice_ops::dispatch::{
    CommandDispatcher, CommandExecutor, CommandStore, DispatchMode, InMemoryCommandStore,
    Navigator,
};
use voice_ops::error::{DispatchError, DispatchResult};
use voice_ops_types::{NavigateRequest, NavigationParams};

/// Records every route it is asked to open; optionally fails the first N.
#[derive(Default)]
struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
    failures_left: Mutex<usize>,
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn navigate(&self, route: &str, _params: &NavigationParams) -> DispatchResult<()> {
        let mut failures = self.failures_left.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(DispatchError::Navigation {
                route: route.to_string(),
                message: "client router not ready".into(),
            });
        }
        self.visited.lock().await.push(route.to_string());
        Ok(())
    }
}

fn navigate(tenant: &str, page: &str) -> NavigateRequest {
    NavigateRequest {
        tenant_id: tenant.into(),
        page: page.into(),
        job_id: None,
        contact_id: None,
    }
}

/// Poll until the command is acknowledged or a second passes.
async fn wait_executed(store: &InMemoryCommandStore, id: Uuid) -> bool {
    for _ in 0..100 {
        if store.get(id).await.map(|c| c.executed).unwrap_or(false) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn executor_waits_for_identity_then_replays_and_follows_live_inserts() {
    let store = Arc::new(InMemoryCommandStore::default());
    let dispatcher = CommandDispatcher::new(store.clone(), DispatchMode::Broadcast);
    let navigator = Arc::new(RecordingNavigator::default());

    // written before any client is connected
    let early = dispatcher
        .dispatch_navigation(&navigate("acct-1", "inbox"))
        .await
        .unwrap();

    let (identity_tx, identity_rx) = watch::channel(None);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let executor = CommandExecutor::new("tab-1", store.clone(), navigator.clone(), DispatchMode::Broadcast);
    let handle = tokio::spawn(executor.run(identity_rx, shutdown_rx));

    // nothing happens while the identity is unresolved
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(navigator.visited.lock().await.is_empty());

    identity_tx.send(Some("acct-1".to_string())).unwrap();
    assert!(wait_executed(&store, early.command_id).await);

    let live = dispatcher
        .dispatch_navigation(&navigate("acct-1", "analytics"))
        .await
        .unwrap();
    // another tenant's command is never delivered here
    let foreign = dispatcher
        .dispatch_navigation(&navigate("acct-2", "tags"))
        .await
        .unwrap();

    assert!(wait_executed(&store, live.command_id).await);
    assert!(!store.get(foreign.command_id).await.unwrap().executed);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(
        *navigator.visited.lock().await,
        vec!["/inbox".to_string(), "/analytics".to_string()]
    );
}

#[tokio::test]
async fn failed_navigation_is_redelivered_after_resubscribe() {
    let store = Arc::new(InMemoryCommandStore::default());
    let dispatcher = CommandDispatcher::new(store.clone(), DispatchMode::Broadcast);
    let navigator = Arc::new(RecordingNavigator {
        failures_left: Mutex::new(1),
        ..Default::default()
    });

    let (identity_tx, identity_rx) = watch::channel(Some("acct-1".to_string()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let executor = CommandExecutor::new("tab-1", store.clone(), navigator.clone(), DispatchMode::Broadcast);
    let handle = tokio::spawn(executor.run(identity_rx, shutdown_rx));
    tokio::time::sleep(Duration::from_millis(30)).await;

    let cmd = dispatcher
        .dispatch_navigation(&navigate("acct-1", "finance"))
        .await
        .unwrap();

    // first attempt fails and the record stays pending
    for _ in 0..100 {
        if *navigator.failures_left.lock().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*navigator.failures_left.lock().await, 0);
    assert!(store.get(cmd.command_id).await.unwrap().is_pending());

    // identity refresh re-subscribes and replays the pending record
    identity_tx.send(Some("acct-1".to_string())).unwrap();
    assert!(wait_executed(&store, cmd.command_id).await);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
    assert_eq!(*navigator.visited.lock().await, vec!["/finance/dashboard".to_string()]);
}

#[tokio::test]
async fn claimed_mode_two_clients_one_navigation() {
    let store = Arc::new(InMemoryCommandStore::default());
    let dispatcher = CommandDispatcher::new(store.clone(), DispatchMode::Claimed);
    let navigator = Arc::new(RecordingNavigator::default());

    let (_identity_tx, identity_rx) = watch::channel(Some("acct-1".to_string()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::new();
    for client in ["tab-a", "tab-b"] {
        let executor = CommandExecutor::new(client, store.clone(), navigator.clone(), DispatchMode::Claimed);
        handles.push(tokio::spawn(executor.run(identity_rx.clone(), shutdown_rx.clone())));
    }
    tokio::time::sleep(Duration::from_millis(30)).await;

    let cmd = dispatcher
        .dispatch_navigation(&navigate("acct-1", "contacts"))
        .await
        .unwrap();
    assert!(wait_executed(&store, cmd.command_id).await);
    tokio::time::sleep(Duration::from_millis(30)).await;

    shutdown_tx.send(true).unwrap();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(navigator.visited.lock().await.len(), 1);
    let record = store.get(cmd.command_id).await.unwrap();
    assert!(record.claimed_by.is_some());
}
