//! CommandStore - durable navigation command records plus the insert feed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::Stream;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;
use voice_ops_types::NavigationCommand;

use crate::error::{DispatchError, DispatchResult};

const DEFAULT_CAPACITY: usize = 256;

/// Persistence and change feed for navigation commands.
#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Persist a new command and notify subscribers of its tenant
    async fn insert(&self, command: NavigationCommand) -> DispatchResult<NavigationCommand>;

    async fn get(&self, id: Uuid) -> DispatchResult<NavigationCommand>;

    /// Commands of a tenant not yet executed, oldest first
    async fn list_pending(&self, tenant_id: &str) -> DispatchResult<Vec<NavigationCommand>>;

    /// Flip to executed. Repeated calls keep the first `executedAt`.
    async fn mark_executed(&self, id: Uuid) -> DispatchResult<NavigationCommand>;

    /// Compare-and-set claim. The same client may re-claim.
    async fn claim(&self, id: Uuid, client_id: &str) -> DispatchResult<NavigationCommand>;

    /// Drop the claim held by `client_id` so another client can take the
    /// command. No-op when unclaimed.
    async fn release(&self, id: Uuid, client_id: &str) -> DispatchResult<NavigationCommand>;

    /// Insert events for one tenant
    fn subscribe(&self, tenant_id: &str) -> CommandSubscription;
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Inserted(NavigationCommand),
    /// The receiver fell behind and `n` inserts were dropped
    Lagged(u64),
}

/// Tenant-filtered view of the insert feed.
pub struct CommandSubscription {
    tenant_id: String,
    rx: broadcast::Receiver<NavigationCommand>,
}

impl CommandSubscription {
    pub fn new(tenant_id: impl Into<String>, rx: broadcast::Receiver<NavigationCommand>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            rx,
        }
    }

    /// Next event for this tenant. `None` once the feed is closed.
    pub async fn recv(&mut self) -> Option<SubscriptionEvent> {
        loop {
            match self.rx.recv().await {
                Ok(command) if command.tenant_id == self.tenant_id => {
                    return Some(SubscriptionEvent::Inserted(command))
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Some(SubscriptionEvent::Lagged(n))
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stream of this tenant's inserts. Lagged gaps are skipped.
    pub fn into_stream(self) -> impl Stream<Item = NavigationCommand> + Send + 'static {
        let tenant_id = self.tenant_id;
        BroadcastStream::new(self.rx).filter_map(move |result| match result {
            Ok(command) if command.tenant_id == tenant_id => Some(command),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Command stream lagged");
                None
            }
        })
    }
}

#[derive(Default)]
struct Records {
    by_id: HashMap<Uuid, NavigationCommand>,
    /// Insertion order
    order: Vec<Uuid>,
}

/// In-process command store backed by a lock-guarded map and a broadcast
/// channel.
#[derive(Clone)]
pub struct InMemoryCommandStore {
    records: Arc<RwLock<Records>>,
    tx: broadcast::Sender<NavigationCommand>,
}

impl Default for InMemoryCommandStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl InMemoryCommandStore {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            records: Arc::new(RwLock::new(Records::default())),
            tx,
        }
    }
}

#[async_trait]
impl CommandStore for InMemoryCommandStore {
    async fn insert(&self, command: NavigationCommand) -> DispatchResult<NavigationCommand> {
        {
            let mut records = self.records.write().await;
            if !records.by_id.contains_key(&command.id) {
                records.order.push(command.id);
            }
            records.by_id.insert(command.id, command.clone());
        }

        // No live subscribers is fine: the record is replayed on subscribe
        let receivers = self.tx.send(command.clone()).unwrap_or(0);
        tracing::debug!(
            command_id = %command.id,
            tenant_id = %command.tenant_id,
            route = %command.route,
            receivers,
            "Inserted navigation command"
        );
        Ok(command)
    }

    async fn get(&self, id: Uuid) -> DispatchResult<NavigationCommand> {
        self.records
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or(DispatchError::NotFound { id })
    }

    async fn list_pending(&self, tenant_id: &str) -> DispatchResult<Vec<NavigationCommand>> {
        let records = self.records.read().await;
        Ok(records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id))
            .filter(|cmd| cmd.tenant_id == tenant_id && cmd.is_pending())
            .cloned()
            .collect())
    }

    async fn mark_executed(&self, id: Uuid) -> DispatchResult<NavigationCommand> {
        let mut records = self.records.write().await;
        let command = records
            .by_id
            .get_mut(&id)
            .ok_or(DispatchError::NotFound { id })?;

        if !command.executed {
            command.executed = true;
            command.executed_at = Some(Utc::now());
            tracing::info!(command_id = %id, route = %command.route, "Navigation command executed");
        }
        Ok(command.clone())
    }

    async fn claim(&self, id: Uuid, client_id: &str) -> DispatchResult<NavigationCommand> {
        let mut records = self.records.write().await;
        let command = records
            .by_id
            .get_mut(&id)
            .ok_or(DispatchError::NotFound { id })?;

        if command.executed {
            return Err(DispatchError::AlreadyExecuted { id });
        }
        match command.claimed_by.as_deref() {
            Some(owner) if owner != client_id => Err(DispatchError::AlreadyClaimed {
                id,
                claimed_by: owner.to_string(),
            }),
            Some(_) => Ok(command.clone()),
            None => {
                command.claimed_by = Some(client_id.to_string());
                command.claimed_at = Some(Utc::now());
                Ok(command.clone())
            }
        }
    }

    async fn release(&self, id: Uuid, client_id: &str) -> DispatchResult<NavigationCommand> {
        let mut records = self.records.write().await;
        let command = records
            .by_id
            .get_mut(&id)
            .ok_or(DispatchError::NotFound { id })?;

        if command.executed {
            return Err(DispatchError::AlreadyExecuted { id });
        }
        match command.claimed_by.as_deref() {
            Some(owner) if owner != client_id => Err(DispatchError::AlreadyClaimed {
                id,
                claimed_by: owner.to_string(),
            }),
            Some(_) => {
                command.claimed_by = None;
                command.claimed_at = None;
                tracing::debug!(command_id = %id, client_id, "Released command claim");
                Ok(command.clone())
            }
            None => Ok(command.clone()),
        }
    }

    fn subscribe(&self, tenant_id: &str) -> CommandSubscription {
        CommandSubscription::new(tenant_id, self.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_ops_types::{AppPage, NavigationParams};

    fn inbox(tenant: &str) -> NavigationCommand {
        NavigationCommand::pending(
            tenant,
            "/inbox",
            NavigationParams::Page {
                page: AppPage::Inbox,
            },
        )
    }

    #[tokio::test]
    async fn test_insert_and_list_pending_in_order() {
        let store = InMemoryCommandStore::default();
        let a = store.insert(inbox("acct-1")).await.unwrap();
        let b = store.insert(inbox("acct-1")).await.unwrap();
        store.insert(inbox("acct-2")).await.unwrap();

        let pending = store.list_pending("acct-1").await.unwrap();
        assert_eq!(
            pending.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![a.id, b.id]
        );

        store.mark_executed(a.id).await.unwrap();
        let pending = store.list_pending("acct-1").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(store.list_pending("acct-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_executed_is_idempotent() {
        let store = InMemoryCommandStore::default();
        let cmd = store.insert(inbox("acct-1")).await.unwrap();

        let first = store.mark_executed(cmd.id).await.unwrap();
        let second = store.mark_executed(cmd.id).await.unwrap();
        assert!(second.executed);
        assert_eq!(first.executed_at, second.executed_at);

        let missing = Uuid::new_v4();
        assert_eq!(
            store.mark_executed(missing).await.unwrap_err(),
            DispatchError::NotFound { id: missing }
        );
    }

    #[tokio::test]
    async fn test_claim_compare_and_set() {
        let store = InMemoryCommandStore::default();
        let cmd = store.insert(inbox("acct-1")).await.unwrap();

        let claimed = store.claim(cmd.id, "tab-a").await.unwrap();
        assert_eq!(claimed.claimed_by.as_deref(), Some("tab-a"));
        assert!(store.claim(cmd.id, "tab-a").await.is_ok());
        assert_eq!(
            store.claim(cmd.id, "tab-b").await.unwrap_err(),
            DispatchError::AlreadyClaimed {
                id: cmd.id,
                claimed_by: "tab-a".into()
            }
        );

        store.mark_executed(cmd.id).await.unwrap();
        assert_eq!(
            store.claim(cmd.id, "tab-a").await.unwrap_err(),
            DispatchError::AlreadyExecuted { id: cmd.id }
        );
    }

    #[tokio::test]
    async fn test_release_lets_another_client_claim() {
        let store = InMemoryCommandStore::default();
        let cmd = store.insert(inbox("acct-1")).await.unwrap();
        store.claim(cmd.id, "tab-a").await.unwrap();

        // only the holder can release
        assert_eq!(
            store.release(cmd.id, "tab-b").await.unwrap_err(),
            DispatchError::AlreadyClaimed {
                id: cmd.id,
                claimed_by: "tab-a".into()
            }
        );

        let released = store.release(cmd.id, "tab-a").await.unwrap();
        assert!(released.claimed_by.is_none());
        assert!(released.claimed_at.is_none());
        // releasing twice is harmless
        assert!(store.release(cmd.id, "tab-a").await.is_ok());

        let claimed = store.claim(cmd.id, "tab-b").await.unwrap();
        assert_eq!(claimed.claimed_by.as_deref(), Some("tab-b"));
    }

    #[tokio::test]
    async fn test_subscription_filters_by_tenant() {
        let store = InMemoryCommandStore::default();
        let mut sub = store.subscribe("acct-1");

        store.insert(inbox("acct-2")).await.unwrap();
        let mine = store.insert(inbox("acct-1")).await.unwrap();

        match sub.recv().await {
            Some(SubscriptionEvent::Inserted(cmd)) => assert_eq!(cmd.id, mine.id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subscription_reports_lag() {
        let store = InMemoryCommandStore::new(2);
        let mut sub = store.subscribe("acct-1");
        for _ in 0..4 {
            store.insert(inbox("acct-1")).await.unwrap();
        }
        assert_eq!(sub.recv().await, Some(SubscriptionEvent::Lagged(2)));
    }
}
