//! CommandExecutor - client side of the dispatch protocol.
//!
//! Runs as one task per client connection:
//!
//! 1. wait until the client's tenant identity is known
//! 2. subscribe to the tenant's insert feed, then replay its pending commands
//! 3. for each command: skip if executed or already handled here, otherwise
//!    (claim, in claimed mode) navigate and write the acknowledgment back;
//!    a failed navigation releases the claim so any client can retry
//! 4. on identity change re-subscribe; on shutdown stop
//!
//! Notifications are processed one at a time in arrival order.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;
use voice_ops_types::{NavigationCommand, NavigationParams};

use super::store::{CommandStore, SubscriptionEvent};
use super::DispatchMode;
use crate::error::{DispatchError, DispatchResult};

/// Ids remembered per connection; the oldest are forgotten first.
const HANDLED_CAPACITY: usize = 512;

/// The client-local navigation side effect.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, route: &str, params: &NavigationParams) -> DispatchResult<()>;
}

/// Result of handling one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Navigated,
    /// Executed already, by this connection or elsewhere
    AlreadyExecuted,
    /// Another client holds the claim; retried on the next replay
    ClaimedElsewhere(String),
    /// Navigation failed; the command stays pending for replay
    Failed(String),
}

/// Bounded record of commands this connection already acted on.
///
/// Catches the insert notification that races the replay of the same
/// command right after subscribing.
#[derive(Debug, Default)]
struct HandledSet {
    ids: HashSet<Uuid>,
    order: VecDeque<Uuid>,
}

impl HandledSet {
    fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: Uuid) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        if self.order.len() > HANDLED_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Executes navigation commands for one client connection.
pub struct CommandExecutor {
    client_id: String,
    store: Arc<dyn CommandStore>,
    navigator: Arc<dyn Navigator>,
    mode: DispatchMode,
    handled: HandledSet,
}

impl CommandExecutor {
    pub fn new(
        client_id: impl Into<String>,
        store: Arc<dyn CommandStore>,
        navigator: Arc<dyn Navigator>,
        mode: DispatchMode,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            store,
            navigator,
            mode,
            handled: HandledSet::default(),
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// `identity` carries the resolved tenant; `None` means not yet known.
    pub async fn run(
        mut self,
        mut identity: watch::Receiver<Option<String>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(client_id = %self.client_id, mode = %self.mode, "Command executor started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let tenant_id = identity.borrow_and_update().clone();
            let Some(tenant_id) = tenant_id else {
                tokio::select! {
                    changed = identity.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                continue;
            };

            if !self.serve_tenant(&tenant_id, &mut identity, &mut shutdown).await {
                break;
            }
        }

        tracing::info!(client_id = %self.client_id, "Command executor stopped");
    }

    /// Serve one tenant until the identity changes (returns `true`) or the
    /// executor should stop (returns `false`).
    async fn serve_tenant(
        &mut self,
        tenant_id: &str,
        identity: &mut watch::Receiver<Option<String>>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        // Subscribe before replaying so nothing inserted in between is lost
        let mut subscription = self.store.subscribe(tenant_id);
        tracing::debug!(client_id = %self.client_id, tenant_id, "Subscribed to navigation commands");
        self.replay_pending(tenant_id).await;

        loop {
            tokio::select! {
                event = subscription.recv() => match event {
                    Some(SubscriptionEvent::Inserted(command)) => {
                        self.handle(&command).await;
                    }
                    Some(SubscriptionEvent::Lagged(skipped)) => {
                        tracing::warn!(tenant_id, skipped, "Command feed lagged, replaying pending");
                        self.replay_pending(tenant_id).await;
                    }
                    None => return false,
                },
                changed = identity.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    tracing::debug!(tenant_id, "Identity changed, re-subscribing");
                    return true;
                }
                changed = shutdown.changed() => {
                    return changed.is_ok() && !*shutdown.borrow();
                }
            }
        }
    }

    /// Handle every pending command of the tenant, oldest first.
    pub async fn replay_pending(&mut self, tenant_id: &str) -> Vec<ExecutionOutcome> {
        let pending = match self.store.list_pending(tenant_id).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(tenant_id, error = %e, "Failed to load pending commands");
                return Vec::new();
            }
        };

        if !pending.is_empty() {
            tracing::debug!(tenant_id, count = pending.len(), "Replaying pending commands");
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for command in pending {
            outcomes.push(self.handle(&command).await);
        }
        outcomes
    }

    /// Execute one notified command at most once per connection.
    pub async fn handle(&mut self, command: &NavigationCommand) -> ExecutionOutcome {
        if command.executed || self.handled.contains(&command.id) {
            return ExecutionOutcome::AlreadyExecuted;
        }

        if self.mode == DispatchMode::Claimed {
            match self.store.claim(command.id, &self.client_id).await {
                Ok(_) => {}
                Err(DispatchError::AlreadyClaimed { claimed_by, .. }) => {
                    return ExecutionOutcome::ClaimedElsewhere(claimed_by);
                }
                Err(DispatchError::AlreadyExecuted { .. }) => {
                    self.handled.insert(command.id);
                    return ExecutionOutcome::AlreadyExecuted;
                }
                Err(e) => return ExecutionOutcome::Failed(e.to_string()),
            }
        }

        if let Err(e) = self.navigator.navigate(&command.route, &command.params).await {
            tracing::warn!(
                command_id = %command.id,
                route = %command.route,
                error = %e,
                "Navigation failed, leaving command pending"
            );
            if self.mode == DispatchMode::Claimed {
                if let Err(release_err) = self.store.release(command.id, &self.client_id).await {
                    tracing::warn!(
                        command_id = %command.id,
                        error = %release_err,
                        "Failed to release claim"
                    );
                }
            }
            return ExecutionOutcome::Failed(e.to_string());
        }

        // The side effect happened: never repeat it on this connection,
        // even if the write-back below fails and the record is replayed
        self.handled.insert(command.id);

        if let Err(e) = self.store.mark_executed(command.id).await {
            tracing::warn!(command_id = %command.id, error = %e, "Failed to acknowledge command");
        }
        ExecutionOutcome::Navigated
    }
}
