//! CommandDispatcher - backend side of the dispatch protocol.

use std::sync::Arc;

use uuid::Uuid;
use voice_ops_types::{NavigateRequest, NavigateResponse, NavigationCommand};

use super::store::CommandStore;
use super::DispatchMode;
use crate::error::{VoiceError, VoiceResult};
use crate::navigation::NavigationTarget;

/// Writes navigation commands for live clients to pick up.
#[derive(Clone)]
pub struct CommandDispatcher {
    store: Arc<dyn CommandStore>,
    mode: DispatchMode,
}

impl CommandDispatcher {
    pub fn new(store: Arc<dyn CommandStore>, mode: DispatchMode) -> Self {
        Self { store, mode }
    }

    pub fn store(&self) -> &Arc<dyn CommandStore> {
        &self.store
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Insert a `Pending` command for `target`, scoped to the tenant.
    pub async fn dispatch(
        &self,
        tenant_id: &str,
        target: NavigationTarget,
    ) -> VoiceResult<NavigationCommand> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(VoiceError::Validation("tenantId is required".to_string()));
        }

        let command = NavigationCommand::pending(tenant_id, target.route, target.params);
        let command = self.store.insert(command).await?;
        tracing::info!(
            command_id = %command.id,
            tenant_id,
            route = %command.route,
            mode = %self.mode,
            "Dispatched navigation command"
        );
        Ok(command)
    }

    /// The backend "navigate" tool: validate the page, dispatch, and report
    /// the resolved path.
    pub async fn dispatch_navigation(
        &self,
        request: &NavigateRequest,
    ) -> VoiceResult<NavigateResponse> {
        let target = NavigationTarget::from_request(request)?;
        let page = target.page;
        let command = self.dispatch(&request.tenant_id, target).await?;

        Ok(NavigateResponse {
            success: true,
            message: format!("Navigating to {}", page),
            path: command.route,
            command_id: command.id,
        })
    }

    pub async fn pending(&self, tenant_id: &str) -> VoiceResult<Vec<NavigationCommand>> {
        Ok(self.store.list_pending(tenant_id).await?)
    }

    pub async fn mark_executed(&self, id: Uuid) -> VoiceResult<NavigationCommand> {
        Ok(self.store.mark_executed(id).await?)
    }

    pub async fn claim(&self, id: Uuid, client_id: &str) -> VoiceResult<NavigationCommand> {
        Ok(self.store.claim(id, client_id).await?)
    }

    pub async fn release(&self, id: Uuid, client_id: &str) -> VoiceResult<NavigationCommand> {
        Ok(self.store.release(id, client_id).await?)
    }
}
