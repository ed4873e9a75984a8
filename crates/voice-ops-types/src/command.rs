//! Navigation command records
//!
//! A `NavigationCommand` is written by backend tooling and executed inside the
//! user's client. It moves through exactly two states:
//!
//! ```text
//! Pending (executed=false) ──► Done (executed=true, executedAt set)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Application pages reachable by the backend "navigate" tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppPage {
    Inbox,
    Jobs,
    Contacts,
    Analytics,
    Finance,
    Tech,
    Campaigns,
    EmailTemplates,
    Tags,
    Settings,
    Integrations,
    Dashboard,
}

impl AppPage {
    pub const ALL: [AppPage; 12] = [
        AppPage::Inbox,
        AppPage::Jobs,
        AppPage::Contacts,
        AppPage::Analytics,
        AppPage::Finance,
        AppPage::Tech,
        AppPage::Campaigns,
        AppPage::EmailTemplates,
        AppPage::Tags,
        AppPage::Settings,
        AppPage::Integrations,
        AppPage::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppPage::Inbox => "inbox",
            AppPage::Jobs => "jobs",
            AppPage::Contacts => "contacts",
            AppPage::Analytics => "analytics",
            AppPage::Finance => "finance",
            AppPage::Tech => "tech",
            AppPage::Campaigns => "campaigns",
            AppPage::EmailTemplates => "email-templates",
            AppPage::Tags => "tags",
            AppPage::Settings => "settings",
            AppPage::Integrations => "integrations",
            AppPage::Dashboard => "dashboard",
        }
    }

    /// Canonical client path for the page.
    pub fn path(&self) -> &'static str {
        match self {
            AppPage::Inbox => "/inbox",
            AppPage::Jobs => "/jobs",
            AppPage::Contacts => "/contacts",
            AppPage::Analytics => "/analytics",
            AppPage::Finance => "/finance/dashboard",
            AppPage::Tech => "/tech/dashboard",
            AppPage::Campaigns => "/marketing/campaigns",
            AppPage::EmailTemplates => "/marketing/email-templates",
            AppPage::Tags => "/marketing/tags",
            AppPage::Settings => "/admin/settings",
            AppPage::Integrations => "/settings/integrations",
            // The dashboard lands on the jobs board
            AppPage::Dashboard => "/jobs",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl fmt::Display for AppPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed parameters of a navigation command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationParams {
    /// Open a top-level page
    Page { page: AppPage },
    /// Open a single job
    Job {
        #[serde(rename = "jobId")]
        job_id: String,
    },
    /// Open a single contact
    Contact {
        #[serde(rename = "contactId")]
        contact_id: String,
    },
}

/// Durable navigation command record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationCommand {
    pub id: Uuid,
    pub tenant_id: String,
    pub route: String,
    pub params: NavigationParams,
    pub executed: bool,
    pub executed_at: Option<DateTime<Utc>>,
    /// Client that won the claim, when dispatch runs in claimed mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
}

impl NavigationCommand {
    /// A fresh `Pending` command for a tenant.
    pub fn pending(
        tenant_id: impl Into<String>,
        route: impl Into<String>,
        params: NavigationParams,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            route: route.into(),
            params,
            executed: false,
            executed_at: None,
            claimed_by: None,
            claimed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.executed
    }
}
