//! Command dispatch
//!
//! Backend tooling cannot reach into the user's client, so a navigation is
//! written as a durable `NavigationCommand` and pushed to every live client
//! of the tenant. The client executes it and writes the acknowledgment back.
//!
//! ```text
//! dispatcher ──insert──► CommandStore ──push (tenant-filtered)──► executor
//!                             ▲                                       │
//!                             └────────── mark_executed ◄─────────────┘
//! ```
//!
//! Delivery is at-least-once. A failed navigation leaves the command pending
//! and it is replayed the next time the executor subscribes.

pub mod dispatcher;
pub mod executor;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use dispatcher::CommandDispatcher;
pub use executor::{CommandExecutor, ExecutionOutcome, Navigator};
pub use store::{CommandStore, CommandSubscription, InMemoryCommandStore};

/// How competing clients of one tenant share a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Every connected client may act on the command
    #[default]
    Broadcast,
    /// Clients claim the command first; only the claim winner acts
    Claimed,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Broadcast => "broadcast",
            DispatchMode::Claimed => "claimed",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "broadcast" => Ok(DispatchMode::Broadcast),
            "claimed" => Ok(DispatchMode::Claimed),
            other => Err(format!("unknown dispatch mode: {}", other)),
        }
    }
}
