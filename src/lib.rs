//! voice-ops - voice command interpretation support
//!
//! Speech is transcribed elsewhere and interpreted by a remote service that
//! cannot touch the user's running client. This crate supplies what that
//! service needs to act coherently across turns and across the network:
//!
//! - [`voice`]: conversational memory, reference resolution, disambiguation,
//!   natural-language dates
//! - [`navigation`]: keyword route table and typed navigation targets
//! - [`auth`]: cached service-account credentials for the outbound call
//! - [`dispatch`]: durable navigation commands pushed to live clients, plus
//!   the client-side executor that acknowledges them
//! - [`gateway`]: the orchestrator forwarding transcripts to the interpreter
//!
//! With the `server` feature (default) the [`api`] module exposes all of it
//! as axum routers.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod navigation;
pub mod voice;

#[cfg(feature = "server")]
pub mod api;

pub use config::VoiceConfig;
pub use error::{CredentialError, DispatchError, VoiceError, VoiceResult};
