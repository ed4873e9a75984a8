//! Shared API Types for voice-ops
//!
//! This crate is the SINGLE SOURCE OF TRUTH for all types crossing HTTP and
//! push-channel boundaries.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐  JSON   ┌──────────────────┐  JSON   ┌──────────────────────┐
//! │  Browser client  │ ◄─────► │  Rust Server     │ ◄─────► │ Interpretation svc   │
//! │  (executor)      │   SSE   │  (Axum)          │         │ (remote, opaque)     │
//! └──────────────────┘         └──────────────────┘         └──────────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. All API types live here - no inline struct definitions in handlers
//! 2. camelCase on the wire (the browser and the interpretation service expect it)
//! 3. Tagged enums only: `#[serde(tag = "kind")]`

pub mod api;
pub mod command;
pub mod context;
pub mod selection;

pub use api::*;
pub use command::*;
pub use context::*;
pub use selection::*;
