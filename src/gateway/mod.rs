//! Voice command gateway
//!
//! ```text
//! client ──► VoiceGateway ──token──► TokenCache
//!                 │
//!                 ├──context──► ContextStore
//!                 │
//!                 └──forward──► InterpretationClient ──► interpretation service
//!                                        │
//!                 ◄──reply (relay / record turns / dispatch navigate)──┘
//! ```

pub mod interpreter;
pub mod service;

pub use interpreter::{HttpInterpreter, InterpretationClient, InterpreterReply};
pub use service::VoiceGateway;
