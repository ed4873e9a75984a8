//! Conversational support for voice commands
//!
//! The interpretation service is stateless between turns; this module keeps
//! the short-term memory it needs and resolves the follow-ups users speak:
//!
//! - `context`: per-tenant (optionally per-user) memory and turn history
//! - `reference`: "update it", "that job" → a concrete entity
//! - `selection`: enumerate ambiguous results, resolve "the second one"
//! - `date_parser`: "tomorrow at 2pm" → `YYYY-MM-DD` / `HH:MM:SS`
//!
//! Every resolver here fails soft: a miss is `None`, never an error, so one
//! unparseable utterance cannot abort the pipeline.

pub mod context;
pub mod date_parser;
pub mod reference;
pub mod selection;

pub use context::{context_payload, get_history_summary, ContextKey, ContextStore};
pub use date_parser::{parse_date_time, parse_relative_date, parse_time, to_iso8601, DateTimeParts};
pub use reference::resolve_reference;
pub use selection::{
    build_selection_state, format_selection_prompt, parse_selection, SelectionStore,
};
