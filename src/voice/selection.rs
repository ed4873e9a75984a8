//! Selection disambiguation
//!
//! When a search returns several candidates the assistant reads back an
//! enumerated list ("Number 1: Jane Smith. Number 2: ...") and the user picks
//! one on the next turn ("the second one", "number 2", "Jane").
//!
//! States are kept per `(tenant[, user])` key; a new search replaces the
//! previous state for that key.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use tokio::sync::RwLock;
use voice_ops_types::{SelectionItem, SelectionState};

use super::context::ContextKey;

/// Candidates read aloud before asking the user to choose
pub const MAX_SPOKEN_ITEMS: usize = 5;

const DEFAULT_NAME_FIELD: &str = "name";

static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(first|second|third|fourth|fifth|1st|2nd|3rd|4th|5th|one|two|three|four|five)")
        .expect("valid ordinal regex")
});

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"number\s+(\d+)|#(\d+)|(\d+)").expect("valid number regex"));

/// Lock-guarded selection states, latest per key.
#[derive(Clone, Default)]
pub struct SelectionStore {
    states: Arc<RwLock<HashMap<ContextKey, SelectionState>>>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from raw search results and keep it as the latest for
    /// `key`.
    pub async fn create_selection_state(
        &self,
        key: &ContextKey,
        items: &[Value],
        query: &str,
        name_field: Option<&str>,
    ) -> SelectionState {
        let state = build_selection_state(items, query, name_field);
        tracing::debug!(
            query,
            candidates = state.len(),
            key = %key,
            "Stored selection state"
        );

        self.states.write().await.insert(key.clone(), state.clone());
        state
    }

    pub async fn get_last_selection(&self, key: &ContextKey) -> Option<SelectionState> {
        self.states.read().await.get(key).cloned()
    }

    /// Resolve a follow-up pick against the stored state
    pub async fn parse(&self, key: &ContextKey, command: &str) -> Option<SelectionItem> {
        let state = self.get_last_selection(key).await?;
        parse_selection(command, &state)
    }

    pub async fn clear_selection(&self, key: &ContextKey) {
        self.states.write().await.remove(key);
    }
}

/// Map raw candidates to enumerated items without storing them.
pub fn build_selection_state(items: &[Value], query: &str, name_field: Option<&str>) -> SelectionState {
    let name_field = name_field.unwrap_or(DEFAULT_NAME_FIELD);
    let items = items
        .iter()
        .enumerate()
        .map(|(i, item)| SelectionItem {
            id: first_present(item, &["id", "contactId", "jobId", "conversationId"])
                .unwrap_or_else(|| i.to_string()),
            name: first_present(item, &[name_field, "first_name", "description"])
                .unwrap_or_else(|| format!("Item {}", i + 1)),
            index: i + 1,
            data: item.clone(),
        })
        .collect();

    SelectionState {
        items,
        query: query.to_string(),
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    }
}

/// First field holding a non-empty string or a number, rendered as a string
fn first_present(item: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match item.get(*field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Resolve "the second one", "number 2", "#2", "2" or a name fragment.
pub fn parse_selection(command: &str, state: &SelectionState) -> Option<SelectionItem> {
    let lower = command.trim().to_lowercase();
    if state.is_empty() || lower.is_empty() {
        return None;
    }

    if let Some(caps) = ORDINAL_RE.captures(&lower) {
        if let Some(item) = ordinal_value(&caps[1]).and_then(|n| state.pick(n)) {
            return Some(item.clone());
        }
    }

    if let Some(caps) = NUMBER_RE.captures(&lower) {
        let digits = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str());
        if let Some(item) = digits
            .and_then(|d| d.parse::<usize>().ok())
            .and_then(|n| state.pick(n))
        {
            return Some(item.clone());
        }
    }

    state
        .items
        .iter()
        .find(|item| {
            let name = item.name.to_lowercase();
            !name.is_empty() && (lower.contains(&name) || name.contains(&lower))
        })
        .cloned()
}

fn ordinal_value(word: &str) -> Option<usize> {
    match word {
        "first" | "1st" | "one" => Some(1),
        "second" | "2nd" | "two" => Some(2),
        "third" | "3rd" | "three" => Some(3),
        "fourth" | "4th" | "four" => Some(4),
        "fifth" | "5th" | "five" => Some(5),
        _ => None,
    }
}

/// Spoken prompt enumerating the candidates.
pub fn format_selection_prompt(state: &SelectionState) -> String {
    match state.len() {
        0 => "No items found.".to_string(),
        1 => format!("Found 1 item: {}.", state.items[0].name),
        n if n <= MAX_SPOKEN_ITEMS => format!(
            "Found {} items: {}. Which one would you like?",
            n,
            enumerate(&state.items)
        ),
        n => format!(
            "Found {} items. Here are the first {}: {}. Which one would you like?",
            n,
            MAX_SPOKEN_ITEMS,
            enumerate(&state.items[..MAX_SPOKEN_ITEMS])
        ),
    }
}

fn enumerate(items: &[SelectionItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("Number {}: {}", i + 1, item.name))
        .collect::<Vec<_>>()
        .join(". ")
}
