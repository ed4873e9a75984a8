//! Disambiguation types
//!
//! A `SelectionState` is the enumerated candidate list offered to the user
//! after an ambiguous query ("which Smith?").

use serde::{Deserialize, Serialize};

/// One enumerated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionItem {
    pub id: String,
    pub name: String,
    /// 1-based position as spoken to the user
    pub index: usize,
    /// Raw candidate as returned by the search
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Most-recent disambiguation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub items: Vec<SelectionItem>,
    pub query: String,
    /// Epoch milliseconds at which the state was created
    pub timestamp_ms: i64,
}

impl SelectionState {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at a 1-based position, bounds-checked.
    pub fn pick(&self, position: usize) -> Option<&SelectionItem> {
        if position == 0 {
            return None;
        }
        self.items.get(position - 1)
    }
}
