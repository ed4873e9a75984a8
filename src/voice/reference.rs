//! Reference resolution - "update it", "that job", "the last invoice"

use voice_ops_types::{EntityRef, EntityType, VoiceContext};

/// Phrases that point at whatever is currently in focus
const DEICTIC_MARKERS: &[&str] = &["it", "its", "that", "this"];

/// Words that, combined with an entity keyword, select the last of that type
const RECENCY_MARKERS: &[&str] = &["last", "that", "this"];

/// Resolve a deictic phrase against the conversational context.
///
/// Resolution order:
/// 1. the whole phrase is a deictic marker and something is in focus
/// 2. an entity keyword plus a recency marker ("that job") with a stored id
/// 3. a deictic marker as a word inside a longer phrase ("fix it")
///
/// Returns `None` when nothing applies.
pub fn resolve_reference(phrase: &str, context: &VoiceContext) -> Option<EntityRef> {
    let normalized = phrase.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    if DEICTIC_MARKERS.contains(&normalized.as_str()) {
        if let Some(entity) = &context.current_entity {
            return Some(entity.clone());
        }
    }

    let named: Vec<EntityType> = EntityType::ALL
        .into_iter()
        .filter(|t| normalized.contains(t.as_str()))
        .collect();

    let has_recency = RECENCY_MARKERS.iter().any(|m| normalized.contains(m));
    if has_recency {
        for &entity_type in &named {
            if let Some(id) = context.last_id(entity_type) {
                return Some(EntityRef::new(entity_type, id));
            }
        }
    }

    // a typed phrase never resolves to a focus entity of another type
    let current = context.current_entity.as_ref()?;
    if !named.is_empty() && !named.contains(&current.entity_type) {
        return None;
    }
    let mentions_focus = normalized
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| DEICTIC_MARKERS.contains(&word));
    if mentions_focus {
        return Some(current.clone());
    }

    None
}
