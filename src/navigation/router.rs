//! Keyword route table and entity extraction for direct voice commands.

use std::sync::LazyLock;

use regex::Regex;
use voice_ops_types::{EntityReference, EntityType};

/// Keyword → route, scanned in order. The first keyword found wins.
pub const ROUTE_TABLE: &[(&str, &str)] = &[
    ("job", "/jobs"),
    ("jobs", "/jobs"),
    ("contact", "/contacts"),
    ("contacts", "/contacts"),
    ("invoice", "/finance/invoices"),
    ("invoices", "/finance/invoices"),
    ("payment", "/finance/payments"),
    ("payments", "/finance/payments"),
    ("campaign", "/marketing/campaigns"),
    ("campaigns", "/marketing/campaigns"),
    ("inbox", "/inbox"),
    ("analytics", "/analytics"),
    ("dashboard", "/dashboard"),
    ("settings", "/admin/settings"),
];

static IMPERATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(go to|show me|open|navigate to)\s+(.+)").expect("valid imperative regex")
});

static ENTITY_PATTERNS: LazyLock<Vec<(EntityType, Regex)>> = LazyLock::new(|| {
    [
        (EntityType::Job, r"job\s+([a-z0-9-]+)"),
        (EntityType::Contact, r"contact\s+([a-z\s]+)"),
        (EntityType::Invoice, r"invoice\s+([a-z0-9-]+)"),
        (EntityType::Conversation, r"conversation\s+([a-z0-9-]+)"),
    ]
    .into_iter()
    .map(|(entity_type, pattern)| {
        (
            entity_type,
            Regex::new(pattern).expect("valid entity pattern"),
        )
    })
    .collect()
});

fn scan_routes(text: &str) -> Option<&'static str> {
    ROUTE_TABLE
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, route)| *route)
}

/// Route for a direct command like "show me invoices", or `None`.
pub fn get_route_from_command(command: &str) -> Option<&'static str> {
    let lower = command.trim().to_lowercase();

    if let Some(route) = scan_routes(&lower) {
        return Some(route);
    }

    // "open X" style phrasing: look at the object of the verb
    IMPERATIVE_RE
        .captures(&lower)
        .and_then(|caps| scan_routes(caps[2].trim()))
}

/// Entity named in the command ("open job J-42"), or the empty reference.
pub fn extract_entity_from_command(command: &str) -> EntityReference {
    let lower = command.to_lowercase();

    for (entity_type, pattern) in ENTITY_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(&lower) {
            let id = caps[1].trim();
            if !id.is_empty() {
                return EntityReference {
                    id: Some(id.to_string()),
                    entity_type: Some(*entity_type),
                };
            }
        }
    }

    EntityReference::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_from_keywords() {
        assert_eq!(get_route_from_command("show me invoices"), Some("/finance/invoices"));
        assert_eq!(get_route_from_command("Open the INBOX"), Some("/inbox"));
        assert_eq!(get_route_from_command("payments please"), Some("/finance/payments"));
        assert_eq!(get_route_from_command("go to settings"), Some("/admin/settings"));
        assert_eq!(get_route_from_command("what's the weather"), None);
    }

    #[test]
    fn test_first_table_entry_wins() {
        // both "job" and "contact" appear; "job" comes first in the table
        assert_eq!(
            get_route_from_command("contact for the job"),
            Some("/jobs")
        );
    }

    #[test]
    fn test_extract_job_and_invoice() {
        assert_eq!(
            extract_entity_from_command("open job J-42"),
            EntityReference {
                id: Some("j-42".into()),
                entity_type: Some(EntityType::Job),
            }
        );
        assert_eq!(
            extract_entity_from_command("send invoice inv-7 now"),
            EntityReference {
                id: Some("inv-7".into()),
                entity_type: Some(EntityType::Invoice),
            }
        );
    }

    #[test]
    fn test_extract_contact_name_spans_words() {
        let entity = extract_entity_from_command("call contact Jane Smith");
        assert_eq!(entity.entity_type, Some(EntityType::Contact));
        assert_eq!(entity.id.as_deref(), Some("jane smith"));
    }

    #[test]
    fn test_extract_nothing() {
        assert!(extract_entity_from_command("open the inbox").is_empty());
    }
}
