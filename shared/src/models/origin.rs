//! Origin tags embedded in financial movement descriptions
//!
//! When an expense is paid out of a partner's account the backend writes a
//! wallet movement whose description carries `[GID:<expense id>]`. That tag
//! is the only link back to the expense, so it is parsed defensively here.

use serde::{Deserialize, Serialize};

pub const SYSTEM_EXPENSE_LABEL: &str = "System Expense";
pub const MANUAL_LABEL: &str = "Manual";
pub const NO_DESCRIPTION: &str = "No description";

/// Marker phrase written by the expense payment flow
const SYSTEM_MARKER: &str = "pago gasto";
const TAG_OPEN: &str = "[GID:";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovementOrigin {
    pub is_system_generated: bool,
    /// Id of the originating expense, when the tag is still present
    pub origin_id: Option<String>,
    pub label: String,
    /// Description with the tag and marker prefix removed
    pub detail: String,
}

/// Digits of the first well-formed `[GID:<digits>]` tag
fn find_tag(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(TAG_OPEN) {
        let digits_start = search_from + offset + TAG_OPEN.len();
        let rest = &text[digits_start..];
        let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len > 0 && rest[digits_len..].starts_with(']') {
            return Some(&rest[..digits_len]);
        }
        search_from = digits_start;
    }
    None
}

/// Remove every `[GID:...]` block, well-formed or not
fn strip_tags(text: &str) -> String {
    let mut out = text.to_string();
    while let Some(start) = out.find(TAG_OPEN) {
        match out[start..].find(']') {
            Some(close) => out.replace_range(start..start + close + 1, ""),
            None => break,
        }
    }
    out
}

/// Byte offset of the first ASCII case-insensitive match of `needle`
fn find_ignore_case(text: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    text.char_indices().map(|(i, _)| i).find(|&i| {
        text.as_bytes()
            .get(i..i + needle.len())
            .is_some_and(|window| window.eq_ignore_ascii_case(needle))
    })
}

/// Remove the "Pago Gasto:" marker regardless of case
fn strip_marker(text: &str) -> String {
    let marker = format!("{}:", SYSTEM_MARKER);
    match find_ignore_case(text, &marker) {
        Some(pos) => format!("{}{}", &text[..pos], &text[pos + marker.len()..]),
        None => text.to_string(),
    }
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify a movement description as system-generated or manual.
///
/// A `[GID:n]` tag identifies the originating expense. Without a tag the
/// marker phrase alone still marks the row as system-generated, with no
/// origin id (the expense may have been deleted).
pub fn parse_origin(description: Option<&str>) -> MovementOrigin {
    let text = description.unwrap_or("").trim();
    let tag = find_tag(text);
    let has_marker = find_ignore_case(text, SYSTEM_MARKER).is_some();

    if tag.is_some() || has_marker {
        let detail = collapse_spaces(&strip_marker(&strip_tags(text)));
        return MovementOrigin {
            is_system_generated: true,
            origin_id: tag.map(str::to_string),
            label: SYSTEM_EXPENSE_LABEL.to_string(),
            detail,
        };
    }

    let detail = collapse_spaces(&strip_tags(text));
    MovementOrigin {
        is_system_generated: false,
        origin_id: None,
        label: MANUAL_LABEL.to_string(),
        detail: if detail.is_empty() {
            NO_DESCRIPTION.to_string()
        } else {
            detail
        },
    }
}

/// Build a description carrying an origin tag, as the payment flow writes it
pub fn tag_description(detail: &str, origin_id: i64) -> String {
    format!("Pago Gasto: {} [GID:{}]", detail.trim(), origin_id)
}

/// Whether a movement may be deleted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DeletionPolicy {
    /// Manual movement
    Allowed,
    /// System-generated, but its origin no longer exists or is unknown
    AllowedOrphan,
    /// System-generated and the origin still exists; delete the origin instead
    Blocked { origin_id: String },
}

impl DeletionPolicy {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, DeletionPolicy::Blocked { .. })
    }
}

/// Decide whether a movement may be deleted given whether its origin exists.
///
/// `origin_exists` is only consulted for tagged system movements.
pub fn deletion_policy(origin: &MovementOrigin, origin_exists: bool) -> DeletionPolicy {
    if !origin.is_system_generated {
        return DeletionPolicy::Allowed;
    }
    match &origin.origin_id {
        Some(id) if origin_exists => DeletionPolicy::Blocked {
            origin_id: id.clone(),
        },
        _ => DeletionPolicy::AllowedOrphan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_description() {
        let o = parse_origin(Some("Pago Gasto: compra [GID:42]"));
        assert!(o.is_system_generated);
        assert_eq!(o.origin_id.as_deref(), Some("42"));
        assert_eq!(o.label, SYSTEM_EXPENSE_LABEL);
        assert_eq!(o.detail, "compra");
    }

    #[test]
    fn test_none_and_empty_are_manual() {
        for input in [None, Some(""), Some("   ")] {
            let o = parse_origin(input);
            assert!(!o.is_system_generated);
            assert_eq!(o.origin_id, None);
            assert_eq!(o.label, MANUAL_LABEL);
            assert_eq!(o.detail, NO_DESCRIPTION);
        }
    }

    #[test]
    fn test_marker_without_tag_is_orphan_system_row() {
        let o = parse_origin(Some("PAGO GASTO: fertilizante"));
        assert!(o.is_system_generated);
        assert_eq!(o.origin_id, None);
        assert_eq!(o.detail, "fertilizante");
    }

    #[test]
    fn test_marker_after_expanding_lowercase_chars() {
        let origin = parse_origin(Some("İİ Pago Gasto: abono [GID:4]"));
        assert!(origin.is_system_generated);
        assert_eq!(origin.origin_id.as_deref(), Some("4"));
        assert_eq!(origin.detail, "İİ abono");

        let origin = parse_origin(Some("Ñandú PAGO GASTO: cerco"));
        assert!(origin.is_system_generated);
        assert_eq!(origin.detail, "Ñandú cerco");
    }

    #[test]
    fn test_tag_without_marker() {
        let o = parse_origin(Some("Reembolso [GID:7] combustible"));
        assert!(o.is_system_generated);
        assert_eq!(o.origin_id.as_deref(), Some("7"));
        assert_eq!(o.detail, "Reembolso combustible");
    }

    #[test]
    fn test_malformed_tag_is_not_an_origin() {
        let o = parse_origin(Some("Aporte inicial [GID:abc]"));
        assert!(!o.is_system_generated);
        assert_eq!(o.detail, "Aporte inicial");

        let o = parse_origin(Some("[GID:] [GID:15]"));
        assert_eq!(o.origin_id.as_deref(), Some("15"));
    }

    #[test]
    fn test_manual_keeps_text() {
        let o = parse_origin(Some("Aporte inicial"));
        assert!(!o.is_system_generated);
        assert_eq!(o.detail, "Aporte inicial");
    }

    #[test]
    fn test_tag_description_round_trips() {
        let o = parse_origin(Some(&tag_description("riego enero", 301)));
        assert_eq!(o.origin_id.as_deref(), Some("301"));
        assert_eq!(o.detail, "riego enero");
    }

    #[test]
    fn test_deletion_policy() {
        let manual = parse_origin(Some("Aporte"));
        assert_eq!(deletion_policy(&manual, true), DeletionPolicy::Allowed);

        let tagged = parse_origin(Some("Pago Gasto: x [GID:5]"));
        assert_eq!(
            deletion_policy(&tagged, true),
            DeletionPolicy::Blocked { origin_id: "5".into() }
        );
        assert_eq!(deletion_policy(&tagged, false), DeletionPolicy::AllowedOrphan);

        let orphan = parse_origin(Some("Pago Gasto: x"));
        assert_eq!(deletion_policy(&orphan, true), DeletionPolicy::AllowedOrphan);
        assert!(deletion_policy(&orphan, true).is_allowed());
    }
}
