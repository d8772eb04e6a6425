//! Normalization of raw upstream fields.
//!
//! Upstream records arrive with inconsistent casing, stray markup, and
//! several generations of category labels. Everything here is a pure
//! function from dirty input to a canonical value; normalizing an already
//! canonical value is a no-op.

use once_cell::sync::Lazy;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

use crate::bill::Category;

/// Exact lower-cased values that carry no category information.
const CATEGORY_BLACKLIST: &[&str] = &["", "unknown", "null", "none", "n/a", "not reviewed"];

/// Legacy and colloquial category labels mapped onto the fixed vocabulary.
static CATEGORY_ALIASES: Lazy<HashMap<&'static str, Category>> = Lazy::new(|| {
    HashMap::from([
        ("government", Category::Civic),
        ("public", Category::Civic),
        ("municipal", Category::Civic),
        ("school", Category::Education),
        ("schools", Category::Education),
        ("infrastructure", Category::Engineering),
        ("construction", Category::Engineering),
        ("transportation", Category::Engineering),
        ("medical", Category::Healthcare),
        ("health", Category::Healthcare),
        ("medicine", Category::Healthcare),
        ("all", Category::AllPracticeAreas),
        ("general", Category::AllPracticeAreas),
    ])
});

/// Final words that keep their trailing period during title cleanup.
const TITLE_ABBREVIATIONS: &[&str] = &[
    "no", "inc", "jr", "sr", "etc", "vs", "dept", "gov", "sec", "st",
];

/// HTML entities that appear in upstream titles. `&amp;` is decoded last so
/// that double-encoded input does not re-expand.
const TITLE_ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    ("&ndash;", "-"),
    ("&mdash;", "-"),
    ("&amp;", "&"),
];

/// Maps a raw upstream category string onto the fixed vocabulary.
///
/// Lower-cases and trims, rejects known junk values, applies the alias
/// table, then validates against the enum. Anything unrecognized defaults to
/// [`Category::NotApplicable`] rather than failing; upstream data is known
/// to be dirty.
pub fn normalize_category(raw: &str) -> Category {
    let trimmed = raw.trim().to_ascii_lowercase();

    if CATEGORY_BLACKLIST.contains(&trimmed.as_str())
        || (!trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()))
    {
        return Category::NotApplicable;
    }

    if let Some(category) = CATEGORY_ALIASES.get(trimmed.as_str()) {
        return *category;
    }

    trimmed.parse().unwrap_or(Category::NotApplicable)
}

/// Cleans a raw upstream title for display.
///
/// Strips surrounding quote characters, decodes the fixed entity set,
/// normalizes smart quotes and dashes to ASCII, drops non-printable
/// characters, collapses whitespace runs, capitalizes the first letter, and
/// removes a single trailing period unless the final word is a known
/// abbreviation. An empty result becomes `"Untitled Bill"`.
pub fn normalize_title(raw: &str) -> String {
    let mut text = raw
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}'))
        .to_string();

    for (entity, replacement) in TITLE_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }

    let text: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .filter(|c| !c.is_control())
        .collect();

    let mut text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(first) = text.chars().next() {
        if first.is_lowercase() {
            let capitalized: String = first.to_uppercase().collect();
            text.replace_range(..first.len_utf8(), &capitalized);
        }
    }

    if let Some(stripped) = text.strip_suffix('.') {
        if !ends_with_abbreviation(stripped) {
            text = stripped.to_string();
        }
    }

    if text.is_empty() {
        return "Untitled Bill".to_string();
    }
    text
}

fn ends_with_abbreviation(text: &str) -> bool {
    // "U.S." style: another period immediately before the stripped one.
    if text.ends_with('.') {
        return true;
    }
    let last_word = text
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if last_word.chars().count() == 1 && last_word.chars().all(|c| c.is_alphabetic()) {
        return true;
    }
    TITLE_ABBREVIATIONS.contains(&last_word.as_str())
}

/// A derived bill identifier and whether it is stable across re-fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedId {
    pub id: String,
    /// False only for the random last-resort fallback. Unstable ids must
    /// never be used to correlate mutations across re-fetches.
    pub stable: bool,
}

/// Derives a stable identifier for a raw upstream record.
///
/// Priority, first match wins: explicit upstream string id, explicit
/// numeric id rendered as a string, `{jurisdiction}-{billNumber}`, a
/// truncated hash of the title, and finally a random suffix flagged as
/// unstable.
pub fn derive_id(raw: &Value, jurisdiction: &str) -> DerivedId {
    for key in ["id", "billId", "bill_id"] {
        match raw.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return DerivedId {
                    id: s.trim().to_string(),
                    stable: true,
                };
            }
            Some(Value::Number(n)) => {
                return DerivedId {
                    id: n.to_string(),
                    stable: true,
                };
            }
            _ => {}
        }
    }

    for key in ["billNumber", "bill_number"] {
        if let Some(Value::String(number)) = raw.get(key) {
            let number = number.trim();
            if !number.is_empty() {
                return DerivedId {
                    id: format!("{}-{}", jurisdiction, number),
                    stable: true,
                };
            }
        }
    }

    if let Some(Value::String(title)) = raw.get("title") {
        let condensed: String = title
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        if !condensed.is_empty() {
            let digest = Sha256::digest(condensed.as_bytes());
            return DerivedId {
                id: format!("title-{}", &hex::encode(digest)[..12]),
                stable: true,
            };
        }
    }

    DerivedId {
        id: format!("unstable-{}", Uuid::new_v4()),
        stable: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn test_normalize_category_aliases() {
        assert_eq!(normalize_category("Government"), Category::Civic);
        assert_eq!(normalize_category("  school "), Category::Education);
        assert_eq!(normalize_category("Infrastructure"), Category::Engineering);
        assert_eq!(normalize_category("MEDICAL"), Category::Healthcare);
    }

    #[test]
    fn test_normalize_category_blacklist() {
        assert_eq!(normalize_category(""), Category::NotApplicable);
        assert_eq!(normalize_category("unknown"), Category::NotApplicable);
        assert_eq!(normalize_category("null"), Category::NotApplicable);
        assert_eq!(normalize_category("42"), Category::NotApplicable);
        assert_eq!(normalize_category("Not Reviewed"), Category::NotApplicable);
    }

    #[test]
    fn test_normalize_category_unrecognized_defaults() {
        assert_eq!(normalize_category("zoning"), Category::NotApplicable);
    }

    #[test]
    fn test_normalize_category_idempotent() {
        // Canonical values, alias inputs, and junk must all be fixed points
        // after one pass.
        let mut inputs: Vec<String> = CATEGORY_ALIASES.keys().map(|s| s.to_string()).collect();
        inputs.extend(CATEGORY_BLACKLIST.iter().map(|s| s.to_string()));
        inputs.push("anything else".to_string());
        for input in inputs {
            let once = normalize_category(&input);
            assert_eq!(normalize_category(&once.to_string()), once, "input: {input}");
        }
        for category in Category::iter() {
            assert_eq!(normalize_category(&category.to_string()), category);
        }
    }

    #[test]
    fn test_normalize_title_strips_quotes_and_entities() {
        assert_eq!(
            normalize_title("\"Education &amp; Workforce Act\""),
            "Education & Workforce Act"
        );
        assert_eq!(
            normalize_title("\u{201C}Smart \u{2014} Grid\u{201D}"),
            "Smart - Grid"
        );
    }

    #[test]
    fn test_normalize_title_collapses_whitespace_and_capitalizes() {
        assert_eq!(
            normalize_title("  an   act \t relating to water. "),
            "An act relating to water"
        );
    }

    #[test]
    fn test_normalize_title_keeps_abbreviation_period() {
        assert_eq!(normalize_title("Senate Bill No."), "Senate Bill No.");
        assert_eq!(normalize_title("Roads Act etc."), "Roads Act etc.");
    }

    #[test]
    fn test_normalize_title_empty_fallback() {
        assert_eq!(normalize_title("   "), "Untitled Bill");
        assert_eq!(normalize_title("\"\""), "Untitled Bill");
    }

    #[test]
    fn test_derive_id_prefers_explicit_id() {
        let id = derive_id(&json!({"id": "abc-123", "billNumber": "HB1"}), "tx");
        assert_eq!(id.id, "abc-123");
        assert!(id.stable);

        let id = derive_id(&json!({"billId": 9981}), "tx");
        assert_eq!(id.id, "9981");
        assert!(id.stable);
    }

    #[test]
    fn test_derive_id_jurisdiction_bill_number() {
        let id = derive_id(&json!({"billNumber": "HB 1234"}), "tx");
        assert_eq!(id.id, "tx-HB 1234");
        assert!(id.stable);
    }

    #[test]
    fn test_derive_id_title_hash_is_deterministic() {
        let a = derive_id(&json!({"title": "An Act; relating to WATER"}), "tx");
        let b = derive_id(&json!({"title": "an act relating to water"}), "ca");
        assert_eq!(a, b);
        assert!(a.id.starts_with("title-"));
        assert!(a.stable);
    }

    #[test]
    fn test_derive_id_random_fallback_flagged_unstable() {
        let a = derive_id(&json!({}), "tx");
        let b = derive_id(&json!({}), "tx");
        assert!(a.id.starts_with("unstable-"));
        assert!(!a.stable);
        assert_ne!(a.id, b.id);
    }
}
