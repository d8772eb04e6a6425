//! Bill domain model.
//!
//! The canonical in-memory representation of one legislative bill, plus the
//! two fixed vocabularies every upstream record is normalized onto.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The legislative stage a bill has reached, derived from its free-text
/// status. Variants are ordered by progression.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    /// Filed, no further movement observed.
    Introduced,
    /// Referred to or sitting in a committee.
    Committee,
    /// On a chamber floor (votes, readings, amendments).
    Floor,
    /// Passed at least one chamber or enrolled.
    Passed,
    /// Signed into law or otherwise enacted.
    Enacted,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Introduced
    }
}

/// The practice-area category a bill is filed under.
///
/// Upstream category strings are dirty; they are mapped onto this fixed set
/// by the normalizer and never stored raw.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Category {
    Civic,
    Education,
    Engineering,
    Healthcare,
    NotApplicable,
    AllPracticeAreas,
}

impl Default for Category {
    fn default() -> Self {
        Category::NotApplicable
    }
}

fn id_stable_default() -> bool {
    true
}

/// The canonical, normalized representation of one legislative bill.
///
/// Instances are created by the sync layer from raw upstream records and
/// mutated in place by the mutation manager (`category`, `reviewed`). The
/// `id` is unique within a collection and stable across re-fetches of the
/// same upstream record, except when `id_stable` is false (last-resort
/// random fallback, never valid for mutation correlation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// Unique identifier, derived deterministically from upstream fields.
    pub id: String,
    /// False only for the random last-resort id fallback.
    #[serde(default = "id_stable_default", skip_serializing)]
    pub id_stable: bool,
    /// Cleaned display title.
    pub title: String,
    /// Upstream bill number (e.g. "HB 1234"), when present.
    pub bill_number: Option<String>,
    /// Two-letter jurisdiction code the bill belongs to.
    pub jurisdiction: String,
    /// The raw status string as received; kept for re-classification.
    pub raw_status: Option<String>,
    /// Stage derived from `raw_status`. Never trusted from upstream.
    pub status_stage: Stage,
    /// Normalized practice-area category.
    pub category: Category,
    /// Upstream summary text, possibly empty.
    #[serde(default)]
    pub summary: String,
    pub introduced_date: Option<NaiveDate>,
    pub last_action_date: Option<NaiveDate>,
    pub session_id: Option<String>,
    pub session_name: Option<String>,
    /// Whether the user has marked this bill as reviewed.
    #[serde(default)]
    pub reviewed: bool,
    pub source_url: Option<String>,
}

impl Bill {
    /// The date used for ordering: the introduced date when known, falling
    /// back to the last action date.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.introduced_date.or(self.last_action_date)
    }

    /// The key a session filter matches against: the session id when known,
    /// falling back to the session name.
    pub fn session_key(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .or(self.session_name.as_deref())
    }
}

/// A legislative session descriptor, sourced from the sessions endpoint and
/// reconciled with sessions observed embedded in bill records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegislativeSession {
    pub session_id: String,
    pub session_name: String,
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
    #[serde(default)]
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Introduced < Stage::Committee);
        assert!(Stage::Committee < Stage::Floor);
        assert!(Stage::Floor < Stage::Passed);
        assert!(Stage::Passed < Stage::Enacted);
    }

    #[test]
    fn test_category_round_trips_kebab_case() {
        assert_eq!(Category::NotApplicable.to_string(), "not-applicable");
        assert_eq!(
            "all-practice-areas".parse::<Category>().unwrap(),
            Category::AllPracticeAreas
        );
        assert_eq!("civic".parse::<Category>().unwrap(), Category::Civic);
    }

    #[test]
    fn test_session_key_prefers_id() {
        let bill = Bill {
            id: "tx-HB1".to_string(),
            id_stable: true,
            title: "Test".to_string(),
            bill_number: Some("HB1".to_string()),
            jurisdiction: "tx".to_string(),
            raw_status: None,
            status_stage: Stage::Introduced,
            category: Category::Civic,
            summary: String::new(),
            introduced_date: None,
            last_action_date: None,
            session_id: Some("2025R".to_string()),
            session_name: Some("89th Regular Session".to_string()),
            reviewed: false,
            source_url: None,
        };
        assert_eq!(bill.session_key(), Some("2025R"));
    }
}
