//! Status-stage classification.
//!
//! Maps a free-text legislative status onto the five-stage vocabulary. Total
//! and deterministic: dirty or missing input silently defaults to
//! [`Stage::Introduced`] rather than failing.

use crate::bill::Stage;

/// Exact-match shim for legacy literal values that predate the keyword
/// groups. Checked before the groups; the literal set mirrors values still
/// produced by older upstream rows.
const EXACT_MATCHES: &[(&str, Stage)] = &[
    ("enrolled", Stage::Passed),
    ("chaptered", Stage::Enacted),
    ("engrossed", Stage::Floor),
];

/// Substring keyword groups in fixed priority order; the first group with a
/// match wins. A status mentioning both "passed" and "committee" is Passed
/// because the passed group is checked first.
const KEYWORD_GROUPS: &[(Stage, &[&str])] = &[
    (
        Stage::Enacted,
        &["enacted", "signed", "law", "approved by governor", "chaptered"],
    ),
    (
        Stage::Passed,
        &["passed", "enrolled", "concurred", "sent to governor"],
    ),
    (
        Stage::Floor,
        &["floor", "vote", "reading", "debate", "amended", "engrossed", "calendar"],
    ),
    (
        Stage::Committee,
        &["committee", "referred", "hearing", "markup", "reported"],
    ),
];

/// Classifies a raw status string into a [`Stage`].
pub fn classify(raw_status: Option<&str>) -> Stage {
    let Some(raw) = raw_status else {
        return Stage::Introduced;
    };
    let status = raw.trim().to_lowercase();
    if status.is_empty() {
        return Stage::Introduced;
    }

    for (literal, stage) in EXACT_MATCHES {
        if status == *literal {
            return *stage;
        }
    }

    for (stage, keywords) in KEYWORD_GROUPS {
        if keywords.iter().any(|keyword| status.contains(keyword)) {
            return *stage;
        }
    }

    Stage::Introduced
}
