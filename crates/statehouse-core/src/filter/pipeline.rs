//! The pure filter → sort → paginate pipeline.
//!
//! Every function here takes the current collection and filter state as
//! explicit arguments and returns derived values; nothing captures shared
//! mutable state. The pipeline stages are order-sensitive: category, status
//! stage, highlight, session, then sort, then paginate.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use crate::bill::{Bill, LegislativeSession};
use crate::filter::model::{FilterState, PageWindow, SortOrder};

/// Fixed page size used by the catalog views.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// One page of the filtered, sorted collection.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub items: Vec<&'a Bill>,
    pub window: PageWindow,
}

/// Runs the full pipeline and returns the requested page.
///
/// `server_total` is the server-reported collection size; it is used for the
/// window only when no filter is active (records beyond the locally fetched
/// window still count). With any filter active the window is always computed
/// from the post-filter length.
pub fn run_pipeline<'a>(
    bills: &'a [Bill],
    filters: &FilterState,
    highlights: &HashSet<String>,
    sessions: &HashMap<String, LegislativeSession>,
    page: usize,
    per_page: usize,
    server_total: Option<usize>,
) -> PageView<'a> {
    let mut filtered = apply_filters(bills, filters, highlights, sessions);
    sort_bills(&mut filtered, filters.sort_order);

    let total_items = if filters.any_active() {
        filtered.len()
    } else {
        server_total.unwrap_or(filtered.len()).max(filtered.len())
    };
    let window = PageWindow::compute(page, per_page, total_items);

    let start = page.saturating_sub(1).saturating_mul(per_page);
    let end = start.saturating_add(per_page).min(filtered.len());
    let items = if start < filtered.len() {
        filtered[start..end].to_vec()
    } else {
        Vec::new()
    };

    PageView { items, window }
}

/// Applies the category, status-stage, highlight, and session filters in
/// that order.
pub fn apply_filters<'a>(
    bills: &'a [Bill],
    filters: &FilterState,
    highlights: &HashSet<String>,
    sessions: &HashMap<String, LegislativeSession>,
) -> Vec<&'a Bill> {
    // Selected session ids also match bills that only carry a session name.
    let selected_session_names: HashSet<&str> = filters
        .session_filters
        .iter()
        .filter_map(|id| sessions.get(id))
        .map(|session| session.session_name.as_str())
        .collect();

    bills
        .iter()
        .filter(|bill| {
            filters.category_filters.is_empty()
                || filters.category_filters.contains(&bill.category)
        })
        .filter(|bill| {
            filters
                .status_filter
                .is_none_or(|stage| bill.status_stage == stage)
        })
        .filter(|bill| !filters.highlight_only || highlights.contains(&bill.id))
        .filter(|bill| {
            if filters.session_filters.is_empty() {
                return true;
            }
            match bill.session_key() {
                Some(key) => {
                    filters.session_filters.contains(key)
                        || selected_session_names.contains(key)
                }
                None => false,
            }
        })
        .collect()
}

/// Sorts by the effective bill date. Missing or unparseable dates sort as
/// the oldest possible date, so they land last under `Latest` and first
/// under `Earliest`.
pub fn sort_bills(bills: &mut [&Bill], order: SortOrder) {
    bills.sort_by_key(|bill| bill.effective_date().unwrap_or(NaiveDate::MIN));
    if order == SortOrder::Latest {
        bills.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::{Category, Stage};

    fn bill(id: &str, category: Category, stage: Stage, date: Option<&str>) -> Bill {
        Bill {
            id: id.to_string(),
            id_stable: true,
            title: format!("Bill {id}"),
            bill_number: None,
            jurisdiction: "tx".to_string(),
            raw_status: None,
            status_stage: stage,
            category,
            summary: String::new(),
            introduced_date: date.map(|d| d.parse().unwrap()),
            last_action_date: None,
            session_id: None,
            session_name: None,
            reviewed: false,
            source_url: None,
        }
    }

    fn fixture() -> Vec<Bill> {
        vec![
            bill("a", Category::Civic, Stage::Committee, Some("2025-01-10")),
            bill("b", Category::Education, Stage::Floor, Some("2025-03-02")),
            bill("c", Category::Civic, Stage::Enacted, None),
            bill("d", Category::Healthcare, Stage::Committee, Some("2024-11-30")),
            bill("e", Category::Civic, Stage::Committee, Some("2025-02-14")),
        ]
    }

    fn ids(view: &[&Bill]) -> Vec<String> {
        view.iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn test_category_filter() {
        let bills = fixture();
        let filters = FilterState {
            category_filters: HashSet::from([Category::Civic]),
            ..Default::default()
        };
        let filtered = apply_filters(&bills, &filters, &HashSet::new(), &HashMap::new());
        assert_eq!(ids(&filtered), vec!["a", "c", "e"]);
    }

    #[test]
    fn test_status_and_highlight_filters_compose() {
        let bills = fixture();
        let highlights = HashSet::from(["a".to_string(), "b".to_string()]);
        let filters = FilterState {
            status_filter: Some(Stage::Committee),
            highlight_only: true,
            ..Default::default()
        };
        let filtered = apply_filters(&bills, &filters, &highlights, &HashMap::new());
        assert_eq!(ids(&filtered), vec!["a"]);
    }

    #[test]
    fn test_session_filter_matches_name_through_descriptor_map() {
        let mut bills = fixture();
        bills[0].session_name = Some("89th Regular".to_string());
        bills[1].session_id = Some("2025R".to_string());

        let sessions = HashMap::from([(
            "2025R".to_string(),
            LegislativeSession {
                session_id: "2025R".to_string(),
                session_name: "89th Regular".to_string(),
                year_start: Some(2025),
                year_end: Some(2026),
                is_active: true,
            },
        )]);
        let filters = FilterState {
            session_filters: HashSet::from(["2025R".to_string()]),
            ..Default::default()
        };
        let filtered = apply_filters(&bills, &filters, &HashSet::new(), &sessions);
        // "a" matches by translated name, "b" by id; bills with no session
        // key are excluded.
        assert_eq!(ids(&filtered), vec!["a", "b"]);
    }

    #[test]
    fn test_sort_missing_dates_as_oldest() {
        let bills = fixture();
        let mut refs: Vec<&Bill> = bills.iter().collect();
        sort_bills(&mut refs, SortOrder::Latest);
        assert_eq!(ids(&refs), vec!["b", "e", "a", "d", "c"]);

        sort_bills(&mut refs, SortOrder::Earliest);
        assert_eq!(ids(&refs), vec!["c", "d", "a", "e", "b"]);
    }

    #[test]
    fn test_window_uses_post_filter_length_when_filtered() {
        let bills = fixture();
        let filters = FilterState {
            category_filters: HashSet::from([Category::Civic]),
            ..Default::default()
        };
        let view = run_pipeline(
            &bills,
            &filters,
            &HashSet::new(),
            &HashMap::new(),
            1,
            2,
            Some(500),
        );
        // Server total is ignored while a filter is active.
        assert_eq!(view.window.total_items, 3);
        assert_eq!(view.window.total_pages, 2);
    }

    #[test]
    fn test_window_uses_server_total_when_unfiltered() {
        let bills = fixture();
        let view = run_pipeline(
            &bills,
            &FilterState::default(),
            &HashSet::new(),
            &HashMap::new(),
            1,
            20,
            Some(500),
        );
        assert_eq!(view.window.total_items, 500);
        assert_eq!(view.window.total_pages, 25);
    }

    #[test]
    fn test_pages_concatenate_to_pipeline_output() {
        let bills = fixture();
        let filters = FilterState {
            category_filters: HashSet::from([
                Category::Civic,
                Category::Education,
                Category::Healthcare,
            ]),
            ..Default::default()
        };
        let highlights = HashSet::new();
        let sessions = HashMap::new();

        let mut filtered = apply_filters(&bills, &filters, &highlights, &sessions);
        sort_bills(&mut filtered, SortOrder::Latest);

        let per_page = 2;
        let first = run_pipeline(&bills, &filters, &highlights, &sessions, 1, per_page, None);
        let total_pages = first.window.total_pages;
        assert_eq!(first.window.total_items, filtered.len());

        let mut concatenated = Vec::new();
        for page in 1..=total_pages {
            let view =
                run_pipeline(&bills, &filters, &highlights, &sessions, page, per_page, None);
            concatenated.extend(ids(&view.items));
        }
        assert_eq!(concatenated, ids(&filtered));
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let bills = fixture();
        let view = run_pipeline(
            &bills,
            &FilterState::default(),
            &HashSet::new(),
            &HashMap::new(),
            9,
            20,
            None,
        );
        assert!(view.items.is_empty());
    }
}
