//! Filter and pagination state models.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumString};

use crate::bill::{Category, Stage};

/// Sort direction over the effective bill date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    /// Most recent first.
    Latest,
    /// Oldest first.
    Earliest,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Latest
    }
}

/// The user's current filter selection.
///
/// Entirely derived, session-local state; only `highlight_only` survives
/// restarts, through the preference repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Selected categories; empty means no category filtering.
    #[serde(default)]
    pub category_filters: HashSet<Category>,
    /// Selected status stage, when one is active.
    pub status_filter: Option<Stage>,
    /// Selected session ids; empty means no session filtering.
    #[serde(default)]
    pub session_filters: HashSet<String>,
    /// Restrict to highlighted bills.
    #[serde(default)]
    pub highlight_only: bool,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl FilterState {
    /// Whether any full-collection filter is active. Sort order alone does
    /// not count: it reorders but never shrinks the collection.
    pub fn any_active(&self) -> bool {
        !self.category_filters.is_empty()
            || self.status_filter.is_some()
            || !self.session_filters.is_empty()
            || self.highlight_only
    }
}

/// The pagination window over the filtered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    /// 1-indexed page number.
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl PageWindow {
    /// Computes the window for a collection of `total_items` records.
    pub fn compute(page: usize, per_page: usize, total_items: usize) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total_items.div_ceil(per_page)
        };
        Self {
            page,
            per_page,
            total_items,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_active() {
        let mut filters = FilterState::default();
        assert!(!filters.any_active());

        filters.sort_order = SortOrder::Earliest;
        assert!(!filters.any_active());

        filters.highlight_only = true;
        assert!(filters.any_active());

        let filters = FilterState {
            status_filter: Some(Stage::Floor),
            ..Default::default()
        };
        assert!(filters.any_active());
    }

    #[test]
    fn test_page_window_rounding() {
        let window = PageWindow::compute(1, 20, 41);
        assert_eq!(window.total_pages, 3);

        let window = PageWindow::compute(1, 20, 40);
        assert_eq!(window.total_pages, 2);

        let window = PageWindow::compute(1, 20, 0);
        assert_eq!(window.total_pages, 0);
    }
}
