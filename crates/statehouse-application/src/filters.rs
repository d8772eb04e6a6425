//! Filter state controller.
//!
//! Owns the session-local [`FilterState`], persists the one durable piece
//! of it (the highlight-only flag) through the preference repository, and
//! runs the pure pipeline against the shared store to produce pages. All
//! derivation is delegated to `statehouse_core::filter`; this type only
//! owns state and wiring.

use std::sync::Arc;
use tokio::sync::RwLock;

use statehouse_core::bill::{Bill, Category, Stage};
use statehouse_core::error::Result;
use statehouse_core::filter::model::{FilterState, PageWindow, SortOrder};
use statehouse_core::filter::pipeline::{run_pipeline, DEFAULT_PAGE_SIZE};
use statehouse_core::preferences::PreferenceRepository;

use crate::store::BillStore;

/// One page of bills with its pagination window, detached from the store
/// lock so the presentation layer can hold it freely.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub items: Vec<Bill>,
    pub window: PageWindow,
}

/// Holds the current filter selection and derives catalog pages from it.
pub struct FilterController {
    store: Arc<RwLock<BillStore>>,
    preferences: Arc<dyn PreferenceRepository>,
    state: RwLock<FilterState>,
    per_page: usize,
}

impl FilterController {
    /// Creates a controller, restoring the persisted highlight-only flag.
    pub async fn load(
        store: Arc<RwLock<BillStore>>,
        preferences: Arc<dyn PreferenceRepository>,
    ) -> Self {
        let state = FilterState {
            highlight_only: preferences.highlight_only().await,
            ..Default::default()
        };
        Self {
            store,
            preferences,
            state: RwLock::new(state),
            per_page: DEFAULT_PAGE_SIZE,
        }
    }

    pub async fn state(&self) -> FilterState {
        self.state.read().await.clone()
    }

    pub async fn set_category_filters(&self, categories: impl IntoIterator<Item = Category>) {
        self.state.write().await.category_filters = categories.into_iter().collect();
    }

    pub async fn set_status_filter(&self, stage: Option<Stage>) {
        self.state.write().await.status_filter = stage;
    }

    pub async fn set_session_filters(&self, session_ids: impl IntoIterator<Item = String>) {
        self.state.write().await.session_filters = session_ids.into_iter().collect();
    }

    pub async fn set_sort_order(&self, order: SortOrder) {
        self.state.write().await.sort_order = order;
    }

    /// Toggles the highlight-only filter and persists the new value.
    /// Returns the value now in effect.
    pub async fn toggle_highlight_only(&self) -> Result<bool> {
        let enabled = {
            let mut state = self.state.write().await;
            state.highlight_only = !state.highlight_only;
            state.highlight_only
        };
        self.preferences.set_highlight_only(enabled).await?;
        Ok(enabled)
    }

    /// Runs the pipeline for the requested 1-indexed page.
    pub async fn page(&self, page: usize) -> CatalogPage {
        let state = self.state.read().await.clone();
        let store = self.store.read().await;
        let view = run_pipeline(
            store.bills(),
            &state,
            store.highlights(),
            store.sessions(),
            page,
            self.per_page,
            store.server_total(),
        );
        CatalogPage {
            items: view.items.into_iter().cloned().collect(),
            window: view.window,
        }
    }
}
