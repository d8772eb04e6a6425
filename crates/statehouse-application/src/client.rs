//! Top-level catalog client.
//!
//! Wires the transport, the shared store, and the three stateful services
//! together for the embedding environment. All shared state is constructed
//! here and passed by reference into the components that use it; nothing is
//! an ambient singleton.

use std::sync::Arc;
use tokio::sync::RwLock;

use statehouse_client::api::CatalogApi;
use statehouse_core::error::Result;
use statehouse_core::preferences::PreferenceRepository;
use statehouse_infrastructure::TomlPreferenceStore;

use crate::filters::FilterController;
use crate::mutation::MutationManager;
use crate::store::BillStore;
use crate::sync::SyncOrchestrator;

/// A connected catalog client for one jurisdiction and user.
pub struct CatalogClient {
    store: Arc<RwLock<BillStore>>,
    sync: SyncOrchestrator,
    mutations: MutationManager,
    filters: FilterController,
}

impl CatalogClient {
    /// Connects over HTTP with file-backed preferences.
    pub async fn connect(
        base_url: impl Into<String>,
        jurisdiction: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self> {
        let api = Arc::new(CatalogApi::http(base_url));
        let preferences: Arc<dyn PreferenceRepository> = Arc::new(TomlPreferenceStore::new()?);
        Ok(Self::assemble(api, preferences, jurisdiction, user_id).await)
    }

    /// Assembles a client from explicit parts. Tests inject a scripted
    /// transport and in-memory preferences here.
    pub async fn assemble(
        api: Arc<CatalogApi>,
        preferences: Arc<dyn PreferenceRepository>,
        jurisdiction: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let store = Arc::new(RwLock::new(BillStore::new()));
        let sync = SyncOrchestrator::new(api.clone(), store.clone(), jurisdiction);
        let mutations = MutationManager::new(api, store.clone(), user_id);
        let filters = FilterController::load(store.clone(), preferences).await;
        Self {
            store,
            sync,
            mutations,
            filters,
        }
    }

    pub fn store(&self) -> &Arc<RwLock<BillStore>> {
        &self.store
    }

    pub fn sync(&self) -> &SyncOrchestrator {
        &self.sync
    }

    pub fn mutations(&self) -> &MutationManager {
        &self.mutations
    }

    pub fn filters(&self) -> &FilterController {
        &self.filters
    }
}
