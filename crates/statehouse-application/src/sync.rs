//! Synchronization orchestrator.
//!
//! Drives the three fetch strategies against the upstream catalog: windowed
//! page reads, incremental "newer than" fetches, and resumable
//! reconciliation of missing records. Each strategy has its own loading
//! guard; a combined busy signal lets the embedding environment warn the
//! user before navigating away mid-fetch.

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, watch};

use statehouse_client::api::CatalogApi;
use statehouse_core::bill::Bill;
use statehouse_core::classify::classify;
use statehouse_core::error::{CatalogError, Result};
use statehouse_core::normalize::{derive_id, normalize_category, normalize_title};

use crate::store::BillStore;

/// Records requested per windowed fetch.
pub const WINDOW_PAGE_SIZE: u32 = 20;

/// Records the upstream ingests per incremental fetch.
pub const INCREMENTAL_FETCH_LIMIT: u32 = 50;

/// Result of a fetch attempt: either the strategy ran, or a fetch of the
/// same class was already in flight and the call was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Fetched(T),
    InFlight,
}

impl<T> FetchOutcome<T> {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, FetchOutcome::InFlight)
    }

    pub fn fetched(self) -> Option<T> {
        match self {
            FetchOutcome::Fetched(value) => Some(value),
            FetchOutcome::InFlight => None,
        }
    }
}

/// Summary of one windowed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub page: u32,
    pub received: usize,
    pub total: Option<usize>,
    pub total_pages: Option<u32>,
}

/// Summary of one incremental fetch. `found` counts records the upstream
/// search matched; `newly_processed` counts the subset it actually
/// ingested. `found > 0` with `newly_processed == 0` means everything was
/// already present, which is a different success state than an empty match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalReport {
    pub found: u64,
    pub newly_processed: u64,
    pub most_recent_date_before: Option<String>,
}

/// Summary of one reconciliation batch. `remaining > 0` means the caller
/// should invoke the operation again to resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub upstream_total: u64,
    pub existing: u64,
    pub missing: u64,
    pub processed: u64,
    pub remaining: u64,
}

/// Orchestrates fetches for one jurisdiction against one shared store.
pub struct SyncOrchestrator {
    api: Arc<CatalogApi>,
    store: Arc<RwLock<BillStore>>,
    jurisdiction: String,
    window_in_flight: AtomicBool,
    incremental_in_flight: AtomicBool,
    reconcile_in_flight: AtomicBool,
    busy_tx: watch::Sender<bool>,
}

impl SyncOrchestrator {
    pub fn new(
        api: Arc<CatalogApi>,
        store: Arc<RwLock<BillStore>>,
        jurisdiction: impl Into<String>,
    ) -> Self {
        let (busy_tx, _) = watch::channel(false);
        Self {
            api,
            store,
            jurisdiction: jurisdiction.into(),
            window_in_flight: AtomicBool::new(false),
            incremental_in_flight: AtomicBool::new(false),
            reconcile_in_flight: AtomicBool::new(false),
            busy_tx,
        }
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    /// Whether any fetch strategy is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.window_in_flight.load(Ordering::SeqCst)
            || self.incremental_in_flight.load(Ordering::SeqCst)
            || self.reconcile_in_flight.load(Ordering::SeqCst)
    }

    /// Busy-signal receiver for the embedding environment. Fires on every
    /// guard acquire/release.
    pub fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.busy_tx.subscribe()
    }

    /// The warning to surface when the user tries to navigate away while a
    /// fetch is in flight. Cancellation intent only, never a hard block.
    pub fn navigation_warning(&self) -> Option<&'static str> {
        self.is_busy()
            .then_some("A sync is still running; leaving now may lose its results.")
    }

    fn guards(&self) -> [&AtomicBool; 3] {
        [
            &self.window_in_flight,
            &self.incremental_in_flight,
            &self.reconcile_in_flight,
        ]
    }

    // ============================================================================
    // Windowed fetch
    // ============================================================================

    /// Fetches one page of the catalog and replaces the local window with
    /// its normalized records.
    pub async fn fetch_page(&self, page: u32) -> Result<FetchOutcome<PageSummary>> {
        let Some(_guard) = LoadingGuard::try_acquire(&self.window_in_flight, &self.busy_tx, self.guards())
        else {
            tracing::debug!("[SyncOrchestrator] Windowed fetch already in flight; refusing");
            return Ok(FetchOutcome::InFlight);
        };

        let bill_page = self
            .api
            .fetch_page(&self.jurisdiction, page, WINDOW_PAGE_SIZE)
            .await?;

        let mut bills = Vec::with_capacity(bill_page.records.len());
        let mut unstable = 0usize;
        for raw in &bill_page.records {
            let bill = canonical_bill(raw, &self.jurisdiction);
            if !bill.id_stable {
                unstable += 1;
            }
            bills.push(bill);
        }
        if unstable > 0 {
            tracing::warn!(
                "[SyncOrchestrator] {} record(s) on page {} lack a stable id; \
                 edits to them will not survive a re-fetch",
                unstable,
                page
            );
        }

        let received = bills.len();
        let total = bill_page.total.map(|t| t as usize);
        {
            let mut store = self.store.write().await;
            for bill in &bills {
                store.observe_bill_session(bill);
            }
            store.set_server_total(total);
            store.replace_window(bills);
        }

        tracing::info!(
            "[SyncOrchestrator] Page {} loaded: {} record(s), upstream total {:?}",
            page,
            received,
            total
        );
        Ok(FetchOutcome::Fetched(PageSummary {
            page,
            received,
            total,
            total_pages: bill_page.total_pages,
        }))
    }

    // ============================================================================
    // Incremental fetch
    // ============================================================================

    /// Asks the upstream to ingest records newer than its most recent known
    /// date, then refreshes the first page when anything new landed.
    pub async fn fetch_recent(&self) -> Result<FetchOutcome<IncrementalReport>> {
        let Some(_guard) =
            LoadingGuard::try_acquire(&self.incremental_in_flight, &self.busy_tx, self.guards())
        else {
            tracing::debug!("[SyncOrchestrator] Incremental fetch already in flight; refusing");
            return Ok(FetchOutcome::InFlight);
        };

        let local_cursor = self.store.read().await.latest_known_date();
        tracing::debug!(
            "[SyncOrchestrator] Incremental fetch for {}; most recent local date {:?}",
            self.jurisdiction,
            local_cursor
        );

        let response = self
            .api
            .fetch_recent(&self.jurisdiction, INCREMENTAL_FETCH_LIMIT, true)
            .await?;
        if !response.success {
            return Err(CatalogError::internal(format!(
                "upstream rejected incremental fetch for {}",
                self.jurisdiction
            )));
        }

        // found == 0 and found > 0 with nothing processed are distinct
        // success states; the caller words them differently.
        if response.bills_found == 0 {
            tracing::info!("[SyncOrchestrator] Incremental fetch found no new bills");
        } else if response.bills_processed == 0 {
            tracing::info!(
                "[SyncOrchestrator] Incremental fetch matched {} bill(s), all already present",
                response.bills_found
            );
        } else {
            tracing::info!(
                "[SyncOrchestrator] Incremental fetch processed {} of {} bill(s)",
                response.bills_processed,
                response.bills_found
            );
        }

        if response.bills_processed > 0 {
            self.refresh_first_page().await;
        }

        Ok(FetchOutcome::Fetched(IncrementalReport {
            found: response.bills_found,
            newly_processed: response.bills_processed,
            most_recent_date_before: response.most_recent_date_before,
        }))
    }

    // ============================================================================
    // Reconciliation fetch
    // ============================================================================

    /// Closes one bounded batch of the gap between upstream and local
    /// record sets. Idempotent: invoking it with no remaining work is a
    /// no-op success. `remaining > 0` in the report means the caller should
    /// call again to resume.
    pub async fn check_for_updates(&self) -> Result<FetchOutcome<ReconciliationReport>> {
        let Some(_guard) =
            LoadingGuard::try_acquire(&self.reconcile_in_flight, &self.busy_tx, self.guards())
        else {
            tracing::debug!("[SyncOrchestrator] Reconciliation already in flight; refusing");
            return Ok(FetchOutcome::InFlight);
        };

        let response = self.api.check_and_update(&self.jurisdiction).await?;
        if !response.success {
            return Err(CatalogError::internal(format!(
                "upstream rejected reconciliation for {}",
                self.jurisdiction
            )));
        }

        tracing::info!(
            "[SyncOrchestrator] Reconciliation: upstream {} / local {} / missing {}; \
             processed {}, {} remaining",
            response.api_bills_found,
            response.existing_bills,
            response.missing_bills,
            response.processed_bills,
            response.remaining_bills
        );

        if response.processed_bills > 0 {
            self.refresh_first_page().await;
        }

        Ok(FetchOutcome::Fetched(ReconciliationReport {
            upstream_total: response.api_bills_found,
            existing: response.existing_bills,
            missing: response.missing_bills,
            processed: response.processed_bills,
            remaining: response.remaining_bills,
        }))
    }

    // ============================================================================
    // Session descriptors
    // ============================================================================

    /// Loads session descriptors for this jurisdiction into the store.
    pub async fn load_sessions(&self, include_all_sessions: bool) -> Result<usize> {
        let by_jurisdiction = self
            .api
            .session_status(&[self.jurisdiction.as_str()], include_all_sessions)
            .await?;

        let mut store = self.store.write().await;
        for (_, descriptors) in by_jurisdiction {
            store.insert_endpoint_sessions(descriptors);
        }
        Ok(store.sessions().len())
    }

    /// Re-runs the windowed fetch for page 1 to pull freshly ingested
    /// records into the local window. Skipped when a windowed fetch is
    /// already in flight; errors here never mask the triggering strategy's
    /// own success.
    async fn refresh_first_page(&self) {
        match self.fetch_page(1).await {
            Ok(FetchOutcome::Fetched(_)) => {}
            Ok(FetchOutcome::InFlight) => {
                tracing::debug!(
                    "[SyncOrchestrator] Skipping post-sync refresh; windowed fetch in flight"
                );
            }
            Err(err) => {
                tracing::warn!("[SyncOrchestrator] Post-sync refresh failed: {}", err);
            }
        }
    }
}

/// RAII guard for a fetch-class loading flag. Updates the combined busy
/// signal on acquire and release.
struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
    busy_tx: &'a watch::Sender<bool>,
    all: [&'a AtomicBool; 3],
}

impl<'a> LoadingGuard<'a> {
    fn try_acquire(
        flag: &'a AtomicBool,
        busy_tx: &'a watch::Sender<bool>,
        all: [&'a AtomicBool; 3],
    ) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        let _ = busy_tx.send(true);
        Some(Self { flag, busy_tx, all })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        let still_busy = self.all.iter().any(|flag| flag.load(Ordering::SeqCst));
        let _ = self.busy_tx.send(still_busy);
    }
}

// ============================================================================
// Record normalization
// ============================================================================

/// Builds a canonical [`Bill`] from one raw upstream record. Every dirty
/// field goes through the normalizer; the stage is always recomputed from
/// the raw status.
pub fn canonical_bill(raw: &Value, jurisdiction: &str) -> Bill {
    let derived = derive_id(raw, jurisdiction);
    let raw_status = string_field(raw, &["status", "rawStatus", "status_text"]);
    let status_stage = classify(raw_status.as_deref());
    let category = string_field(raw, &["category"])
        .map(|value| normalize_category(&value))
        .unwrap_or_default();
    let title = string_field(raw, &["title"])
        .map(|value| normalize_title(&value))
        .unwrap_or_else(|| "Untitled Bill".to_string());

    Bill {
        id: derived.id,
        id_stable: derived.stable,
        title,
        bill_number: string_field(raw, &["billNumber", "bill_number"]),
        jurisdiction: string_field(raw, &["jurisdiction"])
            .unwrap_or_else(|| jurisdiction.to_string()),
        raw_status,
        status_stage,
        category,
        summary: string_field(raw, &["summary", "description"]).unwrap_or_default(),
        introduced_date: date_field(raw, &["introducedDate", "introduced_date"]),
        last_action_date: date_field(raw, &["lastActionDate", "last_action_date"]),
        session_id: string_field(raw, &["sessionId", "session_id"]),
        session_name: string_field(raw, &["sessionName", "session_name"]),
        reviewed: raw
            .get("reviewed")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        source_url: string_field(raw, &["sourceUrl", "source_url", "url"]),
    }
}

fn string_field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
}

/// Parses a date field, tolerating full timestamps by reading only the
/// leading `YYYY-MM-DD`. Unparseable input reads as missing.
fn date_field(raw: &Value, keys: &[&str]) -> Option<chrono::NaiveDate> {
    let value = string_field(raw, keys)?;
    let prefix = value.get(..10)?;
    prefix.parse().ok()
}
