//! In-memory bill collection and its satellite sets.
//!
//! `BillStore` is the single owner of all shared catalog state: the
//! canonical bill window, the session descriptor map, the highlight and
//! reviewed sets, and the server-reported total. The sync orchestrator and
//! the mutation manager mutate it through an `Arc<RwLock<BillStore>>`; the
//! filter pipeline and the presentation layer only read.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use statehouse_core::bill::{Bill, LegislativeSession};

/// Shared catalog state for one jurisdiction.
#[derive(Debug, Default)]
pub struct BillStore {
    bills: Vec<Bill>,
    sessions: HashMap<String, LegislativeSession>,
    /// Session names that came from the sessions endpoint. Bill-observed
    /// sessions are only added when their name is not in this set.
    endpoint_session_names: HashSet<String>,
    highlights: HashSet<String>,
    reviewed: HashSet<String>,
    server_total: Option<usize>,
}

impl BillStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================================
    // Bill window
    // ============================================================================

    pub fn bills(&self) -> &[Bill] {
        &self.bills
    }

    pub fn bill(&self, id: &str) -> Option<&Bill> {
        self.bills.iter().find(|bill| bill.id == id)
    }

    pub fn bill_mut(&mut self, id: &str) -> Option<&mut Bill> {
        self.bills.iter_mut().find(|bill| bill.id == id)
    }

    /// Replaces the whole local window with a freshly fetched one. The
    /// reviewed set survives re-fetches and is re-applied to the incoming
    /// records.
    pub fn replace_window(&mut self, mut bills: Vec<Bill>) {
        for bill in &mut bills {
            if self.reviewed.contains(&bill.id) {
                bill.reviewed = true;
            } else if bill.reviewed {
                // Server-side reviewed state observed on fetch; mirror it.
                self.reviewed.insert(bill.id.clone());
            }
        }
        self.bills = bills;
    }

    pub fn server_total(&self) -> Option<usize> {
        self.server_total
    }

    pub fn set_server_total(&mut self, total: Option<usize>) {
        self.server_total = total;
    }

    /// The most recent effective date across the local window, used as the
    /// incremental-fetch cursor hint.
    pub fn latest_known_date(&self) -> Option<NaiveDate> {
        self.bills.iter().filter_map(Bill::effective_date).max()
    }

    // ============================================================================
    // Session descriptors
    // ============================================================================

    pub fn sessions(&self) -> &HashMap<String, LegislativeSession> {
        &self.sessions
    }

    /// Merges descriptors sourced from the sessions endpoint. These are
    /// authoritative: they always land, and their names suppress
    /// bill-observed duplicates.
    pub fn insert_endpoint_sessions(&mut self, descriptors: Vec<LegislativeSession>) {
        for descriptor in descriptors {
            self.endpoint_session_names
                .insert(descriptor.session_name.clone());
            self.sessions
                .insert(descriptor.session_id.clone(), descriptor);
        }
    }

    /// Records a session observed embedded in a bill. Added only when the
    /// endpoint-sourced set does not already carry the name.
    pub fn observe_bill_session(&mut self, bill: &Bill) {
        let (Some(id), Some(name)) = (&bill.session_id, &bill.session_name) else {
            return;
        };
        if self.endpoint_session_names.contains(name) {
            return;
        }
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| LegislativeSession {
                session_id: id.clone(),
                session_name: name.clone(),
                year_start: None,
                year_end: None,
                is_active: false,
            });
    }

    // ============================================================================
    // Highlight / reviewed sets
    // ============================================================================

    pub fn highlights(&self) -> &HashSet<String> {
        &self.highlights
    }

    pub fn is_highlighted(&self, id: &str) -> bool {
        self.highlights.contains(id)
    }

    pub fn set_highlighted(&mut self, id: &str, highlighted: bool) -> bool {
        let was = self.highlights.contains(id);
        if highlighted {
            self.highlights.insert(id.to_string());
        } else {
            self.highlights.remove(id);
        }
        was
    }

    pub fn reviewed(&self) -> &HashSet<String> {
        &self.reviewed
    }

    /// Sets the reviewed state on both the set and the bill record, and
    /// returns the prior state.
    pub fn set_reviewed(&mut self, id: &str, reviewed: bool) -> bool {
        let was = self.reviewed.contains(id);
        if reviewed {
            self.reviewed.insert(id.to_string());
        } else {
            self.reviewed.remove(id);
        }
        if let Some(bill) = self.bill_mut(id) {
            bill.reviewed = reviewed;
        }
        was
    }
}
