//! Optimistic mutation manager.
//!
//! User edits land on the local record synchronously, then a confirmation
//! request goes to the backend. Each mutation is a small state machine:
//! the local write happens on entry to `Pending`, and the call settles as
//! either `Confirmed` or `RolledBack` with the exact prior value restored.
//! No two mutations on the same `(bill, field)` pair may be in flight at
//! once; a second attempt is rejected before it touches local state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use statehouse_client::api::CatalogApi;
use statehouse_core::bill::Category;
use statehouse_core::error::{CatalogError, Result};

use crate::store::BillStore;

/// The mutable fields a user can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationField {
    Category,
    Highlight,
    Reviewed,
}

impl MutationField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationField::Category => "category",
            MutationField::Highlight => "highlight",
            MutationField::Reviewed => "reviewed",
        }
    }
}

/// Lifecycle of one mutation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationPhase {
    /// Local value written, confirmation in flight.
    Pending,
    /// Backend accepted (or reported the change as already applied).
    Confirmed,
    /// Backend rejected; the prior value has been restored.
    RolledBack,
}

/// Applies user edits optimistically and reconciles them with the backend.
pub struct MutationManager {
    api: Arc<CatalogApi>,
    store: Arc<RwLock<BillStore>>,
    user_id: String,
    in_flight: Arc<Mutex<HashSet<(String, MutationField)>>>,
}

impl MutationManager {
    pub fn new(
        api: Arc<CatalogApi>,
        store: Arc<RwLock<BillStore>>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            user_id: user_id.into(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Re-categorizes a bill. On rejection the record reverts to the prior
    /// category, which is always a normalized value because raw upstream
    /// strings never reach the stored record.
    pub async fn set_category(&self, bill_id: &str, category: Category) -> Result<()> {
        let _ticket = self.admit(bill_id, MutationField::Category)?;

        let prior = {
            let mut store = self.store.write().await;
            let bill = store.bill_mut(bill_id).ok_or_else(|| {
                CatalogError::mutation("category", bill_id, "bill is not in the local window")
            })?;
            let prior = bill.category;
            bill.category = category;
            prior
        };
        self.trace_phase(bill_id, MutationField::Category, MutationPhase::Pending);

        let outcome = self
            .api
            .update_category(bill_id, category, &self.user_id)
            .await;
        match outcome {
            Ok(ack) if ack.success => {
                self.trace_phase(bill_id, MutationField::Category, MutationPhase::Confirmed);
                Ok(())
            }
            Ok(ack) => {
                self.rollback_category(bill_id, prior).await;
                Err(CatalogError::mutation(
                    "category",
                    bill_id,
                    ack.message.unwrap_or_else(|| "rejected by backend".to_string()),
                ))
            }
            Err(err) => {
                self.rollback_category(bill_id, prior).await;
                Err(CatalogError::mutation("category", bill_id, err.to_string()))
            }
        }
    }

    /// Adds or removes a highlight. A `409 Conflict` on add means the
    /// highlight already exists server-side; the intent is satisfied, so it
    /// counts as success and the local state is kept. A `404` on remove is
    /// the symmetric case.
    pub async fn set_highlight(&self, bill_id: &str, highlighted: bool) -> Result<()> {
        let _ticket = self.admit(bill_id, MutationField::Highlight)?;

        let prior = self.store.write().await.set_highlighted(bill_id, highlighted);
        self.trace_phase(bill_id, MutationField::Highlight, MutationPhase::Pending);

        let outcome = if highlighted {
            self.api.add_highlight(&self.user_id, bill_id).await.map(|_| ())
        } else {
            self.api.remove_highlight(&self.user_id, bill_id).await
        };

        match outcome {
            Ok(()) => {
                self.trace_phase(bill_id, MutationField::Highlight, MutationPhase::Confirmed);
                Ok(())
            }
            Err(err) if highlighted && err.status() == Some(409) => {
                tracing::debug!(
                    "[MutationManager] Highlight for '{}' already present upstream",
                    bill_id
                );
                self.trace_phase(bill_id, MutationField::Highlight, MutationPhase::Confirmed);
                Ok(())
            }
            Err(err) if !highlighted && err.status() == Some(404) => {
                tracing::debug!(
                    "[MutationManager] Highlight for '{}' already absent upstream",
                    bill_id
                );
                self.trace_phase(bill_id, MutationField::Highlight, MutationPhase::Confirmed);
                Ok(())
            }
            Err(err) => {
                self.store.write().await.set_highlighted(bill_id, prior);
                self.trace_phase(bill_id, MutationField::Highlight, MutationPhase::RolledBack);
                Err(CatalogError::mutation("highlight", bill_id, err.to_string()))
            }
        }
    }

    /// Toggles the reviewed flag. Duplicate toggles already applied
    /// server-side (`409`) count as success.
    pub async fn set_reviewed(&self, bill_id: &str, reviewed: bool) -> Result<()> {
        let _ticket = self.admit(bill_id, MutationField::Reviewed)?;

        let prior = self.store.write().await.set_reviewed(bill_id, reviewed);
        self.trace_phase(bill_id, MutationField::Reviewed, MutationPhase::Pending);

        match self.api.update_reviewed(bill_id, reviewed, &self.user_id).await {
            Ok(ack) if ack.success => {
                self.trace_phase(bill_id, MutationField::Reviewed, MutationPhase::Confirmed);
                Ok(())
            }
            Err(err) if err.status() == Some(409) => {
                self.trace_phase(bill_id, MutationField::Reviewed, MutationPhase::Confirmed);
                Ok(())
            }
            Ok(ack) => {
                self.store.write().await.set_reviewed(bill_id, prior);
                self.trace_phase(bill_id, MutationField::Reviewed, MutationPhase::RolledBack);
                Err(CatalogError::mutation(
                    "reviewed",
                    bill_id,
                    ack.message.unwrap_or_else(|| "rejected by backend".to_string()),
                ))
            }
            Err(err) => {
                self.store.write().await.set_reviewed(bill_id, prior);
                self.trace_phase(bill_id, MutationField::Reviewed, MutationPhase::RolledBack);
                Err(CatalogError::mutation("reviewed", bill_id, err.to_string()))
            }
        }
    }

    async fn rollback_category(&self, bill_id: &str, prior: Category) {
        let mut store = self.store.write().await;
        if let Some(bill) = store.bill_mut(bill_id) {
            bill.category = prior;
        }
        self.trace_phase(bill_id, MutationField::Category, MutationPhase::RolledBack);
    }

    /// Admits a mutation for `(bill, field)`, rejecting it when another is
    /// still in flight for the same pair. The returned ticket releases the
    /// slot on drop, on every exit path.
    fn admit(&self, bill_id: &str, field: MutationField) -> Result<InFlightTicket> {
        let key = (bill_id.to_string(), field);
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(key.clone()) {
            return Err(CatalogError::mutation(
                field.as_str(),
                bill_id,
                "another edit of this field is still awaiting confirmation",
            ));
        }
        Ok(InFlightTicket {
            set: Arc::clone(&self.in_flight),
            key,
        })
    }

    fn trace_phase(&self, bill_id: &str, field: MutationField, phase: MutationPhase) {
        tracing::debug!(
            "[MutationManager] {} on '{}': {:?}",
            field.as_str(),
            bill_id,
            phase
        );
    }
}

struct InFlightTicket {
    set: Arc<Mutex<HashSet<(String, MutationField)>>>,
    key: (String, MutationField),
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use statehouse_client::cache::RequestCache;
    use statehouse_client::request::{ApiRequest, JsonResponse};
    use statehouse_client::transport::CatalogTransport;
    use statehouse_core::bill::{Bill, Stage};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn bill(id: &str, category: Category) -> Bill {
        Bill {
            id: id.to_string(),
            id_stable: true,
            title: format!("Bill {id}"),
            bill_number: None,
            jurisdiction: "tx".to_string(),
            raw_status: None,
            status_stage: Stage::Introduced,
            category,
            summary: String::new(),
            introduced_date: None,
            last_action_date: None,
            session_id: None,
            session_name: None,
            reviewed: false,
            source_url: None,
        }
    }

    /// Transport that answers every call with a fixed status.
    struct FixedStatusTransport {
        status: u16,
        body: Value,
    }

    #[async_trait]
    impl CatalogTransport for FixedStatusTransport {
        async fn send(
            &self,
            _request: &ApiRequest,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> statehouse_core::error::Result<JsonResponse> {
            if (200..300).contains(&self.status) {
                Ok(JsonResponse {
                    status: self.status,
                    body: self.body.clone(),
                })
            } else {
                Err(CatalogError::http_status(self.status, "scripted failure"))
            }
        }
    }

    /// Transport that parks until released, for in-flight overlap tests.
    struct ParkedTransport {
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl CatalogTransport for ParkedTransport {
        async fn send(
            &self,
            _request: &ApiRequest,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> statehouse_core::error::Result<JsonResponse> {
            self.release.notified().await;
            Ok(JsonResponse {
                status: 200,
                body: json!({"success": true}),
            })
        }
    }

    fn manager_with(
        transport: Arc<dyn CatalogTransport>,
        bills: Vec<Bill>,
    ) -> (MutationManager, Arc<RwLock<BillStore>>) {
        let store = Arc::new(RwLock::new(BillStore::new()));
        {
            let mut guard = store.try_write().unwrap();
            guard.replace_window(bills);
        }
        let api = Arc::new(
            CatalogApi::new(transport).with_cache(RequestCache::with_ttl(Duration::ZERO)),
        );
        (MutationManager::new(api, store.clone(), "user-1"), store)
    }

    #[tokio::test]
    async fn test_category_applies_before_confirmation_and_sticks_on_success() {
        let transport = Arc::new(FixedStatusTransport {
            status: 200,
            body: json!({"success": true}),
        });
        let (manager, store) = manager_with(transport, vec![bill("a", Category::Civic)]);

        manager.set_category("a", Category::Education).await.unwrap();
        assert_eq!(
            store.read().await.bill("a").unwrap().category,
            Category::Education
        );
    }

    #[tokio::test]
    async fn test_category_rolls_back_exactly_on_failure() {
        let transport = Arc::new(FixedStatusTransport {
            status: 500,
            body: json!({}),
        });
        let (manager, store) = manager_with(transport, vec![bill("a", Category::Healthcare)]);

        let err = manager
            .set_category("a", Category::Engineering)
            .await
            .unwrap_err();
        assert!(err.is_mutation());
        // The value after settling equals the value before the call.
        assert_eq!(
            store.read().await.bill("a").unwrap().category,
            Category::Healthcare
        );
    }

    #[tokio::test]
    async fn test_category_unsuccessful_ack_rolls_back() {
        let transport = Arc::new(FixedStatusTransport {
            status: 200,
            body: json!({"success": false, "message": "read-only demo"}),
        });
        let (manager, store) = manager_with(transport, vec![bill("a", Category::Civic)]);

        let err = manager
            .set_category("a", Category::Education)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("read-only demo"));
        assert_eq!(store.read().await.bill("a").unwrap().category, Category::Civic);
    }

    #[tokio::test]
    async fn test_highlight_conflict_counts_as_success() {
        let transport = Arc::new(FixedStatusTransport {
            status: 409,
            body: json!({}),
        });
        let (manager, store) = manager_with(transport, vec![bill("a", Category::Civic)]);

        manager.set_highlight("a", true).await.unwrap();
        assert!(store.read().await.is_highlighted("a"));
    }

    #[tokio::test]
    async fn test_highlight_failure_rolls_back_set_membership() {
        let transport = Arc::new(FixedStatusTransport {
            status: 500,
            body: json!({}),
        });
        let (manager, store) = manager_with(transport, vec![bill("a", Category::Civic)]);

        let err = manager.set_highlight("a", true).await.unwrap_err();
        assert!(err.is_mutation());
        assert!(!store.read().await.is_highlighted("a"));
    }

    #[tokio::test]
    async fn test_highlight_remove_404_counts_as_success() {
        let transport = Arc::new(FixedStatusTransport {
            status: 404,
            body: json!({}),
        });
        let (manager, store) = manager_with(transport, vec![bill("a", Category::Civic)]);
        store.write().await.set_highlighted("a", true);

        manager.set_highlight("a", false).await.unwrap();
        assert!(!store.read().await.is_highlighted("a"));
    }

    #[tokio::test]
    async fn test_reviewed_toggle_round_trip_and_rollback() {
        let transport = Arc::new(FixedStatusTransport {
            status: 200,
            body: json!({"success": true}),
        });
        let (manager, store) = manager_with(transport, vec![bill("a", Category::Civic)]);
        manager.set_reviewed("a", true).await.unwrap();
        assert!(store.read().await.bill("a").unwrap().reviewed);
        assert!(store.read().await.reviewed().contains("a"));

        let failing = Arc::new(FixedStatusTransport {
            status: 500,
            body: json!({}),
        });
        let (manager, store) = manager_with(failing, vec![bill("b", Category::Civic)]);
        let err = manager.set_reviewed("b", true).await.unwrap_err();
        assert!(err.is_mutation());
        assert!(!store.read().await.bill("b").unwrap().reviewed);
        assert!(!store.read().await.reviewed().contains("b"));
    }

    #[tokio::test]
    async fn test_second_mutation_on_same_field_is_rejected_while_pending() {
        let transport = Arc::new(ParkedTransport {
            release: tokio::sync::Notify::new(),
        });
        let (manager, _store) = manager_with(transport.clone(), vec![bill("a", Category::Civic)]);
        let manager = Arc::new(manager);

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.set_category("a", Category::Education).await })
        };
        tokio::task::yield_now().await;

        // Same (bill, field) pair: rejected without touching local state.
        let err = manager
            .set_category("a", Category::Healthcare)
            .await
            .unwrap_err();
        assert!(err.is_mutation());

        // A different field on the same bill is independent.
        let parked = manager.set_reviewed("a", true);
        tokio::pin!(parked);
        assert!(
            poll_briefly(&mut parked).await.is_none(),
            "independent field should be admitted, not rejected"
        );

        transport.release.notify_waiters();
        first.await.unwrap().unwrap();
        parked.await.unwrap();
    }

    /// Polls a future briefly; None means it is still pending.
    async fn poll_briefly<F: Future + Unpin>(future: &mut F) -> Option<F::Output> {
        tokio::select! {
            output = future => Some(output),
            _ = tokio::time::sleep(Duration::from_millis(20)) => None,
        }
    }
}
