//! Typed surface over the upstream catalog API.
//!
//! One method per upstream endpoint, every call routed through the request
//! cache and the bounded transport. List reads tolerate the three envelope
//! shapes the backend has shipped over time.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use statehouse_core::bill::{Category, LegislativeSession};
use statehouse_core::error::{CatalogError, Result};

use crate::cache::RequestCache;
use crate::request::{ApiRequest, CallClass, JsonResponse};
use crate::transport::{CatalogTransport, HttpTransport};

/// One page of raw bill records plus whatever pagination metadata the
/// envelope carried.
#[derive(Debug, Clone)]
pub struct BillPage {
    pub records: Vec<Value>,
    pub total: Option<u64>,
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
}

/// Response of the incremental fetch endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRecentResponse {
    pub success: bool,
    #[serde(default)]
    pub bills_found: u64,
    #[serde(default)]
    pub bills_processed: u64,
    pub most_recent_date_before: Option<String>,
    pub search_query_used: Option<String>,
}

/// Response of the reconciliation endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAndUpdateResponse {
    pub success: bool,
    #[serde(default)]
    pub api_bills_found: u64,
    #[serde(default)]
    pub existing_bills: u64,
    #[serde(default)]
    pub missing_bills: u64,
    #[serde(default)]
    pub processed_bills: u64,
    #[serde(default)]
    pub remaining_bills: u64,
}

/// Acknowledgement body shared by the mutation endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MutationAck {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatusResponse {
    #[allow(dead_code)]
    success: bool,
    #[serde(default)]
    active_sessions: HashMap<String, Vec<LegislativeSession>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchRecentRequest<'a> {
    jurisdiction: &'a str,
    limit: u32,
    enhanced_analysis: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HighlightRequest<'a> {
    user_id: &'a str,
    order_id: &'a str,
    order_type: &'a str,
}

/// Client for the upstream catalog API.
///
/// Owns the request cache; the transport is injected so tests can count and
/// script network calls.
pub struct CatalogApi {
    transport: Arc<dyn CatalogTransport>,
    cache: RequestCache,
}

impl CatalogApi {
    /// Creates an API client over an arbitrary transport.
    pub fn new(transport: Arc<dyn CatalogTransport>) -> Self {
        Self {
            transport,
            cache: RequestCache::new(),
        }
    }

    /// Convenience constructor over HTTP.
    pub fn http(base_url: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpTransport::new(base_url)))
    }

    /// Replaces the request cache (tests shrink the TTL).
    pub fn with_cache(mut self, cache: RequestCache) -> Self {
        self.cache = cache;
        self
    }

    async fn execute(&self, request: ApiRequest, class: CallClass) -> Result<JsonResponse> {
        self.execute_bounded(request, class.timeout(), &CancellationToken::new())
            .await
    }

    /// Executes a request through the cache with an explicit bound and
    /// cancellation token.
    pub async fn execute_bounded(
        &self,
        request: ApiRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<JsonResponse> {
        let key = request.cache_key();
        self.cache
            .execute(&key, || self.transport.send(&request, timeout, cancel))
            .await
    }

    /// Fetches one page of the catalog for a jurisdiction.
    pub async fn fetch_page(
        &self,
        jurisdiction: &str,
        page: u32,
        per_page: u32,
    ) -> Result<BillPage> {
        let request = ApiRequest::get("/state-legislation")
            .with_query("jurisdiction", jurisdiction)
            .with_query("page", page)
            .with_query("perPage", per_page);
        let response = self.execute(request, CallClass::Interactive).await?;
        extract_bill_page(&response.body)
    }

    /// Asks the upstream to ingest records newer than its most recent known
    /// date for the jurisdiction.
    pub async fn fetch_recent(
        &self,
        jurisdiction: &str,
        limit: u32,
        enhanced_analysis: bool,
    ) -> Result<FetchRecentResponse> {
        let body = serde_json::to_value(FetchRecentRequest {
            jurisdiction,
            limit,
            enhanced_analysis,
        })?;
        let request = ApiRequest::post("/legiscan/fetch-recent", body);
        let response = self.execute(request, CallClass::Bulk).await?;
        response.parse()
    }

    /// Asks the upstream to process one bounded batch of records it has
    /// that the local collection is missing.
    pub async fn check_and_update(&self, jurisdiction: &str) -> Result<CheckAndUpdateResponse> {
        let request = ApiRequest::post(
            "/legiscan/check-and-update",
            json!({ "jurisdiction": jurisdiction }),
        );
        let response = self.execute(request, CallClass::Bulk).await?;
        response.parse()
    }

    /// Confirms a category edit.
    pub async fn update_category(
        &self,
        bill_id: &str,
        category: Category,
        user_id: &str,
    ) -> Result<MutationAck> {
        let request = ApiRequest::patch(
            format!("/state-legislation/{bill_id}/category"),
            json!({ "category": category.to_string(), "userId": user_id }),
        );
        let response = self.execute(request, CallClass::Interactive).await?;
        response.parse()
    }

    /// Confirms a reviewed toggle.
    pub async fn update_reviewed(
        &self,
        bill_id: &str,
        reviewed: bool,
        user_id: &str,
    ) -> Result<MutationAck> {
        let request = ApiRequest::patch(
            format!("/state-legislation/{bill_id}/reviewed"),
            json!({ "reviewed": reviewed, "userId": user_id }),
        );
        let response = self.execute(request, CallClass::Interactive).await?;
        response.parse()
    }

    /// Confirms a highlight add. A 409 from the backend surfaces as
    /// `CatalogError::HttpStatus { status: 409, .. }`; the mutation layer
    /// treats it as success.
    pub async fn add_highlight(&self, user_id: &str, bill_id: &str) -> Result<MutationAck> {
        let body = serde_json::to_value(HighlightRequest {
            user_id,
            order_id: bill_id,
            order_type: "state-legislation",
        })?;
        let request = ApiRequest::post("/highlights", body);
        let response = self.execute(request, CallClass::Interactive).await?;
        response.parse()
    }

    /// Confirms a highlight removal.
    pub async fn remove_highlight(&self, user_id: &str, bill_id: &str) -> Result<()> {
        let request =
            ApiRequest::delete(format!("/highlights/{bill_id}")).with_query("userId", user_id);
        self.execute(request, CallClass::Interactive).await?;
        Ok(())
    }

    /// Loads session descriptors for the given jurisdictions.
    pub async fn session_status(
        &self,
        jurisdictions: &[&str],
        include_all_sessions: bool,
    ) -> Result<HashMap<String, Vec<LegislativeSession>>> {
        let request = ApiRequest::post(
            "/legiscan/session-status",
            json!({
                "jurisdictions": jurisdictions,
                "includeAllSessions": include_all_sessions,
            }),
        );
        let response = self.execute(request, CallClass::Interactive).await?;
        let parsed: SessionStatusResponse = response.parse()?;
        Ok(parsed.active_sessions)
    }
}

/// Extracts bill records from a list response, trying the tolerated envelope
/// shapes in fixed order: bare array, `{results, ...}`, `{data, ...}`.
pub fn extract_bill_page(body: &Value) -> Result<BillPage> {
    if let Value::Array(records) = body {
        return Ok(BillPage {
            records: records.clone(),
            total: None,
            page: None,
            total_pages: None,
        });
    }

    for key in ["results", "data"] {
        if let Some(Value::Array(records)) = body.get(key) {
            return Ok(BillPage {
                records: records.clone(),
                total: body.get("total").and_then(Value::as_u64),
                page: body.get("page").and_then(Value::as_u64).map(|p| p as u32),
                total_pages: body
                    .get("totalPages")
                    .and_then(Value::as_u64)
                    .map(|p| p as u32),
            });
        }
    }

    Err(CatalogError::UnrecognizedEnvelope(format!(
        "expected a bare array or a results/data envelope, got keys [{}]",
        body.as_object()
            .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_else(|| body.to_string())
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted transport that counts calls and replays a fixed body.
    struct ScriptedTransport {
        calls: AtomicUsize,
        body: Value,
    }

    impl ScriptedTransport {
        fn new(body: Value) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                body,
            }
        }
    }

    #[async_trait]
    impl CatalogTransport for ScriptedTransport {
        async fn send(
            &self,
            _request: &ApiRequest,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> Result<JsonResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(JsonResponse {
                status: 200,
                body: self.body.clone(),
            })
        }
    }

    #[test]
    fn test_extract_bare_array() {
        let page = extract_bill_page(&json!([{"title": "A"}])).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total, None);
    }

    #[test]
    fn test_extract_results_envelope() {
        let page = extract_bill_page(&json!({
            "results": [{"title": "A"}, {"title": "B"}],
            "total": 44,
            "page": 2,
            "totalPages": 3,
        }))
        .unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, Some(44));
        assert_eq!(page.total_pages, Some(3));
    }

    #[test]
    fn test_extract_data_envelope() {
        let page = extract_bill_page(&json!({"data": [{"title": "A"}]})).unwrap();
        assert_eq!(page.records.len(), 1);
    }

    #[test]
    fn test_extract_unrecognized_envelope_fails_loudly() {
        let err = extract_bill_page(&json!({"rows": []})).unwrap_err();
        assert!(matches!(err, CatalogError::UnrecognizedEnvelope(_)));
    }

    #[tokio::test]
    async fn test_identical_page_fetches_share_one_network_call() {
        let transport = Arc::new(ScriptedTransport::new(json!({"results": [], "total": 0})));
        let api = CatalogApi::new(transport.clone());

        api.fetch_page("tx", 1, 20).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        api.fetch_page("tx", 1, 20).await.unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        // A different page is a different request descriptor.
        api.fetch_page("tx", 2, 20).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
