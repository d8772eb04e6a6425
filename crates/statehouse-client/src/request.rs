//! Request descriptors and response envelopes for the upstream catalog API.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use statehouse_core::error::Result;

/// HTTP method subset used by the catalog API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A full request descriptor: target, method, query, and body.
///
/// The cache key is derived from all four parts, so two requests are
/// deduplicated only when they are byte-for-byte the same call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/state-legislation`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Short label for logs and timeout errors.
    pub fn operation(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }

    /// Deterministic cache key over method, path, query, and body.
    pub fn cache_key(&self) -> String {
        let mut key = format!("{}:{}", self.method.as_str(), self.path);
        for (name, value) in &self.query {
            key.push_str(&format!("?{name}={value}"));
        }
        if let Some(body) = &self.body {
            key.push('#');
            key.push_str(&body.to_string());
        }
        key
    }
}

/// Timeout class for a call. Interactive reads stay short so the UI can
/// react; bulk synchronization against the slow upstream gets a much longer
/// bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    Interactive,
    Bulk,
}

impl CallClass {
    pub fn timeout(&self) -> Duration {
        match self {
            CallClass::Interactive => Duration::from_secs(120),
            CallClass::Bulk => Duration::from_secs(600),
        }
    }
}

/// A parsed JSON response with its HTTP status.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Value,
}

impl JsonResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserializes the body into a typed response.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_covers_all_parts() {
        let base = ApiRequest::get("/state-legislation")
            .with_query("jurisdiction", "tx")
            .with_query("page", 1);
        let same = ApiRequest::get("/state-legislation")
            .with_query("jurisdiction", "tx")
            .with_query("page", 1);
        assert_eq!(base.cache_key(), same.cache_key());

        let other_page = ApiRequest::get("/state-legislation")
            .with_query("jurisdiction", "tx")
            .with_query("page", 2);
        assert_ne!(base.cache_key(), other_page.cache_key());

        let with_body = ApiRequest::post("/legiscan/fetch-recent", json!({"limit": 10}));
        let other_body = ApiRequest::post("/legiscan/fetch-recent", json!({"limit": 20}));
        assert_ne!(with_body.cache_key(), other_body.cache_key());
    }
}
