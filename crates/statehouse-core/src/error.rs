//! Error types for the Statehouse client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Statehouse client.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. Every public entry point in
/// the client settles with either a value or one of these variants; nothing
/// escapes as an unhandled panic.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum CatalogError {
    /// A request exceeded its time bound. Recoverable; the user should retry
    /// or narrow the requested window.
    #[error("Request timed out after {limit_secs}s: {operation}")]
    Timeout { operation: String, limit_secs: u64 },

    /// The backend returned something other than JSON (e.g. an HTML error
    /// page). An infrastructure problem, not a data problem.
    #[error("Unexpected content type '{content_type}' (HTTP {status})")]
    UnexpectedContentType { status: u16, content_type: String },

    /// A 4xx/5xx response with a JSON body. The message is taken from the
    /// body when one is present.
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// An optimistic mutation was rejected by the server. Local state has
    /// already been rolled back by the time this surfaces.
    #[error("Mutation of {field} on '{id}' failed: {message}")]
    Mutation {
        field: String,
        id: String,
        message: String,
    },

    /// A list response matched none of the tolerated envelope shapes.
    #[error("Unrecognized response envelope: {0}")]
    UnrecognizedEnvelope(String),

    /// Network-level failure (connection refused, DNS, TLS, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (preference file operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Timeout error
    pub fn timeout(operation: impl Into<String>, limit_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit_secs,
        }
    }

    /// Creates an HttpStatus error
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            message: message.into(),
        }
    }

    /// Creates a Mutation error
    pub fn mutation(
        field: impl Into<String>,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Mutation {
            field: field.into(),
            id: id.into(),
            message: message.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this is a Mutation error
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Mutation { .. })
    }

    /// Check if this error is an infrastructure problem (timeout, non-JSON
    /// response, or network failure) rather than a data problem.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::UnexpectedContentType { .. } | Self::Network(_)
        )
    }

    /// The HTTP status carried by this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::UnexpectedContentType { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CatalogError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                operation: err
                    .url()
                    .map(|u| u.path().to_string())
                    .unwrap_or_else(|| "request".to_string()),
                limit_secs: 0,
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Conversion from anyhow::Error (transitional, should be removed eventually)
impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, CatalogError>`.
pub type Result<T> = std::result::Result<T, CatalogError>;
