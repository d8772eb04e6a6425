//! User-facing notices for fetch and mutation failures.
//!
//! Fetch-path errors are caught at the orchestrator boundary and converted
//! into a message with a display duration; the embedding environment shows
//! the notice and clears it when the duration elapses. Infrastructure
//! classes (timeout, non-JSON, network) display longer than transient
//! validation failures.

use std::time::Duration;

use statehouse_core::error::CatalogError;

/// How prominently the embedding environment should render a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// A user-visible, auto-clearing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    pub message: String,
    pub severity: NoticeSeverity,
    pub display_for: Duration,
}

/// Display duration for infrastructure failures (timeouts, outages).
const INFRASTRUCTURE_DISPLAY: Duration = Duration::from_secs(10);
/// Display duration for transient validation-type failures.
const TRANSIENT_DISPLAY: Duration = Duration::from_secs(6);
/// Display duration for rejected mutations.
const MUTATION_DISPLAY: Duration = Duration::from_secs(5);

impl UserNotice {
    /// Maps an error to the message the user sees. Timeouts get a distinct
    /// wording from outages so the user knows whether narrowing the request
    /// can help.
    pub fn from_error(err: &CatalogError) -> Self {
        match err {
            CatalogError::Timeout { .. } => Self {
                message: "The service is taking too long to respond. \
                          Try again, or request a smaller window."
                    .to_string(),
                severity: NoticeSeverity::Warning,
                display_for: INFRASTRUCTURE_DISPLAY,
            },
            CatalogError::UnexpectedContentType { .. } | CatalogError::Network(_) => Self {
                message: "The legislation service may be down. Please try again later."
                    .to_string(),
                severity: NoticeSeverity::Error,
                display_for: INFRASTRUCTURE_DISPLAY,
            },
            CatalogError::Mutation { field, .. } => Self {
                message: format!("Your {field} change could not be saved and was undone."),
                severity: NoticeSeverity::Error,
                display_for: MUTATION_DISPLAY,
            },
            CatalogError::HttpStatus { message, .. } => Self {
                message: message.clone(),
                severity: NoticeSeverity::Error,
                display_for: TRANSIENT_DISPLAY,
            },
            other => Self {
                message: other.to_string(),
                severity: NoticeSeverity::Error,
                display_for: TRANSIENT_DISPLAY,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_displays_longer_than_mutation() {
        let timeout = UserNotice::from_error(&CatalogError::timeout("GET /state-legislation", 120));
        let mutation =
            UserNotice::from_error(&CatalogError::mutation("category", "b1", "rejected"));
        assert!(timeout.display_for > mutation.display_for);
        assert!(timeout.message.contains("smaller window"));
    }

    #[test]
    fn test_outage_wording_differs_from_timeout() {
        let outage = UserNotice::from_error(&CatalogError::UnexpectedContentType {
            status: 502,
            content_type: "text/html".to_string(),
        });
        assert!(outage.message.contains("may be down"));
    }

    #[test]
    fn test_http_status_surfaces_backend_message() {
        let notice =
            UserNotice::from_error(&CatalogError::http_status(422, "jurisdiction is required"));
        assert_eq!(notice.message, "jurisdiction is required");
    }
}
