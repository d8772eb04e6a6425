//! Preference repository trait.
//!
//! Exactly one piece of filter state survives across sessions: whether the
//! highlight-only filter is active. Everything else is derived, in-memory
//! state.

use async_trait::async_trait;

use crate::error::Result;

/// Repository for the persisted user preferences.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Reads the persisted highlight-only flag. Missing or unreadable
    /// storage reads as false.
    async fn highlight_only(&self) -> bool;

    /// Persists the highlight-only flag.
    async fn set_highlight_only(&self, enabled: bool) -> Result<()>;
}
