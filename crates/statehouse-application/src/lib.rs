pub mod client;
pub mod filters;
pub mod mutation;
pub mod notice;
pub mod store;
pub mod sync;

pub use client::CatalogClient;
pub use filters::{CatalogPage, FilterController};
pub use mutation::{MutationField, MutationManager};
pub use notice::{NoticeSeverity, UserNotice};
pub use store::BillStore;
pub use sync::{
    FetchOutcome, IncrementalReport, PageSummary, ReconciliationReport, SyncOrchestrator,
};
