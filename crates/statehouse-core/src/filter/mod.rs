//! Filtering, sorting, and pagination over the canonical collection.

pub mod model;
pub mod pipeline;

pub use model::{FilterState, PageWindow, SortOrder};
pub use pipeline::{run_pipeline, PageView, DEFAULT_PAGE_SIZE};
