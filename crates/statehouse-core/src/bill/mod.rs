//! Bill domain module.

pub mod model;

pub use model::{Bill, Category, LegislativeSession, Stage};
