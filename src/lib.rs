// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod campaign;
pub mod config;
pub mod engine;
pub mod export;
pub mod lead;
pub mod loader;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::Config;
pub use crate::loader::{LeadStore, LoadOutcome, LoadStatus};
