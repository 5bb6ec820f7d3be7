// src/loader/mod.rs
//! # Data Loader
//!
//! Builds the in-memory lead collection by walking a fixed fallback ladder:
//!
//! 1. primary remote endpoint (authoritative)
//! 2. secondary remote endpoint (different envelope)
//! 3. newest parseable snapshot file in the data directory
//! 4. cache file, while younger than the TTL
//! 5. built-in samples (always succeeds)
//!
//! Every failed rung is logged and counted, never fatal. A remote success
//! refreshes the cache file; no other rung touches it.

pub mod cache;
pub mod sources;

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::lead::{sample_leads, Lead};
use sources::{LeadSource, RemoteSource, SnapshotFiles};

/// Why a single rung of the ladder could not provide the collection.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("no usable leads found")]
    NotFound,
}

/// Dashboard status line classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Success,
    Warning,
    Error,
}

/// What one load cycle produced: the collection, where it came from, and
/// how the status line should read.
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    pub leads: Vec<Lead>,
    pub status: LoadStatus,
    pub message: String,
    pub source_label: String,
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("loader_attempts_total", "Load cycles started.");
        describe_counter!(
            "loader_source_errors_total",
            "Source failures that fell through to the next rung."
        );
        describe_counter!(
            "loader_fallback_total",
            "Load cycles satisfied by the cache or the built-in samples."
        );
        describe_gauge!(
            "loader_leads_loaded",
            "Lead count of the last completed load."
        );
        describe_gauge!(
            "leads_cache_ttl_secs",
            "Configured cache freshness window in seconds."
        );
    });
}

/// Walk the ladder and return the first satisfying collection. Guaranteed
/// to return a non-empty collection; the worst case is the samples with a
/// warning status.
pub async fn load(cfg: &Config) -> LoadOutcome {
    ensure_metrics_described();
    counter!("loader_attempts_total").increment(1);
    gauge!("leads_cache_ttl_secs").set(cfg.cache_ttl_secs as f64);

    // 1-2) Remote endpoints. A success refreshes the cache file.
    let client = reqwest::Client::new();
    let remotes = [
        RemoteSource::new("primary API", cfg.primary_leads_url.clone(), client.clone()),
        RemoteSource::new("secondary API", cfg.secondary_leads_url.clone(), client),
    ];
    for source in &remotes {
        match source.fetch().await {
            Ok(leads) => {
                cache::write(&cfg.cache_path, &leads).await;
                return success_outcome(leads, source.name());
            }
            Err(e) => fall_through(source.name(), &e),
        }
    }

    // 3) Newest parseable snapshot in the data directory.
    let snapshots = SnapshotFiles::new(cfg.data_dir.clone());
    match snapshots.fetch().await {
        Ok(leads) => return success_outcome(leads, snapshots.name()),
        Err(e) => fall_through(snapshots.name(), &e),
    }

    // 4) Cache file, only while fresh.
    if let Some(leads) = cache::read_fresh(&cfg.cache_path, cfg.cache_ttl_secs).await {
        counter!("loader_fallback_total").increment(1);
        gauge!("loader_leads_loaded").set(leads.len() as f64);
        return LoadOutcome {
            message: format!("Loaded {} leads from cache", leads.len()),
            status: LoadStatus::Warning,
            source_label: "cache".to_string(),
            leads,
        };
    }
    tracing::warn!(source = "cache", "lead source failed");
    counter!("loader_source_errors_total").increment(1);

    // 5) Built-in samples. Terminal, always succeeds.
    let leads = sample_leads();
    counter!("loader_fallback_total").increment(1);
    gauge!("loader_leads_loaded").set(leads.len() as f64);
    LoadOutcome {
        message: format!("Using {} built-in sample leads", leads.len()),
        status: LoadStatus::Warning,
        source_label: "samples".to_string(),
        leads,
    }
}

fn success_outcome(leads: Vec<Lead>, source: &str) -> LoadOutcome {
    gauge!("loader_leads_loaded").set(leads.len() as f64);
    LoadOutcome {
        message: format!("Loaded {} leads ({source})", leads.len()),
        status: LoadStatus::Success,
        source_label: source.to_string(),
        leads,
    }
}

fn fall_through(source: &str, err: &SourceError) {
    tracing::warn!(source, error = %err, "lead source failed");
    counter!("loader_source_errors_total").increment(1);
}

// --- shared store ---

struct StoreState {
    leads: Arc<Vec<Lead>>,
    status: LoadStatus,
    message: String,
    source_label: String,
    loaded_at: DateTime<Utc>,
}

/// Point-in-time view of the store. The collection itself is shared, not
/// copied.
#[derive(Clone)]
pub struct StoreView {
    pub leads: Arc<Vec<Lead>>,
    pub status: LoadStatus,
    pub message: String,
    pub source_label: String,
    pub loaded_at: DateTime<Utc>,
}

/// Thread-safe handle to the current collection. A reload swaps the whole
/// snapshot atomically; readers keep whatever `Arc` they already hold.
#[derive(Clone)]
pub struct LeadStore {
    inner: Arc<RwLock<StoreState>>,
}

impl LeadStore {
    pub fn new(outcome: LoadOutcome) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreState {
                leads: Arc::new(outcome.leads),
                status: outcome.status,
                message: outcome.message,
                source_label: outcome.source_label,
                loaded_at: Utc::now(),
            })),
        }
    }

    pub fn view(&self) -> StoreView {
        let guard = self.inner.read().expect("lead store poisoned");
        StoreView {
            leads: guard.leads.clone(),
            status: guard.status,
            message: guard.message.clone(),
            source_label: guard.source_label.clone(),
            loaded_at: guard.loaded_at,
        }
    }

    /// Replace the whole snapshot. No incremental merge.
    pub fn replace(&self, outcome: LoadOutcome) {
        let mut guard = self.inner.write().expect("lead store poisoned");
        guard.leads = Arc::new(outcome.leads);
        guard.status = outcome.status;
        guard.message = outcome.message;
        guard.source_label = outcome.source_label;
        guard.loaded_at = Utc::now();
    }
}
