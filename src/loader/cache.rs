// src/loader/cache.rs
//! Load-time cache: the last good remote collection plus its timestamp.
//! Written after every remote success, read only while younger than the
//! TTL. Never authoritative; errors on either side are logged and
//! swallowed.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::lead::Lead;

/// On-disk shape: the serialized collection and an ISO timestamp. No
/// versioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedLeads {
    pub leads: Vec<Lead>,
    pub cached_at: DateTime<Utc>,
}

/// Read the cache if it is present, parseable, non-empty and younger than
/// `ttl_secs`.
pub async fn read_fresh(path: &Path, ttl_secs: u64) -> Option<Vec<Lead>> {
    let body = fs::read_to_string(path).await.ok()?;
    let cached: CachedLeads = serde_json::from_str(&body).ok()?;

    let age = Utc::now().signed_duration_since(cached.cached_at);
    if age > chrono::Duration::seconds(ttl_secs as i64) {
        tracing::debug!(age_secs = age.num_seconds(), "cache stale, skipping");
        return None;
    }
    if cached.leads.is_empty() {
        return None;
    }
    Some(cached.leads)
}

/// Overwrite the cache with a fresh remote collection, unconditionally.
pub async fn write(path: &Path, leads: &[Lead]) {
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            tracing::warn!("cache dir: {e:#}");
            return;
        }
    }

    let cached = CachedLeads {
        leads: leads.to_vec(),
        cached_at: Utc::now(),
    };
    match serde_json::to_vec_pretty(&cached) {
        Ok(bytes) => {
            if let Err(e) = fs::write(path, bytes).await {
                tracing::warn!("write cache: {e:#}");
            }
        }
        Err(e) => tracing::warn!("serialize cache: {e:#}"),
    }
}
