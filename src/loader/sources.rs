// src/loader/sources.rs
//! Individual rungs of the fallback ladder: the two remote endpoints and
//! the snapshot-file lookup. Remote payloads are parsed tolerantly, since
//! the primary and secondary endpoints answer with different envelopes.

use std::path::PathBuf;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;
use tokio::fs;

use super::SourceError;
use crate::lead::Lead;

/// One rung of the ladder. Implementations return the parsed, non-empty
/// collection or say why they could not.
#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Lead>, SourceError>;
    fn name(&self) -> &'static str;
}

// --- tolerant variants of the leads response ---

#[derive(Debug, Deserialize)]
struct EnvelopedLeads {
    success: bool,
    #[serde(default)]
    data: Vec<Lead>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LeadsAny {
    Enveloped(EnvelopedLeads),
    Bare(Vec<Lead>),
    Wrapped { data: Box<LeadsAny> },
}

fn map_any(any: LeadsAny) -> Result<Vec<Lead>, SourceError> {
    match any {
        LeadsAny::Enveloped(env) => {
            if !env.success {
                return Err(SourceError::MalformedPayload(
                    "envelope reports success=false".to_string(),
                ));
            }
            Ok(env.data)
        }
        LeadsAny::Bare(leads) => Ok(leads),
        LeadsAny::Wrapped { data } => map_any(*data),
    }
}

/// A remote leads endpoint. The same type serves the primary and the
/// secondary URL; only the envelope differs, and the parse covers both.
pub struct RemoteSource {
    name: &'static str,
    url: String,
    client: reqwest::Client,
}

impl RemoteSource {
    pub fn new(name: &'static str, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name,
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl LeadSource for RemoteSource {
    async fn fetch(&self) -> Result<Vec<Lead>, SourceError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::BadStatus(status));
        }

        let body = resp.text().await?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Err(SourceError::MalformedPayload(
                "empty or null body".to_string(),
            ));
        }

        let any: LeadsAny = serde_json::from_str(trimmed)
            .map_err(|e| SourceError::MalformedPayload(format!("leads JSON: {e}")))?;
        let leads = map_any(any)?;
        if leads.is_empty() {
            return Err(SourceError::NotFound);
        }
        Ok(leads)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

fn snapshot_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^leads_\d{8}_\d{6}\.json$").expect("snapshot regex"))
}

/// Published snapshot files in the data directory, named
/// `leads_YYYYMMDD_HHMMSS.json`. Candidates are tried newest first until
/// one parses to a non-empty bare array.
pub struct SnapshotFiles {
    dir: PathBuf,
}

impl SnapshotFiles {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl LeadSource for SnapshotFiles {
    async fn fetch(&self) -> Result<Vec<Lead>, SourceError> {
        let mut rd = fs::read_dir(&self.dir)
            .await
            .map_err(|_| SourceError::NotFound)?;

        let mut names = Vec::new();
        while let Some(entry) = rd
            .next_entry()
            .await
            .map_err(|_| SourceError::NotFound)?
        {
            if let Some(name) = entry.file_name().to_str() {
                if snapshot_re().is_match(name) {
                    names.push(name.to_string());
                }
            }
        }

        // The timestamp is embedded in the name, so plain descending
        // string order is newest-first.
        names.sort();
        names.reverse();

        for name in names {
            let path = self.dir.join(&name);
            match fs::read_to_string(&path).await {
                Ok(body) => match serde_json::from_str::<Vec<Lead>>(&body) {
                    Ok(leads) if !leads.is_empty() => {
                        tracing::debug!(file = %name, count = leads.len(), "snapshot accepted");
                        return Ok(leads);
                    }
                    Ok(_) => tracing::debug!(file = %name, "snapshot empty, skipping"),
                    Err(e) => tracing::debug!(file = %name, error = %e, "snapshot malformed, skipping"),
                },
                Err(e) => tracing::debug!(file = %name, error = %e, "snapshot unreadable, skipping"),
            }
        }

        Err(SourceError::NotFound)
    }

    fn name(&self) -> &'static str {
        "snapshot files"
    }
}
