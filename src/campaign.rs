//! # Campaign Trigger
//!
//! Bridges the dashboard to the remote collector service. One trigger plays
//! a scripted six-step progress log, then issues a single POST to the
//! campaign endpoint. The scripted steps are pure user feedback on a fixed
//! cadence, independent of the real run. A second trigger while one is in
//! flight is a no-op; stop halts the script and returns to idle but cannot
//! abort a request once issued, so a late result still lands (last writer
//! wins). Failures are terminal for that run; the user must re-trigger.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::loader::{self, LeadStore};

/// Scripted pseudo-progress steps played before the real call. Values and
/// cadence are fixed UX; they do not reflect what the collector does.
const STEPS: [(u8, &str); 6] = [
    (10, "Configuring campaign parameters..."),
    (25, "Connecting to the collector API..."),
    (40, "Running the collection campaign..."),
    (60, "Processing campaign results..."),
    (80, "Finalizing campaign..."),
    (90, "Calling the campaign endpoint..."),
];

const LOG_CAP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignState {
    Idle,
    Running,
    Success,
    Error,
}

/// Pollable snapshot for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignStatus {
    pub state: CampaignState,
    pub progress: u8,
    pub message: String,
    pub leads_collected: u64,
    pub leads_qualified: u64,
    pub log: Vec<String>,
}

struct Status {
    state: CampaignState,
    progress: u8,
    message: String,
    leads_collected: u64,
    leads_qualified: u64,
}

struct RunnerInner {
    status: Mutex<Status>,
    log: Mutex<Vec<String>>,
    /// Single-flight guard. Set on trigger, cleared only when the spawned
    /// run has fully settled, so one trigger means one request even across
    /// a stop.
    busy: AtomicBool,
    /// Cooperative flag checked before each scripted step.
    script_on: AtomicBool,
    config: Config,
    store: LeadStore,
}

/// Cheap-clone handle around the shared runner state.
#[derive(Clone)]
pub struct CampaignRunner {
    inner: Arc<RunnerInner>,
}

impl CampaignRunner {
    pub fn new(cfg: &Config, store: LeadStore) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                status: Mutex::new(Status {
                    state: CampaignState::Idle,
                    progress: 0,
                    message: String::new(),
                    leads_collected: 0,
                    leads_qualified: 0,
                }),
                log: Mutex::new(Vec::new()),
                busy: AtomicBool::new(false),
                script_on: AtomicBool::new(false),
                config: cfg.clone(),
                store,
            }),
        }
    }

    /// Start a run. While one is in flight this is a no-op returning the
    /// current status.
    pub fn trigger(&self) -> CampaignStatus {
        ensure_metrics_described();

        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("campaign already in flight, trigger ignored");
            return self.status();
        }

        self.inner.script_on.store(true, Ordering::SeqCst);
        self.inner
            .log
            .lock()
            .expect("campaign log poisoned")
            .clear();
        {
            let mut st = self.lock_status();
            st.state = CampaignState::Running;
            st.progress = 0;
            st.message = "Campaign starting".to_string();
        }
        self.push_log("Campaign started");

        let runner = self.clone();
        tokio::spawn(runner.run());

        self.status()
    }

    /// Halt the scripted steps and return to idle. An already issued
    /// request is not cancelled; its outcome may still overwrite the state
    /// later.
    pub fn stop(&self) -> CampaignStatus {
        let was_on = self.inner.script_on.swap(false, Ordering::SeqCst);
        if was_on {
            {
                let mut st = self.lock_status();
                if st.state == CampaignState::Running {
                    st.state = CampaignState::Idle;
                    st.progress = 0;
                    st.message = "Campaign stopped".to_string();
                }
            }
            self.push_log("Campaign stopped");
        }
        self.status()
    }

    pub fn status(&self) -> CampaignStatus {
        let st = self.lock_status();
        let log = self
            .inner
            .log
            .lock()
            .expect("campaign log poisoned")
            .clone();
        CampaignStatus {
            state: st.state,
            progress: st.progress,
            message: st.message.clone(),
            leads_collected: st.leads_collected,
            leads_qualified: st.leads_qualified,
            log,
        }
    }

    async fn run(self) {
        // 1) Scripted steps, each gated on the cooperative flag.
        let step_delay = Duration::from_millis(self.inner.config.campaign_step_delay_ms);
        for (progress, message) in STEPS {
            if !self.inner.script_on.load(Ordering::SeqCst) {
                break;
            }
            {
                let mut st = self.lock_status();
                st.progress = progress;
                st.message = message.to_string();
            }
            self.push_log(message);
            tokio::time::sleep(step_delay).await;
        }

        // 2) The one real request. Issued even after a stop, matching the
        // original flow; `busy` stays held so no second request can start.
        counter!("campaign_runs_total").increment(1);
        match run_remote(&self.inner.config.campaign_url).await {
            Ok((collected, qualified)) => {
                self.push_log("Campaign completed successfully");
                {
                    let mut st = self.lock_status();
                    st.state = CampaignState::Success;
                    st.progress = 100;
                    st.message = "Finished".to_string();
                    st.leads_collected = collected;
                    st.leads_qualified = qualified;
                }

                // 3) Delayed full reload so the new rows appear.
                let reload_delay =
                    Duration::from_millis(self.inner.config.campaign_reload_delay_ms);
                tokio::time::sleep(reload_delay).await;
                self.push_log("Reloading data...");
                let outcome = loader::load(&self.inner.config).await;
                self.inner.store.replace(outcome);
            }
            Err(e) => {
                counter!("campaign_failures_total").increment(1);
                tracing::warn!(error = ?e, "campaign run failed");
                self.push_log(&format!("Error: {e:#}"));
                let mut st = self.lock_status();
                st.state = CampaignState::Error;
                st.progress = 0;
                st.message = format!("{e:#}");
            }
        }

        self.inner.script_on.store(false, Ordering::SeqCst);
        self.inner.busy.store(false, Ordering::SeqCst);
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, Status> {
        self.inner.status.lock().expect("campaign status poisoned")
    }

    fn push_log(&self, message: &str) {
        let entry = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        let mut log = self.inner.log.lock().expect("campaign log poisoned");
        log.push(entry);
        if log.len() > LOG_CAP {
            let excess = log.len() - LOG_CAP;
            log.drain(0..excess);
        }
    }
}

// --- remote call ---

#[derive(Debug, Deserialize)]
struct CampaignRunResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<CampaignCounters>,
}

/// Absent counters default to 0.
#[derive(Debug, Default, Deserialize)]
struct CampaignCounters {
    #[serde(default)]
    leads_collected: u64,
    #[serde(default)]
    leads_qualified: u64,
}

async fn run_remote(url: &str) -> anyhow::Result<(u64, u64)> {
    let client = reqwest::Client::new();
    let resp = client.post(url).send().await.context("post campaign run")?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("campaign endpoint returned {status}");
    }

    let body = resp.text().await.context("read campaign body")?;
    let parsed: CampaignRunResponse = serde_json::from_str(body.trim())
        .with_context(|| format!("parse campaign JSON, body: {}", body.trim()))?;
    if !parsed.success {
        anyhow::bail!(parsed
            .message
            .unwrap_or_else(|| "campaign reported failure".to_string()));
    }

    let counters = parsed.data.unwrap_or_default();
    Ok((counters.leads_collected, counters.leads_qualified))
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("campaign_runs_total", "Campaign requests issued.");
        describe_counter!(
            "campaign_failures_total",
            "Campaign runs that ended in error."
        );
    });
}
