//! Runtime configuration.
//!
//! Resolution order: built-in defaults < optional TOML file < environment
//! variables. A broken file or a non-numeric variable logs a warning and
//! keeps the previous value; startup never fails on configuration.

use serde::Deserialize;
use std::path::PathBuf;

// --- defaults & env names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_PRIMARY_LEADS_URL: &str = "http://127.0.0.1:8001/leads";
pub const DEFAULT_SECONDARY_LEADS_URL: &str = "http://127.0.0.1:8001/api/leads";
pub const DEFAULT_CAMPAIGN_URL: &str = "http://127.0.0.1:8001/api/campaign/run";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CACHE_PATH: &str = "state/leads_cache.json";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CAMPAIGN_STEP_DELAY_MS: u64 = 1000;
pub const DEFAULT_CAMPAIGN_RELOAD_DELAY_MS: u64 = 1000;
pub const DEFAULT_TOP_N: usize = 10;

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const ENV_BIND_ADDR: &str = "DASHBOARD_BIND_ADDR";
pub const ENV_PRIMARY_LEADS_URL: &str = "PRIMARY_LEADS_URL";
pub const ENV_SECONDARY_LEADS_URL: &str = "SECONDARY_LEADS_URL";
pub const ENV_CAMPAIGN_URL: &str = "CAMPAIGN_URL";
pub const ENV_DATA_DIR: &str = "DATA_DIR";
pub const ENV_CACHE_PATH: &str = "CACHE_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "CACHE_TTL_SECS";
pub const ENV_CAMPAIGN_STEP_DELAY_MS: &str = "CAMPAIGN_STEP_DELAY_MS";
pub const ENV_CAMPAIGN_RELOAD_DELAY_MS: &str = "CAMPAIGN_RELOAD_DELAY_MS";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub primary_leads_url: String,
    pub secondary_leads_url: String,
    pub campaign_url: String,
    pub data_dir: PathBuf,
    pub cache_path: PathBuf,
    pub cache_ttl_secs: u64,
    pub campaign_step_delay_ms: u64,
    pub campaign_reload_delay_ms: u64,
    pub top_n: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            primary_leads_url: DEFAULT_PRIMARY_LEADS_URL.to_string(),
            secondary_leads_url: DEFAULT_SECONDARY_LEADS_URL.to_string(),
            campaign_url: DEFAULT_CAMPAIGN_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            campaign_step_delay_ms: DEFAULT_CAMPAIGN_STEP_DELAY_MS,
            campaign_reload_delay_ms: DEFAULT_CAMPAIGN_RELOAD_DELAY_MS,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// TOML file schema. Every key optional; absent keys keep the default.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    bind_addr: Option<String>,
    primary_leads_url: Option<String>,
    secondary_leads_url: Option<String>,
    campaign_url: Option<String>,
    data_dir: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    cache_ttl_secs: Option<u64>,
    campaign_step_delay_ms: Option<u64>,
    campaign_reload_delay_ms: Option<u64>,
    top_n: Option<usize>,
}

impl Config {
    /// Resolve the full configuration. Uses DASHBOARD_CONFIG_PATH or the
    /// default `config/dashboard.toml`; a missing file is not an error.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content).unwrap_or_else(|e| {
                tracing::warn!("config {} not usable: {e:#}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        cfg.apply_env();
        cfg
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let file: FileConfig = toml::from_str(toml_str)?;
        let mut cfg = Self::default();
        if let Some(v) = file.bind_addr {
            cfg.bind_addr = v;
        }
        if let Some(v) = file.primary_leads_url {
            cfg.primary_leads_url = v;
        }
        if let Some(v) = file.secondary_leads_url {
            cfg.secondary_leads_url = v;
        }
        if let Some(v) = file.campaign_url {
            cfg.campaign_url = v;
        }
        if let Some(v) = file.data_dir {
            cfg.data_dir = v;
        }
        if let Some(v) = file.cache_path {
            cfg.cache_path = v;
        }
        if let Some(v) = file.cache_ttl_secs {
            cfg.cache_ttl_secs = v;
        }
        if let Some(v) = file.campaign_step_delay_ms {
            cfg.campaign_step_delay_ms = v;
        }
        if let Some(v) = file.campaign_reload_delay_ms {
            cfg.campaign_reload_delay_ms = v;
        }
        if let Some(v) = file.top_n {
            cfg.top_n = v.max(1);
        }
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_string(ENV_BIND_ADDR) {
            self.bind_addr = v;
        }
        if let Some(v) = env_string(ENV_PRIMARY_LEADS_URL) {
            self.primary_leads_url = v;
        }
        if let Some(v) = env_string(ENV_SECONDARY_LEADS_URL) {
            self.secondary_leads_url = v;
        }
        if let Some(v) = env_string(ENV_CAMPAIGN_URL) {
            self.campaign_url = v;
        }
        if let Some(v) = env_string(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string(ENV_CACHE_PATH) {
            self.cache_path = PathBuf::from(v);
        }
        if let Some(v) = env_u64(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = env_u64(ENV_CAMPAIGN_STEP_DELAY_MS) {
            self.campaign_step_delay_ms = v;
        }
        if let Some(v) = env_u64(ENV_CAMPAIGN_RELOAD_DELAY_MS) {
            self.campaign_reload_delay_ms = v;
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring non-numeric {name}={raw}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const TEST_TOML: &str = r#"
bind_addr = "127.0.0.1:9000"
primary_leads_url = "http://collector.internal/leads"
cache_ttl_secs = 60
top_n = 5
"#;

    #[test]
    fn toml_overrides_only_named_keys() {
        let cfg = Config::from_toml_str(TEST_TOML).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.primary_leads_url, "http://collector.internal/leads");
        assert_eq!(cfg.cache_ttl_secs, 60);
        assert_eq!(cfg.top_n, 5);
        // untouched keys keep their defaults
        assert_eq!(cfg.secondary_leads_url, DEFAULT_SECONDARY_LEADS_URL);
        assert_eq!(cfg.campaign_step_delay_ms, DEFAULT_CAMPAIGN_STEP_DELAY_MS);
    }

    #[test]
    fn top_n_floor_is_one() {
        let cfg = Config::from_toml_str("top_n = 0").unwrap();
        assert_eq!(cfg.top_n, 1);
    }

    #[test]
    fn broken_toml_is_an_error() {
        assert!(Config::from_toml_str("bind_addr = [not toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_beats_file_and_defaults() {
        env::set_var(ENV_BIND_ADDR, "0.0.0.0:7777");
        env::set_var(ENV_CACHE_TTL_SECS, "42");

        let mut cfg = Config::from_toml_str(TEST_TOML).unwrap();
        cfg.apply_env();
        assert_eq!(cfg.bind_addr, "0.0.0.0:7777");
        assert_eq!(cfg.cache_ttl_secs, 42);

        env::remove_var(ENV_BIND_ADDR);
        env::remove_var(ENV_CACHE_TTL_SECS);
    }

    #[serial_test::serial]
    #[test]
    fn non_numeric_env_is_ignored() {
        env::set_var(ENV_CACHE_TTL_SECS, "five minutes");
        let mut cfg = Config::default();
        cfg.apply_env();
        assert_eq!(cfg.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS);
        env::remove_var(ENV_CACHE_TTL_SECS);
    }

    #[serial_test::serial]
    #[test]
    fn empty_env_string_keeps_previous_value() {
        env::set_var(ENV_PRIMARY_LEADS_URL, "   ");
        let mut cfg = Config::default();
        cfg.apply_env();
        assert_eq!(cfg.primary_leads_url, DEFAULT_PRIMARY_LEADS_URL);
        env::remove_var(ENV_PRIMARY_LEADS_URL);
    }
}
