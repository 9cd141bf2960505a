use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub server_api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub refresh_rate_secs: Option<f64>,
    pub retry_min_secs: Option<f64>,
    pub retry_max_secs: Option<f64>,
    pub strict_decoding: Option<bool>,

    // Feature configs
    pub bots: Option<BotsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct BotsConfig {
    pub priest_bots_enabled: Option<bool>,
    pub penitent_bots_enabled: Option<bool>,
    pub max_bot_count: Option<u64>,
    /// Mean delay between two bot steps, in seconds.
    pub fake_spawn_mean_rate_secs: Option<f64>,
    pub synthetic_id_base: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
