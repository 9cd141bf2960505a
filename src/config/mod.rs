mod file_config;

pub use file_config::{BotsConfig, FileConfig};

use crate::model::DecodeMode;
use anyhow::{bail, Result};
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub server_api_url: Option<String>,
    pub refresh_rate_secs: f64,
    pub request_timeout_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_api_url: None,
            refresh_rate_secs: DEFAULT_REFRESH_RATE_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

pub const DEFAULT_REFRESH_RATE_SECS: f64 = 30.0;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resolved engine settings, immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub server_api_url: String,
    pub request_timeout_secs: u64,

    // Polling
    pub refresh_rate_secs: f64,
    pub retry_min_secs: f64,
    pub retry_max_secs: f64,

    // Bots
    pub priest_bots_enabled: bool,
    pub penitent_bots_enabled: bool,
    /// `None` lets bot pools grow without bound.
    pub max_bot_count: Option<u64>,
    pub fake_spawn_mean_rate_secs: f64,
    pub synthetic_id_base: u64,

    /// Abort on payloads breaking the server contract.
    pub strict_decoding: bool,
}

impl SyncSettings {
    /// Default settings for the given server.
    pub fn new(server_api_url: impl Into<String>) -> Self {
        Self {
            server_api_url: server_api_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_rate_secs: DEFAULT_REFRESH_RATE_SECS,
            retry_min_secs: 3.0,
            retry_max_secs: 8.0,
            priest_bots_enabled: false,
            penitent_bots_enabled: false,
            max_bot_count: None,
            fake_spawn_mean_rate_secs: 10.0,
            synthetic_id_base: 100_000,
            strict_decoding: true,
        }
    }

    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let server_api_url = file
            .server_api_url
            .or_else(|| cli.server_api_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "server_api_url must be specified via --server-url or in config file"
                )
            })?;

        let defaults = SyncSettings::new(server_api_url);
        let bots = file.bots.unwrap_or_default();

        let settings = SyncSettings {
            request_timeout_secs: file
                .request_timeout_secs
                .unwrap_or(cli.request_timeout_secs),
            refresh_rate_secs: file.refresh_rate_secs.unwrap_or(cli.refresh_rate_secs),
            retry_min_secs: file.retry_min_secs.unwrap_or(defaults.retry_min_secs),
            retry_max_secs: file.retry_max_secs.unwrap_or(defaults.retry_max_secs),
            priest_bots_enabled: bots
                .priest_bots_enabled
                .unwrap_or(defaults.priest_bots_enabled),
            penitent_bots_enabled: bots
                .penitent_bots_enabled
                .unwrap_or(defaults.penitent_bots_enabled),
            max_bot_count: bots.max_bot_count.or(defaults.max_bot_count),
            fake_spawn_mean_rate_secs: bots
                .fake_spawn_mean_rate_secs
                .unwrap_or(defaults.fake_spawn_mean_rate_secs),
            synthetic_id_base: bots.synthetic_id_base.unwrap_or(defaults.synthetic_id_base),
            strict_decoding: file.strict_decoding.unwrap_or(defaults.strict_decoding),
            ..defaults
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_api_url.trim().is_empty() {
            bail!("server_api_url must not be empty");
        }
        if !(self.refresh_rate_secs.is_finite() && self.refresh_rate_secs > 0.0) {
            bail!(
                "refresh_rate_secs must be positive, got {}",
                self.refresh_rate_secs
            );
        }
        if !(self.retry_min_secs.is_finite() && self.retry_min_secs >= 0.0) {
            bail!("retry_min_secs must be non-negative, got {}", self.retry_min_secs);
        }
        if !(self.retry_max_secs.is_finite() && self.retry_max_secs >= self.retry_min_secs) {
            bail!(
                "retry_max_secs ({}) must not be below retry_min_secs ({})",
                self.retry_max_secs,
                self.retry_min_secs
            );
        }
        if !(self.fake_spawn_mean_rate_secs.is_finite() && self.fake_spawn_mean_rate_secs >= 0.0) {
            bail!(
                "fake_spawn_mean_rate_secs must be non-negative, got {}",
                self.fake_spawn_mean_rate_secs
            );
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn refresh_rate(&self) -> Duration {
        Duration::from_secs_f64(self.refresh_rate_secs)
    }

    pub fn decode_mode(&self) -> DecodeMode {
        DecodeMode::from_strict_flag(self.strict_decoding)
    }

    pub fn bots_enabled(&self) -> bool {
        self.priest_bots_enabled || self.penitent_bots_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_url() -> CliConfig {
        CliConfig {
            server_api_url: Some("http://cli.example/api/v1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = SyncSettings::resolve(&cli_with_url(), None).unwrap();

        assert_eq!(settings.server_api_url, "http://cli.example/api/v1");
        assert_eq!(settings.refresh_rate(), Duration::from_secs(30));
        assert_eq!(settings.retry_min_secs, 3.0);
        assert_eq!(settings.retry_max_secs, 8.0);
        assert_eq!(settings.max_bot_count, None);
        assert_eq!(settings.synthetic_id_base, 100_000);
        assert_eq!(settings.decode_mode(), DecodeMode::Strict);
        assert!(!settings.bots_enabled());
    }

    #[test]
    fn test_file_overrides_cli() {
        let file = FileConfig {
            server_api_url: Some("http://file.example/api/v1".to_string()),
            refresh_rate_secs: Some(5.0),
            strict_decoding: Some(false),
            bots: Some(BotsConfig {
                penitent_bots_enabled: Some(true),
                max_bot_count: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        };

        let settings = SyncSettings::resolve(&cli_with_url(), Some(file)).unwrap();

        assert_eq!(settings.server_api_url, "http://file.example/api/v1");
        assert_eq!(settings.refresh_rate_secs, 5.0);
        assert_eq!(settings.decode_mode(), DecodeMode::Lenient);
        assert!(settings.penitent_bots_enabled);
        assert!(!settings.priest_bots_enabled);
        assert_eq!(settings.max_bot_count, Some(2));
    }

    #[test]
    fn test_server_url_required() {
        let error = SyncSettings::resolve(&CliConfig::default(), None).unwrap_err();
        assert!(error.to_string().contains("server_api_url"));
    }

    #[test]
    fn test_validation() {
        let zero_rate = CliConfig {
            refresh_rate_secs: 0.0,
            ..cli_with_url()
        };
        assert!(SyncSettings::resolve(&zero_rate, None).is_err());

        let negative_spawn = FileConfig {
            bots: Some(BotsConfig {
                fake_spawn_mean_rate_secs: Some(-1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(SyncSettings::resolve(&cli_with_url(), Some(negative_spawn)).is_err());

        let inverted_retry = FileConfig {
            retry_min_secs: Some(9.0),
            ..Default::default()
        };
        assert!(SyncSettings::resolve(&cli_with_url(), Some(inverted_retry)).is_err());

        let mut settings = SyncSettings::new("http://localhost");
        settings.fake_spawn_mean_rate_secs = 0.0;
        assert!(settings.validate().is_ok());
    }
}
