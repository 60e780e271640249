use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::segmenter::SchedulePolicy;

/// Default `User-Agent` sent with every request unless overridden by job headers.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Retry and timing parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts for the initial metadata probe (including the first).
    pub probe_attempts: u32,
    /// Fixed delay in milliseconds before a worker claims again after a transport failure.
    pub part_backoff_ms: u64,
    /// Speed meter refresh interval in milliseconds.
    pub speed_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            probe_attempts: 3,
            part_backoff_ms: 5_000,
            speed_interval_ms: 1_500,
        }
    }
}

/// Global configuration loaded from `~/.config/segdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegdlConfig {
    /// Concurrent connections (workers) per download.
    pub max_connections: usize,
    /// Part size in bytes.
    pub part_size: u64,
    /// Resume from a stopped download's trailer when present.
    pub resume: bool,
    /// Value of the default `User-Agent` header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Part ordering (`[schedule]`).
    #[serde(default)]
    pub schedule: SchedulePolicy,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for SegdlConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            part_size: 2 * 1024 * 1024,
            resume: true,
            user_agent: default_user_agent(),
            schedule: SchedulePolicy::default(),
            retry: RetryConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("segdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SegdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SegdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: SegdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = SegdlConfig::default();
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.part_size, 2_097_152);
        assert!(cfg.resume);
        assert_eq!(cfg.schedule.tail_parts, 6);
        assert_eq!(cfg.schedule.reserved_prefix, 13);
        assert_eq!(cfg.retry.probe_attempts, 3);
        assert_eq!(cfg.retry.part_backoff_ms, 5_000);
    }

    #[test]
    fn config_toml_minimal_uses_section_defaults() {
        let toml = r#"
            max_connections = 4
            part_size = 1048576
            resume = false
        "#;
        let cfg: SegdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_connections, 4);
        assert_eq!(cfg.part_size, 1_048_576);
        assert!(!cfg.resume);
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(cfg.schedule, SchedulePolicy::default());
        assert_eq!(cfg.retry.speed_interval_ms, 1_500);
    }

    #[test]
    fn config_toml_custom_sections() {
        let toml = r#"
            max_connections = 2
            part_size = 65536
            resume = true
            user_agent = "segdl-test"

            [schedule]
            tail_parts = 0
            reserved_prefix = 4

            [retry]
            probe_attempts = 5
            part_backoff_ms = 250
            speed_interval_ms = 500
        "#;
        let cfg: SegdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.user_agent, "segdl-test");
        assert_eq!(cfg.schedule.tail_parts, 0);
        assert_eq!(cfg.schedule.reserved_prefix, 4);
        assert_eq!(cfg.retry.probe_attempts, 5);
        assert_eq!(cfg.retry.part_backoff_ms, 250);
    }
}
