use serde::Deserialize;
use std::path::PathBuf;

use crate::procfs::{DEFAULT_MEMINFO_PATH, DEFAULT_STAT_PATH};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sampler: SamplerSection,
    pub publishing: PublishingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplerSection {
    /// Whole seconds between ticks.
    pub interval_secs: u64,
    #[serde(default = "default_stat_path")]
    pub stat_path: PathBuf,
    #[serde(default = "default_meminfo_path")]
    pub meminfo_path: PathBuf,
    #[serde(default = "default_collect_disks")]
    pub collect_disks: bool,
}

fn default_stat_path() -> PathBuf {
    PathBuf::from(DEFAULT_STAT_PATH)
}

fn default_meminfo_path() -> PathBuf {
    PathBuf::from(DEFAULT_MEMINFO_PATH)
}

fn default_collect_disks() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of records kept in the broadcast channel for /ws/metrics (slow clients may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log publisher stats (records received, ws clients) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.server.host.is_empty(),
            "server.host must be non-empty"
        );
        anyhow::ensure!(
            self.sampler.interval_secs > 0,
            "sampler.interval_secs must be > 0, got {}",
            self.sampler.interval_secs
        );
        anyhow::ensure!(
            !self.sampler.stat_path.as_os_str().is_empty(),
            "sampler.stat_path must be non-empty"
        );
        anyhow::ensure!(
            !self.sampler.meminfo_path.as_os_str().is_empty(),
            "sampler.meminfo_path must be non-empty"
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}

impl SamplerSection {
    /// Sampler timing and sources described by this section.
    pub fn sampler_config(&self) -> crate::sampler::SamplerConfig {
        crate::sampler::SamplerConfig {
            interval: std::time::Duration::from_secs(self.interval_secs),
            stat_path: self.stat_path.clone(),
            meminfo_path: self.meminfo_path.clone(),
        }
    }
}
