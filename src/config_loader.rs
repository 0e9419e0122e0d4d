use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use crate::camera_config::CameraHost;
use anyhow::{Result, Context, bail};
use std::collections::HashSet;
use log::{debug, info, warn};
use std::time::Instant;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
// Capture timestamps have one-second resolution.
const TIMESTAMP_RESOLUTION_MS: u64 = 1_000;

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MasterConfig {
    #[serde(rename = "CAPTURE_DIRECTORY")]
    pub capture_directory: PathBuf,
    #[serde(rename = "CAPTURE_HOSTS")]
    pub hosts: Vec<CameraHost>,
    #[serde(rename = "INTERVAL_MS")]
    pub interval_ms: u64,
    #[serde(rename = "REQUEST_TIMEOUT_MS", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(rename = "MAX_CONCURRENT_FETCHES", default)]
    pub max_concurrent_fetches: Option<usize>,
    #[serde(rename = "CAPTURE_ON_START", default)]
    pub capture_on_start: bool,
    #[serde(rename = "LOG_LEVEL", default)]
    pub log_level: Option<String>,
}

impl MasterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

pub fn load_config(path: &Path) -> Result<MasterConfig> {
    debug!("📄 Attempting to load config from: {}", path.display());
    let start_time = Instant::now();

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file '{}'", path.display()))?;

    let config = parse_config(&config_str)
        .with_context(|| format!("Invalid configuration in '{}'", path.display()))?;

    info!(
        "✅ Loaded configuration from '{}' with {} host(s) in {:?}",
        path.display(),
        config.hosts.len(),
        start_time.elapsed()
    );
    Ok(config)
}

pub fn parse_config(config_str: &str) -> Result<MasterConfig> {
    let config: MasterConfig = serde_json::from_str(config_str)
        .context("Failed to parse JSON configuration")?;
    validate_master_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

fn validate_master_config(config: &MasterConfig) -> Result<()> {
    if config.capture_directory.as_os_str().is_empty() {
        bail!("CAPTURE_DIRECTORY cannot be empty.");
    }
    if config.interval_ms == 0 {
        bail!("INTERVAL_MS must be greater than zero.");
    }
    if config.interval_ms < TIMESTAMP_RESOLUTION_MS {
        warn!(
            "⚠️ INTERVAL_MS={} is below the one-second timestamp resolution; consecutive rounds will overwrite each other's files.",
            config.interval_ms
        );
    }
    if config.request_timeout_ms == 0 {
        bail!("REQUEST_TIMEOUT_MS must be greater than zero.");
    }
    if config.max_concurrent_fetches == Some(0) {
        bail!("MAX_CONCURRENT_FETCHES must be greater than zero when set.");
    }

    if config.hosts.is_empty() {
        warn!("⚠️ No CAPTURE_HOSTS configured; capture rounds will do nothing.");
    }

    let mut host_names = HashSet::new();
    for (idx, host) in config.hosts.iter().enumerate() {
        if !is_single_path_segment(&host.name) {
            bail!(
                "Host #{} has NAME '{}', which is not usable as a single directory name.",
                idx + 1,
                host.name
            );
        }
        if !host_names.insert(host.name.as_str()) {
            bail!("Duplicate host NAME found: {}", host.name);
        }
        let url = reqwest::Url::parse(&host.url)
            .with_context(|| format!("Invalid URL '{}' for host '{}'", host.url, host.name))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("URL '{}' for host '{}' must use http or https.", host.url, host.name);
        }
        debug!("Host '{}' validated.", host.name);
    }
    Ok(())
}

fn is_single_path_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(segment)), None) if segment == name
    )
}
