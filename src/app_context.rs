use crate::camera::http_fetcher::HttpSnapshotFetcher;
use crate::common::file_utils::ensure_capture_directories;
use crate::config_loader::{load_config, MasterConfig};
use crate::core::capture_round::run_capture_round;
use crate::core::capture_source::SnapshotSource;
use crate::core::scheduler::{FirstTick, Scheduler, SchedulerHandle};
use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a running capture service needs, built once at startup and
/// handed to the scheduler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<MasterConfig>,
    pub source: Arc<dyn SnapshotSource>,
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Loads the configuration, then prepares the capture directories.
    /// Nothing touches the filesystem if the configuration is invalid.
    pub fn bootstrap(config_path: &Path) -> Result<Self> {
        let config = load_config(config_path)?;
        Self::from_config(config)
    }

    pub fn from_config(config: MasterConfig) -> Result<Self> {
        let fetcher = HttpSnapshotFetcher::new(config.request_timeout())
            .context("Failed to build HTTP client")?;
        Self::with_source(config, Arc::new(fetcher))
    }

    pub fn with_source(config: MasterConfig, source: Arc<dyn SnapshotSource>) -> Result<Self> {
        let dirs = ensure_capture_directories(&config).context("Failed to create directories")?;
        info!(
            root:% = config.capture_directory.display(), directories = dirs.len();
            "📁 Confirmed capture directories"
        );
        Ok(Self {
            config: Arc::new(config),
            source,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn first_tick(&self) -> FirstTick {
        if self.config.capture_on_start {
            FirstTick::Immediate
        } else {
            FirstTick::AfterInterval
        }
    }

    /// Starts one capture round per tick until `shutdown` is cancelled.
    pub fn start_capturing(&self) -> SchedulerHandle {
        let config = Arc::clone(&self.config);
        let source = Arc::clone(&self.source);
        Scheduler::start(
            self.config.interval(),
            self.first_tick(),
            self.shutdown.clone(),
            move || {
                let config = Arc::clone(&config);
                let source = Arc::clone(&source);
                async move {
                    run_capture_round(config, source).await;
                }
            },
        )
    }
}
