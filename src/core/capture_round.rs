use crate::camera_config::CameraHost;
use crate::common::file_utils::snapshot_path;
use crate::common::timestamp_utils::format_capture_timestamp;
use crate::config_loader::MasterConfig;
use crate::core::capture_source::SnapshotSource;
use crate::errors::FetchError;
use chrono::{DateTime, Local};
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Saved { filename: PathBuf, bytes: u64 },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct HostOutcome {
    pub host: CameraHost,
    pub result: CaptureOutcome,
}

/// What one round did, in configuration order. Only logged by the scheduler;
/// kept as a value so callers and tests can inspect it.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub timestamp: String,
    pub outcomes: Vec<HostOutcome>,
}

impl RoundReport {
    pub fn saved_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, CaptureOutcome::Saved { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.saved_count()
    }
}

pub async fn run_capture_round(config: Arc<MasterConfig>, source: Arc<dyn SnapshotSource>) -> RoundReport {
    run_capture_round_at(config, source, Local::now()).await
}

/// Fetches every configured host once, all sharing the timestamp derived from `now`.
///
/// Each host runs in its own task under the configured request timeout, so a
/// dead or hanging camera only costs its own slot. When
/// `MAX_CONCURRENT_FETCHES` is set, at most that many fetches are in flight.
pub async fn run_capture_round_at(
    config: Arc<MasterConfig>,
    source: Arc<dyn SnapshotSource>,
    now: DateTime<Local>,
) -> RoundReport {
    let round_start = Instant::now();
    let timestamp = format_capture_timestamp(&now);
    info!(timestamp:% = timestamp, hosts = config.hosts.len(); "📸 Starting capture round");

    let limiter = config.max_concurrent_fetches.map(|n| Arc::new(Semaphore::new(n)));
    let deadline = config.request_timeout();

    let mut tasks: Vec<JoinHandle<CaptureOutcome>> = Vec::with_capacity(config.hosts.len());
    for host in config.hosts.iter() {
        let task_source = Arc::clone(&source);
        let task_limiter = limiter.clone();
        let destination = snapshot_path(&config.capture_directory, &host.name, &timestamp);
        let url = host.url.clone();

        tasks.push(tokio::spawn(async move {
            let _permit = match task_limiter {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return CaptureOutcome::Failed { reason: "concurrency limiter closed".to_string() },
                },
                None => None,
            };
            capture_one(task_source.as_ref(), &url, destination, deadline).await
        }));
    }

    let results = join_all(tasks).await;

    let mut outcomes = Vec::with_capacity(results.len());
    for (host, task_result) in config.hosts.iter().zip(results) {
        let result = task_result.unwrap_or_else(|join_err| CaptureOutcome::Failed {
            reason: format!("capture task aborted: {}", join_err),
        });
        match &result {
            CaptureOutcome::Saved { filename, bytes } => {
                info!(
                    host:% = host.name, url:% = host.url, filename:% = filename.display(), bytes = *bytes;
                    "Image saved"
                );
            }
            CaptureOutcome::Failed { reason } => {
                error!(
                    host:% = host.name, url:% = host.url, error:% = reason;
                    "Failed to download image"
                );
            }
        }
        outcomes.push(HostOutcome { host: host.clone(), result });
    }

    let report = RoundReport { timestamp, outcomes };
    if report.failed_count() == 0 {
        info!(
            timestamp:% = report.timestamp, saved = report.saved_count();
            "✅ Capture round finished in {:?}", round_start.elapsed()
        );
    } else {
        warn!(
            timestamp:% = report.timestamp, saved = report.saved_count(), failed = report.failed_count();
            "⚠️ Capture round finished with failures in {:?}", round_start.elapsed()
        );
    }
    report
}

async fn capture_one(
    source: &dyn SnapshotSource,
    url: &str,
    destination: PathBuf,
    deadline: Duration,
) -> CaptureOutcome {
    debug!("Fetching {} into {}", url, destination.display());
    let attempt = tokio::time::timeout(deadline, source.fetch(url, &destination)).await;
    match attempt {
        Ok(Ok(bytes)) => CaptureOutcome::Saved { filename: destination, bytes },
        Ok(Err(err)) => CaptureOutcome::Failed { reason: describe(&err) },
        Err(_elapsed) => CaptureOutcome::Failed {
            reason: describe(&FetchError::Timeout(deadline)),
        },
    }
}

// Include the source chain; reqwest hides the useful part (refused, DNS) there.
fn describe(err: &FetchError) -> String {
    let mut reason = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !reason.contains(&text) {
            reason.push_str(": ");
            reason.push_str(&text);
        }
        source = cause.source();
    }
    reason
}
