use snapcam::app_context::AppContext;
use snapcam::cli::{self, CONFIG_PATH_ENV};
use snapcam::common::logging_setup;
use snapcam::config_loader;
use log::{info, error, debug, warn};
use anyhow::{anyhow, Context, Result};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let main_start_time = Instant::now();
    let env_file = cli::env_file_from_args(std::env::args_os());
    let env_loaded = cli::load_env_file(&env_file);
    let matches = cli::build_cli().get_matches();

    let config_path = match cli::resolve_config_path(&matches) {
        Some(path) => path,
        None => {
            logging_setup::initialize_logging(None, &matches);
            let err = anyhow!("No configuration file given; pass --config or set {}", CONFIG_PATH_ENV);
            error!(error:% = err; "❌ Failed to load config file");
            return Err(err);
        }
    };

    let master_config = match config_loader::load_config(&config_path) {
        Ok(cfg) => {
            logging_setup::initialize_logging(Some(&cfg), &matches);
            cfg
        }
        Err(e) => {
            logging_setup::initialize_logging(None, &matches);
            error!(path:% = config_path.display(), error:% = format!("{:#}", e); "❌ Failed to load config file");
            return Err(e.context(format!("Failed to load configuration from '{}'", config_path.display())));
        }
    };
    match env_loaded {
        Ok(()) => debug!("Loaded environment from {}", env_file.display()),
        Err(e) => debug!("No environment file loaded from {}: {}", env_file.display(), e),
    }
    info!("🚀 snapcam starting with {} host(s) configured.", master_config.hosts.len());

    let context = match AppContext::from_config(master_config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error:% = format!("{:#}", e); "❌ Failed to create directories");
            return Err(e);
        }
    };

    let scheduler = context.start_capturing();

    wait_for_shutdown_signal().await.context("Failed to listen for shutdown signals")?;
    info!("🛑 Shutdown requested, waiting for in-flight captures...");
    context.shutdown.cancel();
    let ticks = scheduler.ticks();
    scheduler.join().await;
    debug!("Scheduler stopped after {} tick(s).", ticks);

    info!("🏁 snapcam stopped after {:?}.", main_start_time.elapsed());
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = terminate.recv() => warn!("Received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
