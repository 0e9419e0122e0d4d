use env_logger::Builder;
use log::LevelFilter;
use crate::config_loader::MasterConfig;

/// Level comes from `--debug`, then the config's `LOG_LEVEL`, then `info`.
///
/// Safe to call twice: the first logger installed wins, so a fallback logger
/// set up after a failed config load is simply kept.
pub fn initialize_logging(config: Option<&MasterConfig>, cli_matches: &clap::ArgMatches) {
    let mut builder = Builder::new();

    let log_level_str = if cli_matches.get_flag("debug") {
        "debug".to_string()
    } else {
        config
            .and_then(|c| c.log_level.clone())
            .unwrap_or_else(|| "info".to_string())
    };

    let (level, recognized) = parse_level(&log_level_str);
    builder.filter_level(level);
    // Keep the HTTP stack quiet unless explicitly tracing.
    if level < LevelFilter::Trace {
        builder.filter_module("hyper", LevelFilter::Warn);
        builder.filter_module("reqwest", LevelFilter::Warn);
    }

    if builder.try_init().is_err() {
        return;
    }
    if !recognized {
        log::warn!("Unrecognized log level '{}', defaulting to info.", log_level_str);
    }
}

fn parse_level(level: &str) -> (LevelFilter, bool) {
    match level.to_lowercase().as_str() {
        "error" => (LevelFilter::Error, true),
        "warn" => (LevelFilter::Warn, true),
        "info" => (LevelFilter::Info, true),
        "debug" => (LevelFilter::Debug, true),
        "trace" => (LevelFilter::Trace, true),
        _ => (LevelFilter::Info, false),
    }
}
