use clap::{Arg, ArgMatches, Command, ArgAction};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
pub const DEFAULT_ENV_FILE: &str = ".env";

pub fn build_cli() -> Command {
    Command::new("snapcam")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Periodically saves snapshots from a set of network cameras.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .env(CONFIG_PATH_ENV)
                .help("JSON configuration file")
                .action(ArgAction::Set)
        )
        .arg(
            Arg::new("env-file")
                .long("env-file")
                .value_name("FILE")
                .default_value(DEFAULT_ENV_FILE)
                .help("Environment file loaded before reading CONFIG_PATH")
                .action(ArgAction::Set)
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
        )
}

/// Finds `--env-file` before clap runs, so the file can be loaded ahead of
/// parsing and its `CONFIG_PATH` reaches the `--config` env fallback.
pub fn env_file_from_args<I, T>(args: I) -> PathBuf
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into).skip(1);
    while let Some(arg) = args.next() {
        let Some(arg) = arg.to_str().map(str::to_owned) else { continue };
        if arg == "--" {
            break;
        }
        if arg == "--env-file" {
            if let Some(value) = args.next() {
                return PathBuf::from(value);
            }
        } else if let Some(value) = arg.strip_prefix("--env-file=") {
            return PathBuf::from(value);
        }
    }
    PathBuf::from(DEFAULT_ENV_FILE)
}

/// Loads `path` into the process environment. Variables already set win.
pub fn load_env_file(path: &Path) -> Result<(), dotenvy::Error> {
    dotenvy::from_path(path)
}

/// `--config`, else `CONFIG_PATH` (process environment, then the env file).
pub fn resolve_config_path(matches: &ArgMatches) -> Option<PathBuf> {
    matches.get_one::<String>("config").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_flag_is_read() {
        let matches = build_cli().try_get_matches_from(["snapcam", "--config", "cams.json", "-d"]).unwrap();
        assert_eq!(resolve_config_path(&matches), Some(PathBuf::from("cams.json")));
        assert!(matches.get_flag("debug"));
        assert_eq!(matches.get_one::<String>("env-file").map(String::as_str), Some(DEFAULT_ENV_FILE));
    }

    #[test]
    fn env_file_is_found_before_parsing() {
        assert_eq!(env_file_from_args(["snapcam"]), PathBuf::from(".env"));
        assert_eq!(env_file_from_args(["snapcam", "-d", "--env-file", "cams.env"]), PathBuf::from("cams.env"));
        assert_eq!(env_file_from_args(["snapcam", "--env-file=other.env", "-d"]), PathBuf::from("other.env"));
        assert_eq!(env_file_from_args(["snapcam", "--", "--env-file", "x.env"]), PathBuf::from(".env"));
    }

    // Single test because it mutates the process-wide CONFIG_PATH.
    #[test]
    fn config_path_precedence_flag_then_process_env_then_env_file() {
        let tmp = tempfile::tempdir().unwrap();
        let env_file = tmp.path().join("snapcam.env");
        let mut file = std::fs::File::create(&env_file).unwrap();
        writeln!(file, "{}=from-env-file.json", CONFIG_PATH_ENV).unwrap();
        drop(file);

        std::env::remove_var(CONFIG_PATH_ENV);
        let matches = build_cli().try_get_matches_from(["snapcam"]).unwrap();
        assert_eq!(resolve_config_path(&matches), None);

        load_env_file(&env_file).unwrap();
        let matches = build_cli().try_get_matches_from(["snapcam"]).unwrap();
        assert_eq!(resolve_config_path(&matches), Some(PathBuf::from("from-env-file.json")));

        std::env::set_var(CONFIG_PATH_ENV, "from-process.json");
        load_env_file(&env_file).unwrap();
        let matches = build_cli().try_get_matches_from(["snapcam"]).unwrap();
        assert_eq!(resolve_config_path(&matches), Some(PathBuf::from("from-process.json")));

        let matches = build_cli().try_get_matches_from(["snapcam", "-c", "from-flag.json"]).unwrap();
        assert_eq!(resolve_config_path(&matches), Some(PathBuf::from("from-flag.json")));

        std::env::remove_var(CONFIG_PATH_ENV);
        assert!(load_env_file(&tmp.path().join("missing.env")).is_err());
    }
}
