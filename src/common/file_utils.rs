use crate::config_loader::MasterConfig;
use crate::errors::DirectoryError;
use std::path::{Path, PathBuf};
use log::debug;

pub const SNAPSHOT_EXTENSION: &str = "jpg";

/// `<root>/<host_name>/<timestamp>.jpg`
pub fn snapshot_path(root: &Path, host_name: &str, timestamp: &str) -> PathBuf {
    root.join(host_name).join(format!("{}.{}", timestamp, SNAPSHOT_EXTENSION))
}

pub fn ensure_output_directory(dir_path: &Path) -> Result<PathBuf, DirectoryError> {
    if !dir_path.exists() {
        debug!("Capture directory '{}' does not exist, creating it.", dir_path.display());
        std::fs::create_dir_all(dir_path).map_err(|source| DirectoryError::Create {
            path: dir_path.to_path_buf(),
            source,
        })?;
    } else if !dir_path.is_dir() {
        return Err(DirectoryError::NotADirectory {
            path: dir_path.to_path_buf(),
        });
    }
    Ok(dir_path.to_path_buf())
}

/// Creates the capture root, then one subdirectory per host directly under it.
///
/// Already existing directories are fine. Stops at the first path that cannot
/// be created. On success returns every ensured directory, root first.
pub fn ensure_capture_directories(config: &MasterConfig) -> Result<Vec<PathBuf>, DirectoryError> {
    let mut ensured = Vec::with_capacity(config.hosts.len() + 1);
    ensured.push(ensure_output_directory(&config.capture_directory)?);
    for host in &config.hosts {
        ensured.push(ensure_output_directory(&config.capture_directory.join(&host.name))?);
    }
    Ok(ensured)
}
