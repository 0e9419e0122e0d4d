use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a single host's snapshot could not be saved.
///
/// None of these are fatal: the capture round logs them against the host and
/// moves on.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("no complete response within {0:?}")]
    Timeout(Duration),

    #[error("bad status: {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("failed to create file '{}': {source}", path.display())]
    FileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write to file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err)
    }
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("failed to create capture directory '{}': {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("capture path '{}' exists but is not a directory", path.display())]
    NotADirectory { path: PathBuf },
}

impl DirectoryError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            DirectoryError::Create { path, .. } => path,
            DirectoryError::NotADirectory { path } => path,
        }
    }
}
