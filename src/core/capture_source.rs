use crate::errors::FetchError;
use async_trait::async_trait;
use std::path::Path;

/// Something that can pull one snapshot from `url` and write it to `destination`.
///
/// `destination` is created fresh (truncated if present). Success means the
/// whole body reached the file; the returned value is the byte count.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, FetchError>;
}
