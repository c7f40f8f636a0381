use super::types::DownloadJob;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Human-readable name of the downloader
    fn name(&self) -> &'static str;

    /// Download one job. `Ok(None)` means yt-dlp finished but chose the file name itself.
    async fn download(&self, job: &DownloadJob) -> Result<Option<PathBuf>>;

    /// Test if the tools this downloader shells out to are installed
    async fn test_availability(&self) -> bool;
}
