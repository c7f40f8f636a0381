mod downloader;
pub mod manifest;
pub mod probe;
pub mod select;
mod types;
pub mod ytdlp;

pub use downloader::Downloader;
pub use probe::Prober;
pub use types::{DownloadJob, MediaKind, ProbeInfo};

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Runs one job per URL, in order. A failed job is reported and the batch moves on.
pub async fn download_all(
    downloader: &dyn Downloader,
    urls: &[String],
    output_dir: &Path,
) -> Vec<Result<Option<PathBuf>>> {
    let total = urls.len();
    let mut results = Vec::with_capacity(total);

    for (i, url) in urls.iter().enumerate() {
        let job = DownloadJob {
            url: url.clone(),
            index: i + 1,
            total,
            output_dir: output_dir.to_path_buf(),
        };

        println!(
            "\n[{}/{}] Downloading: {}",
            job.index,
            job.total,
            crate::utils::preview(url, 60)
        );

        let result = downloader.download(&job).await;
        match &result {
            Ok(_) => {
                info!("{} finished job {}", downloader.name(), job.index);
                println!("  Done.");
            }
            Err(e) => {
                warn!("{} failed for {}: {}", downloader.name(), url, e);
                println!("  [error] Download failed");
                for line in format!("{e:#}").lines().filter(|l| !l.trim().is_empty()) {
                    println!("    {line}");
                }
            }
        }
        results.push(result);
    }

    results
}

/// Checks the external tools every command depends on.
pub async fn test_setup(ytdlp_bin: &str, ffprobe_bin: &str) -> Result<()> {
    info!("Testing media tool setup...");

    let ytdlp_available = ytdlp::ytdlp_available(ytdlp_bin).await;
    let ffprobe_available = Prober::new(ffprobe_bin).test_availability().await;

    println!(
        "{}: {}",
        ytdlp_bin,
        if ytdlp_available { "ok" } else { "missing" }
    );
    println!(
        "{}: {}",
        ffprobe_bin,
        if ffprobe_available { "ok" } else { "missing" }
    );

    if ytdlp_available && !ffprobe_available {
        warn!("Downloads will work but file analysis is disabled without ffprobe");
    }

    if ytdlp_available {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} is not available. Please install yt-dlp.",
            ytdlp_bin
        ))
    }
}
