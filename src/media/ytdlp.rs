use super::{
    downloader::Downloader,
    manifest::{FetchOptions, ManifestPatcher},
    types::DownloadJob,
};
use crate::cookies::{CookieJar, CookieSource};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

/// Page visited when dumping browser cookies; only the cookie jar is kept.
const COOKIE_EXPORT_URL: &str = "https://naver.com/";
const MAX_ERROR_LINES: usize = 3;

/// Downloads m3u8 streams into `download_NN_<id>.mp4` files.
pub struct StreamDownloader {
    ytdlp: String,
    cookies: CookieSource,
    browser: String,
    referer: String,
    user_agent: String,
    concurrent_fragments: u32,
    patcher: ManifestPatcher,
}

pub struct StreamOptions {
    pub ytdlp: String,
    pub cookies: CookieSource,
    pub browser: String,
    pub referer: String,
    pub user_agent: String,
    pub concurrent_fragments: u32,
    pub patcher: ManifestPatcher,
}

impl StreamDownloader {
    pub fn new(options: StreamOptions) -> Self {
        Self {
            ytdlp: options.ytdlp,
            cookies: options.cookies,
            browser: options.browser,
            referer: options.referer,
            user_agent: options.user_agent,
            concurrent_fragments: options.concurrent_fragments,
            patcher: options.patcher,
        }
    }

    fn build_args(&self, source_url: &str, output_file: &Path) -> Vec<String> {
        let mut args = vec!["-v".to_string(), "--enable-file-urls".to_string()];
        args.extend(self.cookies.ytdlp_args(&self.browser));
        args.extend([
            "--referer".to_string(),
            self.referer.clone(),
            "--user-agent".to_string(),
            self.user_agent.clone(),
            "--no-part".to_string(),
            "--restrict-filenames".to_string(),
            "-N".to_string(),
            self.concurrent_fragments.to_string(),
            "-o".to_string(),
            output_file.display().to_string(),
            source_url.to_string(),
        ]);
        args
    }

    /// Swaps a tokenized manifest URL for a locally patched copy.
    async fn resolve_source(&self, url: &str, output_dir: &Path) -> Result<String> {
        let Ok(parsed) = Url::parse(url) else {
            return Ok(url.to_string());
        };
        if !self.patcher.applies_to(&parsed) {
            return Ok(url.to_string());
        }

        let cookie_header = self
            .cookies
            .jar()
            .and_then(|jar: CookieJar| jar.header_for_url(&parsed));
        let options = FetchOptions {
            referer: self.referer.clone(),
            user_agent: self.user_agent.clone(),
            cookie_header,
        };

        let file_url = self.patcher.prepare(&parsed, &options, output_dir).await?;
        Ok(file_url.to_string())
    }
}

/// Output file stem for a job: `download_<NN>_<first 8 chars of the URL file stem>`.
pub fn output_stem(url: &str, index: usize) -> String {
    let base: String = url_base_name(url).chars().take(8).collect();
    format!("download_{index:02}_{base}")
}

pub fn url_base_name(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or(url).to_string());
    Path::new(&path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The expected output, or any file yt-dlp wrote under a different extension.
pub fn find_output(output_dir: &Path, stem: &str) -> Option<PathBuf> {
    let expected = output_dir.join(format!("{stem}.mp4"));
    if expected.exists() {
        return Some(expected);
    }

    let mut matches: Vec<PathBuf> = std::fs::read_dir(output_dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(stem))
                    .unwrap_or(false)
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

fn error_lines(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .filter(|line| line.contains("ERROR"))
        .take(MAX_ERROR_LINES)
        .map(|line| line.to_string())
        .collect()
}

#[async_trait]
impl Downloader for StreamDownloader {
    fn name(&self) -> &'static str {
        "m3u8 stream"
    }

    async fn download(&self, job: &DownloadJob) -> Result<Option<PathBuf>> {
        let stem = output_stem(&job.url, job.index);
        let output_file = job.output_dir.join(format!("{stem}.mp4"));
        let source_url = self.resolve_source(&job.url, &job.output_dir).await?;

        info!("Downloading {} to {}", job.url, output_file.display());
        let args = self.build_args(&source_url, &output_file);
        debug!("{} {}", self.ytdlp, args.join(" "));

        let output = Command::new(&self.ytdlp)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ytdlp))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "yt-dlp exited with {}\n{}",
                output.status,
                error_lines(&stderr).join("\n")
            ));
        }

        find_output(&job.output_dir, &stem)
            .map(Some)
            .ok_or_else(|| anyhow!("yt-dlp succeeded but no {}* file was written", stem))
    }

    async fn test_availability(&self) -> bool {
        ytdlp_available(&self.ytdlp).await
    }
}

/// Downloads YouTube videos at or below a height cap, showing yt-dlp's own progress.
pub struct YoutubeDownloader {
    ytdlp: String,
    cookie_args: Vec<String>,
    max_height: u32,
    output_template: String,
}

impl YoutubeDownloader {
    pub fn new(
        ytdlp: String,
        cookie_args: Vec<String>,
        max_height: u32,
        output_template: String,
    ) -> Self {
        Self {
            ytdlp,
            cookie_args,
            max_height,
            output_template,
        }
    }

    pub fn format_selector(&self) -> String {
        format!(
            "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
            h = self.max_height
        )
    }

    fn build_args(&self, url: &str, output_dir: &Path) -> Vec<String> {
        let mut args = self.cookie_args.clone();
        args.extend([
            "-f".to_string(),
            self.format_selector(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--no-part".to_string(),
            "--restrict-filenames".to_string(),
            "-o".to_string(),
            output_dir.join(&self.output_template).display().to_string(),
            url.to_string(),
        ]);
        args
    }
}

#[async_trait]
impl Downloader for YoutubeDownloader {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn download(&self, job: &DownloadJob) -> Result<Option<PathBuf>> {
        info!("Downloading {} with height <= {}", job.url, self.max_height);
        let status = Command::new(&self.ytdlp)
            .args(self.build_args(&job.url, &job.output_dir))
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.ytdlp))?;

        if !status.success() {
            return Err(anyhow!("yt-dlp exited with {}", status));
        }

        Ok(None)
    }

    async fn test_availability(&self) -> bool {
        ytdlp_available(&self.ytdlp).await
    }
}

pub async fn ytdlp_available(ytdlp: &str) -> bool {
    match Command::new(ytdlp).arg("--version").output().await {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            debug!("yt-dlp is available, version: {}", version.trim());
            true
        }
        Ok(_) => {
            warn!("{} --version failed", ytdlp);
            false
        }
        Err(e) => {
            warn!("{} not found: {}", ytdlp, e);
            false
        }
    }
}

/// Dumps the browser's cookie jar into `cookie_file`. Returns the written size.
pub async fn export_cookies(ytdlp: &str, browser: &str, cookie_file: &Path) -> Result<u64> {
    info!("Exporting {} cookies to {}", browser, cookie_file.display());

    let output = Command::new(ytdlp)
        .arg("--cookies-from-browser")
        .arg(browser)
        .arg("--cookies")
        .arg(cookie_file)
        .arg("--skip-download")
        .arg(COOKIE_EXPORT_URL)
        .output()
        .await
        .with_context(|| format!("Failed to run {}", ytdlp))?;

    // yt-dlp may fail on the page itself after the jar is already saved
    if !output.status.success() {
        debug!(
            "yt-dlp exited with {} during cookie export: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let metadata = std::fs::metadata(cookie_file)
        .map_err(|_| anyhow!("Cookie export failed: {} was not written", cookie_file.display()))?;
    Ok(metadata.len())
}
