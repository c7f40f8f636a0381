use super::input::{parse_youtube_urls, read_clipboard, Prompt};
use crate::config::Config;
use crate::cookies::CookieSource;
use crate::media::{download_all, ytdlp::YoutubeDownloader, Downloader};
use anyhow::{bail, Result};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Default, Clone)]
pub struct YoutubeArgs {
    pub urls: Vec<String>,
    pub clipboard: bool,
    pub cookies: Option<PathBuf>,
    pub max_height: Option<u32>,
    pub output_dir: Option<PathBuf>,
}

pub async fn run<R: BufRead>(
    config: &Config,
    args: &YoutubeArgs,
    prompt: &mut Prompt<R>,
) -> Result<()> {
    let urls = if !args.urls.is_empty() {
        args.urls.clone()
    } else if args.clipboard {
        let text = read_clipboard().await?;
        parse_youtube_urls(&text.lines().collect::<Vec<_>>())
    } else {
        println!("\n=== YouTube downloader ===");
        println!("Enter YouTube URLs, one per line");
        println!("Press Enter on an empty line when done:\n");
        parse_youtube_urls(&prompt.read_block()?)
    };

    if urls.is_empty() {
        bail!("No URLs were entered");
    }

    // browser cookies unless a file was asked for explicitly
    let cookies = match &args.cookies {
        Some(path) => CookieSource::File(path.clone()),
        None => CookieSource::Browser(config.cookies.browser.clone()),
    };
    let downloader = YoutubeDownloader::new(
        config.tools.ytdlp.clone(),
        cookies.ytdlp_args(&config.cookies.browser),
        args.max_height.unwrap_or(config.youtube.max_height),
        config.youtube.output_template.clone(),
    );

    let output_dir = match &args.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.clone()
        }
        None => PathBuf::from("."),
    };

    if !downloader.test_availability().await {
        warn!("{} is not available, downloads will fail", config.tools.ytdlp);
    }

    println!("\nDownloading {} URL(s).", urls.len());
    let results = download_all(&downloader, &urls, &output_dir).await;
    let succeeded = results.iter().filter(|r| r.is_ok()).count();

    println!("\nDone: {}/{} succeeded", succeeded, urls.len());
    Ok(())
}
