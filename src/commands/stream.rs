//! Interactive m3u8 download: collect URLs, download each, analyse the
//! results, clean up leftovers and pick the best variant.

use super::input::{parse_stream_urls, read_clipboard, Prompt};
use super::report::{self, Summary};
use crate::config::Config;
use crate::cookies::CookieSource;
use crate::media::manifest::{cleanup_patched, ManifestPatcher};
use crate::media::select::Selection;
use crate::media::ytdlp::{StreamDownloader, StreamOptions};
use crate::media::{download_all, Downloader, MediaKind, ProbeInfo, Prober};
use crate::utils::{format_duration, format_size, preview};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Default, Clone)]
pub struct StreamArgs {
    pub cookies: Option<PathBuf>,
    pub clipboard: bool,
    pub referer: Option<String>,
    pub output_dir: Option<PathBuf>,
}

pub async fn run<R: BufRead>(
    config: &Config,
    args: &StreamArgs,
    prompt: &mut Prompt<R>,
) -> Result<()> {
    let urls = collect_urls(args, prompt).await?;
    if urls.is_empty() {
        bail!("No URLs were entered");
    }

    println!("\nFound {} URL(s):", urls.len());
    for (i, url) in urls.iter().enumerate() {
        println!("  {}. {}", i + 1, preview(url, 80));
    }

    let referer = match &args.referer {
        Some(referer) => referer.clone(),
        None => {
            let answer = prompt.ask("\nReferer URL (optional, Enter to skip):")?;
            if answer.is_empty() {
                config.stream.referer.clone()
            } else {
                answer
            }
        }
    };

    let output_dir = resolve_output_dir(args.output_dir.clone(), prompt)?;

    let cookies = CookieSource::resolve(
        args.cookies.as_deref(),
        &config.cookie_file(),
        &config.cookies.browser,
    );

    println!("\nSettings:");
    println!("  - referer: {referer}");
    println!("  - output: {}", output_dir.display());
    println!("  - cookies: {}", cookies.describe());
    println!("\nStarting downloads...");

    let downloader = StreamDownloader::new(StreamOptions {
        ytdlp: config.tools.ytdlp.clone(),
        cookies,
        browser: config.cookies.browser.clone(),
        referer,
        user_agent: config.stream.user_agent.clone(),
        concurrent_fragments: config.stream.concurrent_fragments,
        patcher: ManifestPatcher::new(
            config.stream.patch_hosts.clone(),
            config.stream.token_param.clone(),
        ),
    });

    if !downloader.test_availability().await {
        warn!("{} is not available, downloads will fail", config.tools.ytdlp);
    }

    let downloaded: Vec<Option<PathBuf>> = download_all(&downloader, &urls, &output_dir)
        .await
        .into_iter()
        .map(|result| result.ok().flatten())
        .collect();

    println!("\nAnalyzing files...");
    let prober = Prober::new(config.tools.ffprobe.clone());
    let mut results = Vec::with_capacity(downloaded.len());
    for path in &downloaded {
        let info = match path {
            Some(path) => prober.analyze_file(path).await,
            None => None,
        };
        results.push(info);
    }

    report::print_results(&results);

    let selection = Selection::build(&results);
    let deletable = deletable_files(&results, selection.as_ref());
    if !deletable.is_empty() {
        println!("\n{}", report::rule('-'));
        println!(
            "Found {} deletable file(s) (playlist text or duplicate video)",
            deletable.len()
        );
        if prompt.confirm("Delete them?")? {
            report::delete_files(&deletable);
        }
    }

    if let Some(selection) = &selection {
        choose_best(selection, &deletable, prompt)?;
    }

    Summary::collect(&results, deletable.len()).print();

    let patched = cleanup_patched(&output_dir);
    if patched > 0 {
        println!("\nRemoved {patched} temporary patched manifest(s)");
    }

    Ok(())
}

async fn collect_urls<R: BufRead>(args: &StreamArgs, prompt: &mut Prompt<R>) -> Result<Vec<String>> {
    if args.clipboard {
        let text = read_clipboard().await?;
        return Ok(parse_stream_urls(&text));
    }

    println!("\n=== m3u8 stream downloader ===");
    println!("Enter m3u8 URLs (separate several with newlines or |)");
    println!("Press Enter on an empty line when done:\n");
    let lines = prompt.read_block()?;
    Ok(parse_stream_urls(&lines.join("\n")))
}

fn resolve_output_dir<R: BufRead>(
    explicit: Option<PathBuf>,
    prompt: &mut Prompt<R>,
) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let dir = match explicit {
        Some(dir) => dir,
        None => {
            let answer = prompt.ask(&format!(
                "\nOutput directory (Enter = current directory: {}):",
                cwd.display()
            ))?;
            if answer.is_empty() {
                return Ok(cwd);
            }
            PathBuf::from(answer)
        }
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}

/// Playlist text files and duplicate videos.
fn deletable_files(results: &[Option<ProbeInfo>], selection: Option<&Selection>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = results
        .iter()
        .flatten()
        .filter(|info| info.kind == MediaKind::Playlist)
        .map(|info| info.path.clone())
        .collect();

    if let Some(selection) = selection {
        paths.extend(selection.duplicates.iter().map(|info| info.path.clone()));
    }

    // yt-dlp can return the same file for two identical URLs
    let mut seen = HashSet::new();
    paths.retain(|path| seen.insert(path.clone()));
    paths
}

fn choose_best<R: BufRead>(
    selection: &Selection,
    removed: &[PathBuf],
    prompt: &mut Prompt<R>,
) -> Result<()> {
    report::heading(&format!("Best candidate ({})", selection.top_band.label()));

    let candidates = selection.candidates();
    let chosen = if selection.needs_choice() {
        println!("{} files share the top resolution band:", candidates.len());
        for (i, info) in candidates.iter().enumerate() {
            println!("  {}. {}", i + 1, candidate_line(info));
        }
        candidates[prompt.choose(candidates.len())?]
    } else {
        candidates[0]
    };

    println!("Selected: {}", chosen.path.display());
    info!("Selected {}", chosen.path.display());

    let others: Vec<PathBuf> = selection
        .ranked
        .iter()
        .map(|info| info.path.clone())
        .filter(|path| path != &chosen.path && !removed.contains(path) && path.exists())
        .collect();

    if !others.is_empty() && confirm_remove_others(&others, prompt)? {
        report::delete_files(&others);
    }

    Ok(())
}

fn confirm_remove_others<R: BufRead>(others: &[PathBuf], prompt: &mut Prompt<R>) -> Result<bool> {
    println!("\n{} other video(s) remain:", others.len());
    for path in others {
        println!("  {}", display_name(path));
    }
    prompt.confirm("Remove them and keep only the selected file?")
}

fn candidate_line(info: &ProbeInfo) -> String {
    format!(
        "{} ({}x{}, {}, {}, audio: {})",
        info.file_name(),
        info.width.unwrap_or(0),
        info.height.unwrap_or(0),
        format_duration(info.duration),
        format_size(info.size),
        if info.has_audio { "yes" } else { "no" }
    )
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompt(input: &str) -> Prompt<Cursor<Vec<u8>>> {
        Prompt::new(Cursor::new(input.as_bytes().to_vec()))
    }

    fn video(path: &Path, height: u32, size: u64) -> ProbeInfo {
        let mut info = ProbeInfo::new(path.to_path_buf(), size, MediaKind::Video);
        info.width = Some(height * 16 / 9);
        info.height = Some(height);
        info.duration = Some(60.0);
        info.has_audio = true;
        info
    }

    #[tokio::test]
    async fn test_run_without_urls_fails() {
        let config = Config::default();
        let err = run(&config, &StreamArgs::default(), &mut prompt("\n"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No URLs"));
    }

    #[test]
    fn test_resolve_output_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out");
        let answer = format!("{}\n", target.display());

        let resolved = resolve_output_dir(None, &mut prompt(&answer)).unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn test_resolve_output_dir_defaults_to_cwd() {
        let resolved = resolve_output_dir(None, &mut prompt("\n")).unwrap();
        assert_eq!(resolved, std::env::current_dir().unwrap());
    }

    #[test]
    fn test_deletable_files_include_playlists_and_duplicates() {
        let results = vec![
            Some(video(Path::new("/out/a.mp4"), 1080, 900)),
            Some(ProbeInfo::new(PathBuf::from("/out/p.mp4"), 20, MediaKind::Playlist)),
            Some(video(Path::new("/out/b.mp4"), 1080, 900)),
            None,
        ];
        let selection = Selection::build(&results);
        assert_eq!(
            deletable_files(&results, selection.as_ref()),
            vec![PathBuf::from("/out/p.mp4"), PathBuf::from("/out/b.mp4")]
        );
    }

    #[test]
    fn test_choose_best_removes_others_on_confirm() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        let c = dir.path().join("c.mp4");
        for path in [&a, &b, &c] {
            std::fs::write(path, "x").unwrap();
        }
        let results = vec![
            Some(video(&a, 1080, 900)),
            Some(video(&b, 1080, 950)),
            Some(video(&c, 720, 500)),
        ];
        let selection = Selection::build(&results).unwrap();

        // b ranks first by size; pick the second contender (a), then confirm removal
        choose_best(&selection, &[], &mut prompt("2\ny\n")).unwrap();
        assert!(a.exists());
        assert!(!b.exists());
        assert!(!c.exists());
    }

    #[test]
    fn test_choose_best_keeps_others_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        let c = dir.path().join("c.mp4");
        std::fs::write(&a, "x").unwrap();
        std::fs::write(&c, "x").unwrap();
        let results = vec![Some(video(&a, 1080, 900)), Some(video(&c, 720, 500))];
        let selection = Selection::build(&results).unwrap();

        choose_best(&selection, &[], &mut prompt("")).unwrap();
        assert!(a.exists());
        assert!(c.exists());
    }
}
