use crate::media::{MediaKind, ProbeInfo};
use crate::utils::{format_duration, format_size};
use std::path::PathBuf;
use tracing::warn;

const RULE_WIDTH: usize = 60;

pub fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

pub fn heading(title: &str) {
    println!("\n{}", rule('='));
    println!("{title}");
    println!("{}", rule('='));
}

/// Detail lines for one analysed file, without the `[i] name` header.
pub fn describe(info: &ProbeInfo) -> Vec<String> {
    let mut lines = vec![
        format!("Path: {}", info.path.display()),
        format!("Size: {}", format_size(info.size)),
    ];

    match info.kind {
        MediaKind::Playlist => {
            lines.push("Type: text (m3u8 playlist)".to_string());
            lines.push("Status: deletable".to_string());
        }
        MediaKind::Video => {
            let resolution = match (info.width, info.height) {
                (Some(w), Some(h)) => format!("{w}x{h}"),
                _ => "N/A".to_string(),
            };
            let codecs = match &info.audio_codec {
                Some(audio) => format!(
                    "{} / {}",
                    info.video_codec.as_deref().unwrap_or("N/A"),
                    audio
                ),
                None => info.video_codec.as_deref().unwrap_or("N/A").to_string(),
            };
            lines.push("Type: video".to_string());
            lines.push(format!("Resolution: {resolution}"));
            lines.push(format!("Duration: {}", format_duration(info.duration)));
            lines.push(format!(
                "Audio: {}",
                if info.has_audio { "yes" } else { "no" }
            ));
            lines.push(format!("Codec: {codecs}"));
        }
        MediaKind::Audio => {
            lines.push("Type: audio".to_string());
            lines.push(format!("Duration: {}", format_duration(info.duration)));
            lines.push(format!(
                "Codec: {}",
                info.audio_codec.as_deref().unwrap_or("N/A")
            ));
        }
        MediaKind::Unknown => lines.push("Type: unknown".to_string()),
    }

    lines
}

pub fn print_results(results: &[Option<ProbeInfo>]) {
    heading("Download results");

    for (i, result) in results.iter().enumerate() {
        match result {
            None => println!("\n[{}] Download failed", i + 1),
            Some(info) => {
                println!("\n[{}] {}", i + 1, info.file_name());
                for line in describe(info) {
                    println!("    {line}");
                }
            }
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Summary {
    pub processed: usize,
    pub videos: usize,
    pub deletable: usize,
    pub video_bytes: u64,
}

impl Summary {
    pub fn collect(results: &[Option<ProbeInfo>], deletable: usize) -> Self {
        let videos: Vec<&ProbeInfo> = results
            .iter()
            .flatten()
            .filter(|info| info.kind == MediaKind::Video)
            .collect();

        Self {
            processed: results.len(),
            videos: videos.len(),
            deletable,
            video_bytes: videos.iter().map(|v| v.size).sum(),
        }
    }

    pub fn print(&self) {
        heading("Summary");
        println!("Processed {} URL(s)", self.processed);
        println!("  - videos: {}", self.videos);
        println!("  - deletable: {}", self.deletable);
        if self.videos > 0 {
            println!("  - total video size: {}", format_size(self.video_bytes));
        }
    }
}

/// Removes each file, reporting per file. Returns how many were deleted.
pub fn delete_files(paths: &[PathBuf]) -> usize {
    let mut deleted = 0;
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::remove_file(path) {
            Ok(()) => {
                println!("  Deleted: {name}");
                deleted += 1;
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                println!("  Failed to delete: {name} - {e}");
            }
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> ProbeInfo {
        let mut info = ProbeInfo::new(PathBuf::from("/out/download_01_abc.mp4"), 2048, MediaKind::Video);
        info.width = Some(1280);
        info.height = Some(720);
        info.duration = Some(65.0);
        info.video_codec = Some("h264".to_string());
        info.audio_codec = Some("aac".to_string());
        info.has_audio = true;
        info
    }

    #[test]
    fn test_describe_video() {
        let lines = describe(&video());
        assert_eq!(
            lines,
            vec![
                "Path: /out/download_01_abc.mp4",
                "Size: 2.0KB",
                "Type: video",
                "Resolution: 1280x720",
                "Duration: 1:05",
                "Audio: yes",
                "Codec: h264 / aac",
            ]
        );
    }

    #[test]
    fn test_describe_playlist_and_unknown() {
        let playlist = ProbeInfo::new(PathBuf::from("p.mp4"), 30, MediaKind::Playlist);
        assert!(describe(&playlist).contains(&"Status: deletable".to_string()));

        let unknown = ProbeInfo::new(PathBuf::from("u.bin"), 30, MediaKind::Unknown);
        assert_eq!(describe(&unknown).last().unwrap(), "Type: unknown");
    }

    #[test]
    fn test_describe_audio_without_codec() {
        let audio = ProbeInfo::new(PathBuf::from("a.m4a"), 30, MediaKind::Audio);
        let lines = describe(&audio);
        assert!(lines.contains(&"Duration: N/A".to_string()));
        assert!(lines.contains(&"Codec: N/A".to_string()));
    }

    #[test]
    fn test_summary_counts_videos_only() {
        let results = vec![
            Some(video()),
            None,
            Some(ProbeInfo::new(PathBuf::from("p"), 30, MediaKind::Playlist)),
            Some(video()),
        ];
        assert_eq!(
            Summary::collect(&results, 1),
            Summary {
                processed: 4,
                videos: 2,
                deletable: 1,
                video_bytes: 4096,
            }
        );
    }

    #[test]
    fn test_delete_files_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.m3u8");
        std::fs::write(&present, "#EXTM3U").unwrap();
        let missing = dir.path().join("missing.m3u8");

        assert_eq!(delete_files(&[present.clone(), missing]), 1);
        assert!(!present.exists());
    }
}
