use super::types::{MediaKind, ProbeInfo};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Files below this size are checked for playlist text before probing.
const SMALL_FILE_LIMIT: u64 = 10_000;
const SNIFF_BYTES: u64 = 1_000;

pub struct Prober {
    ffprobe: String,
}

impl Prober {
    pub fn new(ffprobe: impl Into<String>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    /// Inspects a downloaded file. `None` when the file does not exist.
    pub async fn analyze_file(&self, path: &Path) -> Option<ProbeInfo> {
        let size = std::fs::metadata(path).ok()?.len();

        if size < SMALL_FILE_LIMIT && is_playlist_text(path) {
            debug!("{} is a playlist text file", path.display());
            return Some(ProbeInfo::new(path.to_path_buf(), size, MediaKind::Playlist));
        }

        let output = match Command::new(&self.ffprobe)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {}: {}", self.ffprobe, e);
                return Some(ProbeInfo::new(path.to_path_buf(), size, MediaKind::Unknown));
            }
        };

        if !output.status.success() {
            debug!("ffprobe exited with {} for {}", output.status, path.display());
            return Some(ProbeInfo::new(path.to_path_buf(), size, MediaKind::Unknown));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        Some(parse_ffprobe_output(path.to_path_buf(), size, &json_str))
    }

    pub async fn test_availability(&self) -> bool {
        match Command::new(&self.ffprobe).arg("-version").output().await {
            Ok(output) if output.status.success() => {
                let version_line = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("unknown")
                    .to_string();
                debug!("ffprobe is available: {}", version_line);
                true
            }
            Ok(_) => {
                warn!("{} -version failed", self.ffprobe);
                false
            }
            Err(e) => {
                warn!("{} not found: {}", self.ffprobe, e);
                false
            }
        }
    }
}

fn is_playlist_text(path: &Path) -> bool {
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut head = Vec::new();
    if file.take(SNIFF_BYTES).read_to_end(&mut head).is_err() {
        return false;
    }
    let valid = match std::str::from_utf8(&head) {
        Ok(_) => head.len(),
        // a multi-byte character cut off by the read limit
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => return false,
    };
    let text = String::from_utf8_lossy(&head[..valid]);
    text.starts_with("#EXTM3U") || text.starts_with("#EXT")
}

/// Builds a `ProbeInfo` from `ffprobe -show_format -show_streams` JSON.
pub fn parse_ffprobe_output(path: PathBuf, size: u64, json_str: &str) -> ProbeInfo {
    let json: Value = match serde_json::from_str(json_str) {
        Ok(json) => json,
        Err(e) => {
            debug!("Unparseable ffprobe output for {}: {}", path.display(), e);
            return ProbeInfo::new(path, size, MediaKind::Unknown);
        }
    };

    let mut info = ProbeInfo::new(path, size, MediaKind::Video);

    for stream in json["streams"].as_array().into_iter().flatten() {
        match stream["codec_type"].as_str() {
            // first video stream only; later ones are usually attached cover art
            Some("video") if info.width.is_none() => {
                info.width = stream["width"].as_u64().map(|w| w as u32);
                info.height = stream["height"].as_u64().map(|h| h as u32);
                info.video_codec = stream["codec_name"].as_str().map(|s| s.to_string());
            }
            Some("audio") => {
                info.has_audio = true;
                info.audio_codec = stream["codec_name"].as_str().map(|s| s.to_string());
            }
            _ => {}
        }
    }

    // ffprobe reports duration as a string
    info.duration = match &json["format"]["duration"] {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };

    if info.width.is_none() {
        info.kind = if info.has_audio {
            MediaKind::Audio
        } else {
            MediaKind::Unknown
        };
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "h264", "codec_type": "video", "width": 1920, "height": 1080},
            {"index": 1, "codec_name": "aac", "codec_type": "audio"}
        ],
        "format": {"duration": "125.400000", "size": "123456"}
    }"#;

    #[test]
    fn test_parse_video_with_audio() {
        let info = parse_ffprobe_output(PathBuf::from("a.mp4"), 123456, VIDEO_JSON);
        assert_eq!(info.kind, MediaKind::Video);
        assert_eq!(info.width, Some(1920));
        assert_eq!(info.height, Some(1080));
        assert_eq!(info.video_codec.as_deref(), Some("h264"));
        assert_eq!(info.audio_codec.as_deref(), Some("aac"));
        assert!(info.has_audio);
        assert_eq!(info.duration, Some(125.4));
    }

    #[test]
    fn test_parse_keeps_first_video_stream() {
        let json = r#"{
            "streams": [
                {"codec_name": "h264", "codec_type": "video", "width": 1280, "height": 720},
                {"codec_name": "aac", "codec_type": "audio"},
                {"codec_name": "mjpeg", "codec_type": "video", "width": 300, "height": 300}
            ],
            "format": {"duration": "10.0"}
        }"#;
        let info = parse_ffprobe_output(PathBuf::from("a.mp4"), 10, json);
        assert_eq!(info.height, Some(720));
        assert_eq!(info.video_codec.as_deref(), Some("h264"));
    }

    #[test]
    fn test_parse_audio_only() {
        let json = r#"{"streams": [{"codec_name": "aac", "codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        let info = parse_ffprobe_output(PathBuf::from("a.m4a"), 10, json);
        assert_eq!(info.kind, MediaKind::Audio);
        assert_eq!(info.width, None);
        assert_eq!(info.duration, Some(3.0));
    }

    #[test]
    fn test_parse_without_streams_is_unknown() {
        let info = parse_ffprobe_output(PathBuf::from("x.bin"), 10, r#"{"format": {}}"#);
        assert_eq!(info.kind, MediaKind::Unknown);
        assert_eq!(info.duration, None);
    }

    #[test]
    fn test_parse_invalid_json_is_unknown() {
        let info = parse_ffprobe_output(PathBuf::from("x.bin"), 10, "not json");
        assert_eq!(info.kind, MediaKind::Unknown);
        assert_eq!(info.size, 10);
    }

    #[tokio::test]
    async fn test_analyze_missing_file() {
        let prober = Prober::new("ffprobe");
        assert!(prober
            .analyze_file(Path::new("/nonexistent/download_01.mp4"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_analyze_small_playlist_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("download_01_abc.mp4");
        std::fs::write(&path, "#EXTM3U\n#EXT-X-VERSION:3\n").unwrap();

        // the prober binary is never reached for playlist text
        let prober = Prober::new("/nonexistent/ffprobe");
        let info = prober.analyze_file(&path).await.unwrap();
        assert_eq!(info.kind, MediaKind::Playlist);
        assert_eq!(info.size, 25);
    }

    #[tokio::test]
    async fn test_analyze_playlist_with_character_split_at_sniff_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("download_01_abc.mp4");
        let mut content = String::from("#EXTM3U\n#EXTINF:4,");
        content.push_str(&"a".repeat(998 - content.len()));
        content.push('한');
        content.push_str("\nseg.ts\n");
        std::fs::write(&path, &content).unwrap();

        let prober = Prober::new("/nonexistent/ffprobe");
        let info = prober.analyze_file(&path).await.unwrap();
        assert_eq!(info.kind, MediaKind::Playlist);
        assert_eq!(info.size, 1009);
    }

    #[tokio::test]
    async fn test_analyze_invalid_utf8_is_not_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("download_01_abc.mp4");
        let mut content = b"#EXTM3U\n".to_vec();
        content.extend([0xff, 0xfe, b'\n']);
        std::fs::write(&path, &content).unwrap();

        let prober = Prober::new("/nonexistent/ffprobe");
        let info = prober.analyze_file(&path).await.unwrap();
        assert_eq!(info.kind, MediaKind::Unknown);
    }

    #[tokio::test]
    async fn test_analyze_without_prober_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("download_01_abc.mp4");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let prober = Prober::new("/nonexistent/ffprobe");
        let info = prober.analyze_file(&path).await.unwrap();
        assert_eq!(info.kind, MediaKind::Unknown);
        assert_eq!(info.size, 64);
    }

    #[tokio::test]
    #[ignore = "Requires ffprobe installed"]
    async fn test_prober_availability() {
        assert!(Prober::new("ffprobe").test_availability().await);
    }
}
