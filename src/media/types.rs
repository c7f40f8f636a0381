use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A small text file holding an m3u8 playlist instead of media
    Playlist,
    Video,
    Audio,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub path: PathBuf,
    pub size: u64,
    pub kind: MediaKind,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub has_audio: bool,
}

impl ProbeInfo {
    pub fn new(path: PathBuf, size: u64, kind: MediaKind) -> Self {
        Self {
            path,
            size,
            kind,
            width: None,
            height: None,
            duration: None,
            video_codec: None,
            audio_codec: None,
            has_audio: false,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    /// 1-based position in the batch
    pub index: usize,
    pub total: usize,
    pub output_dir: PathBuf,
}
