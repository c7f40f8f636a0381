use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_COOKIE_FILE: &str = "~/.naver_cookies.txt";
pub const DEFAULT_REFERER: &str = "https://contents.premium.naver.com/";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:146.0) Gecko/20100101 Firefox/146.0";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub tools: ToolsConfig,
    pub cookies: CookiesConfig,
    pub stream: StreamConfig,
    pub youtube: YoutubeConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    pub ytdlp: String,
    pub ffprobe: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp: "yt-dlp".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CookiesConfig {
    pub file: String,
    pub browser: String,
}

impl Default for CookiesConfig {
    fn default() -> Self {
        Self {
            file: DEFAULT_COOKIE_FILE.to_string(),
            browser: "firefox".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StreamConfig {
    pub referer: String,
    pub user_agent: String,
    pub concurrent_fragments: u32,
    /// Manifests served from these hosts are patched before download
    pub patch_hosts: Vec<String>,
    pub token_param: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            concurrent_fragments: 4,
            patch_hosts: vec!["b01-kr-naver-vod.pstatic.net".to_string()],
            token_param: "_lsu_sa_".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct YoutubeConfig {
    pub max_height: u32,
    pub output_template: String,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            max_height: 1080,
            output_template: "%(title)s.%(ext)s".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    pub fn get_logging_format(&self) -> &str {
        &self.logging.format
    }

    /// The saved cookie file, with `~/` expanded.
    pub fn cookie_file(&self) -> PathBuf {
        expand_home(&self.cookies.file)
    }
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}
