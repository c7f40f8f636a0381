//! Netscape-format cookie files, the format yt-dlp reads with `--cookies`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use url::Url;

const NETSCAPE_HEADERS: [&str; 2] = ["# Netscape HTTP Cookie File", "# HTTP Cookie File"];

#[derive(Debug, Clone, PartialEq)]
pub struct Cookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix seconds; 0 means a session cookie
    pub expires: u64,
    pub name: String,
    pub value: String,
}

impl Cookie {
    fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let domain = self.domain.to_ascii_lowercase();
        match domain.strip_prefix('.') {
            Some(bare) => host == bare || host.ends_with(&domain),
            None if self.include_subdomains => host == domain || host.ends_with(&format!(".{domain}")),
            None => host == domain,
        }
    }

    fn matches_path(&self, request_path: &str) -> bool {
        let cookie_path = self.path.trim_end_matches('/');
        cookie_path.is_empty()
            || request_path == cookie_path
            || request_path.starts_with(&format!("{cookie_path}/"))
    }

    fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires < now
    }
}

#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn parse(content: &str) -> Self {
        let mut cookies = Vec::new();

        for line in content.lines() {
            let line = line.trim_end_matches(['\r', '\n']);
            let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);

            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 7 {
                debug!("Skipping malformed cookie line with {} fields", parts.len());
                continue;
            }

            cookies.push(Cookie {
                domain: parts[0].to_string(),
                include_subdomains: parts[1].eq_ignore_ascii_case("TRUE"),
                path: parts[2].to_string(),
                secure: parts[3].eq_ignore_ascii_case("TRUE"),
                expires: parts[4].parse().unwrap_or(0),
                name: parts[5].to_string(),
                value: parts[6].to_string(),
            });
        }

        Self { cookies }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cookie file {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// `Cookie:` header value for a request to `url`, or `None` if nothing matches.
    pub fn header_for_url(&self, url: &Url) -> Option<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.header_for_url_at(url, now)
    }

    fn header_for_url_at(&self, url: &Url, now: u64) -> Option<String> {
        let host = url.host_str()?;
        let https = url.scheme() == "https";
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| c.matches_host(host) && c.matches_path(url.path()))
            .filter(|c| (https || !c.secure) && !c.is_expired(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

pub fn has_netscape_header(content: &str) -> bool {
    let content = content.trim_start();
    NETSCAPE_HEADERS.iter().any(|h| content.starts_with(h))
}

/// Writes pasted cookie text, making sure it ends with a newline. Returns the file size.
pub fn save(path: &Path, content: &str) -> Result<u64> {
    let mut data = content.to_string();
    if !data.ends_with('\n') {
        data.push('\n');
    }
    std::fs::write(path, data)
        .with_context(|| format!("Failed to write cookie file {}", path.display()))?;
    let size = std::fs::metadata(path)?.len();
    Ok(size)
}

/// Where yt-dlp should take cookies from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    File(PathBuf),
    Browser(String),
}

impl CookieSource {
    /// Explicit file first, then the default file if it exists, then the browser.
    pub fn resolve(explicit: Option<&Path>, default_file: &Path, browser: &str) -> Self {
        if let Some(path) = explicit {
            return CookieSource::File(path.to_path_buf());
        }
        if default_file.exists() {
            return CookieSource::File(default_file.to_path_buf());
        }
        CookieSource::Browser(browser.to_string())
    }

    /// yt-dlp arguments. A cookie file that vanished falls back to the browser.
    pub fn ytdlp_args(&self, browser: &str) -> Vec<String> {
        match self {
            CookieSource::File(path) if path.exists() => {
                vec!["--cookies".to_string(), path.display().to_string()]
            }
            CookieSource::File(_) => {
                vec!["--cookies-from-browser".to_string(), browser.to_string()]
            }
            CookieSource::Browser(name) => {
                vec!["--cookies-from-browser".to_string(), name.clone()]
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CookieSource::File(path) => format!("file: {}", path.display()),
            CookieSource::Browser(name) => format!("{} browser", name),
        }
    }

    pub fn jar(&self) -> Option<CookieJar> {
        match self {
            CookieSource::File(path) => CookieJar::load(path).ok(),
            CookieSource::Browser(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Netscape HTTP Cookie File\n\
# This file is generated by yt-dlp.  Do not edit.\n\
\n\
.naver.com\tTRUE\t/\tTRUE\t0\tNID_AUT\tabc\n\
#HttpOnly_.naver.com\tTRUE\t/\tTRUE\t4102444800\tNID_SES\tdef\n\
contents.premium.naver.com\tFALSE\t/\tFALSE\t1\told\tgone\n\
broken line\n\
.example.com\tTRUE\t/\tFALSE\t0\tother\txyz\n";

    #[test]
    fn test_parse_skips_comments_and_malformed_lines() {
        let jar = CookieJar::parse(SAMPLE);
        assert_eq!(jar.len(), 4);
        assert!(!jar.is_empty());
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_header_for_url_matches_domain_and_subdomains() {
        let jar = CookieJar::parse(SAMPLE);
        assert_eq!(
            jar.header_for_url_at(&url("https://naver.com/"), 100),
            Some("NID_AUT=abc; NID_SES=def".to_string())
        );
        assert_eq!(
            jar.header_for_url_at(&url("https://b01-kr-naver-vod.pstatic.net/a.m3u8"), 100),
            None
        );
        assert_eq!(
            jar.header_for_url_at(&url("http://www.example.com/x"), 100),
            Some("other=xyz".to_string())
        );
    }

    #[test]
    fn test_header_for_url_drops_expired_and_insecure() {
        let jar = CookieJar::parse(SAMPLE);
        let header = jar
            .header_for_url_at(&url("https://contents.premium.naver.com/ch/1"), 100)
            .unwrap();
        assert_eq!(header, "NID_AUT=abc; NID_SES=def");

        // secure cookies are never sent over plain http
        assert_eq!(jar.header_for_url_at(&url("http://naver.com/"), 100), None);
    }

    #[test]
    fn test_header_for_url_respects_path() {
        let jar = CookieJar::parse(".example.com\tTRUE\t/premium\tFALSE\t0\tp\t1\n");
        assert_eq!(
            jar.header_for_url_at(&url("https://example.com/premium/a"), 100),
            Some("p=1".to_string())
        );
        assert_eq!(
            jar.header_for_url_at(&url("https://example.com/premium"), 100),
            Some("p=1".to_string())
        );
        assert_eq!(jar.header_for_url_at(&url("https://example.com/premiumx"), 100), None);
        assert_eq!(jar.header_for_url_at(&url("https://example.com/"), 100), None);
    }

    #[test]
    fn test_has_netscape_header() {
        assert!(has_netscape_header(SAMPLE));
        assert!(has_netscape_header("\n  # HTTP Cookie File\n"));
        assert!(!has_netscape_header("NID_AUT=abc"));
    }

    #[test]
    fn test_save_appends_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        let size = save(&path, "# Netscape HTTP Cookie File").unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "# Netscape HTTP Cookie File\n");
        assert_eq!(size, written.len() as u64);

        save(&path, "line\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }

    #[test]
    fn test_cookie_source_priority() {
        let dir = tempfile::tempdir().unwrap();
        let default_file = dir.path().join("default.txt");
        let explicit = dir.path().join("explicit.txt");

        assert_eq!(
            CookieSource::resolve(None, &default_file, "firefox"),
            CookieSource::Browser("firefox".to_string())
        );

        std::fs::write(&default_file, "# Netscape HTTP Cookie File\n").unwrap();
        assert_eq!(
            CookieSource::resolve(None, &default_file, "firefox"),
            CookieSource::File(default_file.clone())
        );
        assert_eq!(
            CookieSource::resolve(Some(&explicit), &default_file, "firefox"),
            CookieSource::File(explicit.clone())
        );
    }

    #[test]
    fn test_missing_cookie_file_falls_back_to_browser_args() {
        let source = CookieSource::File(PathBuf::from("/nonexistent/cookies.txt"));
        assert_eq!(
            source.ytdlp_args("firefox"),
            vec!["--cookies-from-browser", "firefox"]
        );
    }
}
