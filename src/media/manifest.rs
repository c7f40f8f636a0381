//! Rewrites m3u8 manifests whose segment URLs are relative so that every
//! segment, key and sub-playlist points at an absolute URL carrying the
//! access token from the manifest URL itself. The CDN rejects segment
//! requests without the token.

use anyhow::{anyhow, Context, Result};
use reqwest::header::{COOKIE, REFERER, USER_AGENT};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

const RESOURCE_EXTS: [&str; 4] = [".ts", ".key", ".mp4", ".m3u8"];
const URI_TAGS: [&str; 3] = ["#EXT-X-KEY", "#EXT-X-MAP", "#EXT-X-MEDIA"];
const PATCHED_PREFIX: &str = "patched_";
const PATCHED_SUFFIX: &str = ".m3u8";

#[derive(Debug, Clone)]
pub struct ManifestPatcher {
    hosts: Vec<String>,
    token_param: String,
}

/// Request details for fetching the upstream manifest.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub referer: String,
    pub user_agent: String,
    pub cookie_header: Option<String>,
}

impl ManifestPatcher {
    pub fn new(hosts: Vec<String>, token_param: impl Into<String>) -> Self {
        Self {
            hosts,
            token_param: token_param.into(),
        }
    }

    pub fn applies_to(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.hosts.iter().any(|h| host.contains(h.as_str())))
            .unwrap_or(false)
    }

    pub fn token(&self, url: &Url) -> Result<String> {
        url.query_pairs()
            .find(|(key, _)| key == self.token_param.as_str())
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("URL does not carry the `{}` token", self.token_param))
    }

    /// Rewrites every resource reference in `content`, keeping line structure intact.
    pub fn patch(&self, manifest_url: &Url, token: &str, content: &str) -> String {
        content
            .split('\n')
            .map(|raw| {
                let (line, cr) = match raw.strip_suffix('\r') {
                    Some(line) => (line, "\r"),
                    None => (raw, ""),
                };
                let patched = if is_resource_line(line) {
                    self.absolute_url(manifest_url, line.trim(), token)
                } else if URI_TAGS.iter().any(|tag| line.starts_with(tag)) {
                    self.patch_uri_attribute(manifest_url, line, token)
                } else {
                    line.to_string()
                };
                format!("{patched}{cr}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn absolute_url(&self, base: &Url, path: &str, token: &str) -> String {
        let full = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            match base.join(path) {
                Ok(joined) => joined.to_string(),
                Err(e) => {
                    warn!("Could not resolve {} against {}: {}", path, base, e);
                    path.to_string()
                }
            }
        };

        if full.contains(&format!("{}=", self.token_param)) {
            return full;
        }

        let separator = if full.contains('?') { '&' } else { '?' };
        format!("{full}{separator}{}={token}", self.token_param)
    }

    fn patch_uri_attribute(&self, base: &Url, line: &str, token: &str) -> String {
        let Some(start) = line.find("URI=\"").map(|i| i + 5) else {
            return line.to_string();
        };
        let Some(len) = line[start..].find('"') else {
            return line.to_string();
        };
        let uri = &line[start..start + len];

        // skd:// and data: keys are not fetched from the CDN
        if let Ok(parsed) = Url::parse(uri) {
            if !matches!(parsed.scheme(), "http" | "https") {
                return line.to_string();
            }
        }
        if uri.is_empty() {
            return line.to_string();
        }

        format!(
            "{}{}{}",
            &line[..start],
            self.absolute_url(base, uri, token),
            &line[start + len..]
        )
    }

    /// Downloads, patches and stores the manifest, returning the `file://` URL to hand to yt-dlp.
    pub async fn prepare(
        &self,
        manifest_url: &Url,
        options: &FetchOptions,
        output_dir: &Path,
    ) -> Result<Url> {
        let token = self.token(manifest_url)?;
        let id = video_id(manifest_url);
        info!("Patching manifest {}", id);

        let content = fetch_manifest(manifest_url, options).await?;
        let patched = self.patch(manifest_url, &token, &content);
        let path = write_patched(output_dir, &id, &patched)?;
        debug!("Saved patched manifest to {}", path.display());

        Url::from_file_path(&path)
            .map_err(|_| anyhow!("Cannot build a file URL for {}", path.display()))
    }
}

fn is_resource_line(line: &str) -> bool {
    !line.starts_with('#')
        && RESOURCE_EXTS
            .iter()
            .any(|ext| line.match_indices(ext).any(|(i, _)| i > 0))
}

/// File stem of the URL path, e.g. `index` for `.../hls/index.m3u8?x=1`.
pub fn video_id(url: &Url) -> String {
    Path::new(url.path())
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "manifest".to_string())
}

pub async fn fetch_manifest(url: &Url, options: &FetchOptions) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let mut request = client
        .get(url.as_str())
        .header(USER_AGENT, &options.user_agent)
        .header(REFERER, &options.referer);
    if let Some(cookie) = &options.cookie_header {
        request = request.header(COOKIE, cookie);
    }

    let response = request
        .send()
        .await
        .context("Failed to fetch manifest")?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download manifest: HTTP {}",
            response.status()
        ));
    }

    response.text().await.context("Failed to read manifest")
}

pub fn write_patched(output_dir: &Path, id: &str, content: &str) -> Result<PathBuf> {
    let dir = std::fs::canonicalize(output_dir)
        .with_context(|| format!("Output directory {} is not usable", output_dir.display()))?;
    let path = dir.join(format!("{PATCHED_PREFIX}{id}{PATCHED_SUFFIX}"));
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Deletes leftover `patched_*.m3u8` files. Returns how many were found.
pub fn cleanup_patched(output_dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(output_dir) else {
        return 0;
    };

    let patched: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(PATCHED_PREFIX) && name.ends_with(PATCHED_SUFFIX))
                .unwrap_or(false)
        })
        .collect();

    for path in &patched {
        if let Err(e) = std::fs::remove_file(path) {
            debug!("Could not remove {}: {}", path.display(), e);
        }
    }

    patched.len()
}
