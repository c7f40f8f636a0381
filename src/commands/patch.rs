use crate::config::Config;
use crate::cookies::CookieSource;
use crate::media::manifest::{FetchOptions, ManifestPatcher};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone)]
pub struct PatchArgs {
    pub url: String,
    pub output_dir: PathBuf,
    pub cookies: Option<PathBuf>,
    pub referer: Option<String>,
}

/// Writes the patched manifest without downloading, for use with other players.
pub async fn run(config: &Config, args: &PatchArgs) -> Result<Url> {
    let url = Url::parse(&args.url).with_context(|| format!("Invalid URL: {}", args.url))?;
    let patcher = ManifestPatcher::new(
        config.stream.patch_hosts.clone(),
        config.stream.token_param.clone(),
    );
    if !patcher.applies_to(&url) {
        bail!(
            "{} is not served from a patched host ({})",
            url.host_str().unwrap_or_default(),
            config.stream.patch_hosts.join(", ")
        );
    }

    let cookies = CookieSource::resolve(
        args.cookies.as_deref(),
        &config.cookie_file(),
        &config.cookies.browser,
    );
    let options = FetchOptions {
        referer: args
            .referer
            .clone()
            .unwrap_or_else(|| config.stream.referer.clone()),
        user_agent: config.stream.user_agent.clone(),
        cookie_header: cookies
            .jar()
            .and_then(|jar| jar.header_for_url(&url)),
    };

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    let file_url = patcher.prepare(&url, &options, &args.output_dir).await?;
    println!("{file_url}");
    Ok(file_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(url: &str) -> PatchArgs {
        PatchArgs {
            url: url.to_string(),
            output_dir: PathBuf::from("."),
            cookies: None,
            referer: None,
        }
    }

    #[tokio::test]
    async fn test_rejects_invalid_url() {
        assert!(run(&Config::default(), &args("not a url")).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_other_hosts() {
        let err = run(&Config::default(), &args("https://example.com/a.m3u8?_lsu_sa_=x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("example.com"));
    }

    #[tokio::test]
    async fn test_requires_token() {
        let err = run(
            &Config::default(),
            &args("https://b01-kr-naver-vod.pstatic.net/a/index.m3u8"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("_lsu_sa_"));
    }
}
