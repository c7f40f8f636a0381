use super::input::Prompt;
use crate::config::Config;
use crate::cookies::{self, CookieJar};
use crate::media::ytdlp::export_cookies;
use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::Path;
use tracing::warn;

pub async fn export(config: &Config) -> Result<()> {
    let file = config.cookie_file();
    println!(
        "Extracting cookies from {}...",
        config.cookies.browser
    );

    let size = export_cookies(&config.tools.ytdlp, &config.cookies.browser, &file).await?;
    println!("Cookie file saved: {} ({} bytes)", file.display(), size);
    println!("\nCopy this file to another machine and use it with:");
    println!("  vodgrab stream --cookies {}", file.display());
    Ok(())
}

/// Saves pasted cookie text. Returns `false` when nothing was saved.
pub fn import<R: BufRead>(target: &Path, prompt: &mut Prompt<R>) -> Result<bool> {
    println!("=== Import cookies ===");
    println!("Paste the output of 'vodgrab cookies show' from the other machine.");
    println!("Finish with two empty lines:\n");

    let lines = prompt.read_paste()?;
    if lines.is_empty() {
        println!("Nothing was entered.");
        return Ok(false);
    }

    let content = lines.join("\n");
    if !cookies::has_netscape_header(&content) {
        println!("\nWarning: this does not look like a Netscape cookie file.");
        if !prompt.confirm("Save anyway?")? {
            println!("Cancelled.");
            return Ok(false);
        }
    }

    let size = cookies::save(target, &content)?;
    let jar = CookieJar::parse(&content);
    if jar.is_empty() {
        warn!("Saved cookie file contains no cookie entries");
    }
    println!(
        "\nCookie file saved: {} ({} bytes, {} cookies)",
        target.display(),
        size,
        jar.len()
    );
    println!("It will be used automatically by 'vodgrab stream'.");
    Ok(true)
}

/// Prints the cookie file for copying. Returns `false` when it does not exist.
pub fn show(path: &Path) -> Result<bool> {
    if !path.exists() {
        println!("No cookie file at {}", path.display());
        println!("Run 'vodgrab cookies export' first.");
        return Ok(false);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cookie file {}", path.display()))?;
    println!("=== Cookie file: {} ===", path.display());
    println!("Copy the content below to the same path on the other machine:\n");
    println!("{content}");
    Ok(true)
}
