use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod commands;
mod config;
mod cookies;
mod media;
mod utils;

use commands::input::Prompt;
use config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download m3u8 streams interactively, then analyse and tidy the results
    Stream {
        /// Cookie file (Netscape format)
        #[arg(short, long)]
        cookies: Option<PathBuf>,
        /// Read URLs from the clipboard instead of stdin
        #[arg(long)]
        clipboard: bool,
        /// Referer sent with every request
        #[arg(short, long)]
        referer: Option<String>,
        /// Directory for downloaded files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Download YouTube videos
    Youtube {
        /// Video URLs; prompts for them when omitted
        urls: Vec<String>,
        /// Read URLs from the clipboard instead of stdin
        #[arg(long)]
        clipboard: bool,
        /// Cookie file to use instead of the browser's cookies
        #[arg(short, long)]
        cookies: Option<PathBuf>,
        /// Highest video height to download
        #[arg(long)]
        max_height: Option<u32>,
        /// Directory for downloaded files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Manage the saved cookie file
    Cookies {
        #[command(subcommand)]
        action: CookiesAction,
    },
    /// Fetch a tokenized manifest and write the patched copy
    Patch {
        url: String,
        /// Directory for the patched manifest
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(short, long)]
        cookies: Option<PathBuf>,
        #[arg(short, long)]
        referer: Option<String>,
    },
    /// Check that yt-dlp and ffprobe are installed
    Check,
}

#[derive(Subcommand, Debug)]
enum CookiesAction {
    /// Extract browser cookies into the default cookie file
    Export,
    /// Paste cookie text from another machine and save it
    Import,
    /// Print the cookie file for copying
    Show {
        /// Cookie file to print instead of the default one
        #[arg(short, long)]
        cookies: Option<PathBuf>,
    },
}

fn get_config_path(args: &Args) -> Option<String> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var("VODGRAB_CONFIG") {
        return Some(path);
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = format!("{}/vodgrab/config.toml", xdg_config_home);
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = format!("{}/.config/vodgrab/config.toml", home.display());
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    None
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    if config.get_logging_format() == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn dispatch(command: Command, config: &Config) -> Result<()> {
    let mut prompt = Prompt::stdin();

    match command {
        Command::Stream {
            cookies,
            clipboard,
            referer,
            output_dir,
        } => {
            let args = commands::stream::StreamArgs {
                cookies,
                clipboard,
                referer,
                output_dir,
            };
            commands::stream::run(config, &args, &mut prompt).await
        }
        Command::Youtube {
            urls,
            clipboard,
            cookies,
            max_height,
            output_dir,
        } => {
            let args = commands::youtube::YoutubeArgs {
                urls,
                clipboard,
                cookies,
                max_height,
                output_dir,
            };
            commands::youtube::run(config, &args, &mut prompt).await
        }
        Command::Cookies { action } => match action {
            CookiesAction::Export => commands::cookies::export(config).await,
            CookiesAction::Import => {
                commands::cookies::import(&config.cookie_file(), &mut prompt).map(|_| ())
            }
            CookiesAction::Show { cookies } => {
                let path = cookies.unwrap_or_else(|| config.cookie_file());
                commands::cookies::show(&path).map(|_| ())
            }
        },
        Command::Patch {
            url,
            output_dir,
            cookies,
            referer,
        } => {
            let args = commands::patch::PatchArgs {
                url,
                output_dir,
                cookies,
                referer,
            };
            commands::patch::run(config, &args).await.map(|_| ())
        }
        Command::Check => commands::check(config).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match get_config_path(&args) {
        Some(config_path) => Config::from_file(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path))?,
        None => Config::default(),
    };

    init_logging(&config);
    info!("Starting vodgrab...");

    // stdin reads block the main task, so interrupts are watched on a worker
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n\nInterrupted.");
            std::process::exit(0);
        }
    });

    dispatch(args.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_stream_flags() {
        let args = Args::parse_from([
            "vodgrab",
            "stream",
            "--cookies",
            "c.txt",
            "--clipboard",
            "-o",
            "out",
        ]);
        match args.command {
            Command::Stream {
                cookies,
                clipboard,
                referer,
                output_dir,
            } => {
                assert_eq!(cookies, Some(PathBuf::from("c.txt")));
                assert!(clipboard);
                assert_eq!(referer, None);
                assert_eq!(output_dir, Some(PathBuf::from("out")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_youtube_urls_and_global_config() {
        let args = Args::parse_from([
            "vodgrab",
            "youtube",
            "https://youtu.be/a",
            "https://youtu.be/b",
            "--config",
            "/etc/vodgrab.toml",
        ]);
        assert_eq!(args.config.as_deref(), Some("/etc/vodgrab.toml"));
        assert_eq!(get_config_path(&args).as_deref(), Some("/etc/vodgrab.toml"));
        match args.command {
            Command::Youtube { urls, .. } => assert_eq!(urls.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_cookies_show() {
        let args = Args::parse_from(["vodgrab", "cookies", "show", "-c", "x.txt"]);
        match args.command {
            Command::Cookies {
                action: CookiesAction::Show { cookies },
            } => assert_eq!(cookies, Some(PathBuf::from("x.txt"))),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
