pub mod cookies;
pub mod input;
pub mod patch;
pub mod report;
pub mod stream;
pub mod youtube;

use crate::config::Config;
use anyhow::Result;

pub async fn check(config: &Config) -> Result<()> {
    crate::media::test_setup(&config.tools.ytdlp, &config.tools.ffprobe).await
}
