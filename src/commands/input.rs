use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, StdinLock, Write};
use tokio::process::Command;
use tracing::debug;

/// Clipboard readers tried in order; the first that succeeds wins.
const CLIPBOARD_COMMANDS: [(&str, &[&str]); 4] = [
    ("pbpaste", &[]),
    ("wl-paste", &["--no-newline"]),
    ("xclip", &["-selection", "clipboard", "-o"]),
    ("xsel", &["--clipboard", "--output"]),
];

/// Line-oriented terminal input. Generic over the reader so tests can feed a `Cursor`.
pub struct Prompt<R> {
    reader: R,
}

impl Prompt<StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock())
    }
}

impl<R: BufRead> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// One line without its terminator, or `None` at EOF.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("Failed to read input")?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Prints `question` on its own line and returns the trimmed answer ("" at EOF).
    pub fn ask(&mut self, question: &str) -> Result<String> {
        println!("{question}");
        Ok(self.read_line()?.unwrap_or_default().trim().to_string())
    }

    /// `y`/`Y` confirms; anything else, including EOF, declines.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        print!("{question} (y/N): ");
        std::io::stdout().flush()?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }

    /// Lines up to the first blank line or EOF.
    pub fn read_block(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.trim().is_empty() {
                break;
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Lines up to two consecutive blank lines or EOF. Single blank lines are kept.
    pub fn read_paste(&mut self) -> Result<Vec<String>> {
        let mut lines: Vec<String> = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.trim().is_empty() {
                if lines.last().is_some_and(|last| last.is_empty()) {
                    lines.pop();
                    break;
                }
                lines.push(String::new());
            } else {
                lines.push(line);
            }
        }
        Ok(lines)
    }

    /// Asks for a number in `1..=count`. Enter or EOF picks the first. Returns a 0-based index.
    pub fn choose(&mut self, count: usize) -> Result<usize> {
        loop {
            print!("Pick a file [1-{count}] (Enter = 1): ");
            std::io::stdout().flush()?;
            let Some(answer) = self.read_line()? else {
                return Ok(0);
            };
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(0);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=count).contains(&n) => return Ok(n - 1),
                _ => println!("Enter a number between 1 and {count}."),
            }
        }
    }
}

/// Splits on runs of `|` or newlines and keeps only `http...` entries.
pub fn parse_stream_urls(text: &str) -> Vec<String> {
    text.split(['|', '\n'])
        .map(str::trim)
        .filter(|part| part.starts_with("http"))
        .map(str::to_string)
        .collect()
}

pub fn parse_youtube_urls<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| line.contains("youtube.com") || line.contains("youtu.be"))
        .map(str::to_string)
        .collect()
}

pub async fn read_clipboard() -> Result<String> {
    for (program, args) in CLIPBOARD_COMMANDS {
        match Command::new(program).args(args).output().await {
            Ok(output) if output.status.success() => {
                debug!("Read clipboard with {}", program);
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }
            Ok(output) => debug!("{} exited with {}", program, output.status),
            Err(e) => debug!("{} unavailable: {}", program, e),
        }
    }
    Err(anyhow!(
        "No clipboard reader found (tried pbpaste, wl-paste, xclip, xsel)"
    ))
}
