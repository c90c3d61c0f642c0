use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin, stdin};

/// Line prompt over stdin.
pub struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    pub fn new() -> Self {
        Self { lines: BufReader::new(stdin()).lines() }
    }

    /// Print `message` and read one trimmed line; `None` once stdin is closed.
    pub async fn ask(&mut self, message: &str) -> Result<Option<String>> {
        print!("{message}");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_string()))
    }
}
