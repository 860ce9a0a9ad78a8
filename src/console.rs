use std::io::{self, Write};

use async_trait::async_trait;
use dialoguer::{Input, Password};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("input closed")]
    Closed,
    #[error("prompt task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Line-oriented user interaction. `print` may be called from the update
/// listener while a read is pending.
#[async_trait]
pub trait Console: Send + Sync {
    async fn read_line(&self, prompt: &str) -> Result<String, ConsoleError>;

    async fn read_password(&self, prompt: &str) -> Result<String, ConsoleError>;

    /// Writes one complete line.
    fn print(&self, line: &str) -> Result<(), ConsoleError>;
}

/// Console on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Console for TerminalConsole {
    async fn read_line(&self, prompt: &str) -> Result<String, ConsoleError> {
        let prompt = prompt.to_string();
        let line = tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .report(false)
                .interact_text()
        })
        .await?
        .map_err(closed_on_eof)?;
        Ok(line)
    }

    async fn read_password(&self, prompt: &str) -> Result<String, ConsoleError> {
        let prompt = prompt.to_string();
        let password = tokio::task::spawn_blocking(move || Password::new().with_prompt(prompt).interact())
            .await?
            .map_err(closed_on_eof)?;
        Ok(password)
    }

    fn print(&self, line: &str) -> Result<(), ConsoleError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
        Ok(())
    }
}

fn closed_on_eof(error: dialoguer::Error) -> ConsoleError {
    match error {
        dialoguer::Error::IO(err) if err.kind() == io::ErrorKind::UnexpectedEof => ConsoleError::Closed,
        other => ConsoleError::Prompt(other),
    }
}
