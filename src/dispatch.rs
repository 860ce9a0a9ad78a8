//! Executes chat-scope commands against the selected peer.

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::Authorized;
use crate::command::{ChatCommand, CommandError, parse_chat_line};
use crate::config::SessionSettings;
use crate::console::{Console, ConsoleError};
use crate::dialogs::DialogBrowser;
use crate::media_index::{FoundMediaIndex, MediaIndexError};
use crate::output::{history_line, progress_line};
use crate::protocol::{ProgressSink, ProtocolClient, ProtocolError, SendOptions};
use crate::transfer::{MediaTransfer, TransferError};
use crate::types::Entity;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    MediaIndex(#[from] MediaIndexError),
    #[error("request failed: {0}")]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Console(#[from] ConsoleError),
}

/// What the chat loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    LeaveChat,
    Exit,
}

/// The chat a command runs in.
pub struct ChatContext<'a> {
    pub peer: &'a Entity,
    pub media: &'a mut FoundMediaIndex,
}

pub struct CommandDispatcher {
    client: Arc<dyn ProtocolClient>,
    browser: DialogBrowser,
    transfer: MediaTransfer,
    console: Arc<dyn Console>,
    settings: SessionSettings,
}

impl CommandDispatcher {
    pub fn new(session: &Authorized, console: Arc<dyn Console>, settings: SessionSettings) -> Self {
        let client = Arc::clone(session.client());
        Self {
            browser: DialogBrowser::new(session),
            transfer: MediaTransfer::new(Arc::clone(&client)),
            client,
            console,
            settings,
        }
    }

    /// Parses and runs one line, reporting recoverable errors to the user.
    pub async fn dispatch_line(&self, line: &str, chat: &mut ChatContext<'_>) -> Result<Flow, ConsoleError> {
        let outcome = match parse_chat_line(line) {
            Ok(command) => self.execute(command, chat).await,
            Err(error) => Err(error.into()),
        };
        match outcome {
            Ok(flow) => Ok(flow),
            Err(DispatchError::Console(error)) => Err(error),
            Err(error) => {
                warn!(%error, peer_id = chat.peer.id, "command failed");
                self.console.print(&error.to_string())?;
                Ok(Flow::Continue)
            }
        }
    }

    pub async fn execute(&self, command: ChatCommand, chat: &mut ChatContext<'_>) -> Result<Flow, DispatchError> {
        debug!(?command, peer_id = chat.peer.id, "dispatching");
        match command {
            ChatCommand::Noop => Ok(Flow::Continue),
            ChatCommand::Quit => Ok(Flow::LeaveChat),
            ChatCommand::Exit => Ok(Flow::Exit),
            ChatCommand::ShowHistory => {
                self.show_history(chat).await?;
                Ok(Flow::Continue)
            }
            ChatCommand::SendPhoto(path) => {
                self.print(&format!("Uploading {}...", path.display()))?;
                let progress = self.progress_sink("Uploaded");
                self.transfer.send_photo(&path, chat.peer, progress).await?;
                self.print("Photo sent!")?;
                Ok(Flow::Continue)
            }
            ChatCommand::SendDocument(path) => {
                self.print(&format!("Uploading {}...", path.display()))?;
                let progress = self.progress_sink("Uploaded");
                self.transfer.send_document(&path, chat.peer, progress).await?;
                self.print("Document sent!")?;
                Ok(Flow::Continue)
            }
            ChatCommand::DownloadMedia(message_id) => {
                let media = chat.media.get(message_id)?.clone();
                let destination = self.settings.media_dir.join(message_id.to_string());
                self.print(&format!("Downloading {} from message {message_id}...", media.kind_name()))?;
                let progress = self.progress_sink("Downloaded");
                let saved = self.transfer.download(&media, &destination, progress).await?;
                self.print(&format!("Media downloaded to {}!", saved.display()))?;
                Ok(Flow::Continue)
            }
            ChatCommand::DownloadProfilePhoto => {
                let destination = self.settings.media_dir.join(format!("propic_{}", chat.peer.id));
                self.print("Downloading profile picture...")?;
                self.download_profile_photo(chat.peer, &destination).await?;
                Ok(Flow::Continue)
            }
            ChatCommand::PlainMessage(text) => {
                self.client
                    .send_message(chat.peer, &text, SendOptions::default())
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn show_history(&self, chat: &mut ChatContext<'_>) -> Result<(), DispatchError> {
        let messages = self.browser.history(chat.peer, self.settings.history_limit).await?;
        if messages.is_empty() {
            self.print("No messages yet.")?;
            return Ok(());
        }
        chat.media.record_history(&messages);
        for message in messages.iter().rev() {
            self.print(&history_line(message, &Local))?;
        }
        Ok(())
    }

    async fn download_profile_photo(&self, peer: &Entity, destination: &Path) -> Result<(), DispatchError> {
        match self.transfer.download_profile_photo(peer, destination).await? {
            Some(saved) => self.print(&format!("Profile picture downloaded to {}", saved.display()))?,
            None => self.print(&format!(
                "\"{}\" does not seem to have a profile picture.",
                peer.display_name()
            ))?,
        }
        Ok(())
    }

    fn progress_sink(&self, label: &'static str) -> ProgressSink {
        let console = Arc::clone(&self.console);
        Arc::new(move |done, total| {
            if let Err(error) = console.print(&progress_line(label, done, total)) {
                debug!(%error, "progress line dropped");
            }
        })
    }

    fn print(&self, line: &str) -> Result<(), ConsoleError> {
        self.console.print(line)
    }
}
