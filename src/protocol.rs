use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{Dialog, Entity, MediaItem, Message, UpdateEvent};

/// Receives `(bytes_transferred, total_bytes)` while a transfer runs.
pub type ProgressSink = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("{0}")]
    Rejected(String),
    #[error("not connected")]
    NotConnected,
    #[error("not authorized")]
    Unauthorized,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("updates are already subscribed")]
    AlreadySubscribed,
}

/// Result of submitting a login code. Two-factor is a flow branch, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    Authorized(Entity),
    PasswordRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Photo,
    Document,
}

impl UploadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Photo => "photo",
            UploadKind::Document => "document",
        }
    }
}

/// Handle to a file that has been uploaded but not yet attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub id: i64,
    pub kind: UploadKind,
    pub file_name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_markdown: bool,
    pub link_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            parse_markdown: true,
            link_preview: false,
        }
    }
}

/// Messaging protocol capability the session layer drives.
///
/// Implementations own transport, encryption and credential persistence.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn connect(&self) -> Result<(), ProtocolError>;

    async fn is_authorized(&self) -> Result<bool, ProtocolError>;

    async fn send_code_request(&self, phone: &str) -> Result<(), ProtocolError>;

    async fn sign_in(&self, phone: &str, code: &str) -> Result<SignInOutcome, ProtocolError>;

    async fn check_password(&self, password: &str) -> Result<Entity, ProtocolError>;

    async fn log_out(&self) -> Result<(), ProtocolError>;

    /// The signed-in user.
    async fn get_me(&self) -> Result<Entity, ProtocolError>;

    /// Most recent dialogs first.
    async fn get_dialogs(&self, limit: usize) -> Result<Vec<Dialog>, ProtocolError>;

    /// Most recent messages first.
    async fn get_history(&self, peer: &Entity, limit: usize) -> Result<Vec<Message>, ProtocolError>;

    async fn send_message(&self, peer: &Entity, text: &str, options: SendOptions) -> Result<(), ProtocolError>;

    async fn upload_file(
        &self,
        path: &Path,
        kind: UploadKind,
        progress: ProgressSink,
    ) -> Result<FileHandle, ProtocolError>;

    async fn send_file(&self, peer: &Entity, file: &FileHandle) -> Result<(), ProtocolError>;

    /// Saves the media next to `destination`, returning the final path.
    async fn download_media(
        &self,
        media: &MediaItem,
        destination: &Path,
        progress: ProgressSink,
    ) -> Result<PathBuf, ProtocolError>;

    /// `Ok(None)` when the entity has no profile photo.
    async fn download_profile_photo(
        &self,
        entity: &Entity,
        destination: &Path,
    ) -> Result<Option<PathBuf>, ProtocolError>;

    /// Hands out the push-update stream. Only one subscriber is supported.
    async fn subscribe_updates(&self) -> Result<mpsc::UnboundedReceiver<UpdateEvent>, ProtocolError>;
}
