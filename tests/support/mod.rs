#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;

use relay_cli::client::media_extension;
use relay_cli::console::{Console, ConsoleError};
use relay_cli::protocol::{
    FileHandle, ProgressSink, ProtocolClient, ProtocolError, SendOptions, SignInOutcome, UploadKind,
};
use relay_cli::types::{Dialog, DialogSummary, Entity, MediaItem, Message, MessageBody, RemoteFile, UpdateEvent};
use relay_cli::{AuthSession, Authorized};

pub const VALID_CODE: &str = "12345";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub peer_id: i64,
    pub text: String,
    pub options: SendOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFile {
    pub peer_id: i64,
    pub kind: UploadKind,
    pub file_name: String,
    pub size: u64,
}

#[derive(Default)]
pub struct Recorded {
    pub code_requests: Vec<String>,
    pub sign_ins: Vec<(String, String)>,
    pub passwords: Vec<String>,
    pub history_requests: Vec<(i64, usize)>,
    pub messages: Vec<SentMessage>,
    pub files: Vec<SentFile>,
    pub downloads: Vec<PathBuf>,
    pub logged_out: bool,
}

/// In-memory protocol client. Transfers report progress in `chunk`-byte steps
/// unless `progress_script` overrides the raw reports.
pub struct FakeClient {
    pub stored_session: bool,
    pub password: Option<String>,
    pub dialogs: Vec<Dialog>,
    pub history: HashMap<i64, Vec<Message>>,
    pub media_bytes: HashMap<i64, Vec<u8>>,
    pub chunk: usize,
    pub progress_script: Option<Vec<(u64, u64)>>,
    pub fail_transfers: bool,
    pub recorded: Mutex<Recorded>,
    pub updates_tx: mpsc::UnboundedSender<UpdateEvent>,
    pub updates_rx: Mutex<Option<mpsc::UnboundedReceiver<UpdateEvent>>>,
}

impl Default for FakeClient {
    fn default() -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            stored_session: false,
            password: None,
            dialogs: Vec::new(),
            history: HashMap::new(),
            media_bytes: HashMap::new(),
            chunk: 4,
            progress_script: None,
            fail_transfers: false,
            recorded: Mutex::new(Recorded::default()),
            updates_tx,
            updates_rx: Mutex::new(Some(updates_rx)),
        }
    }
}

impl FakeClient {
    pub fn push_update(&self, event: UpdateEvent) {
        self.updates_tx.send(event).expect("update receiver alive");
    }

    pub fn recorded<T>(&self, read: impl FnOnce(&Recorded) -> T) -> T {
        read(&self.recorded.lock().expect("recorded lock"))
    }

    fn record(&self, write: impl FnOnce(&mut Recorded)) {
        write(&mut self.recorded.lock().expect("recorded lock"));
    }

    fn report_progress(&self, total: u64, progress: &ProgressSink) {
        if let Some(script) = &self.progress_script {
            for (done, reported_total) in script {
                progress(*done, *reported_total);
            }
            return;
        }
        let chunk = self.chunk.max(1) as u64;
        let mut done = 0;
        while done < total {
            done = (done + chunk).min(total);
            progress(done, total);
        }
    }

    fn me() -> Entity {
        Entity::user(1, "Ada")
    }
}

#[async_trait]
impl ProtocolClient for FakeClient {
    async fn connect(&self) -> Result<(), ProtocolError> {
        Ok(())
    }

    async fn is_authorized(&self) -> Result<bool, ProtocolError> {
        Ok(self.stored_session)
    }

    async fn send_code_request(&self, phone: &str) -> Result<(), ProtocolError> {
        self.record(|recorded| recorded.code_requests.push(phone.to_string()));
        Ok(())
    }

    async fn sign_in(&self, phone: &str, code: &str) -> Result<SignInOutcome, ProtocolError> {
        self.record(|recorded| recorded.sign_ins.push((phone.to_string(), code.to_string())));
        if code != VALID_CODE {
            return Err(ProtocolError::Rejected("PHONE_CODE_INVALID".to_string()));
        }
        if self.password.is_some() {
            return Ok(SignInOutcome::PasswordRequired);
        }
        Ok(SignInOutcome::Authorized(Self::me()))
    }

    async fn check_password(&self, password: &str) -> Result<Entity, ProtocolError> {
        self.record(|recorded| recorded.passwords.push(password.to_string()));
        match &self.password {
            Some(expected) if expected == password => Ok(Self::me()),
            _ => Err(ProtocolError::Rejected("PASSWORD_HASH_INVALID".to_string())),
        }
    }

    async fn log_out(&self) -> Result<(), ProtocolError> {
        self.record(|recorded| recorded.logged_out = true);
        Ok(())
    }

    async fn get_me(&self) -> Result<Entity, ProtocolError> {
        Ok(Self::me())
    }

    async fn get_dialogs(&self, limit: usize) -> Result<Vec<Dialog>, ProtocolError> {
        Ok(self.dialogs.iter().take(limit).cloned().collect())
    }

    async fn get_history(&self, peer: &Entity, limit: usize) -> Result<Vec<Message>, ProtocolError> {
        self.record(|recorded| recorded.history_requests.push((peer.id, limit)));
        let messages = self.history.get(&peer.id).cloned().unwrap_or_default();
        Ok(messages.into_iter().take(limit).collect())
    }

    async fn send_message(&self, peer: &Entity, text: &str, options: SendOptions) -> Result<(), ProtocolError> {
        self.record(|recorded| {
            recorded.messages.push(SentMessage {
                peer_id: peer.id,
                text: text.to_string(),
                options,
            })
        });
        Ok(())
    }

    async fn upload_file(
        &self,
        path: &Path,
        kind: UploadKind,
        progress: ProgressSink,
    ) -> Result<FileHandle, ProtocolError> {
        let bytes = tokio::fs::read(path).await?;
        if self.fail_transfers {
            return Err(ProtocolError::Connection("upload interrupted".to_string()));
        }
        self.report_progress(bytes.len() as u64, &progress);
        Ok(FileHandle {
            id: 900,
            kind,
            file_name: path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("upload")
                .to_string(),
            size: bytes.len() as u64,
        })
    }

    async fn send_file(&self, peer: &Entity, file: &FileHandle) -> Result<(), ProtocolError> {
        self.record(|recorded| {
            recorded.files.push(SentFile {
                peer_id: peer.id,
                kind: file.kind,
                file_name: file.file_name.clone(),
                size: file.size,
            })
        });
        Ok(())
    }

    async fn download_media(
        &self,
        media: &MediaItem,
        destination: &Path,
        progress: ProgressSink,
    ) -> Result<PathBuf, ProtocolError> {
        if self.fail_transfers {
            return Err(ProtocolError::Connection("download interrupted".to_string()));
        }
        let bytes = self.media_bytes.get(&media.file().id).cloned().unwrap_or_default();
        let path = match media_extension(media) {
            Some(extension) => destination.with_extension(extension),
            None => destination.to_path_buf(),
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        self.report_progress(bytes.len() as u64, &progress);
        self.record(|recorded| recorded.downloads.push(path.clone()));
        Ok(path)
    }

    async fn download_profile_photo(
        &self,
        entity: &Entity,
        destination: &Path,
    ) -> Result<Option<PathBuf>, ProtocolError> {
        if entity.photo.is_none() {
            return Ok(None);
        }
        let path = destination.with_extension("jpg");
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, b"jpeg").await?;
        self.record(|recorded| recorded.downloads.push(path.clone()));
        Ok(Some(path))
    }

    async fn subscribe_updates(&self) -> Result<mpsc::UnboundedReceiver<UpdateEvent>, ProtocolError> {
        self.updates_rx
            .lock()
            .expect("updates lock")
            .take()
            .ok_or(ProtocolError::AlreadySubscribed)
    }
}

/// Console fed from a fixed script; reads past the end report `Closed`.
#[derive(Default)]
pub struct ScriptedConsole {
    lines: Mutex<VecDeque<String>>,
    passwords: Mutex<VecDeque<String>>,
    output: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: Mutex::new(lines.iter().map(|line| line.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn with_passwords(self, passwords: &[&str]) -> Self {
        *self.passwords.lock().expect("passwords lock") = passwords.iter().map(|pw| pw.to_string()).collect();
        self
    }

    pub fn output(&self) -> Vec<String> {
        self.output.lock().expect("output lock").clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    pub fn printed(&self, needle: &str) -> bool {
        self.output().iter().any(|line| line.contains(needle))
    }

    pub fn remaining_lines(&self) -> usize {
        self.lines.lock().expect("lines lock").len()
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&self, prompt: &str) -> Result<String, ConsoleError> {
        // A real prompt blocks; let background tasks run meanwhile.
        tokio::task::yield_now().await;
        self.prompts.lock().expect("prompts lock").push(prompt.to_string());
        self.lines.lock().expect("lines lock").pop_front().ok_or(ConsoleError::Closed)
    }

    async fn read_password(&self, prompt: &str) -> Result<String, ConsoleError> {
        self.prompts.lock().expect("prompts lock").push(prompt.to_string());
        self.passwords
            .lock()
            .expect("passwords lock")
            .pop_front()
            .ok_or(ConsoleError::Closed)
    }

    fn print(&self, line: &str) -> Result<(), ConsoleError> {
        self.output.lock().expect("output lock").push(line.to_string());
        Ok(())
    }
}

pub fn dialogs(count: i64) -> Vec<Dialog> {
    (1..=count)
        .map(|index| Dialog {
            summary: DialogSummary::default(),
            entity: Entity::user(100 + index, format!("Friend {index}")),
        })
        .collect()
}

pub fn text_message(id: i64, sender: &Entity, text: &str) -> Message {
    Message {
        id,
        date: Utc.with_ymd_and_hms(2024, 5, 1, 12, id as u32 % 60, 0).single().expect("valid date"),
        sender: Some(sender.clone()),
        body: MessageBody::Text(text.to_string()),
    }
}

pub fn photo_message(id: i64, file_id: i64, size: u64, caption: &str) -> Message {
    Message {
        id,
        date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single().expect("valid date"),
        sender: None,
        body: MessageBody::Media(MediaItem::Photo {
            file: RemoteFile {
                id: file_id,
                url: Some(format!("https://files.test/{file_id}")),
                size: Some(size),
            },
            caption: Some(caption.to_string()),
        }),
    }
}

/// Authorized session over `client`, restored from a stored session.
pub async fn authorized(client: Arc<dyn ProtocolClient>) -> Authorized {
    let mut auth = AuthSession::new(client);
    auth.connect().await.expect("connect");
    assert!(auth.restore().await.expect("restore"), "client must have a stored session");
    auth.authorized().expect("authorized")
}
