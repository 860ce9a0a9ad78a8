use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::DateTime;
use rand::{RngCore, rngs::OsRng};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, UploadFileInput};
use crate::config::Config;
use crate::credentials::{CredentialError, CredentialStore};
use crate::proto;
use crate::protocol::{
    FileHandle, ProgressSink, ProtocolClient, ProtocolError, SendOptions, SignInOutcome, UploadKind,
};
use crate::realtime::{RealtimeClient, RealtimeError};
use crate::types::{Dialog, DialogSummary, Entity, EntityKind, MediaItem, Message, MessageBody, RemoteFile, UpdateEvent};

/// Protocol client speaking the HTTP API for login and file transfer and the
/// realtime connection for everything else.
pub struct RemoteClient {
    api: ApiClient,
    realtime_url: String,
    credentials: CredentialStore,
    device_name: Option<String>,
    realtime: RwLock<Option<Arc<RealtimeClient>>>,
    token: Mutex<Option<String>>,
    pending_phone: Mutex<Option<String>>,
    updates_tx: mpsc::UnboundedSender<UpdateEvent>,
    updates_rx: Mutex<Option<mpsc::UnboundedReceiver<UpdateEvent>>>,
}

impl RemoteClient {
    pub fn new(config: &Config) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            api: ApiClient::new(config.api_base_url.clone()),
            realtime_url: config.realtime_url.clone(),
            credentials: CredentialStore::new(
                config.session_path.clone(),
                config.api_base_url.clone(),
                config.token_override.clone(),
            ),
            device_name: hostname::get().ok().and_then(|name| name.into_string().ok()),
            realtime: RwLock::new(None),
            token: Mutex::new(None),
            pending_phone: Mutex::new(None),
            updates_tx,
            updates_rx: Mutex::new(Some(updates_rx)),
        }
    }

    async fn open_realtime(&self) -> Result<Arc<RealtimeClient>, ProtocolError> {
        let client = Arc::new(RealtimeClient::connect(&self.realtime_url, self.updates_tx.clone()).await?);
        *self.realtime.write().await = Some(Arc::clone(&client));
        Ok(client)
    }

    async fn realtime(&self) -> Result<Arc<RealtimeClient>, ProtocolError> {
        self.realtime.read().await.clone().ok_or(ProtocolError::NotConnected)
    }

    fn token(&self) -> Result<String, ProtocolError> {
        lock(&self.token).clone().ok_or(ProtocolError::Unauthorized)
    }

    async fn call(
        &self,
        method: proto::Method,
        input: proto::rpc_call::Input,
    ) -> Result<proto::rpc_result::Result, ProtocolError> {
        let realtime = self.realtime().await?;
        Ok(realtime.call_rpc(method, input).await?)
    }

    async fn complete_login(&self, token: String) -> Result<Entity, ProtocolError> {
        self.credentials.store_token(&token)?;
        let realtime = self.realtime().await?;
        realtime.init(&token).await?;
        *lock(&self.token) = Some(token);
        let me = self.fetch_me().await?;
        info!(user_id = me.id, "signed in");
        Ok(me)
    }

    async fn fetch_me(&self) -> Result<Entity, ProtocolError> {
        let result = self
            .call(proto::Method::GetMe, proto::rpc_call::Input::GetMe(proto::GetMeInput {}))
            .await?;
        match result {
            proto::rpc_result::Result::GetMe(payload) => payload
                .user
                .as_ref()
                .map(entity_from_user)
                .ok_or_else(|| ProtocolError::UnexpectedResponse("getMe returned no user".to_string())),
            _ => Err(unexpected("getMe")),
        }
    }

    async fn send(
        &self,
        peer: &Entity,
        text: Option<String>,
        media: Option<proto::InputMedia>,
        options: SendOptions,
    ) -> Result<(), ProtocolError> {
        let mut rng = OsRng;
        let input = proto::SendMessageInput {
            peer_id: Some(input_peer(peer)),
            message: text,
            random_id: Some(rng.next_u64() as i64),
            media,
            parse_markdown: Some(options.parse_markdown),
            disable_link_preview: Some(!options.link_preview),
        };
        let result = self
            .call(proto::Method::SendMessage, proto::rpc_call::Input::SendMessage(input))
            .await?;
        match result {
            proto::rpc_result::Result::SendMessage(payload) => {
                debug!(updates = payload.updates.len(), peer_id = peer.id, "message sent");
                Ok(())
            }
            _ => Err(unexpected("sendMessage")),
        }
    }
}

#[async_trait]
impl ProtocolClient for RemoteClient {
    async fn connect(&self) -> Result<(), ProtocolError> {
        self.open_realtime().await?;
        Ok(())
    }

    async fn is_authorized(&self) -> Result<bool, ProtocolError> {
        let cached = lock(&self.token).is_some();
        if cached {
            return Ok(true);
        }
        let Some(token) = self.credentials.load_token()? else {
            return Ok(false);
        };

        let realtime = self.realtime().await?;
        match realtime.init(&token).await {
            Ok(()) => {
                *lock(&self.token) = Some(token);
                Ok(true)
            }
            Err(RealtimeError::Rejected(reason)) => {
                info!(%reason, "stored session was rejected");
                self.credentials.clear_token()?;
                // The server closes a connection whose init failed.
                self.open_realtime().await?;
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn send_code_request(&self, phone: &str) -> Result<(), ProtocolError> {
        let result = self.api.send_sms_code(phone).await?;
        debug!(existing_user = result.existing_user, "login code requested");
        Ok(())
    }

    async fn sign_in(&self, phone: &str, code: &str) -> Result<SignInOutcome, ProtocolError> {
        let verified = self
            .api
            .verify_sms_code(phone, code, env!("CARGO_PKG_VERSION"), self.device_name.as_deref())
            .await;
        match verified {
            Ok(result) => {
                debug!(user_id = result.user_id, "login code accepted");
                let me = self.complete_login(result.token).await.map_err(session_setup_failure)?;
                Ok(SignInOutcome::Authorized(me))
            }
            Err(error) if error.is_password_required() => {
                *lock(&self.pending_phone) = Some(phone.to_string());
                Ok(SignInOutcome::PasswordRequired)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn check_password(&self, password: &str) -> Result<Entity, ProtocolError> {
        let phone = lock(&self.pending_phone)
            .clone()
            .ok_or_else(|| ProtocolError::Rejected("no sign-in is waiting for a password".to_string()))?;
        let result = self.api.verify_password(&phone, password).await?;
        *lock(&self.pending_phone) = None;
        self.complete_login(result.token).await.map_err(session_setup_failure)
    }

    async fn log_out(&self) -> Result<(), ProtocolError> {
        let token = lock(&self.token).take();
        if let Some(token) = token {
            if let Err(error) = self.api.logout(&token).await {
                warn!(%error, "server logout failed, clearing the local session anyway");
            }
        }
        self.credentials.clear_token()?;
        *self.realtime.write().await = None;
        info!("logged out");
        Ok(())
    }

    async fn get_me(&self) -> Result<Entity, ProtocolError> {
        self.fetch_me().await
    }

    async fn get_dialogs(&self, limit: usize) -> Result<Vec<Dialog>, ProtocolError> {
        let input = proto::GetDialogsInput {
            limit: i32::try_from(limit).unwrap_or(i32::MAX),
        };
        let result = self
            .call(proto::Method::GetDialogs, proto::rpc_call::Input::GetDialogs(input))
            .await?;
        match result {
            proto::rpc_result::Result::GetDialogs(payload) => Ok(dialogs_from_result(payload, limit)),
            _ => Err(unexpected("getDialogs")),
        }
    }

    async fn get_history(&self, peer: &Entity, limit: usize) -> Result<Vec<Message>, ProtocolError> {
        let input = proto::GetChatHistoryInput {
            peer_id: Some(input_peer(peer)),
            offset_id: None,
            limit: Some(i32::try_from(limit).unwrap_or(i32::MAX)),
        };
        let result = self
            .call(proto::Method::GetChatHistory, proto::rpc_call::Input::GetChatHistory(input))
            .await?;
        match result {
            proto::rpc_result::Result::GetChatHistory(payload) => Ok(messages_from_result(payload)),
            _ => Err(unexpected("getChatHistory")),
        }
    }

    async fn send_message(&self, peer: &Entity, text: &str, options: SendOptions) -> Result<(), ProtocolError> {
        self.send(peer, Some(text.to_string()), None, options).await
    }

    async fn upload_file(
        &self,
        path: &Path,
        kind: UploadKind,
        progress: ProgressSink,
    ) -> Result<FileHandle, ProtocolError> {
        let token = self.token()?;
        let file_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .ok_or_else(|| ProtocolError::Rejected(format!("invalid file name: {}", path.display())))?
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        let size = tokio::fs::metadata(path).await?.len();

        let input = UploadFileInput {
            path: path.to_path_buf(),
            file_name: file_name.clone(),
            mime_type,
            kind,
        };
        let result = self.api.upload_file(&token, input, progress).await?;
        let id = match kind {
            UploadKind::Photo => result.photo_id,
            UploadKind::Document => result.document_id,
        }
        .ok_or_else(|| ProtocolError::UnexpectedResponse(format!("uploadFile returned no {} id", kind.as_str())))?;

        Ok(FileHandle {
            id,
            kind,
            file_name,
            size,
        })
    }

    async fn send_file(&self, peer: &Entity, file: &FileHandle) -> Result<(), ProtocolError> {
        let media = match file.kind {
            UploadKind::Photo => proto::input_media::Media::Photo(proto::InputMediaPhoto { photo_id: file.id }),
            UploadKind::Document => {
                proto::input_media::Media::Document(proto::InputMediaDocument { document_id: file.id })
            }
        };
        let media = proto::InputMedia { media: Some(media) };
        self.send(peer, None, Some(media), SendOptions::default()).await
    }

    async fn download_media(
        &self,
        media: &MediaItem,
        destination: &Path,
        progress: ProgressSink,
    ) -> Result<PathBuf, ProtocolError> {
        let file = media.file();
        let url = file
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ProtocolError::Rejected(format!(
                    "no download URL available for this {}",
                    media.kind_name().to_lowercase()
                ))
            })?;
        let path = match media_extension(media) {
            Some(extension) => destination.with_extension(extension),
            None => destination.to_path_buf(),
        };
        self.api.download_to(url, &path, file.size, &progress).await?;
        Ok(path)
    }

    async fn download_profile_photo(
        &self,
        entity: &Entity,
        destination: &Path,
    ) -> Result<Option<PathBuf>, ProtocolError> {
        let Some(photo) = entity.photo.as_ref() else {
            return Ok(None);
        };
        let Some(url) = photo.url.as_deref().filter(|url| !url.trim().is_empty()) else {
            return Ok(None);
        };
        let path = destination.with_extension("jpg");
        let quiet: ProgressSink = Arc::new(|_, _| {});
        self.api.download_to(url, &path, photo.size, &quiet).await?;
        Ok(Some(path))
    }

    async fn subscribe_updates(&self) -> Result<mpsc::UnboundedReceiver<UpdateEvent>, ProtocolError> {
        lock(&self.updates_rx).take().ok_or(ProtocolError::AlreadySubscribed)
    }
}

impl From<ApiError> for ProtocolError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Api { error, description } => ProtocolError::Rejected(format!("{error}: {description}")),
            ApiError::Status(status) if (400..500).contains(&status) => {
                ProtocolError::Rejected(format!("request rejected (status {status})"))
            }
            ApiError::Io(error) => ProtocolError::Io(error),
            other => ProtocolError::Connection(other.to_string()),
        }
    }
}

impl From<RealtimeError> for ProtocolError {
    fn from(error: RealtimeError) -> Self {
        match error {
            RealtimeError::RpcError { error_code: 2, .. } => ProtocolError::Unauthorized,
            RealtimeError::RpcError { friendly, .. } => ProtocolError::Rejected(friendly),
            RealtimeError::Rejected(reason) => ProtocolError::Rejected(reason),
            RealtimeError::MissingResult => ProtocolError::UnexpectedResponse("missing rpc result".to_string()),
            other => ProtocolError::Connection(other.to_string()),
        }
    }
}

impl From<CredentialError> for ProtocolError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::Io(error) => ProtocolError::Io(error),
            CredentialError::Json(error) => ProtocolError::UnexpectedResponse(format!("corrupt session file: {error}")),
        }
    }
}

/// Failures after the server accepted the credentials never read as a
/// rejected code or password.
fn session_setup_failure(error: ProtocolError) -> ProtocolError {
    match error {
        ProtocolError::Rejected(reason) => ProtocolError::Connection(format!("session setup failed: {reason}")),
        ProtocolError::Unauthorized => {
            ProtocolError::Connection("session setup failed: token not accepted".to_string())
        }
        other => other,
    }
}

fn unexpected(method: &str) -> ProtocolError {
    ProtocolError::UnexpectedResponse(format!("unexpected RPC result for {method}"))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn input_peer(entity: &Entity) -> proto::InputPeer {
    let peer = match entity.kind {
        EntityKind::User => proto::input_peer::Type::User(proto::InputPeerUser { user_id: entity.id }),
        EntityKind::Group | EntityKind::Channel => {
            proto::input_peer::Type::Chat(proto::InputPeerChat { chat_id: entity.id })
        }
    };
    proto::InputPeer { r#type: Some(peer) }
}

fn remote_file(location: &proto::FileLocation) -> RemoteFile {
    RemoteFile {
        id: location.id,
        url: location.cdn_url.clone(),
        size: location.size.and_then(|size| u64::try_from(size).ok()),
    }
}

fn entity_from_user(user: &proto::User) -> Entity {
    Entity {
        id: user.id,
        kind: EntityKind::User,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        title: None,
        username: user.username.clone(),
        photo: user.profile_photo.as_ref().map(remote_file),
    }
}

fn entity_from_chat(chat: &proto::Chat) -> Entity {
    let kind = match proto::ChatKind::try_from(chat.kind) {
        Ok(proto::ChatKind::Channel) => EntityKind::Channel,
        _ => EntityKind::Group,
    };
    Entity {
        id: chat.id,
        kind,
        first_name: None,
        last_name: None,
        title: Some(chat.title.clone()),
        username: None,
        photo: chat.photo.as_ref().map(remote_file),
    }
}

fn peer_entity(
    peer: &proto::Peer,
    users: &HashMap<i64, &proto::User>,
    chats: &HashMap<i64, &proto::Chat>,
) -> Option<Entity> {
    match peer.r#type.as_ref()? {
        proto::peer::Type::User(user) => Some(
            users
                .get(&user.user_id)
                .map(|found| entity_from_user(found))
                .unwrap_or_else(|| Entity::bare(user.user_id, EntityKind::User)),
        ),
        proto::peer::Type::Chat(chat) => Some(
            chats
                .get(&chat.chat_id)
                .map(|found| entity_from_chat(found))
                .unwrap_or_else(|| Entity::bare(chat.chat_id, EntityKind::Group)),
        ),
    }
}

fn media_item(media: &proto::MessageMedia, caption: Option<String>) -> Option<MediaItem> {
    let fallback = |id: i64| RemoteFile {
        id,
        url: None,
        size: None,
    };
    match media.media.as_ref()? {
        proto::message_media::Media::Photo(photo) => Some(MediaItem::Photo {
            file: photo.location.as_ref().map(remote_file).unwrap_or_else(|| fallback(photo.id)),
            caption,
        }),
        proto::message_media::Media::Document(document) => Some(MediaItem::Document {
            file: document
                .location
                .as_ref()
                .map(remote_file)
                .unwrap_or_else(|| fallback(document.id)),
            file_name: Some(document.file_name.clone()).filter(|name| !name.trim().is_empty()),
            mime_type: Some(document.mime_type.clone()).filter(|mime| !mime.trim().is_empty()),
            caption,
        }),
        proto::message_media::Media::Video(video) => Some(MediaItem::Video {
            file: video.location.as_ref().map(remote_file).unwrap_or_else(|| fallback(video.id)),
            duration: u32::try_from(video.duration).ok(),
            caption,
        }),
    }
}

fn message_from_proto(message: proto::Message, users: &HashMap<i64, &proto::User>) -> Message {
    let text = message.message.unwrap_or_default();
    let caption = Some(text.clone()).filter(|value| !value.trim().is_empty());
    let body = match message.media.as_ref().and_then(|media| media_item(media, caption)) {
        Some(media) => MessageBody::Media(media),
        None => MessageBody::Text(text),
    };

    Message {
        id: message.id,
        date: DateTime::from_timestamp(message.date, 0).unwrap_or_default(),
        sender: users.get(&message.from_id).map(|user| entity_from_user(user)),
        body,
    }
}

fn dialogs_from_result(payload: proto::GetDialogsResult, limit: usize) -> Vec<Dialog> {
    let users: HashMap<i64, &proto::User> = payload.users.iter().map(|user| (user.id, user)).collect();
    let chats: HashMap<i64, &proto::Chat> = payload.chats.iter().map(|chat| (chat.id, chat)).collect();

    payload
        .dialogs
        .iter()
        .filter_map(|dialog| {
            let entity = peer_entity(dialog.peer.as_ref()?, &users, &chats)?;
            let top = dialog.top_message.as_ref();
            let summary = DialogSummary {
                unread_count: u32::try_from(dialog.unread_count).unwrap_or(0),
                top_message_id: top.map(|message| message.id),
                last_message_preview: top
                    .and_then(|message| message.message.clone())
                    .filter(|text| !text.trim().is_empty()),
                last_activity: top.and_then(|message| DateTime::from_timestamp(message.date, 0)),
            };
            Some(Dialog { summary, entity })
        })
        .take(limit)
        .collect()
}

fn messages_from_result(payload: proto::GetChatHistoryResult) -> Vec<Message> {
    let users: HashMap<i64, &proto::User> = payload.users.iter().map(|user| (user.id, user)).collect();
    payload
        .messages
        .iter()
        .cloned()
        .map(|message| message_from_proto(message, &users))
        .collect()
}

/// File extension for a downloaded media item.
pub fn media_extension(media: &MediaItem) -> Option<String> {
    match media {
        MediaItem::Photo { .. } => Some("jpg".to_string()),
        MediaItem::Video { .. } => Some("mp4".to_string()),
        MediaItem::Document {
            file_name, mime_type, ..
        } => file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|extension| extension.to_str())
            .map(str::to_string)
            .or_else(|| {
                mime_type
                    .as_deref()
                    .and_then(mime_guess::get_mime_extensions_str)
                    .and_then(|extensions| extensions.first())
                    .map(|extension| extension.to_string())
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use prost::Message as _;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    fn user(id: i64, first_name: &str) -> proto::User {
        proto::User {
            id,
            first_name: Some(first_name.to_string()),
            last_name: None,
            username: None,
            profile_photo: None,
        }
    }

    fn user_peer(user_id: i64) -> proto::Peer {
        proto::Peer {
            r#type: Some(proto::peer::Type::User(proto::PeerUser { user_id })),
        }
    }

    fn chat_peer(chat_id: i64) -> proto::Peer {
        proto::Peer {
            r#type: Some(proto::peer::Type::Chat(proto::PeerChat { chat_id })),
        }
    }

    fn text_message(id: i64, from_id: i64, text: &str) -> proto::Message {
        proto::Message {
            id,
            from_id,
            peer_id: None,
            date: 1_700_000_000,
            message: Some(text.to_string()),
            media: None,
            out: false,
        }
    }

    #[test]
    fn dialogs_keep_server_order_and_resolve_entities() {
        let payload = proto::GetDialogsResult {
            dialogs: vec![
                proto::Dialog {
                    peer: Some(chat_peer(50)),
                    unread_count: 3,
                    top_message: Some(text_message(9, 1, "latest")),
                },
                proto::Dialog {
                    peer: Some(user_peer(1)),
                    unread_count: 0,
                    top_message: None,
                },
                proto::Dialog {
                    peer: None,
                    unread_count: 0,
                    top_message: None,
                },
                proto::Dialog {
                    peer: Some(user_peer(77)),
                    unread_count: -1,
                    top_message: None,
                },
            ],
            users: vec![user(1, "Ada")],
            chats: vec![proto::Chat {
                id: 50,
                title: "Compilers".to_string(),
                kind: proto::ChatKind::Channel as i32,
                photo: None,
            }],
        };

        let dialogs = dialogs_from_result(payload, 10);
        assert_eq!(dialogs.len(), 3);
        assert_eq!(dialogs[0].entity.display_name(), "Compilers");
        assert_eq!(dialogs[0].entity.kind, EntityKind::Channel);
        assert_eq!(dialogs[0].summary.unread_count, 3);
        assert_eq!(dialogs[0].summary.last_message_preview.as_deref(), Some("latest"));
        assert_eq!(dialogs[1].entity.display_name(), "Ada");
        assert_eq!(dialogs[2].entity.display_name(), "user 77");
        assert_eq!(dialogs[2].summary.unread_count, 0);
    }

    #[test]
    fn dialogs_are_capped_at_the_limit() {
        let payload = proto::GetDialogsResult {
            dialogs: (1..=5)
                .map(|id| proto::Dialog {
                    peer: Some(user_peer(id)),
                    unread_count: 0,
                    top_message: None,
                })
                .collect(),
            users: Vec::new(),
            chats: Vec::new(),
        };
        assert_eq!(dialogs_from_result(payload, 2).len(), 2);
    }

    #[test]
    fn history_maps_media_and_senders() {
        let mut photo = text_message(12, 1, "sunset");
        photo.media = Some(proto::MessageMedia {
            media: Some(proto::message_media::Media::Photo(proto::Photo {
                id: 400,
                location: Some(proto::FileLocation {
                    id: 400,
                    cdn_url: Some("https://cdn.example/400".to_string()),
                    size: Some(2048),
                }),
            })),
        });
        let payload = proto::GetChatHistoryResult {
            messages: vec![photo, text_message(11, 99, "hi")],
            users: vec![user(1, "Ada")],
        };

        let messages = messages_from_result(payload);
        assert_eq!(messages.len(), 2);

        let media = messages[0].media().expect("photo message");
        assert_eq!(media.kind_name(), "Photo");
        assert_eq!(media.caption(), Some("sunset"));
        assert_eq!(media.file().size, Some(2048));
        assert_eq!(messages[0].sender.as_ref().map(Entity::display_name).as_deref(), Some("Ada"));

        assert_eq!(messages[1].body, MessageBody::Text("hi".to_string()));
        assert!(messages[1].sender.is_none());
        assert_eq!(messages[1].date.timestamp(), 1_700_000_000);
    }

    #[test]
    fn input_peer_follows_entity_kind() {
        let user_peer = input_peer(&Entity::user(4, "Ada"));
        assert!(matches!(
            user_peer.r#type,
            Some(proto::input_peer::Type::User(proto::InputPeerUser { user_id: 4 }))
        ));

        let chat_peer = input_peer(&Entity::group(8, "Team"));
        assert!(matches!(
            chat_peer.r#type,
            Some(proto::input_peer::Type::Chat(proto::InputPeerChat { chat_id: 8 }))
        ));
    }

    #[test]
    fn media_extension_prefers_document_name() {
        let file = RemoteFile {
            id: 1,
            url: None,
            size: None,
        };
        let named = MediaItem::Document {
            file: file.clone(),
            file_name: Some("report.pdf".to_string()),
            mime_type: Some("text/plain".to_string()),
            caption: None,
        };
        assert_eq!(media_extension(&named).as_deref(), Some("pdf"));

        let unnamed = MediaItem::Document {
            file: file.clone(),
            file_name: None,
            mime_type: None,
            caption: None,
        };
        assert_eq!(media_extension(&unnamed), None);

        let photo = MediaItem::Photo { file, caption: None };
        assert_eq!(media_extension(&photo).as_deref(), Some("jpg"));
    }

    #[test]
    fn api_rejections_and_transport_failures_map_differently() {
        let rejected: ProtocolError = ApiError::Api {
            error: "PHONE_CODE_INVALID".to_string(),
            description: "The code is wrong".to_string(),
        }
        .into();
        assert!(matches!(rejected, ProtocolError::Rejected(_)));

        let server_down: ProtocolError = ApiError::Status(503).into();
        assert!(matches!(server_down, ProtocolError::Connection(_)));

        let bad_request: ProtocolError = ApiError::Status(400).into();
        assert!(matches!(bad_request, ProtocolError::Rejected(_)));
    }

    #[test]
    fn setup_failures_are_not_credential_rejections() {
        let busy = session_setup_failure(ProtocolError::Rejected("server busy".to_string()));
        assert!(matches!(busy, ProtocolError::Connection(ref reason) if reason.contains("server busy")));
        assert!(matches!(
            session_setup_failure(ProtocolError::Unauthorized),
            ProtocolError::Connection(_)
        ));
        assert!(matches!(session_setup_failure(ProtocolError::NotConnected), ProtocolError::NotConnected));
    }

    async fn read_http_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let read = socket.read(&mut buf).await.expect("http read");
            if read == 0 {
                return;
            }
            request.extend_from_slice(&buf[..read]);
            let text = String::from_utf8_lossy(&request);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let body_len = text[..head_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= head_end + 4 + body_len {
                return;
            }
        }
    }

    /// Accepts any login code, then refuses the realtime session.
    async fn spawn_busy_server() -> (String, String) {
        let http = TcpListener::bind("127.0.0.1:0").await.expect("bind http");
        let ws = TcpListener::bind("127.0.0.1:0").await.expect("bind ws");
        let api_base_url = format!("http://{}/v1", http.local_addr().expect("http addr"));
        let realtime_url = format!("ws://{}/realtime", ws.local_addr().expect("ws addr"));

        tokio::spawn(async move {
            let (mut socket, _) = http.accept().await.expect("http accept");
            read_http_request(&mut socket).await;
            let body = r#"{"ok":true,"result":{"userId":1,"token":"1:fresh"}}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("http write");
        });

        tokio::spawn(async move {
            let (socket, _) = ws.accept().await.expect("ws accept");
            let mut ws = tokio_tungstenite::accept_async(socket).await.expect("ws handshake");
            while let Some(Ok(frame)) = ws.next().await {
                let WsMessage::Binary(data) = frame else {
                    continue;
                };
                let message = proto::ClientMessage::decode(&*data).expect("client message");
                if let Some(proto::client_message::Body::ConnectionInit(_)) = message.body {
                    let reply = proto::ServerProtocolMessage {
                        id: 1,
                        body: Some(proto::server_protocol_message::Body::ConnectionError(
                            proto::ConnectionError {
                                message: "server busy".to_string(),
                            },
                        )),
                    };
                    ws.send(WsMessage::Binary(reply.encode_to_vec())).await.expect("ws send");
                }
            }
        });

        (api_base_url, realtime_url)
    }

    #[tokio::test]
    async fn refused_session_after_an_accepted_code_is_a_connection_failure() {
        let (api_base_url, realtime_url) = spawn_busy_server().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let data_dir = dir.path().display().to_string();
        let config = Config::from_lookup(|key| match key {
            "RELAY_API_BASE_URL" => Some(api_base_url.clone()),
            "RELAY_REALTIME_URL" => Some(realtime_url.clone()),
            "RELAY_DATA_DIR" => Some(data_dir.clone()),
            _ => None,
        });
        let client = RemoteClient::new(&config);
        client.connect().await.expect("connect");

        let err = client.sign_in("+15550100", "12345").await.expect_err("session refused");

        assert!(
            matches!(err, ProtocolError::Connection(ref reason) if reason.contains("server busy")),
            "{err:?}"
        );
    }
}
