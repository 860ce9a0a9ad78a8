//! Realtime wire messages.
//!
//! Frames are protobuf-encoded and carried as binary websocket messages.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientMessage {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint32, tag = "2")]
    pub seq: u32,
    #[prost(oneof = "client_message::Body", tags = "3, 4")]
    pub body: ::core::option::Option<client_message::Body>,
}

pub mod client_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "3")]
        ConnectionInit(super::ConnectionInit),
        #[prost(message, tag = "4")]
        RpcCall(super::RpcCall),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectionInit {
    #[prost(string, tag = "1")]
    pub token: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "2")]
    pub client_version: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Method {
    Unspecified = 0,
    GetMe = 1,
    GetDialogs = 2,
    GetChatHistory = 3,
    SendMessage = 4,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcCall {
    #[prost(enumeration = "Method", tag = "1")]
    pub method: i32,
    #[prost(oneof = "rpc_call::Input", tags = "2, 3, 4, 5")]
    pub input: ::core::option::Option<rpc_call::Input>,
}

pub mod rpc_call {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Input {
        #[prost(message, tag = "2")]
        GetMe(super::GetMeInput),
        #[prost(message, tag = "3")]
        GetDialogs(super::GetDialogsInput),
        #[prost(message, tag = "4")]
        GetChatHistory(super::GetChatHistoryInput),
        #[prost(message, tag = "5")]
        SendMessage(super::SendMessageInput),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerProtocolMessage {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(oneof = "server_protocol_message::Body", tags = "2, 3, 4, 5, 6")]
    pub body: ::core::option::Option<server_protocol_message::Body>,
}

pub mod server_protocol_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "2")]
        ConnectionOpen(super::ConnectionOpen),
        #[prost(message, tag = "3")]
        ConnectionError(super::ConnectionError),
        #[prost(message, tag = "4")]
        RpcResult(super::RpcResult),
        #[prost(message, tag = "5")]
        RpcError(super::RpcError),
        #[prost(message, tag = "6")]
        Updates(super::UpdatesPayload),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectionOpen {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectionError {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcResult {
    #[prost(uint64, tag = "1")]
    pub req_msg_id: u64,
    #[prost(oneof = "rpc_result::Result", tags = "2, 3, 4, 5")]
    pub result: ::core::option::Option<rpc_result::Result>,
}

pub mod rpc_result {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Result {
        #[prost(message, tag = "2")]
        GetMe(super::GetMeResult),
        #[prost(message, tag = "3")]
        GetDialogs(super::GetDialogsResult),
        #[prost(message, tag = "4")]
        GetChatHistory(super::GetChatHistoryResult),
        #[prost(message, tag = "5")]
        SendMessage(super::SendMessageResult),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcError {
    #[prost(uint64, tag = "1")]
    pub req_msg_id: u64,
    #[prost(int32, tag = "2")]
    pub error_code: i32,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
    #[prost(int32, tag = "4")]
    pub code: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdatesPayload {
    #[prost(message, repeated, tag = "1")]
    pub updates: ::prost::alloc::vec::Vec<Update>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Update {
    #[prost(oneof = "update::Update", tags = "1, 2")]
    pub update: ::core::option::Option<update::Update>,
}

pub mod update {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Update {
        #[prost(message, tag = "1")]
        NewDirectMessage(super::UpdateNewDirectMessage),
        #[prost(message, tag = "2")]
        NewChatMessage(super::UpdateNewChatMessage),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateNewDirectMessage {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    #[prost(bool, tag = "3")]
    pub out: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateNewChatMessage {
    #[prost(int64, tag = "1")]
    pub chat_id: i64,
    #[prost(int64, tag = "2")]
    pub from_id: i64,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
    #[prost(bool, tag = "4")]
    pub out: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileLocation {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, optional, tag = "2")]
    pub cdn_url: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(int64, optional, tag = "3")]
    pub size: ::core::option::Option<i64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct User {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, optional, tag = "2")]
    pub first_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "3")]
    pub last_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "4")]
    pub username: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "5")]
    pub profile_photo: ::core::option::Option<FileLocation>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChatKind {
    Group = 0,
    Channel = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Chat {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub title: ::prost::alloc::string::String,
    #[prost(enumeration = "ChatKind", tag = "3")]
    pub kind: i32,
    #[prost(message, optional, tag = "4")]
    pub photo: ::core::option::Option<FileLocation>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Peer {
    #[prost(oneof = "peer::Type", tags = "1, 2")]
    pub r#type: ::core::option::Option<peer::Type>,
}

pub mod peer {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(message, tag = "1")]
        User(super::PeerUser),
        #[prost(message, tag = "2")]
        Chat(super::PeerChat),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PeerUser {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PeerChat {
    #[prost(int64, tag = "1")]
    pub chat_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InputPeer {
    #[prost(oneof = "input_peer::Type", tags = "1, 2")]
    pub r#type: ::core::option::Option<input_peer::Type>,
}

pub mod input_peer {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(message, tag = "1")]
        User(super::InputPeerUser),
        #[prost(message, tag = "2")]
        Chat(super::InputPeerChat),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InputPeerUser {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InputPeerChat {
    #[prost(int64, tag = "1")]
    pub chat_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Dialog {
    #[prost(message, optional, tag = "1")]
    pub peer: ::core::option::Option<Peer>,
    #[prost(int32, tag = "2")]
    pub unread_count: i32,
    #[prost(message, optional, tag = "3")]
    pub top_message: ::core::option::Option<Message>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(int64, tag = "2")]
    pub from_id: i64,
    #[prost(message, optional, tag = "3")]
    pub peer_id: ::core::option::Option<Peer>,
    #[prost(int64, tag = "4")]
    pub date: i64,
    #[prost(string, optional, tag = "5")]
    pub message: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "6")]
    pub media: ::core::option::Option<MessageMedia>,
    #[prost(bool, tag = "7")]
    pub out: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MessageMedia {
    #[prost(oneof = "message_media::Media", tags = "1, 2, 3")]
    pub media: ::core::option::Option<message_media::Media>,
}

pub mod message_media {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Media {
        #[prost(message, tag = "1")]
        Photo(super::Photo),
        #[prost(message, tag = "2")]
        Document(super::Document),
        #[prost(message, tag = "3")]
        Video(super::Video),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Photo {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(message, optional, tag = "2")]
    pub location: ::core::option::Option<FileLocation>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Document {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub file_name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub mime_type: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub location: ::core::option::Option<FileLocation>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Video {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(int32, tag = "2")]
    pub duration: i32,
    #[prost(message, optional, tag = "3")]
    pub location: ::core::option::Option<FileLocation>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMeInput {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMeResult {
    #[prost(message, optional, tag = "1")]
    pub user: ::core::option::Option<User>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDialogsInput {
    #[prost(int32, tag = "1")]
    pub limit: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDialogsResult {
    #[prost(message, repeated, tag = "1")]
    pub dialogs: ::prost::alloc::vec::Vec<Dialog>,
    #[prost(message, repeated, tag = "2")]
    pub users: ::prost::alloc::vec::Vec<User>,
    #[prost(message, repeated, tag = "3")]
    pub chats: ::prost::alloc::vec::Vec<Chat>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetChatHistoryInput {
    #[prost(message, optional, tag = "1")]
    pub peer_id: ::core::option::Option<InputPeer>,
    #[prost(int64, optional, tag = "2")]
    pub offset_id: ::core::option::Option<i64>,
    #[prost(int32, optional, tag = "3")]
    pub limit: ::core::option::Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetChatHistoryResult {
    #[prost(message, repeated, tag = "1")]
    pub messages: ::prost::alloc::vec::Vec<Message>,
    #[prost(message, repeated, tag = "2")]
    pub users: ::prost::alloc::vec::Vec<User>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InputMedia {
    #[prost(oneof = "input_media::Media", tags = "1, 2")]
    pub media: ::core::option::Option<input_media::Media>,
}

pub mod input_media {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Media {
        #[prost(message, tag = "1")]
        Photo(super::InputMediaPhoto),
        #[prost(message, tag = "2")]
        Document(super::InputMediaDocument),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InputMediaPhoto {
    #[prost(int64, tag = "1")]
    pub photo_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InputMediaDocument {
    #[prost(int64, tag = "1")]
    pub document_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendMessageInput {
    #[prost(message, optional, tag = "1")]
    pub peer_id: ::core::option::Option<InputPeer>,
    #[prost(string, optional, tag = "2")]
    pub message: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(int64, optional, tag = "3")]
    pub random_id: ::core::option::Option<i64>,
    #[prost(message, optional, tag = "4")]
    pub media: ::core::option::Option<InputMedia>,
    #[prost(bool, optional, tag = "5")]
    pub parse_markdown: ::core::option::Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub disable_link_preview: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendMessageResult {
    #[prost(message, repeated, tag = "1")]
    pub updates: ::prost::alloc::vec::Vec<Update>,
}
