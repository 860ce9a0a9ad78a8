//! Interactive chat client: login handshake, dialog browsing, chat commands,
//! media transfer and live update rendering over a pluggable protocol client.

pub mod api;
pub mod auth;
pub mod client;
pub mod command;
pub mod config;
pub mod console;
pub mod credentials;
pub mod dialogs;
pub mod dispatch;
pub mod listener;
pub mod media_index;
pub mod output;
pub mod proto;
pub mod protocol;
pub mod realtime;
pub mod session;
pub mod transfer;
pub mod types;

pub use auth::{AuthError, AuthSession, AuthState, Authorized, CodeOutcome};
pub use client::RemoteClient;
pub use config::{Config, SessionSettings};
pub use console::{Console, ConsoleError, TerminalConsole};
pub use protocol::{ProtocolClient, ProtocolError};
pub use session::{InteractiveSession, SessionError, SessionExit};
