use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use prost::Message;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use crate::proto;
use crate::types::{Direction, UpdateEvent};

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("protocol error: {0}")]
    Protocol(#[from] prost::DecodeError),
    #[error("missing rpc result")]
    MissingResult,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("connection rejected: {0}")]
    Rejected(String),
    #[error("{friendly}")]
    RpcError {
        code: i32,
        error_code: i32,
        message: String,
        friendly: String,
    },
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type RpcReply = Result<proto::rpc_result::Result, RealtimeError>;

#[derive(Default)]
struct Waiters {
    rpc: HashMap<u64, oneshot::Sender<RpcReply>>,
    handshake: Option<oneshot::Sender<Result<(), RealtimeError>>>,
    /// Set once the reader has stopped; nothing will answer new waiters.
    closed: bool,
}

impl Waiters {
    fn add_rpc(&mut self, id: u64) -> Result<oneshot::Receiver<RpcReply>, RealtimeError> {
        if self.closed {
            return Err(RealtimeError::ConnectionClosed);
        }
        let (tx, rx) = oneshot::channel();
        self.rpc.insert(id, tx);
        Ok(rx)
    }

    fn add_handshake(&mut self) -> Result<oneshot::Receiver<Result<(), RealtimeError>>, RealtimeError> {
        if self.closed {
            return Err(RealtimeError::ConnectionClosed);
        }
        let (tx, rx) = oneshot::channel();
        self.handshake = Some(tx);
        Ok(rx)
    }
}

/// Realtime connection. A reader task routes RPC replies to their callers
/// and pushed updates to the update channel.
pub struct RealtimeClient {
    sink: tokio::sync::Mutex<SplitSink<WsStream, WsMessage>>,
    waiters: Arc<Mutex<Waiters>>,
    seq: AtomicU32,
    ids: Mutex<MessageIds>,
    reader: JoinHandle<()>,
}

impl RealtimeClient {
    pub async fn connect(url: &str, updates: mpsc::UnboundedSender<UpdateEvent>) -> Result<Self, RealtimeError> {
        let url = Url::parse(url)?;
        let (ws, _) = connect_async(url).await?;
        let (sink, stream) = ws.split();
        let waiters = Arc::new(Mutex::new(Waiters::default()));
        let reader = tokio::spawn(read_loop(stream, Arc::clone(&waiters), updates));
        debug!("realtime connection established");

        Ok(Self {
            sink: tokio::sync::Mutex::new(sink),
            waiters,
            seq: AtomicU32::new(0),
            ids: Mutex::new(MessageIds::default()),
            reader,
        })
    }

    /// Presents the session token and waits for the server to accept it.
    pub async fn init(&self, token: &str) -> Result<(), RealtimeError> {
        let rx = lock(&self.waiters).add_handshake()?;

        let init = proto::ConnectionInit {
            token: token.to_string(),
            client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        };
        let message = proto::ClientMessage {
            id: self.next_id(),
            seq: self.next_seq(),
            body: Some(proto::client_message::Body::ConnectionInit(init)),
        };
        self.send_client_message(message).await?;

        rx.await.map_err(|_| RealtimeError::ConnectionClosed)?
    }

    pub async fn call_rpc(
        &self,
        method: proto::Method,
        input: proto::rpc_call::Input,
    ) -> Result<proto::rpc_result::Result, RealtimeError> {
        let message_id = self.next_id();
        let rx = lock(&self.waiters).add_rpc(message_id)?;

        let message = proto::ClientMessage {
            id: message_id,
            seq: self.next_seq(),
            body: Some(proto::client_message::Body::RpcCall(proto::RpcCall {
                method: method as i32,
                input: Some(input),
            })),
        };
        if let Err(error) = self.send_client_message(message).await {
            lock(&self.waiters).rpc.remove(&message_id);
            return Err(error);
        }

        rx.await.map_err(|_| RealtimeError::ConnectionClosed)?
    }

    async fn send_client_message(&self, message: proto::ClientMessage) -> Result<(), RealtimeError> {
        let bytes = message.encode_to_vec();
        self.sink.lock().await.send(WsMessage::Binary(bytes)).await?;
        Ok(())
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    fn next_id(&self) -> u64 {
        lock(&self.ids).next_id()
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    waiters: Arc<Mutex<Waiters>>,
    updates: mpsc::UnboundedSender<UpdateEvent>,
) {
    loop {
        let frame = match stream.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(error)) => {
                warn!(%error, "realtime read failed");
                break;
            }
            None => break,
        };

        let data = match frame {
            WsMessage::Binary(data) => data,
            WsMessage::Close(_) => break,
            _ => continue,
        };

        match proto::ServerProtocolMessage::decode(&*data) {
            Ok(message) => route_server_message(message, &waiters, &updates),
            Err(error) => warn!(%error, "dropping undecodable realtime frame"),
        }
    }

    debug!("realtime reader stopped");
    fail_waiters(&waiters);
}

fn route_server_message(
    message: proto::ServerProtocolMessage,
    waiters: &Mutex<Waiters>,
    updates: &mpsc::UnboundedSender<UpdateEvent>,
) {
    match message.body {
        Some(proto::server_protocol_message::Body::ConnectionOpen(_)) => {
            if let Some(tx) = lock(waiters).handshake.take() {
                let _ = tx.send(Ok(()));
            }
        }
        Some(proto::server_protocol_message::Body::ConnectionError(error)) => {
            if let Some(tx) = lock(waiters).handshake.take() {
                let _ = tx.send(Err(RealtimeError::Rejected(error.message)));
            }
        }
        Some(proto::server_protocol_message::Body::RpcResult(result)) => {
            let Some(tx) = lock(waiters).rpc.remove(&result.req_msg_id) else {
                debug!(req_msg_id = result.req_msg_id, "rpc result without waiter");
                return;
            };
            let _ = tx.send(result.result.ok_or(RealtimeError::MissingResult));
        }
        Some(proto::server_protocol_message::Body::RpcError(error)) => {
            let Some(tx) = lock(waiters).rpc.remove(&error.req_msg_id) else {
                return;
            };
            let friendly = describe_rpc_error(&error);
            let _ = tx.send(Err(RealtimeError::RpcError {
                code: error.code,
                error_code: error.error_code,
                message: error.message,
                friendly,
            }));
        }
        Some(proto::server_protocol_message::Body::Updates(payload)) => {
            for update in payload.updates {
                if let Some(event) = update_event(update) {
                    if updates.send(event).is_err() {
                        debug!("update receiver dropped");
                    }
                }
            }
        }
        None => {}
    }
}

fn fail_waiters(waiters: &Mutex<Waiters>) {
    let mut guard = lock(waiters);
    guard.closed = true;
    for (_, tx) in guard.rpc.drain() {
        let _ = tx.send(Err(RealtimeError::ConnectionClosed));
    }
    if let Some(tx) = guard.handshake.take() {
        let _ = tx.send(Err(RealtimeError::ConnectionClosed));
    }
}

pub fn update_event(update: proto::Update) -> Option<UpdateEvent> {
    let direction = |out: bool| if out { Direction::Outgoing } else { Direction::Incoming };
    match update.update? {
        proto::update::Update::NewDirectMessage(message) => Some(UpdateEvent::DirectMessage {
            user_id: message.user_id,
            text: message.message,
            direction: direction(message.out),
        }),
        proto::update::Update::NewChatMessage(message) => Some(UpdateEvent::GroupMessage {
            chat_id: message.chat_id,
            from_id: message.from_id,
            text: message.message,
            direction: direction(message.out),
        }),
    }
}

fn rpc_error_label(error_code: i32) -> &'static str {
    match error_code {
        1 => "Bad request",
        2 => "Not authenticated",
        3 => "Rate limited",
        4 => "Internal server error",
        5 => "Invalid peer",
        6 => "Invalid message id",
        7 => "Invalid user id",
        8 => "Message too long",
        9 => "Invalid media",
        _ => "Unknown RPC error",
    }
}

/// `"<label>[: <message>][ (HTTP <status>)]"`, skipping a message that only repeats the label.
fn describe_rpc_error(error: &proto::RpcError) -> String {
    let label = rpc_error_label(error.error_code);
    let detail = Some(error.message.as_str())
        .filter(|message| !message.is_empty() && !message.eq_ignore_ascii_case(label))
        .map(|message| format!(": {message}"))
        .unwrap_or_default();
    let status = Some(error.code)
        .filter(|code| *code != 0)
        .map(|code| format!(" (HTTP {code})"))
        .unwrap_or_default();
    format!("{label}{detail}{status}")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Seconds since 2025-01-01T00:00:00Z.
const ID_EPOCH: i64 = 1_735_689_600;

/// Client message ids: epoch seconds in the high 32 bits, a counter that
/// restarts every second in the low 32.
#[derive(Default)]
struct MessageIds {
    second: u64,
    counter: u32,
}

impl MessageIds {
    fn next_id(&mut self) -> u64 {
        self.next_at(chrono::Utc::now().timestamp())
    }

    fn next_at(&mut self, unix_seconds: i64) -> u64 {
        let second = u64::try_from(unix_seconds - ID_EPOCH).unwrap_or(0);
        if second == self.second {
            self.counter = self.counter.wrapping_add(1);
        } else {
            self.second = second;
            self.counter = 0;
        }
        (second << 32) | u64::from(self.counter)
    }
}
