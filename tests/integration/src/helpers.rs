//! Test helpers for integration tests
//!
//! Provides a request gateway that records every call instead of talking to
//! the platform, and a local socket server that accepts the bot's handshake.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use narvii_common::{BotConfig, SocketConfig};
use narvii_core::{
    ApiError, ApiResult, ChatMessage, LoginResponse, MediaUpload, OutgoingMessage,
    RequestGateway, Session, UserProfile,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use crate::fixtures::BOT_ID;

/// Device id reported by [`RecordingGateway`]
pub const TEST_DEVICE_ID: &str = "TESTDEVICE";

// ============================================================================
// Recording gateway
// ============================================================================

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Community the calling gateway was scoped to
    pub community_id: i64,
    pub method: &'static str,
    pub args: Vec<String>,
    /// Message body, for `send_message`
    pub message: Option<OutgoingMessage>,
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
    session: Mutex<Option<Session>>,
    logins: AtomicUsize,
    reject_login: AtomicBool,
}

/// Request gateway double that records calls and answers with canned data
#[derive(Clone, Default)]
pub struct RecordingGateway {
    recorder: Arc<Recorder>,
    community_id: i64,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every login fail with an API error
    pub fn rejecting_login(self) -> Self {
        self.recorder.reject_login.store(true, Ordering::SeqCst);
        self
    }

    /// Every call recorded so far, across all scopes
    pub fn calls(&self) -> Vec<Call> {
        self.recorder.calls.lock().clone()
    }

    /// Recorded calls to `method`
    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    pub fn login_count(&self) -> usize {
        self.recorder.logins.load(Ordering::SeqCst)
    }

    /// Poll until `count` calls to `method` were recorded
    pub async fn wait_for_calls(&self, method: &str, count: usize, timeout: Duration) -> Vec<Call> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let calls = self.calls_to(method);
            if calls.len() >= count || tokio::time::Instant::now() >= deadline {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn record(&self, method: &'static str, args: &[&str]) {
        self.recorder.calls.lock().push(Call {
            community_id: self.community_id,
            method,
            args: args.iter().map(ToString::to_string).collect(),
            message: None,
        });
    }

    fn ok(&self, method: &'static str, args: &[&str]) -> ApiResult<Value> {
        self.record(method, args);
        Ok(json!({ "api:statuscode": 0 }))
    }
}

#[async_trait]
impl RequestGateway for RecordingGateway {
    fn device_id(&self) -> String {
        TEST_DEVICE_ID.to_string()
    }

    fn set_session(&self, session: &Session) {
        *self.recorder.session.lock() = Some(session.clone());
    }

    fn session(&self) -> Option<Session> {
        self.recorder.session.lock().clone()
    }

    fn scoped(&self, community_id: i64) -> Arc<dyn RequestGateway> {
        Arc::new(Self {
            recorder: Arc::clone(&self.recorder),
            community_id,
        })
    }

    async fn login(&self, email: &str, _password: &str) -> ApiResult<LoginResponse> {
        self.record("login", &[email]);
        if self.recorder.reject_login.load(Ordering::SeqCst) {
            return Err(ApiError::InvalidRequest {
                message: "Invalid account or password.".to_string(),
                status_code: 200,
            });
        }

        let count = self.recorder.logins.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Session::new(format!("sid-{count}"), BOT_ID);
        self.set_session(&session);

        Ok(LoginResponse {
            sid: Some(session.token),
            auid: Some(BOT_ID.to_string()),
            secret: None,
            user_profile: Some(UserProfile {
                uid: Some(BOT_ID.to_string()),
                nickname: Some("bot".to_string()),
                ..UserProfile::default()
            }),
        })
    }

    async fn get_user_info(&self, user_id: &str) -> ApiResult<UserProfile> {
        self.record("get_user_info", &[user_id]);
        Ok(UserProfile {
            uid: Some(user_id.to_string()),
            nickname: Some(format!("nick-{user_id}")),
            ..UserProfile::default()
        })
    }

    async fn follow(&self, user_ids: &[String]) -> ApiResult<Value> {
        let args: Vec<&str> = user_ids.iter().map(String::as_str).collect();
        self.ok("follow", &args)
    }

    async fn unfollow(&self, user_id: &str) -> ApiResult<Value> {
        self.ok("unfollow", &[user_id])
    }

    async fn get_user_blogs(&self, user_id: &str, start: u32, size: u32) -> ApiResult<Value> {
        self.ok("get_user_blogs", &[user_id, &start.to_string(), &size.to_string()])
    }

    async fn send_message(
        &self,
        chat_id: &str,
        message: OutgoingMessage,
    ) -> ApiResult<ChatMessage> {
        let reply = ChatMessage {
            thread_id: Some(chat_id.to_string()),
            uid: Some(BOT_ID.to_string()),
            content: message.content.clone(),
            ..ChatMessage::default()
        };
        self.recorder.calls.lock().push(Call {
            community_id: self.community_id,
            method: "send_message",
            args: vec![chat_id.to_string()],
            message: Some(message),
        });
        Ok(reply)
    }

    async fn send_media(&self, chat_id: &str, media: MediaUpload) -> ApiResult<Value> {
        self.ok("send_media", &[chat_id, &format!("{:?}", media.kind)])
    }

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &str,
        as_staff: bool,
        reason: Option<&str>,
    ) -> ApiResult<Value> {
        self.ok(
            "delete_message",
            &[chat_id, message_id, &as_staff.to_string(), reason.unwrap_or("")],
        )
    }

    async fn kick_from_chat(
        &self,
        chat_id: &str,
        user_id: &str,
        allow_rejoin: bool,
    ) -> ApiResult<Value> {
        self.ok("kick_from_chat", &[chat_id, user_id, &allow_rejoin.to_string()])
    }

    async fn join_chat(&self, chat_id: &str) -> ApiResult<Value> {
        self.ok("join_chat", &[chat_id])
    }

    async fn leave_chat(&self, chat_id: &str) -> ApiResult<Value> {
        self.ok("leave_chat", &[chat_id])
    }

    async fn invite_to_chat(&self, user_ids: &[String], chat_id: &str) -> ApiResult<Value> {
        let mut args: Vec<&str> = user_ids.iter().map(String::as_str).collect();
        args.push(chat_id);
        self.ok("invite_to_chat", &args)
    }

    async fn join_community(&self, invitation_code: Option<&str>) -> ApiResult<Value> {
        self.ok("join_community", &[invitation_code.unwrap_or("")])
    }

    async fn leave_community(&self) -> ApiResult<Value> {
        self.ok("leave_community", &[])
    }

    async fn get_link_info(&self, link: &str) -> ApiResult<Value> {
        self.ok("get_link_info", &[link])
    }

    async fn get_from_id(&self, object_id: &str, object_type: i64) -> ApiResult<Value> {
        self.ok("get_from_id", &[object_id, &object_type.to_string()])
    }

    async fn download(&self, link: &str) -> ApiResult<Vec<u8>> {
        self.record("download", &[link]);
        Ok(b"media".to_vec())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Bot configuration for tests, persisting the session under `dir`
pub fn test_config(dir: &Path, hosts: Vec<String>) -> BotConfig {
    let mut config = BotConfig::new("bot@example.com", "secret").with_prefix("/");
    config.session_file = dir.join("session.json");
    config.socket = SocketConfig {
        hosts,
        rotate_interval: Duration::from_secs(60),
        reconnect_delay: Duration::from_millis(50),
    };
    config.shutdown_grace = Duration::from_secs(1);
    config
}

/// A `ws://` URL nothing listens on
pub async fn refused_host() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("ws://{addr}"))
}

// ============================================================================
// Socket server
// ============================================================================

/// Handshake request as seen by the server
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub uri: String,
    pub device_id: Option<String>,
    pub auth: Option<String>,
    pub signature: Option<String>,
}

/// Local WebSocket server standing in for a socket host
///
/// Accepts any number of sequential connections. Frames queued with
/// [`MockSocketServer::push`] go to whichever connection is live; text the
/// bot sends is collected for [`MockSocketServer::next_received`].
pub struct MockSocketServer {
    pub addr: SocketAddr,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
    outbound: mpsc::UnboundedSender<String>,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    _handle: JoinHandle<()>,
}

impl MockSocketServer {
    /// Bind to an ephemeral port and start accepting
    pub async fn start() -> Result<Self> {
        Self::bind(false).await
    }

    /// Like [`start`](Self::start), but every socket is closed right after the handshake
    pub async fn start_closing() -> Result<Self> {
        Self::bind(true).await
    }

    async fn bind(close_after_handshake: bool) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let (outbound, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel::<String>();
        let outbound_rx = Arc::new(tokio::sync::Mutex::new(outbound_rx));

        let recorded = Arc::clone(&handshakes);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let outbound_rx = Arc::clone(&outbound_rx);
                let inbound_tx = inbound_tx.clone();

                tokio::spawn(async move {
                    let callback = |request: &Request, response: Response| {
                        let header = |name: &str| {
                            request
                                .headers()
                                .get(name)
                                .and_then(|v| v.to_str().ok())
                                .map(ToString::to_string)
                        };
                        recorded.lock().push(Handshake {
                            uri: request.uri().to_string(),
                            device_id: header("ndcdeviceid"),
                            auth: header("ndcauth"),
                            signature: header("ndc-msg-sig"),
                        });
                        Ok::<_, ErrorResponse>(response)
                    };
                    let Ok(mut socket) = tokio_tungstenite::accept_hdr_async(stream, callback).await
                    else {
                        return;
                    };
                    if close_after_handshake {
                        let _ = socket.close(None).await;
                        return;
                    }
                    let (mut sink, mut source) = socket.split();
                    let mut outbound_rx = outbound_rx.lock().await;

                    loop {
                        tokio::select! {
                            text = outbound_rx.recv() => match text {
                                Some(text) => {
                                    if sink.send(Message::Text(text)).await.is_err() {
                                        break;
                                    }
                                }
                                None => break,
                            },
                            message = source.next() => match message {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = inbound_tx.send(text);
                                }
                                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                        }
                    }
                });
            }
        });

        Ok(Self {
            addr,
            handshakes,
            outbound,
            inbound: tokio::sync::Mutex::new(inbound),
            _handle: handle,
        })
    }

    /// `ws://` URL of the server
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn handshakes(&self) -> Vec<Handshake> {
        self.handshakes.lock().clone()
    }

    /// Poll until `count` handshakes were accepted
    pub async fn wait_for_handshakes(&self, count: usize, timeout: Duration) -> Vec<Handshake> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let handshakes = self.handshakes();
            if handshakes.len() >= count || tokio::time::Instant::now() >= deadline {
                return handshakes;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Queue text for the live connection
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.outbound.send(text.into());
    }

    /// Next text frame the bot sent, parsed as JSON
    pub async fn next_received(&self, timeout: Duration) -> Option<Value> {
        let mut inbound = self.inbound.lock().await;
        let text = tokio::time::timeout(timeout, inbound.recv()).await.ok()??;
        serde_json::from_str(&text).ok()
    }
}
