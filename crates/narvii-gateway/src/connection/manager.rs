//! Connection manager
//!
//! Opens the socket with failover across the configured hosts, rotates it on
//! a fixed interval, and keeps the session fresh across rotations.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use narvii_common::{
    BotConfig, BotError, BotResult, Credentials, SessionStore, Signer, SocketConfig,
};
use narvii_core::{ApiError, LoginResponse, RequestGateway, Session, UserProfile};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use super::{Connection, ConnectionState};
use crate::dispatch::EventDispatcher;
use crate::protocol::OutgoingFrame;

/// Client WebSocket stream
pub type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Channel buffer size for outgoing frames
const OUTGOING_BUFFER_SIZE: usize = 100;

/// Why a listen cycle ended
#[derive(Debug)]
enum ListenOutcome {
    /// The rotation interval elapsed
    Rotate,
    /// The server closed the socket or the stream failed
    Disconnected,
    /// Dispatch raised an error the loop must not swallow
    Failed(BotError),
}

/// Handshake URL for a host: `{host}/?signbody={device_id}%7C{timestamp_ms}`
#[must_use]
pub fn handshake_url(host: &str, device_id: &str, timestamp_ms: i64) -> String {
    format!(
        "{}/?signbody={device_id}%7C{timestamp_ms}",
        host.trim_end_matches('/')
    )
}

/// Owns the socket lifecycle and the session it authenticates with
pub struct ConnectionManager {
    socket: SocketConfig,
    signer: Signer,
    credentials: Credentials,
    store: SessionStore,
    session_ttl: chrono::Duration,
    gateway: Arc<dyn RequestGateway>,
    connection: Arc<Connection>,
}

impl ConnectionManager {
    /// Create a manager writing through `connection`
    ///
    /// # Errors
    /// Returns an error if the configured signature key is unusable
    pub fn new(
        config: &BotConfig,
        gateway: Arc<dyn RequestGateway>,
        connection: Arc<Connection>,
    ) -> BotResult<Self> {
        Ok(Self {
            socket: config.socket.clone(),
            signer: Signer::new(config.signature_prefix, &config.signature_key)?,
            credentials: config.credentials.clone(),
            store: SessionStore::new(&config.session_file),
            session_ttl: config.session_ttl(),
            gateway,
            connection,
        })
    }

    /// Live connection handle
    #[must_use]
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Restore the persisted session or log in, returning the account profile
    ///
    /// # Errors
    /// Returns an error if login fails
    pub async fn authenticate(&self) -> BotResult<UserProfile> {
        let Credentials { email, password } = &self.credentials;

        match self.store.load(email, password, self.session_ttl) {
            Ok(Some(session)) => {
                self.gateway.set_session(&session);
                match self.gateway.get_user_info(&session.user_id).await {
                    Ok(profile) => {
                        tracing::info!(user_id = %session.user_id, "Restored saved session");
                        return Ok(profile);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Saved session rejected, logging in");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.store.path().display(),
                    error = %e,
                    "Failed to read session file"
                );
            }
        }

        let login = self.login().await?;
        match login.user_profile {
            Some(profile) => Ok(profile),
            None => {
                let session = self.current_session()?;
                Ok(self.gateway.get_user_info(&session.user_id).await?)
            }
        }
    }

    /// Return the current session, re-authenticating first if it is stale
    ///
    /// # Errors
    /// Returns an error if re-authentication fails
    pub async fn ensure_fresh(&self) -> BotResult<Session> {
        if let Some(session) = self.gateway.session() {
            let now = Utc::now();
            if session.is_fresh_at(now, self.session_ttl) {
                return Ok(session);
            }
            tracing::info!(
                age_hours = session.age_at(now).num_hours(),
                "Session expired, re-authenticating"
            );
        }

        self.login().await?;
        self.current_session()
    }

    async fn login(&self) -> BotResult<LoginResponse> {
        let Credentials { email, password } = &self.credentials;
        let login = self.gateway.login(email, password).await?;
        let session = self.current_session()?;

        if let Err(e) = self.store.save(email, password, &session) {
            tracing::warn!(
                path = %self.store.path().display(),
                error = %e,
                "Failed to persist session"
            );
        } else {
            tracing::info!(user_id = %session.user_id, "Session saved");
        }
        Ok(login)
    }

    fn current_session(&self) -> BotResult<Session> {
        self.gateway
            .session()
            .ok_or_else(|| ApiError::Decode("login did not produce a session".to_string()).into())
    }

    // =========================================================================
    // Socket
    // =========================================================================

    /// Open a socket on the first host that accepts the handshake
    ///
    /// The new socket is attached to the shared connection handle; the
    /// returned stream yields its inbound messages.
    ///
    /// # Errors
    /// Returns `BotError::Transport` if every host fails
    pub async fn connect(&self) -> BotResult<SplitStream<SocketStream>> {
        self.connection.set_state(ConnectionState::Connecting);

        for host in &self.socket.hosts {
            match self.open(host).await {
                Ok(socket) => {
                    let (sink, stream) = socket.split();
                    let session_id = Uuid::new_v4().to_string();
                    let (tx, rx) = mpsc::channel(OUTGOING_BUFFER_SIZE);

                    tokio::spawn(write_frames(session_id.clone(), sink, rx));
                    self.connection.attach(session_id.clone(), host, tx);

                    tracing::info!(session_id = %session_id, host = %host, "Socket connected");
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::warn!(host = %host, error = %e, "Handshake failed, trying next host");
                }
            }
        }

        Err(BotError::transport(format!(
            "all {} hosts refused the handshake",
            self.socket.hosts.len()
        )))
    }

    async fn open(&self, host: &str) -> BotResult<SocketStream> {
        let timestamp = Utc::now().timestamp_millis();
        let device_id = self.gateway.device_id();

        let mut request = handshake_url(host, &device_id, timestamp)
            .into_client_request()
            .map_err(BotError::transport)?;

        let headers = request.headers_mut();
        headers.insert("ndcdeviceid", header_value(&device_id)?);
        if let Some(session) = self.gateway.session() {
            headers.insert("ndcauth", header_value(&format!("sid={}", session.token))?);
        }
        headers.insert(
            "ndc-msg-sig",
            header_value(&self.signer.sign_handshake(&device_id, timestamp))?,
        );

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(BotError::transport)?;
        Ok(socket)
    }

    // =========================================================================
    // Listen loop
    // =========================================================================

    /// Connect, listen, and rotate until a non-recoverable error occurs
    ///
    /// `on_connected` runs after every successful connect, including the ones
    /// that follow a rotation.
    ///
    /// # Errors
    /// Returns the first error that is not recoverable
    pub async fn run<F, Fut>(
        &self,
        dispatcher: &EventDispatcher,
        mut on_connected: F,
    ) -> BotResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            let stream = match self.connect().await {
                Ok(stream) => stream,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        error = %e,
                        delay_ms = self.reconnect_delay_ms(),
                        "Connection failed, retrying"
                    );
                    tokio::time::sleep(self.socket.reconnect_delay).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            on_connected().await;

            match self.listen(stream, dispatcher).await {
                ListenOutcome::Rotate => {
                    self.connection.set_state(ConnectionState::Rotating);
                    self.connection.detach();
                    tracing::info!("Rotating connection");
                    self.refresh_before_reconnect().await?;
                }
                ListenOutcome::Disconnected => {
                    self.connection.detach();
                    tracing::info!(
                        delay_ms = self.reconnect_delay_ms(),
                        "Socket closed, reconnecting"
                    );
                    tokio::time::sleep(self.socket.reconnect_delay).await;
                    self.refresh_before_reconnect().await?;
                }
                ListenOutcome::Failed(e) => {
                    self.connection.detach();
                    return Err(e);
                }
            }
        }
    }

    /// Re-authenticate a stale session; a transport failure keeps the old one
    async fn refresh_before_reconnect(&self) -> BotResult<()> {
        match self.ensure_fresh().await {
            Ok(_) => Ok(()),
            Err(BotError::Api(e)) if e.is_transport() => {
                tracing::warn!(error = %e, "Re-authentication failed, keeping current session");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn reconnect_delay_ms(&self) -> u64 {
        u64::try_from(self.socket.reconnect_delay.as_millis()).unwrap_or(u64::MAX)
    }

    async fn listen(
        &self,
        mut stream: SplitStream<SocketStream>,
        dispatcher: &EventDispatcher,
    ) -> ListenOutcome {
        let rotation = tokio::time::sleep(self.socket.rotate_interval);
        tokio::pin!(rotation);

        loop {
            tokio::select! {
                () = &mut rotation => return ListenOutcome::Rotate,
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => match dispatcher.handle_text(&text) {
                        Ok(report) => {
                            tracing::trace!(
                                scheduled = report.scheduled.len(),
                                fulfilled_waits = report.fulfilled_waits,
                                "Frame dispatched"
                            );
                        }
                        Err(e) if e.is_recoverable() => {
                            tracing::debug!(error = %e, "Skipping frame");
                        }
                        Err(e) => return ListenOutcome::Failed(e),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(frame = ?frame, "Server closed socket");
                        return ListenOutcome::Disconnected;
                    }
                    Some(Ok(_)) => {
                        tracing::trace!("Ignoring non-text message");
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Socket error");
                        return ListenOutcome::Disconnected;
                    }
                    None => return ListenOutcome::Disconnected,
                },
            }
        }
    }
}

fn header_value(value: &str) -> BotResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(BotError::transport)
}

/// Forward queued frames to the socket until the handle drops the sender
async fn write_frames(
    session_id: String,
    mut sink: SplitSink<SocketStream, Message>,
    mut rx: mpsc::Receiver<OutgoingFrame>,
) {
    while let Some(frame) = rx.recv().await {
        let json = match frame.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Failed to encode frame");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(json)).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to send frame");
            break;
        }
    }

    let _ = sink.close().await;
    tracing::debug!(session_id = %session_id, "Socket writer stopped");
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("hosts", &self.socket.hosts)
            .field("rotate_interval", &self.socket.rotate_interval)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
