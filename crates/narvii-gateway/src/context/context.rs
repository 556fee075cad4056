//! Handler context
//!
//! A context is built for every dispatched event. It carries the event, a
//! request gateway bound to the event's community, and the live connection,
//! so handlers can reply without tracking where the message came from.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use narvii_common::BotResult;
use narvii_core::{
    ApiError, ApiResult, ChatEvent, ChatMessage, MediaUpload, OutgoingMessage, RequestGateway,
    SocketFrame, UserProfile,
};
use serde_json::Value;

use super::SignalGuard;
use crate::connection::Connection;
use crate::dispatch::PendingResponses;
use crate::protocol::{SignalAction, SocketSignal};

/// Everything a handler needs to act on one event
#[derive(Clone)]
pub struct Context {
    event: Arc<ChatEvent>,
    gateway: Arc<dyn RequestGateway>,
    connection: Arc<Connection>,
    waiter: Arc<PendingResponses>,
}

impl Context {
    /// Create a context; `gateway` should already be scoped to the event's community
    pub fn new(
        event: Arc<ChatEvent>,
        gateway: Arc<dyn RequestGateway>,
        connection: Arc<Connection>,
        waiter: Arc<PendingResponses>,
    ) -> Self {
        Self {
            event,
            gateway,
            connection,
            waiter,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn event(&self) -> &ChatEvent {
        &self.event
    }

    #[must_use]
    pub fn message(&self) -> &ChatMessage {
        &self.event.message
    }

    #[must_use]
    pub fn community_id(&self) -> i64 {
        self.event.community_id
    }

    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.event.conversation_id
    }

    #[must_use]
    pub fn author_id(&self) -> &str {
        &self.event.author_id
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.event.text.as_deref()
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn RequestGateway> {
        &self.gateway
    }

    #[must_use]
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    fn message_id(&self) -> ApiResult<&str> {
        self.event
            .message_id
            .as_deref()
            .ok_or_else(|| ApiError::Decode("event has no message id".to_string()))
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Reply to the event's message in its thread
    pub async fn reply(&self, text: impl Into<String>) -> ApiResult<ChatMessage> {
        self.reply_with(OutgoingMessage::text(text)).await
    }

    /// Send `message` as a reply, unless it already replies to something else
    pub async fn reply_with(&self, mut message: OutgoingMessage) -> ApiResult<ChatMessage> {
        if message.reply_to.is_none() {
            message.reply_to.clone_from(&self.event.message_id);
        }
        self.send_with(message).await
    }

    /// Post text into the event's thread
    pub async fn send(&self, text: impl Into<String>) -> ApiResult<ChatMessage> {
        self.send_with(OutgoingMessage::text(text)).await
    }

    pub async fn send_with(&self, message: OutgoingMessage) -> ApiResult<ChatMessage> {
        self.gateway
            .send_message(&self.event.conversation_id, message)
            .await
    }

    pub async fn send_image(&self, data: impl Into<Vec<u8>>) -> ApiResult<Value> {
        self.send_media(MediaUpload::image(data)).await
    }

    pub async fn send_gif(&self, data: impl Into<Vec<u8>>) -> ApiResult<Value> {
        self.send_media(MediaUpload::gif(data)).await
    }

    pub async fn send_audio(&self, data: impl Into<Vec<u8>>) -> ApiResult<Value> {
        self.send_media(MediaUpload::audio(data)).await
    }

    async fn send_media(&self, media: MediaUpload) -> ApiResult<Value> {
        self.gateway
            .send_media(&self.event.conversation_id, media)
            .await
    }

    /// Fetch a media link's bytes
    pub async fn download(&self, link: &str) -> ApiResult<Vec<u8>> {
        self.gateway.download(link).await
    }

    // =========================================================================
    // Moderation
    // =========================================================================

    /// Delete the event's message
    pub async fn delete_message(&self, as_staff: bool, reason: Option<&str>) -> ApiResult<Value> {
        let message_id = self.message_id()?;
        self.gateway
            .delete_message(&self.event.conversation_id, message_id, as_staff, reason)
            .await
    }

    /// Remove the event's author from the thread
    pub async fn kick(&self, allow_rejoin: bool) -> ApiResult<Value> {
        self.gateway
            .kick_from_chat(&self.event.conversation_id, &self.event.author_id, allow_rejoin)
            .await
    }

    // =========================================================================
    // Author
    // =========================================================================

    /// Profile of the event's author
    pub async fn get_user_info(&self) -> ApiResult<UserProfile> {
        self.gateway.get_user_info(&self.event.author_id).await
    }

    /// Invite the event's author to another thread
    pub async fn invite(&self, chat_id: &str) -> ApiResult<Value> {
        self.gateway
            .invite_to_chat(std::slice::from_ref(&self.event.author_id), chat_id)
            .await
    }

    pub async fn follow(&self) -> ApiResult<Value> {
        self.gateway
            .follow(std::slice::from_ref(&self.event.author_id))
            .await
    }

    pub async fn unfollow(&self) -> ApiResult<Value> {
        self.gateway.unfollow(&self.event.author_id).await
    }

    pub async fn get_user_blogs(&self, start: u32, size: u32) -> ApiResult<Value> {
        self.gateway
            .get_user_blogs(&self.event.author_id, start, size)
            .await
    }

    // =========================================================================
    // Threads and communities
    // =========================================================================

    pub async fn join_chat(&self) -> ApiResult<Value> {
        self.gateway.join_chat(&self.event.conversation_id).await
    }

    pub async fn leave_chat(&self) -> ApiResult<Value> {
        self.gateway.leave_chat(&self.event.conversation_id).await
    }

    pub async fn join_community(&self, invitation_code: Option<&str>) -> ApiResult<Value> {
        self.gateway.join_community(invitation_code).await
    }

    pub async fn leave_community(&self) -> ApiResult<Value> {
        self.gateway.leave_community().await
    }

    pub async fn get_link_info(&self, link: &str) -> ApiResult<Value> {
        self.gateway.get_link_info(link).await
    }

    pub async fn get_from_id(&self, object_id: &str, object_type: i64) -> ApiResult<Value> {
        self.gateway.get_from_id(object_id, object_type).await
    }

    // =========================================================================
    // Indicators
    // =========================================================================

    /// Show the typing indicator in the event's thread while `body` runs
    ///
    /// The stop frame is sent exactly once whether `body` completes, returns
    /// an error, panics, or is cancelled. A panic is resumed after the stop
    /// frame is sent.
    pub async fn typing<F: Future>(&self, body: F) -> F::Output {
        self.signal_scope(SignalAction::Typing, body).await
    }

    /// Show the recording indicator in the event's thread while `body` runs
    pub async fn recording<F: Future>(&self, body: F) -> F::Output {
        self.signal_scope(SignalAction::Recording, body).await
    }

    async fn signal_scope<F: Future>(&self, action: SignalAction, body: F) -> F::Output {
        let signal = SocketSignal::new(
            action,
            self.event.community_id,
            self.event.conversation_id.clone(),
        );
        let guard = SignalGuard::start(Arc::clone(&self.connection), signal).await;
        let outcome = AssertUnwindSafe(body).catch_unwind().await;
        guard.finish().await;

        match outcome {
            Ok(output) => output,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    // =========================================================================
    // Waiting
    // =========================================================================

    /// Wait for the first frame satisfying `predicate`
    ///
    /// # Errors
    /// Returns `BotError::Timeout` if no matching frame arrives in time
    pub async fn wait_for<P>(&self, predicate: P, timeout: Option<Duration>) -> BotResult<SocketFrame>
    where
        P: Fn(&SocketFrame) -> bool + Send + Sync + 'static,
    {
        self.waiter.wait_for(predicate, timeout).await
    }

    /// Wait for the event's author to post again in the same thread
    ///
    /// # Errors
    /// Returns `BotError::Timeout` if no message arrives in time, or
    /// `BotError::Decode` if the matching frame is malformed
    pub async fn next_message(&self, timeout: Option<Duration>) -> BotResult<ChatEvent> {
        let conversation_id = self.event.conversation_id.clone();
        let author_id = self.event.author_id.clone();
        let frame = self
            .wait_for(
                move |frame| {
                    ChatEvent::from_frame(frame).is_ok_and(|event| {
                        event.conversation_id == conversation_id && event.author_id == author_id
                    })
                },
                timeout,
            )
            .await?;
        Ok(ChatEvent::from_frame(&frame)?)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("community_id", &self.event.community_id)
            .field("conversation_id", &self.event.conversation_id)
            .field("author_id", &self.event.author_id)
            .field("message_id", &self.event.message_id)
            .finish_non_exhaustive()
    }
}
