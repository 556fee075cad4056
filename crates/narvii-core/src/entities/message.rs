//! Chat message entities
//!
//! `ChatMessage` mirrors the platform's message object and is shared between
//! socket frames and REST responses, so every field is optional.
//! `ChatEvent` is the validated view the dispatcher works with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::frame::SocketFrame;
use crate::error::FrameError;
use crate::value_objects::{MediaKind, MessageKind};

/// Message author summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub uid: Option<String>,
    pub nickname: Option<String>,
    pub icon: Option<String>,
    pub level: Option<i64>,
    pub reputation: Option<i64>,
    pub role: Option<i64>,
}

/// A mentioned user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub uid: String,
}

/// Message extensions (mentions, reply chain)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extensions {
    pub reply_message_id: Option<String>,
    pub reply_message: Option<Box<ChatMessage>>,
    pub mentioned_array: Option<Vec<Mention>>,
}

/// Platform chat message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_id: Option<String>,
    pub thread_id: Option<String>,
    pub uid: Option<String>,
    pub author: Option<Author>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<MessageKind>,
    pub media_type: Option<MediaKind>,
    pub media_value: Option<String>,
    pub client_ref_id: Option<i64>,
    pub created_time: Option<String>,
    pub extensions: Option<Extensions>,
    pub ndc_id: Option<i64>,
}

/// A chat message received over the socket, validated for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    /// Community the message was posted in (0 = global)
    pub community_id: i64,
    /// Thread the message was posted in
    pub conversation_id: String,
    /// Message id, when the platform sent one
    pub message_id: Option<String>,
    /// Author account id
    pub author_id: String,
    /// Message text, absent for media messages
    pub text: Option<String>,
    pub message_kind: MessageKind,
    pub media_kind: MediaKind,
    /// Account ids mentioned in the message
    pub mentioned_ids: Vec<String>,
    /// Author of the message this one replies to
    pub reply_to_author_id: Option<String>,
    /// Raw `extensions` object as received
    pub raw_extensions: Value,
    /// Full decoded message
    pub message: ChatMessage,
}

impl ChatEvent {
    /// Build a chat event from a frame of kind 1000
    pub fn from_frame(frame: &SocketFrame) -> Result<Self, FrameError> {
        if !frame.kind().is_chat_message() {
            return Err(FrameError::UnexpectedKind(frame.kind().as_i64()));
        }

        let raw = frame
            .payload()
            .get("chatMessage")
            .ok_or(FrameError::MissingField("chatMessage"))?;
        let raw_extensions = raw.get("extensions").cloned().unwrap_or(Value::Null);
        let mut message: ChatMessage = serde_json::from_value(raw.clone())?;

        let community_id = frame.community_id().or(message.ndc_id).unwrap_or(0);
        message.ndc_id = Some(community_id);

        let author_id = message
            .uid
            .clone()
            .or_else(|| message.author.as_ref().and_then(|a| a.uid.clone()))
            .ok_or(FrameError::MissingField("uid"))?;
        let conversation_id = message
            .thread_id
            .clone()
            .ok_or(FrameError::MissingField("threadId"))?;
        let message_kind = message.message_type.unwrap_or(MessageKind::UNKNOWN);
        let media_kind = message.media_type.unwrap_or(MediaKind::UNKNOWN);

        let extensions = message.extensions.as_ref();
        let mentioned_ids = extensions
            .and_then(|e| e.mentioned_array.as_ref())
            .map(|mentions| mentions.iter().map(|m| m.uid.clone()).collect())
            .unwrap_or_default();
        let reply_to_author_id = extensions
            .and_then(|e| e.reply_message.as_ref())
            .and_then(|reply| {
                reply
                    .uid
                    .clone()
                    .or_else(|| reply.author.as_ref().and_then(|a| a.uid.clone()))
            });

        Ok(Self {
            community_id,
            conversation_id,
            message_id: message.message_id.clone(),
            author_id,
            text: message.content.clone(),
            message_kind,
            media_kind,
            mentioned_ids,
            reply_to_author_id,
            raw_extensions,
            message,
        })
    }

    /// Whether `user_id` wrote this message
    #[must_use]
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }

    /// Whether `user_id` is mentioned or is the author of the replied-to message
    #[must_use]
    pub fn mentions(&self, user_id: &str) -> bool {
        self.mentioned_ids.iter().any(|uid| uid == user_id)
            || self.reply_to_author_id.as_deref() == Some(user_id)
    }

    /// Author nickname, if the frame carried one
    #[must_use]
    pub fn author_nickname(&self) -> Option<&str> {
        self.message
            .author
            .as_ref()
            .and_then(|a| a.nickname.as_deref())
    }
}
