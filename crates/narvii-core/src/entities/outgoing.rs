//! Outgoing message builders

use serde_json::{json, Value};

use crate::value_objects::{MediaKind, MessageKind};

/// Embedded object card attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub object_id: Option<String>,
    pub object_type: Option<i64>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
}

impl Embed {
    /// Wire representation (`attachedObject`)
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "objectId": self.object_id,
            "objectType": self.object_type,
            "link": self.link,
            "title": self.title,
            "content": self.content,
            "mediaList": self.image.as_ref().map(|image| json!([[100, image, null]])),
        })
    }
}

/// A text message to post into a thread
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    pub message_type: MessageKind,
    pub reply_to: Option<String>,
    pub mentions: Vec<String>,
    pub ref_id: Option<i64>,
    pub embed: Option<Embed>,
}

impl OutgoingMessage {
    /// Plain text message
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Reply to an existing message
    #[must_use]
    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    /// Mention a user
    #[must_use]
    pub fn mention(mut self, user_id: impl Into<String>) -> Self {
        self.mentions.push(user_id.into());
        self
    }

    #[must_use]
    pub fn message_type(mut self, kind: MessageKind) -> Self {
        self.message_type = kind;
        self
    }

    #[must_use]
    pub fn ref_id(mut self, ref_id: i64) -> Self {
        self.ref_id = Some(ref_id);
        self
    }

    #[must_use]
    pub fn embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }
}

/// Kind of binary payload for [`MediaUpload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaUploadKind {
    Image,
    Gif,
    Audio,
}

impl MediaUploadKind {
    /// Media type the message is tagged with
    #[must_use]
    pub const fn media_kind(self) -> MediaKind {
        match self {
            Self::Image | Self::Gif => MediaKind::GIF_AND_IMAGE,
            Self::Audio => MediaKind::AUDIO,
        }
    }

    /// Message type the message is tagged with
    #[must_use]
    pub const fn message_kind(self) -> MessageKind {
        match self {
            Self::Image | Self::Gif => MessageKind::TEXT,
            Self::Audio => MessageKind::VOICE,
        }
    }

    /// Content type of the upload, when the platform expects one
    #[must_use]
    pub const fn content_type(self) -> Option<&'static str> {
        match self {
            Self::Image => Some("image/jpg"),
            Self::Gif => Some("image/gif"),
            Self::Audio => None,
        }
    }
}

/// Binary media message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub kind: MediaUploadKind,
    pub data: Vec<u8>,
}

impl MediaUpload {
    pub fn image(data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: MediaUploadKind::Image,
            data: data.into(),
        }
    }

    pub fn gif(data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: MediaUploadKind::Gif,
            data: data.into(),
        }
    }

    pub fn audio(data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: MediaUploadKind::Audio,
            data: data.into(),
        }
    }
}
