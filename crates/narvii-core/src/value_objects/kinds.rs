//! Message and media kinds
//!
//! The platform tags every chat message with two integers: the message type
//! (text, sticker, system notices, ...) and the media type of its payload.
//! Unknown values are preserved; the constants only name the known ones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat message type (`type` on the wire)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKind(pub i64);

impl MessageKind {
    /// Stand-in for a missing `type`; no filter accepts it
    pub const UNKNOWN: Self = Self(-1);
    pub const TEXT: Self = Self(0);
    pub const STRIKE: Self = Self(1);
    pub const VOICE: Self = Self(2);
    pub const STICKER: Self = Self(3);
    pub const SHARE_EXURL: Self = Self(50);
    pub const SHARE_USER: Self = Self(51);
    pub const VOICE_CHAT_NOT_ANSWERED: Self = Self(52);
    pub const VOICE_CHAT_NOT_CANCELLED: Self = Self(53);
    pub const VOICE_CHAT_NOT_DECLINED: Self = Self(54);
    pub const VIDEO_CHAT_NOT_ANSWERED: Self = Self(55);
    pub const VIDEO_CHAT_NOT_CANCELLED: Self = Self(56);
    pub const VIDEO_CHAT_NOT_DECLINED: Self = Self(57);
    pub const AVATAR_CHAT_NOT_ANSWERED: Self = Self(58);
    pub const AVATAR_CHAT_NOT_CANCELLED: Self = Self(59);
    pub const AVATAR_CHAT_NOT_DECLINED: Self = Self(60);
    pub const DELETE_MESSAGE: Self = Self(100);
    pub const GROUP_MEMBER_JOIN: Self = Self(101);
    pub const GROUP_MEMBER_LEAVE: Self = Self(102);
    pub const CHAT_INVITE: Self = Self(103);
    pub const CHAT_BACKGROUND_CHANGED: Self = Self(104);
    pub const CHAT_TITLE_CHANGED: Self = Self(105);
    pub const CHAT_ICON_CHANGED: Self = Self(106);
    pub const VOICE_CHAT_START: Self = Self(107);
    pub const VIDEO_CHAT_START: Self = Self(108);
    pub const AVATAR_CHAT_START: Self = Self(109);
    pub const VOICE_CHAT_END: Self = Self(110);
    pub const VIDEO_CHAT_END: Self = Self(111);
    pub const AVATAR_CHAT_END: Self = Self(112);
    pub const CHAT_CONTENT_CHANGED: Self = Self(113);
    pub const SCREEN_ROOM_START: Self = Self(114);
    pub const SCREEN_ROOM_END: Self = Self(115);
    pub const CHAT_HOST_TRANSFERRED: Self = Self(116);
    pub const TEXT_MESSAGE_FORCE_REMOVED: Self = Self(117);
    pub const CHAT_REMOVED_MESSAGE: Self = Self(118);
    pub const TEXT_MESSAGE_REMOVED_BY_ADMIN: Self = Self(119);
    pub const CHAT_TIP: Self = Self(120);
    pub const CHAT_PIN_ANNOUNCEMENT: Self = Self(121);
    pub const VOICE_CHAT_PERMISSION_OPEN_TO_EVERYONE: Self = Self(122);
    pub const VOICE_CHAT_PERMISSION_INVITED_AND_REQUESTED: Self = Self(123);
    pub const VOICE_CHAT_PERMISSION_INVITE_ONLY: Self = Self(124);
    pub const CHAT_VIEW_ONLY_ENABLED: Self = Self(125);
    pub const CHAT_VIEW_ONLY_DISABLED: Self = Self(126);
    pub const CHAT_UNPIN_ANNOUNCEMENT: Self = Self(127);
    pub const CHAT_TIPPING_ENABLED: Self = Self(128);
    pub const CHAT_TIPPING_DISABLED: Self = Self(129);
    pub const TIMESTAMP_MESSAGE: Self = Self(65281);
    pub const WELCOME_MESSAGE: Self = Self(65282);
    pub const INVITE_MESSAGE: Self = Self(65283);

    /// Every message type the platform is known to emit
    pub const ALL: &'static [Self] = &[
        Self::TEXT,
        Self::STRIKE,
        Self::VOICE,
        Self::STICKER,
        Self::SHARE_EXURL,
        Self::SHARE_USER,
        Self::VOICE_CHAT_NOT_ANSWERED,
        Self::VOICE_CHAT_NOT_CANCELLED,
        Self::VOICE_CHAT_NOT_DECLINED,
        Self::VIDEO_CHAT_NOT_ANSWERED,
        Self::VIDEO_CHAT_NOT_CANCELLED,
        Self::VIDEO_CHAT_NOT_DECLINED,
        Self::AVATAR_CHAT_NOT_ANSWERED,
        Self::AVATAR_CHAT_NOT_CANCELLED,
        Self::AVATAR_CHAT_NOT_DECLINED,
        Self::DELETE_MESSAGE,
        Self::GROUP_MEMBER_JOIN,
        Self::GROUP_MEMBER_LEAVE,
        Self::CHAT_INVITE,
        Self::CHAT_BACKGROUND_CHANGED,
        Self::CHAT_TITLE_CHANGED,
        Self::CHAT_ICON_CHANGED,
        Self::VOICE_CHAT_START,
        Self::VIDEO_CHAT_START,
        Self::AVATAR_CHAT_START,
        Self::VOICE_CHAT_END,
        Self::VIDEO_CHAT_END,
        Self::AVATAR_CHAT_END,
        Self::CHAT_CONTENT_CHANGED,
        Self::SCREEN_ROOM_START,
        Self::SCREEN_ROOM_END,
        Self::CHAT_HOST_TRANSFERRED,
        Self::TEXT_MESSAGE_FORCE_REMOVED,
        Self::CHAT_REMOVED_MESSAGE,
        Self::TEXT_MESSAGE_REMOVED_BY_ADMIN,
        Self::CHAT_TIP,
        Self::CHAT_PIN_ANNOUNCEMENT,
        Self::VOICE_CHAT_PERMISSION_OPEN_TO_EVERYONE,
        Self::VOICE_CHAT_PERMISSION_INVITED_AND_REQUESTED,
        Self::VOICE_CHAT_PERMISSION_INVITE_ONLY,
        Self::CHAT_VIEW_ONLY_ENABLED,
        Self::CHAT_VIEW_ONLY_DISABLED,
        Self::CHAT_UNPIN_ANNOUNCEMENT,
        Self::CHAT_TIPPING_ENABLED,
        Self::CHAT_TIPPING_DISABLED,
        Self::TIMESTAMP_MESSAGE,
        Self::WELCOME_MESSAGE,
        Self::INVITE_MESSAGE,
    ];

    /// Raw wire value
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for MessageKind {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media type of a chat message payload (`mediaType` on the wire)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaKind(pub i64);

impl MediaKind {
    /// Stand-in for a missing `mediaType`
    pub const UNKNOWN: Self = Self(-1);
    pub const TEXT: Self = Self(0);
    pub const GIF_AND_IMAGE: Self = Self(100);
    pub const AUDIO: Self = Self(110);
    pub const STICKER: Self = Self(113);

    pub const ALL: &'static [Self] = &[Self::TEXT, Self::AUDIO, Self::GIF_AND_IMAGE, Self::STICKER];

    /// Raw wire value
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for MediaKind {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
