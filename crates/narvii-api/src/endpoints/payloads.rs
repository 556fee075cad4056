//! Request body builders
//!
//! Pure functions producing the JSON bodies the platform expects. The
//! `timestamp` field is added at send time by the client.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use narvii_core::{MediaUpload, MediaUploadKind, OutgoingMessage};
use serde_json::{json, Value};

/// Marker pairs rewritten to the platform's inline formatting characters
const MARKERS: [(&str, &str); 2] = [("<$", "\u{200e}\u{200f}"), ("$>", "\u{202c}\u{202d}")];

/// Rewrite `<$`/`$>` markers
#[must_use]
pub fn escape_markers(text: &str) -> String {
    MARKERS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Client reference id used when the caller gives none
#[must_use]
pub fn default_ref_id(unix_secs: i64) -> i64 {
    (unix_secs / 10) % 1_000_000_000
}

/// Body for `auth/login`
#[must_use]
pub fn login_body(email: &str, password: &str, device_id: &str) -> Value {
    json!({
        "email": email,
        "v": 2,
        "secret": format!("0 {password}"),
        "deviceID": device_id,
        "clientType": 100,
        "action": "normal",
    })
}

/// Body for `chat/thread/{id}/message`
#[must_use]
pub fn message_body(message: &OutgoingMessage, unix_secs: i64) -> Value {
    let mentions = (!message.mentions.is_empty()).then(|| {
        message
            .mentions
            .iter()
            .map(|uid| json!({ "uid": uid }))
            .collect::<Vec<_>>()
    });

    let mut body = json!({
        "type": message.message_type,
        "content": message.content.as_deref().map(escape_markers),
        "clientRefId": message.ref_id.unwrap_or_else(|| default_ref_id(unix_secs)),
        "attachedObject": message.embed.as_ref().map(narvii_core::Embed::to_json),
        "extensions": {
            "mentionedArray": mentions,
        },
    });

    if let Some(reply) = &message.reply_to {
        body["replyMessageId"] = Value::from(reply.as_str());
    }
    body
}

/// Body for a media message
#[must_use]
pub fn media_body(media: &MediaUpload) -> Value {
    let mut body = json!({
        "content": null,
        "mediaType": media.kind.media_kind(),
        "mediaUploadValue": STANDARD.encode(&media.data),
    });

    match media.kind {
        MediaUploadKind::Audio => {
            body["type"] = json!(media.kind.message_kind());
        }
        MediaUploadKind::Image | MediaUploadKind::Gif => {
            body["mediaUploadValueContentType"] = json!(media.kind.content_type());
            body["mediaUhqEnabled"] = Value::Bool(true);
        }
    }
    body
}

/// Body for the staff delete operation
#[must_use]
pub fn admin_delete_body(reason: Option<&str>) -> Value {
    let mut body = json!({ "adminOpName": 102 });
    if let Some(reason) = reason {
        body["adminOpNote"] = json!({ "content": reason });
    }
    body
}
