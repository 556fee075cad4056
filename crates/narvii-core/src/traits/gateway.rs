//! Request gateway port
//!
//! The dispatch core only needs to authenticate and to give handlers a way to
//! act on events. The HTTP implementation lives in `narvii-api`; tests plug in
//! recording doubles.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::{ChatMessage, LoginResponse, MediaUpload, OutgoingMessage, UserProfile};
use crate::error::ApiResult;
use crate::value_objects::Session;

#[async_trait]
pub trait RequestGateway: Send + Sync {
    // =========================================================================
    // Session
    // =========================================================================

    /// Device id sent with every request and the socket handshake
    fn device_id(&self) -> String;

    /// Install credentials used by subsequent calls
    fn set_session(&self, session: &Session);

    /// Current credentials, if logged in
    fn session(&self) -> Option<Session>;

    /// A gateway bound to `community_id` sharing this one's transport and credentials
    fn scoped(&self, community_id: i64) -> Arc<dyn RequestGateway>;

    /// Authenticate with email and password
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse>;

    // =========================================================================
    // Users
    // =========================================================================

    async fn get_user_info(&self, user_id: &str) -> ApiResult<UserProfile>;

    async fn follow(&self, user_ids: &[String]) -> ApiResult<Value>;

    async fn unfollow(&self, user_id: &str) -> ApiResult<Value>;

    async fn get_user_blogs(&self, user_id: &str, start: u32, size: u32) -> ApiResult<Value>;

    // =========================================================================
    // Chat
    // =========================================================================

    async fn send_message(&self, chat_id: &str, message: OutgoingMessage)
        -> ApiResult<ChatMessage>;

    async fn send_media(&self, chat_id: &str, media: MediaUpload) -> ApiResult<Value>;

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &str,
        as_staff: bool,
        reason: Option<&str>,
    ) -> ApiResult<Value>;

    async fn kick_from_chat(
        &self,
        chat_id: &str,
        user_id: &str,
        allow_rejoin: bool,
    ) -> ApiResult<Value>;

    async fn join_chat(&self, chat_id: &str) -> ApiResult<Value>;

    async fn leave_chat(&self, chat_id: &str) -> ApiResult<Value>;

    async fn invite_to_chat(&self, user_ids: &[String], chat_id: &str) -> ApiResult<Value>;

    // =========================================================================
    // Communities and links
    // =========================================================================

    async fn join_community(&self, invitation_code: Option<&str>) -> ApiResult<Value>;

    async fn leave_community(&self) -> ApiResult<Value>;

    async fn get_link_info(&self, link: &str) -> ApiResult<Value>;

    async fn get_from_id(&self, object_id: &str, object_type: i64) -> ApiResult<Value>;

    async fn download(&self, link: &str) -> ApiResult<Vec<u8>>;
}
