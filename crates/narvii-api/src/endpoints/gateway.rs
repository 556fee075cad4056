//! `RequestGateway` implementation for [`HttpClient`]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use narvii_core::{
    ApiError, ApiResult, ChatMessage, LoginResponse, MediaUpload, OutgoingMessage,
    RequestGateway, Session, UserProfile,
};
use reqwest::Method;
use serde_json::{json, Value};

use super::payloads;
use crate::http::{response::field, HttpClient};

#[async_trait]
impl RequestGateway for HttpClient {
    fn device_id(&self) -> String {
        self.device().to_string()
    }

    fn set_session(&self, session: &Session) {
        self.install_session(session);
    }

    fn session(&self) -> Option<Session> {
        self.current_session()
    }

    fn scoped(&self, community_id: i64) -> Arc<dyn RequestGateway> {
        Arc::new(self.with_community(community_id))
    }

    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let body = payloads::login_body(email, password, self.device());
        let response = self.request(Method::POST, "auth/login", Some(body)).await?;
        let login: LoginResponse = serde_json::from_value(response)?;

        let (Some(sid), Some(auid)) = (&login.sid, &login.auid) else {
            return Err(ApiError::Decode("login response without sid/auid".to_string()));
        };
        self.install_session(&Session::new(sid, auid));

        tracing::info!(user_id = %auid, "Logged in");
        Ok(login)
    }

    async fn get_user_info(&self, user_id: &str) -> ApiResult<UserProfile> {
        let response = self
            .request(Method::GET, &format!("user-profile/{user_id}"), None)
            .await?;
        Ok(serde_json::from_value(field(response, "userProfile")?)?)
    }

    async fn follow(&self, user_ids: &[String]) -> ApiResult<Value> {
        let me = self.user_id()?;
        self.request(
            Method::POST,
            &format!("user-profile/{me}/joined"),
            Some(json!({ "targetUidList": user_ids })),
        )
        .await
    }

    async fn unfollow(&self, user_id: &str) -> ApiResult<Value> {
        let me = self.user_id()?;
        self.request(
            Method::DELETE,
            &format!("user-profile/{me}/joined/{user_id}"),
            None,
        )
        .await
    }

    async fn get_user_blogs(&self, user_id: &str, start: u32, size: u32) -> ApiResult<Value> {
        let response = self
            .request(
                Method::GET,
                &format!("blog?type=user&q={user_id}&start={start}&size={size}"),
                None,
            )
            .await?;
        field(response, "blogList")
    }

    async fn send_message(
        &self,
        chat_id: &str,
        message: OutgoingMessage,
    ) -> ApiResult<ChatMessage> {
        let body = payloads::message_body(&message, Utc::now().timestamp());
        let response = self
            .request(
                Method::POST,
                &format!("chat/thread/{chat_id}/message"),
                Some(body),
            )
            .await?;
        Ok(serde_json::from_value(field(response, "message")?)?)
    }

    async fn send_media(&self, chat_id: &str, media: MediaUpload) -> ApiResult<Value> {
        self.request(
            Method::POST,
            &format!("chat/thread/{chat_id}/message"),
            Some(payloads::media_body(&media)),
        )
        .await
    }

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &str,
        as_staff: bool,
        reason: Option<&str>,
    ) -> ApiResult<Value> {
        if as_staff {
            self.request(
                Method::POST,
                &format!("chat/thread/{chat_id}/message/{message_id}/admin"),
                Some(payloads::admin_delete_body(reason)),
            )
            .await
        } else {
            self.request(
                Method::DELETE,
                &format!("chat/thread/{chat_id}/message/{message_id}"),
                None,
            )
            .await
        }
    }

    async fn kick_from_chat(
        &self,
        chat_id: &str,
        user_id: &str,
        allow_rejoin: bool,
    ) -> ApiResult<Value> {
        self.request(
            Method::DELETE,
            &format!(
                "chat/thread/{chat_id}/member/{user_id}?allowRejoin={}",
                u8::from(allow_rejoin)
            ),
            None,
        )
        .await
    }

    async fn join_chat(&self, chat_id: &str) -> ApiResult<Value> {
        let me = self.user_id()?;
        self.request(
            Method::POST,
            &format!("chat/thread/{chat_id}/member/{me}"),
            None,
        )
        .await
    }

    async fn leave_chat(&self, chat_id: &str) -> ApiResult<Value> {
        let me = self.user_id()?;
        self.request(
            Method::DELETE,
            &format!("chat/thread/{chat_id}/member/{me}"),
            None,
        )
        .await
    }

    async fn invite_to_chat(&self, user_ids: &[String], chat_id: &str) -> ApiResult<Value> {
        self.request(
            Method::POST,
            &format!("chat/thread/{chat_id}/member/invite"),
            Some(json!({ "uids": user_ids })),
        )
        .await
    }

    async fn join_community(&self, invitation_code: Option<&str>) -> ApiResult<Value> {
        let mut body = json!({});
        if let Some(code) = invitation_code {
            let identify = self
                .request(
                    Method::GET,
                    &format!(
                        "community/link-identify?q=http%3A%2F%2Faminoapps.com%2Finvite%2F{code}"
                    ),
                    None,
                )
                .await?;
            body["invitationId"] = identify
                .pointer("/invitation/invitationId")
                .cloned()
                .unwrap_or(identify);
        }
        self.request(Method::POST, "community/join", Some(body))
            .await
    }

    async fn leave_community(&self) -> ApiResult<Value> {
        self.request(Method::POST, "community/leave", None).await
    }

    async fn get_link_info(&self, link: &str) -> ApiResult<Value> {
        let url = reqwest::Url::parse_with_params(&self.endpoint("link-resolution"), [("q", link)])
            .map_err(|e| ApiError::Http(e.to_string()))?;
        let response = self.request_url(Method::GET, url.as_str(), None).await?;
        response
            .pointer("/linkInfoV2/extensions")
            .cloned()
            .ok_or_else(|| ApiError::Decode("missing field `linkInfoV2.extensions`".to_string()))
    }

    async fn get_from_id(&self, object_id: &str, object_type: i64) -> ApiResult<Value> {
        let body = json!({
            "objectId": object_id,
            "targetCode": 1,
            "objectType": object_type,
        });
        let response = self
            .request_url(
                Method::POST,
                &self.global_endpoint("link-resolution"),
                Some(body),
            )
            .await?;
        response
            .pointer("/linkInfoV2/extensions/linkInfo")
            .cloned()
            .ok_or_else(|| {
                ApiError::Decode("missing field `linkInfoV2.extensions.linkInfo`".to_string())
            })
    }

    async fn download(&self, link: &str) -> ApiResult<Vec<u8>> {
        self.fetch_bytes(link).await
    }
}
