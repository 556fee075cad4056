//! Signed HTTP client

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use narvii_common::{BotConfig, BotError, BotResult, ConfigError, Signer};
use narvii_core::{ApiError, ApiResult, Session};
use parking_lot::RwLock;
use reqwest::{header, Method};
use serde_json::Value;

use super::parse_response;

/// User agent sent with every request
pub const USER_AGENT: &str = "Apple iPhone14,2 iOS v16.2 Main/3.13.1";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// State shared by a client and every scoped copy of it
struct Shared {
    http: reqwest::Client,
    signer: Signer,
    device_id: String,
    api_base: String,
    session: RwLock<Option<Session>>,
}

/// REST client bound to one community (or the global scope)
///
/// Cloning is cheap; clones and [`scoped`](HttpClient::scoped) copies share
/// the connection pool and credentials.
#[derive(Clone)]
pub struct HttpClient {
    shared: Arc<Shared>,
    community_id: i64,
}

impl HttpClient {
    /// Create a global-scope client
    pub fn new(
        http: reqwest::Client,
        signer: Signer,
        device_id: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                http,
                signer,
                device_id: device_id.into(),
                api_base: api_base.into().trim_end_matches('/').to_string(),
                session: RwLock::new(None),
            }),
            community_id: 0,
        }
    }

    /// Build a client from bot configuration
    ///
    /// # Errors
    /// Returns an error if the signature key or proxy URL is invalid
    pub fn from_config(config: &BotConfig) -> BotResult<Self> {
        let signer = Signer::new(config.signature_prefix, &config.signature_key)?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ConfigError::InvalidValue("NARVII_PROXY", e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let http = builder.build().map_err(BotError::internal)?;

        Ok(Self::new(http, signer, &config.device_id, &config.api_base))
    }

    /// Same client, bound to another community
    #[must_use]
    pub fn with_community(&self, community_id: i64) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            community_id,
        }
    }

    /// Community this client is bound to (0 = global)
    #[must_use]
    pub fn community_id(&self) -> i64 {
        self.community_id
    }

    /// Path segment selecting the community: `g` or `x{id}`
    #[must_use]
    pub fn ndc(&self) -> String {
        if self.community_id == 0 {
            "g".to_string()
        } else {
            format!("x{}", self.community_id)
        }
    }

    /// Absolute URL for a path relative to the bound community
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/s/{}", self.shared.api_base, self.ndc(), path)
    }

    /// Absolute URL on the global host, `g/s-x{id}` when bound to a community
    #[must_use]
    pub fn global_endpoint(&self, path: &str) -> String {
        if self.community_id == 0 {
            format!("{}/g/s/{}", self.shared.api_base, path)
        } else {
            format!("{}/g/s-{}/{}", self.shared.api_base, self.ndc(), path)
        }
    }

    pub(crate) fn device(&self) -> &str {
        &self.shared.device_id
    }

    pub(crate) fn current_session(&self) -> Option<Session> {
        self.shared.session.read().clone()
    }

    pub(crate) fn install_session(&self, session: &Session) {
        *self.shared.session.write() = Some(session.clone());
    }

    /// Own user id, or a decode error when not logged in
    pub(crate) fn user_id(&self) -> ApiResult<String> {
        self.current_session()
            .map(|s| s.user_id)
            .ok_or_else(|| ApiError::Decode("not logged in".to_string()))
    }

    /// Serialize a JSON body with a fresh `timestamp` field and sign it
    pub(crate) fn sign_body(&self, mut body: Value) -> ApiResult<(String, String)> {
        if let Value::Object(map) = &mut body {
            map.insert(
                "timestamp".to_string(),
                Value::from(Utc::now().timestamp_millis()),
            );
        }
        let payload = serde_json::to_string(&body)?;
        let signature = self.shared.signer.sign(payload.as_bytes());
        Ok((payload, signature))
    }

    fn request_builder(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .shared
            .http
            .request(method, url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("NDCDEVICEID", &self.shared.device_id);

        if let Some(session) = self.current_session() {
            builder = builder
                .header("NDCAUTH", format!("sid={}", session.token))
                .header("AUID", session.user_id);
        }
        builder
    }

    /// Send a request to an absolute URL
    pub(crate) async fn request_url(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let mut builder = self.request_builder(method.clone(), url);
        if let Some(body) = body {
            let (payload, signature) = self.sign_body(body)?;
            builder = builder.header("NDC-MSG-SIG", signature).body(payload);
        }

        tracing::trace!(%method, url, community_id = self.community_id, "Sending request");

        let response = builder.send().await.map_err(http_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(http_error)?;

        parse_response(status, &text).inspect_err(|e| {
            tracing::debug!(%method, url, status, error = %e, "Request failed");
        })
    }

    /// Send a request to a path relative to the bound community
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        self.request_url(method, &self.endpoint(path), body).await
    }

    /// Fetch raw bytes from an absolute link
    pub(crate) async fn fetch_bytes(&self, link: &str) -> ApiResult<Vec<u8>> {
        let response = self
            .request_builder(Method::GET, link)
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(http_error)?;

        if status != 200 {
            let text = String::from_utf8_lossy(&bytes);
            return Err(match parse_response(status, &text) {
                Err(e) => e,
                Ok(_) => ApiError::InvalidRequest {
                    message: String::new(),
                    status_code: i64::from(status),
                },
            });
        }
        Ok(bytes.to_vec())
    }
}

fn http_error(err: reqwest::Error) -> ApiError {
    ApiError::Http(err.to_string())
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("api_base", &self.shared.api_base)
            .field("community_id", &self.community_id)
            .field("logged_in", &self.shared.session.read().is_some())
            .finish_non_exhaustive()
    }
}
