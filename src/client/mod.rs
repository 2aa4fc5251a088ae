//! HTTP client side of the connections API, and the connections page built on it.

use std::fmt::{Display, Formatter, Result as FmtResult};

use reqwest::{header::COOKIE, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;
use url::Url;

use crate::util::jwt::AUTH_COOKIE;

pub mod connections;
pub mod render;

/// User agent sent with every API request
pub const AEGIS_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with {status}{}", message_suffix(.message.as_deref()))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn message_suffix(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

/// Who we are and where the API lives.
///
/// Passed explicitly to the client instead of relying on a cookie jar.
#[derive(Debug, Clone)]
pub struct Session {
    base_url: Url,
    token: Option<String>,
}

impl Session {
    /// # Errors
    /// This fails if `api_url` isn't an absolute http(s) URL.
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(api_url).map_err(|e| ClientError::InvalidUrl(format!("{api_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(api_url.to_owned()));
        }

        Ok(Self { base_url, token })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Accept,
    Reject,
}

impl RequestAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

impl Display for RequestAction {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A player-like record as the page receives it.
///
/// Profile fields we don't know about are kept as-is.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCard {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl PlayerCard {
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsPayload {
    #[serde(default)]
    pub connections: Vec<PlayerCard>,
    #[serde(default)]
    pub pending_requests: Vec<PlayerCard>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    session: Session,
}

impl ApiClient {
    /// # Errors
    /// This fails if the underlying HTTP client can't be built (e.g. no TLS backend).
    pub fn new(session: Session) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(AEGIS_USER_AGENT)
            .build()?;
        Ok(Self { http, session })
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let url = self.session.endpoint(segments)?;
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.session.token {
            builder = builder.header(COOKIE, format!("{AUTH_COOKIE}={token}"));
        }
        Ok(builder)
    }

    /// Sends the request and turns every non-2xx status into an error.
    async fn send(builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|body| body.error);
        Err(ClientError::Status { status, message })
    }

    /// Fetches the session player's connections and incoming requests.
    ///
    /// # Errors
    /// This fails on transport errors, non-success statuses and bodies that aren't the expected JSON.
    #[instrument(skip(self), err(Debug))]
    pub async fn get_connections(&self) -> Result<ConnectionsPayload, ClientError> {
        let response = Self::send(self.request(Method::GET, &["api", "connections"])?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Accepts or rejects the pending request sent by `player_id`.
    ///
    /// # Errors
    /// This fails on transport errors and non-success statuses.
    #[instrument(skip(self), err(Debug))]
    pub async fn respond(&self, player_id: &str, action: RequestAction) -> Result<(), ClientError> {
        Self::send(self.request(
            Method::POST,
            &["api", "connections", action.as_str(), player_id],
        )?)
        .await?;
        Ok(())
    }

    /// Sends a connection request to `player_id`.
    ///
    /// # Errors
    /// This fails on transport errors and non-success statuses.
    #[instrument(skip(self), err(Debug))]
    pub async fn send_request(&self, player_id: &str) -> Result<(), ClientError> {
        Self::send(self.request(Method::POST, &["api", "connections", "request", player_id])?)
            .await?;
        Ok(())
    }
}
