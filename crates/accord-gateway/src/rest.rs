//! REST collaborator boundary.
//!
//! The session layer needs exactly four things over HTTP: the gateway
//! URL, the application id, command uploads, and the generic execution
//! of queued [`OutboundRequest`]s. Everything else about the HTTP API
//! (resource builders, embeds, pagination) lives outside this crate;
//! the client only ever says "send this JSON to this URL with this
//! method".

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::queue::{OutboundRequest, RequestExecutor};
use crate::RestError;

/// Authenticated HTTP client for the service's REST API.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections
/// and the cached application id is shared across clones.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_base: String,
    oauth_base: String,
    token: String,
    /// Lazily fetched once, then cached for the process lifetime.
    application_id: Arc<OnceCell<String>>,
}

impl RestClient {
    /// Creates a client for the given API bases, authenticating every
    /// request with `Bot {token}`.
    pub fn new(
        api_base: impl Into<String>,
        oauth_base: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            oauth_base: oauth_base.into(),
            token: token.into(),
            application_id: Arc::new(OnceCell::new()),
        }
    }

    /// The REST API base URL (no trailing slash).
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The bot credential handlers receive for follow-up calls.
    pub fn token(&self) -> &str {
        &self.token
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Fetches the websocket URL the gateway session should connect to.
    pub async fn fetch_gateway_url(&self) -> Result<String, RestError> {
        let url = format!("{}/gateway/bot", self.api_base);
        let body = self.get_json(&url).await?;
        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(RestError::MissingField("url"))
    }

    /// The application id, fetched lazily on first use and cached.
    pub async fn application_id(&self) -> Result<&str, RestError> {
        let id = self
            .application_id
            .get_or_try_init(|| async {
                let url = format!("{}/applications/@me", self.oauth_base);
                let body = self.get_json(&url).await?;
                body.get("id")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or(RestError::MissingField("id"))
            })
            .await?;
        Ok(id)
    }

    /// Uploads one command definition as a global application command.
    pub async fn create_command(
        &self,
        application_id: &str,
        body: &Value,
    ) -> Result<(), RestError> {
        let url = format!(
            "{}/applications/{}/commands",
            self.api_base, application_id
        );
        debug!(%url, "uploading command definition");
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .json(body)
            .send()
            .await?;
        Self::check_status(&url, response.status())
    }

    async fn get_json(&self, url: &str) -> Result<Value, RestError> {
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await?;
        Self::check_status(url, response.status())?;
        Ok(response.json().await?)
    }

    fn check_status(
        url: &str,
        status: reqwest::StatusCode,
    ) -> Result<(), RestError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(RestError::Status {
                code: status.as_u16(),
                url: url.to_owned(),
            })
        }
    }
}

impl RequestExecutor for RestClient {
    async fn execute(&self, request: OutboundRequest) -> Result<(), RestError> {
        let response = self
            .http
            .request(request.method, &request.url)
            .header(AUTHORIZATION, self.auth_header())
            .json(&request.body)
            .send()
            .await?;
        let status = response.status();
        debug!(url = %request.url, status = status.as_u16(), "outbound request answered");
        Self::check_status(&request.url, status)
    }
}

// =========================================================================
// Tests
// =========================================================================
