//! Ticketing backend access
//!
//! [`EntradaApi`] is the seam the reducer's effects talk to; production code
//! uses [`HttpEntradaApi`], tests use `mocks::MockEntradaApi`.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | call | request |
//! |---|---|
//! | validate | `POST entradas/control` with `{"idEntrada","mdQr"}` |
//! | event | `GET eventos/{id}` |
//! | user | `GET usuarios/{id}` |
//! | first image | `GET imagenes/{entityId}/primera` |

use crate::config::ApiConfig;
use crate::types::ScanPayload;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Backend call failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Backend answered with a non-2xx status
    #[error("Request failed with status code {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, when it was JSON
        body: Option<Value>,
    },

    /// Request never got an answer (DNS, connect, timeout, ...)
    #[error("{0}")]
    Transport(String),

    /// 2xx answer whose body was not JSON
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Base URL cannot be turned into an endpoint URL
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status, for `Status` errors
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed error body, for `Status` errors
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Ticketing backend operations used by the scan flow
#[async_trait]
pub trait EntradaApi: Send + Sync {
    /// Ask the backend to validate (and consume) a ticket
    async fn validate(&self, payload: &ScanPayload) -> Result<Value, ApiError>;

    /// Fetch an event by id
    async fn event(&self, event_id: &str) -> Result<Value, ApiError>;

    /// Fetch a user by id
    async fn user(&self, user_id: &str) -> Result<Value, ApiError>;

    /// Fetch the first image attached to an entity
    async fn first_image(&self, entity_id: &str) -> Result<Value, ApiError>;
}

/// `reqwest`-backed [`EntradaApi`]
#[derive(Debug, Clone)]
pub struct HttpEntradaApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpEntradaApi {
    /// Create a client with default settings and no token
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: parse_base(base_url)?,
            token: None,
        })
    }

    /// Create a client from configuration (base URL, token, timeout)
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] for a bad base URL and
    /// [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: parse_base(&config.base_url)?,
            token: config.token.clone(),
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: serde_json::from_str(&text).ok(),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get(&self, segments: &[&str]) -> Result<Value, ApiError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "GET");
        self.execute(self.client.get(url)).await
    }
}

#[async_trait]
impl EntradaApi for HttpEntradaApi {
    #[tracing::instrument(skip(self, payload), fields(id_entrada = %payload.id_entrada))]
    async fn validate(&self, payload: &ScanPayload) -> Result<Value, ApiError> {
        let url = self.endpoint(&["entradas", "control"])?;
        self.execute(self.client.post(url).json(payload)).await
    }

    async fn event(&self, event_id: &str) -> Result<Value, ApiError> {
        self.get(&["eventos", event_id]).await
    }

    async fn user(&self, user_id: &str) -> Result<Value, ApiError> {
        self.get(&["usuarios", user_id]).await
    }

    async fn first_image(&self, entity_id: &str) -> Result<Value, ApiError> {
        self.get(&["imagenes", entity_id, "primera"]).await
    }
}

fn parse_base(base_url: &str) -> Result<Url, ApiError> {
    let url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(base_url.to_owned()));
    }
    Ok(url)
}
