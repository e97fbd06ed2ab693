use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::protocol::{chat_route, ChatRequest, ChatResponse};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Why an exchange failed. Callers other than diagnostics only care that it did.
#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("responder returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed responder payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("exchange was abandoned before it settled")]
    Cancelled,
}

/// Text in, reply text out. One exchange per call, no retries, no caching.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn exchange(&self, text: &str) -> Result<Reply, ResponderError>;
}

#[async_trait]
impl<T> Responder for Arc<T>
where
    T: Responder + ?Sized,
{
    async fn exchange(&self, text: &str) -> Result<Reply, ResponderError> {
        (**self).exchange(text).await
    }
}

/// Posts `{ "message": text }` to `{base_url}/chat`.
#[derive(Debug, Clone)]
pub struct HttpResponder {
    http: Client,
    base_url: String,
}

impl HttpResponder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// The timeout applies per request at the transport; the session itself never times out.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ResponderError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn exchange(&self, text: &str) -> Result<Reply, ResponderError> {
        let url = format!("{}{}", self.base_url, chat_route());
        let response = self
            .http
            .post(&url)
            .json(&ChatRequest {
                message: text.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("<unreadable body: {error}>"));
            return Err(ResponderError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let body: ChatResponse = serde_json::from_slice(&bytes)?;
        debug!(%url, reply_len = body.response.len(), "responder exchange completed");
        Ok(Reply::new(body.response))
    }
}

#[cfg(test)]
#[path = "tests/responder_tests.rs"]
mod tests;
