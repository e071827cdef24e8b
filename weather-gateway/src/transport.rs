//! Outbound HTTP transport.
//!
//! The gateway never builds a global client; it receives an
//! [`HttpTransport`] constructed from an explicit [`TransportConfig`].

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

/// Settings applied once when the HTTP client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request could not be sent: {0}")]
    Request(String),
}

impl TransportError {
    /// Network-level failures are worth another attempt.
    pub fn is_network(&self) -> bool {
        !matches!(self, TransportError::Request(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let msg = err.to_string();
        if err.is_timeout() {
            TransportError::Timeout(msg)
        } else if err.is_connect() {
            TransportError::Connect(msg)
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(msg)
        } else if err.is_builder() || err.is_redirect() {
            TransportError::Request(msg)
        } else {
            // reqwest reports resets and other mid-flight I/O failures as request errors
            TransportError::Connect(msg)
        }
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync + Debug {
    async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<HttpResponse, TransportError> {
        let res = self.http.get(url).query(query).send().await?;

        let status = res.status().as_u16();
        let body = res.text().await.map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
