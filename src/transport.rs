use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

use crate::models::request::Method;

/// Fully-configured request handed to a [`Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// Attach a bearer credential
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        self.headers
            .push(("Authorization".to_string(), format!("Bearer {}", token)));
        self
    }

    /// Value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response as received from the network
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// Transport-level HTTP status
    pub status: u16,
    pub body: Vec<u8>,
}

/// Network-level failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: &'static str,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Performs the actual network call
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport with connection pooling
pub struct HttpTransport {
    /// Shared HTTP client with connection pooling
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(max_connections: usize, connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::new("request_error", e.to_string()))?;
        let url = request.url.clone();

        let mut builder = self.client.request(method, request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            let err = classify(&e);
            tracing::warn!(
                error_kind = err.kind,
                error = %e,
                url = %url,
                "HTTP request error"
            );
            err
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&e))?
            .to_vec();

        tracing::debug!(status = status, url = %url, bytes = body.len(), "Received HTTP response");

        Ok(RawResponse { status, body })
    }
}

// Categorize the error for better debugging
fn classify(e: &reqwest::Error) -> TransportError {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    };
    TransportError::new(kind, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TransportRequest {
        TransportRequest {
            method: Method::Get,
            url: Url::parse("https://api.example.com/x").unwrap(),
            query: vec![],
            headers: vec![("authorization".to_string(), "Basic old".to_string())],
            body: None,
            timeout: None,
        }
    }

    #[test]
    fn test_with_bearer_replaces_existing_authorization() {
        let req = request().with_bearer("tok");
        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
        assert_eq!(
            req.headers
                .iter()
                .filter(|(n, _)| n.eq_ignore_ascii_case("authorization"))
                .count(),
            1
        );
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::new("timeout", "operation timed out");
        assert_eq!(err.to_string(), "timeout: operation timed out");
    }

    #[test]
    fn test_http_transport_builds() {
        let transport = HttpTransport::new(20, 30, 60).unwrap();
        let _ = transport.client();
    }
}
