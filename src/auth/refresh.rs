// Auth service client: credential refresh and logout

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::models::auth::{CredentialPair, RefreshRequest, RefreshResponse};
use crate::models::response::{Envelope, CODE_OK};

/// Remote authentication operations
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange a refresh token for a new credential pair
    async fn refresh_credential(&self, refresh_token: &str) -> Result<CredentialPair>;

    /// End the session on the server, authenticated with the current access token
    async fn logout(&self, access_token: Option<&str>) -> Result<()>;
}

/// Auth service reached over HTTP, answering with the standard envelope
pub struct HttpAuthService {
    client: Client,
    refresh_url: Url,
    logout_url: Url,
}

impl HttpAuthService {
    pub fn new(client: Client, base_url: &Url, refresh_path: &str, logout_path: &str) -> Result<Self> {
        let refresh_url = base_url
            .join(refresh_path)
            .with_context(|| format!("Invalid refresh path: {}", refresh_path))?;
        let logout_url = base_url
            .join(logout_path)
            .with_context(|| format!("Invalid logout path: {}", logout_path))?;

        Ok(Self {
            client,
            refresh_url,
            logout_url,
        })
    }

    async fn post_envelope<B: serde::Serialize + ?Sized>(
        &self,
        url: &Url,
        bearer: Option<&str>,
        body: Option<&B>,
    ) -> Result<Envelope> {
        let mut request = self.client.post(url.clone());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response from {}", url))?;

        let envelope = Envelope::parse(&bytes).with_context(|| {
            format!(
                "Invalid auth service response: {} - {}",
                status,
                String::from_utf8_lossy(&bytes)
            )
        })?;

        if envelope.code != CODE_OK {
            anyhow::bail!(
                "Auth service rejected request: {} - {}",
                envelope.code,
                envelope.message
            );
        }

        Ok(envelope)
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn refresh_credential(&self, refresh_token: &str) -> Result<CredentialPair> {
        tracing::info!("Refreshing session credentials...");

        let request = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let envelope = self
            .post_envelope(&self.refresh_url, None, Some(&request))
            .await?;

        let data: RefreshResponse = serde_json::from_value(envelope.data)
            .context("Failed to parse refresh response")?;

        if data.access.is_empty() {
            anyhow::bail!("Refresh response does not contain an access token");
        }
        if data.refresh.is_empty() {
            anyhow::bail!("Refresh response does not contain a refresh token");
        }

        tracing::info!(
            expires = ?data.access_expired_at.map(|at| at.to_rfc3339()),
            "Session credentials refreshed"
        );

        Ok(data.into())
    }

    async fn logout(&self, access_token: Option<&str>) -> Result<()> {
        tracing::info!("Logging out...");
        self.post_envelope::<()>(&self.logout_url, access_token, None)
            .await?;
        Ok(())
    }
}
