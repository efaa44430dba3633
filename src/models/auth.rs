// Credential types exchanged with the auth service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access and refresh credentials with their expiries
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialPair {
    pub access_token: String,
    pub access_expiry: Option<DateTime<Utc>>,
    pub refresh_token: String,
    pub refresh_expiry: Option<DateTime<Utc>>,
}

/// Refresh request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh response payload (the `data` of the auth service envelope)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub access_expired_at: Option<DateTime<Utc>>,
    pub refresh: String,
    #[serde(default)]
    pub refresh_expired_at: Option<DateTime<Utc>>,
}

impl From<RefreshResponse> for CredentialPair {
    fn from(resp: RefreshResponse) -> Self {
        Self {
            access_token: resp.access,
            access_expiry: resp.access_expired_at,
            refresh_token: resp.refresh,
            refresh_expiry: resp.refresh_expired_at,
        }
    }
}
