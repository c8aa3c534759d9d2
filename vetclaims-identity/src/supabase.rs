//! Supabase Auth implementation.
//!
//! Uses the GoTrue `GET /auth/v1/user` endpoint, which returns the user the
//! access token was issued to.

use crate::error::{IdentityError, IdentityResult};
use crate::provider::{AuthenticatedUser, IdentityProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use vetclaims_types::ProfileId;

/// Supabase Auth configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL (e.g. `https://abc.supabase.co`). A trailing `/rest/v1`
    /// is tolerated.
    pub base_url: String,
    /// Anonymous API key, sent as the `apikey` header when present.
    pub anon_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            anon_key: None,
            timeout_secs: 10,
        }
    }
}

impl SupabaseConfig {
    /// Full URL of the user-info endpoint.
    pub fn user_endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/rest/v1").unwrap_or(base);
        format!("{base}/auth/v1/user")
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Option<String>,
    email: Option<String>,
}

/// Supabase Auth identity provider.
pub struct SupabaseIdentityProvider {
    config: SupabaseConfig,
    client: Client,
}

impl SupabaseIdentityProvider {
    /// Creates a new provider. Fails if the base URL is empty.
    pub fn new(config: SupabaseConfig) -> IdentityResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(IdentityError::Config("Supabase base URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IdentityError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    fn provider_name(&self) -> &'static str {
        "Supabase"
    }

    async fn verify(&self, token: &str) -> IdentityResult<AuthenticatedUser> {
        let mut request = self
            .client
            .get(self.config.user_endpoint())
            .bearer_auth(token);
        if let Some(key) = &self.config.anon_key {
            request = request.header("apikey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
            });
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("failed to parse user: {e}")))?;

        let raw_id = user
            .id
            .ok_or_else(|| IdentityError::InvalidResponse("user has no id".to_string()))?;
        let id = ProfileId::parse(&raw_id)
            .map_err(|e| IdentityError::InvalidResponse(format!("user id is not a UUID: {e}")))?;

        debug!("Verified credential for user {}", id);
        Ok(AuthenticatedUser {
            id,
            email: user.email,
        })
    }
}
