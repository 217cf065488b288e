//! REST client for the hosted identity provider. Speaks the provider's user
//! endpoint: bearer token identifies the session, the service key
//! authenticates this backend.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use domains::{AppError, IdentityProvider, ProviderIdentity, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RestIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct ProviderUserBody {
    id: String,
    email: String,
    #[serde(default)]
    user_metadata: ProviderMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderMetadata {
    username: Option<String>,
}

impl RestIdentityProvider {
    pub fn new(base_url: impl Into<String>, service_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("identity provider client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key,
        })
    }

    fn user_endpoint(&self) -> String {
        format!("{}/auth/v1/user", self.base_url)
    }
}

fn transport_err(e: reqwest::Error) -> AppError {
    AppError::Internal(format!("identity provider unreachable: {e}"))
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn resolve(&self, access_token: &str) -> Result<ProviderIdentity> {
        let response = self
            .client
            .get(self.user_endpoint())
            .bearer_auth(access_token)
            .header("apikey", self.service_key.expose_secret())
            .send()
            .await
            .map_err(transport_err)?;

        match response.status() {
            status if status.is_success() => {
                let body: ProviderUserBody =
                    response.json().await.map_err(transport_err)?;
                Ok(ProviderIdentity {
                    subject: body.id,
                    email: body.email,
                    username: body.user_metadata.username,
                })
            }
            status if status.as_u16() == 401 || status.as_u16() == 403 => Err(
                AppError::Unauthorized("Identity provider rejected the session".into()),
            ),
            status => Err(AppError::Internal(format!(
                "identity provider returned {status}"
            ))),
        }
    }

    async fn set_username(&self, access_token: &str, username: &str) -> Result<()> {
        let response = self
            .client
            .put(self.user_endpoint())
            .bearer_auth(access_token)
            .header("apikey", self.service_key.expose_secret())
            .json(&serde_json::json!({ "data": { "username": username } }))
            .send()
            .await
            .map_err(transport_err)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status if status.as_u16() == 401 || status.as_u16() == 403 => Err(
                AppError::Unauthorized("Identity provider rejected the session".into()),
            ),
            status => Err(AppError::Internal(format!(
                "identity provider returned {status}"
            ))),
        }
    }
}
