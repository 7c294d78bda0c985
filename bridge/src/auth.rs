use reqwest::Client;
use serde::Deserialize;
use common::S2sCredentials;
use anyhow::{bail, Context, Result};
use log::{debug, error};
use std::time::Duration;

use crate::storage::StateStore;

const GRANT_TYPE: &str = "client_credentials";

/// Fetches Adobe IMS server-to-server tokens, caching them in the state store.
#[derive(Clone)]
pub struct ImsClient {
    client: Client,
    token_url: String,
    state: StateStore,
    cache_ttl: Duration,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

impl ImsClient {
    pub fn new(client: Client, token_url: String, state: StateStore, cache_ttl: Duration) -> Self {
        Self {
            client,
            token_url,
            state,
            cache_ttl,
        }
    }

    pub async fn server_to_server_token(&self, credentials: &S2sCredentials) -> Result<String> {
        let key = cache_key(credentials);
        if let Some(token) = self.state.get(&key).await? {
            debug!("Using cached S2S token for client {}", credentials.client_id);
            return Ok(token);
        }

        let (token, expires_in) = self.request_token(credentials).await?;
        let ttl = match expires_in {
            Some(secs) => self.cache_ttl.min(Duration::from_secs(secs)),
            None => self.cache_ttl,
        };
        self.state.put(&key, &token, Some(ttl)).await?;
        Ok(token)
    }

    async fn request_token(&self, credentials: &S2sCredentials) -> Result<(String, Option<u64>)> {
        debug!("Requesting S2S token for {:?}", credentials);
        let form = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("grant_type", GRANT_TYPE),
            ("scope", credentials.scopes.as_str()),
        ];

        let response = self.client
            .post(&self.token_url)
            .header("x-gw-ims-org-id", &credentials.org_id)
            .form(&form)
            .send()
            .await
            .context("IMS token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("IMS token request failed with status {}: {}", status, body);
            bail!("IMS token request failed with status {}", status);
        }

        let token: TokenResponse = response.json().await?;
        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok((access_token, token.expires_in)),
            _ => {
                error!("IMS token response did not include an access token");
                bail!("IMS token response did not include an access token");
            }
        }
    }
}

fn cache_key(credentials: &S2sCredentials) -> String {
    format!("s2s-token-{}", credentials.client_id)
}
