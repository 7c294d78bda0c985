use reqwest::Client;
use serde_json::Value;
use common::S2sCredentials;
use anyhow::{bail, Context, Result};
use log::debug;

use crate::auth::ImsClient;

/// Reads asset JSON from an AEM author instance.
#[derive(Clone)]
pub struct AemClient {
    client: Client,
    base_url: Option<String>,
    ims: ImsClient,
}

impl AemClient {
    pub fn new(client: Client, base_url: Option<String>, ims: ImsClient) -> Self {
        Self {
            client,
            base_url,
            ims,
        }
    }

    pub fn asset_host(&self, repository_id: &str) -> String {
        match &self.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}", repository_id),
        }
    }

    /// Fetches `<host><asset_path>.3.json`, the asset node three levels deep.
    pub async fn get_asset_data(
        &self,
        credentials: &S2sCredentials,
        host: &str,
        asset_path: &str,
    ) -> Result<Value> {
        let url = format!("{}{}.3.json", host, asset_path);
        debug!("Fetching AEM asset data from {}", url);
        let token = self.ims
            .server_to_server_token(credentials)
            .await
            .context("failed to get AEM access token")?;

        let response = self.client
            .get(&url)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            bail!("request to {} failed with status code {}", url, response.status());
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StateStore;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::time::Duration;

    async fn aem_client(dir: &tempfile::TempDir, base_url: Option<String>, token_url: String) -> AemClient {
        let state = StateStore::new(dir.path().join("state.db").to_str().unwrap()).await.unwrap();
        let client = Client::new();
        let ims = ImsClient::new(client.clone(), token_url, state, Duration::from_secs(60));
        AemClient::new(client, base_url, ims)
    }

    fn credentials() -> S2sCredentials {
        S2sCredentials {
            client_id: "c".into(),
            client_secret: "s".into(),
            scopes: "openid".into(),
            org_id: "o".into(),
        }
    }

    #[tokio::test]
    async fn host_comes_from_repository_unless_overridden() {
        let dir = tempfile::tempdir().unwrap();
        let plain = aem_client(&dir, None, "http://unused".into()).await;
        assert_eq!(plain.asset_host("author-p1-e2.adobeaemcloud.com"), "https://author-p1-e2.adobeaemcloud.com");

        let dir = tempfile::tempdir().unwrap();
        let overridden = aem_client(&dir, Some("http://localhost:4502/".into()), "http://unused".into()).await;
        assert_eq!(overridden.asset_host("author-p1-e2.adobeaemcloud.com"), "http://localhost:4502");
    }

    #[tokio::test]
    async fn failed_fetch_names_url_and_status() {
        let app = Router::new()
            .route("/token", post(|| async { Json(json!({ "access_token": "t", "expires_in": 60 })) }))
            .fallback(|| async { (StatusCode::FORBIDDEN, "denied") });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let dir = tempfile::tempdir().unwrap();
        let aem = aem_client(&dir, Some(base.clone()), format!("{}/token", base)).await;
        let host = aem.asset_host("ignored");
        let err = aem
            .get_asset_data(&credentials(), &host, "/content/dam/a.png")
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("/content/dam/a.png.3.json"));
        assert!(err.contains("403"));
    }
}
