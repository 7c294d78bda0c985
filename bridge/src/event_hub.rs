use reqwest::Client;
use common::{EventProvider, IoEvent, S2sCredentials};
use anyhow::{bail, Context, Result};
use log::{debug, error, info};
use uuid::Uuid;

use crate::auth::ImsClient;

const CLOUD_EVENTS_CONTENT_TYPE: &str = "application/cloudevents+json";

#[derive(Clone, Debug, Default)]
pub struct ProviderIds {
    pub registration: String,
    pub asset_sync: String,
}

impl ProviderIds {
    fn for_provider(&self, provider: EventProvider) -> &str {
        match provider {
            EventProvider::Registration => &self.registration,
            EventProvider::AssetSync => &self.asset_sync,
        }
    }
}

/// Publishes custom events to the Adobe I/O Events ingress.
#[derive(Clone)]
pub struct EventHubClient {
    client: Client,
    ingress_url: String,
    providers: ProviderIds,
    ims: ImsClient,
}

impl EventHubClient {
    pub fn new(client: Client, ingress_url: String, providers: ProviderIds, ims: ImsClient) -> Self {
        Self {
            client,
            ingress_url,
            providers,
            ims,
        }
    }

    /// Stamps the event with a fresh id and its provider source, then sends it.
    pub async fn publish(&self, credentials: &S2sCredentials, event: &mut IoEvent) -> Result<()> {
        debug!("Publishing {} event", event.event_type());
        let provider_id = self.providers.for_provider(event.kind.provider());
        if provider_id.is_empty() {
            error!("No event provider configured for {}", event.event_type());
            bail!("no event provider configured for event type {}", event.event_type());
        }

        event.id = Some(Uuid::new_v4().to_string());
        event.set_source(provider_id);

        if let Err(e) = event.validate() {
            error!("Event is not valid: {}", e);
            return Err(e.context("Event is not valid"));
        }

        let token = self.ims
            .server_to_server_token(credentials)
            .await
            .context("Error getting server2server token")?;

        let cloud_event = event.to_cloud_event()?;
        debug!("Cloud event to publish: {}", event.to_json());

        let response = self.client
            .post(&self.ingress_url)
            .bearer_auth(&token)
            .header("x-api-key", &credentials.client_id)
            .header("x-ims-org-id", &credentials.org_id)
            .header(reqwest::header::CONTENT_TYPE, CLOUD_EVENTS_CONTENT_TYPE)
            .body(serde_json::to_vec(&cloud_event)?)
            .send()
            .await
            .context("Error sending event")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Error sending event {}: status {} {}", cloud_event.id, status, body);
            bail!("Error sending event: ingress returned status {}", status);
        }

        info!("Event {} ({}) sent", cloud_event.id, cloud_event.r#type);
        Ok(())
    }
}
