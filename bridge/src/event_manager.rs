use anyhow::{Context, Result};
use common::{ApplicationRuntimeInfo, IoEvent, S2sCredentials};
use log::{debug, error};

use crate::event_hub::EventHubClient;

/// Publishes bridge events on behalf of one action invocation.
pub struct EventManager {
    credentials: S2sCredentials,
    runtime_info: Option<ApplicationRuntimeInfo>,
    hub: EventHubClient,
}

impl EventManager {
    pub fn new(
        credentials: S2sCredentials,
        runtime_info: Option<ApplicationRuntimeInfo>,
        hub: EventHubClient,
    ) -> Result<Self> {
        if let Err(e) = credentials.validate() {
            error!("EventManager: S2S credentials missing: {:?}", credentials);
            return Err(e);
        }
        Ok(Self {
            credentials,
            runtime_info,
            hub,
        })
    }

    pub fn credentials(&self) -> &S2sCredentials {
        &self.credentials
    }

    // Every event is echoed on I/O Events; delivery straight to the brand's
    // endpoint is not wired up yet.
    pub async fn publish_event(&self, event: &mut IoEvent) -> Result<()> {
        debug!("EventManager publishing {} event", event.event_type());
        if let Some(info) = &self.runtime_info {
            event
                .attach_runtime_info(info)
                .context("failed to attach application runtime info")?;
        }
        self.hub.publish(&self.credentials, event).await
    }
}
