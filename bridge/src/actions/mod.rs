//! HTTP-triggered actions. Each invocation gets a flat parameter object and
//! answers with a `{statusCode, body}` pair.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use common::{ApplicationRuntimeInfo, Config, S2sCredentials};
use log::{debug, error, info};
use serde::Serialize;
use serde_json::{json, Value};

use crate::aem::AemClient;
use crate::auth::ImsClient;
use crate::brand_manager::BrandManager;
use crate::event_hub::{EventHubClient, ProviderIds};
use crate::event_manager::EventManager;
use crate::file_store::FileStore;
use crate::params::{check_missing_request_inputs, truthy_param, Params};
use crate::storage::StateStore;

pub mod adobe_product;
pub mod agency_event;
pub mod asset_sync_event;
pub mod asset_sync_internal;
pub mod brands;
pub mod registration;

pub const RUNTIME_INFO_PARAM: &str = "APPLICATION_RUNTIME_INFO";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub status_code: u16,
    pub body: Value,
    #[serde(skip)]
    failed: bool,
}

impl ActionResponse {
    pub fn ok(body: Value) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status_code: u16, body: Value) -> Self {
        ActionResponse {
            status_code,
            body,
            failed: false,
        }
    }

    /// Client-facing error; an invoke of an action answering this way fails.
    pub fn error(status_code: u16, message: &str) -> Self {
        info!("{}: {}", status_code, message);
        ActionResponse {
            status_code,
            body: json!({ "error": message }),
            failed: true,
        }
    }

    pub fn is_error(&self) -> bool {
        self.failed
    }

    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// Everything an action needs beyond its parameters.
#[derive(Clone)]
pub struct ActionContext {
    pub config: Arc<Config>,
    pub brands: BrandManager,
    pub hub: EventHubClient,
    pub aem: AemClient,
}

impl ActionContext {
    pub async fn from_config(config: Config) -> Result<Self> {
        let state = StateStore::new(&config.storage.state_db_path).await?;
        info!("State store initialized at {}", config.storage.state_db_path);
        let files = FileStore::new(&config.storage.files_dir).await?;
        info!("File store initialized at {}", config.storage.files_dir);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.http_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        let ims = ImsClient::new(
            client.clone(),
            config.ims.token_url.clone(),
            state.clone(),
            Duration::from_secs(config.ims.token_cache_ttl_secs),
        );
        let providers = ProviderIds {
            registration: config.events.registration_provider_id.clone(),
            asset_sync: config.events.asset_sync_provider_id.clone(),
        };
        let hub = EventHubClient::new(client.clone(), config.events.ingress_url.clone(), providers, ims.clone());
        let aem = AemClient::new(client, config.aem.base_url.clone(), ims);

        Ok(ActionContext {
            config: Arc::new(config),
            brands: BrandManager::new(state, files),
            hub,
            aem,
        })
    }

    /// Builds an EventManager from the invocation's credential parameters.
    pub fn event_manager(&self, params: &Params) -> Result<EventManager> {
        let credentials = S2sCredentials::from_params(params)?;
        let runtime_info = ApplicationRuntimeInfo::from_params(params)?;
        debug!("EventManager credentials: {:?}", credentials);
        EventManager::new(credentials, runtime_info, self.hub.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AdobeProductEventHandler,
    AgencyEventHandler,
    AgencyAssetSyncInternalHandler,
    AgencyAssetSyncEventHandler,
    NewBrandRegistration,
    GetBrands,
    GetBrand,
    EnableBrand,
    DisableBrand,
    DeleteBrand,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::AdobeProductEventHandler,
        Action::AgencyEventHandler,
        Action::AgencyAssetSyncInternalHandler,
        Action::AgencyAssetSyncEventHandler,
        Action::NewBrandRegistration,
        Action::GetBrands,
        Action::GetBrand,
        Action::EnableBrand,
        Action::DisableBrand,
        Action::DeleteBrand,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::AdobeProductEventHandler => "adobe-product-event-handler",
            Action::AgencyEventHandler => "agency-event-handler",
            Action::AgencyAssetSyncInternalHandler => "agency-assetsync-internal-handler",
            Action::AgencyAssetSyncEventHandler => "agency-assetsync-event-handler",
            Action::NewBrandRegistration => "new-brand-registration",
            Action::GetBrands => "get-brands",
            Action::GetBrand => "get-brand",
            Action::EnableBrand => "enable-brand",
            Action::DisableBrand => "disable-brand",
            Action::DeleteBrand => "delete-brand",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|action| action.name() == name)
    }
}

pub async fn dispatch(ctx: &ActionContext, action: Action, params: Params) -> ActionResponse {
    match action {
        Action::AdobeProductEventHandler => adobe_product::handle(ctx, params).await,
        Action::AgencyEventHandler => agency_event::handle(ctx, params).await,
        Action::AgencyAssetSyncInternalHandler => asset_sync_internal::handle(ctx, params).await,
        Action::AgencyAssetSyncEventHandler => asset_sync_event::handle(ctx, params).await,
        Action::NewBrandRegistration => registration::handle(ctx, params).await,
        Action::GetBrands => brands::get_brands(ctx).await,
        Action::GetBrand => brands::get_brand(ctx, params).await,
        Action::EnableBrand => brands::set_enabled(ctx, params, true).await,
        Action::DisableBrand => brands::set_enabled(ctx, params, false).await,
        Action::DeleteBrand => brands::delete_brand(ctx, params).await,
    }
}

/// Blocking in-process invoke of one of the internal handlers. Fails when the
/// handler answers with an error response.
pub async fn invoke(ctx: &ActionContext, action: Action, params: Params) -> Result<ActionResponse> {
    let response = match action {
        Action::AgencyAssetSyncInternalHandler => asset_sync_internal::handle(ctx, params).await,
        Action::AgencyAssetSyncEventHandler => asset_sync_event::handle(ctx, params).await,
        other => bail!("action {} cannot be invoked internally", other.name()),
    };
    if response.is_error() {
        bail!(
            "{} failed with status {}: {}",
            action.name(),
            response.status_code,
            response.error_message().unwrap_or("unknown error")
        );
    }
    Ok(response)
}

/// Invokes `action` and describes the outcome for the caller's response body.
pub(crate) async fn route(ctx: &ActionContext, action: Action, params: Params) -> Value {
    match invoke(ctx, action, params).await {
        Ok(result) => {
            info!("{} invocation successful", action.name());
            json!({ "success": true, "handler": action.name(), "result": result })
        }
        Err(e) => {
            error!("Error invoking {}: {:#}", action.name(), e);
            json!({ "success": false, "handler": action.name(), "error": e.to_string() })
        }
    }
}

/// I/O Events webhook registration sends a `challenge` that must be echoed.
pub(crate) fn challenge_response(params: &Params) -> Option<ActionResponse> {
    truthy_param(params, "challenge")
        .map(|challenge| ActionResponse::ok(json!({ "challenge": challenge })))
}

pub(crate) fn require_inputs(params: &Params, required: &[&str]) -> Option<ActionResponse> {
    check_missing_request_inputs(params, required, &[])
        .map(|message| ActionResponse::error(400, &message))
}

/// Shared checks of the agency-facing handlers.
pub(crate) fn check_agency_event(params: &Params) -> Option<ActionResponse> {
    if let Some(response) = require_inputs(params, &[RUNTIME_INFO_PARAM, "type", "data"]) {
        return Some(response);
    }
    if truthy_param(params, "data.app_runtime_info").is_none() {
        error!("Missing app_runtime_info in event data");
        return Some(ActionResponse::error(400, "Missing app_runtime_info in event data"));
    }
    None
}

/// A parameter as text; non-string values are rendered as JSON.
pub(crate) fn text_param(params: &Params, key: &str) -> String {
    match params.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_name(action.name()), Some(action));
        }
        assert_eq!(Action::from_name("agency-assetsynch-event-handler"), None);
    }

    #[test]
    fn error_response_shape() {
        let response = ActionResponse::error(400, "missing parameter(s) 'type'");
        assert!(response.is_error());
        assert_eq!(response.error_message(), Some("missing parameter(s) 'type'"));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "statusCode": 400, "body": { "error": "missing parameter(s) 'type'" } })
        );
        assert!(!ActionResponse::ok(json!({})).is_error());
    }

    #[test]
    fn challenge_is_echoed_unchanged() {
        let response = challenge_response(&params(json!({ "challenge": "abc-123" }))).unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, json!({ "challenge": "abc-123" }));

        assert!(challenge_response(&params(json!({ "challenge": "" }))).is_none());
        assert!(challenge_response(&params(json!({}))).is_none());
    }

    #[test]
    fn agency_events_need_runtime_info_in_data() {
        let missing = check_agency_event(&params(json!({ "type": "x" }))).unwrap();
        assert_eq!(
            missing.error_message(),
            Some("missing parameter(s) 'APPLICATION_RUNTIME_INFO,data'")
        );

        let no_info = check_agency_event(&params(json!({
            "APPLICATION_RUNTIME_INFO": "{}",
            "type": "com.adobe.a2b.assetsync.new",
            "data": { "asset_id": "a1" }
        })))
        .unwrap();
        assert_eq!(no_info.status_code, 400);
        assert_eq!(no_info.error_message(), Some("Missing app_runtime_info in event data"));

        assert!(check_agency_event(&params(json!({
            "APPLICATION_RUNTIME_INFO": "{}",
            "type": "com.adobe.a2b.assetsync.new",
            "data": { "app_runtime_info": { "consoleId": "c" } }
        })))
        .is_none());
    }

    #[test]
    fn text_params_render_non_strings() {
        let p = params(json!({ "a": "x", "b": 3, "c": null }));
        assert_eq!(text_param(&p, "a"), "x");
        assert_eq!(text_param(&p, "b"), "3");
        assert_eq!(text_param(&p, "c"), "");
        assert_eq!(text_param(&p, "d"), "");
    }
}
