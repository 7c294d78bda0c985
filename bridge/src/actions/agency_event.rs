use log::{debug, info, warn};
use serde_json::json;

use super::{check_agency_event, route, text_param, Action, ActionContext, ActionResponse};
use crate::params::{string_parameters, Params};

const ASSET_SYNC_PREFIX: &str = "com.adobe.a2b.assetsync";

/// Entry point for events sent by registered agencies.
pub async fn handle(ctx: &ActionContext, params: Params) -> ActionResponse {
    debug!("agency-event-handler params: {}", string_parameters(&params));
    if let Some(response) = check_agency_event(&params) {
        return response;
    }

    let event_type = text_param(&params, "type");
    info!("Processing agency event: {}", event_type);

    if !event_type.starts_with(ASSET_SYNC_PREFIX) {
        warn!("Unhandled event type: {}", event_type);
        return ActionResponse::ok(json!({
            "message": "Agency event processed - unhandled type",
            "eventType": event_type,
            "note": "Event type not configured for routing",
        }));
    }

    let target = Action::AgencyAssetSyncInternalHandler;
    info!("Routing assetsync event to {}: {}", target.name(), event_type);
    let routing_result = route(ctx, target, params).await;

    ActionResponse::ok(json!({
        "message": "Agency event processed successfully",
        "eventType": event_type,
        "routingResult": routing_result,
    }))
}
