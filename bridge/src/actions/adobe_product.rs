use log::{debug, info, warn};
use serde_json::json;

use super::{challenge_response, require_inputs, route, text_param, Action, ActionContext, ActionResponse, RUNTIME_INFO_PARAM};
use crate::params::{string_parameters, strip_openwhisk_params, truthy_param, Params};

const AEM_ASSET_EVENTS: [&str; 4] = [
    "aem.assets.asset.created",
    "aem.assets.asset.updated",
    "aem.assets.asset.deleted",
    "aem.assets.asset.metadata_updated",
];

/// Entry point for events from Adobe products, routed on their `type`.
pub async fn handle(ctx: &ActionContext, params: Params) -> ActionResponse {
    debug!("adobe-product-event-handler params: {}", string_parameters(&params));
    if let Some(response) = require_inputs(&params, &[RUNTIME_INFO_PARAM]) {
        return response;
    }
    if let Some(response) = challenge_response(&params) {
        return response;
    }

    if truthy_param(&params, "type").is_none() {
        warn!("No event type provided, cannot route event");
        return ActionResponse::with_status(
            400,
            json!({
                "message": "No event type provided",
                "error": "Event type is required for routing",
            }),
        );
    }
    let event_type = text_param(&params, "type");
    info!("Event type: {}", event_type);

    if !AEM_ASSET_EVENTS.contains(&event_type.as_str()) {
        warn!("Unhandled event type: {}", event_type);
        return ActionResponse::ok(json!({
            "message": "Adobe product event processed - unhandled type",
            "eventType": event_type,
            "note": "Event type not configured for routing",
        }));
    }

    let target = Action::AgencyAssetSyncEventHandler;
    info!("Routing AEM asset event to {}: {}", target.name(), event_type);
    let routing_result = route(ctx, target, strip_openwhisk_params(&params)).await;

    ActionResponse::ok(json!({
        "message": "Adobe product event processed successfully",
        "eventType": event_type,
        "routingResult": routing_result,
    }))
}
