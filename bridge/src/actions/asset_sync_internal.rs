use anyhow::Result;
use common::{IoEvent, IoEventKind};
use log::{debug, error, info};
use serde_json::{json, Value};

use super::{check_agency_event, text_param, ActionContext, ActionResponse};
use crate::params::{string_parameters, truthy_param, Params};

/// Republishes an agency's asset-sync event on the I/O Event Hub.
pub async fn handle(ctx: &ActionContext, params: Params) -> ActionResponse {
    debug!("agency-assetsync-internal-handler params: {}", string_parameters(&params));
    if let Some(response) = check_agency_event(&params) {
        return response;
    }

    let event_type = text_param(&params, "type");
    info!("Processing assetsync event: {}", event_type);

    let kind = match IoEventKind::from_event_type(&event_type).filter(|kind| kind.is_asset_sync()) {
        Some(kind) => kind,
        None => {
            error!("Unsupported assetsync event type: {}", event_type);
            return ActionResponse::error(400, &format!("Unsupported assetsync event type: {}", event_type));
        }
    };

    let data = params.get("data").cloned().unwrap_or(Value::Null);
    if let Err(e) = publish(ctx, &params, kind, data).await {
        error!("Error publishing assetsync event: {:#}", e);
        return ActionResponse::error(500, "Error publishing assetsync event");
    }
    info!("Assetsync event published successfully: {}", event_type);

    let asset_id = truthy_param(&params, "data.asset_id")
        .cloned()
        .unwrap_or_else(|| json!("unknown"));
    ActionResponse::ok(json!({
        "message": "Assetsync event processed successfully",
        "eventType": event_type,
        "assetId": asset_id,
    }))
}

async fn publish(ctx: &ActionContext, params: &Params, kind: IoEventKind, data: Value) -> Result<()> {
    let manager = ctx.event_manager(params)?;
    let mut event = IoEvent::asset_sync(kind, data)?;
    manager.publish_event(&mut event).await
}
