use anyhow::{Context, Result};
use common::{IoEvent, IoEventKind};
use log::{debug, error, info, warn};
use serde_json::{json, Map, Value};

use super::{challenge_response, require_inputs, text_param, ActionContext, ActionResponse, RUNTIME_INFO_PARAM};
use crate::event_manager::EventManager;
use crate::params::{is_truthy, lookup, string_parameters, Params};

const ASSET_DELETED: &str = "aem.assets.asset.deleted";
const ASSET_METADATA_UPDATED: &str = "aem.assets.asset.metadata_updated";

/// Handles AEM asset events and fans flagged assets out to their customers.
pub async fn handle(ctx: &ActionContext, params: Params) -> ActionResponse {
    if let Some(response) = challenge_response(&params) {
        return response;
    }

    debug!("agency-assetsync-event-handler params: {}", string_parameters(&params));
    if let Some(response) = require_inputs(&params, &[RUNTIME_INFO_PARAM]) {
        return response;
    }

    let manager = match ctx.event_manager(&params) {
        Ok(manager) => manager,
        Err(e) => {
            error!("agency-assetsync-event-handler: {:#}", e);
            return ActionResponse::error(500, "Error Handling Event");
        }
    };

    let event_type = text_param(&params, "type");
    let published = match event_type.as_str() {
        ASSET_DELETED => {
            info!("Asset deleted event: {}", event_type);
            Ok(0)
        }
        ASSET_METADATA_UPDATED => {
            info!("Asset metadata updated event");
            sync_metadata_update(ctx, &manager, &params).await
        }
        _ => {
            info!("Asset event not handled: {}", event_type);
            Ok(0)
        }
    };

    match published {
        Ok(count) => ActionResponse::ok(json!({
            "message": "Asset event processed successfully",
            "eventsPublished": count,
        })),
        Err(e) => {
            error!("Error processing IO event: {:#}", e);
            ActionResponse::with_status(
                500,
                json!({ "message": "Error processing IO event", "error": format!("{:#}", e) }),
            )
        }
    }
}

async fn sync_metadata_update(ctx: &ActionContext, manager: &EventManager, params: &Params) -> Result<usize> {
    let repository = lookup(params, "data.repositoryMetadata")
        .and_then(Value::as_object)
        .context("event data has no repositoryMetadata")?;
    let repository_id = repository
        .get("repo:repositoryId")
        .and_then(Value::as_str)
        .context("repositoryMetadata has no repo:repositoryId")?;
    let asset_path = repository
        .get("repo:path")
        .and_then(Value::as_str)
        .context("repositoryMetadata has no repo:path")?;

    let host = ctx.aem.asset_host(repository_id);
    let asset = ctx.aem.get_asset_data(manager.credentials(), &host, asset_path).await?;
    debug!("AEM asset data for {}: {}", asset_path, asset);

    let events = asset_sync_events(&asset, asset_path);
    if events.is_empty() {
        warn!("Asset {} is not flagged for sync", asset_path);
    }

    let count = events.len();
    for mut event in events {
        manager.publish_event(&mut event).await?;
    }
    Ok(count)
}

/// One asset-sync event per customer listed in the asset's metadata, when the
/// asset asks to be synced on change. `fallback_path` stands in for a missing
/// `cq:parentPath`.
pub fn asset_sync_events(asset: &Value, fallback_path: &str) -> Vec<IoEvent> {
    let Some(metadata) = asset.pointer("/jcr:content/metadata").filter(|m| m.is_object()) else {
        return Vec::new();
    };
    if metadata.get("a2b__synch_on_change").and_then(Value::as_str) != Some("true") {
        return Vec::new();
    }
    let Some(customers) = metadata.get("a2d__customers").and_then(Value::as_str) else {
        return Vec::new();
    };

    // previously synced assets go out as updates
    let kind = if metadata.get("a2d__last_sync").map_or(false, is_truthy) {
        IoEventKind::AssetSyncUpdated
    } else {
        IoEventKind::AssetSyncNew
    };
    let asset_path = asset
        .pointer("/jcr:content/cq:parentPath")
        .cloned()
        .unwrap_or_else(|| json!(fallback_path));

    customers
        .split(',')
        .map(str::trim)
        .filter(|customer| !customer.is_empty())
        .filter_map(|customer| {
            let mut data = Map::new();
            data.insert("brandId".to_string(), json!(customer));
            if let Some(uuid) = asset.get("jcr:uuid") {
                data.insert("asset_id".to_string(), uuid.clone());
            }
            data.insert("asset_path".to_string(), asset_path.clone());
            data.insert("metadata".to_string(), metadata.clone());
            IoEvent::asset_sync(kind, Value::Object(data)).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(metadata: Value) -> Value {
        json!({
            "jcr:uuid": "uuid-1",
            "jcr:primaryType": "dam:Asset",
            "jcr:content": {
                "cq:parentPath": "/content/dam/brand",
                "metadata": metadata,
            }
        })
    }

    #[test]
    fn one_event_per_customer() {
        let asset = asset(json!({
            "a2b__synch_on_change": "true",
            "a2d__customers": "brand-a, brand-b",
        }));
        let events = asset_sync_events(&asset, "/content/dam/brand/logo.png");
        assert_eq!(events.len(), 2);

        let brands: Vec<&str> = events.iter().filter_map(|e| e.brand_id.as_deref()).collect();
        assert_eq!(brands, vec!["brand-a", "brand-b"]);
        for event in &events {
            assert_eq!(event.kind, IoEventKind::AssetSyncNew);
            assert_eq!(event.data["asset_id"], "uuid-1");
            assert_eq!(event.data["asset_path"], "/content/dam/brand");
            assert_eq!(event.data["metadata"]["a2d__customers"], "brand-a, brand-b");
            assert!(event.validate().is_ok());
        }
    }

    #[test]
    fn previously_synced_assets_are_updates() {
        let asset = asset(json!({
            "a2b__synch_on_change": "true",
            "a2d__customers": "brand-a",
            "a2d__last_sync": "2024-05-01T10:00:00Z",
        }));
        let events = asset_sync_events(&asset, "/x");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, IoEventKind::AssetSyncUpdated);
    }

    #[test]
    fn unflagged_assets_produce_nothing() {
        let off = asset(json!({ "a2b__synch_on_change": "false", "a2d__customers": "brand-a" }));
        assert!(asset_sync_events(&off, "/x").is_empty());

        let no_customers = asset(json!({ "a2b__synch_on_change": "true" }));
        assert!(asset_sync_events(&no_customers, "/x").is_empty());

        assert!(asset_sync_events(&json!({ "jcr:uuid": "u" }), "/x").is_empty());
    }

    #[test]
    fn missing_parent_path_uses_fallback() {
        let asset = json!({
            "jcr:uuid": "uuid-2",
            "jcr:content": { "metadata": { "a2b__synch_on_change": "true", "a2d__customers": "b" } }
        });
        let events = asset_sync_events(&asset, "/content/dam/fallback.png");
        assert_eq!(events[0].data["asset_path"], "/content/dam/fallback.png");
    }
}
