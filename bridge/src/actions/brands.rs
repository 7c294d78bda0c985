use anyhow::Result;
use chrono::Utc;
use common::{Brand, IoEvent};
use log::{error, info};
use serde_json::json;

use super::{require_inputs, text_param, ActionContext, ActionResponse};
use crate::brand_manager::is_valid_bid;
use crate::params::Params;

pub async fn get_brands(ctx: &ActionContext) -> ActionResponse {
    match ctx.brands.get_all_brands().await {
        Ok(brands) => ActionResponse::ok(json!({ "brands": brands })),
        Err(e) => {
            error!("Error listing brands: {:#}", e);
            ActionResponse::error(500, "Error listing brands")
        }
    }
}

pub async fn get_brand(ctx: &ActionContext, params: Params) -> ActionResponse {
    match load_brand(ctx, &params).await {
        Ok(brand) => ActionResponse::ok(json!({ "brand": brand })),
        Err(response) => response,
    }
}

/// Enables or disables a brand and announces the change. A brand already in
/// the requested state is returned as-is.
pub async fn set_enabled(ctx: &ActionContext, params: Params, enabled: bool) -> ActionResponse {
    let mut brand = match load_brand(ctx, &params).await {
        Ok(brand) => brand,
        Err(response) => return response,
    };
    let verb = if enabled { "enabled" } else { "disabled" };

    if brand.enabled == enabled {
        info!("Brand {} already {}", brand.bid, verb);
        return ActionResponse::ok(json!({
            "message": format!("Brand {} already {}", brand.bid, verb),
            "brand": brand,
        }));
    }

    if enabled {
        brand.enable(Utc::now());
    } else {
        brand.disable(Utc::now());
    }
    let saved = match ctx.brands.save_brand(brand).await {
        Ok(saved) => saved,
        Err(e) => {
            error!("Error saving brand: {:#}", e);
            return ActionResponse::error(500, "Error saving brand");
        }
    };
    info!("Brand {} {}", saved.bid, verb);

    if let Err(e) = publish_state_change(ctx, &params, &saved).await {
        error!("Error sending event: {:#}", e);
        return ActionResponse::error(500, "Error handling event");
    }

    ActionResponse::ok(json!({
        "message": format!("Brand {} {}", saved.bid, verb),
        "brand": saved,
    }))
}

pub async fn delete_brand(ctx: &ActionContext, params: Params) -> ActionResponse {
    let brand = match load_brand(ctx, &params).await {
        Ok(brand) => brand,
        Err(response) => return response,
    };
    if let Err(e) = ctx.brands.delete_brand(&brand.bid).await {
        error!("Error deleting brand {}: {:#}", brand.bid, e);
        return ActionResponse::error(500, "Error deleting brand");
    }
    info!("Brand {} deleted", brand.bid);
    ActionResponse::ok(json!({ "message": format!("Brand {} deleted", brand.bid) }))
}

async fn load_brand(ctx: &ActionContext, params: &Params) -> Result<Brand, ActionResponse> {
    if let Some(response) = require_inputs(params, &["bid"]) {
        return Err(response);
    }
    let bid = text_param(params, "bid");
    if !is_valid_bid(&bid) {
        return Err(ActionResponse::error(400, &format!("Invalid brand id {}", bid)));
    }
    match ctx.brands.find_brand(&bid).await {
        Ok(Some(brand)) => Ok(brand),
        Ok(None) => Err(ActionResponse::error(404, &format!("Brand not found for bid {}", bid))),
        Err(e) => {
            error!("Error reading brand {}: {:#}", bid, e);
            Err(ActionResponse::error(500, "Error reading brand"))
        }
    }
}

async fn publish_state_change(ctx: &ActionContext, params: &Params, brand: &Brand) -> Result<()> {
    let manager = ctx.event_manager(params)?;
    let mut event = if brand.enabled {
        IoEvent::brand_enabled(brand)?
    } else {
        IoEvent::brand_disabled(brand)?
    };
    manager.publish_event(&mut event).await
}
