use anyhow::Result;
use common::{Brand, IoEvent};
use log::{debug, error, info};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use uuid::Uuid;

use super::{require_inputs, text_param, ActionContext, ActionResponse};
use crate::params::{string_parameters, Params};

const SECRET_LENGTH: usize = 32;

/// Registers a new agency brand. Brands start disabled.
pub async fn handle(ctx: &ActionContext, params: Params) -> ActionResponse {
    debug!("new-brand-registration params: {}", string_parameters(&params));
    if let Some(response) = require_inputs(&params, &["name", "endPointUrl"]) {
        return response;
    }

    let brand = Brand::new(
        Uuid::new_v4().to_string(),
        generate_secret(),
        text_param(&params, "name"),
        text_param(&params, "endPointUrl"),
    );

    let saved = match ctx.brands.save_brand(brand).await {
        Ok(saved) => saved,
        Err(e) => {
            error!("Error saving brand: {:#}", e);
            return ActionResponse::error(500, "Error saving brand");
        }
    };
    info!("Saved brand {} ({})", saved.bid, saved.name);

    // the brand stays registered even if the event cannot be sent
    if let Err(e) = publish_registration(ctx, &params, &saved).await {
        error!("Error sending event: {:#}", e);
        return ActionResponse::error(500, "Error handling event");
    }

    ActionResponse::ok(json!({
        "message": format!("Brand registration processed successfully for brand id {}", saved.bid),
        "brand": saved,
    }))
}

async fn publish_registration(ctx: &ActionContext, params: &Params, brand: &Brand) -> Result<()> {
    let manager = ctx.event_manager(params)?;
    let mut event = IoEvent::new_brand_registration(brand)?;
    manager.publish_event(&mut event).await
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_32_alphanumerics() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, generate_secret());
    }
}
