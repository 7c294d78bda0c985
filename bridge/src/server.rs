use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info, warn};
use serde_json::{json, Value};

use crate::actions::{dispatch, Action, ActionContext, ActionResponse};
use crate::params::{Params, OW_HEADERS, OW_METHOD};

#[derive(Clone)]
struct AppState {
    ctx: Arc<ActionContext>,
    started_at: Instant,
}

pub fn router(ctx: ActionContext) -> Router {
    let state = AppState {
        ctx: Arc::new(ctx),
        started_at: Instant::now(),
    };
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/web/{package}/{action}", get(handle_action).post(handle_action))
        .with_state(state)
}

/// Binds `addr` and serves in the background; returns the bound address.
pub async fn start_server(ctx: ActionContext, addr: &str) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let local_addr = listener.local_addr()?;
    let app = router(ctx);

    info!("HTTP server listening on {}", local_addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });
    Ok(local_addr)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "package": state.ctx.config.server.package,
    }))
}

async fn handle_action(
    State(state): State<AppState>,
    Path((package, action_name)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let ctx = &state.ctx;
    if package != ctx.config.server.package {
        warn!("Unknown package: {}", package);
        return reply(ActionResponse::error(404, &format!("package {} not found", package)));
    }
    let Some(action) = Action::from_name(&action_name) else {
        warn!("Unknown action: {}/{}", package, action_name);
        return reply(ActionResponse::error(404, &format!("action {} not found", action_name)));
    };

    let params = match build_params(&ctx.config.inputs, query, &method, &headers, &body) {
        Ok(params) => params,
        Err(response) => return reply(response),
    };

    info!("{} {}/{}", method, package, action.name());
    reply(dispatch(ctx, action, params).await)
}

fn reply(response: ActionResponse) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body))
}

/// Configured inputs, then the query string, then the JSON body, each
/// overriding the last.
fn build_params(
    inputs: &BTreeMap<String, String>,
    query: HashMap<String, String>,
    method: &Method,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Params, ActionResponse> {
    let mut params: Params = inputs
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();

    for (key, value) in query {
        params.insert(key, Value::String(value));
    }

    if !body.iter().all(u8::is_ascii_whitespace) {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => params.extend(fields),
            _ => {
                return Err(ActionResponse::error(400, "Invalid JSON: Input must be a valid JSON object"));
            }
        }
    }

    let header_map: Params = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), Value::String(v.to_string())))
        })
        .collect();
    params.insert(OW_HEADERS.to_string(), Value::Object(header_map));
    params.insert(OW_METHOD.to_string(), Value::String(method.as_str().to_lowercase()));

    Ok(params)
}
