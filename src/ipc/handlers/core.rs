use super::{respond, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, _req: &Request) -> HandlerResult {
    let principal = state.session.principal();
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "apiBaseUrl": state.config.api_base_url,
        "debounceMs": state.config.debounce_ms,
        "authenticated": principal.is_some(),
        "role": principal.map(|p| p.role),
        "droppedStaleLoads": state.dropped_stale_loads,
        "skippedLoads": state.loader.skipped(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(respond(req, handle_health(state, req))),
        _ => None,
    }
}
