use super::error::{err, event};
use super::handlers;
use super::types::{AppState, Request};
use crate::session::{check_access, Denied};
use crate::views::Loaded;
use serde_json::json;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let span = tracing::debug_span!("request", id = %req.id, method = %req.method);
    let _enter = span.enter();

    if let Err(denied) = check_access(&req.method, state.session.role()) {
        tracing::debug!(code = denied.code(), "request refused");
        let details = match denied {
            Denied::AlreadyAuthenticated(role) => Some(json!({ "landingRoute": role.landing_route() })),
            Denied::NotAuthenticated | Denied::Forbidden(_) => None,
        };
        return err(&req.id, denied.code(), denied.message(), details);
    }

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::session::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::admin::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::teacher::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::scores::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::student::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

/// Applies a finished background load. Returns the event to emit, or
/// `None` when the load was superseded.
pub fn apply_loaded(state: &mut AppState, loaded: Loaded) -> Option<serde_json::Value> {
    let generation = loaded.generation();
    let kind = loaded.kind();
    let applied = match loaded {
        Loaded::Scores(l) => state
            .scores
            .apply(l, state.notifier.as_ref())
            .then(|| event("scores.loaded", handlers::to_json(&state.scores.snapshot()))),
        Loaded::Attendance(l) => state
            .attendance
            .apply(l, state.notifier.as_ref())
            .then(|| event("attendance.loaded", handlers::to_json(&state.attendance.snapshot()))),
    };
    if applied.is_none() {
        state.dropped_stale_loads += 1;
        tracing::info!(kind, generation, "dropped stale load");
    }
    applied
}
