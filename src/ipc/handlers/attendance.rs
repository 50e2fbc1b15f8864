use super::{get_required_id, get_required_str, parse_params, respond, to_json, HandlerErr, HandlerResult};
use crate::attendance::AttendanceStatus;
use crate::ipc::types::{AppState, Request};
use crate::views::attendance::FilterPatch;
use crate::views::LoadJob;

fn view_result(state: &mut AppState, job: Option<LoadJob>) -> HandlerResult {
    state.loader.schedule_opt(job);
    Ok(to_json(&state.attendance.snapshot()))
}

fn handle_open(state: &mut AppState, _req: &Request) -> HandlerResult {
    state.attendance.open(&state.client, state.notifier.as_ref());
    Ok(to_json(&state.attendance.snapshot()))
}

fn handle_set_filter(state: &mut AppState, req: &Request) -> HandlerResult {
    let patch: FilterPatch = parse_params(&req.params)?;
    let job = state.attendance.set_filter(patch)?;
    view_result(state, job)
}

fn handle_refresh(state: &mut AppState, _req: &Request) -> HandlerResult {
    let job = state.attendance.refresh();
    view_result(state, job)
}

fn handle_set_status(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = get_required_id(&req.params, "studentId")?;
    let status: AttendanceStatus = get_required_str(&req.params, "status")?
        .parse()
        .map_err(HandlerErr::bad_params)?;
    state.attendance.set_status(&student_id, status)?;
    Ok(to_json(&state.attendance.snapshot()))
}

fn handle_set_remark(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = get_required_id(&req.params, "studentId")?;
    let remark = req
        .params
        .get("remark")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    state.attendance.set_remark(&student_id, remark)?;
    Ok(to_json(&state.attendance.snapshot()))
}

fn handle_submit(state: &mut AppState, _req: &Request) -> HandlerResult {
    let job = state.attendance.submit(&state.client, state.notifier.as_ref())?;
    view_result(state, job)
}

fn handle_snapshot(state: &mut AppState, _req: &Request) -> HandlerResult {
    Ok(to_json(&state.attendance.snapshot()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.open" => handle_open(state, req),
        "attendance.setFilter" => handle_set_filter(state, req),
        "attendance.refresh" => handle_refresh(state, req),
        "attendance.setStatus" => handle_set_status(state, req),
        "attendance.setRemark" => handle_set_remark(state, req),
        "attendance.submit" => handle_submit(state, req),
        "attendance.snapshot" => handle_snapshot(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
