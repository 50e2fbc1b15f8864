use super::{
    get_opt_id, get_opt_str, get_opt_term, get_required_id, get_required_str, respond, to_json,
    HandlerErr, HandlerResult,
};
use crate::api::transport::Payload;
use crate::ipc::types::{AppState, Request};
use crate::views::LoadJob;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Queues the view's load, if any, and answers with its snapshot.
fn view_result(state: &mut AppState, job: Option<LoadJob>) -> HandlerResult {
    state.loader.schedule_opt(job);
    Ok(to_json(&state.scores.snapshot()))
}

fn write_payload(out_path: &str, payload: &Payload) -> HandlerResult {
    let out = PathBuf::from(out_path);
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            return Err(io_failed(format!("directory does not exist: {}", parent.display()), out_path));
        }
    }
    std::fs::write(&out, &payload.bytes).map_err(|e| io_failed(e.to_string(), out_path))?;
    Ok(json!({
        "path": out_path,
        "bytes": payload.bytes.len(),
        "contentType": payload.content_type,
    }))
}

fn io_failed(message: String, path: &str) -> HandlerErr {
    HandlerErr {
        code: "io_failed",
        message,
        details: Some(json!({ "path": path })),
    }
}

fn handle_open(state: &mut AppState, _req: &Request) -> HandlerResult {
    state.scores.open(&state.client, state.notifier.as_ref())?;
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_select_class(state: &mut AppState, req: &Request) -> HandlerResult {
    let class_id = get_required_id(&req.params, "classId")?;
    state.scores.select_class(class_id)?;
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_select_subject(state: &mut AppState, req: &Request) -> HandlerResult {
    let subject_id = get_required_id(&req.params, "subjectId")?;
    let job = state.scores.select_subject(subject_id)?;
    view_result(state, job)
}

fn handle_refresh(state: &mut AppState, _req: &Request) -> HandlerResult {
    let job = state.scores.refresh();
    view_result(state, job)
}

fn handle_search(state: &mut AppState, req: &Request) -> HandlerResult {
    let needle = req
        .params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    state.scores.search(needle);
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_form_open(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = get_opt_id(&req.params, "studentId");
    let term = get_opt_term(&req.params, "term")?;
    state.scores.form_open(student_id, term)?;
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_form_edit(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = get_required_id(&req.params, "studentId")?;
    let score_id = get_required_id(&req.params, "scoreId")?;
    if let Err(e) = state.scores.form_edit(student_id, score_id) {
        state.notifier.error(e.to_string());
        return Err(e.into());
    }
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_form_set(state: &mut AppState, req: &Request) -> HandlerResult {
    let field = get_required_str(&req.params, "field")?;
    let value = match req.params.get("value") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        None | Some(serde_json::Value::Null) => String::new(),
        Some(_) => return Err(HandlerErr::bad_params("value must be a string or number")),
    };
    state.scores.form_set(&field, &value)?;
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_form_select_student(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = get_required_id(&req.params, "studentId")?;
    state.scores.form_select_student(student_id)?;
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_form_set_term(state: &mut AppState, req: &Request) -> HandlerResult {
    let term = get_opt_term(&req.params, "term")?.ok_or_else(|| HandlerErr::bad_params("missing term"))?;
    state.scores.form_set_term(term)?;
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_form_close(state: &mut AppState, _req: &Request) -> HandlerResult {
    state.scores.form_close();
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_save(state: &mut AppState, _req: &Request) -> HandlerResult {
    let job = state.scores.save(&state.client, state.notifier.as_ref())?;
    view_result(state, job)
}

fn handle_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let score_id = get_required_id(&req.params, "scoreId")?;
    let job = state
        .scores
        .delete(&state.client, state.notifier.as_ref(), score_id)?;
    view_result(state, job)
}

fn handle_snapshot(state: &mut AppState, _req: &Request) -> HandlerResult {
    Ok(to_json(&state.scores.snapshot()))
}

fn handle_export(state: &mut AppState, req: &Request) -> HandlerResult {
    let out_path = get_required_str(&req.params, "outPath")?;
    let class_id = get_opt_id(&req.params, "classId");
    let term = get_opt_term(&req.params, "term")?;
    let payload = state
        .scores
        .export(&state.client, state.notifier.as_ref(), class_id, term)?;
    write_payload(&out_path, &payload)
}

fn handle_template(state: &mut AppState, req: &Request) -> HandlerResult {
    let out_path = get_required_str(&req.params, "outPath")?;
    let payload = state.scores.template(&state.client, state.notifier.as_ref())?;
    write_payload(&out_path, &payload)
}

fn handle_import(state: &mut AppState, req: &Request) -> HandlerResult {
    let in_path = get_required_str(&req.params, "inPath")?;
    let bytes = std::fs::read(&in_path).map_err(|e| io_failed(e.to_string(), &in_path))?;
    let file_name = get_opt_str(&req.params, "fileName").unwrap_or_else(|| {
        Path::new(&in_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scores.xlsx".to_string())
    });
    let (summary, job) = state
        .scores
        .import(&state.client, state.notifier.as_ref(), &file_name, bytes)?;
    let loading = state.loader.schedule_opt(job);
    Ok(json!({ "summary": summary, "loading": loading }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "scores.open" => handle_open(state, req),
        "scores.selectClass" => handle_select_class(state, req),
        "scores.selectSubject" => handle_select_subject(state, req),
        "scores.refresh" => handle_refresh(state, req),
        "scores.search" => handle_search(state, req),
        "scores.formOpen" => handle_form_open(state, req),
        "scores.formEdit" => handle_form_edit(state, req),
        "scores.formSet" => handle_form_set(state, req),
        "scores.formSelectStudent" => handle_form_select_student(state, req),
        "scores.formSetTerm" => handle_form_set_term(state, req),
        "scores.formClose" => handle_form_close(state, req),
        "scores.save" => handle_save(state, req),
        "scores.delete" => handle_delete(state, req),
        "scores.snapshot" => handle_snapshot(state, req),
        "scores.export" => handle_export(state, req),
        "scores.template" => handle_template(state, req),
        "scores.import" => handle_import(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
