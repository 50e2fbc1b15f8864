use super::teacher::PasswordParams;
use super::{fetch, get_opt_str, get_required_str, parse_params, reject, report, respond, HandlerErr, HandlerResult};
use crate::api::types::{ResultsBySession, Role, ScoreRecord, StudentResults, Term};
use crate::grading::{summarize_progress, summarize_term};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::collections::BTreeMap;

/// A session's term buckets in school-year order; unrecognized labels last.
fn ordered_terms(terms: &BTreeMap<String, Vec<ScoreRecord>>) -> Vec<(&String, &Vec<ScoreRecord>)> {
    let mut out: Vec<_> = terms.iter().collect();
    out.sort_by_key(|(label, _)| (label.parse::<Term>().ok().map_or(u8::MAX, |t| t as u8), (*label).clone()));
    out
}

fn rows(records: &[ScoreRecord]) -> Vec<(String, crate::grading::ScoreComponents)> {
    records.iter().map(|r| (r.subject_name(), r.components())).collect()
}

/// Picks the session (requested, else current, else first) and the term
/// (requested, else the first recorded) and summarizes that bucket.
pub(crate) fn results_view(reply: &StudentResults, session: Option<&str>, term: Option<&str>) -> serde_json::Value {
    let sessions: Vec<&String> = reply.results.keys().collect();
    let recorded = |s: &String| reply.results.contains_key(s);
    let selected_session = session
        .map(str::to_string)
        .filter(recorded)
        .or_else(|| reply.current_session.as_ref().map(|s| s.name.clone()).filter(recorded))
        .or_else(|| sessions.first().map(|s| (*s).clone()));

    let terms: Vec<&String> = selected_session
        .as_ref()
        .and_then(|s| reply.results.get(s))
        .map(|t| ordered_terms(t).into_iter().map(|(label, _)| label).collect())
        .unwrap_or_default();
    let wanted = term.and_then(|t| t.parse::<Term>().ok());
    let selected_term = terms
        .iter()
        .find(|label| term.is_some_and(|t| label.as_str() == t) || (wanted.is_some() && label.parse::<Term>().ok() == wanted))
        .or_else(|| terms.first())
        .map(|s| (*s).clone());

    let records = match (&selected_session, &selected_term) {
        (Some(s), Some(t)) => reply.results.get(s).and_then(|m| m.get(t)).map(Vec::as_slice).unwrap_or_default(),
        _ => &[],
    };
    json!({
        "sessions": sessions,
        "selectedSession": selected_session,
        "terms": terms,
        "selectedTerm": selected_term,
        "currentSession": reply.current_session,
        "admissionSession": reply.admission_session,
        "admissionTerm": reply.admission_term,
        "summary": summarize_term(rows(records)),
    })
}

/// Every recorded term across sessions, keyed `"{session} - {term}"`.
pub(crate) fn progress_view(results: &ResultsBySession) -> serde_json::Value {
    let terms = results.iter().flat_map(|(session, terms)| {
        ordered_terms(terms)
            .into_iter()
            .map(move |(label, records)| (format!("{session} - {label}"), rows(records)))
    });
    serde_json::to_value(summarize_progress(terms)).unwrap_or(serde_json::Value::Null)
}

fn handle_dashboard(state: &mut AppState, _req: &Request) -> HandlerResult {
    fetch(state, state.client.dashboard(Role::Student), "Failed to load dashboard")
}

fn handle_profile_get(state: &mut AppState, _req: &Request) -> HandlerResult {
    fetch(state, state.client.student_profile(), "Failed to load profile")
}

fn handle_profile_update(state: &mut AppState, req: &Request) -> HandlerResult {
    if !req.params.is_object() {
        return Err(HandlerErr::bad_params("params must be an object"));
    }
    let profile = report(
        state,
        state.client.update_student_profile(req.params.clone()),
        "Profile updated successfully",
        "Failed to update profile",
    )?;
    Ok(json!({ "profile": profile }))
}

fn handle_change_password(state: &mut AppState, req: &Request) -> HandlerResult {
    let p: PasswordParams = parse_params(&req.params)?;
    let change = p.check(8).map_err(|msg| reject(state, &msg))?;
    report(
        state,
        state.client.change_student_password(&change),
        "Password changed successfully",
        "Failed to change password",
    )?;
    Ok(json!({ "changed": true }))
}

fn handle_results(state: &mut AppState, req: &Request) -> HandlerResult {
    let reply = fetch(state, state.client.student_results(None, None), "Failed to load results")?;
    let session = get_opt_str(&req.params, "session");
    let term = get_opt_str(&req.params, "term");
    Ok(results_view(&reply, session.as_deref(), term.as_deref()))
}

fn handle_progress(state: &mut AppState, _req: &Request) -> HandlerResult {
    let reply = fetch(
        state,
        state.client.student_results(None, None),
        "Failed to load progress data",
    )?;
    Ok(progress_view(&reply.results))
}

/// Downloads the report card PDF for a term of the current session.
fn handle_report_card(state: &mut AppState, req: &Request) -> HandlerResult {
    let out_path = get_required_str(&req.params, "outPath")?;
    let Some(raw_term) = get_opt_str(&req.params, "term") else {
        return Err(reject(state, "Please select a term to download the report card"));
    };
    let term: Term = raw_term.parse().map_err(HandlerErr::bad_params)?;
    let reply = fetch(state, state.client.student_results(None, None), "Failed to load results")?;
    let Some(session) = reply.current_session else {
        return Err(reject(
            state,
            "No academic session found. Please contact the administrator.",
        ));
    };
    let payload = match state.client.report_card(&session.id, term) {
        Ok(p) => p,
        Err(e) => {
            state.notifier.error(e.user_message(
                "Failed to generate PDF report card. Please ensure you are logged in and have the required permissions.",
            ));
            return Err(e.into());
        }
    };
    std::fs::write(&out_path, &payload.bytes).map_err(|e| HandlerErr {
        code: "io_failed",
        message: e.to_string(),
        details: Some(json!({ "path": out_path })),
    })?;
    state.notifier.success("PDF downloaded successfully!".to_string());
    Ok(json!({
        "path": out_path,
        "bytes": payload.bytes.len(),
        "session": session,
        "term": term,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "student.dashboard" => handle_dashboard(state, req),
        "student.profile.get" => handle_profile_get(state, req),
        "student.profile.update" => handle_profile_update(state, req),
        "student.changePassword" => handle_change_password(state, req),
        "student.results" => handle_results(state, req),
        "student.progress" => handle_progress(state, req),
        "student.reportCard" => handle_report_card(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply() -> StudentResults {
        serde_json::from_value(json!({
            "results": {
                "2023/2024": {
                    "Third Term": [
                        { "id": 1, "term": "third", "subject": { "name": "Maths" }, "first_ca": 20, "second_ca": 20, "exam_score": 40 }
                    ]
                },
                "2024/2025": {
                    "Second Term": [
                        { "id": 2, "term": "second", "subject": "Maths", "first_ca": 10, "second_ca": 10, "exam_score": 30 },
                        { "id": 3, "term": "second", "subject": "English", "first_ca": 15, "second_ca": 15, "exam_score": 35 }
                    ],
                    "First Term": [
                        { "id": 4, "term": "first", "subject": "Maths", "first_ca": "18", "second_ca": 12, "exam_score": 49 }
                    ]
                }
            },
            "current_session": { "id": 9, "name": "2024/2025" }
        }))
        .unwrap()
    }

    #[test]
    fn results_default_to_current_session_and_first_term() {
        let v = results_view(&reply(), None, None);
        assert_eq!(v["selectedSession"], "2024/2025");
        assert_eq!(v["terms"], json!(["First Term", "Second Term"]));
        assert_eq!(v["selectedTerm"], "First Term");
        assert_eq!(v["summary"]["totalScore"], 79.0);
        assert_eq!(v["summary"]["rows"][0]["grade"], "B");
    }

    #[test]
    fn results_accept_term_codes() {
        let v = results_view(&reply(), None, Some("second"));
        assert_eq!(v["selectedTerm"], "Second Term");
        // (50 + 65) / 2
        assert_eq!(v["summary"]["averageScore"], 57.5);
        assert_eq!(v["summary"]["overallGrade"], "D");
    }

    #[test]
    fn unknown_session_falls_back() {
        let v = results_view(&reply(), Some("1999/2000"), None);
        assert_eq!(v["selectedSession"], "2024/2025");
    }

    #[test]
    fn recorded_session_is_honoured_over_current() {
        let v = results_view(&reply(), Some("2023/2024"), None);
        assert_eq!(v["selectedSession"], "2023/2024");
        assert_eq!(v["selectedTerm"], "Third Term");
    }

    #[test]
    fn progress_spans_sessions_in_order() {
        let v = progress_view(&reply().results);
        let keys: Vec<_> = v["terms"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["key"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            keys,
            ["2023/2024 - Third Term", "2024/2025 - First Term", "2024/2025 - Second Term"]
        );
        assert_eq!(v["completedAssessments"], 4);
    }
}
