use super::{fetch, parse_params, reject, report, respond, to_json, HandlerErr, HandlerResult};
use crate::api::types::{PasswordChange, Role};
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::json;

/// Params shared by both password-change methods.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordParams {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub new_password_confirmation: String,
}

impl PasswordParams {
    pub fn check(&self, min_len: usize) -> Result<PasswordChange, String> {
        if self.current_password.is_empty() || self.new_password.is_empty() {
            return Err("Please fill in all password fields".to_string());
        }
        if self.new_password != self.new_password_confirmation {
            return Err("New passwords do not match".to_string());
        }
        if self.new_password.chars().count() < min_len {
            return Err(format!("New password must be at least {min_len} characters long"));
        }
        Ok(PasswordChange {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
            new_password_confirmation: self.new_password_confirmation.clone(),
        })
    }
}

fn handle_dashboard(state: &mut AppState, _req: &Request) -> HandlerResult {
    let dashboard = fetch(state, state.client.dashboard(Role::Teacher), "Failed to load dashboard")?;
    // Form-teacher classes are a side panel; the dashboard stands without them.
    let form_classes = match state.client.form_teacher_classes() {
        Ok(classes) => to_json(&classes),
        Err(e) => {
            tracing::warn!("form classes unavailable: {e}");
            json!([])
        }
    };
    Ok(json!({ "dashboard": dashboard, "formClasses": form_classes }))
}

fn handle_form_classes(state: &mut AppState, _req: &Request) -> HandlerResult {
    let classes = fetch(state, state.client.form_teacher_classes(), "Failed to load form classes")?;
    Ok(json!({ "classes": classes }))
}

fn handle_students(state: &mut AppState, _req: &Request) -> HandlerResult {
    let students = fetch(state, state.client.teacher_students(), "Failed to load students")?;
    Ok(json!({ "students": students }))
}

fn handle_profile_get(state: &mut AppState, _req: &Request) -> HandlerResult {
    fetch(state, state.client.profile(), "Failed to load profile")
}

fn handle_profile_update(state: &mut AppState, req: &Request) -> HandlerResult {
    if !req.params.is_object() {
        return Err(HandlerErr::bad_params("params must be an object"));
    }
    if req
        .params
        .get("name")
        .is_some_and(|n| n.as_str().map_or(true, |s| s.trim().is_empty()))
    {
        return Err(reject(state, "Name cannot be empty"));
    }
    let profile = report(
        state,
        state.client.update_profile(req.params.clone()),
        "Profile updated successfully",
        "Failed to update profile",
    )?;
    Ok(json!({ "profile": profile }))
}

fn handle_change_password(state: &mut AppState, req: &Request) -> HandlerResult {
    let p: PasswordParams = parse_params(&req.params)?;
    let change = p.check(6).map_err(|msg| reject(state, &msg))?;
    report(
        state,
        state.client.change_password(&change),
        "Password changed successfully",
        "Failed to change password",
    )?;
    Ok(json!({ "changed": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "teacher.dashboard" => handle_dashboard(state, req),
        "teacher.formClasses" => handle_form_classes(state, req),
        "teacher.students" => handle_students(state, req),
        "profile.get" => handle_profile_get(state, req),
        "profile.update" => handle_profile_update(state, req),
        "profile.changePassword" => handle_change_password(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
