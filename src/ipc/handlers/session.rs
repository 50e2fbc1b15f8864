use super::{get_opt_str, get_required_str, message_or, parse_params, respond, HandlerErr, HandlerResult};
use crate::api::types::{Id, Role};
use crate::api::ApiError;
use crate::ipc::types::{AppState, Request};
use crate::session::{AuthSession, Principal};
use serde::Deserialize;
use serde_json::json;

const RATE_LIMITED: &str = "Too many login attempts. Please wait before trying again.";

fn login_failure(e: &ApiError, fallback: &str) -> String {
    match e {
        ApiError::RateLimited { .. } => e.user_message(RATE_LIMITED),
        _ => e.user_message(fallback),
    }
}

fn session_json(s: &AuthSession) -> serde_json::Value {
    json!({
        "token": s.token,
        "principal": s.principal,
        "landingRoute": s.principal.role.landing_route(),
    })
}

fn credentials(state: &AppState, req: &Request, keys: &[&str], missing: &str) -> Result<(String, String), HandlerErr> {
    let login = keys.iter().find_map(|k| get_opt_str(&req.params, k));
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    match login {
        Some(login) if !password.is_empty() => Ok((login, password)),
        _ => {
            state.notifier.error(missing.to_string());
            Err(HandlerErr::validation(missing))
        }
    }
}

fn handle_login(state: &mut AppState, req: &Request) -> HandlerResult {
    let (login, password) = credentials(
        state,
        req,
        &["login", "username", "email"],
        "Please enter your username and password",
    )?;
    match state.client.login(&login, &password) {
        Ok(s) => {
            state.reset_views();
            state
                .notifier
                .success(format!("Welcome back, {}!", s.principal.display_name));
            Ok(session_json(&s))
        }
        Err(e) => {
            state
                .notifier
                .error(login_failure(&e, "Login failed. Please check your credentials."));
            Err(e.into())
        }
    }
}

fn handle_student_login(state: &mut AppState, req: &Request) -> HandlerResult {
    let (admission_number, password) = credentials(
        state,
        req,
        &["admissionNumber", "admission_number"],
        "Please enter your admission number and password",
    )?;
    match state.client.student_login(&admission_number, &password) {
        Ok(s) => {
            state.reset_views();
            state
                .notifier
                .success(format!("Welcome back, {}!", s.principal.display_name));
            Ok(session_json(&s))
        }
        Err(e) => {
            state.notifier.error(login_failure(
                &e,
                "Invalid admission number or password. Please try again.",
            ));
            Err(e.into())
        }
    }
}

fn handle_logout(state: &mut AppState, _req: &Request) -> HandlerResult {
    let result = state.client.logout();
    state.reset_views();
    if let Err(e) = result {
        tracing::warn!("server logout failed: {e}");
    }
    Ok(json!({ "authenticated": false }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestoreParams {
    token: String,
    role: Role,
    id: Id,
    #[serde(default)]
    display_name: Option<String>,
}

/// Re-installs a session the shell kept across restarts.
fn handle_restore(state: &mut AppState, req: &Request) -> HandlerResult {
    let p: RestoreParams = parse_params(&req.params)?;
    if p.token.trim().is_empty() {
        return Err(HandlerErr::bad_params("missing token"));
    }
    let session = AuthSession {
        token: p.token.trim().to_string(),
        principal: Principal {
            id: p.id,
            display_name: p.display_name.unwrap_or_else(|| "User".to_string()),
            role: p.role,
        },
    };
    state.reset_views();
    state.session.set(session.clone());
    Ok(session_json(&session))
}

fn handle_current(state: &mut AppState, _req: &Request) -> HandlerResult {
    let principal = state.session.principal();
    Ok(json!({
        "authenticated": principal.is_some(),
        "landingRoute": principal.as_ref().map(|p| p.role.landing_route()),
        "principal": principal,
    }))
}

/// Staff cannot work without a current session and term; a failed check
/// counts as "not set".
fn handle_academic_current(state: &mut AppState, _req: &Request) -> HandlerResult {
    let staff = matches!(state.session.role(), Some(Role::Admin | Role::Teacher));
    let ctx = match state.client.current_academic_context() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            tracing::warn!("academic session check failed: {e}");
            None
        }
    };
    let configured = ctx.as_ref().is_some_and(|c| c.is_configured());
    Ok(json!({
        "session": ctx.as_ref().and_then(|c| c.session.clone()),
        "term": ctx.as_ref().and_then(|c| c.term.clone()),
        "configured": configured,
        "needsSetup": staff && !configured,
    }))
}

fn handle_password_verify(state: &mut AppState, req: &Request) -> HandlerResult {
    let identifier = get_opt_str(&req.params, "identifier").ok_or_else(|| {
        HandlerErr::validation("Please enter your admission number or email")
    })?;
    match state.client.verify_student_identity(&identifier) {
        Ok(student) => {
            state
                .notifier
                .success("Identity verified. Please set your new password.".to_string());
            Ok(json!({ "student": student }))
        }
        Err(e) => {
            state.notifier.error(e.user_message(
                "Student not found. Please check your admission number or email.",
            ));
            Err(e.into())
        }
    }
}

fn handle_password_reset(state: &mut AppState, req: &Request) -> HandlerResult {
    let identifier = get_required_str(&req.params, "identifier")?;
    let password = get_required_str(&req.params, "password")?;
    let confirmation = get_required_str(&req.params, "passwordConfirmation")?;
    let rule = if password != confirmation {
        Some("Passwords do not match. Please try again.")
    } else if password.chars().count() < 6 {
        Some("Password must be at least 6 characters long.")
    } else {
        None
    };
    if let Some(msg) = rule {
        state.notifier.error(msg.to_string());
        return Err(HandlerErr::validation(msg));
    }
    match state
        .client
        .reset_student_password(&identifier, &password, &confirmation)
    {
        Ok(msg) => {
            let msg = message_or(
                msg,
                "Password reset successfully! You can now login with your new password.",
            );
            state.notifier.success(msg.clone());
            Ok(json!({ "message": msg }))
        }
        Err(e) => {
            state
                .notifier
                .error(e.user_message("Failed to reset password. Please try again."));
            Err(e.into())
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "session.login" => handle_login(state, req),
        "session.studentLogin" => handle_student_login(state, req),
        "session.logout" => handle_logout(state, req),
        "session.restore" => handle_restore(state, req),
        "session.current" => handle_current(state, req),
        "academic.current" => handle_academic_current(state, req),
        "password.verify" => handle_password_verify(state, req),
        "password.reset" => handle_password_reset(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_prefers_server_message() {
        let e = ApiError::RateLimited { message: None };
        assert_eq!(login_failure(&e, "Login failed."), RATE_LIMITED);
        let e = ApiError::RateLimited {
            message: Some("Try again in 60 seconds".into()),
        };
        assert_eq!(login_failure(&e, "Login failed."), "Try again in 60 seconds");
        let e = ApiError::Unauthorized { message: None };
        assert_eq!(login_failure(&e, "Login failed."), "Login failed.");
    }
}
