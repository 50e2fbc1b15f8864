use super::{
    fetch, get_opt_id, get_opt_str, get_required_id, message_or, parse_params, reject, report,
    respond, to_json, HandlerErr, HandlerResult,
};
use crate::api::types::{AssignmentInput, ClassInput, Id, Role, SubjectInput, UserInput};
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::json;

/// `local@domain.tld`, loosely.
pub(crate) fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn non_empty(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Client-side rules for staff accounts. Admins need every field; teachers
/// need a name and username.
pub(crate) fn check_user(input: &UserInput, creating: bool) -> Result<(), &'static str> {
    let name_ok = !input.name.trim().is_empty();
    if creating {
        match input.role {
            Role::Teacher if !name_ok || !non_empty(&input.username) => {
                return Err("Please fill in all required fields (Name and Username)");
            }
            Role::Admin
                if !name_ok
                    || !non_empty(&input.email)
                    || !non_empty(&input.username)
                    || !non_empty(&input.password) =>
            {
                return Err("Please fill in all required fields");
            }
            Role::Student => return Err("Students are not managed as users"),
            _ => {}
        }
    } else if !name_ok {
        return Err("Please fill in all required fields");
    }
    if input.password.as_deref().is_some_and(|p| p.chars().count() < 6) {
        return Err("Password must be at least 6 characters long");
    }
    if input.email.as_deref().is_some_and(|e| !is_valid_email(e)) {
        return Err("Please enter a valid email address");
    }
    Ok(())
}

fn handle_dashboard(state: &mut AppState, _req: &Request) -> HandlerResult {
    fetch(state, state.client.dashboard(Role::Admin), "Failed to load dashboard")
}

fn handle_classes_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let classes = fetch(state, state.client.classes(), "Failed to fetch classes")?;
    Ok(json!({ "classes": classes }))
}

fn class_input(state: &AppState, req: &Request) -> Result<ClassInput, HandlerErr> {
    let input: ClassInput = parse_params(&req.params)?;
    if input.name.trim().is_empty() {
        return Err(reject(state, "Please fill in all required fields"));
    }
    Ok(input)
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let input = class_input(state, req)?;
    let created = report(
        state,
        state.client.create_class(&input),
        "Class added successfully",
        "Failed to add class",
    )?;
    Ok(json!({ "class": created }))
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = get_required_id(&req.params, "id")?;
    let input = class_input(state, req)?;
    let updated = report(
        state,
        state.client.update_class(&id, &input),
        "Class updated successfully",
        "Failed to update class",
    )?;
    Ok(json!({ "class": updated }))
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = get_required_id(&req.params, "id")?;
    let msg = report(
        state,
        state.client.delete_class(&id),
        "Class deleted successfully",
        "Failed to delete class",
    )?;
    Ok(json!({ "message": message_or(msg, "Class deleted successfully") }))
}

fn handle_subjects_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let subjects = fetch(state, state.client.subjects(), "Failed to fetch subjects")?;
    Ok(json!({ "subjects": subjects }))
}

fn subject_input(state: &AppState, req: &Request) -> Result<SubjectInput, HandlerErr> {
    let input: SubjectInput = parse_params(&req.params)?;
    if input.name.trim().is_empty() {
        return Err(reject(state, "Please fill in all required fields"));
    }
    Ok(input)
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let input = subject_input(state, req)?;
    let created = report(
        state,
        state.client.create_subject(&input),
        "Subject added successfully",
        "Failed to add subject",
    )?;
    Ok(json!({ "subject": created }))
}

fn handle_subjects_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = get_required_id(&req.params, "id")?;
    let input = subject_input(state, req)?;
    let updated = report(
        state,
        state.client.update_subject(&id, &input),
        "Subject updated successfully",
        "Failed to update subject",
    )?;
    Ok(json!({ "subject": updated }))
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = get_required_id(&req.params, "id")?;
    let msg = report(
        state,
        state.client.delete_subject(&id),
        "Subject deleted successfully",
        "Failed to delete subject",
    )?;
    Ok(json!({ "message": message_or(msg, "Subject deleted successfully") }))
}

fn handle_users_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let role: Option<Role> = match get_opt_str(&req.params, "role") {
        Some(r) => Some(
            serde_json::from_value(json!(r)).map_err(|e| HandlerErr::bad_params(format!("role: {e}")))?,
        ),
        None => None,
    };
    let users = fetch(state, state.client.users(), "Failed to fetch users")?;
    let users: Vec<_> = users
        .into_iter()
        .filter(|u| role.map_or(true, |r| u.role == r))
        .collect();
    Ok(json!({ "users": users }))
}

fn user_label(role: Role) -> &'static str {
    match role {
        Role::Admin => "Admin",
        Role::Teacher => "Teacher",
        Role::Student => "Student",
    }
}

fn handle_users_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let input: UserInput = parse_params(&req.params)?;
    if let Err(msg) = check_user(&input, true) {
        return Err(reject(state, msg));
    }
    let label = user_label(input.role);
    let created = report(
        state,
        state.client.create_user(&input),
        &format!("{label} added successfully"),
        &format!("Failed to add {}", label.to_lowercase()),
    )?;
    Ok(json!({ "user": created }))
}

fn handle_users_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = get_required_id(&req.params, "id")?;
    let input: UserInput = parse_params(&req.params)?;
    if let Err(msg) = check_user(&input, false) {
        return Err(reject(state, msg));
    }
    let label = user_label(input.role);
    let updated = report(
        state,
        state.client.update_user(&id, &input),
        &format!("{label} updated successfully"),
        &format!("Failed to update {}", label.to_lowercase()),
    )?;
    Ok(json!({ "user": updated }))
}

fn handle_users_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = get_required_id(&req.params, "id")?;
    let force = req
        .params
        .get("force")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let done = if force {
        "User permanently deleted successfully"
    } else {
        "User deleted successfully"
    };
    let msg = report(
        state,
        state.client.delete_user(&id, force),
        done,
        "Failed to delete user",
    )?;
    Ok(json!({ "message": message_or(msg, done) }))
}

fn handle_assignments_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let assignments = fetch(
        state,
        state.client.teacher_assignments(),
        "Failed to fetch teacher assignments",
    )?;
    Ok(json!({ "assignments": assignments }))
}

fn assignment_from(params: &serde_json::Value) -> Result<AssignmentInput, HandlerErr> {
    let need = |key: &str| {
        get_opt_id(params, key).ok_or_else(|| HandlerErr::validation("Please select a teacher, class and subject"))
    };
    Ok(AssignmentInput {
        teacher_id: need("teacherId")?,
        class_id: need("classId")?,
        subject_id: need("subjectId")?,
    })
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let input = assignment_from(&req.params)?;
    let msg = report(
        state,
        state.client.assign_teacher(&input),
        "Teacher assigned successfully",
        "Failed to assign teacher",
    )?;
    Ok(json!({ "message": message_or(msg, "Teacher assigned successfully") }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewTeacher {
    #[serde(flatten)]
    user: UserInput,
    #[serde(default)]
    class_ids: Vec<Id>,
    #[serde(default)]
    subject_ids: Vec<Id>,
}

fn created_id(v: &serde_json::Value) -> Option<Id> {
    let candidates = [
        v.get("id"),
        v.get("user").and_then(|u| u.get("id")),
        v.get("data").and_then(|d| d.get("id")),
        v.get("data").and_then(|d| d.get("user")).and_then(|u| u.get("id")),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|id| serde_json::from_value::<Id>(id.clone()).ok())
}

/// Creates a teacher, then assigns every selected (class, subject) pair.
/// Assignment failures are reported but the teacher is kept.
fn handle_teachers_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let mut params = if req.params.is_object() {
        req.params.clone()
    } else {
        json!({})
    };
    params["role"] = json!(Role::Teacher);
    let input: NewTeacher = parse_params(&params)?;
    if let Err(msg) = check_user(&input.user, true) {
        return Err(reject(state, msg));
    }
    let created = match state.client.create_user(&input.user) {
        Ok(v) => v,
        Err(e) => {
            state.notifier.error(e.user_message("Failed to add teacher"));
            return Err(e.into());
        }
    };
    let pairs: Vec<(Id, Id)> = input
        .class_ids
        .iter()
        .flat_map(|c| input.subject_ids.iter().map(move |s| (c.clone(), s.clone())))
        .collect();
    if pairs.is_empty() {
        state.notifier.success("Teacher added successfully".to_string());
        return Ok(json!({ "user": created, "assigned": 0, "failedAssignments": [] }));
    }
    let Some(teacher_id) = created_id(&created) else {
        state
            .notifier
            .error("Teacher created but could not extract teacher ID for assignments".to_string());
        return Ok(json!({ "user": created, "assigned": 0, "failedAssignments": [] }));
    };

    let mut assigned = 0usize;
    let mut failed = Vec::new();
    for (class_id, subject_id) in pairs {
        let a = AssignmentInput {
            teacher_id: teacher_id.clone(),
            class_id,
            subject_id,
        };
        match state.client.assign_teacher(&a) {
            Ok(_) => assigned += 1,
            Err(e) => {
                tracing::warn!(class = %a.class_id, subject = %a.subject_id, "assignment failed: {e}");
                failed.push(json!({
                    "classId": a.class_id,
                    "subjectId": a.subject_id,
                    "message": e.user_message(&e.to_string()),
                }));
            }
        }
    }
    if let Some(first) = failed.first() {
        let reason = first["message"].as_str().unwrap_or("request failed");
        state.notifier.error(format!(
            "Teacher created successfully, but assignments failed: {reason}. You can assign classes and subjects manually later."
        ));
    } else {
        state
            .notifier
            .success("Teacher added and assigned successfully".to_string());
    }
    Ok(json!({ "user": created, "assigned": assigned, "failedAssignments": failed }))
}

fn handle_student_get(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = get_required_id(&req.params, "id")?;
    let student = fetch(state, state.client.student(&id), "Failed to load student details")?;
    Ok(to_json(&student))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "admin.dashboard" => handle_dashboard(state, req),
        "admin.classes.list" => handle_classes_list(state, req),
        "admin.classes.create" => handle_classes_create(state, req),
        "admin.classes.update" => handle_classes_update(state, req),
        "admin.classes.delete" => handle_classes_delete(state, req),
        "admin.subjects.list" => handle_subjects_list(state, req),
        "admin.subjects.create" => handle_subjects_create(state, req),
        "admin.subjects.update" => handle_subjects_update(state, req),
        "admin.subjects.delete" => handle_subjects_delete(state, req),
        "admin.users.list" => handle_users_list(state, req),
        "admin.users.create" => handle_users_create(state, req),
        "admin.users.update" => handle_users_update(state, req),
        "admin.users.delete" => handle_users_delete(state, req),
        "admin.assignments.list" => handle_assignments_list(state, req),
        "admin.assignments.create" => handle_assignments_create(state, req),
        "admin.teachers.create" => handle_teachers_create(state, req),
        "admin.students.get" => handle_student_get(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
