use super::envelope;
use super::error::ApiError;
use super::transport::{ApiCall, Payload, Transport};
use super::types::{
    AcademicContext, AssignmentInput, AttendanceQuery, AttendanceSubmission, ClassInput, Id,
    ImportSummary, LoginReply, PasswordChange, Role, SchoolClass, ScorePayload, ScoreRecord,
    Student, StudentResults, Subject, SubjectInput, Term, User, UserInput,
};
use crate::attendance::StudentAttendance;
use crate::session::{AuthSession, SessionHandle};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// Typed facade over the portal's REST API. Cheap to clone; loader threads
/// get their own copy.
#[derive(Clone)]
pub struct PortalClient {
    transport: Arc<dyn Transport>,
    session: SessionHandle,
}

impl PortalClient {
    pub fn new(transport: Arc<dyn Transport>, session: SessionHandle) -> Self {
        PortalClient { transport, session }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn send(&self, call: ApiCall) -> Result<Payload, ApiError> {
        let token = self.session.token();
        self.transport.send(&call, token.as_deref())
    }

    fn value(&self, call: ApiCall) -> Result<Value, ApiError> {
        self.send(call)?.json()
    }

    fn list<T: DeserializeOwned>(&self, call: ApiCall) -> Result<Vec<T>, ApiError> {
        envelope::list(self.value(call)?)
    }

    fn object<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T, ApiError> {
        envelope::object(self.value(call)?)
    }

    /// For writes whose only interesting output is the server's message.
    fn message(&self, call: ApiCall) -> Result<Option<String>, ApiError> {
        Ok(envelope::message(&self.value(call)?))
    }

    // --- session ---

    fn establish(&self, call: ApiCall) -> Result<AuthSession, ApiError> {
        let reply: LoginReply = self.object(call)?;
        let session = AuthSession::from_login(reply)
            .ok_or_else(|| ApiError::Decode("login reply carried no token or principal".into()))?;
        self.session.set(session.clone());
        Ok(session)
    }

    pub fn login(&self, login: &str, password: &str) -> Result<AuthSession, ApiError> {
        self.establish(ApiCall::post(
            "/login",
            json!({ "login": login, "password": password }),
        ))
    }

    pub fn student_login(&self, admission_number: &str, password: &str) -> Result<AuthSession, ApiError> {
        self.establish(ApiCall::post(
            "/student/login",
            json!({ "admission_number": admission_number, "password": password }),
        ))
    }

    /// Always drops the local session, even when the server call fails.
    pub fn logout(&self) -> Result<(), ApiError> {
        let result = match self.session.role() {
            Some(Role::Student) => self.send(ApiCall::post("/student/logout", json!({}))),
            Some(_) => self.send(ApiCall::post("/logout", json!({}))),
            None => return Ok(()),
        };
        self.session.clear();
        result.map(|_| ())
    }

    pub fn current_academic_context(&self) -> Result<AcademicContext, ApiError> {
        self.object(ApiCall::get("/academic-sessions/current"))
    }

    pub fn verify_student_identity(&self, identifier: &str) -> Result<Value, ApiError> {
        self.object(ApiCall::post(
            "/student/forgot-password/verify",
            json!({ "identifier": identifier }),
        ))
    }

    pub fn reset_student_password(
        &self,
        identifier: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<Option<String>, ApiError> {
        self.message(ApiCall::post(
            "/student/forgot-password/reset",
            json!({
                "identifier": identifier,
                "password": password,
                "password_confirmation": confirmation,
            }),
        ))
    }

    // --- administration ---

    pub fn classes(&self) -> Result<Vec<SchoolClass>, ApiError> {
        self.list(ApiCall::get("/classes"))
    }

    pub fn create_class(&self, input: &ClassInput) -> Result<Value, ApiError> {
        self.object(ApiCall::post("/classes", to_json(input)?))
    }

    pub fn update_class(&self, id: &Id, input: &ClassInput) -> Result<Value, ApiError> {
        self.object(ApiCall::put(format!("/classes/{id}"), to_json(input)?))
    }

    pub fn delete_class(&self, id: &Id) -> Result<Option<String>, ApiError> {
        self.message(ApiCall::delete(format!("/classes/{id}")))
    }

    pub fn subjects(&self) -> Result<Vec<Subject>, ApiError> {
        self.list(ApiCall::get("/subjects"))
    }

    pub fn create_subject(&self, input: &SubjectInput) -> Result<Value, ApiError> {
        self.object(ApiCall::post("/subjects", to_json(input)?))
    }

    pub fn update_subject(&self, id: &Id, input: &SubjectInput) -> Result<Value, ApiError> {
        self.object(ApiCall::put(format!("/subjects/{id}"), to_json(input)?))
    }

    pub fn delete_subject(&self, id: &Id) -> Result<Option<String>, ApiError> {
        self.message(ApiCall::delete(format!("/subjects/{id}")))
    }

    pub fn users(&self) -> Result<Vec<User>, ApiError> {
        self.list(ApiCall::get("/users"))
    }

    pub fn create_user(&self, input: &UserInput) -> Result<Value, ApiError> {
        self.object(ApiCall::post("/users", to_json(input)?))
    }

    pub fn update_user(&self, id: &Id, input: &UserInput) -> Result<Value, ApiError> {
        self.object(ApiCall::put(format!("/users/{id}"), to_json(input)?))
    }

    /// `force` deletes permanently instead of deactivating.
    pub fn delete_user(&self, id: &Id, force: bool) -> Result<Option<String>, ApiError> {
        let call = ApiCall::delete(format!("/users/{id}")).query_opt("force", force.then_some(1));
        self.message(call)
    }

    pub fn teacher_assignments(&self) -> Result<Vec<Value>, ApiError> {
        self.list(ApiCall::get("/teacher-assignments"))
    }

    pub fn assign_teacher(&self, input: &AssignmentInput) -> Result<Option<String>, ApiError> {
        self.message(ApiCall::post("/teacher-assignments", to_json(input)?))
    }

    pub fn student(&self, id: &Id) -> Result<Value, ApiError> {
        self.object(ApiCall::get(format!("/students/{id}")))
    }

    pub fn dashboard(&self, role: Role) -> Result<Value, ApiError> {
        self.object(ApiCall::get(format!("/{}/dashboard", role.as_str())))
    }

    // --- teacher ---

    pub fn form_teacher_classes(&self) -> Result<Vec<SchoolClass>, ApiError> {
        self.list(ApiCall::get("/teacher/form-classes"))
    }

    pub fn teacher_students(&self) -> Result<Vec<Student>, ApiError> {
        self.list(ApiCall::get("/teacher/students"))
    }

    /// Classes the teacher may score, each with its assigned subjects.
    pub fn score_assignments(&self) -> Result<Vec<SchoolClass>, ApiError> {
        self.list(ApiCall::get("/teacher/score-assignments"))
    }

    pub fn profile(&self) -> Result<Value, ApiError> {
        self.object(ApiCall::get("/profile"))
    }

    pub fn update_profile(&self, fields: Value) -> Result<Value, ApiError> {
        self.object(ApiCall::put("/profile", fields))
    }

    pub fn change_password(&self, change: &PasswordChange) -> Result<Option<String>, ApiError> {
        self.message(ApiCall::post("/change-password", to_json(change)?))
    }

    // --- scores ---

    pub fn roster(&self, class_id: &Id, subject_id: &Id) -> Result<Vec<Student>, ApiError> {
        self.list(ApiCall::get(format!(
            "/classes/{class_id}/subjects/{subject_id}/students"
        )))
    }

    pub fn student_scores(
        &self,
        student_id: &Id,
        class_id: &Id,
        subject_id: &Id,
    ) -> Result<Vec<ScoreRecord>, ApiError> {
        let call = ApiCall::get(format!("/students/{student_id}/scores"))
            .query("class_id", class_id)
            .query("subject_id", subject_id);
        self.list(call)
    }

    pub fn create_score(&self, payload: &ScorePayload) -> Result<Option<String>, ApiError> {
        self.message(ApiCall::post("/scores", to_json(payload)?))
    }

    pub fn update_score(&self, id: &Id, payload: &ScorePayload) -> Result<Option<String>, ApiError> {
        self.message(ApiCall::put(format!("/scores/{id}"), to_json(payload)?))
    }

    pub fn delete_score(&self, id: &Id) -> Result<Option<String>, ApiError> {
        self.message(ApiCall::delete(format!("/scores/{id}")))
    }

    pub fn export_scores(&self, class_id: Option<&Id>, term: Option<Term>) -> Result<Payload, ApiError> {
        let call = ApiCall::get("/scores/export")
            .query_opt("class_id", class_id)
            .query_opt("term", term);
        self.send(call)
    }

    pub fn score_template(&self, class_id: &Id, subject_id: &Id) -> Result<Payload, ApiError> {
        let call = ApiCall::get("/teacher/scores/template")
            .query("class_id", class_id)
            .query("subject_id", subject_id);
        self.send(call)
    }

    pub fn import_scores(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        class_id: &Id,
        subject_id: &Id,
    ) -> Result<ImportSummary, ApiError> {
        let call = ApiCall::upload(
            "/teacher/scores/import",
            file_name,
            bytes,
            vec![
                ("class_id".to_string(), class_id.to_string()),
                ("subject_id".to_string(), subject_id.to_string()),
            ],
        );
        self.object(call)
    }

    // --- attendance ---

    pub fn attendance_classes(&self) -> Result<Vec<SchoolClass>, ApiError> {
        self.list(ApiCall::get("/teacher/attendance/classes"))
    }

    pub fn attendance_students(&self, class_id: &Id, subject_id: &Id) -> Result<Vec<Student>, ApiError> {
        let call = ApiCall::get("/teacher/attendance/students")
            .query("class_id", class_id)
            .query("subject_id", subject_id);
        self.list(call)
    }

    pub fn attendance_records(&self, query: &AttendanceQuery) -> Result<Vec<StudentAttendance>, ApiError> {
        let mut call = ApiCall::get("/teacher/attendance");
        for (k, v) in query.pairs() {
            call = call.query(&k, v);
        }
        self.list(call)
    }

    pub fn mark_attendance(&self, submission: &AttendanceSubmission) -> Result<Option<String>, ApiError> {
        self.message(ApiCall::post("/teacher/attendance", to_json(submission)?))
    }

    // --- student self-service ---

    pub fn student_profile(&self) -> Result<Value, ApiError> {
        self.object(ApiCall::get("/student/profile"))
    }

    pub fn update_student_profile(&self, fields: Value) -> Result<Value, ApiError> {
        self.object(ApiCall::put("/student/profile", fields))
    }

    pub fn change_student_password(&self, change: &PasswordChange) -> Result<Option<String>, ApiError> {
        let body = json!({
            "current_password": change.current_password,
            "new_password": change.new_password,
            "confirm_password": change.new_password_confirmation,
        });
        self.message(ApiCall::post("/student/change-password", body))
    }

    pub fn student_results(
        &self,
        session_id: Option<&Id>,
        term: Option<Term>,
    ) -> Result<StudentResults, ApiError> {
        let call = ApiCall::get("/student/results")
            .query_opt("academic_session_id", session_id)
            .query_opt("term", term);
        self.object(call)
    }

    pub fn report_card(&self, session_id: &Id, term: Term) -> Result<Payload, ApiError> {
        let call = ApiCall::get("/student/report-card")
            .query("academic_session_id", session_id)
            .query("term", term);
        self.send(call)
    }
}

fn to_json<T: serde::Serialize>(body: &T) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}
