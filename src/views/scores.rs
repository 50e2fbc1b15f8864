use super::gate::{FilterGate, Ticket};
use super::{LoadJob, ViewError};
use crate::api::transport::Payload;
use crate::api::types::{
    AcademicContext, Id, Role, SchoolClass, ScorePayload, ScoreRecord, Student, Subject, Term,
};
use crate::api::PortalClient;
use crate::grading::{parse_score_input, Aggregate, Completion, ScoreComponents, ScoreField};
use crate::notify::Notifier;
use serde::Serialize;
use std::collections::BTreeMap;

pub const WRONG_SUBJECT: &str =
    "This score does not belong to the selected subject. Please select the correct subject first.";

/// Saved scores per student, keyed by term, for the selected subject only.
pub type ScoreMap = BTreeMap<Id, BTreeMap<Term, ScoreRecord>>;

#[derive(Debug, Clone)]
pub struct ScoresLoad {
    pub ticket: Ticket,
    pub class_id: Id,
    pub subject_id: Id,
}

#[derive(Debug)]
pub struct ScoresLoaded {
    pub ticket: Ticket,
    pub class_id: Id,
    pub subject_id: Id,
    pub roster: Result<Vec<Student>, crate::api::ApiError>,
    pub scores: ScoreMap,
}

impl ScoresLoad {
    /// Roster first, then each student's scores. A failed score fetch only
    /// leaves that student without scores.
    pub fn run(self, client: &PortalClient) -> ScoresLoaded {
        let ScoresLoad {
            ticket,
            class_id,
            subject_id,
        } = self;
        let roster = client.roster(&class_id, &subject_id);
        let mut scores = ScoreMap::new();
        if let Ok(students) = &roster {
            for student in students {
                if !ticket.is_current() {
                    break;
                }
                match client.student_scores(&student.id, &class_id, &subject_id) {
                    Ok(records) => {
                        let by_term: BTreeMap<Term, ScoreRecord> = records
                            .into_iter()
                            .filter(|r| r.subject_matches(&subject_id))
                            .map(|r| (r.term, r))
                            .collect();
                        if !by_term.is_empty() {
                            scores.insert(student.id.clone(), by_term);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(student = %student.id, "score fetch failed: {e}");
                    }
                }
            }
        }
        ScoresLoaded {
            ticket,
            class_id,
            subject_id,
            roster,
            scores,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreForm {
    pub student_id: Option<Id>,
    pub term: Term,
    pub components: ScoreComponents,
    pub remark: String,
    /// Id of the saved score being edited; locks student and term.
    pub editing: Option<Id>,
}

impl ScoreForm {
    fn blank(term: Term) -> Self {
        ScoreForm {
            student_id: None,
            term,
            components: ScoreComponents::default(),
            remark: String::new(),
            editing: None,
        }
    }

    fn load(&mut self, student_id: Id, record: &ScoreRecord) {
        self.student_id = Some(student_id);
        self.term = record.term;
        self.components = record.components();
        self.remark = record.remark.clone().unwrap_or_default();
        self.editing = Some(record.id.clone());
    }
}

#[derive(Debug, Default)]
pub struct ScoreView {
    role: Option<Role>,
    classes: Vec<SchoolClass>,
    subjects: Vec<Subject>,
    context: AcademicContext,
    class_id: Option<Id>,
    subject_id: Option<Id>,
    roster: Vec<Student>,
    scores: ScoreMap,
    search: String,
    pending: Option<(Id, Id)>,
    form: Option<ScoreForm>,
    gate: FilterGate,
}

impl ScoreView {
    pub fn new() -> Self {
        Self::default()
    }

    fn default_term(&self) -> Term {
        self.context.current_term().unwrap_or(Term::First)
    }

    fn reset_selection(&mut self) {
        self.gate.advance();
        self.class_id = None;
        self.subject_id = None;
        self.clear_loaded();
    }

    fn clear_loaded(&mut self) {
        self.roster.clear();
        self.scores.clear();
        self.search.clear();
        self.pending = None;
        self.form = None;
    }

    /// Loads what the current role may score. Teachers see their assigned
    /// classes with subjects deduplicated across them; admins see everything.
    pub fn open(&mut self, client: &PortalClient, notifier: &dyn Notifier) -> Result<(), ViewError> {
        self.reset_selection();
        self.role = client.session().role();
        match self.role {
            Some(Role::Teacher) => {
                let classes = client.score_assignments().map_err(|e| {
                    notifier.error("Failed to load teacher assignments".to_string());
                    ViewError::Api(e)
                })?;
                let mut subjects: Vec<Subject> = Vec::new();
                for class in &classes {
                    for subject in &class.subjects {
                        if !subjects.iter().any(|s| s.id == subject.id) {
                            subjects.push(subject.clone());
                        }
                    }
                }
                self.classes = classes;
                self.subjects = subjects;
            }
            _ => {
                let loaded = client.classes().and_then(|c| Ok((c, client.subjects()?)));
                let (classes, subjects) = loaded.map_err(|e| {
                    notifier.error("Failed to load classes and subjects".to_string());
                    ViewError::Api(e)
                })?;
                self.classes = classes;
                self.subjects = subjects;
            }
        }
        self.context = client.current_academic_context().unwrap_or_else(|e| {
            tracing::warn!("academic context unavailable: {e}");
            AcademicContext::default()
        });
        Ok(())
    }

    /// Subjects offered for the selected class. Teachers only see the ones
    /// they are assigned in that class.
    pub fn subject_options(&self) -> Vec<Subject> {
        if self.role == Some(Role::Teacher) {
            if let Some(class) = self.selected_class() {
                return class.subjects.clone();
            }
        }
        self.subjects.clone()
    }

    fn selected_class(&self) -> Option<&SchoolClass> {
        let id = self.class_id.as_ref()?;
        self.classes.iter().find(|c| &c.id == id)
    }

    pub fn select_class(&mut self, class_id: Id) -> Result<(), ViewError> {
        if !self.classes.is_empty() && !self.classes.iter().any(|c| c.id == class_id) {
            return Err(ViewError::validation(format!("Unknown class {class_id}")));
        }
        self.reset_selection();
        self.class_id = Some(class_id);
        Ok(())
    }

    pub fn select_subject(&mut self, subject_id: Id) -> Result<Option<LoadJob>, ViewError> {
        let Some(class_id) = self.class_id.clone() else {
            return Err(ViewError::validation("Please select a class first"));
        };
        let options = self.subject_options();
        if !options.is_empty() && !options.iter().any(|s| s.id == subject_id) {
            return Err(ViewError::validation(format!(
                "Subject {subject_id} is not offered for this class"
            )));
        }
        if self.subject_id.as_ref() == Some(&subject_id)
            && self.pending.as_ref() == Some(&(class_id.clone(), subject_id.clone()))
        {
            return Ok(None);
        }
        self.subject_id = Some(subject_id);
        self.clear_loaded();
        Ok(self.issue_load())
    }

    /// Reloads roster and scores for the current selection.
    pub fn refresh(&mut self) -> Option<LoadJob> {
        if self.pending.is_some() {
            return None;
        }
        self.issue_load()
    }

    fn issue_load(&mut self) -> Option<LoadJob> {
        let class_id = self.class_id.clone()?;
        let subject_id = self.subject_id.clone()?;
        let ticket = self.gate.advance();
        self.pending = Some((class_id.clone(), subject_id.clone()));
        Some(LoadJob::Scores(ScoresLoad {
            ticket,
            class_id,
            subject_id,
        }))
    }

    /// Applies a finished load. Returns false when the load was superseded.
    pub fn apply(&mut self, loaded: ScoresLoaded, notifier: &dyn Notifier) -> bool {
        let matches_selection = self.class_id.as_ref() == Some(&loaded.class_id)
            && self.subject_id.as_ref() == Some(&loaded.subject_id);
        if !self.gate.is_current(&loaded.ticket) || !matches_selection {
            tracing::debug!(
                generation = loaded.ticket.generation(),
                current = self.gate.current(),
                "dropping stale scores load"
            );
            return false;
        }
        self.pending = None;
        match loaded.roster {
            Ok(roster) => {
                self.roster = roster;
                self.scores = loaded.scores;
            }
            Err(e) => {
                tracing::warn!("roster load failed: {e}");
                notifier.error("Failed to load students for the selected class and subject".to_string());
                self.roster.clear();
                self.scores.clear();
            }
        }
        true
    }

    pub fn search(&mut self, needle: &str) {
        self.search = needle.trim().to_string();
    }

    fn find_student(&self, id: &Id) -> Option<&Student> {
        self.roster.iter().find(|s| &s.id == id)
    }

    fn saved(&self, student: &Id, term: Term) -> Option<&ScoreRecord> {
        self.scores.get(student).and_then(|m| m.get(&term))
    }

    /// A new form, switching to edit mode when a score is already saved for
    /// the student and term.
    pub fn form_open(&mut self, student_id: Option<Id>, term: Option<Term>) -> Result<(), ViewError> {
        if self.class_id.is_none() || self.subject_id.is_none() {
            return Err(ViewError::validation("Please select a class and subject first"));
        }
        if let Some(id) = &student_id {
            if self.find_student(id).is_none() {
                return Err(ViewError::validation(format!("Student {id} is not on this roster")));
            }
        }
        let mut form = ScoreForm::blank(term.unwrap_or_else(|| self.default_term()));
        form.student_id = student_id;
        self.form = Some(form);
        self.sync_existing();
        Ok(())
    }

    pub fn form_edit(&mut self, student_id: Id, score_id: Id) -> Result<(), ViewError> {
        let record = self
            .scores
            .get(&student_id)
            .and_then(|m| m.values().find(|r| r.id == score_id))
            .cloned()
            .ok_or_else(|| ViewError::validation(WRONG_SUBJECT))?;
        let mut form = ScoreForm::blank(record.term);
        form.load(student_id, &record);
        self.form = Some(form);
        Ok(())
    }

    fn form_mut(&mut self) -> Result<&mut ScoreForm, ViewError> {
        self.form
            .as_mut()
            .ok_or_else(|| ViewError::validation("No score form is open"))
    }

    /// `value` is the raw text of the input box.
    pub fn form_set(&mut self, field: &str, value: &str) -> Result<(), ViewError> {
        let form = self.form_mut()?;
        if field == "remark" {
            form.remark = value.to_string();
            return Ok(());
        }
        let field: ScoreField = field.parse().map_err(ViewError::Validation)?;
        let parsed = parse_score_input(field, value).map_err(|e| ViewError::validation(e.to_string()))?;
        form.components.set(field, parsed);
        Ok(())
    }

    pub fn form_select_student(&mut self, student_id: Id) -> Result<(), ViewError> {
        if self.find_student(&student_id).is_none() {
            return Err(ViewError::validation(format!(
                "Student {student_id} is not on this roster"
            )));
        }
        let form = self.form_mut()?;
        if form.editing.is_some() {
            return Err(ViewError::Locked(
                "Cannot change the student of an existing score".to_string(),
            ));
        }
        form.student_id = Some(student_id);
        self.sync_existing();
        Ok(())
    }

    pub fn form_set_term(&mut self, term: Term) -> Result<(), ViewError> {
        let form = self.form_mut()?;
        if form.editing.is_some() {
            return Err(ViewError::Locked(
                "Cannot change the term of an existing score".to_string(),
            ));
        }
        form.term = term;
        self.sync_existing();
        Ok(())
    }

    /// Switches a new form into edit mode when its (student, term) already
    /// has a saved score.
    fn sync_existing(&mut self) {
        let Some(form) = &self.form else { return };
        if form.editing.is_some() {
            return;
        }
        let Some(student) = form.student_id.clone() else {
            return;
        };
        if let Some(record) = self.saved(&student, form.term).cloned() {
            if let Some(form) = self.form.as_mut() {
                form.load(student, &record);
            }
        }
    }

    pub fn form_close(&mut self) {
        self.form = None;
    }

    /// Validates and persists the open form. On failure the draft stays.
    pub fn save(&mut self, client: &PortalClient, notifier: &dyn Notifier) -> Result<Option<LoadJob>, ViewError> {
        let (Some(class_id), Some(subject_id)) = (self.class_id.clone(), self.subject_id.clone()) else {
            return Err(self.reject(notifier, "Please select a class and subject first"));
        };
        let Some(form) = self.form.clone() else {
            return Err(self.reject(notifier, "No score form is open"));
        };
        let Some(student_id) = form.student_id.clone() else {
            return Err(self.reject(notifier, "Please select a student"));
        };
        let Aggregate { total, grade } = match form.components.aggregate() {
            Ok(a) => a,
            Err(rejection) => return Err(self.reject(notifier, &rejection.to_string())),
        };
        let remark = match form.remark.trim() {
            "" => grade.remark().to_string(),
            r => r.to_string(),
        };
        let payload = ScorePayload {
            student_id,
            subject_id,
            class_id,
            term: form.term,
            first_ca: form.components.first_ca,
            second_ca: form.components.second_ca,
            exam_score: form.components.exam_score,
            total_score: total,
            grade,
            remark,
        };

        let (result, done) = match &form.editing {
            Some(id) => (client.update_score(id, &payload), "Score updated successfully"),
            None => (client.create_score(&payload), "Score saved successfully"),
        };
        match result {
            Ok(_) => {
                notifier.success(done.to_string());
                self.form = None;
                self.pending = None;
                Ok(self.issue_load())
            }
            Err(e) => {
                notifier.error(e.user_message("Failed to save score"));
                Err(ViewError::Api(e))
            }
        }
    }

    fn reject(&self, notifier: &dyn Notifier, message: &str) -> ViewError {
        notifier.error(message.to_string());
        ViewError::validation(message)
    }

    pub fn delete(&mut self, client: &PortalClient, notifier: &dyn Notifier, score_id: Id) -> Result<Option<LoadJob>, ViewError> {
        let known = self
            .scores
            .values()
            .flat_map(|m| m.values())
            .any(|r| r.id == score_id);
        if !known {
            return Err(ViewError::validation(WRONG_SUBJECT));
        }
        match client.delete_score(&score_id) {
            Ok(msg) => {
                notifier.success(msg.unwrap_or_else(|| "Score deleted successfully".to_string()));
                if self
                    .form
                    .as_ref()
                    .is_some_and(|f| f.editing.as_ref() == Some(&score_id))
                {
                    self.form = None;
                }
                self.pending = None;
                Ok(self.issue_load())
            }
            Err(e) => {
                notifier.error(e.user_message("Failed to delete score"));
                Err(ViewError::Api(e))
            }
        }
    }

    /// Export for the given class and term, defaulting to the selection.
    pub fn export(
        &self,
        client: &PortalClient,
        notifier: &dyn Notifier,
        class_id: Option<Id>,
        term: Option<Term>,
    ) -> Result<Payload, ViewError> {
        let class_id = class_id.or_else(|| self.class_id.clone());
        let term = term.or_else(|| self.form.as_ref().map(|f| f.term));
        match client.export_scores(class_id.as_ref(), term) {
            Ok(p) => {
                notifier.success("Scores exported successfully".to_string());
                Ok(p)
            }
            Err(e) => {
                notifier.error(e.user_message("Failed to export scores"));
                Err(ViewError::Api(e))
            }
        }
    }

    pub fn template(&self, client: &PortalClient, notifier: &dyn Notifier) -> Result<Payload, ViewError> {
        let (Some(class_id), Some(subject_id)) = (&self.class_id, &self.subject_id) else {
            return Err(self.reject(
                notifier,
                "Please select a class and subject first before downloading the template",
            ));
        };
        match client.score_template(class_id, subject_id) {
            Ok(p) => {
                notifier.success("Template downloaded successfully".to_string());
                Ok(p)
            }
            Err(e) => {
                notifier.error(e.user_message("Failed to download template"));
                Err(ViewError::Api(e))
            }
        }
    }

    /// Uploads a filled template for the selected class and subject after
    /// confirming the combination has students.
    pub fn import(
        &mut self,
        client: &PortalClient,
        notifier: &dyn Notifier,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(crate::api::types::ImportSummary, Option<LoadJob>), ViewError> {
        let Some(class_id) = self.class_id.clone() else {
            return Err(self.reject(notifier, "Please select a class first"));
        };
        let Some(subject_id) = self.subject_id.clone() else {
            return Err(self.reject(notifier, "Please select a subject first"));
        };
        match client.roster(&class_id, &subject_id) {
            Ok(students) if students.is_empty() => {
                return Err(self.reject(
                    notifier,
                    "No students found in the selected class and subject combination. Please verify your selection.",
                ));
            }
            Ok(_) => {}
            Err(e) => {
                notifier.error("Failed to validate class and subject. Please check your selection.".to_string());
                return Err(ViewError::Api(e));
            }
        }
        match client.import_scores(file_name, bytes, &class_id, &subject_id) {
            Ok(summary) => {
                notifier.success(format!(
                    "Import completed: {} successful, {} errors",
                    summary.success_count, summary.error_count
                ));
                self.pending = None;
                Ok((summary, self.issue_load()))
            }
            Err(e) => {
                notifier.error(e.user_message("Failed to import scores"));
                Err(ViewError::Api(e))
            }
        }
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        let rows = self
            .roster
            .iter()
            .filter(|s| s.matches_search(&self.search))
            .map(|s| {
                let scores = self.scores.get(&s.id).cloned().unwrap_or_default();
                let completion = Term::ALL
                    .iter()
                    .map(|t| {
                        let done = scores
                            .get(t)
                            .map_or(Completion::NotStarted, |r| r.components().completion());
                        (*t, done)
                    })
                    .collect();
                ScoreRow {
                    student: s.clone(),
                    scores,
                    completion,
                }
            })
            .collect();
        ScoreSnapshot {
            classes: self.classes.clone(),
            subjects: self.subject_options(),
            session: self.context.session.as_ref().map(|s| s.name.clone()),
            default_term: self.default_term(),
            class_id: self.class_id.clone(),
            subject_id: self.subject_id.clone(),
            loading: self.pending.is_some(),
            search: self.search.clone(),
            rows,
            form: self.form.as_ref().map(|f| FormSnapshot {
                student_id: f.student_id.clone(),
                term: f.term,
                first_ca: f.components.first_ca,
                second_ca: f.components.second_ca,
                exam_score: f.components.exam_score,
                remark: f.remark.clone(),
                editing: f.editing.clone(),
                preview: f.components.preview(),
                error: f.components.aggregate().err().map(|e| e.to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRow {
    pub student: Student,
    pub scores: BTreeMap<Term, ScoreRecord>,
    /// Entry progress for every term, recorded or not.
    pub completion: BTreeMap<Term, Completion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub student_id: Option<Id>,
    pub term: Term,
    pub first_ca: Option<f64>,
    pub second_ca: Option<f64>,
    pub exam_score: Option<f64>,
    pub remark: String,
    pub editing: Option<Id>,
    pub preview: Aggregate,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSnapshot {
    pub classes: Vec<SchoolClass>,
    pub subjects: Vec<Subject>,
    pub session: Option<String>,
    pub default_term: Term,
    pub class_id: Option<Id>,
    pub subject_id: Option<Id>,
    pub loading: bool,
    pub search: String,
    pub rows: Vec<ScoreRow>,
    pub form: Option<FormSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeTransport;
    use crate::api::transport::{Body, Method};
    use crate::api::ApiError;
    use crate::notify::{Level, Outbox};
    use crate::session::{AuthSession, Principal, SessionHandle};
    use crate::views::Loaded;
    use serde_json::json;
    use std::sync::Arc;

    fn teacher_client(fake: &Arc<FakeTransport>) -> PortalClient {
        let session = SessionHandle::new();
        session.set(AuthSession {
            token: "t".into(),
            principal: Principal {
                id: Id::from("77"),
                display_name: "Mr Ade".into(),
                role: Role::Teacher,
            },
        });
        PortalClient::new(fake.clone(), session)
    }

    fn seed(fake: &FakeTransport) {
        fake.on(
            Method::Get,
            "/teacher/score-assignments",
            json!({ "data": [
                { "id": 1, "name": "JSS1", "subjects": [{ "id": 10, "name": "Maths" }, { "id": 11, "name": "English" }] },
                { "id": 2, "name": "JSS2", "subjects": [{ "id": 10, "name": "Maths" }] }
            ] }),
        );
        fake.on(
            Method::Get,
            "/academic-sessions/current",
            json!({ "session": { "id": 4, "name": "2024/2025" }, "term": { "name": "second" } }),
        );
        fake.on(
            Method::Get,
            "/classes/1/subjects/10/students",
            json!([{ "id": 100, "first_name": "Ada", "last_name": "Obi" },
                   { "id": 101, "first_name": "Bayo", "last_name": "Ojo" }]),
        );
        fake.on(
            Method::Get,
            "/students/100/scores",
            json!([{ "id": 500, "subject_id": 10, "term": "second", "first_ca": 15, "second_ca": 12, "exam_score": 50 },
                   { "id": 501, "subject_id": 11, "term": "second", "exam_score": 30 }]),
        );
        fake.on(Method::Get, "/students/101/scores", json!([]));
        fake.on(
            Method::Get,
            "/classes/2/subjects/10/students",
            json!([{ "id": 200, "first_name": "Chi", "last_name": "Eze" }]),
        );
        fake.on(Method::Get, "/students/200/scores", json!([]));
    }

    fn run(job: Option<LoadJob>, client: &PortalClient) -> ScoresLoaded {
        match job.expect("job").run(client) {
            Loaded::Scores(l) => l,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn ready(fake: &Arc<FakeTransport>, outbox: &Outbox) -> (PortalClient, ScoreView) {
        seed(fake);
        let client = teacher_client(fake);
        let mut view = ScoreView::new();
        view.open(&client, outbox).expect("open");
        view.select_class(Id::from("1")).expect("class");
        let job = view.select_subject(Id::from("10")).expect("subject");
        let loaded = run(job, &client);
        assert!(view.apply(loaded, outbox));
        (client, view)
    }

    #[test]
    fn teacher_subjects_are_deduplicated_and_term_defaults_to_current() {
        let fake = FakeTransport::new();
        seed(&fake);
        let client = teacher_client(&fake);
        let outbox = Outbox::new();
        let mut view = ScoreView::new();
        view.open(&client, &outbox).expect("open");
        let snap = view.snapshot();
        assert_eq!(snap.classes.len(), 2);
        assert_eq!(snap.subjects.len(), 2);
        assert_eq!(snap.default_term, Term::Second);

        view.select_class(Id::from("2")).expect("class");
        assert_eq!(view.subject_options().len(), 1);
        assert!(view.select_subject(Id::from("11")).is_err());
    }

    #[test]
    fn scores_are_filtered_to_the_selected_subject_and_keyed_by_term() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (_client, view) = ready(&fake, &outbox);
        let snap = view.snapshot();
        assert_eq!(snap.rows.len(), 2);
        let ada = &snap.rows[0].scores;
        assert_eq!(ada.len(), 1);
        assert_eq!(ada[&Term::Second].id, Id::from("500"));
        assert!(snap.rows[1].scores.is_empty());
    }

    #[test]
    fn rows_report_entry_progress_per_term() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (_client, view) = ready(&fake, &outbox);
        let snap = view.snapshot();
        let ada = &snap.rows[0].completion;
        assert_eq!(ada[&Term::First], Completion::NotStarted);
        assert_eq!(ada[&Term::Second], Completion::Complete);
        assert_eq!(snap.rows[1].completion.len(), 3);
        assert!(snap.rows[1].completion.values().all(|c| *c == Completion::NotStarted));
    }

    #[test]
    fn an_unreadable_record_does_not_hide_the_students_other_scores() {
        let fake = FakeTransport::new();
        seed(&fake);
        fake.on(
            Method::Get,
            "/students/100/scores",
            json!([{ "id": 500, "subject_id": 10, "term": "first", "exam_score": 50 },
                   { "id": 501, "subject_id": 99, "term": null }]),
        );
        let client = teacher_client(&fake);
        let outbox = Outbox::new();
        let mut view = ScoreView::new();
        view.open(&client, &outbox).expect("open");
        view.select_class(Id::from("1")).expect("class");
        let job = view.select_subject(Id::from("10")).expect("subject");
        assert!(view.apply(run(job, &client), &outbox));

        let ada = &view.snapshot().rows[0].scores;
        assert_eq!(ada.len(), 1);
        assert_eq!(ada[&Term::First].id, Id::from("500"));
    }

    #[test]
    fn switching_class_drops_the_in_flight_load() {
        let fake = FakeTransport::new();
        seed(&fake);
        let client = teacher_client(&fake);
        let outbox = Outbox::new();
        let mut view = ScoreView::new();
        view.open(&client, &outbox).expect("open");

        view.select_class(Id::from("1")).expect("class 1");
        let first = view.select_subject(Id::from("10")).expect("subject");
        view.select_class(Id::from("2")).expect("class 2");
        let second = view.select_subject(Id::from("10")).expect("subject");

        // The JSS2 load lands first, then the stale JSS1 one.
        let second = run(second, &client);
        let first = run(first, &client);
        assert!(view.apply(second, &outbox));
        assert!(!view.apply(first, &outbox));

        let snap = view.snapshot();
        assert_eq!(snap.class_id, Some(Id::from("2")));
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.rows[0].student.first_name, "Chi");
    }

    #[test]
    fn same_selection_in_flight_is_not_reissued() {
        let fake = FakeTransport::new();
        seed(&fake);
        let client = teacher_client(&fake);
        let outbox = Outbox::new();
        let mut view = ScoreView::new();
        view.open(&client, &outbox).expect("open");
        view.select_class(Id::from("1")).expect("class");
        assert!(view.select_subject(Id::from("10")).expect("subject").is_some());
        assert!(view.select_subject(Id::from("10")).expect("again").is_none());
        assert!(view.refresh().is_none());
    }

    #[test]
    fn over_limit_total_is_rejected_without_calling_the_backend() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = ready(&fake, &outbox);
        view.form_open(Some(Id::from("101")), Some(Term::First)).expect("form");
        view.form_set("first_ca", "30").expect("first");
        view.form_set("second_ca", "30").expect("second");
        view.form_set("exam_score", "41").expect("exam");

        let err = view.save(&client, &outbox).unwrap_err();
        assert_eq!(err.code(), "validation_failed");
        assert!(err.to_string().contains("cannot exceed 100"));
        assert!(fake.calls_to(Method::Post, "/scores").is_empty());
        assert!(view.snapshot().form.is_some());
        let notices = outbox.drain();
        assert_eq!(notices.last().map(|n| n.level), Some(Level::Error));
    }

    #[test]
    fn save_sends_derived_total_grade_and_remark() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = ready(&fake, &outbox);
        fake.on(Method::Post, "/scores", json!({ "message": "created" }));
        view.form_open(Some(Id::from("101")), Some(Term::First)).expect("form");
        view.form_set("firstCa", "10").expect("first");
        view.form_set("exam_score", "69").expect("exam");

        let job = view.save(&client, &outbox).expect("save");
        assert!(job.is_some());
        assert!(view.snapshot().form.is_none());
        let call = &fake.calls_to(Method::Post, "/scores")[0];
        let Body::Json(body) = &call.body else {
            panic!("expected json body");
        };
        assert_eq!(body["total_score"], json!(79.0));
        assert_eq!(body["grade"], json!("B"));
        assert_eq!(body["remark"], json!("Very Good"));
        assert_eq!(body["second_ca"], json!(null));
        assert_eq!(body["term"], json!("first"));
        assert_eq!(outbox.drain().last().map(|n| n.message.clone()).as_deref(), Some("Score saved successfully"));
    }

    #[test]
    fn editing_locks_student_and_term() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = ready(&fake, &outbox);
        // Opening Ada's current term finds the saved score.
        view.form_open(Some(Id::from("100")), Some(Term::Second)).expect("form");
        let form = view.snapshot().form.expect("form");
        assert_eq!(form.editing, Some(Id::from("500")));
        assert_eq!(form.preview.total, 77.0);

        assert_eq!(view.form_set_term(Term::First).unwrap_err().code(), "locked");
        assert_eq!(
            view.form_select_student(Id::from("101")).unwrap_err().code(),
            "locked"
        );

        fake.on(Method::Put, "/scores/500", json!({}));
        view.form_set("exam_score", "60").expect("exam");
        view.save(&client, &outbox).expect("save");
        let call = &fake.calls_to(Method::Put, "/scores/500")[0];
        let Body::Json(body) = &call.body else {
            panic!("expected json body");
        };
        assert_eq!(body["student_id"], json!("100"));
        assert_eq!(body["term"], json!("second"));
        assert_eq!(body["grade"], json!("A"));
    }

    #[test]
    fn scores_from_another_subject_cannot_be_edited() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (_client, mut view) = ready(&fake, &outbox);
        let err = view.form_edit(Id::from("100"), Id::from("501")).unwrap_err();
        assert_eq!(err.to_string(), WRONG_SUBJECT);
        view.form_edit(Id::from("100"), Id::from("500")).expect("own subject");
    }

    #[test]
    fn failed_save_keeps_the_draft_and_surfaces_server_message() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = ready(&fake, &outbox);
        fake.fail(
            Method::Post,
            "/scores",
            ApiError::Server {
                status: 500,
                message: Some("Score already exists for this term".into()),
            },
        );
        view.form_open(Some(Id::from("101")), Some(Term::Third)).expect("form");
        view.form_set("exam_score", "40").expect("exam");
        outbox.drain();
        assert_eq!(view.save(&client, &outbox).unwrap_err().code(), "server_error");
        let form = view.snapshot().form.expect("draft kept");
        assert_eq!(form.exam_score, Some(40.0));
        assert_eq!(outbox.drain()[0].message, "Score already exists for this term");
    }

    #[test]
    fn roster_failure_notifies_and_empties() {
        let fake = FakeTransport::new();
        seed(&fake);
        fake.fail(
            Method::Get,
            "/classes/1/subjects/10/students",
            ApiError::Network("refused".into()),
        );
        let client = teacher_client(&fake);
        let outbox = Outbox::new();
        let mut view = ScoreView::new();
        view.open(&client, &outbox).expect("open");
        view.select_class(Id::from("1")).expect("class");
        let loaded = run(view.select_subject(Id::from("10")).expect("subject"), &client);
        assert!(view.apply(loaded, &outbox));
        assert!(view.snapshot().rows.is_empty());
        assert_eq!(
            outbox.drain()[0].message,
            "Failed to load students for the selected class and subject"
        );
    }

    #[test]
    fn import_requires_students_in_the_selection() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = ready(&fake, &outbox);
        fake.on(
            Method::Post,
            "/teacher/scores/import",
            json!({ "success_count": 2, "error_count": 0, "errors": [] }),
        );
        let (summary, job) = view
            .import(&client, &outbox, "jss1.xlsx", b"bytes".to_vec())
            .expect("import");
        assert_eq!(summary.success_count, 2);
        assert!(job.is_some());
        assert_eq!(
            outbox.drain().last().map(|n| n.message.clone()).as_deref(),
            Some("Import completed: 2 successful, 0 errors")
        );

        fake.on(Method::Get, "/classes/1/subjects/10/students", json!([]));
        let err = view
            .import(&client, &outbox, "jss1.xlsx", b"bytes".to_vec())
            .unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }

    #[test]
    fn search_filters_rows() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (_client, mut view) = ready(&fake, &outbox);
        view.search("OJO");
        let snap = view.snapshot();
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.rows[0].student.first_name, "Bayo");
    }
}
