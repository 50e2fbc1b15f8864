use super::gate::{FilterGate, Ticket};
use super::{LoadJob, ViewError};
use crate::api::types::{
    lenient, AcademicContext, AttendanceQuery, AttendanceSubmission, Id, SchoolClass, Student, Subject,
};
use crate::api::{ApiError, PortalClient};
use crate::attendance::{
    default_marks, reconcile, school_day, submission_entries, AttendanceKey, AttendanceStatus,
    CalendarDay, Mark, StudentAttendance, ALREADY_MARKED_LABEL,
};
use crate::notify::Notifier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SUBMIT_LABEL: &str = "Submit Attendance";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub class_id: Option<Id>,
    pub subject_id: Option<Id>,
    pub week: Option<u32>,
    pub day: Option<&'static str>,
    pub date: Option<NaiveDate>,
}

/// Partial filter update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPatch {
    #[serde(default)]
    pub class_id: Option<Id>,
    #[serde(default)]
    pub subject_id: Option<Id>,
    #[serde(default, deserialize_with = "lenient::u32_opt")]
    pub week: Option<u32>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AttendanceLoad {
    pub ticket: Ticket,
    pub class_id: Id,
    pub subject_id: Id,
    pub fetch_roster: bool,
    pub records: Option<(AttendanceQuery, AttendanceKey)>,
    /// Set for the refresh after a successful submit.
    pub keep_marked: bool,
}

#[derive(Debug)]
pub struct AttendanceLoaded {
    pub ticket: Ticket,
    pub roster: Option<Result<Vec<Student>, ApiError>>,
    pub records: Option<(AttendanceKey, Result<Vec<StudentAttendance>, ApiError>)>,
    pub keep_marked: bool,
}

impl AttendanceLoad {
    pub fn run(self, client: &PortalClient) -> AttendanceLoaded {
        let roster = self
            .fetch_roster
            .then(|| client.attendance_students(&self.class_id, &self.subject_id));
        let roster_failed = matches!(roster, Some(Err(_)));
        let records = match self.records {
            Some((query, key)) if self.ticket.is_current() && !roster_failed => {
                Some((key, client.attendance_records(&query)))
            }
            _ => None,
        };
        AttendanceLoaded {
            ticket: self.ticket,
            roster,
            records,
            keep_marked: self.keep_marked,
        }
    }
}

#[derive(Debug, Default)]
pub struct AttendanceView {
    classes: Vec<SchoolClass>,
    context: AcademicContext,
    filter: AttendanceFilter,
    roster: Vec<Student>,
    marks: BTreeMap<Id, Mark>,
    already_marked: bool,
    pending: Option<AttendanceFilter>,
    gate: FilterGate,
}

impl AttendanceView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the academic context and the teacher's classes and clears every
    /// draft. Neither failure is fatal.
    pub fn open(&mut self, client: &PortalClient, notifier: &dyn Notifier) {
        self.gate.advance();
        self.filter = AttendanceFilter::default();
        self.roster.clear();
        self.marks.clear();
        self.already_marked = false;
        self.pending = None;

        self.context = client.current_academic_context().unwrap_or_else(|e| {
            tracing::warn!("academic context unavailable: {e}");
            notifier.error(
                "Failed to load current academic session. Please contact admin to set the current academic session."
                    .to_string(),
            );
            AcademicContext::default()
        });
        self.classes = client.attendance_classes().unwrap_or_else(|e| {
            tracing::warn!("attendance classes unavailable: {e}");
            notifier.error("Error loading classes".to_string());
            Vec::new()
        });
    }

    fn roster_ids(&self) -> Vec<Id> {
        self.roster.iter().map(|s| s.id.clone()).collect()
    }

    fn subject_options(&self) -> Vec<Subject> {
        let Some(class_id) = &self.filter.class_id else {
            return Vec::new();
        };
        self.classes
            .iter()
            .find(|c| &c.id == class_id)
            .map(|c| c.subjects.clone())
            .unwrap_or_default()
    }

    /// Applies a filter change. Any change resets the draft and invalidates
    /// loads issued under the previous filter.
    pub fn set_filter(&mut self, patch: FilterPatch) -> Result<Option<LoadJob>, ViewError> {
        let mut next = self.filter.clone();
        if let Some(class_id) = patch.class_id {
            if !self.classes.is_empty() && !self.classes.iter().any(|c| c.id == class_id) {
                return Err(ViewError::validation(format!("Unknown class {class_id}")));
            }
            if next.class_id.as_ref() != Some(&class_id) {
                next.subject_id = None;
            }
            next.class_id = Some(class_id);
        }
        if let Some(subject_id) = patch.subject_id {
            if next.class_id.is_none() {
                return Err(ViewError::validation("Please select a class first"));
            }
            next.subject_id = Some(subject_id);
        }
        if let Some(week) = patch.week {
            if week < 1 {
                return Err(ViewError::validation("Week must be at least 1"));
            }
            next.week = Some(week);
        }
        if let Some(day) = patch.day {
            let canonical = school_day(&day)
                .ok_or_else(|| ViewError::validation(format!("Day must be Monday to Saturday, got {day}")))?;
            next.day = Some(canonical);
        }
        if let Some(date) = patch.date {
            let parsed = date
                .calendar_day()
                .ok_or_else(|| ViewError::validation(format!("Invalid date {date}")))?;
            next.date = Some(parsed);
        }

        if next == self.filter {
            return Ok(None);
        }
        let roster_changed =
            next.class_id != self.filter.class_id || next.subject_id != self.filter.subject_id;
        self.filter = next;
        if let Some(subject_id) = &self.filter.subject_id {
            let options = self.subject_options();
            if !options.is_empty() && !options.iter().any(|s| &s.id == subject_id) {
                tracing::warn!(subject = %subject_id, "subject is not among the class assignments");
            }
        }
        if roster_changed {
            self.roster.clear();
        }
        self.marks = default_marks(&self.roster_ids());
        self.already_marked = false;
        self.pending = None;
        self.gate.advance();
        Ok(self.issue_load(false))
    }

    /// Re-fetches roster and records unless the same filter is already loading.
    pub fn refresh(&mut self) -> Option<LoadJob> {
        if self.pending.as_ref() == Some(&self.filter) {
            return None;
        }
        self.issue_load(false)
    }

    fn issue_load(&mut self, keep_marked: bool) -> Option<LoadJob> {
        let class_id = self.filter.class_id.clone()?;
        let subject_id = self.filter.subject_id.clone()?;
        let fetch_roster = self.roster.is_empty();
        let records = self.records_target();
        if !fetch_roster && records.is_none() {
            return None;
        }
        let ticket = self.gate.advance();
        self.pending = Some(self.filter.clone());
        Some(LoadJob::Attendance(AttendanceLoad {
            ticket,
            class_id,
            subject_id,
            fetch_roster,
            records,
            keep_marked,
        }))
    }

    fn records_target(&self) -> Option<(AttendanceQuery, AttendanceKey)> {
        let f = &self.filter;
        let session = self.context.session.as_ref()?;
        let term = self.context.term.as_ref()?;
        let key = AttendanceKey {
            week: f.week?,
            day: f.day?.to_string(),
            date: f.date?,
        };
        let query = AttendanceQuery {
            class_id: f.class_id.clone()?,
            subject_id: f.subject_id.clone()?,
            week: key.week,
            academic_session_id: session.id.clone(),
            term: term.name.clone(),
        };
        Some((query, key))
    }

    /// Applies a finished load. Returns false when it was superseded.
    pub fn apply(&mut self, loaded: AttendanceLoaded, notifier: &dyn Notifier) -> bool {
        if !self.gate.is_current(&loaded.ticket) {
            tracing::debug!(
                generation = loaded.ticket.generation(),
                current = self.gate.current(),
                "dropping stale attendance load"
            );
            return false;
        }
        self.pending = None;
        match loaded.roster {
            Some(Ok(roster)) => self.roster = roster,
            Some(Err(e)) => {
                tracing::warn!("attendance roster failed: {e}");
                notifier.error("Error loading students".to_string());
                self.roster.clear();
            }
            None => {}
        }
        let ids = self.roster_ids();
        match loaded.records {
            Some((key, Ok(records))) => {
                let r = reconcile(&records, &ids, &key);
                self.marks = r.marks;
                self.already_marked = r.already_marked || loaded.keep_marked;
            }
            Some((_, Err(e))) => {
                tracing::warn!("attendance records failed: {e}");
                notifier.error("Failed to load attendance records".to_string());
                self.marks = default_marks(&ids);
                self.already_marked = loaded.keep_marked;
            }
            None => {
                self.marks = default_marks(&ids);
                self.already_marked = loaded.keep_marked;
            }
        }
        true
    }

    fn editable_mark(&mut self, student_id: &Id) -> Result<&mut Mark, ViewError> {
        if self.already_marked {
            return Err(ViewError::Locked(ALREADY_MARKED_LABEL.to_string()));
        }
        if !self.roster.iter().any(|s| &s.id == student_id) {
            return Err(ViewError::validation(format!(
                "Student {student_id} is not on this roster"
            )));
        }
        Ok(self.marks.entry(student_id.clone()).or_default())
    }

    pub fn set_status(&mut self, student_id: &Id, status: AttendanceStatus) -> Result<(), ViewError> {
        self.editable_mark(student_id)?.status = status;
        Ok(())
    }

    pub fn set_remark(&mut self, student_id: &Id, remark: &str) -> Result<(), ViewError> {
        let remark = remark.trim();
        self.editable_mark(student_id)?.remark = (!remark.is_empty()).then(|| remark.to_string());
        Ok(())
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let f = &self.filter;
        let mut missing = Vec::new();
        if f.class_id.is_none() {
            missing.push("classId");
        }
        if f.subject_id.is_none() {
            missing.push("subjectId");
        }
        if f.week.is_none() {
            missing.push("week");
        }
        if f.day.is_none() {
            missing.push("day");
        }
        if f.date.is_none() {
            missing.push("date");
        }
        if self.context.session.is_none() {
            missing.push("sessionId");
        }
        if self.context.term.is_none() {
            missing.push("term");
        }
        missing
    }

    pub fn can_submit(&self) -> bool {
        !self.already_marked
            && self.pending.is_none()
            && !self.roster.is_empty()
            && self.missing_fields().is_empty()
    }

    /// Posts one entry per roster student. On failure the draft is kept.
    pub fn submit(&mut self, client: &PortalClient, notifier: &dyn Notifier) -> Result<Option<LoadJob>, ViewError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            let msg = format!("Please fill all required fields. Missing: {}", missing.join(", "));
            notifier.error(msg.clone());
            return Err(ViewError::Validation(msg));
        }
        if self.roster.is_empty() {
            let msg = "No students to mark attendance for";
            notifier.error(msg.to_string());
            return Err(ViewError::validation(msg));
        }
        if self.already_marked {
            return Err(ViewError::Locked(ALREADY_MARKED_LABEL.to_string()));
        }
        if self.pending.is_some() {
            return Err(ViewError::Locked("Attendance records are still loading".to_string()));
        }
        let (Some(class_id), Some(subject_id), Some(week), Some(day), Some(date)) = (
            self.filter.class_id.clone(),
            self.filter.subject_id.clone(),
            self.filter.week,
            self.filter.day,
            self.filter.date,
        ) else {
            return Err(ViewError::validation("Please fill all required fields"));
        };

        let submission = AttendanceSubmission {
            class_id,
            subject_id,
            week,
            day: day.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            attendances: submission_entries(&self.roster_ids(), &self.marks),
        };
        match client.mark_attendance(&submission) {
            Ok(message) => {
                notifier.success(message.unwrap_or_else(|| {
                    format!("Attendance marked successfully for {day}, Week {week}")
                }));
                self.already_marked = true;
                Ok(self.issue_load(true))
            }
            Err(e) => {
                notifier.error(e.user_message("Error marking attendance"));
                Err(ViewError::Api(e))
            }
        }
    }

    pub fn snapshot(&self) -> AttendanceSnapshot {
        let rows = self
            .roster
            .iter()
            .map(|s| {
                let mark = self.marks.get(&s.id).cloned().unwrap_or_default();
                AttendanceRow {
                    student: s.clone(),
                    status: mark.status,
                    remark: mark.remark,
                }
            })
            .collect();
        AttendanceSnapshot {
            classes: self.classes.clone(),
            subjects: self.subject_options(),
            session: self.context.session.as_ref().map(|s| s.name.clone()),
            term: self.context.term.as_ref().map(|t| {
                t.display_name.clone().unwrap_or_else(|| t.name.clone())
            }),
            class_id: self.filter.class_id.clone(),
            subject_id: self.filter.subject_id.clone(),
            week: self.filter.week,
            day: self.filter.day,
            date: self.filter.date.map(|d| d.format("%Y-%m-%d").to_string()),
            rows,
            already_marked: self.already_marked,
            loading: self.pending.is_some(),
            can_submit: self.can_submit(),
            submit_label: if self.already_marked {
                ALREADY_MARKED_LABEL
            } else {
                SUBMIT_LABEL
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub student: Student,
    pub status: AttendanceStatus,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSnapshot {
    pub classes: Vec<SchoolClass>,
    pub subjects: Vec<Subject>,
    pub session: Option<String>,
    pub term: Option<String>,
    pub class_id: Option<Id>,
    pub subject_id: Option<Id>,
    pub week: Option<u32>,
    pub day: Option<&'static str>,
    pub date: Option<String>,
    pub rows: Vec<AttendanceRow>,
    pub already_marked: bool,
    pub loading: bool,
    pub can_submit: bool,
    pub submit_label: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeTransport;
    use crate::api::transport::{Body, Method};
    use crate::api::types::Role;
    use crate::notify::Outbox;
    use crate::session::{AuthSession, Principal, SessionHandle};
    use crate::views::Loaded;
    use serde_json::json;
    use std::sync::Arc;

    fn client(fake: &Arc<FakeTransport>) -> PortalClient {
        let session = SessionHandle::new();
        session.set(AuthSession {
            token: "t".into(),
            principal: Principal {
                id: Id::from("77"),
                display_name: "Mrs Bello".into(),
                role: Role::Teacher,
            },
        });
        PortalClient::new(fake.clone(), session)
    }

    fn seed(fake: &FakeTransport) {
        fake.on(
            Method::Get,
            "/academic-sessions/current",
            json!({ "data": { "session": { "id": 4, "name": "2024/2025" }, "term": { "name": "first" } } }),
        );
        fake.on(
            Method::Get,
            "/teacher/attendance/classes",
            json!([{ "id": 1, "name": "JSS1", "subjects": [{ "id": 10, "name": "Maths" }] },
                   { "id": 2, "name": "JSS2", "subjects": [{ "id": 10, "name": "Maths" }] }]),
        );
        fake.on(
            Method::Get,
            "/teacher/attendance/students",
            json!({ "data": [{ "id": 100, "first_name": "Ada", "last_name": "Obi" },
                             { "id": 101, "first_name": "Bayo", "last_name": "Ojo" }] }),
        );
        fake.on(
            Method::Get,
            "/teacher/attendance",
            json!([
                { "student_id": 100, "records": [
                    { "week": "3", "day": "Wednesday", "date": "2024-09-18T00:00:00.000000Z", "status": "late", "remark": "bus" }
                ] },
                { "student_id": 101, "records": [
                    { "week": 3, "day": "Wednesday", "date": "2024-09-18", "status": "present" }
                ] }
            ]),
        );
    }

    fn patch(v: serde_json::Value) -> FilterPatch {
        serde_json::from_value(v).expect("patch")
    }

    fn run(job: Option<LoadJob>, client: &PortalClient) -> AttendanceLoaded {
        match job.expect("job").run(client) {
            Loaded::Attendance(l) => l,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn opened(fake: &Arc<FakeTransport>, outbox: &Outbox) -> (PortalClient, AttendanceView) {
        seed(fake);
        let client = client(fake);
        let mut view = AttendanceView::new();
        view.open(&client, outbox);
        (client, view)
    }

    fn select(view: &mut AttendanceView, client: &PortalClient, outbox: &Outbox, week: u32) {
        let job = view
            .set_filter(patch(json!({
                "classId": 1, "subjectId": 10, "week": week, "day": "wednesday", "date": "2024-09-18"
            })))
            .expect("filter");
        assert!(view.apply(run(job, client), outbox));
    }

    #[test]
    fn matching_records_prefill_and_lock() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = opened(&fake, &outbox);
        select(&mut view, &client, &outbox, 3);

        let snap = view.snapshot();
        assert!(snap.already_marked);
        assert!(!snap.can_submit);
        assert_eq!(snap.submit_label, ALREADY_MARKED_LABEL);
        assert_eq!(snap.rows[0].status, AttendanceStatus::Late);
        assert_eq!(snap.rows[0].remark.as_deref(), Some("bus"));
        assert_eq!(snap.rows[1].status, AttendanceStatus::Present);
        assert_eq!(
            view.set_status(&Id::from("100"), AttendanceStatus::Absent)
                .unwrap_err()
                .code(),
            "locked"
        );
        assert_eq!(view.submit(&client, &outbox).unwrap_err().code(), "locked");

        let query = &fake.calls_to(Method::Get, "/teacher/attendance")[0].query;
        assert!(query.contains(&("academic_session_id".to_string(), "4".to_string())));
        assert!(query.contains(&("term".to_string(), "first".to_string())));
    }

    #[test]
    fn another_week_resets_to_present() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = opened(&fake, &outbox);
        select(&mut view, &client, &outbox, 3);
        let job = view.set_filter(patch(json!({ "week": 4 }))).expect("week 4");
        // Mid-flight the draft is already back to defaults and not marked.
        assert!(!view.snapshot().already_marked);
        assert!(view.apply(run(job, &client), &outbox));

        let snap = view.snapshot();
        assert!(!snap.already_marked);
        assert!(snap.can_submit);
        assert!(snap.rows.iter().all(|r| r.status == AttendanceStatus::Present));
        assert_eq!(snap.submit_label, SUBMIT_LABEL);
    }

    #[test]
    fn superseded_loads_are_dropped() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = opened(&fake, &outbox);
        let week3 = view
            .set_filter(patch(json!({
                "classId": 1, "subjectId": 10, "week": 3, "day": "Wednesday", "date": "2024-09-18"
            })))
            .expect("week 3");
        let week4 = view.set_filter(patch(json!({ "week": 4 }))).expect("week 4");

        let stale = run(week3, &client);
        let fresh = run(week4, &client);
        assert!(!view.apply(stale, &outbox));
        assert!(view.apply(fresh, &outbox));
        assert!(!view.snapshot().already_marked);
    }

    #[test]
    fn identical_filter_is_not_reissued() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (_client, mut view) = opened(&fake, &outbox);
        let first = view
            .set_filter(patch(json!({ "classId": 1, "subjectId": 10 })))
            .expect("filter");
        assert!(first.is_some());
        assert!(view
            .set_filter(patch(json!({ "classId": "1" })))
            .expect("same")
            .is_none());
        assert!(view.refresh().is_none());
    }

    #[test]
    fn class_change_clears_subject() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (_client, mut view) = opened(&fake, &outbox);
        view.set_filter(patch(json!({ "classId": 1, "subjectId": 10 })))
            .expect("filter");
        assert!(view
            .set_filter(patch(json!({ "classId": 2 })))
            .expect("class 2")
            .is_none());
        assert_eq!(view.snapshot().subject_id, None);
    }

    #[test]
    fn failed_records_fetch_falls_back_to_unmarked() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = opened(&fake, &outbox);
        fake.fail(
            Method::Get,
            "/teacher/attendance",
            ApiError::Server {
                status: 500,
                message: None,
            },
        );
        select(&mut view, &client, &outbox, 3);
        let snap = view.snapshot();
        assert!(!snap.already_marked);
        assert!(snap.can_submit);
        assert_eq!(outbox.drain().last().map(|n| n.message.clone()).as_deref(), Some("Failed to load attendance records"));
    }

    #[test]
    fn submit_reports_missing_fields() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = opened(&fake, &outbox);
        view.set_filter(patch(json!({ "classId": 1, "week": 2 }))).expect("filter");
        let err = view.submit(&client, &outbox).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please fill all required fields. Missing: subjectId, day, date"
        );
    }

    #[test]
    fn submit_posts_every_student_and_locks() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = opened(&fake, &outbox);
        fake.on(Method::Get, "/teacher/attendance", json!([]));
        fake.on(Method::Post, "/teacher/attendance", json!({ "data": {} }));
        select(&mut view, &client, &outbox, 5);
        view.set_status(&Id::from("101"), AttendanceStatus::Absent).expect("status");
        view.set_remark(&Id::from("101"), "  sick ").expect("remark");
        outbox.drain();

        let job = view.submit(&client, &outbox).expect("submit");
        assert!(job.is_some());
        assert!(view.snapshot().already_marked);
        assert_eq!(
            outbox.drain()[0].message,
            "Attendance marked successfully for Wednesday, Week 5"
        );

        let call = &fake.calls_to(Method::Post, "/teacher/attendance")[0];
        let Body::Json(body) = &call.body else {
            panic!("expected json body");
        };
        assert_eq!(body["date"], json!("2024-09-18"));
        assert_eq!(body["day"], json!("Wednesday"));
        assert_eq!(body["attendances"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["attendances"][1]["status"], json!("absent"));
        assert_eq!(body["attendances"][1]["remark"], json!("sick"));
        assert_eq!(body["attendances"][0]["remark"], json!(null));

        // The post-submit refresh keeps the view locked even before the
        // backend reflects the new records.
        assert!(view.apply(run(job, &client), &outbox));
        assert!(view.snapshot().already_marked);
    }

    #[test]
    fn failed_submit_keeps_the_draft() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (client, mut view) = opened(&fake, &outbox);
        fake.on(Method::Get, "/teacher/attendance", json!([]));
        fake.fail(
            Method::Post,
            "/teacher/attendance",
            ApiError::Validation {
                message: Some("Date is in the future".into()),
                fields: Default::default(),
            },
        );
        select(&mut view, &client, &outbox, 5);
        view.set_status(&Id::from("100"), AttendanceStatus::Excused).expect("status");
        outbox.drain();
        assert!(view.submit(&client, &outbox).is_err());
        let snap = view.snapshot();
        assert!(!snap.already_marked);
        assert_eq!(snap.rows[0].status, AttendanceStatus::Excused);
        assert_eq!(outbox.drain()[0].message, "Date is in the future");
    }

    #[test]
    fn bad_filter_values_are_rejected() {
        let fake = FakeTransport::new();
        let outbox = Outbox::new();
        let (_client, mut view) = opened(&fake, &outbox);
        assert!(view.set_filter(patch(json!({ "week": 0 }))).is_err());
        assert!(view.set_filter(patch(json!({ "day": "Sunday" }))).is_err());
        assert!(view.set_filter(patch(json!({ "date": "18/09/2024" }))).is_err());
        assert!(view.set_filter(patch(json!({ "classId": 9 }))).is_err());
    }
}
