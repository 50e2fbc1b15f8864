use crate::api::types::{lenient, Id};
use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const SCHOOL_DAYS: [&str; 6] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub const ALREADY_MARKED_LABEL: &str = "Attendance already marked";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            other => Err(format!("unknown attendance status: {other}")),
        }
    }
}

/// One student's submitted attendance, as returned by the records query.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentAttendance {
    pub student_id: Id,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub records: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceEntry {
    #[serde(default, deserialize_with = "lenient::u32_opt")]
    pub week: Option<u32>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

/// Anything that names a calendar day.
pub trait CalendarDay {
    fn calendar_day(&self) -> Option<NaiveDate>;
}

impl CalendarDay for str {
    /// Text is cut at the first `T` or space, so a timestamp keeps the
    /// calendar day it was written with.
    fn calendar_day(&self) -> Option<NaiveDate> {
        let t = self.trim();
        let head = t.split(['T', ' ']).next().unwrap_or(t);
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }
}

impl CalendarDay for String {
    fn calendar_day(&self) -> Option<NaiveDate> {
        self.as_str().calendar_day()
    }
}

impl CalendarDay for NaiveDate {
    fn calendar_day(&self) -> Option<NaiveDate> {
        Some(*self)
    }
}

impl<Tz: TimeZone> CalendarDay for DateTime<Tz> {
    /// Date-times resolve to their UTC calendar day.
    fn calendar_day(&self) -> Option<NaiveDate> {
        Some(self.naive_utc().date())
    }
}

/// Canonical `YYYY-MM-DD`, or `None` when the input names no valid day.
pub fn normalize_date<D: CalendarDay + ?Sized>(value: &D) -> Option<String> {
    value
        .calendar_day()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

pub fn normalize_day(day: &str) -> String {
    day.trim().to_string()
}

/// Maps free-form input onto one of [`SCHOOL_DAYS`], ignoring case.
pub fn school_day(input: &str) -> Option<&'static str> {
    let t = input.trim();
    SCHOOL_DAYS
        .iter()
        .copied()
        .find(|d| d.eq_ignore_ascii_case(t))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceKey {
    pub week: u32,
    pub day: String,
    pub date: NaiveDate,
}

impl AttendanceKey {
    fn matches(&self, entry: &AttendanceEntry) -> bool {
        let Some(week) = entry.week else {
            return false;
        };
        let Some(day) = entry.day.as_deref() else {
            return false;
        };
        let Some(date) = entry.date.as_deref().and_then(|d| d.calendar_day()) else {
            return false;
        };
        week == self.week && normalize_day(day) == normalize_day(&self.day) && date == self.date
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mark {
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub already_marked: bool,
    pub marks: BTreeMap<Id, Mark>,
}

pub fn default_marks(roster: &[Id]) -> BTreeMap<Id, Mark> {
    roster.iter().map(|id| (id.clone(), Mark::default())).collect()
}

/// Decides whether `key` was already submitted and seeds one mark per
/// roster student. Later matching entries for the same student win.
pub fn reconcile(records: &[StudentAttendance], roster: &[Id], key: &AttendanceKey) -> Reconciliation {
    let mut matched: BTreeMap<&Id, Mark> = BTreeMap::new();
    let mut already_marked = false;

    for record in records {
        for entry in &record.records {
            if !key.matches(entry) {
                continue;
            }
            already_marked = true;
            let status = match entry.status.as_deref() {
                Some(raw) => raw.parse::<AttendanceStatus>().unwrap_or_else(|e| {
                    tracing::warn!(student = %record.student_id, "{e}; treating as present");
                    AttendanceStatus::Present
                }),
                None => AttendanceStatus::Present,
            };
            let remark = entry
                .remark
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            matched.insert(&record.student_id, Mark { status, remark });
        }
    }

    if !already_marked {
        return Reconciliation {
            already_marked,
            marks: default_marks(roster),
        };
    }

    let marks = roster
        .iter()
        .map(|id| (id.clone(), matched.get(id).cloned().unwrap_or_default()))
        .collect();
    Reconciliation {
        already_marked,
        marks,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionEntry {
    pub student_id: Id,
    pub status: AttendanceStatus,
    pub remark: Option<String>,
}

/// One entry per roster student, in roster order; unmarked students default
/// to present.
pub fn submission_entries(roster: &[Id], marks: &BTreeMap<Id, Mark>) -> Vec<SubmissionEntry> {
    roster
        .iter()
        .map(|id| {
            let mark = marks.get(id).cloned().unwrap_or_default();
            SubmissionEntry {
                student_id: id.clone(),
                status: mark.status,
                remark: mark.remark,
            }
        })
        .collect()
}
