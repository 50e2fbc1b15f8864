use crate::attendance::SubmissionEntry;
use crate::grading::{Grade, ScoreComponents};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Backend identifier. Arrives as a string or an integer; compared as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Id(String);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id(s.trim().to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::from(s.as_str())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }
        match Raw::deserialize(d)? {
            Raw::Text(s) if !s.trim().is_empty() => Ok(Id::from(s)),
            Raw::Text(_) => Err(serde::de::Error::custom("empty id")),
            Raw::Number(n) => Ok(Id(n.to_string())),
        }
    }
}

/// Tolerant field decoders for values the backend sends in more than one form.
pub mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn u32_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
            _ => None,
        })
    }

    pub fn f64_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
    }

    pub fn u64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
            _ => 0,
        })
    }

    pub fn bool_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => Some(n.as_i64().unwrap_or(0) != 0),
            Some(Value::String(s)) => match s.trim() {
                "1" | "true" => Some(true),
                "0" | "false" | "" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    /// `null` decodes as the default value.
    pub fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }

    /// Decodes each item on its own, skipping the ones that do not fit.
    pub fn each<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
        let total = items.len();
        let decoded: Vec<T> = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("skipping undecodable list item: {e}");
                    None
                }
            })
            .collect();
        if decoded.len() < total {
            tracing::debug!(total, kept = decoded.len(), "list decoded with skipped items");
        }
        decoded
    }

    /// `{session: {term: [record]}}`, with unreadable records dropped
    /// rather than failing the whole reply.
    pub fn results_by_session<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<super::ResultsBySession, D::Error> {
        let mut out = super::ResultsBySession::new();
        let Some(Value::Object(sessions)) = Option::<Value>::deserialize(d)? else {
            return Ok(out);
        };
        for (session, terms) in sessions {
            let Value::Object(terms) = terms else { continue };
            let entry = out.entry(session).or_default();
            for (term, records) in terms {
                let records = match records {
                    Value::Array(items) => each(items),
                    _ => Vec::new(),
                };
                entry.insert(term, records);
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    First,
    Second,
    Third,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::First, Term::Second, Term::Third];

    pub fn as_str(self) -> &'static str {
        match self {
            Term::First => "first",
            Term::Second => "second",
            Term::Third => "third",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Term {
    type Err = String;

    /// Accepts `first`, `First Term`, and ordinals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase();
        let head = t.strip_suffix(" term").unwrap_or(&t).trim();
        match head {
            "first" | "1" | "1st" => Ok(Term::First),
            "second" | "2" | "2nd" => Ok(Term::Second),
            "third" | "3" | "3rd" => Ok(Term::Third),
            _ => Err(format!("unknown term: {}", s.trim())),
        }
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(d)?;
        let text = match raw {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => return Err(serde::de::Error::custom(format!("invalid term: {other}"))),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn landing_route(self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Teacher => "/teacher/dashboard",
            Role::Student => "/student/dashboard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Id,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub admission_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Case-insensitive search over names and admission number.
    pub fn matches_search(&self, needle: &str) -> bool {
        let n = needle.trim().to_lowercase();
        if n.is_empty() {
            return true;
        }
        self.first_name.to_lowercase().contains(&n)
            || self.last_name.to_lowercase().contains(&n)
            || self
                .admission_number
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&n))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicSession {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermInfo {
    #[serde(default)]
    pub id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl TermInfo {
    pub fn term(&self) -> Option<Term> {
        self.name.parse().ok()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcademicContext {
    #[serde(default, alias = "academic_session")]
    pub session: Option<AcademicSession>,
    #[serde(default)]
    pub term: Option<TermInfo>,
    #[serde(default, deserialize_with = "lenient::bool_opt")]
    pub has_session: Option<bool>,
    #[serde(default, deserialize_with = "lenient::bool_opt")]
    pub has_term: Option<bool>,
}

impl AcademicContext {
    pub fn is_configured(&self) -> bool {
        self.has_session != Some(false)
            && self.has_term != Some(false)
            && self.session.is_some()
            && self.term.is_some()
    }

    pub fn current_term(&self) -> Option<Term> {
        self.term.as_ref().and_then(TermInfo::term)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectRef {
    Named {
        #[serde(default)]
        id: Option<Id>,
        name: String,
    },
    Label(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: Id,
    #[serde(default)]
    pub student_id: Option<Id>,
    #[serde(default)]
    pub subject_id: Option<Id>,
    #[serde(default)]
    pub subject: Option<SubjectRef>,
    #[serde(default)]
    pub class_id: Option<Id>,
    pub term: Term,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub first_ca: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub second_ca: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub exam_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl ScoreRecord {
    pub fn subject_matches(&self, subject: &Id) -> bool {
        if self.subject_id.as_ref() == Some(subject) {
            return true;
        }
        matches!(&self.subject, Some(SubjectRef::Named { id: Some(id), .. }) if id == subject)
    }

    pub fn subject_name(&self) -> String {
        match &self.subject {
            Some(SubjectRef::Named { name, .. }) | Some(SubjectRef::Label(name)) => name.clone(),
            None => "Unknown Subject".to_string(),
        }
    }

    pub fn components(&self) -> ScoreComponents {
        ScoreComponents {
            first_ca: self.first_ca,
            second_ca: self.second_ca,
            exam_score: self.exam_score,
        }
    }
}

/// Body for score create/update.
#[derive(Debug, Clone, Serialize)]
pub struct ScorePayload {
    pub student_id: Id,
    pub subject_id: Id,
    pub class_id: Id,
    pub term: Term,
    pub first_ca: Option<f64>,
    pub second_ca: Option<f64>,
    pub exam_score: Option<f64>,
    pub total_score: f64,
    pub grade: Grade,
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceQuery {
    pub class_id: Id,
    pub subject_id: Id,
    pub week: u32,
    pub academic_session_id: Id,
    pub term: String,
}

impl AttendanceQuery {
    pub fn pairs(&self) -> Vec<(String, String)> {
        vec![
            ("class_id".to_string(), self.class_id.to_string()),
            ("subject_id".to_string(), self.subject_id.to_string()),
            ("week".to_string(), self.week.to_string()),
            (
                "academic_session_id".to_string(),
                self.academic_session_id.to_string(),
            ),
            ("term".to_string(), self.term.clone()),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSubmission {
    pub class_id: Id,
    pub subject_id: Id,
    pub week: u32,
    pub day: String,
    pub date: String,
    pub attendances: Vec<SubmissionEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct ImportSummary {
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub success_count: u64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub error_count: u64,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub errors: Vec<serde_json::Value>,
}

pub type ResultsBySession = BTreeMap<String, BTreeMap<String, Vec<ScoreRecord>>>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentResults {
    #[serde(default, deserialize_with = "lenient::results_by_session")]
    pub results: ResultsBySession,
    #[serde(default)]
    pub current_session: Option<AcademicSession>,
    #[serde(default)]
    pub admission_session: Option<serde_json::Value>,
    #[serde(default)]
    pub admission_term: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginReply {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub student: Option<Student>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Body for staff user create/update. `password` is omitted on update
/// unless it is being changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentInput {
    pub teacher_id: Id,
    pub class_id: Id,
    pub subject_id: Id,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}
