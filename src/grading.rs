use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const MAX_TOTAL: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

/// Lower bound (inclusive) and remark per grade, highest first.
const GRADE_SCALE: [(Grade, f64, f64, &str); 6] = [
    (Grade::A, 80.0, 100.0, "Excellent"),
    (Grade::B, 70.0, 79.0, "Very Good"),
    (Grade::C, 60.0, 69.0, "Good"),
    (Grade::D, 50.0, 59.0, "Fair"),
    (Grade::E, 40.0, 49.0, "Pass"),
    (Grade::F, 0.0, 39.0, "Fail"),
];

impl Grade {
    pub fn for_total(total: f64) -> Grade {
        for (grade, min, _, _) in GRADE_SCALE {
            if total >= min {
                return grade;
            }
        }
        Grade::F
    }

    pub fn remark(self) -> &'static str {
        GRADE_SCALE
            .iter()
            .find(|(g, ..)| *g == self)
            .map(|(_, _, _, r)| *r)
            .unwrap_or("Fail")
    }

    pub fn letter(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// One-decimal rounding used for displayed averages: `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreField {
    FirstCa,
    SecondCa,
    ExamScore,
}

impl ScoreField {
    pub const ALL: [ScoreField; 3] = [ScoreField::FirstCa, ScoreField::SecondCa, ScoreField::ExamScore];

    pub fn label(self) -> &'static str {
        match self {
            ScoreField::FirstCa => "First CA",
            ScoreField::SecondCa => "Second CA",
            ScoreField::ExamScore => "Exam score",
        }
    }
}

impl FromStr for ScoreField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "first_ca" | "firstCa" => Ok(ScoreField::FirstCa),
            "second_ca" | "secondCa" => Ok(ScoreField::SecondCa),
            "exam_score" | "examScore" => Ok(ScoreField::ExamScore),
            other => Err(format!("unknown score field: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreRejection {
    #[error("Please fill in at least one score field")]
    Empty,
    #[error("{field} must be a number")]
    NotANumber { field: &'static str },
    #[error("{field} must be between 0 and 100")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("Total score cannot exceed 100 (currently {total})")]
    TotalExceeded { total: f64 },
}

/// Parses one raw input box. Blank input clears the field.
pub fn parse_score_input(field: ScoreField, raw: &str) -> Result<Option<f64>, ScoreRejection> {
    let t = raw.trim();
    if t.is_empty() {
        return Ok(None);
    }
    t.parse::<f64>()
        .map(Some)
        .map_err(|_| ScoreRejection::NotANumber { field: field.label() })
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreComponents {
    pub first_ca: Option<f64>,
    pub second_ca: Option<f64>,
    pub exam_score: Option<f64>,
}

/// How far a term's entry has got, by filled components out of three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Completion {
    NotStarted,
    Partial,
    AlmostDone,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub total: f64,
    pub grade: Grade,
}

impl ScoreComponents {
    pub fn get(&self, field: ScoreField) -> Option<f64> {
        match field {
            ScoreField::FirstCa => self.first_ca,
            ScoreField::SecondCa => self.second_ca,
            ScoreField::ExamScore => self.exam_score,
        }
    }

    pub fn set(&mut self, field: ScoreField, value: Option<f64>) {
        match field {
            ScoreField::FirstCa => self.first_ca = value,
            ScoreField::SecondCa => self.second_ca = value,
            ScoreField::ExamScore => self.exam_score = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        ScoreField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// A record whose components are all missing or zero has not started.
    pub fn completion(&self) -> Completion {
        let values: Vec<f64> = ScoreField::ALL.iter().filter_map(|f| self.get(*f)).collect();
        if values.iter().all(|v| *v == 0.0) {
            return Completion::NotStarted;
        }
        match values.len() {
            3 => Completion::Complete,
            2 => Completion::AlmostDone,
            _ => Completion::Partial,
        }
    }

    /// Missing components count as zero.
    pub fn total(&self) -> f64 {
        ScoreField::ALL
            .iter()
            .filter_map(|f| self.get(*f))
            .sum()
    }

    /// Checks the save rules and derives total and grade. Never clamps.
    pub fn aggregate(&self) -> Result<Aggregate, ScoreRejection> {
        if self.is_empty() {
            return Err(ScoreRejection::Empty);
        }
        for field in ScoreField::ALL {
            if let Some(v) = self.get(field) {
                if !v.is_finite() || !(0.0..=MAX_TOTAL).contains(&v) {
                    return Err(ScoreRejection::OutOfRange {
                        field: field.label(),
                        value: v,
                    });
                }
            }
        }
        let total = self.total();
        if total > MAX_TOTAL {
            return Err(ScoreRejection::TotalExceeded { total });
        }
        Ok(Aggregate {
            total,
            grade: Grade::for_total(total),
        })
    }

    /// Preview for display while typing; no validation.
    pub fn preview(&self) -> Aggregate {
        let total = self.total();
        Aggregate {
            total,
            grade: Grade::for_total(total),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject: String,
    pub first_ca: f64,
    pub second_ca: f64,
    pub exam: f64,
    pub total: f64,
    pub grade: Grade,
    pub grade_remark: &'static str,
}

impl SubjectResult {
    pub fn new(subject: String, c: ScoreComponents) -> Self {
        let total = c.total();
        let grade = Grade::for_total(total);
        SubjectResult {
            subject,
            first_ca: c.first_ca.unwrap_or(0.0),
            second_ca: c.second_ca.unwrap_or(0.0),
            exam: c.exam_score.unwrap_or(0.0),
            total,
            grade,
            grade_remark: grade.remark(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSummary {
    pub rows: Vec<SubjectResult>,
    pub total_score: f64,
    pub average_score: f64,
    pub overall_grade: Option<Grade>,
    pub overall_remark: Option<&'static str>,
}

pub fn summarize_term<I>(rows: I) -> TermSummary
where
    I: IntoIterator<Item = (String, ScoreComponents)>,
{
    let rows: Vec<SubjectResult> = rows
        .into_iter()
        .map(|(subject, c)| SubjectResult::new(subject, c))
        .collect();
    let total_score: f64 = rows.iter().map(|r| r.total).sum();
    let (average_score, overall_grade) = if rows.is_empty() {
        (0.0, None)
    } else {
        let avg = total_score / rows.len() as f64;
        (round_off_1_decimal(avg), Some(Grade::for_total(avg)))
    };
    TermSummary {
        rows,
        total_score,
        average_score,
        overall_grade,
        overall_remark: overall_grade.map(Grade::remark),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermProgress {
    pub key: String,
    pub total_score: f64,
    pub average: f64,
    pub subjects: Vec<SubjectResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub terms: Vec<TermProgress>,
    pub completed_assessments: usize,
    pub average_score: f64,
}

/// Rolls per-term rows (already ordered) into a progress view.
pub fn summarize_progress<I>(terms: I) -> ProgressSummary
where
    I: IntoIterator<Item = (String, Vec<(String, ScoreComponents)>)>,
{
    let mut out = Vec::new();
    let mut grand_total = 0.0;
    let mut count = 0usize;
    for (key, rows) in terms {
        let subjects: Vec<SubjectResult> = rows
            .into_iter()
            .map(|(subject, c)| SubjectResult::new(subject, c))
            .collect();
        let total_score: f64 = subjects.iter().map(|s| s.total).sum();
        let average = if subjects.is_empty() {
            0.0
        } else {
            (total_score / subjects.len() as f64).round()
        };
        grand_total += total_score;
        count += subjects.len();
        out.push(TermProgress {
            key,
            total_score,
            average,
            subjects,
        });
    }
    ProgressSummary {
        terms: out,
        completed_assessments: count,
        average_score: if count > 0 {
            round_off_1_decimal(grand_total / count as f64)
        } else {
            0.0
        },
    }
}
