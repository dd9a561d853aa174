//! Wire shapes of the ERP responses.
//!
//! Every field is optional here; defaults are applied when the payload is
//! turned into the typed entities in `models`.

use serde::Deserialize;

/// A loosely typed JSON scalar. The ERP is inconsistent about sending ids and
/// counts as numbers or strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

impl Scalar {
    /// False for values the ERP uses to mean "nothing here": `0`, `""`, `false`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Integer(value) => *value != 0,
            Scalar::Float(value) => *value != 0.0 && !value.is_nan(),
            Scalar::Flag(value) => *value,
            Scalar::Text(value) => !value.is_empty(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Integer(value) => Some(*value as f64),
            Scalar::Float(value) => Some(*value),
            Scalar::Flag(_) => None,
            Scalar::Text(value) => value.trim().parse().ok(),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Scalar::Integer(value) => value.to_string(),
            Scalar::Float(value) if value.fract() == 0.0 => format!("{}", *value as i64),
            Scalar::Float(value) => value.to_string(),
            Scalar::Flag(value) => value.to_string(),
            Scalar::Text(value) => value.clone(),
        }
    }
}

/// Picks the scalar only when it is truthy.
pub fn truthy(value: &Option<Scalar>) -> Option<&Scalar> {
    value.as_ref().filter(|scalar| scalar.is_truthy())
}

/// Truthy numeric value truncated to a whole count, or 0.
pub fn count_or_zero(value: &Option<Scalar>) -> i64 {
    truthy(value)
        .and_then(Scalar::as_number)
        .map(|number| number as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<Scalar>,
    #[serde(default, rename = "SessionId")]
    pub session_id: Option<Scalar>,
    #[serde(default, rename = "X-UserId")]
    pub user_id: Option<Scalar>,
    #[serde(default, rename = "X_Token")]
    pub x_token: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub roll_number: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceResponse {
    #[serde(default, rename = "stdSubAtdDetails")]
    pub details: Option<AttendanceDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDetails {
    #[serde(default)]
    pub overall_present: Option<Scalar>,
    #[serde(default)]
    pub overall_lecture: Option<Scalar>,
    #[serde(default)]
    pub subjects: Option<Vec<SubjectEntry>>,
}

/// The `subjects` array mixes plain records with nested groups of records.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubjectEntry {
    Group(Vec<SubjectEntry>),
    Single(RawSubject),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubject {
    #[serde(default)]
    pub name: Option<Scalar>,
    #[serde(default)]
    pub id: Option<Scalar>,
    #[serde(default, rename = "subjectId")]
    pub subject_id: Option<Scalar>,
    #[serde(default, rename = "presentLeactures", alias = "presentLectures")]
    pub present_lectures: Option<Scalar>,
    #[serde(default, rename = "totalLeactures", alias = "totalLectures")]
    pub total_lectures: Option<Scalar>,
    #[serde(default, rename = "percentageAttendance")]
    pub percentage_attendance: Option<Scalar>,
}

impl RawSubject {
    /// `id`, falling back to `subjectId`.
    pub fn resolved_id(&self) -> Option<String> {
        truthy(&self.id)
            .or(self.subject_id.as_ref())
            .map(Scalar::to_text)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyAttendanceResponse {
    #[serde(default, rename = "attendanceData")]
    pub attendance_data: Option<Vec<RawDailyRecord>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDailyRecord {
    #[serde(default, rename = "absentDate")]
    pub absent_date: Option<String>,
    #[serde(default, rename = "subjectName")]
    pub subject_name: Option<String>,
    #[serde(default, rename = "isAbsent")]
    pub is_absent: Option<Scalar>,
    #[serde(default, rename = "attandanceType")]
    pub attendance_type: Option<Scalar>,
    #[serde(default, rename = "attendanceID")]
    pub attendance_id: Option<Scalar>,
    #[serde(default, rename = "subjectId")]
    pub subject_id: Option<Scalar>,
}

/// Extracts the server-provided `error` string from an error body, if any.
pub fn server_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(serde_json::Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
