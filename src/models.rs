use std::collections::BTreeMap;

use chrono::NaiveDateTime;

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_USER_ID: &str = "X-Userid";

/// Authenticated session: the bearer token plus every header the ERP
/// expects on subsequent calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub bearer_token: String,
    pub request_headers: BTreeMap<String, String>,
}

impl Session {
    /// Rebuilds a session from a stored header set. Returns `None` when the
    /// user id header is missing or blank.
    pub fn from_headers(headers: BTreeMap<String, String>) -> Option<Self> {
        let user_id = headers.get(HEADER_USER_ID)?;
        if user_id.trim().is_empty() {
            return None;
        }

        let bearer_token = headers
            .get(HEADER_AUTHORIZATION)
            .and_then(|value| value.strip_prefix("Bearer "))
            .unwrap_or_default()
            .to_string();

        Some(Self {
            bearer_token,
            request_headers: headers,
        })
    }

    pub fn user_id(&self) -> &str {
        self.request_headers
            .get(HEADER_USER_ID)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub roll_number: String,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceSummary {
    pub overall_present: i64,
    pub overall_lecture: i64,
    pub subjects: Vec<SubjectAttendance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectAttendance {
    pub id: Option<String>,
    pub name: String,
    pub present_lectures: i64,
    pub total_lectures: i64,
    pub percentage_attendance: f64,
}

impl SubjectAttendance {
    pub fn present(&self) -> i64 {
        self.present_lectures
    }

    /// Unguarded: negative when the remote reports more present than total.
    pub fn absent(&self) -> i64 {
        self.total_lectures - self.present_lectures
    }

    pub fn is_good_standing(&self) -> bool {
        self.percentage_attendance >= 75.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyAttendanceRecord {
    pub date: String,
    pub parsed_date: Option<NaiveDateTime>,
    pub subject_name: String,
    pub is_present: bool,
    pub attendance_type: i64,
    pub attendance_id: Option<String>,
}

impl DailyAttendanceRecord {
    pub fn type_label(&self) -> &'static str {
        if self.attendance_type == 1 {
            "Regular"
        } else {
            "Extra"
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_present {
            "Present"
        } else {
            "Absent"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionResult {
    pub present: i64,
    pub absent: i64,
    pub total: i64,
    pub needed: i64,
    pub can_miss: i64,
}
