use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::{DailyAttendanceRecord, ProjectionResult, SubjectAttendance};
use crate::schema::{self, RawDailyRecord, RawSubject, Scalar, SubjectEntry};

/// Minimum attendance ratio the institution enforces.
pub const THRESHOLD: f64 = 0.75;

/// `present / total`, or `None` when there are no lectures yet.
pub fn ratio(present: i64, total: i64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(present as f64 / total as f64)
    }
}

/// Attendance as a percentage; no lectures counts as 0%.
pub fn percentage(present: i64, total: i64) -> f64 {
    ratio(present, total).map(|value| value * 100.0).unwrap_or(0.0)
}

pub fn format_percentage(present: i64, total: i64) -> String {
    match ratio(present, total) {
        Some(value) => format!("{:.1}%", value * 100.0),
        None => "0%".to_string(),
    }
}

/// Classes still needed to reach the threshold, or classes that can be
/// skipped while staying above it. Attending a class also grows the total,
/// hence the 0.25 and 0.75 divisors.
pub fn project(present: i64, total: i64) -> ProjectionResult {
    let (needed, can_miss) = match ratio(present, total) {
        None => (0, 0),
        Some(value) if value < THRESHOLD => {
            let needed = ((THRESHOLD * total as f64 - present as f64) / (1.0 - THRESHOLD)).ceil();
            (needed.max(0.0) as i64, 0)
        }
        Some(_) => {
            let can_miss = ((present as f64 - THRESHOLD * total as f64) / THRESHOLD).floor();
            (0, can_miss.max(0.0) as i64)
        }
    };

    ProjectionResult {
        present,
        absent: total - present,
        total,
        needed,
        can_miss,
    }
}

/// Flattens one level of nesting and applies the ERP's defaults: unnamed
/// subjects become "Unknown", missing counts 0, missing percentage 100.
pub fn normalize_subjects(entries: &[SubjectEntry]) -> Vec<SubjectAttendance> {
    let mut subjects = Vec::new();

    for entry in entries {
        match entry {
            SubjectEntry::Group(group) => {
                for inner in group {
                    match inner {
                        SubjectEntry::Single(raw) => subjects.push(normalize_subject(raw)),
                        _ => subjects.push(normalize_subject(&RawSubject::default())),
                    }
                }
            }
            SubjectEntry::Single(raw) => subjects.push(normalize_subject(raw)),
            SubjectEntry::Other(_) => subjects.push(normalize_subject(&RawSubject::default())),
        }
    }

    subjects
}

fn normalize_subject(raw: &RawSubject) -> SubjectAttendance {
    // TODO: a subject with no percentage reports 100%; confirm with the ERP
    // whether that is intended before changing it.
    let percentage_attendance = schema::truthy(&raw.percentage_attendance)
        .and_then(Scalar::as_number)
        .unwrap_or(100.0);

    SubjectAttendance {
        id: raw.resolved_id(),
        name: schema::truthy(&raw.name)
            .map(Scalar::to_text)
            .unwrap_or_else(|| "Unknown".to_string()),
        present_lectures: schema::count_or_zero(&raw.present_lectures),
        total_lectures: schema::count_or_zero(&raw.total_lectures),
        percentage_attendance,
    }
}

/// Keeps the records of one subject, newest first. Records sharing a date
/// keep their fetch order; unparseable dates sink to the end.
pub fn shape_daily_records(raw: &[RawDailyRecord], subject_id: &str) -> Vec<DailyAttendanceRecord> {
    let mut records: Vec<DailyAttendanceRecord> = raw
        .iter()
        .filter(|record| {
            record
                .subject_id
                .as_ref()
                .map(|id| id.to_text() == subject_id)
                .unwrap_or(false)
        })
        .map(|record| {
            let date = record.absent_date.clone().unwrap_or_default();
            DailyAttendanceRecord {
                parsed_date: parse_date(&date),
                date,
                subject_name: record.subject_name.clone().unwrap_or_default(),
                is_present: schema::truthy(&record.is_absent).is_none(),
                attendance_type: schema::count_or_zero(&record.attendance_type),
                attendance_id: record.attendance_id.as_ref().map(Scalar::to_text),
            }
        })
        .collect();

    sort_newest_first(&mut records);
    records
}

pub fn sort_newest_first(records: &mut [DailyAttendanceRecord]) {
    records.sort_by(|a, b| match (a.parsed_date, b.parsed_date) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Accepts RFC 3339 timestamps, naive ISO timestamps and bare dates.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
