use std::path::Path;

use serde::Serialize;

use crate::models::SubjectAttendance;
use crate::report;

#[derive(Serialize)]
struct SubjectRow<'a> {
    subject_id: &'a str,
    name: &'a str,
    present: i64,
    absent: i64,
    total: i64,
    percentage: f64,
    status: &'static str,
}

pub fn write_subjects<W: std::io::Write>(writer: W, subjects: &[SubjectAttendance]) -> anyhow::Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for subject in subjects {
        csv_writer.serialize(SubjectRow {
            subject_id: subject.id.as_deref().unwrap_or_default(),
            name: &subject.name,
            present: subject.present(),
            absent: subject.absent(),
            total: subject.total_lectures,
            percentage: subject.percentage_attendance,
            status: report::subject_status(subject),
        })?;
    }

    csv_writer.flush()?;
    Ok(subjects.len())
}

pub fn export_subjects_csv(path: &Path, subjects: &[SubjectAttendance]) -> anyhow::Result<usize> {
    let file = std::fs::File::create(path)?;
    write_subjects(file, subjects)
}
