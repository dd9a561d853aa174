use std::fmt::Write;

use chrono::NaiveDate;

use crate::dashboard::{DailyPager, DashboardView};
use crate::models::{DailyAttendanceRecord, ProjectionResult, SubjectAttendance};
use crate::projection;

const BAR_WIDTH: usize = 40;

/// Banner for students below 85%; cheers above the threshold, warns below it.
pub fn motivation(percentage: f64) -> Option<&'static str> {
    if percentage >= 85.0 {
        None
    } else if percentage >= 75.0 {
        Some("Shabash mere sher!")
    } else {
        Some("Tu toh gaya bete!")
    }
}

pub fn projection_card(projection: &ProjectionResult) -> (String, &'static str) {
    if projection.needed > 0 {
        (
            format!("{} More", projection.needed),
            "Classes needed to maintain 75%",
        )
    } else {
        (
            format!("{} Available", projection.can_miss),
            "Classes you can miss",
        )
    }
}

pub fn projection_sentence(projection: &ProjectionResult) -> String {
    if projection.needed > 0 {
        format!(
            "You need to attend at least {} more classes to maintain 75% attendance.",
            projection.needed
        )
    } else {
        format!(
            "You can miss up to {} classes while maintaining 75% attendance.",
            projection.can_miss
        )
    }
}

pub fn subject_status(subject: &SubjectAttendance) -> &'static str {
    if subject.is_good_standing() {
        "Good"
    } else {
        "At Risk"
    }
}

/// Present/absent split as a fixed-width bar. Negative absences draw as none.
pub fn distribution_bar(present: i64, absent: i64) -> String {
    let present = present.max(0) as usize;
    let absent = absent.max(0) as usize;
    let total = present + absent;
    if total == 0 {
        return "-".repeat(BAR_WIDTH);
    }

    let filled = (present * BAR_WIDTH + total / 2) / total;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn display_date(record: &DailyAttendanceRecord) -> String {
    match record.parsed_date {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => record.date.clone(),
    }
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let stats = view.projection();
    let percentage = projection::percentage(stats.present, stats.total);
    let mut output = String::new();

    let _ = writeln!(output, "Attendance Dashboard");
    let _ = writeln!(output, "Track your attendance and performance");
    if let Some(profile) = &view.profile {
        let _ = writeln!(output, "{} (Roll No: {})", profile.full_name(), profile.roll_number);
    }
    for message in &view.status_messages {
        let _ = writeln!(output, "! {message}");
    }
    if let Some(quote) = motivation(percentage) {
        let _ = writeln!(output, "\"{quote}\"");
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Overall Attendance  {}  ({} present out of {} classes)",
        projection::format_percentage(stats.present, stats.total),
        stats.present,
        stats.total
    );
    let (value, description) = projection_card(&stats);
    let _ = writeln!(output, "Projection          {value}  ({description})");
    let _ = writeln!(
        output,
        "Risk Assessment     {}  (Total classes missed)",
        stats.absent
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "Attendance Distribution");
    let _ = writeln!(
        output,
        "[{}] present {} / absent {}",
        distribution_bar(stats.present, stats.absent),
        stats.present,
        stats.absent
    );
    let _ = writeln!(output, "{}", projection_sentence(&stats));

    let _ = writeln!(output);
    let _ = writeln!(output, "Subject-wise Attendance");
    if view.subjects().is_empty() {
        let _ = writeln!(output, "No subjects recorded.");
    }
    for subject in view.subjects() {
        let _ = writeln!(
            output,
            "{:<32} {:>6}%  {} present / {} total  {}",
            subject.name,
            subject.percentage_attendance,
            subject.present(),
            subject.present() + subject.absent(),
            subject_status(subject)
        );
    }

    output
}

pub fn render_detail(subject_name: &str, pager: &DailyPager) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{subject_name} - Daily Attendance");
    let _ = writeln!(output, "{} records", pager.records().len());
    let _ = writeln!(output, "{:<12} {:<32} {:<8} Type", "Date", "Subject", "Status");

    if pager.current_records().is_empty() {
        let _ = writeln!(output, "No attendance records found for this subject");
    }
    for record in pager.current_records() {
        let _ = writeln!(
            output,
            "{:<12} {:<32} {:<8} {}",
            display_date(record),
            record.subject_name,
            record.status_label(),
            record.type_label()
        );
    }

    if pager.total_pages() > 1 {
        let _ = writeln!(
            output,
            "Page {} of {}",
            pager.current_page(),
            pager.total_pages()
        );
    }

    output
}

pub fn build_report(view: &DashboardView, generated_on: NaiveDate) -> String {
    let stats = view.projection();
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    match &view.profile {
        Some(profile) => {
            let _ = writeln!(
                output,
                "Generated for {} (Roll No: {}) on {}",
                profile.full_name(),
                profile.roll_number,
                generated_on
            );
        }
        None => {
            let _ = writeln!(output, "Generated on {generated_on}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");
    let _ = writeln!(
        output,
        "- Attendance: {} ({} present out of {} classes)",
        projection::format_percentage(stats.present, stats.total),
        stats.present,
        stats.total
    );
    let _ = writeln!(output, "- Classes missed: {}", stats.absent);
    let _ = writeln!(output, "- {}", projection_sentence(&stats));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");
    if view.subjects().is_empty() {
        let _ = writeln!(output, "No subjects recorded.");
    } else {
        let _ = writeln!(output, "| Subject | Attendance | Present | Total | Status |");
        let _ = writeln!(output, "| --- | --- | --- | --- | --- |");
        for subject in view.subjects() {
            let _ = writeln!(
                output,
                "| {} | {}% | {} | {} | {} |",
                subject.name,
                subject.percentage_attendance,
                subject.present(),
                subject.total_lectures,
                subject_status(subject)
            );
        }
    }

    let mut at_risk: Vec<&SubjectAttendance> = view
        .subjects()
        .iter()
        .filter(|subject| !subject.is_good_standing())
        .collect();
    at_risk.sort_by(|a, b| {
        a.percentage_attendance
            .partial_cmp(&b.percentage_attendance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects At Risk");
    if at_risk.is_empty() {
        let _ = writeln!(output, "Every subject is at or above 75%.");
    } else {
        for subject in at_risk {
            let _ = writeln!(
                output,
                "- {} at {}% ({} of {} attended)",
                subject.name,
                subject.percentage_attendance,
                subject.present(),
                subject.total_lectures
            );
        }
    }

    if !view.status_messages.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Notes");
        for message in &view.status_messages {
            let _ = writeln!(output, "- {message}");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::tests::{daily, sample_session, subject};
    use crate::models::{AttendanceSummary, UserProfile};

    fn loaded_view(present: i64, total: i64) -> DashboardView {
        let mut view = DashboardView::new(sample_session());
        view.profile = Some(UserProfile {
            first_name: "Asha".to_string(),
            last_name: "Verma".to_string(),
            roll_number: "45".to_string(),
        });
        view.summary = AttendanceSummary {
            overall_present: present,
            overall_lecture: total,
            subjects: vec![
                subject("1", "Maths", 9, 10, 90.0),
                subject("2", "Physics", 5, 10, 50.0),
            ],
        };
        view
    }

    #[test]
    fn motivation_follows_thresholds() {
        assert_eq!(motivation(90.0), None);
        assert_eq!(motivation(80.0), Some("Shabash mere sher!"));
        assert_eq!(motivation(60.0), Some("Tu toh gaya bete!"));
        assert_eq!(motivation(0.0), Some("Tu toh gaya bete!"));
    }

    #[test]
    fn dashboard_without_data_renders_zero_percent() {
        let view = DashboardView::new(sample_session());
        let output = render_dashboard(&view);
        assert!(output.contains("Overall Attendance  0%"));
        assert!(output.contains("0 Available"));
        assert!(!output.contains("NaN"));
    }

    #[test]
    fn dashboard_lists_subjects_with_status() {
        let output = render_dashboard(&loaded_view(60, 100));
        assert!(output.contains("Asha Verma (Roll No: 45)"));
        assert!(output.contains("60.0%"));
        assert!(output.contains("60 More"));
        assert!(output.contains("9 present / 10 total  Good"));
        assert!(output.contains("5 present / 10 total  At Risk"));
    }

    #[test]
    fn detail_shows_page_controls_only_when_needed() {
        let pager = DailyPager::new(vec![daily("2024-01-20", true), daily("2024-01-05", false)]);
        let output = render_detail("Maths", &pager);
        assert!(output.starts_with("Maths - Daily Attendance"));
        assert!(output.contains("20/01/2024"));
        assert!(output.contains("Absent"));
        assert!(!output.contains("Page 1"));

        let many = DailyPager::new((1..=11).map(|d| daily(&format!("2024-01-{d:02}"), true)).collect());
        assert!(render_detail("Maths", &many).contains("Page 1 of 2"));

        let empty = DailyPager::new(Vec::new());
        assert!(render_detail("Maths", &empty).contains("No attendance records found for this subject"));
    }

    #[test]
    fn report_highlights_subjects_at_risk() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let report = build_report(&loaded_view(90, 100), date);
        assert!(report.contains("# Attendance Report"));
        assert!(report.contains("You can miss up to 20 classes"));
        assert!(report.contains("| Physics | 50% | 5 | 10 | At Risk |"));
        assert!(report.contains("- Physics at 50% (5 of 10 attended)"));
        assert!(!report.contains("- Maths at"));
    }

    #[test]
    fn bar_handles_empty_and_corrupt_counts() {
        assert_eq!(distribution_bar(0, 0), "-".repeat(BAR_WIDTH));
        assert_eq!(distribution_bar(10, -2), "#".repeat(BAR_WIDTH));
        let half = distribution_bar(5, 5);
        assert_eq!(half.matches('#').count(), BAR_WIDTH / 2);
    }
}
