use tracing::{debug, warn};

use crate::api::ErpApi;
use crate::models::{
    AttendanceSummary, DailyAttendanceRecord, ProjectionResult, Session, SubjectAttendance,
    UserProfile,
};
use crate::projection;

pub const RECORDS_PER_PAGE: usize = 10;

/// Paginated view over one subject's daily records. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyPager {
    records: Vec<DailyAttendanceRecord>,
    current_page: usize,
}

impl DailyPager {
    pub fn new(records: Vec<DailyAttendanceRecord>) -> Self {
        Self {
            records,
            current_page: 1,
        }
    }

    pub fn records(&self) -> &[DailyAttendanceRecord] {
        &self.records
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.records.len().div_ceil(RECORDS_PER_PAGE)
    }

    pub fn current_records(&self) -> &[DailyAttendanceRecord] {
        let start = (self.current_page - 1) * RECORDS_PER_PAGE;
        let end = (start + RECORDS_PER_PAGE).min(self.records.len());
        self.records.get(start..end).unwrap_or_default()
    }

    pub fn next(&mut self) {
        self.go_to(self.current_page + 1);
    }

    pub fn previous(&mut self) {
        self.go_to(self.current_page.saturating_sub(1));
    }

    pub fn go_to(&mut self, page: usize) {
        self.current_page = page.min(self.total_pages()).max(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    Load,
    SelectSubject(String),
    NextPage,
    PreviousPage,
    GoToPage(usize),
    CloseDetail,
}

/// State of the dashboard for one signed-in session.
pub struct DashboardView {
    session: Session,
    pub profile: Option<UserProfile>,
    pub summary: AttendanceSummary,
    pub status_messages: Vec<String>,
    pub selected_subject: Option<SubjectAttendance>,
    pub detail: Option<DailyPager>,
}

impl DashboardView {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            profile: None,
            summary: AttendanceSummary::default(),
            status_messages: Vec::new(),
            selected_subject: None,
            detail: None,
        }
    }

    pub fn projection(&self) -> ProjectionResult {
        projection::project(self.summary.overall_present, self.summary.overall_lecture)
    }

    pub fn subjects(&self) -> &[SubjectAttendance] {
        &self.summary.subjects
    }

    pub async fn dispatch(&mut self, api: &dyn ErpApi, event: DashboardEvent) {
        debug!(?event, "dashboard event");
        match event {
            DashboardEvent::Load => self.load(api).await,
            DashboardEvent::SelectSubject(name) => self.select_subject(api, &name).await,
            DashboardEvent::NextPage => {
                if let Some(pager) = self.detail.as_mut() {
                    pager.next();
                }
            }
            DashboardEvent::PreviousPage => {
                if let Some(pager) = self.detail.as_mut() {
                    pager.previous();
                }
            }
            DashboardEvent::GoToPage(page) => {
                if let Some(pager) = self.detail.as_mut() {
                    pager.go_to(page);
                }
            }
            DashboardEvent::CloseDetail => self.detail = None,
        }
    }

    async fn load(&mut self, api: &dyn ErpApi) {
        let (profile, summary) = tokio::join!(
            api.fetch_profile(&self.session),
            api.fetch_attendance(&self.session)
        );

        match profile {
            Ok(profile) => {
                self.profile = Some(profile);
                self.status_messages
                    .push("User details fetched successfully!".to_string());
            }
            Err(err) => {
                warn!(error = %err, "user details unavailable");
                self.status_messages.push(format!(
                    "Error fetching user details: {}",
                    err.status_message()
                ));
            }
        }

        match summary {
            Ok(summary) => self.summary = summary,
            Err(err) => {
                warn!(error = %err, "attendance summary unavailable");
                self.status_messages.push(format!(
                    "Error fetching attendance data: {}",
                    err.status_message()
                ));
            }
        }
    }

    async fn select_subject(&mut self, api: &dyn ErpApi, name: &str) {
        let Some(subject) = self
            .summary
            .subjects
            .iter()
            .find(|subject| subject.name == name)
            .cloned()
        else {
            self.status_messages
                .push("Error: Could not find subject details".to_string());
            return;
        };

        self.selected_subject = Some(subject.clone());
        let Some(subject_id) = subject.id else {
            self.status_messages
                .push("Error: Could not find subject details".to_string());
            return;
        };

        match api.fetch_daily_attendance(&self.session, &subject_id).await {
            Ok(raw) => {
                let records = projection::shape_daily_records(&raw, &subject_id);
                debug!(subject_id = %subject_id, records = records.len(), "daily attendance loaded");
                self.detail = Some(DailyPager::new(records));
            }
            Err(err) => {
                warn!(error = %err, "daily attendance unavailable");
                self.status_messages.push(format!(
                    "Error fetching daily attendance: {}",
                    err.status_message()
                ));
            }
        }
    }
}
