use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::models::{AttendanceSummary, Session, UserProfile};
use crate::projection;
use crate::schema::{
    self, AttendanceResponse, DailyAttendanceResponse, ProfileResponse, RawDailyRecord,
    TokenResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request failed with status code {status}")]
    Status {
        status: u16,
        server_error: Option<String>,
    },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid header {0}")]
    Header(String),
}

impl ApiError {
    /// Text shown to the user: the server's `error` field when it sent one,
    /// otherwise a generic description.
    pub fn status_message(&self) -> String {
        match self {
            ApiError::Status {
                server_error: Some(message),
                ..
            } => message.clone(),
            ApiError::Status { status, .. } => format!("Request failed with status code {status}"),
            ApiError::Transport(err) => err.to_string(),
            ApiError::Decode(err) => err.to_string(),
            ApiError::Header(name) => format!("Invalid header {name}"),
        }
    }
}

/// The ERP endpoints the dashboard reads.
#[async_trait]
pub trait ErpApi: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError>;
    async fn fetch_profile(&self, session: &Session) -> Result<UserProfile, ApiError>;
    async fn fetch_attendance(&self, session: &Session) -> Result<AttendanceSummary, ApiError>;
    async fn fetch_daily_attendance(
        &self,
        session: &Session,
        subject_id: &str,
    ) -> Result<Vec<RawDailyRecord>, ApiError>;
}

pub fn profile_path(user_id: &str) -> String {
    format!("/api/User/GetByUserId/{user_id}?y=0")
}

pub fn summary_path(user_id: &str) -> String {
    format!("/api/SubjectAttendance/GetPresentAbsentStudent?isDateWise=false&termId=0&userId={user_id}&y=0")
}

pub fn daily_path(user_id: &str, subject_id: &str) -> String {
    format!(
        "/api/SubjectAttendance/GetPresentAbsentStudent?isDateWise=true&termId=0&userId={user_id}&y=0&subjectId={subject_id}&isDetailed=true"
    )
}

/// Form body of the `/Token` password grant.
pub fn token_form<'a>(username: &'a str, password: &'a str) -> [(&'static str, &'a str); 3] {
    [
        ("grant_type", "password"),
        ("username", username),
        ("password", password),
    ]
}

pub struct HttpErpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpErpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, session: &Session) -> Result<T, ApiError> {
        let url = self.url(path);
        info!(%url, "fetching");
        let response = self
            .client
            .get(&url)
            .headers(header_map(session)?)
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl ErpApi for HttpErpClient {
    async fn authenticate(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let url = self.url("/Token");
        info!(%url, username, "requesting token");

        let response = self
            .client
            .post(&url)
            .form(&token_form(username, password))
            .send()
            .await?;
        read_json(response).await
    }

    async fn fetch_profile(&self, session: &Session) -> Result<UserProfile, ApiError> {
        let profile: ProfileResponse = self.get_json(&profile_path(session.user_id()), session).await?;

        Ok(UserProfile {
            first_name: profile.first_name.unwrap_or_default(),
            last_name: profile.last_name.unwrap_or_default(),
            roll_number: profile
                .roll_number
                .map(|value| value.to_text())
                .unwrap_or_default(),
        })
    }

    async fn fetch_attendance(&self, session: &Session) -> Result<AttendanceSummary, ApiError> {
        let response: AttendanceResponse = self.get_json(&summary_path(session.user_id()), session).await?;
        let details = response.details.unwrap_or_default();
        let subjects = projection::normalize_subjects(details.subjects.as_deref().unwrap_or_default());
        debug!(subjects = subjects.len(), "attendance summary decoded");

        Ok(AttendanceSummary {
            overall_present: schema::count_or_zero(&details.overall_present),
            overall_lecture: schema::count_or_zero(&details.overall_lecture),
            subjects,
        })
    }

    async fn fetch_daily_attendance(
        &self,
        session: &Session,
        subject_id: &str,
    ) -> Result<Vec<RawDailyRecord>, ApiError> {
        let path = daily_path(session.user_id(), subject_id);
        let response: DailyAttendanceResponse = self.get_json(&path, session).await?;
        Ok(response.attendance_data.unwrap_or_default())
    }
}

fn header_map(session: &Session) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &session.request_headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| ApiError::Header(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ApiError::Header(name.clone()))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        warn!(status = status.as_u16(), "request rejected");
        return Err(ApiError::Status {
            status: status.as_u16(),
            server_error: schema::server_error(&body),
        });
    }

    Ok(serde_json::from_str(&body)?)
}
