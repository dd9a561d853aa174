use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::api::{ApiError, ErpApi};
use crate::models::Session;
use crate::schema::{self, TokenResponse};
use crate::session::SessionStore;

pub const LOGIN_MISSING_DATA: &str = "Login failed: Missing required data in response.";
pub const LOGIN_SUCCESS: &str = "Login successful!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    LoggedIn(Session),
}

impl AuthState {
    pub fn from_store(store: &dyn SessionStore) -> anyhow::Result<Self> {
        Ok(match store.load()? {
            Some(session) => AuthState::LoggedIn(session),
            None => AuthState::LoggedOut,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::LoggedIn(session) => Some(session),
            AuthState::LoggedOut => None,
        }
    }
}

/// Where a navigation request actually lands.
pub fn resolve_route(requested: Route, state: &AuthState) -> Route {
    match (requested, state) {
        (Route::Root, AuthState::LoggedOut) => Route::Login,
        (Route::Root, AuthState::LoggedIn(_)) => resolve_route(Route::Login, state),
        (Route::Dashboard, AuthState::LoggedOut) => Route::Login,
        (Route::Login, AuthState::LoggedIn(_)) => Route::Dashboard,
        (route, _) => route,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn(Session),
    Failed(String),
}

/// Builds the header set for authenticated calls. All four credential
/// fields must be present and non-empty.
pub fn session_from_token(token: &TokenResponse, context_id: &str) -> Option<Session> {
    let access_token = schema::truthy(&token.access_token)?.to_text();
    let session_id = schema::truthy(&token.session_id)?.to_text();
    let user_id = schema::truthy(&token.user_id)?.to_text();
    let x_token = schema::truthy(&token.x_token)?.to_text();

    let headers: BTreeMap<String, String> = [
        ("Authorization", format!("Bearer {access_token}")),
        ("X-Wb", "1".to_string()),
        ("Sessionid", session_id),
        ("X-Contextid", context_id.to_string()),
        ("X-Userid", user_id),
        ("X_token", x_token),
        ("X-Rx", "1".to_string()),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect();

    Session::from_headers(headers)
}

/// Exchanges credentials for a session and stores it. Remote or validation
/// failures leave the store untouched.
pub async fn login(
    api: &dyn ErpApi,
    store: &dyn SessionStore,
    username: &str,
    password: &str,
    context_id: &str,
) -> anyhow::Result<LoginOutcome> {
    let token = match api.authenticate(username, password).await {
        Ok(token) => token,
        Err(ApiError::Decode(err)) => {
            warn!(error = %err, "token response is not a credential object");
            return Ok(LoginOutcome::Failed(LOGIN_MISSING_DATA.to_string()));
        }
        Err(err) => {
            warn!(error = %err, "token request failed");
            return Ok(LoginOutcome::Failed(format!("Error: {}", err.status_message())));
        }
    };

    let Some(session) = session_from_token(&token, context_id) else {
        warn!("token response missing credential fields");
        return Ok(LoginOutcome::Failed(LOGIN_MISSING_DATA.to_string()));
    };

    store.save(&session)?;
    info!(user_id = session.user_id(), "logged in");
    Ok(LoginOutcome::LoggedIn(session))
}

pub fn logout(store: &dyn SessionStore) -> anyhow::Result<()> {
    store.clear()?;
    info!("logged out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::{AttendanceSummary, UserProfile};
    use crate::schema::RawDailyRecord;
    use crate::session::MemorySessionStore;

    struct TokenOnlyApi {
        response: Result<&'static str, u16>,
    }

    #[async_trait]
    impl ErpApi for TokenOnlyApi {
        async fn authenticate(&self, _: &str, _: &str) -> Result<TokenResponse, ApiError> {
            match self.response {
                Ok(body) => Ok(serde_json::from_str(body)?),
                Err(status) => Err(ApiError::Status {
                    status,
                    server_error: Some("invalid_grant".to_string()),
                }),
            }
        }

        async fn fetch_profile(&self, _: &Session) -> Result<UserProfile, ApiError> {
            Err(ApiError::Status { status: 500, server_error: None })
        }

        async fn fetch_attendance(&self, _: &Session) -> Result<AttendanceSummary, ApiError> {
            Err(ApiError::Status { status: 500, server_error: None })
        }

        async fn fetch_daily_attendance(
            &self,
            _: &Session,
            _: &str,
        ) -> Result<Vec<RawDailyRecord>, ApiError> {
            Err(ApiError::Status { status: 500, server_error: None })
        }
    }

    const FULL_TOKEN: &str =
        r#"{"access_token":"abc","SessionId":"s-1","X-UserId":42,"X_Token":"xt"}"#;

    #[tokio::test]
    async fn successful_login_stores_full_header_set() {
        let api = TokenOnlyApi { response: Ok(FULL_TOKEN) };
        let store = MemorySessionStore::new();

        let outcome = login(&api, &store, "student", "secret", "194").await.unwrap();
        let LoginOutcome::LoggedIn(session) = outcome else {
            panic!("expected login to succeed");
        };

        assert_eq!(session.bearer_token, "abc");
        let headers = &session.request_headers;
        assert_eq!(headers["Authorization"], "Bearer abc");
        assert_eq!(headers["Sessionid"], "s-1");
        assert_eq!(headers["X-Contextid"], "194");
        assert_eq!(headers["X-Userid"], "42");
        assert_eq!(headers["X_token"], "xt");
        assert_eq!(headers["X-Wb"], "1");
        assert_eq!(headers["X-Rx"], "1");
        assert_eq!(store.load().unwrap(), Some(session));
    }

    #[tokio::test]
    async fn missing_x_token_keeps_user_logged_out() {
        let api = TokenOnlyApi {
            response: Ok(r#"{"access_token":"abc","SessionId":"s-1","X-UserId":42}"#),
        };
        let store = MemorySessionStore::new();

        let outcome = login(&api, &store, "student", "secret", "194").await.unwrap();
        assert_eq!(outcome, LoginOutcome::Failed(LOGIN_MISSING_DATA.to_string()));

        let state = AuthState::from_store(&store).unwrap();
        assert_eq!(state, AuthState::LoggedOut);
        assert_eq!(resolve_route(Route::Dashboard, &state), Route::Login);
    }

    #[tokio::test]
    async fn malformed_token_bodies_report_missing_data() {
        for body in ["[]", "null", r#""ok""#, r#"{"access_token":[1],"SessionId":"s-1","X-UserId":42,"X_Token":"xt"}"#] {
            let api = TokenOnlyApi { response: Ok(body) };
            let store = MemorySessionStore::new();

            let outcome = login(&api, &store, "student", "secret", "194").await.unwrap();
            assert_eq!(
                outcome,
                LoginOutcome::Failed(LOGIN_MISSING_DATA.to_string()),
                "body {body}"
            );
            assert!(!store.is_authenticated().unwrap());
        }
    }

    #[tokio::test]
    async fn rejected_credentials_surface_server_error() {
        let api = TokenOnlyApi { response: Err(400) };
        let store = MemorySessionStore::new();

        let outcome = login(&api, &store, "student", "wrong", "194").await.unwrap();
        assert_eq!(outcome, LoginOutcome::Failed("Error: invalid_grant".to_string()));
        assert!(!store.is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn logout_redirects_dashboard_to_login() {
        let api = TokenOnlyApi { response: Ok(FULL_TOKEN) };
        let store = MemorySessionStore::new();
        login(&api, &store, "student", "secret", "194").await.unwrap();

        let state = AuthState::from_store(&store).unwrap();
        assert_eq!(resolve_route(Route::Dashboard, &state), Route::Dashboard);
        assert_eq!(resolve_route(Route::Login, &state), Route::Dashboard);

        logout(&store).unwrap();
        assert!(!store.is_authenticated().unwrap());
        let state = AuthState::from_store(&store).unwrap();
        assert_eq!(resolve_route(Route::Dashboard, &state), Route::Login);
        assert_eq!(resolve_route(Route::Root, &state), Route::Login);
    }
}
