use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_BASE_URL: &str = "https://akgecerp.edumarshal.com";
pub const DEFAULT_CONTEXT_ID: &str = "194";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub context_id: String,
    pub session_path: PathBuf,
}

impl Config {
    /// Reads `ERP_BASE_URL`, `ERP_CONTEXT_ID` and `ATTENDANCE_SESSION_PATH`,
    /// falling back to the production ERP and the user's data directory.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("ERP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let context_id =
            std::env::var("ERP_CONTEXT_ID").unwrap_or_else(|_| DEFAULT_CONTEXT_ID.to_string());
        let session_path = match std::env::var_os("ATTENDANCE_SESSION_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_session_path()?,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            context_id,
            session_path,
        })
    }
}

fn default_session_path() -> anyhow::Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .context("could not determine a data directory for the session file")?;
    Ok(data_dir.join("attendance-dashboard").join("session.json"))
}
