use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::Session;

/// Where the authenticated header set lives between commands.
pub trait SessionStore {
    fn load(&self) -> anyhow::Result<Option<Session>>;
    fn save(&self, session: &Session) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
    fn is_authenticated(&self) -> anyhow::Result<bool>;
}

/// On-disk layout of the storage slot.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSlot {
    #[serde(rename = "authHeaders", default)]
    auth_headers: Option<BTreeMap<String, String>>,
    #[serde(rename = "isAuthenticated", default)]
    is_authenticated: bool,
}

impl StoredSlot {
    fn from_session(session: &Session) -> Self {
        Self {
            auth_headers: Some(session.request_headers.clone()),
            is_authenticated: true,
        }
    }

    fn session(&self) -> Option<Session> {
        self.auth_headers.clone().and_then(Session::from_headers)
    }
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slot(&self) -> anyhow::Result<StoredSlot> {
        if !self.path.exists() {
            return Ok(StoredSlot::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file {}", self.path.display()))?;

        match serde_json::from_str(&content) {
            Ok(slot) => Ok(slot),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring unreadable session file");
                Ok(StoredSlot::default())
            }
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> anyhow::Result<Option<Session>> {
        Ok(self.read_slot()?.session())
    }

    /// Writes to a private temp file beside the slot, then renames it over
    /// the slot so a reader never sees a partial file.
    fn save(&self, session: &Session) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let content = serde_json::to_string_pretty(&StoredSlot::from_session(session))?;
        let mut file = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create a temp file in {}", parent.display()))?;
        restrict_to_owner(file.path())?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to write session file {}", self.path.display()))?;

        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove session file {}", self.path.display()))?;
        }
        debug!(path = %self.path.display(), "session cleared");
        Ok(())
    }

    fn is_authenticated(&self) -> anyhow::Result<bool> {
        Ok(self.read_slot()?.is_authenticated)
    }
}

/// The slot carries bearer credentials: owner read/write only.
#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

#[cfg(test)]
impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Option<Session>>> {
        self.slot
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))
    }
}

#[cfg(test)]
impl SessionStore for MemorySessionStore {
    fn load(&self) -> anyhow::Result<Option<Session>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, session: &Session) -> anyhow::Result<()> {
        *self.lock()? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.lock()? = None;
        Ok(())
    }

    fn is_authenticated(&self) -> anyhow::Result<bool> {
        Ok(self.lock()?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> Session {
        let headers: BTreeMap<String, String> = [
            ("Authorization", "Bearer token-1"),
            ("X-Userid", "1001"),
            ("Sessionid", "sess"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Session::from_headers(headers).unwrap()
    }

    #[test]
    fn file_store_round_trips_and_clears_both_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load().unwrap(), None);
        assert!(!store.is_authenticated().unwrap());

        store.save(&sample_session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample_session()));
        assert!(store.is_authenticated().unwrap());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("authHeaders"));
        assert!(raw.contains("isAuthenticated"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        store.save(&sample_session()).unwrap();
        let leftovers = std::fs::read_dir(store.path().parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.is_authenticated().unwrap());
    }

    #[test]
    fn headers_without_user_id_are_not_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"authHeaders":{"Authorization":"Bearer x"},"isAuthenticated":true}"#,
        )
        .unwrap();

        let store = FileSessionStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn overwriting_a_readable_slot_restricts_it() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileSessionStore::new(&path);
        store.save(&sample_session()).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap(), Some(sample_session()));
    }

    #[test]
    fn corrupt_file_reads_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.is_authenticated().unwrap());
    }
}
