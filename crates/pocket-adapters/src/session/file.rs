//! Session storage persisted to a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use pocket_core::application::error::{ApplicationError, ApplicationResult};
use pocket_core::application::ports::SessionStorage;

/// Keeps the session tier in one JSON object on disk so it survives
/// between runs. Every write rewrites the file.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSession {
    /// Open `path`, starting empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> ApplicationResult<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| ApplicationError::Session {
                reason: format!("{} is not a session file: {e}", path.display()),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ApplicationError::Session {
                    reason: format!("failed to read {}: {e}", path.display()),
                })
            }
        };
        debug!(path = %path.display(), entries = values.len(), "session file opened");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> ApplicationResult<()> {
        let session_error = |e: &dyn std::fmt::Display| ApplicationError::Session {
            reason: format!("failed to write {}: {e}", self.path.display()),
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| session_error(&e))?;
        }
        let raw = serde_json::to_string_pretty(values).map_err(|e| session_error(&e))?;
        fs::write(&self.path, raw).map_err(|e| session_error(&e))
    }
}

impl SessionStorage for FileSession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ApplicationResult<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            if let Err(e) = self.persist(&values) {
                warn!(key, error = %e, "session removal not persisted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn values_survive_reopening() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/session.json");

        let session = FileSession::open(&path).unwrap();
        session.set("coreInternalCheck", r#"{"success":true}"#).unwrap();
        session.set("gone", "1").unwrap();
        session.remove("gone");

        let reopened = FileSession::open(&path).unwrap();
        assert_eq!(
            reopened.get("coreInternalCheck").as_deref(),
            Some(r#"{"success":true}"#)
        );
        assert_eq!(reopened.get("gone"), None);
    }

    #[test]
    fn corrupt_file_is_a_session_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileSession::open(&path),
            Err(ApplicationError::Session { .. })
        ));
    }
}
