//! Remembered-credentials store (`credentials.json`).
//!
//! Deliberately fail-soft on read: a missing, empty, or malformed file is the
//! valid "nothing remembered" state, never an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Overwrites any previously remembered pair.
    pub fn save(&self, username: &str, password: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create credentials directory: {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(&StoredCredentials {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write credentials: {}", self.path.display()))?;
        Ok(())
    }

    /// No-op when nothing is stored.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove credentials: {}", self.path.display())
            })?;
        }
        Ok(())
    }

    /// Returns the remembered pair only when both fields are present and
    /// non-empty.
    pub fn load(&self) -> Option<(String, String)> {
        let contents = fs::read_to_string(&self.path).ok()?;
        if contents.trim().is_empty() {
            return None;
        }
        let creds: StoredCredentials = match serde_json::from_str(&contents) {
            Ok(creds) => creds,
            Err(e) => {
                warn!("Invalid JSON in credentials file: {e}");
                return None;
            }
        };
        if creds.username.is_empty() || creds.password.is_empty() {
            return None;
        }
        Some((creds.username, creds.password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("credentials.json"))
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.save("heister", "no-rest-for-the-wicked").unwrap();
        assert_eq!(
            store.load(),
            Some(("heister".to_string(), "no-rest-for-the-wicked".to_string()))
        );
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        assert_eq!(store(&dir).load(), None);
    }

    #[test]
    fn malformed_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        fs::write(dir.path().join("credentials.json"), "{oops").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn partial_pair_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        fs::write(
            dir.path().join("credentials.json"),
            r#"{"username": "heister", "password": ""}"#,
        )
        .unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn clear_removes_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.save("a", "b").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
        store.clear().unwrap();
    }

    #[test]
    fn save_overwrites_previous_pair() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.save("old", "old-pass").unwrap();
        store.save("new", "new-pass").unwrap();
        assert_eq!(store.load(), Some(("new".into(), "new-pass".into())));
    }
}
