use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::state::AuthState;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session file not found or unreadable at {path}: {source}")]
    NotFound { path: PathBuf, source: io::Error },
    #[error("session file at {path} is corrupted or improperly formatted: {detail}")]
    Parse { path: PathBuf, detail: String },
    #[error("failed to write session file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Reads and writes the serialized session file. No policy here: age and
/// cookie expiry checks live in the validator.
#[derive(Debug, Clone)]
pub struct AuthStateStore {
    path: PathBuf,
}

impl AuthStateStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Overwrites the file with a pretty-printed snapshot, creating parent
    /// directories as needed. A crash mid-write is an accepted risk.
    pub fn save(&self, state: &AuthState) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(state).map_err(|err| StoreError::Parse {
            path: self.path.clone(),
            detail: err.to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Reads and parses the file. Missing `cookies` or `timestamp` is a
    /// parse failure, not a softer condition.
    pub fn load(&self) -> StoreResult<AuthState> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| StoreError::NotFound {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|err| StoreError::Parse {
            path: self.path.clone(),
            detail: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionCookie;
    use tempfile::tempdir;

    fn sample_state() -> AuthState {
        AuthState::capture(vec![SessionCookie {
            name: "sp_t".to_string(),
            value: "token".to_string(),
            domain: ".spotify.com".to_string(),
            path: "/".to_string(),
            expires: 1_900_000_000.0,
            http_only: true,
            secure: true,
            same_site: Some("Lax".to_string()),
        }])
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = AuthStateStore::new(dir.path().join("nested/auth.json"));
        let state = sample_state();
        store.save(&state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.cookies, state.cookies);
        assert_eq!(loaded.timestamp, state.timestamp);
    }

    #[test]
    fn exists_is_a_pure_check() {
        let dir = tempdir().unwrap();
        let store = AuthStateStore::new(dir.path().join("auth.json"));
        assert!(!store.exists());
        store.save(&sample_state()).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = AuthStateStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = AuthStateStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn missing_timestamp_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, r#"{"cookies": []}"#).unwrap();
        let store = AuthStateStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn missing_cookies_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, r#"{"timestamp": 1700000000000}"#).unwrap();
        let store = AuthStateStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
    }
}
