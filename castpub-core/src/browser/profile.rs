use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::{BrowserError, BrowserResult};

/// Ephemeral Chromium user-data directory for one launch. The persisted
/// session lives in the auth-state file, never in the profile, so profiles
/// are disposable.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    id: String,
    path: PathBuf,
    created_at: DateTime<Utc>,
}

impl BrowserProfile {
    fn new(base: PathBuf) -> BrowserResult<Self> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let profile_dir = base.join(&id);
        std::fs::create_dir_all(&profile_dir)
            .map_err(|err| BrowserError::Profile(format!("failed to create profile dir: {err}")))?;
        Ok(Self {
            id,
            path: profile_dir,
            created_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone)]
pub struct ProfileManager {
    base_dir: PathBuf,
    ttl: Duration,
}

impl ProfileManager {
    pub fn new<P: AsRef<Path>>(base_dir: P, ttl: Duration) -> BrowserResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir).map_err(|err| {
            BrowserError::Profile(format!("failed to create profile base dir: {err}"))
        })?;
        Ok(Self { base_dir, ttl })
    }

    /// Profiles live under the system temp dir and survive one day at most.
    pub fn ephemeral() -> BrowserResult<Self> {
        let base = std::env::temp_dir().join("castpub-profiles");
        Self::new(base, Duration::from_secs(24 * 60 * 60))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn allocate(&self) -> BrowserResult<BrowserProfile> {
        BrowserProfile::new(self.base_dir.clone())
    }

    pub fn cleanup_expired(&self) -> BrowserResult<()> {
        let now = SystemTime::now();
        let entries = std::fs::read_dir(&self.base_dir).map_err(|err| {
            BrowserError::Profile(format!("failed to list profile directory: {err}"))
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to read profile metadata");
                    continue;
                }
            };
            if let Ok(modified) = metadata.modified() {
                if now.duration_since(modified).unwrap_or(Duration::ZERO) > self.ttl {
                    if let Err(err) = std::fs::remove_dir_all(&path) {
                        tracing::warn!(path = %path.display(), error = %err, "failed to remove expired profile");
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn allocate_creates_unique_directories() {
        let dir = tempdir().unwrap();
        let manager = ProfileManager::new(dir.path(), Duration::from_secs(60)).unwrap();
        let a = manager.allocate().unwrap();
        let b = manager.allocate().unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.path().is_dir());
        assert!(b.path().is_dir());
    }

    #[test]
    fn cleanup_keeps_fresh_profiles() {
        let dir = tempdir().unwrap();
        let manager = ProfileManager::new(dir.path(), Duration::from_secs(3600)).unwrap();
        let profile = manager.allocate().unwrap();
        manager.cleanup_expired().unwrap();
        assert!(profile.path().is_dir());
    }
}
