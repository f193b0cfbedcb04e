use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Session-file override variable.
pub const AUTH_PATH_ENV: &str = "CASTPUB_AUTH_PATH";
/// Failure-screenshot directory override variable.
pub const OUTPUT_DIR_ENV: &str = "CASTPUB_OUTPUT_DIR";

const DEFAULT_AUTH_RELATIVE: &str = ".castpub/credentials/auth.json";
const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";

/// Explicit path overrides, normally sourced from CLI flags. They win over
/// environment variables, which win over the home-directory defaults.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub auth_file: Option<PathBuf>,
    pub screenshot_dir: Option<PathBuf>,
}

/// All environment-derived paths, resolved once at orchestrator entry.
/// Components receive this value; none of them read the environment.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub auth_file: PathBuf,
    pub screenshot_dir: PathBuf,
}

impl ResolvedPaths {
    pub fn resolve(overrides: &PathOverrides) -> Self {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(overrides: &PathOverrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_file = overrides
            .auth_file
            .clone()
            .or_else(|| env(AUTH_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(DEFAULT_AUTH_RELATIVE)
            });
        let screenshot_dir = overrides
            .screenshot_dir
            .clone()
            .or_else(|| env(OUTPUT_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCREENSHOT_DIR));
        Self {
            auth_file,
            screenshot_dir,
        }
    }

    /// Timestamped postmortem screenshot path inside the screenshot dir.
    pub fn screenshot_file(&self, at: DateTime<Utc>) -> PathBuf {
        let stamp = at
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        self.screenshot_dir.join(format!("error-{stamp}.png"))
    }
}
