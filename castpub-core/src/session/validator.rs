use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::state::{AuthState, SessionCookie};
use super::store::{AuthStateStore, StoreError};

pub const DEFAULT_MAX_AGE_HOURS: f64 = 720.0;

/// What to do when an individual cookie has expired while the snapshot as a
/// whole is still within its age limit. Expiry of one cookie does not imply
/// expiry of the platform session, so the default only warns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiredCookiePolicy {
    #[default]
    Warn,
    Fail,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file not found or unreadable at {path}")]
    NotFound { path: PathBuf },
    #[error("session file is corrupted: {detail}")]
    Corrupt { detail: String },
    #[error("session is {age_hours:.1}h old, older than the {max_age_hours:.0}h limit")]
    Expired { age_hours: f64, max_age_hours: f64 },
    #[error("cookie '{name}' expired {expired_hours_ago:.1}h ago")]
    CookieExpired {
        name: String,
        expired_hours_ago: f64,
    },
    #[error("failed to re-load session state for the browser context: {detail}")]
    Load { detail: String },
    #[error("failed to install session state into the browser context: {detail}")]
    Apply { detail: String },
}

impl SessionError {
    /// Actionable hint for the operator; the CLI prints it next to the error.
    pub fn remediation(&self) -> &'static str {
        match self {
            SessionError::NotFound { .. } => {
                "run `castpubctl auth capture` to create the session file, \
                 or point CASTPUB_AUTH_PATH at an existing one"
            }
            SessionError::Corrupt { .. } => {
                "the session file cannot be used; re-run `castpubctl auth capture`"
            }
            SessionError::Expired { .. } | SessionError::CookieExpired { .. } => {
                "the saved session is stale; re-run `castpubctl auth capture`"
            }
            SessionError::Load { .. } | SessionError::Apply { .. } => {
                "the session file changed or became unreadable mid-run; retry the upload"
            }
        }
    }

    /// Whether re-running the capture step is expected to fix the condition.
    /// The caller decides process termination, never this layer.
    pub fn recoverable(&self) -> bool {
        !matches!(
            self,
            SessionError::Load { .. } | SessionError::Apply { .. }
        )
    }
}

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Destination for a validated session, normally a fresh browser context.
/// A seam so validation logic stays testable without a browser.
#[async_trait(?Send)]
pub trait CookieSink {
    async fn install_cookies(&mut self, cookies: &[SessionCookie]) -> Result<(), SinkError>;
    async fn install_storage(
        &mut self,
        local: &BTreeMap<String, String>,
        session: &BTreeMap<String, String>,
    ) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CookieWarning {
    pub name: String,
    pub expired_hours_ago: f64,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub state: AuthState,
    pub warnings: Vec<CookieWarning>,
}

/// Policy layer over [`AuthStateStore`]: structural validation, age limit,
/// expiry-aware cookie scan, and installation into a [`CookieSink`].
/// Validation is split from application so callers can fail fast before the
/// expensive browser launch.
#[derive(Debug, Clone)]
pub struct SessionValidator {
    store: AuthStateStore,
    policy: ExpiredCookiePolicy,
}

impl SessionValidator {
    pub fn new(store: AuthStateStore) -> Self {
        Self {
            store,
            policy: ExpiredCookiePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ExpiredCookiePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &AuthStateStore {
        &self.store
    }

    pub fn validate(&self, max_age_hours: f64) -> Result<SessionReport, SessionError> {
        let state = self.store.load().map_err(map_store_error)?;

        let age_hours = state.age_hours(Utc::now().timestamp_millis());
        if age_hours > max_age_hours {
            return Err(SessionError::Expired {
                age_hours,
                max_age_hours,
            });
        }

        let warnings = self.scan_cookie_expiries(&state)?;
        debug!(
            cookies = state.cookies.len(),
            warnings = warnings.len(),
            age_hours = format_args!("{age_hours:.1}"),
            "session snapshot accepted"
        );
        Ok(SessionReport { state, warnings })
    }

    /// Exactly one warning per expired persistent cookie; the session-only
    /// sentinel never warns. Under the `Fail` policy the first expired
    /// cookie escalates to a hard error instead.
    fn scan_cookie_expiries(
        &self,
        state: &AuthState,
    ) -> Result<Vec<CookieWarning>, SessionError> {
        let now_seconds = Utc::now().timestamp_millis() as f64 / 1000.0;
        let mut warnings = Vec::new();
        for cookie in &state.cookies {
            if !cookie.is_expired(now_seconds) {
                continue;
            }
            let expired_hours_ago = (now_seconds - cookie.expires) / 3600.0;
            if self.policy == ExpiredCookiePolicy::Fail {
                return Err(SessionError::CookieExpired {
                    name: cookie.name.clone(),
                    expired_hours_ago,
                });
            }
            warn!(
                cookie = %cookie.name,
                expired_hours_ago = format_args!("{expired_hours_ago:.1}"),
                "cookie has expired; overall session may still be valid"
            );
            warnings.push(CookieWarning {
                name: cookie.name.clone(),
                expired_hours_ago,
            });
        }
        Ok(warnings)
    }

    /// Installs the persisted session into a fresh context. Re-reads the
    /// file; unreachable parse failures here surface as `Load` rather than
    /// panicking on state already vetted by `validate`.
    pub async fn apply_to(&self, sink: &mut dyn CookieSink) -> Result<(), SessionError> {
        let state = self.store.load().map_err(|err| SessionError::Load {
            detail: err.to_string(),
        })?;
        sink.install_cookies(&state.cookies)
            .await
            .map_err(|err| SessionError::Apply {
                detail: err.to_string(),
            })?;
        let empty = BTreeMap::new();
        let local = state.local_storage.as_ref().unwrap_or(&empty);
        let session = state.session_storage.as_ref().unwrap_or(&empty);
        if !local.is_empty() || !session.is_empty() {
            sink.install_storage(local, session)
                .await
                .map_err(|err| SessionError::Apply {
                    detail: err.to_string(),
                })?;
        }
        Ok(())
    }
}

fn map_store_error(err: StoreError) -> SessionError {
    match err {
        StoreError::NotFound { path, .. } => SessionError::NotFound { path },
        StoreError::Parse { detail, .. } => SessionError::Corrupt { detail },
        StoreError::Write { path, source } => SessionError::Corrupt {
            detail: format!("unexpected write failure for {}: {source}", path.display()),
        },
    }
}
