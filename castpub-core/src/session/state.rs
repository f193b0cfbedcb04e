use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Expiry value that marks a session-only cookie (no persistent expiry).
pub const SESSION_COOKIE_SENTINEL: f64 = -1.0;

fn default_cookie_path() -> String {
    "/".to_string()
}

fn session_only() -> f64 {
    SESSION_COOKIE_SENTINEL
}

/// One cookie of a captured browser session, serialized with the CDP field
/// names so a capture can be written back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Epoch seconds, or a negative sentinel for session-only cookies.
    #[serde(default = "session_only")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl SessionCookie {
    pub fn is_session_only(&self) -> bool {
        self.expires < 0.0
    }

    pub fn is_expired(&self, now_epoch_seconds: f64) -> bool {
        !self.is_session_only() && self.expires < now_epoch_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

/// Serialized session snapshot. `cookies` and `timestamp` are mandatory;
/// a file missing either is structurally invalid no matter how recent.
/// The snapshot is never mutated in place, only replaced by a new capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub cookies: Vec<SessionCookie>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_storage: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_storage: Option<BTreeMap<String, String>>,
    /// Capture time, epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportSize>,
}

impl AuthState {
    /// Snapshot freshly-captured cookies with the current timestamp.
    pub fn capture(cookies: Vec<SessionCookie>) -> Self {
        Self {
            cookies,
            local_storage: None,
            session_storage: None,
            timestamp: Utc::now().timestamp_millis(),
            expires_at: None,
            user_agent: None,
            viewport: None,
        }
    }

    pub fn age_hours(&self, now_epoch_ms: i64) -> f64 {
        (now_epoch_ms - self.timestamp) as f64 / 3_600_000.0
    }
}
