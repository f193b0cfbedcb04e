use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::session::ExpiredCookiePolicy;

/// Runner configuration for the publish flow. Every field carries a default
/// so the config file is optional; a partial file overrides only the
/// sections it names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RunnerConfig {
    pub chromium: ChromiumSection,
    pub viewport: ViewportSection,
    pub platform: PlatformSection,
    pub timeouts: TimeoutSection,
    pub advance: AdvanceSection,
    pub selectors: SelectorSection,
    pub session: SessionSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChromiumSection {
    /// Explicit Chromium binary; autodetected when absent.
    pub executable_path: Option<String>,
    pub headless: bool,
    pub sandbox: bool,
    pub disable_gpu: bool,
    pub mute_audio: bool,
    pub lang: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

impl Default for ChromiumSection {
    fn default() -> Self {
        Self {
            executable_path: None,
            headless: true,
            sandbox: true,
            disable_gpu: true,
            mute_audio: true,
            lang: None,
            request_timeout_seconds: Some(60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewportSection {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Default for ViewportSection {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 900,
            device_scale_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformSection {
    pub base_url: String,
    pub login_path: String,
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            base_url: "https://creators.spotify.com".to_string(),
            login_path: "/pod/login".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    /// Quiescence wait after navigation; expiry is tolerated.
    pub navigation_seconds: u64,
    /// Upload plus server-side processing, proxied by the next control.
    pub upload_ready_seconds: u64,
    /// Everything else: element visibility, publish control enablement.
    pub step_seconds: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            navigation_seconds: 10,
            upload_ready_seconds: 180,
            step_seconds: 20,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvanceSection {
    pub max_attempts: usize,
    pub verify_timeout_seconds: u64,
    pub retry_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for AdvanceSection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            verify_timeout_seconds: 6,
            retry_delay_ms: 750,
            jitter_ms: 250,
        }
    }
}

/// CSS selectors for the episode wizard. Kept in configuration because the
/// remote DOM changes more often than the flow does.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorSection {
    pub file_input: String,
    pub next_button: String,
    pub title_input: String,
    pub description_editor: String,
    pub season_input: String,
    pub episode_input: String,
    pub publish_now_option: String,
    pub publish_button: String,
    pub confirm_close: String,
    pub consent_overlay: String,
    pub consent_accept: String,
    pub notification_dismiss: String,
}

impl Default for SelectorSection {
    fn default() -> Self {
        Self {
            file_input: "input[type='file']".to_string(),
            next_button: "button[data-testid='wizard-next-button']".to_string(),
            title_input: "input[name='title']".to_string(),
            description_editor: "div[role='textbox'][data-slate-editor='true']".to_string(),
            season_input: "input[name='seasonNumber']".to_string(),
            episode_input: "input[name='episodeNumber']".to_string(),
            publish_now_option: "input[data-testid='publish-date-now']".to_string(),
            publish_button: "button[data-testid='publish-button']".to_string(),
            confirm_close: "button[data-testid='episode-published-close']".to_string(),
            consent_overlay: "#onetrust-consent-sdk".to_string(),
            consent_accept: "#onetrust-accept-btn-handler".to_string(),
            notification_dismiss: "div[role='alert'] button[aria-label='Close']".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub max_age_hours: f64,
    pub expired_cookie_policy: ExpiredCookiePolicy,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_age_hours: 720.0,
            expired_cookie_policy: ExpiredCookiePolicy::Warn,
        }
    }
}

pub fn load_runner_config<P: AsRef<Path>>(path: P) -> Result<RunnerConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn load_fixture_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/castpub.toml");
        let config = load_runner_config(path).expect("fixture config should parse");
        assert!(config.chromium.headless);
        assert_eq!(config.platform.base_url, "https://creators.spotify.com");
        assert!(!config.selectors.file_input.is_empty());
    }

    #[test]
    fn partial_file_keeps_defaults_elsewhere() {
        let config: RunnerConfig = toml::from_str(
            r#"
            [timeouts]
            upload_ready_seconds = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.timeouts.upload_ready_seconds, 30);
        assert_eq!(config.timeouts.navigation_seconds, 10);
        assert_eq!(config.advance.max_attempts, 3);
    }

    #[test]
    fn empty_input_is_all_defaults() {
        let config: RunnerConfig = toml::from_str("").unwrap();
        assert_eq!(config.viewport.width, 1366);
        assert!(matches!(
            config.session.expired_cookie_policy,
            ExpiredCookiePolicy::Warn
        ));
    }
}
