use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::browser::{BrowserAutomation, BrowserContext, BrowserError, BrowserLauncher, CdpWizardSurface};
use crate::config::RunnerConfig;
use crate::paths::ResolvedPaths;
use crate::session::{AuthStateStore, SessionError, SessionValidator};
use crate::wizard::{EpisodeDetails, WizardStepDriver, WizardStepError};

use super::options::{resolve_audio_source, InputError, UploadOptions};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Wizard(#[from] WizardStepError),
}

impl UploadError {
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            UploadError::Session(err) => Some(err.remediation()),
            _ => None,
        }
    }

    /// Whether a fresh capture (or corrected input) is expected to fix the
    /// condition. Surfaced as data; the caller decides termination.
    pub fn recoverable(&self) -> bool {
        match self {
            UploadError::Session(err) => err.recoverable(),
            _ => true,
        }
    }
}

/// The fully resolved parameter set for one run; also the structured
/// payload a dry run reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedUpload {
    pub show_id: String,
    pub audio_path: PathBuf,
    pub title: String,
    pub description: String,
    pub season: String,
    pub episode: String,
}

#[derive(Debug)]
pub enum UploadOutcome {
    /// Parameters resolved and echoed; no session or browser activity.
    DryRun(ResolvedUpload),
    Published(ResolvedUpload),
}

impl UploadOutcome {
    pub fn resolved(&self) -> &ResolvedUpload {
        match self {
            UploadOutcome::DryRun(resolved) | UploadOutcome::Published(resolved) => resolved,
        }
    }
}

/// Top-level publish use case: resolve input, gate on the saved session,
/// launch a seeded browser, drive the wizard, and tear everything down on
/// every exit path.
pub struct UploadOrchestrator {
    config: Arc<RunnerConfig>,
    paths: ResolvedPaths,
}

impl UploadOrchestrator {
    pub fn new(config: Arc<RunnerConfig>, paths: ResolvedPaths) -> Self {
        Self { config, paths }
    }

    pub async fn run(&self, options: UploadOptions) -> Result<UploadOutcome, UploadError> {
        let resolved = self.resolve(&options)?;

        if options.dry_run {
            info!(show_id = %resolved.show_id, "dry run, skipping session and browser");
            return Ok(UploadOutcome::DryRun(resolved));
        }

        // Fail fast on a known-bad session, before the browser launch.
        let store = AuthStateStore::new(self.paths.auth_file.clone());
        let validator = SessionValidator::new(store)
            .with_policy(self.config.session.expired_cookie_policy);
        let report = validator.validate(self.config.session.max_age_hours)?;
        info!(
            cookies = report.state.cookies.len(),
            warnings = report.warnings.len(),
            "session validated"
        );

        let launcher = BrowserLauncher::new(Arc::clone(&self.config))?;
        let automation = launcher.launch().await?;
        let outcome = self
            .drive(&automation, &validator, report.state.user_agent.as_deref(), &resolved)
            .await;
        if let Err(err) = automation.shutdown().await {
            warn!(error = %err, "browser teardown reported an error");
        }
        outcome?;
        Ok(UploadOutcome::Published(resolved))
    }

    /// Resolves the audio source and fills in the defaults for the optional
    /// numeric identifiers: season "1", episode a timestamp-derived value
    /// unique across unattended runs.
    fn resolve(&self, options: &UploadOptions) -> Result<ResolvedUpload, InputError> {
        let audio_path = resolve_audio_source(&options.audio_path)?;
        let season = options.season.clone().unwrap_or_else(|| "1".to_string());
        let episode = options
            .episode
            .clone()
            .unwrap_or_else(|| Utc::now().timestamp().to_string());
        Ok(ResolvedUpload {
            show_id: options.show_id.clone(),
            audio_path,
            title: options.title.clone(),
            description: options.description.clone(),
            season,
            episode,
        })
    }

    fn wizard_url(&self, show_id: &str) -> String {
        format!(
            "{}/pod/show/{}/episode/wizard",
            self.config.platform.base_url.trim_end_matches('/'),
            show_id
        )
    }

    async fn drive(
        &self,
        automation: &BrowserAutomation,
        validator: &SessionValidator,
        user_agent: Option<&str>,
        resolved: &ResolvedUpload,
    ) -> Result<(), UploadError> {
        let mut context = automation.new_context().await?;
        if let Some(agent) = user_agent {
            context.set_user_agent(agent).await?;
        }
        validator.apply_to(&mut context).await?;

        let details = EpisodeDetails {
            title: resolved.title.clone(),
            description: resolved.description.clone(),
            audio_file: resolved.audio_path.clone(),
            season: Some(resolved.season.clone()),
            episode: Some(resolved.episode.clone()),
        };
        let url = self.wizard_url(&resolved.show_id);
        let poll = Duration::from_millis(self.config.timeouts.poll_interval_ms);

        let mut surface = CdpWizardSurface::new(&context, poll);
        let mut driver = WizardStepDriver::new(&mut surface, &self.config);
        match driver.run(&url, &details).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(step = err.failed_step(), error = %err, "wizard run failed");
                self.capture_failure_screenshot(&context, err.failed_step())
                    .await;
                Err(err.into())
            }
        }
    }

    /// Best-effort postmortem capture; never masks the original failure.
    async fn capture_failure_screenshot(&self, context: &BrowserContext, step: &str) {
        let target = self.paths.screenshot_file(Utc::now());
        if let Some(parent) = target.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(error = %err, dir = %parent.display(), "cannot create screenshot directory");
                return;
            }
        }
        match context.screenshot_full_page().await {
            Ok(bytes) => match std::fs::write(&target, bytes) {
                Ok(()) => info!(step, path = %target.display(), "failure screenshot saved"),
                Err(err) => warn!(error = %err, path = %target.display(), "cannot write screenshot"),
            },
            Err(err) => warn!(error = %err, step, "screenshot capture failed"),
        }
    }
}
