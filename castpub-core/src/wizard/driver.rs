use std::fmt;
use std::path::Path;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::{AdvanceSection, RunnerConfig, SelectorSection, TimeoutSection};

use super::details::EpisodeDetails;
use super::overlay::OverlayPolicy;
use super::surface::{SurfaceError, WizardSurface};

/// Where the driver currently is in the episode-creation flow. Each screen
/// transition carries its own wait/retry policy; the enum exists so a
/// failure can name the screen it happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    NotStarted,
    PageLoaded,
    AudioUploading,
    AudioReady,
    DetailsFilled,
    NextClicked,
    PublishOptionSelected,
    Published,
    Done,
}

impl WizardStep {
    pub const fn name(self) -> &'static str {
        match self {
            WizardStep::NotStarted => "not_started",
            WizardStep::PageLoaded => "page_loaded",
            WizardStep::AudioUploading => "audio_uploading",
            WizardStep::AudioReady => "audio_ready",
            WizardStep::DetailsFilled => "details_filled",
            WizardStep::NextClicked => "next_clicked",
            WizardStep::PublishOptionSelected => "publish_option_selected",
            WizardStep::Published => "published",
            WizardStep::Done => "done",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum WizardFailure {
    #[error("timed out after {waited_secs}s waiting for {what}")]
    Timeout { what: String, waited_secs: u64 },
    #[error("next screen did not appear after {attempts} advance attempts")]
    AdvanceNotConfirmed { attempts: usize },
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// A wizard failure tagged with the step it happened on. The driver does
/// not take screenshots or retry whole runs; it reports where it was and
/// leaves recovery to the caller.
#[derive(Debug, Error)]
#[error("wizard step {step} failed: {failure}")]
pub struct WizardStepError {
    pub step: WizardStep,
    #[source]
    pub failure: WizardFailure,
}

impl WizardStepError {
    pub fn failed_step(&self) -> &'static str {
        self.step.name()
    }
}

/// Drives a single episode through the creator site's upload wizard.
///
/// Borrowing the surface instead of owning it leaves the underlying page
/// with the caller, which still needs it for postmortem screenshots after
/// a failed run.
pub struct WizardStepDriver<'a> {
    surface: &'a mut dyn WizardSurface,
    selectors: SelectorSection,
    timeouts: TimeoutSection,
    advance: AdvanceSection,
    overlay: OverlayPolicy,
    step: WizardStep,
}

impl<'a> WizardStepDriver<'a> {
    pub fn new(surface: &'a mut dyn WizardSurface, config: &RunnerConfig) -> Self {
        let overlay = OverlayPolicy::new(
            config.selectors.consent_overlay.clone(),
            config.selectors.consent_accept.clone(),
        );
        Self {
            surface,
            selectors: config.selectors.clone(),
            timeouts: config.timeouts.clone(),
            advance: config.advance.clone(),
            overlay,
            step: WizardStep::NotStarted,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Runs the full transition sequence. On error the driver stays at the
    /// failing step; [`WizardStepError::failed_step`] names it.
    pub async fn run(
        &mut self,
        wizard_url: &str,
        details: &EpisodeDetails,
    ) -> Result<(), WizardStepError> {
        self.open_wizard(wizard_url).await?;
        self.upload_audio(&details.audio_file).await?;
        self.fill_details(details).await?;
        self.advance_past_details().await?;
        self.publish_now().await?;
        self.confirm_and_close().await?;
        self.step = WizardStep::Done;
        info!(url = wizard_url, "wizard run complete");
        Ok(())
    }

    async fn open_wizard(&mut self, url: &str) -> Result<(), WizardStepError> {
        self.step = WizardStep::NotStarted;
        debug!(url, "opening episode wizard");
        let nav = self.surface.goto(url).await;
        nav.map_err(|err| self.fail(err.into()))?;

        // Heavy single-page app; it may never report idle. A quiescence
        // timeout here is tolerated, not fatal.
        let settled = self
            .surface
            .wait_for_idle(self.timeouts.navigation_seconds)
            .await;
        match settled {
            Ok(true) => {}
            Ok(false) => debug!("page never reported idle, proceeding optimistically"),
            Err(err) => return Err(self.fail(err.into())),
        }

        // The consent banner intercepts clicks while visible; clear it
        // before any interaction.
        self.overlay.dismiss(&mut *self.surface).await;
        self.step = WizardStep::PageLoaded;
        Ok(())
    }

    async fn upload_audio(&mut self, audio_file: &Path) -> Result<(), WizardStepError> {
        let file_input = self.selectors.file_input.clone();
        let found = self
            .wait_until_exists(&file_input, self.timeouts.step_seconds)
            .await?;
        if !found {
            return Err(self.timeout(format!("file input {file_input}")));
        }

        debug!(path = %audio_file.display(), "attaching audio file");
        let attach = self.surface.set_file_input(&file_input, audio_file).await;
        attach.map_err(|err| self.fail(err.into()))?;
        self.step = WizardStep::AudioUploading;

        // Upload progress is not observable directly; the next control
        // enabling is the proxy for "upload and processing finished".
        let next_button = self.selectors.next_button.clone();
        let ready = self
            .wait_until_enabled(&next_button, self.timeouts.upload_ready_seconds)
            .await?;
        if !ready {
            return Err(self.timeout("upload to finish processing".to_string()));
        }
        self.step = WizardStep::AudioReady;
        info!("audio upload ready");
        Ok(())
    }

    async fn fill_details(&mut self, details: &EpisodeDetails) -> Result<(), WizardStepError> {
        let title_input = self.selectors.title_input.clone();
        let fill = self.surface.fill(&title_input, &details.title).await;
        fill.map_err(|err| self.fail(err.into()))?;

        let editor = self.selectors.description_editor.clone();
        let retype = self.surface.retype(&editor, &details.description).await;
        retype.map_err(|err| self.fail(err.into()))?;

        if let Some(season) = details.season.clone() {
            let selector = self.selectors.season_input.clone();
            let fill = self.surface.fill(&selector, &season).await;
            fill.map_err(|err| self.fail(err.into()))?;
        }
        if let Some(episode) = details.episode.clone() {
            let selector = self.selectors.episode_input.clone();
            let fill = self.surface.fill(&selector, &episode).await;
            fill.map_err(|err| self.fail(err.into()))?;
        }

        self.step = WizardStep::DetailsFilled;
        debug!(title = %details.title, "episode details filled");
        Ok(())
    }

    /// Advances to the publish screen. The next control's enabled state is
    /// flaky right after upload, so the click is retried in a bounded loop
    /// verified by the publish screen's discriminating element. Retries
    /// re-click without re-navigating.
    async fn advance_past_details(&mut self) -> Result<(), WizardStepError> {
        // The consent banner can reappear between screens.
        self.overlay.dismiss(&mut *self.surface).await;

        let next_button = self.selectors.next_button.clone();
        let publish_option = self.selectors.publish_now_option.clone();
        let attempts = self.advance.max_attempts.max(1);

        for attempt in 1..=attempts {
            let click = self.surface.click(&next_button).await;
            click.map_err(|err| self.fail(err.into()))?;

            let confirmed = self
                .wait_until_exists(&publish_option, self.advance.verify_timeout_seconds)
                .await?;
            if confirmed {
                self.step = WizardStep::NextClicked;
                return Ok(());
            }

            warn!(attempt, attempts, "next screen not confirmed, retrying advance");
            if attempt < attempts {
                sleep(self.advance_backoff()).await;
            }
        }

        Err(self.fail(WizardFailure::AdvanceNotConfirmed { attempts }))
    }

    async fn publish_now(&mut self) -> Result<(), WizardStepError> {
        let publish_option = self.selectors.publish_now_option.clone();
        let select = self.surface.click(&publish_option).await;
        select.map_err(|err| self.fail(err.into()))?;
        self.step = WizardStep::PublishOptionSelected;

        self.dismiss_notification().await;

        let publish_button = self.selectors.publish_button.clone();
        let enabled = self
            .wait_until_enabled(&publish_button, self.timeouts.step_seconds)
            .await?;
        if !enabled {
            return Err(self.timeout(format!("publish control {publish_button}")));
        }
        let publish = self.surface.click(&publish_button).await;
        publish.map_err(|err| self.fail(err.into()))?;
        self.step = WizardStep::Published;
        info!("publish clicked");
        Ok(())
    }

    async fn confirm_and_close(&mut self) -> Result<(), WizardStepError> {
        let confirm_close = self.selectors.confirm_close.clone();
        let found = self
            .wait_until_exists(&confirm_close, self.timeouts.step_seconds)
            .await?;
        if !found {
            return Err(self.timeout(format!("confirmation control {confirm_close}")));
        }
        let close = self.surface.click(&confirm_close).await;
        close.map_err(|err| self.fail(err.into()))?;
        Ok(())
    }

    /// Transient in-app notifications can cover the publish control.
    /// Best-effort: absence and click failures are both fine.
    async fn dismiss_notification(&mut self) {
        let selector = self.selectors.notification_dismiss.clone();
        match self.surface.is_visible(&selector).await {
            Ok(true) => {
                if let Err(err) = self.surface.click(&selector).await {
                    debug!(error = %err, "notification dismiss click failed");
                }
            }
            Ok(false) => {}
            Err(err) => debug!(error = %err, "notification probe failed"),
        }
    }

    async fn wait_until_exists(
        &mut self,
        selector: &str,
        timeout_secs: u64,
    ) -> Result<bool, WizardStepError> {
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        loop {
            let probe = self.surface.exists(selector).await;
            let present = probe.map_err(|err| self.fail(err.into()))?;
            if present {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(Duration::from_millis(self.timeouts.poll_interval_ms)).await;
        }
    }

    async fn wait_until_enabled(
        &mut self,
        selector: &str,
        timeout_secs: u64,
    ) -> Result<bool, WizardStepError> {
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        loop {
            let probe = self.surface.is_enabled(selector).await;
            let enabled = probe.map_err(|err| self.fail(err.into()))?;
            if enabled {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(Duration::from_millis(self.timeouts.poll_interval_ms)).await;
        }
    }

    fn advance_backoff(&self) -> Duration {
        let jitter = if self.advance.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.advance.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.advance.retry_delay_ms + jitter)
    }

    fn fail(&self, failure: WizardFailure) -> WizardStepError {
        WizardStepError {
            step: self.step,
            failure,
        }
    }

    fn timeout(&self, what: String) -> WizardStepError {
        let waited_secs = match self.step {
            WizardStep::AudioUploading => self.timeouts.upload_ready_seconds,
            _ => self.timeouts.step_seconds,
        };
        self.fail(WizardFailure::Timeout { what, waited_secs })
    }
}
