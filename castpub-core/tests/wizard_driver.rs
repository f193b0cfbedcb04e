use std::path::{Path, PathBuf};

use async_trait::async_trait;
use castpub_core::config::RunnerConfig;
use castpub_core::wizard::{
    EpisodeDetails, SurfaceError, WizardFailure, WizardStep, WizardStepDriver, WizardSurface,
};

/// Scripted surface standing in for the live page. Knobs model the remote
/// UI's moods: slow uploads, flaky advance clicks, stubborn overlays.
struct MockSurface {
    selectors: castpub_core::config::SelectorSection,
    log: Vec<String>,
    idle: bool,
    overlay_visible: bool,
    accept_present: bool,
    notification_visible: bool,
    file_input_present: bool,
    /// is_enabled polls on the next control before it reports true.
    next_enabled_after: usize,
    next_polls: usize,
    /// Next-control clicks before the publish screen appears.
    publish_screen_after_clicks: usize,
    next_clicks: usize,
    fail_click: Option<String>,
    fail_hide: bool,
}

impl MockSurface {
    fn new(config: &RunnerConfig) -> Self {
        Self {
            selectors: config.selectors.clone(),
            log: Vec::new(),
            idle: true,
            overlay_visible: false,
            accept_present: false,
            notification_visible: false,
            file_input_present: true,
            next_enabled_after: 0,
            next_polls: 0,
            publish_screen_after_clicks: 1,
            next_clicks: 0,
            fail_click: None,
            fail_hide: false,
        }
    }

    fn position(&self, entry: &str) -> usize {
        self.log
            .iter()
            .position(|line| line == entry)
            .unwrap_or_else(|| panic!("missing log entry {entry:?} in {:?}", self.log))
    }
}

fn boom(what: &str) -> SurfaceError {
    Box::new(std::io::Error::other(format!("simulated failure: {what}")))
}

#[async_trait(?Send)]
impl WizardSurface for MockSurface {
    async fn goto(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.log.push(format!("goto:{url}"));
        Ok(())
    }

    async fn wait_for_idle(&mut self, _timeout_secs: u64) -> Result<bool, SurfaceError> {
        Ok(self.idle)
    }

    async fn exists(&mut self, selector: &str) -> Result<bool, SurfaceError> {
        if selector == self.selectors.file_input {
            return Ok(self.file_input_present);
        }
        if selector == self.selectors.publish_now_option {
            return Ok(self.next_clicks >= self.publish_screen_after_clicks);
        }
        if selector == self.selectors.consent_accept {
            return Ok(self.accept_present);
        }
        Ok(true)
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool, SurfaceError> {
        if selector == self.selectors.consent_overlay {
            return Ok(self.overlay_visible);
        }
        if selector == self.selectors.notification_dismiss {
            return Ok(self.notification_visible);
        }
        Ok(false)
    }

    async fn is_enabled(&mut self, selector: &str) -> Result<bool, SurfaceError> {
        if selector == self.selectors.next_button {
            self.next_polls += 1;
            return Ok(self.next_polls > self.next_enabled_after);
        }
        Ok(true)
    }

    async fn click(&mut self, selector: &str) -> Result<(), SurfaceError> {
        if self.fail_click.as_deref() == Some(selector) {
            return Err(boom(selector));
        }
        if selector == self.selectors.next_button {
            self.next_clicks += 1;
        }
        if selector == self.selectors.notification_dismiss {
            self.notification_visible = false;
        }
        self.log.push(format!("click:{selector}"));
        Ok(())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        self.log.push(format!("fill:{selector}={text}"));
        Ok(())
    }

    async fn retype(&mut self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        self.log.push(format!("retype:{selector}={text}"));
        Ok(())
    }

    async fn set_file_input(&mut self, selector: &str, path: &Path) -> Result<(), SurfaceError> {
        self.log.push(format!("file:{selector}={}", path.display()));
        Ok(())
    }

    async fn hide(&mut self, selector: &str) -> Result<(), SurfaceError> {
        if self.fail_hide {
            return Err(boom(selector));
        }
        if selector == self.selectors.consent_overlay {
            self.overlay_visible = false;
        }
        self.log.push(format!("hide:{selector}"));
        Ok(())
    }
}

fn fast_config() -> RunnerConfig {
    let mut config = RunnerConfig::default();
    config.timeouts.navigation_seconds = 1;
    config.timeouts.upload_ready_seconds = 3;
    config.timeouts.step_seconds = 2;
    config.timeouts.poll_interval_ms = 50;
    config.advance.verify_timeout_seconds = 1;
    config.advance.retry_delay_ms = 10;
    config.advance.jitter_ms = 0;
    config
}

fn details() -> EpisodeDetails {
    EpisodeDetails {
        title: "Episode 42".to_string(),
        description: "All about everything".to_string(),
        audio_file: PathBuf::from("/audio/ep42.mp3"),
        season: Some("2".to_string()),
        episode: Some("42".to_string()),
    }
}

#[tokio::test(start_paused = true)]
async fn full_run_orders_actions_and_reaches_done() {
    let config = fast_config();
    let mut surface = MockSurface::new(&config);
    surface.overlay_visible = true;
    surface.accept_present = true;
    surface.notification_visible = true;
    surface.next_enabled_after = 2;

    let mut driver = WizardStepDriver::new(&mut surface, &config);
    driver
        .run("https://example.test/wizard", &details())
        .await
        .unwrap();
    assert_eq!(driver.step(), WizardStep::Done);

    let goto = surface.position("goto:https://example.test/wizard");
    let hide = surface.position(&format!("hide:{}", config.selectors.consent_overlay));
    let file = surface.position(&format!(
        "file:{}=/audio/ep42.mp3",
        config.selectors.file_input
    ));
    let title = surface.position(&format!(
        "fill:{}=Episode 42",
        config.selectors.title_input
    ));
    let next = surface.position(&format!("click:{}", config.selectors.next_button));
    let publish = surface.position(&format!("click:{}", config.selectors.publish_button));
    let close = surface.position(&format!("click:{}", config.selectors.confirm_close));

    assert!(goto < hide, "overlay cleared after navigation");
    assert!(hide < file, "overlay cleared before upload");
    assert!(file < title, "upload precedes details");
    assert!(title < next, "details precede advance");
    assert!(next < publish, "advance precedes publish");
    assert!(publish < close, "publish precedes confirmation");
}

#[tokio::test(start_paused = true)]
async fn never_idle_page_is_tolerated() {
    let config = fast_config();
    let mut surface = MockSurface::new(&config);
    surface.idle = false;

    let mut driver = WizardStepDriver::new(&mut surface, &config);
    driver
        .run("https://example.test/wizard", &details())
        .await
        .unwrap();
    assert_eq!(driver.step(), WizardStep::Done);
}

#[tokio::test(start_paused = true)]
async fn upload_readiness_is_polled_not_assumed() {
    let config = fast_config();
    let mut surface = MockSurface::new(&config);
    surface.next_enabled_after = 4;

    let mut driver = WizardStepDriver::new(&mut surface, &config);
    driver
        .run("https://example.test/wizard", &details())
        .await
        .unwrap();
    assert!(surface.next_polls >= 5);
}

#[tokio::test(start_paused = true)]
async fn upload_that_never_readies_times_out_at_the_upload_step() {
    let config = fast_config();
    let mut surface = MockSurface::new(&config);
    surface.next_enabled_after = usize::MAX;

    let mut driver = WizardStepDriver::new(&mut surface, &config);
    let err = driver
        .run("https://example.test/wizard", &details())
        .await
        .unwrap_err();
    assert_eq!(err.failed_step(), "audio_uploading");
    assert!(matches!(err.failure, WizardFailure::Timeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn advance_retries_until_next_screen_confirms() {
    let config = fast_config();
    let mut surface = MockSurface::new(&config);
    surface.publish_screen_after_clicks = 3;

    let mut driver = WizardStepDriver::new(&mut surface, &config);
    driver
        .run("https://example.test/wizard", &details())
        .await
        .unwrap();
    assert_eq!(surface.next_clicks, 3);
}

#[tokio::test(start_paused = true)]
async fn advance_gives_up_after_bounded_attempts() {
    let mut config = fast_config();
    config.advance.max_attempts = 2;
    let mut surface = MockSurface::new(&config);
    surface.publish_screen_after_clicks = usize::MAX;

    let mut driver = WizardStepDriver::new(&mut surface, &config);
    let err = driver
        .run("https://example.test/wizard", &details())
        .await
        .unwrap_err();
    assert_eq!(surface.next_clicks, 2);
    assert_eq!(err.failed_step(), "details_filled");
    assert!(matches!(
        err.failure,
        WizardFailure::AdvanceNotConfirmed { attempts: 2 }
    ));
}

#[tokio::test(start_paused = true)]
async fn stubborn_overlay_never_blocks_the_run() {
    let config = fast_config();
    let mut surface = MockSurface::new(&config);
    surface.overlay_visible = true;
    surface.fail_hide = true;
    surface.fail_click = Some(config.selectors.consent_accept.clone());
    surface.accept_present = true;

    let mut driver = WizardStepDriver::new(&mut surface, &config);
    driver
        .run("https://example.test/wizard", &details())
        .await
        .unwrap();
    assert_eq!(driver.step(), WizardStep::Done);
}

#[tokio::test(start_paused = true)]
async fn failing_click_names_the_current_step() {
    let config = fast_config();
    let mut surface = MockSurface::new(&config);
    surface.fail_click = Some(config.selectors.publish_button.clone());

    let mut driver = WizardStepDriver::new(&mut surface, &config);
    let err = driver
        .run("https://example.test/wizard", &details())
        .await
        .unwrap_err();
    assert_eq!(err.failed_step(), "publish_option_selected");
}

#[tokio::test(start_paused = true)]
async fn missing_file_input_times_out_on_the_loaded_page() {
    let config = fast_config();
    let mut surface = MockSurface::new(&config);
    surface.file_input_present = false;

    let mut driver = WizardStepDriver::new(&mut surface, &config);
    let err = driver
        .run("https://example.test/wizard", &details())
        .await
        .unwrap_err();
    assert_eq!(err.failed_step(), "page_loaded");
}

#[tokio::test(start_paused = true)]
async fn optional_identifiers_are_filled_only_when_present() {
    let config = fast_config();
    let mut surface = MockSurface::new(&config);
    let mut driver = WizardStepDriver::new(&mut surface, &config);
    let sparse = EpisodeDetails {
        season: None,
        episode: None,
        ..details()
    };
    driver
        .run("https://example.test/wizard", &sparse)
        .await
        .unwrap();

    let season_entry = format!("fill:{}", config.selectors.season_input);
    assert!(!surface.log.iter().any(|line| line.starts_with(&season_entry)));
}
