use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::handler::viewport::Viewport as ChromiumViewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::session::{CookieSink, SessionCookie, SinkError};

use super::error::{BrowserError, BrowserResult};
use super::profile::{BrowserProfile, ProfileManager};

#[derive(Debug, Clone, Default)]
pub struct LaunchOverrides {
    pub headless: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    config: Arc<RunnerConfig>,
    profiles: ProfileManager,
}

impl BrowserLauncher {
    pub fn new(config: Arc<RunnerConfig>) -> BrowserResult<Self> {
        let profiles = ProfileManager::ephemeral()?;
        Ok(Self { config, profiles })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub async fn launch(&self) -> BrowserResult<BrowserAutomation> {
        self.launch_with_overrides(LaunchOverrides::default()).await
    }

    pub async fn launch_with_overrides(
        &self,
        overrides: LaunchOverrides,
    ) -> BrowserResult<BrowserAutomation> {
        self.profiles.cleanup_expired()?;
        let profile = self.profiles.allocate()?;
        let headless = overrides.headless.unwrap_or(self.config.chromium.headless);
        let chromium_config = self.build_chromium_config(&profile, headless)?;
        info!(
            profile = %profile.id(),
            width = self.config.viewport.width,
            height = self.config.viewport.height,
            headless,
            "launching chromium instance"
        );

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "chromium handler reported error");
                }
            }
        });

        Ok(BrowserAutomation {
            browser,
            profile,
            handler_task: Some(handler_task),
            config: Arc::clone(&self.config),
        })
    }

    fn build_chromium_config(
        &self,
        profile: &BrowserProfile,
        headless: bool,
    ) -> BrowserResult<ChromiumConfig> {
        let chromium = &self.config.chromium;
        let viewport = &self.config.viewport;
        let mut builder = ChromiumConfig::builder()
            .user_data_dir(profile.path())
            .viewport(ChromiumViewport {
                width: viewport.width,
                height: viewport.height,
                device_scale_factor: Some(viewport.device_scale_factor),
                emulating_mobile: false,
                is_landscape: viewport.width >= viewport.height,
                has_touch: false,
            });

        if let Some(executable) = &chromium.executable_path {
            builder = builder.chrome_executable(executable);
        }
        if !headless {
            builder = builder.with_head();
        }
        if !chromium.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(timeout) = chromium.request_timeout_seconds {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }

        let mut args = vec![
            format!("--window-size={},{}", viewport.width, viewport.height),
            "--no-first-run".to_string(),
            "--disable-features=AutomationControlled".to_string(),
            "--disable-background-timer-throttling".to_string(),
            "--password-store=basic".to_string(),
        ];
        if chromium.disable_gpu {
            args.push("--disable-gpu".into());
        }
        if chromium.mute_audio {
            args.push("--mute-audio".into());
        }
        if let Some(lang) = &chromium.lang {
            args.push(format!("--lang={lang}"));
        }
        builder = builder.args(args);

        builder.build().map_err(BrowserError::Configuration)
    }
}

/// One launched browser instance. Guaranteed torn down by the caller via
/// [`BrowserAutomation::shutdown`] on every exit path.
#[derive(Debug)]
pub struct BrowserAutomation {
    browser: Browser,
    profile: BrowserProfile,
    handler_task: Option<JoinHandle<()>>,
    config: Arc<RunnerConfig>,
}

impl BrowserAutomation {
    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub async fn new_context(&self) -> BrowserResult<BrowserContext> {
        let params = CreateTargetParams::new("about:blank");
        let page = self.browser.new_page(params).await?;
        Ok(BrowserContext { page })
    }

    pub async fn shutdown(mut self) -> BrowserResult<()> {
        info!(profile = %self.profile.id(), "shutting down chromium instance");
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "failed to close browser gracefully");
        }
        if let Some(handle) = self.handler_task.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "browser handler join error");
            }
        }
        Ok(())
    }
}

impl Drop for BrowserAutomation {
    fn drop(&mut self) {
        if let Some(handle) = &self.handler_task {
            if !handle.is_finished() {
                warn!(
                    profile = %self.profile.id(),
                    "BrowserAutomation dropped without explicit shutdown"
                );
            }
        }
    }
}

/// A single page inside a launched browser. Session state is seeded into it
/// through the [`CookieSink`] implementation before any navigation.
#[derive(Debug)]
pub struct BrowserContext {
    page: Page,
}

impl BrowserContext {
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn goto(&self, url: &str) -> BrowserResult<()> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(BrowserError::Configuration)?;
        self.page.goto(params).await?;
        Ok(())
    }

    /// Polls `document.readyState` until the page reports complete or the
    /// deadline passes. Returns false on expiry; callers decide whether a
    /// never-idle single-page app is acceptable.
    pub async fn wait_for_idle(&self, timeout: Duration, poll: Duration) -> BrowserResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let ready: String = self
                .page
                .evaluate("document.readyState")
                .await?
                .into_value()
                .map_err(|err| {
                    BrowserError::Unexpected(format!("failed to read readyState: {err}"))
                })?;
            if ready == "complete" {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(poll).await;
        }
    }

    pub async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()> {
        let params = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .build()
            .map_err(BrowserError::Configuration)?;
        self.page.set_user_agent(params).await?;
        Ok(())
    }

    /// Reads every cookie visible to this context, in the session-file
    /// representation. Used by the interactive capture flow.
    pub async fn capture_cookies(&self) -> BrowserResult<Vec<SessionCookie>> {
        let cookies = self.page.get_cookies().await?;
        let raw = serde_json::to_value(&cookies).map_err(|err| {
            BrowserError::Unexpected(format!("failed to serialize captured cookies: {err}"))
        })?;
        serde_json::from_value(raw).map_err(|err| {
            BrowserError::Unexpected(format!("failed to map captured cookies: {err}"))
        })
    }

    /// Dumps `localStorage` and `sessionStorage` for the current origin.
    pub async fn capture_storage(
        &self,
    ) -> BrowserResult<(BTreeMap<String, String>, BTreeMap<String, String>)> {
        let script = r#"(() => {
    const dump = (storage) => {
        const out = {};
        for (let i = 0; i < storage.length; i++) {
            const key = storage.key(i);
            out[key] = storage.getItem(key);
        }
        return out;
    };
    return JSON.stringify({
        local: dump(window.localStorage),
        session: dump(window.sessionStorage),
    });
})()"#;
        let raw: String = self
            .page
            .evaluate(script)
            .await?
            .into_value()
            .map_err(|err| {
                BrowserError::Unexpected(format!("failed to read storage dump: {err}"))
            })?;

        #[derive(serde::Deserialize)]
        struct StorageDump {
            local: BTreeMap<String, String>,
            session: BTreeMap<String, String>,
        }
        let dump: StorageDump = serde_json::from_str(&raw).map_err(|err| {
            BrowserError::Unexpected(format!("failed to parse storage dump: {err}"))
        })?;
        Ok((dump.local, dump.session))
    }

    pub async fn user_agent(&self) -> BrowserResult<String> {
        self.page
            .evaluate("navigator.userAgent")
            .await?
            .into_value()
            .map_err(|err| BrowserError::Unexpected(format!("failed to read user agent: {err}")))
    }

    pub async fn screenshot_full_page(&self) -> BrowserResult<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page
            .screenshot(params)
            .await
            .map_err(|err| BrowserError::Screenshot(err.to_string()))
    }
}

fn cookie_param(cookie: &SessionCookie) -> BrowserResult<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(&cookie.name)
        .value(&cookie.value)
        .path(&cookie.path)
        .secure(cookie.secure)
        .http_only(cookie.http_only);
    if !cookie.domain.is_empty() {
        builder = builder.domain(&cookie.domain);
    }
    if !cookie.is_session_only() {
        builder = builder.expires(
            chromiumoxide::cdp::browser_protocol::network::TimeSinceEpoch::new(cookie.expires),
        );
    }
    if let Some(same_site) = &cookie.same_site {
        let mapped = match same_site.to_ascii_lowercase().as_str() {
            "strict" => CookieSameSite::Strict,
            "lax" => CookieSameSite::Lax,
            _ => CookieSameSite::None,
        };
        builder = builder.same_site(mapped);
    }
    builder.build().map_err(BrowserError::Configuration)
}

#[async_trait(?Send)]
impl CookieSink for BrowserContext {
    async fn install_cookies(&mut self, cookies: &[SessionCookie]) -> Result<(), SinkError> {
        let params = cookies
            .iter()
            .map(cookie_param)
            .collect::<BrowserResult<Vec<_>>>()?;
        debug!(count = params.len(), "installing session cookies");
        self.page.set_cookies(params).await?;
        Ok(())
    }

    async fn install_storage(
        &mut self,
        local: &BTreeMap<String, String>,
        session: &BTreeMap<String, String>,
    ) -> Result<(), SinkError> {
        let local_json = serde_json::to_string(local)?;
        let session_json = serde_json::to_string(session)?;
        let script = format!(
            r#"(() => {{
    const localEntries = {local_json};
    const sessionEntries = {session_json};
    try {{
        for (const [key, value] of Object.entries(localEntries)) {{
            window.localStorage.setItem(key, value);
        }}
    }} catch (_) {{}}
    try {{
        for (const [key, value] of Object.entries(sessionEntries)) {{
            window.sessionStorage.setItem(key, value);
        }}
    }} catch (_) {{}}
}})();"#
        );
        self.page
            .evaluate_on_new_document(
                AddScriptToEvaluateOnNewDocumentParams::builder()
                    .source(script)
                    .build()
                    .map_err(BrowserError::Configuration)?,
            )
            .await?;
        Ok(())
    }
}
