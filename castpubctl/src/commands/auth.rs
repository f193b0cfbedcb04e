use std::path::PathBuf;
use std::sync::Arc;

use castpub_core::browser::{BrowserAutomation, BrowserLauncher, LaunchOverrides};
use castpub_core::session::{AuthState, AuthStateStore, SessionValidator, ViewportSize};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::{AppContext, AuthCheckArgs, DisplayFallback, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheckReport {
    pub path: PathBuf,
    pub cookie_count: usize,
    pub age_hours: f64,
    pub warnings: Vec<String>,
}

impl DisplayFallback for AuthCheckReport {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "session at {} is valid: {} cookies, {:.1}h old",
            self.path.display(),
            self.cookie_count,
            self.age_hours
        )];
        for warning in &self.warnings {
            lines.push(format!("  warning: {warning}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureReport {
    pub path: PathBuf,
    pub cookie_count: usize,
}

impl DisplayFallback for CaptureReport {
    fn display(&self) -> String {
        format!(
            "session saved to {} ({} cookies)",
            self.path.display(),
            self.cookie_count
        )
    }
}

/// Validates the saved session without launching a browser; the same gate
/// the upload flow applies.
pub fn check(context: &AppContext, args: &AuthCheckArgs) -> Result<AuthCheckReport> {
    let store = AuthStateStore::new(context.paths.auth_file.clone());
    let validator = SessionValidator::new(store)
        .with_policy(context.config.session.expired_cookie_policy);
    let max_age_hours = args
        .max_age_hours
        .unwrap_or(context.config.session.max_age_hours);
    let report = validator.validate(max_age_hours)?;

    Ok(AuthCheckReport {
        path: context.paths.auth_file.clone(),
        cookie_count: report.state.cookies.len(),
        age_hours: report.state.age_hours(Utc::now().timestamp_millis()),
        warnings: report
            .warnings
            .iter()
            .map(|warning| {
                format!(
                    "cookie '{}' expired {:.1}h ago",
                    warning.name, warning.expired_hours_ago
                )
            })
            .collect(),
    })
}

/// Interactive login capture: opens a headful browser on the login page,
/// waits for the operator to finish signing in, then snapshots cookies
/// into the session file.
pub async fn capture(context: &AppContext) -> Result<CaptureReport> {
    let launcher = BrowserLauncher::new(Arc::clone(&context.config))?;
    let automation = launcher
        .launch_with_overrides(LaunchOverrides {
            headless: Some(false),
        })
        .await?;
    let result = capture_session(context, &automation).await;
    if let Err(err) = automation.shutdown().await {
        warn!(error = %err, "browser teardown reported an error");
    }
    result
}

async fn capture_session(
    context: &AppContext,
    automation: &BrowserAutomation,
) -> Result<CaptureReport> {
    let browser_context = automation.new_context().await?;
    let login_url = format!(
        "{}{}",
        context.config.platform.base_url.trim_end_matches('/'),
        context.config.platform.login_path
    );
    browser_context.goto(&login_url).await?;

    println!("Complete the login in the opened browser window.");
    println!("When the creator dashboard is visible, press Enter here to save the session.");
    wait_for_enter().await?;

    let cookies = browser_context.capture_cookies().await?;
    if cookies.is_empty() {
        warn!("no cookies captured; the login may not have completed");
    }

    let mut state = AuthState::capture(cookies);
    match browser_context.capture_storage().await {
        Ok((local, session)) => {
            if !local.is_empty() {
                state.local_storage = Some(local);
            }
            if !session.is_empty() {
                state.session_storage = Some(session);
            }
        }
        Err(err) => warn!(error = %err, "storage capture failed, saving cookies only"),
    }
    match browser_context.user_agent().await {
        Ok(agent) => state.user_agent = Some(agent),
        Err(err) => warn!(error = %err, "user agent capture failed"),
    }
    state.viewport = Some(ViewportSize {
        width: context.config.viewport.width,
        height: context.config.viewport.height,
    });

    let store = AuthStateStore::new(context.paths.auth_file.clone());
    store.save(&state)?;
    info!(path = %store.path().display(), cookies = state.cookies.len(), "session captured");

    Ok(CaptureReport {
        path: store.path().to_path_buf(),
        cookie_count: state.cookies.len(),
    })
}

async fn wait_for_enter() -> std::io::Result<()> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await
    .map_err(std::io::Error::other)?
}
