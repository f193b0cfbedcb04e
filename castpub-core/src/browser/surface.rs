use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use tracing::debug;

use crate::wizard::{SurfaceError, WizardSurface};

use super::automation::BrowserContext;
use super::error::BrowserError;

/// [`WizardSurface`] backed by a live CDP page. Borrows the context rather
/// than owning it so the caller keeps the page for postmortem screenshots.
pub struct CdpWizardSurface<'a> {
    context: &'a BrowserContext,
    poll_interval: Duration,
}

impl<'a> CdpWizardSurface<'a> {
    pub fn new(context: &'a BrowserContext, poll_interval: Duration) -> Self {
        Self {
            context,
            poll_interval,
        }
    }

    async fn eval_bool(&self, script: String) -> Result<bool, SurfaceError> {
        let value: bool = self
            .context
            .page()
            .evaluate(script)
            .await?
            .into_value()
            .map_err(|err| {
                BrowserError::Unexpected(format!("failed to read evaluation result: {err}"))
            })?;
        Ok(value)
    }

    fn quoted(selector: &str) -> Result<String, SurfaceError> {
        serde_json::to_string(selector).map_err(|err| {
            Box::new(BrowserError::Unexpected(format!(
                "unencodable selector: {err}"
            ))) as SurfaceError
        })
    }
}

#[async_trait(?Send)]
impl WizardSurface for CdpWizardSurface<'_> {
    async fn goto(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.context.goto(url).await?;
        Ok(())
    }

    async fn wait_for_idle(&mut self, timeout_secs: u64) -> Result<bool, SurfaceError> {
        let settled = self
            .context
            .wait_for_idle(Duration::from_secs(timeout_secs), self.poll_interval)
            .await?;
        Ok(settled)
    }

    async fn exists(&mut self, selector: &str) -> Result<bool, SurfaceError> {
        Ok(self.context.page().find_element(selector).await.is_ok())
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool, SurfaceError> {
        let quoted = Self::quoted(selector)?;
        let script = format!(
            r#"(() => {{
    const el = document.querySelector({quoted});
    if (!el) return false;
    const style = window.getComputedStyle(el);
    return style.display !== 'none'
        && style.visibility !== 'hidden'
        && el.getClientRects().length > 0;
}})()"#
        );
        self.eval_bool(script).await
    }

    async fn is_enabled(&mut self, selector: &str) -> Result<bool, SurfaceError> {
        let quoted = Self::quoted(selector)?;
        let script = format!(
            r#"(() => {{
    const el = document.querySelector({quoted});
    if (!el) return false;
    if (el.disabled) return false;
    return el.getAttribute('aria-disabled') !== 'true';
}})()"#
        );
        self.eval_bool(script).await
    }

    async fn click(&mut self, selector: &str) -> Result<(), SurfaceError> {
        let element = self
            .context
            .page()
            .find_element(selector)
            .await
            .map_err(|err| BrowserError::ElementNotFound(format!("{selector}: {err}")))?;
        element.click().await.map_err(|err| {
            BrowserError::Unexpected(format!("failed to click {selector}: {err}"))
        })?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        let element = self
            .context
            .page()
            .find_element(selector)
            .await
            .map_err(|err| BrowserError::ElementNotFound(format!("{selector}: {err}")))?;
        element.click().await.map_err(|err| {
            BrowserError::Unexpected(format!("failed to focus {selector}: {err}"))
        })?;

        // Select any existing content so typing replaces it.
        let quoted = Self::quoted(selector)?;
        let script = format!(
            r#"(() => {{
    const el = document.querySelector({quoted});
    if (el && typeof el.select === 'function') el.select();
    return true;
}})()"#
        );
        self.eval_bool(script).await?;

        element.type_str(text).await.map_err(|err| {
            BrowserError::Unexpected(format!("failed to type into {selector}: {err}"))
        })?;
        Ok(())
    }

    async fn retype(&mut self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        let element = self
            .context
            .page()
            .find_element(selector)
            .await
            .map_err(|err| BrowserError::ElementNotFound(format!("{selector}: {err}")))?;
        element.click().await.map_err(|err| {
            BrowserError::Unexpected(format!("failed to focus {selector}: {err}"))
        })?;

        // Rich-text editors ignore value assignment; select the current
        // content and type over it so the editor model updates.
        let quoted = Self::quoted(selector)?;
        let script = format!(
            r#"(() => {{
    const el = document.querySelector({quoted});
    if (!el) return false;
    el.focus();
    document.execCommand('selectAll', false, null);
    return true;
}})()"#
        );
        self.eval_bool(script).await?;

        element.type_str(text).await.map_err(|err| {
            BrowserError::Unexpected(format!("failed to type into {selector}: {err}"))
        })?;
        Ok(())
    }

    async fn set_file_input(&mut self, selector: &str, path: &Path) -> Result<(), SurfaceError> {
        let element = self
            .context
            .page()
            .find_element(selector)
            .await
            .map_err(|err| BrowserError::ElementNotFound(format!("{selector}: {err}")))?;
        let file = path.to_string_lossy().into_owned();
        debug!(selector, file = %file, "setting file input");
        let params = SetFileInputFilesParams::builder()
            .files(vec![file])
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(BrowserError::Configuration)?;
        self.context.page().execute(params).await?;
        Ok(())
    }

    async fn hide(&mut self, selector: &str) -> Result<(), SurfaceError> {
        let quoted = Self::quoted(selector)?;
        let script = format!(
            r#"(() => {{
    const el = document.querySelector({quoted});
    if (!el) return false;
    el.style.setProperty('display', 'none', 'important');
    return true;
}})()"#
        );
        self.eval_bool(script).await?;
        Ok(())
    }
}
