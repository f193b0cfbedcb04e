use tracing::{debug, warn};

use super::surface::WizardSurface;

/// What a dismissal attempt observed. Purely informational; no variant is
/// treated as a failure by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOutcome {
    /// The overlay was not rendered at the time of the check.
    Absent,
    /// The overlay was hidden and, where offered, politely accepted.
    Dismissed,
    /// The overlay was seen but neither hiding nor accepting worked.
    /// The run proceeds regardless.
    Stubborn,
}

/// Consent-banner handling. The banner intercepts clicks while visible and
/// can reappear between wizard screens, so dismissal runs before every
/// click-heavy phase: hide it outright first, then try the accept button so
/// it stays gone on subsequent navigations.
#[derive(Debug, Clone)]
pub struct OverlayPolicy {
    overlay_selector: String,
    accept_selector: String,
}

impl OverlayPolicy {
    pub fn new(overlay_selector: impl Into<String>, accept_selector: impl Into<String>) -> Self {
        Self {
            overlay_selector: overlay_selector.into(),
            accept_selector: accept_selector.into(),
        }
    }

    /// Never returns an error and never blocks the primary action; the
    /// worst observable result is `Stubborn`.
    pub async fn dismiss(&self, surface: &mut dyn WizardSurface) -> OverlayOutcome {
        let visible = match surface.is_visible(&self.overlay_selector).await {
            Ok(visible) => visible,
            Err(err) => {
                debug!(error = %err, selector = %self.overlay_selector, "overlay probe failed");
                return OverlayOutcome::Absent;
            }
        };
        if !visible {
            return OverlayOutcome::Absent;
        }

        let mut hidden = true;
        if let Err(err) = surface.hide(&self.overlay_selector).await {
            warn!(error = %err, selector = %self.overlay_selector, "failed to hide overlay");
            hidden = false;
        }

        let mut accepted = false;
        match surface.exists(&self.accept_selector).await {
            Ok(true) => {
                if let Err(err) = surface.click(&self.accept_selector).await {
                    debug!(error = %err, selector = %self.accept_selector, "overlay accept click failed");
                } else {
                    accepted = true;
                }
            }
            Ok(false) => {}
            Err(err) => {
                debug!(error = %err, selector = %self.accept_selector, "overlay accept probe failed");
            }
        }

        if hidden || accepted {
            debug!(hidden, accepted, "consent overlay dismissed");
            OverlayOutcome::Dismissed
        } else {
            warn!("consent overlay resisted dismissal, proceeding anyway");
            OverlayOutcome::Stubborn
        }
    }
}
