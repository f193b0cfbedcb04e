use std::path::Path;

use async_trait::async_trait;

/// Errors bubbling out of a concrete surface. Kept opaque so the driver
/// stays independent of any particular automation backend.
pub type SurfaceError = Box<dyn std::error::Error + Send + Sync>;

/// The page primitives the wizard driver needs from whatever is rendering
/// the creator site. The production implementation speaks CDP; tests swap
/// in a scripted fake.
#[async_trait(?Send)]
pub trait WizardSurface {
    async fn goto(&mut self, url: &str) -> Result<(), SurfaceError>;

    /// Bounded wait for network/DOM quiescence. Returns false when the
    /// deadline passes without the page settling.
    async fn wait_for_idle(&mut self, timeout_secs: u64) -> Result<bool, SurfaceError>;

    async fn exists(&mut self, selector: &str) -> Result<bool, SurfaceError>;

    async fn is_visible(&mut self, selector: &str) -> Result<bool, SurfaceError>;

    async fn is_enabled(&mut self, selector: &str) -> Result<bool, SurfaceError>;

    async fn click(&mut self, selector: &str) -> Result<(), SurfaceError>;

    /// Replaces the current value of a plain input with `text`.
    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), SurfaceError>;

    /// Select-all-and-retype into a rich-text editor. Plain value
    /// assignment does not update such editors' internal models.
    async fn retype(&mut self, selector: &str, text: &str) -> Result<(), SurfaceError>;

    /// Attaches a local file to a file input without opening the native
    /// chooser dialog.
    async fn set_file_input(&mut self, selector: &str, path: &Path) -> Result<(), SurfaceError>;

    /// Forces an element out of the way via direct style manipulation.
    /// Missing elements are not an error.
    async fn hide(&mut self, selector: &str) -> Result<(), SurfaceError>;
}
