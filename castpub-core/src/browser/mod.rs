mod automation;
mod error;
mod profile;
mod surface;

pub use automation::{BrowserAutomation, BrowserContext, BrowserLauncher, LaunchOverrides};
pub use error::{BrowserError, BrowserResult};
pub use profile::{BrowserProfile, ProfileManager};
pub use surface::CdpWizardSurface;
