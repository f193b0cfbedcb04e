mod details;
mod driver;
mod overlay;
mod surface;

pub use details::EpisodeDetails;
pub use driver::{WizardFailure, WizardStep, WizardStepDriver, WizardStepError};
pub use overlay::{OverlayOutcome, OverlayPolicy};
pub use surface::{SurfaceError, WizardSurface};
