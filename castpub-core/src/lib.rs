pub mod browser;
pub mod config;
pub mod error;
pub mod paths;
pub mod session;
pub mod upload;
pub mod wizard;

pub use config::{load_runner_config, RunnerConfig};
pub use error::{ConfigError, Result};
pub use paths::{PathOverrides, ResolvedPaths, AUTH_PATH_ENV, OUTPUT_DIR_ENV};
pub use session::{
    AuthState, AuthStateStore, ExpiredCookiePolicy, SessionCookie, SessionError, SessionReport,
    SessionValidator,
};
pub use upload::{UploadError, UploadOptions, UploadOrchestrator, UploadOutcome, UploadRequest};
pub use wizard::{EpisodeDetails, WizardStep, WizardStepDriver, WizardStepError};
