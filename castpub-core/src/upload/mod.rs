mod options;
mod orchestrator;

pub use options::{resolve_audio_source, InputError, UploadOptions, UploadRequest};
pub use orchestrator::{ResolvedUpload, UploadError, UploadOrchestrator, UploadOutcome};
