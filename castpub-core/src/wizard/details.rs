use std::path::PathBuf;

/// The payload driven into the wizard. Constructed once per run from
/// validated input and immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeDetails {
    pub title: String,
    pub description: String,
    /// Absolute path to an existing regular audio file.
    pub audio_file: PathBuf,
    /// Filled into the wizard only when present.
    pub season: Option<String>,
    pub episode: Option<String>,
}
