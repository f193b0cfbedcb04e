use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("missing required fields: {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },
    #[error("audio path not found: {path}")]
    PathNotFound { path: PathBuf },
    #[error("no audio file found in directory: {path}")]
    NoAudioFileFound { path: PathBuf },
    #[error("failed to inspect {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raw upload input, assembled from CLI flags layered over an optional JSON
/// config file with the same keys. Nothing here is trusted yet; `validate`
/// turns it into [`UploadOptions`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadRequest {
    pub show_id: Option<String>,
    pub audio_path: Option<PathBuf>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub dry_run: Option<bool>,
}

impl UploadRequest {
    /// Layers `self` over `base`; set fields in `self` win. Flags go on
    /// top of the config file.
    pub fn merged_over(self, base: UploadRequest) -> UploadRequest {
        UploadRequest {
            show_id: self.show_id.or(base.show_id),
            audio_path: self.audio_path.or(base.audio_path),
            title: self.title.or(base.title),
            description: self.description.or(base.description),
            season: self.season.or(base.season),
            episode: self.episode.or(base.episode),
            dry_run: self.dry_run.or(base.dry_run),
        }
    }

    /// Checks presence of every required field before anything touches the
    /// filesystem, citing all missing names at once.
    pub fn validate(self) -> Result<UploadOptions, InputError> {
        let mut missing = Vec::new();
        if self.show_id.as_deref().map_or(true, str::is_empty) {
            missing.push("showId".to_string());
        }
        if self.audio_path.is_none() {
            missing.push("audioPath".to_string());
        }
        if self.title.as_deref().map_or(true, str::is_empty) {
            missing.push("title".to_string());
        }
        if self.description.as_deref().map_or(true, str::is_empty) {
            missing.push("description".to_string());
        }
        if !missing.is_empty() {
            return Err(InputError::MissingFields { fields: missing });
        }

        Ok(UploadOptions {
            show_id: self.show_id.unwrap_or_default(),
            audio_path: self.audio_path.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            season: self.season,
            episode: self.episode,
            dry_run: self.dry_run.unwrap_or(false),
        })
    }
}

/// Validated input contract for one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub show_id: String,
    /// A file, or a directory resolved to its most recently modified
    /// regular file.
    pub audio_path: PathBuf,
    pub title: String,
    pub description: String,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub dry_run: bool,
}

/// Resolves the audio source to a concrete file. Directories are scanned
/// non-recursively for the most recently modified regular file; ties break
/// on file name so repeated resolution is deterministic.
pub fn resolve_audio_source(path: &Path) -> Result<PathBuf, InputError> {
    let metadata = std::fs::metadata(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            InputError::PathNotFound {
                path: path.to_path_buf(),
            }
        } else {
            InputError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    if metadata.is_file() {
        return absolute(path);
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let entries = std::fs::read_dir(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entry_path = entry.path();
        let entry_meta = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta,
            _ => continue,
        };
        let modified = entry_meta.modified().map_err(|source| InputError::Io {
            path: entry_path.clone(),
            source,
        })?;
        let newer = match &newest {
            None => true,
            Some((best_time, best_path)) => {
                modified > *best_time || (modified == *best_time && entry_path > *best_path)
            }
        };
        if newer {
            newest = Some((modified, entry_path));
        }
    }

    match newest {
        Some((_, file)) => absolute(&file),
        None => Err(InputError::NoAudioFileFound {
            path: path.to_path_buf(),
        }),
    }
}

fn absolute(path: &Path) -> Result<PathBuf, InputError> {
    path.canonicalize().map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })
}
