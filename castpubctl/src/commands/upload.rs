use std::path::Path;
use std::sync::Arc;

use castpub_core::upload::{ResolvedUpload, UploadOrchestrator, UploadOutcome, UploadRequest};
use serde::Serialize;

use crate::{AppContext, AppError, DisplayFallback, Result, UploadArgs};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub status: &'static str,
    #[serde(flatten)]
    pub resolved: ResolvedUpload,
}

impl DisplayFallback for UploadReport {
    fn display(&self) -> String {
        let resolved = &self.resolved;
        [
            format!("{}:", self.status),
            format!("  showId: {}", resolved.show_id),
            format!("  audioPath: {}", resolved.audio_path.display()),
            format!("  title: {}", resolved.title),
            format!("  description: {}", resolved.description),
            format!("  season: {}", resolved.season),
            format!("  episode: {}", resolved.episode),
        ]
        .join("\n")
    }
}

pub async fn execute(context: &AppContext, args: &UploadArgs) -> Result<UploadReport> {
    let mut request = args.to_request();
    if let Some(path) = &args.config {
        request = request.merged_over(read_request_file(path)?);
    }
    let options = request.validate()?;

    let orchestrator =
        UploadOrchestrator::new(Arc::clone(&context.config), context.paths.clone());
    let outcome = orchestrator.run(options).await?;
    Ok(match outcome {
        UploadOutcome::DryRun(resolved) => UploadReport {
            status: "dry-run",
            resolved,
        },
        UploadOutcome::Published(resolved) => UploadReport {
            status: "published",
            resolved,
        },
    })
}

fn read_request_file(path: &Path) -> Result<UploadRequest> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|err| AppError::UploadConfig {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })
}
