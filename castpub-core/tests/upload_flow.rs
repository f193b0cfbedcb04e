use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use castpub_core::config::RunnerConfig;
use castpub_core::paths::{PathOverrides, ResolvedPaths};
use castpub_core::session::{AuthState, AuthStateStore, SessionCookie, SessionError};
use castpub_core::upload::{
    InputError, UploadError, UploadOptions, UploadOrchestrator, UploadOutcome, UploadRequest,
};
use chrono::Utc;
use tempfile::tempdir;

fn orchestrator_with_auth(auth_file: PathBuf) -> UploadOrchestrator {
    let overrides = PathOverrides {
        auth_file: Some(auth_file),
        screenshot_dir: None,
    };
    let paths = ResolvedPaths::resolve_with(&overrides, |_| None);
    UploadOrchestrator::new(Arc::new(RunnerConfig::default()), paths)
}

fn options(audio_path: PathBuf, dry_run: bool) -> UploadOptions {
    UploadOptions {
        show_id: "show123".to_string(),
        audio_path,
        title: "Episode 7".to_string(),
        description: "Notes for episode seven".to_string(),
        season: None,
        episode: None,
        dry_run,
    }
}

fn sample_cookie() -> SessionCookie {
    SessionCookie {
        name: "sp_dc".to_string(),
        value: "token".to_string(),
        domain: ".spotify.com".to_string(),
        path: "/".to_string(),
        expires: (Utc::now().timestamp() + 86_400) as f64,
        http_only: true,
        secure: true,
        same_site: Some("Lax".to_string()),
    }
}

#[tokio::test]
async fn directory_audio_source_resolves_to_newest_file() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.mp3");
    let newest = dir.path().join("newest.mp3");
    File::create(&old).unwrap();
    File::create(&newest).unwrap();
    let base = SystemTime::now() - Duration::from_secs(7200);
    File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(base)
        .unwrap();
    File::options()
        .write(true)
        .open(&newest)
        .unwrap()
        .set_modified(base + Duration::from_secs(60))
        .unwrap();

    let orchestrator = orchestrator_with_auth(dir.path().join("no-auth.json"));
    let outcome = orchestrator
        .run(options(dir.path().to_path_buf(), true))
        .await
        .unwrap();
    let resolved = outcome.resolved();
    assert!(resolved.audio_path.is_absolute());
    assert_eq!(resolved.audio_path.file_name().unwrap(), "newest.mp3");
}

#[tokio::test]
async fn missing_audio_path_fails_before_any_session_activity() {
    // The auth file does not exist either; an input error proves path
    // resolution ran first.
    let orchestrator = orchestrator_with_auth(PathBuf::from("/nonexistent/auth.json"));
    let err = orchestrator
        .run(options(PathBuf::from("/nonexistent/audio.mp3"), false))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        UploadError::Input(InputError::PathNotFound { .. })
    ));
}

#[tokio::test]
async fn empty_directory_fails_with_no_audio_file_found() {
    let dir = tempdir().unwrap();
    let orchestrator = orchestrator_with_auth(PathBuf::from("/nonexistent/auth.json"));
    let err = orchestrator
        .run(options(dir.path().to_path_buf(), false))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        UploadError::Input(InputError::NoAudioFileFound { .. })
    ));
}

#[tokio::test]
async fn dry_run_reports_resolved_values_without_session_validation() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("episode.mp3");
    File::create(&audio).unwrap();

    // A deliberately unusable auth path; a dry run must never read it.
    let orchestrator = orchestrator_with_auth(PathBuf::from("/nonexistent/auth.json"));
    let outcome = orchestrator.run(options(audio, true)).await.unwrap();

    let resolved = match &outcome {
        UploadOutcome::DryRun(resolved) => resolved,
        other => panic!("expected dry run outcome, got {other:?}"),
    };
    assert_eq!(resolved.show_id, "show123");
    assert_eq!(resolved.season, "1");
    assert!(!resolved.episode.is_empty());

    let json = serde_json::to_value(resolved).unwrap();
    for key in ["showId", "audioPath", "title", "description", "season", "episode"] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
}

#[tokio::test]
async fn missing_required_fields_are_all_cited_before_path_resolution() {
    let request = UploadRequest {
        season: Some("3".to_string()),
        ..UploadRequest::default()
    };
    let err = request.validate().unwrap_err();
    let message = err.to_string();
    for field in ["showId", "audioPath", "title", "description"] {
        assert!(message.contains(field), "message should cite {field}");
    }
}

#[tokio::test]
async fn missing_session_file_gates_the_run_before_browser_launch() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("episode.mp3");
    File::create(&audio).unwrap();

    let orchestrator = orchestrator_with_auth(dir.path().join("absent-auth.json"));
    let err = orchestrator.run(options(audio, false)).await.unwrap_err();
    match err {
        UploadError::Session(session_err) => {
            assert!(matches!(session_err, SessionError::NotFound { .. }));
            assert!(session_err.remediation().contains("auth capture"));
        }
        other => panic!("expected session error, got {other:?}"),
    }
}

#[tokio::test]
async fn expired_session_gates_the_run_before_browser_launch() {
    let dir = tempdir().unwrap();
    let audio = dir.path().join("episode.mp3");
    File::create(&audio).unwrap();

    let auth_file = dir.path().join("auth.json");
    let store = AuthStateStore::new(&auth_file);
    let mut state = AuthState::capture(vec![sample_cookie()]);
    state.timestamp = Utc::now().timestamp_millis() - 1_000 * 3_600 * 1_000;
    store.save(&state).unwrap();

    let orchestrator = orchestrator_with_auth(auth_file);
    let err = orchestrator.run(options(audio, false)).await.unwrap_err();
    assert!(matches!(
        err,
        UploadError::Session(SessionError::Expired { .. })
    ));
}
