use std::path::PathBuf;
use std::sync::Arc;

use castpub_core::upload::UploadRequest;
use castpub_core::{
    load_runner_config, PathOverrides, ResolvedPaths, RunnerConfig, SessionError, UploadError,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;

pub mod commands;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] castpub_core::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    Input(#[from] castpub_core::upload::InputError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Browser(#[from] castpub_core::browser::BrowserError),
    #[error(transparent)]
    Store(#[from] castpub_core::session::StoreError),
    #[error("invalid upload config file {path}: {detail}")]
    UploadConfig { path: PathBuf, detail: String },
}

impl AppError {
    /// Actionable hint printed next to the error, when one exists.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            AppError::Upload(err) => err.remediation(),
            AppError::Session(err) => Some(err.remediation()),
            _ => None,
        }
    }

    /// Whether re-running the capture step (or fixing the input) should
    /// clear the condition. Drives the boundary's exit code: recoverable
    /// failures exit 1, the rest exit 2.
    pub fn recoverable(&self) -> bool {
        match self {
            AppError::Upload(err) => err.recoverable(),
            AppError::Session(err) => err.recoverable(),
            _ => true,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Podcast episode publishing automation", long_about = None)]
pub struct Cli {
    /// Runner configuration (TOML); built-in defaults when the file is absent
    #[arg(long, default_value = "configs/castpub.toml")]
    pub runner_config: PathBuf,
    /// Session file override; wins over CASTPUB_AUTH_PATH
    #[arg(long)]
    pub auth_path: Option<PathBuf>,
    /// Failure-screenshot directory override; wins over CASTPUB_OUTPUT_DIR
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publishes one episode through the upload wizard
    Upload(UploadArgs),
    /// Saved-session operations
    #[command(subcommand)]
    Auth(AuthCommands),
}

#[derive(Args, Debug, Default)]
pub struct UploadArgs {
    /// Platform show identifier
    #[arg(long = "showId")]
    pub show_id: Option<String>,
    /// Audio file, or a directory resolved to its newest file
    #[arg(long = "audioPath")]
    pub audio_path: Option<PathBuf>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub season: Option<String>,
    #[arg(long)]
    pub episode: Option<String>,
    /// Resolve and echo all parameters without touching the network
    #[arg(long = "dryRun", default_value_t = false)]
    pub dry_run: bool,
    /// JSON file with the same keys as the flags; flags win
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Validates the saved session without launching a browser
    Check(AuthCheckArgs),
    /// Interactive login capture; writes the session file
    Capture,
}

#[derive(Args, Debug)]
pub struct AuthCheckArgs {
    /// Age limit override in hours
    #[arg(long)]
    pub max_age_hours: Option<f64>,
}

pub async fn run(cli: Cli) -> Result<()> {
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Upload(args) => {
            let report = commands::upload::execute(&context, args).await?;
            render(&report, cli.format)?;
        }
        Commands::Auth(AuthCommands::Check(args)) => {
            let report = commands::auth::check(&context, args)?;
            render(&report, cli.format)?;
        }
        Commands::Auth(AuthCommands::Capture) => {
            let report = commands::auth::capture(&context).await?;
            render(&report, cli.format)?;
        }
    }

    Ok(())
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
            Ok(())
        }
    }
}

pub(crate) trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug)]
pub struct AppContext {
    pub config: Arc<RunnerConfig>,
    pub paths: ResolvedPaths,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        // Missing runner config is not an error; every key has a default.
        let config = if cli.runner_config.is_file() {
            load_runner_config(&cli.runner_config)?
        } else {
            RunnerConfig::default()
        };

        let overrides = PathOverrides {
            auth_file: cli.auth_path.clone(),
            screenshot_dir: cli.output_dir.clone(),
        };
        let paths = ResolvedPaths::resolve(&overrides);

        Ok(Self {
            config: Arc::new(config),
            paths,
        })
    }
}

impl UploadArgs {
    /// Flag values as a request layer; merges over any config file.
    pub fn to_request(&self) -> UploadRequest {
        UploadRequest {
            show_id: self.show_id.clone(),
            audio_path: self.audio_path.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            season: self.season.clone(),
            episode: self.episode.clone(),
            dry_run: if self.dry_run { Some(true) } else { None },
        }
    }
}

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
