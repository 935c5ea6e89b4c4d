//! Cellar CLI: run the training pipeline, a single stage, the inference
//! service, or an offline prediction.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "cellar", version, about, long_about = None)]
pub struct Cli {
    /// Workspace holding config/, schema.yaml, params.yaml and artifacts/
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline (the default)
    Run,
    /// Run one stage against the artifacts already on disk
    Stage {
        /// ingestion, validation, transformation, training or evaluation
        stage: cellar_ml::PipelineStage,
    },
    /// Start the prediction web service
    Serve {
        /// Bind address (defaults to server.host in config.yaml)
        #[arg(long)]
        host: Option<String>,
        /// Port (defaults to server.port in config.yaml)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Predict one sample with the trained model
    Predict {
        /// Feature value as "<feature>=<number>", once per feature
        #[arg(long = "value", value_name = "FEATURE=NUMBER", required = true)]
        values: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| cli.workspace.clone());

    // Human-readable stderr plus JSON lines in <workspace>/logs
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = workspace.join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "cellar.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    commands::handle_command(cli.command.unwrap_or(Commands::Run), &workspace).await
}
