//! CLI binary for storycast.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use storycast::{AppConfig, ImageInput, PipelineCoordinator, PipelineEvent};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Storycast: caption a picture, joke about it, and read the joke aloud.
#[derive(Parser)]
#[command(name = "storycast", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "STORYCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Also write daily-rotated logs to this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Turn an image into a narrated story.
    Run {
        /// Image file to caption.
        image: PathBuf,

        /// Where to write the audio. The extension is set from the codec.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write the default configuration file.
    InitConfig {
        /// Destination (defaults to the platform config directory).
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before tracing so RUST_LOG from .env applies.
    let env_file = storycast::startup::load_environment();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref())?;
    if let Some(path) = env_file {
        info!(path = %path.display(), "loaded .env");
    }

    match cli.command {
        Command::Run { image, out } => run(cli.config.as_deref(), &image, out).await,
        Command::InitConfig { path } => init_config(path),
    }
}

/// Stderr logging, plus an optional daily file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("storycast=info,reqwest=warn,hyper=warn"))
    };

    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(stderr).init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "storycast.log"));
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter());

    tracing_subscriber::registry().with(stderr).with(file).init();
    Ok(Some(guard))
}

async fn run(
    config_path: Option<&Path>,
    image_path: &Path,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = AppConfig::load(config_path)?;
    let context = storycast::startup::build_context(&config)?;

    let image = ImageInput::from_path(image_path)
        .await
        .with_context(|| format!("cannot read image {}", image_path.display()))?;

    // Live preview goes to stderr; stdout only gets the final result.
    let coordinator =
        PipelineCoordinator::new(Arc::new(context)).with_progress(Box::new(|event| {
            let mut err = std::io::stderr();
            let _ = match event {
                PipelineEvent::CaptionReady { caption } => {
                    write!(err, "[caption] {caption}\n[story] ")
                }
                PipelineEvent::StoryFragment { text } => write!(err, "{text}"),
                PipelineEvent::StoryReady { .. } => writeln!(err),
                PipelineEvent::AudioReady { .. } | PipelineEvent::AudioFailed { .. } => Ok(()),
            };
            let _ = err.flush();
        }));

    let result = match coordinator.run(image).await {
        Ok(result) => result,
        Err(failure) => {
            if let Some(caption) = &failure.caption {
                println!("Caption: {caption}");
            }
            return Err(failure.into());
        }
    };

    println!("Caption: {}", result.caption);
    println!("Story: {}", result.story);

    match &result.audio {
        Ok(audio) => {
            let path = out
                .unwrap_or_else(|| PathBuf::from("story"))
                .with_extension(audio.mime.file_extension());
            std::fs::write(&path, &audio.bytes)
                .with_context(|| format!("cannot write audio to {}", path.display()))?;
            println!("Audio ({}): {}", audio.mime, path.display());
        }
        Err(e) => println!("Audio unavailable: {e}"),
    }

    Ok(())
}

fn init_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(AppConfig::default_config_path);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    AppConfig::default().save_to_file(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
