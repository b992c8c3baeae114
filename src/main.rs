//! Stream selection tool
//!
//! Probes each media file given on the command line, selects the video,
//! audio and subtitle streams to keep, synthesises captions for bitmap
//! subtitles and prints the selection as JSON. When an `[output]` section is
//! configured the selected streams are encoded as well.
//!
//! Usage: `stream-select <config.toml> <media>...`

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stream_select::config::LogFormat;
use stream_select::config_file::ConfigFile;
use stream_select::encode::build_encode_args;
use stream_select::tools::{FfmpegTools, MediaTools};
use stream_select::{IngestContext, Pipeline, PipelineConfig, Result};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "stream-select";

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.toml".to_string());
    let media: Vec<String> = args.collect();

    // Load configuration before logging so the configured level applies
    let (config, config_note) = match load_config(&config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}: invalid configuration {}: {}", APP_NAME, config_path, e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.log_level, config.log_format);
    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(note) = config_note {
        tracing::warn!("{}", note);
    }
    tracing::debug!("Configuration loaded: {:?}", config);

    if media.is_empty() {
        tracing::error!("No media files given. Usage: {} <config.toml> <media>...", APP_NAME);
        return ExitCode::FAILURE;
    }

    let tools = FfmpegTools::new(&config.tools);
    let pipeline = Pipeline::new(config, tools);

    let mut failed = 0;
    for path in &media {
        let ctx = IngestContext::new(path);
        if let Err(e) = ingest(&pipeline, &ctx).await {
            tracing::error!(id = %ctx.id, "Ingestion of {} failed: {}", path, e);
            failed += 1;
        }
    }

    if failed > 0 {
        tracing::error!("{} of {} file(s) failed", failed, media.len());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Load the configuration file, or defaults when it does not exist.
/// Returns a note to log once logging is up.
fn load_config(path: &str) -> Result<(PipelineConfig, Option<String>)> {
    if Path::new(path).exists() {
        let config = ConfigFile::from_file(path)?.into_pipeline_config()?;
        Ok((config, None))
    } else {
        Ok((
            PipelineConfig::default(),
            Some(format!("Config file {} not found, using defaults", path)),
        ))
    }
}

/// Select streams for one file, print the selection and optionally encode
async fn ingest(pipeline: &Pipeline<FfmpegTools>, ctx: &IngestContext) -> Result<()> {
    let selection = pipeline.run(ctx).await?;
    println!("{}", serde_json::to_string_pretty(&selection)?);

    let Some(output) = &pipeline.config().output else {
        return Ok(());
    };

    let args = build_encode_args(ctx, &selection, output);
    tracing::debug!("Encode arguments: {:?}", args);

    let started = Instant::now();
    pipeline.tools().encode(ctx, &args).await?;
    let elapsed = started.elapsed();
    tracing::info!(
        id = %ctx.id,
        "Conversion took {}m {}s.{:03}",
        elapsed.as_secs() / 60,
        elapsed.as_secs() % 60,
        elapsed.subsec_millis()
    );
    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("stream_select={level}").into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
