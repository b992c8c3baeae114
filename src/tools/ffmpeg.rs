//! FFmpeg / FFprobe backed implementation of `MediaTools`

use crate::config::{RetryPolicy, ToolsConfig};
use crate::error::{Result, SelectError};
use crate::probe::ProbeResult;
use crate::subtitle::ocr::OCR_TEXT_PREFIX;
use crate::types::IngestContext;

use super::runner::{CommandRunner, ProcessLimits};
use super::MediaTools;

/// Runs ffprobe and ffmpeg as child processes
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    ffprobe: CommandRunner,
    ffmpeg: CommandRunner,
    ocr: CommandRunner,
    encoder: CommandRunner,
    ocr_canvas: String,
}

impl FfmpegTools {
    pub fn new(config: &ToolsConfig) -> Self {
        let limits = ProcessLimits {
            max_output_bytes: config.max_output_bytes,
            wait_cap: config.wait_cap,
        };
        let ffmpeg = CommandRunner::new(&config.ffmpeg_path, limits, config.retry);
        let ocr = ffmpeg.with_limits(ProcessLimits {
            max_output_bytes: config.max_ocr_output_bytes,
            wait_cap: config.encode_wait_cap,
        });
        // A failed encode is not worth repeating automatically
        let encoder = CommandRunner::new(
            &config.ffmpeg_path,
            ProcessLimits {
                max_output_bytes: config.max_output_bytes,
                wait_cap: config.encode_wait_cap,
            },
            RetryPolicy::none(),
        );

        Self {
            ffprobe: CommandRunner::new(&config.ffprobe_path, limits, config.retry),
            ffmpeg,
            ocr,
            encoder,
            ocr_canvas: config.ocr_canvas.clone(),
        }
    }

    fn input_path(ctx: &IngestContext) -> String {
        ctx.media_path.to_string_lossy().into_owned()
    }

    /// Arguments for the probe invocation
    pub fn probe_args(ctx: &IngestContext) -> Vec<String> {
        [
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(Self::input_path(ctx)))
        .collect()
    }

    /// Arguments dumping one subtitle stream to stdout
    pub fn transcript_args(ctx: &IngestContext, stream_index: usize, format_hint: &str) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            Self::input_path(ctx),
            "-map".to_string(),
            format!("0:{}", stream_index),
            "-f".to_string(),
            format_hint.to_string(),
            "pipe:1".to_string(),
        ]
    }

    /// Arguments rendering a bitmap subtitle stream onto a canvas, dropping
    /// repeated frames and printing the OCR result of every change.
    ///
    /// The metadata filter writes a `frame:N pts:P pts_time:T` line per frame
    /// followed by `lavfi.ocr.text=...` and any further lines of the text.
    pub fn ocr_args(&self, ctx: &IngestContext, stream_index: usize) -> Vec<String> {
        let key = OCR_TEXT_PREFIX.trim_end_matches('=');
        let graph = format!(
            "color=c=black:s={canvas}[bg];[bg][0:{index}]overlay=shortest=1,mpdecimate,ocr,metadata=mode=print:key={key}:file=pipe\\:1",
            canvas = self.ocr_canvas,
            index = stream_index,
            key = key,
        );
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            Self::input_path(ctx),
            "-filter_complex".to_string(),
            graph,
            "-an".to_string(),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]
    }
}

impl MediaTools for FfmpegTools {
    async fn probe(&self, ctx: &IngestContext) -> Result<ProbeResult> {
        let output = self.ffprobe.run(&Self::probe_args(ctx)).await?;
        ProbeResult::from_json(&output.stdout)
    }

    async fn extract_transcript(
        &self,
        ctx: &IngestContext,
        stream_index: usize,
        format_hint: &str,
    ) -> Result<String> {
        let args = Self::transcript_args(ctx, stream_index, format_hint);
        let output = self
            .ffmpeg
            .run(&args)
            .await
            .map_err(|e| SelectError::ExtractionFailure {
                stream_index,
                reason: e.to_string(),
            })?;
        if !output.stderr.trim().is_empty() {
            tracing::debug!("ffmpeg stderr for stream {}: {}", stream_index, output.stderr.trim());
        }
        Ok(output.stdout)
    }

    async fn extract_ocr_transcript(&self, ctx: &IngestContext, stream_index: usize) -> Result<String> {
        let args = self.ocr_args(ctx, stream_index);
        let output = self
            .ocr
            .run(&args)
            .await
            .map_err(|e| SelectError::ExtractionFailure {
                stream_index,
                reason: e.to_string(),
            })?;
        Ok(output.stdout)
    }

    async fn encode(&self, _ctx: &IngestContext, args: &[String]) -> Result<()> {
        let output = self.encoder.run(args).await?;
        if !output.stderr.trim().is_empty() {
            tracing::debug!("ffmpeg encode stderr: {}", output.stderr.trim());
        }
        Ok(())
    }
}
