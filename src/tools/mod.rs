//! External media tools
//!
//! This module wraps the programs the pipeline treats as black boxes:
//! - Probing a container into a structured report
//! - Dumping a subtitle stream as text
//! - Dumping an OCR transcript of a bitmap subtitle stream
//! - Running the final encode

pub mod ffmpeg;
pub mod runner;

use std::future::Future;

use crate::error::Result;
use crate::probe::ProbeResult;
use crate::types::IngestContext;

pub use ffmpeg::FfmpegTools;
pub use runner::{CommandOutput, CommandRunner, ProcessLimits};

/// Collaborator interface for everything that spawns an external process.
///
/// Each call is atomic and blocking from the pipeline's point of view; retry
/// and wait caps are the implementation's concern.
pub trait MediaTools: Send + Sync {
    /// Probe the input container
    fn probe(&self, ctx: &IngestContext) -> impl Future<Output = Result<ProbeResult>> + Send;

    /// Dump one subtitle stream in the given text format (e.g. "srt")
    fn extract_transcript(
        &self,
        ctx: &IngestContext,
        stream_index: usize,
        format_hint: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Dump the OCR transcript of one image-based subtitle stream
    fn extract_ocr_transcript(
        &self,
        ctx: &IngestContext,
        stream_index: usize,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Run the encoder with a fully assembled argument list
    fn encode(&self, ctx: &IngestContext, args: &[String]) -> impl Future<Output = Result<()>> + Send;
}
