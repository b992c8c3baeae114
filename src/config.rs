//! Pipeline configuration
//!
//! Validated, read-only settings built once from the TOML file (see
//! `config_file`). Rule chains are already closed `SelectionRule` values.

use std::path::PathBuf;
use std::time::Duration;

use crate::select::rules::{Extreme, ResolutionPolicy, RuleChain, RuleSet, SelectionRule};
use crate::types::StreamKind;

/// Stream selection configuration
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub video: RuleChain,
    pub audio: RuleChain,
    /// Subtitle rule-sets, evaluated in order against a shrinking pool
    pub subtitle: Vec<RuleSet>,
    /// Codec names of bitmap subtitles that need OCR
    pub image_codecs: Vec<String>,
    /// Transcript extractions run concurrently within one batch
    pub foreign_batch_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            video: RuleChain::new(
                StreamKind::Video,
                vec![
                    SelectionRule::Resolution(ResolutionPolicy::Extreme(Extreme::Max)),
                    SelectionRule::Duration(Extreme::Max),
                ],
            ),
            audio: RuleChain::new(
                StreamKind::Audio,
                vec![SelectionRule::Language(vec!["eng".to_string()])],
            ),
            subtitle: vec![
                RuleSet::new(
                    "foreign",
                    vec![
                        SelectionRule::Language(vec!["eng".to_string()]),
                        SelectionRule::ForeignAudio,
                    ],
                ),
                RuleSet::new(
                    "default",
                    vec![SelectionRule::Language(vec!["eng".to_string()])],
                ),
            ],
            image_codecs: default_image_codecs(),
            foreign_batch_size: 4,
        }
    }
}

pub fn default_image_codecs() -> Vec<String> {
    ["hdmv_pgs_subtitle", "dvd_subtitle", "dvb_subtitle", "xsub"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Bounded retry for external invocations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; grows linearly after that
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before the given (1-based) retry
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff * retry
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// External tool settings
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    /// Combined stdout+stderr bound for each invocation
    pub max_output_bytes: usize,
    /// Soft wait cap for probe and extraction
    pub wait_cap: Duration,
    /// Soft wait cap for the encoder
    pub encode_wait_cap: Duration,
    /// Output bound for the OCR dump, which is line-per-frame
    pub max_ocr_output_bytes: usize,
    /// Canvas bitmap subtitles are rendered onto before OCR
    pub ocr_canvas: String,
    pub retry: RetryPolicy,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: PathBuf::from("ffprobe"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            max_output_bytes: 400 * 1024,
            wait_cap: Duration::from_secs(10 * 60),
            encode_wait_cap: Duration::from_secs(12 * 60 * 60),
            max_ocr_output_bytes: 16 * 1024 * 1024,
            ocr_canvas: "1920x1080".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Encoder choice for one kind
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub encoder: String,
    pub options: Vec<String>,
}

impl EncoderConfig {
    pub fn copy() -> Self {
        Self {
            encoder: "copy".to_string(),
            options: Vec::new(),
        }
    }
}

/// Encode output settings
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    /// Directory the encoded file is written to
    pub path: PathBuf,
    /// Options placed before the inputs
    pub global_options: Vec<String>,
    pub video: EncoderConfig,
    pub audio: EncoderConfig,
    pub subtitle: EncoderConfig,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Complete pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub selection: SelectionConfig,
    pub tools: ToolsConfig,
    /// Where generated caption files go; `None` means next to the input
    pub caption_dir: Option<PathBuf>,
    /// Encode settings; `None` disables encoding
    pub output: Option<OutputConfig>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            selection: SelectionConfig::default(),
            tools: ToolsConfig::default(),
            caption_dir: None,
            output: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
