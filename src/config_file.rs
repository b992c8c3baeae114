//! Configuration file support
//!
//! Loads pipeline configuration from TOML files. Rule entries are single-key
//! tables (`{ resolution = "max" }`, `{ language = ["eng"] }`) and are
//! validated into `SelectionRule` values when the file is converted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toml::Value;

use crate::config::{
    default_image_codecs, EncoderConfig, LogFormat, OutputConfig, PipelineConfig, RetryPolicy,
    SelectionConfig, ToolsConfig,
};
use crate::error::{Result, SelectError};
use crate::select::rules::{Extreme, ResolutionPolicy, RuleChain, RuleSet, SelectionRule};
use crate::types::StreamKind;

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Selection rules
    pub selection: SelectionSettings,
    /// External tool settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsSettings>,
    /// Generated caption settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captions: Option<CaptionSettings>,
    /// Encode output settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSettings>,
    /// Logging settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Codec names of bitmap subtitles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_codecs: Option<Vec<String>>,
    /// Concurrent transcript extractions per batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_batch_size: Option<usize>,
    #[serde(default)]
    pub video: Vec<RuleEntry>,
    #[serde(default)]
    pub audio: Vec<RuleEntry>,
    /// Ordered subtitle rule-sets
    #[serde(default)]
    pub subtitle: Vec<RuleSetEntry>,
}

/// One rule as written in the file: a table with exactly one key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleEntry(pub BTreeMap<String, Value>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetEntry {
    /// Role name used in logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffprobe: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<PathBuf>,
    /// Combined output bound per invocation in KiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_kb: Option<usize>,
    /// Output bound of the OCR dump in KiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ocr_output_kb: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_cap_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encode_wait_cap_secs: Option<u64>,
    /// OCR canvas size, e.g. "1920x1080"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_canvas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionSettings {
    /// Directory for generated caption files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory encoded files are written to
    pub path: PathBuf,
    /// Options placed before the inputs
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<EncoderSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<EncoderSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<EncoderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub encoder: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl RuleEntry {
    pub fn new(key: &str, value: impl Into<Value>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.to_string(), value.into());
        RuleEntry(map)
    }

    /// Validate this entry into a rule for a chain of the given kind
    pub fn to_rule(&self, kind: StreamKind) -> Result<SelectionRule> {
        let mut entries = self.0.iter();
        let (key, value) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                let keys: Vec<&str> = self.0.keys().map(String::as_str).collect();
                return Err(SelectError::invalid_rule(
                    kind.as_str(),
                    format!("expected exactly one key per rule, found {:?}", keys),
                ));
            }
        };
        let invalid = || SelectError::invalid_rule(kind.as_str(), format!("{} = {}", key, value));

        match key.as_str() {
            "resolution" => match value {
                Value::String(s) => match Extreme::parse(s) {
                    Some(extreme) => Ok(SelectionRule::Resolution(ResolutionPolicy::Extreme(extreme))),
                    None => s
                        .trim()
                        .parse::<u32>()
                        .map(|w| SelectionRule::Resolution(ResolutionPolicy::Exact(w)))
                        .map_err(|_| invalid()),
                },
                Value::Integer(w) => u32::try_from(*w)
                    .map(|w| SelectionRule::Resolution(ResolutionPolicy::Exact(w)))
                    .map_err(|_| invalid()),
                _ => Err(invalid()),
            },
            "duration" => value
                .as_str()
                .and_then(Extreme::parse)
                .map(SelectionRule::Duration)
                .ok_or_else(invalid),
            "language" => string_list(value)
                .map(SelectionRule::Language)
                .ok_or_else(invalid),
            "codec" => string_list(value)
                .map(SelectionRule::Codec)
                .ok_or_else(invalid),
            "foreign" => match (kind, value) {
                (StreamKind::Subtitle, Value::Boolean(true)) => Ok(SelectionRule::ForeignAudio),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

/// A string or an array of strings
fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn to_chain(kind: StreamKind, entries: &[RuleEntry]) -> Result<RuleChain> {
    let rules = entries
        .iter()
        .map(|entry| entry.to_rule(kind))
        .collect::<Result<Vec<_>>>()?;
    Ok(RuleChain::new(kind, rules))
}

fn to_encoder(settings: Option<EncoderSettings>) -> EncoderConfig {
    settings
        .map(|s| EncoderConfig {
            encoder: s.encoder,
            options: s.options,
        })
        .unwrap_or_else(EncoderConfig::copy)
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SelectError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SelectError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let eng = || vec!["eng"];
        Self {
            selection: SelectionSettings {
                image_codecs: Some(default_image_codecs()),
                foreign_batch_size: Some(4),
                video: vec![
                    RuleEntry::new("resolution", "max"),
                    RuleEntry::new("duration", "max"),
                ],
                audio: vec![RuleEntry::new("language", eng())],
                subtitle: vec![
                    RuleSetEntry {
                        name: Some("foreign".to_string()),
                        rules: vec![
                            RuleEntry::new("language", eng()),
                            RuleEntry::new("foreign", true),
                        ],
                    },
                    RuleSetEntry {
                        name: Some("default".to_string()),
                        rules: vec![RuleEntry::new("language", eng())],
                    },
                ],
            },
            tools: Some(ToolsSettings {
                ffprobe: Some(PathBuf::from("ffprobe")),
                ffmpeg: Some(PathBuf::from("ffmpeg")),
                max_output_kb: Some(400),
                ..Default::default()
            }),
            captions: None,
            output: None,
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Validate and convert to PipelineConfig
    pub fn into_pipeline_config(self) -> Result<PipelineConfig> {
        let defaults = PipelineConfig::default();

        let selection = self.selection;
        let foreign_batch_size = selection
            .foreign_batch_size
            .unwrap_or(defaults.selection.foreign_batch_size);
        if foreign_batch_size == 0 {
            return Err(SelectError::Config(
                "selection.foreign_batch_size must be at least 1".to_string(),
            ));
        }

        let subtitle = selection
            .subtitle
            .iter()
            .enumerate()
            .map(|(i, set)| {
                Ok(RuleSet {
                    name: set
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("rule-set {}", i + 1)),
                    chain: to_chain(StreamKind::Subtitle, &set.rules)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let selection = SelectionConfig {
            video: to_chain(StreamKind::Video, &selection.video)?,
            audio: to_chain(StreamKind::Audio, &selection.audio)?,
            subtitle,
            image_codecs: selection
                .image_codecs
                .unwrap_or(defaults.selection.image_codecs),
            foreign_batch_size,
        };

        let tools = match self.tools {
            None => defaults.tools,
            Some(t) => {
                let base = defaults.tools;
                ToolsConfig {
                    ffprobe_path: t.ffprobe.unwrap_or(base.ffprobe_path),
                    ffmpeg_path: t.ffmpeg.unwrap_or(base.ffmpeg_path),
                    max_output_bytes: t
                        .max_output_kb
                        .map(|kb| kb * 1024)
                        .unwrap_or(base.max_output_bytes),
                    max_ocr_output_bytes: t
                        .max_ocr_output_kb
                        .map(|kb| kb * 1024)
                        .unwrap_or(base.max_ocr_output_bytes),
                    wait_cap: t
                        .wait_cap_secs
                        .map(Duration::from_secs)
                        .unwrap_or(base.wait_cap),
                    encode_wait_cap: t
                        .encode_wait_cap_secs
                        .map(Duration::from_secs)
                        .unwrap_or(base.encode_wait_cap),
                    ocr_canvas: t.ocr_canvas.unwrap_or(base.ocr_canvas),
                    retry: RetryPolicy {
                        max_attempts: t.retry_attempts.unwrap_or(base.retry.max_attempts),
                        backoff: t
                            .retry_backoff_ms
                            .map(Duration::from_millis)
                            .unwrap_or(base.retry.backoff),
                    },
                }
            }
        };

        let output = self.output.map(|o| OutputConfig {
            path: o.path,
            global_options: o.options,
            video: to_encoder(o.video),
            audio: to_encoder(o.audio),
            subtitle: to_encoder(o.subtitle),
        });

        let (log_level, log_format) = match self.logging {
            None => (defaults.log_level, defaults.log_format),
            Some(l) => {
                let format = match l.format.as_deref() {
                    None | Some("pretty") => LogFormat::Pretty,
                    Some("json") => LogFormat::Json,
                    Some(other) => {
                        return Err(SelectError::Config(format!(
                            "unknown logging format '{}'",
                            other
                        )))
                    }
                };
                (l.level, format)
            }
        };

        Ok(PipelineConfig {
            selection,
            tools,
            caption_dir: self.captions.and_then(|c| c.dir),
            output,
            log_level,
            log_format,
        })
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigFile::default_config().to_file(path)
}
