//! Catalog builder - normalises probe metadata into per-kind candidates

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SelectError};
use crate::types::{CandidateSet, StreamDescriptor, StreamKind};

/// Matroska stores per-track statistics as tags, optionally suffixed with a
/// language (e.g. `NUMBER_OF_FRAMES-eng`).
const FRAME_COUNT_TAG: &str = "NUMBER_OF_FRAMES";

/// Structured prober report
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeResult {
    /// Absent when the prober could not read the container
    #[serde(default)]
    pub streams: Option<Vec<ProbeStream>>,
    #[serde(default)]
    pub format: Option<Value>,
}

/// One stream record of the prober report
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeStream {
    pub index: Option<usize>,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    /// ffprobe reports durations as strings; accept numbers too
    pub duration: Option<Value>,
    #[serde(default)]
    pub tags: BTreeMap<String, Value>,
}

impl ProbeResult {
    /// Parse the prober's JSON output
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SelectError::MalformedProbeData(format!("JSON parse error: {}", e)))
    }
}

impl ProbeStream {
    fn declared_duration(&self) -> Option<f64> {
        let secs = match self.duration.as_ref()? {
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            Value::Number(n) => n.as_f64()?,
            _ => return None,
        };
        secs.is_finite().then_some(secs)
    }

    fn frame_count(&self) -> Option<u64> {
        self.tags
            .iter()
            .find(|(key, _)| {
                key.as_str() == FRAME_COUNT_TAG
                    || key
                        .strip_prefix(FRAME_COUNT_TAG)
                        .is_some_and(|rest| rest.starts_with('-'))
            })
            .and_then(|(_, value)| match value {
                Value::String(s) => s.trim().parse().ok(),
                Value::Number(n) => n.as_u64(),
                _ => None,
            })
    }

    fn language(&self) -> Option<String> {
        self.tags
            .get("language")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// Candidates partitioned by kind, each in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub video: CandidateSet,
    pub audio: CandidateSet,
    pub subtitle: CandidateSet,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.video.len() + self.audio.len() + self.subtitle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the per-kind candidate sets from a probe result
pub fn build_catalog(probe: &ProbeResult) -> Result<Catalog> {
    let streams = probe
        .streams
        .as_ref()
        .ok_or_else(|| SelectError::MalformedProbeData("no 'streams' list".to_string()))?;

    let mut catalog = Catalog::default();
    let mut seen = HashSet::new();

    for (position, stream) in streams.iter().enumerate() {
        let index = stream.index.ok_or_else(|| {
            SelectError::MalformedProbeData(format!("stream #{} has no index", position))
        })?;
        if !seen.insert(index) {
            return Err(SelectError::MalformedProbeData(format!(
                "duplicate stream index {}",
                index
            )));
        }

        let Some(kind) = stream
            .codec_type
            .as_deref()
            .and_then(StreamKind::from_codec_type)
        else {
            tracing::debug!(
                "Skipping stream {} (type={:?})",
                index,
                stream.codec_type
            );
            continue;
        };

        let descriptor = StreamDescriptor {
            index,
            kind,
            codec_name: stream
                .codec_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            width: stream.width.filter(|_| kind == StreamKind::Video),
            duration_secs: stream.declared_duration(),
            frame_count: stream.frame_count(),
            language: stream.language(),
            caption_file: None,
        };

        tracing::debug!(
            "Found {} stream {}: codec={}, language={:?}",
            kind,
            index,
            descriptor.codec_name,
            descriptor.language
        );

        match kind {
            StreamKind::Video => catalog.video.push(descriptor),
            StreamKind::Audio => catalog.audio.push(descriptor),
            StreamKind::Subtitle => catalog.subtitle.push(descriptor),
        }
    }

    tracing::info!(
        "Catalog built: video={}, audio={}, subtitles={}",
        catalog.video.len(),
        catalog.audio.len(),
        catalog.subtitle.len()
    );

    Ok(catalog)
}
