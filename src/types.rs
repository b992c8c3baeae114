//! Shared stream and ingestion types

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

/// Elementary stream kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

impl StreamKind {
    /// Map an ffprobe `codec_type` onto a stream kind
    pub fn from_codec_type(codec_type: &str) -> Option<Self> {
        match codec_type {
            "video" => Some(StreamKind::Video),
            "audio" => Some(StreamKind::Audio),
            "subtitle" => Some(StreamKind::Subtitle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::Subtitle => "subtitle",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One elementary stream of the source container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDescriptor {
    /// Stream index in the source container (unique)
    pub index: usize,
    pub kind: StreamKind,
    /// Codec name as reported by the prober (e.g. "h264", "hdmv_pgs_subtitle")
    pub codec_name: String,
    /// Width in pixels (video only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Declared duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Frame count from container tags, used when no duration is declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
    /// Language tag (e.g. "eng")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Generated caption file replacing an image-based subtitle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_file: Option<PathBuf>,
}

impl StreamDescriptor {
    /// Create a descriptor with only identity and codec set
    pub fn new(index: usize, kind: StreamKind, codec_name: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            codec_name: codec_name.into(),
            width: None,
            duration_secs: None,
            frame_count: None,
            language: None,
            caption_file: None,
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_frame_count(mut self, frames: u64) -> Self {
        self.frame_count = Some(frames);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Attach a generated caption file. Identity is unchanged.
    pub fn with_caption_file(mut self, path: PathBuf) -> Self {
        self.caption_file = Some(path);
        self
    }

    /// Value used by duration rules: the declared duration, else the frame
    /// count tag. `None` means the duration is undefined.
    pub fn duration_value(&self) -> Option<f64> {
        self.duration_secs
            .or_else(|| self.frame_count.map(|frames| frames as f64))
    }

    /// Whether this stream's codec is in the image-based set
    pub fn is_image_based(&self, image_codecs: &[String]) -> bool {
        image_codecs.iter().any(|c| c == &self.codec_name)
    }
}

/// Ordered candidates of one kind, ascending by container index
pub type CandidateSet = Vec<StreamDescriptor>;

/// Final per-kind selection handed to command assembly
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    pub video: CandidateSet,
    pub audio: CandidateSet,
    pub subtitle: CandidateSet,
}

impl Selection {
    /// Container indices selected for a kind
    pub fn indices(&self, kind: StreamKind) -> Vec<usize> {
        let streams = match kind {
            StreamKind::Video => &self.video,
            StreamKind::Audio => &self.audio,
            StreamKind::Subtitle => &self.subtitle,
        };
        streams.iter().map(|s| s.index).collect()
    }

    /// Generated caption files, in subtitle selection order
    pub fn caption_files(&self) -> Vec<&Path> {
        self.subtitle
            .iter()
            .filter_map(|s| s.caption_file.as_deref())
            .collect()
    }
}

/// Everything a single ingestion run needs to know about its input.
/// Passed explicitly to every collaborator call.
#[derive(Debug, Clone)]
pub struct IngestContext {
    /// Unique id for log correlation
    pub id: String,
    pub media_path: PathBuf,
}

impl IngestContext {
    pub fn new(media_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            media_path: media_path.into(),
        }
    }

    /// File name without extension, used to name derived outputs
    pub fn stem(&self) -> String {
        self.media_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string())
    }
}
