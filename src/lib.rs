//! Stream selection and caption synthesis
//!
//! Decides which elementary streams of a media container to keep:
//! - Catalogs the probe report per stream kind
//! - Narrows each kind through an ordered rule chain
//! - Picks subtitle roles through independent rule-sets, including a
//!   foreign-audio density heuristic
//! - Turns OCR transcripts of bitmap subtitles into SubRip captions

/// Lazily compiled static regex
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

pub mod config;
pub mod config_file;
pub mod encode;
pub mod error;
pub mod ingest;
pub mod probe;
pub mod select;
pub mod subtitle;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod integration;

pub use config::PipelineConfig;
pub use error::{Result, SelectError};
pub use ingest::Pipeline;
pub use types::{CandidateSet, IngestContext, Selection, StreamDescriptor, StreamKind};
