//! Stream selection module
//!
//! This module decides which streams of a container are kept:
//! - Closed set of selection rules and per-kind rule chains
//! - Rule engine with short-circuit, tie preservation and fail-soft steps
//! - Subtitle rule-sets evaluated against a shrinking pool
//! - Foreign-audio detection from caption density

pub mod engine;
pub mod foreign;
pub mod rules;
pub mod subtitle;

pub use engine::select;
pub use foreign::{ForeignAudioHeuristic, SparsePick};
pub use rules::{Extreme, ResolutionPolicy, RuleChain, RuleSet, SelectionRule};
pub use subtitle::{select_subtitles, SubtitleSelection};
