//! Caption synthesis module
//!
//! This module turns OCR output of bitmap subtitles into text captions:
//! - Caption cue and timestamp types
//! - OCR transcript parsing (frame marker + text line state machine)
//! - SubRip (SRT) rendering and cue counting

pub mod cue;
pub mod ocr;
pub mod srt;

pub use cue::{CaptionCue, Timestamp};
pub use ocr::parse_ocr_transcript;
pub use srt::{count_srt_cues, format_srt};
