//! OCR transcript parser
//!
//! The OCR dump is line oriented. Every emitted frame starts with a marker
//! line carrying `frame:<n>` followed by `pts:` and/or `pts_time:<seconds>`,
//! then exactly one `lavfi.ocr.text=` line. Any further lines up to the next
//! marker belong to the same frame's text. A text line that merely starts
//! with `frame:<n>` is not a marker.
//!
//! A cue runs from the frame that carries its text to the next frame,
//! whatever that frame carries. A frame with text always opens its own cue
//! at its own time, even when it also closes the previous one. A cue still
//! open at end of input has no end time and is dropped. A marker without a
//! usable `pts_time` is timed at zero rather than -1.

use std::iter::{Enumerate, Peekable};
use std::str::Lines;

use crate::error::{Result, SelectError};

use super::cue::{CaptionCue, Timestamp};

/// Key prefix of the recognised-text line
pub const OCR_TEXT_PREFIX: &str = "lavfi.ocr.text=";

/// One frame of OCR output, as read from the transcript
#[derive(Debug, Clone, PartialEq)]
pub struct RawOcrFrame {
    pub frame_index: u64,
    /// Presentation time in seconds, when the marker carries one
    pub time_secs: Option<f64>,
    /// Text line followed by continuation lines
    pub lines: Vec<String>,
}

impl RawOcrFrame {
    pub fn has_text(&self) -> bool {
        self.lines.iter().any(|line| !line.trim().is_empty())
    }

    fn timestamp(&self) -> Timestamp {
        match self.time_secs {
            Some(secs) => Timestamp::from_secs_f64(secs),
            None => {
                tracing::warn!("OCR frame {} has no pts_time, using 0", self.frame_index);
                Timestamp::ZERO
            }
        }
    }
}

/// Parse a marker line into (frame index, pts_time)
fn parse_marker(line: &str) -> Option<(u64, Option<f64>)> {
    let frame = regex!(r"^\s*(?:\[[^\]]*\]\s*)?frame:\s*(\d+)\s+pts(?:_time)?:")
        .captures(line)?;
    let frame_index = frame[1].parse().ok()?;
    let time_secs = regex!(r"pts_time:\s*(-?\d+(?:\.\d+)?)")
        .captures(line)
        .and_then(|c| c[1].parse::<f64>().ok());
    Some((frame_index, time_secs))
}

fn is_marker(line: &str) -> bool {
    parse_marker(line).is_some()
}

/// Text after the OCR key, if this is a text line
fn text_payload(line: &str) -> Option<&str> {
    regex!(r"^\s*(?:\[[^\]]*\]\s*)?lavfi\.ocr\.text=(.*)$")
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Reads whole frames (marker, text line, continuations) with one line of
/// lookahead
struct FrameReader<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
}

impl<'a> FrameReader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines().enumerate().peekable(),
        }
    }

    /// Next complete frame. `Ok(None)` at end of input, including a marker
    /// that is the very last line.
    fn next_frame(&mut self) -> Result<Option<RawOcrFrame>> {
        let (frame_index, time_secs) = loop {
            match self.lines.next() {
                None => return Ok(None),
                Some((idx, line)) => match parse_marker(line) {
                    Some(marker) => break marker,
                    None => tracing::trace!("Skipping line {} before first frame", idx + 1),
                },
            }
        };

        let Some((idx, line)) = self.lines.next() else {
            tracing::debug!("Transcript ends after marker of frame {}", frame_index);
            return Ok(None);
        };
        let text = text_payload(line).ok_or_else(|| SelectError::MalformedOcrFrame {
            line: idx + 1,
            reason: format!(
                "expected '{}' line after frame {}, found {:?}",
                OCR_TEXT_PREFIX, frame_index, line
            ),
        })?;

        let mut lines = vec![text.trim_end().to_string()];
        while let Some((_, next)) = self.lines.peek() {
            if is_marker(next) {
                break;
            }
            lines.push(next.trim_end().to_string());
            self.lines.next();
        }

        Ok(Some(RawOcrFrame {
            frame_index,
            time_secs,
            lines,
        }))
    }
}

struct OpenCue {
    start: Timestamp,
    lines: Vec<String>,
}

enum ParserState {
    ExpectFrame,
    HaveOpenCue(OpenCue),
    Done,
}

/// Open a cue for a frame with text; frames without text are dropped
fn open_or_skip(frame: RawOcrFrame) -> ParserState {
    if frame.has_text() {
        ParserState::HaveOpenCue(OpenCue {
            start: frame.timestamp(),
            lines: frame.lines,
        })
    } else {
        ParserState::ExpectFrame
    }
}

/// Parse an OCR transcript into numbered caption cues.
///
/// A malformed frame aborts the whole parse; no partial list is returned.
pub fn parse_ocr_transcript(input: &str) -> Result<Vec<CaptionCue>> {
    let mut reader = FrameReader::new(input);
    let mut cues: Vec<CaptionCue> = Vec::new();
    let mut state = ParserState::ExpectFrame;

    loop {
        state = match state {
            ParserState::ExpectFrame => match reader.next_frame()? {
                Some(frame) => open_or_skip(frame),
                None => ParserState::Done,
            },
            ParserState::HaveOpenCue(open) => match reader.next_frame()? {
                Some(frame) => {
                    cues.push(CaptionCue {
                        sequence: cues.len() + 1,
                        start: open.start,
                        end: frame.timestamp(),
                        lines: open.lines,
                    });
                    open_or_skip(frame)
                }
                None => {
                    tracing::debug!("Dropping trailing cue starting at {}", open.start);
                    ParserState::Done
                }
            },
            ParserState::Done => break,
        };
    }

    tracing::debug!("Parsed {} cue(s) from OCR transcript", cues.len());
    Ok(cues)
}
