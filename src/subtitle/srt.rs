//! SubRip rendering and cue counting

use super::cue::{CaptionCue, Timestamp};

/// Render cues as SubRip text.
///
/// Each cue is its sequence number, a `start --> end` line, its text lines
/// and one blank separator line. Blank text lines are left out since a blank
/// line ends an SRT cue.
pub fn format_srt(cues: &[CaptionCue]) -> String {
    let mut output = String::new();

    for cue in cues {
        output.push_str(&format!("{}\n", cue.sequence));
        output.push_str(&format!("{} --> {}\n", cue.start, cue.end));
        for line in cue.lines.iter().filter(|l| !l.trim().is_empty()) {
            output.push_str(line);
            output.push('\n');
        }
        output.push('\n');
    }

    output
}

/// Count cue headers: a line holding only an integer, directly followed by a
/// `HH:MM:SS,mmm --> HH:MM:SS,mmm` line
pub fn count_srt_cues(text: &str) -> usize {
    regex!(r"(?m)^\d+\r?\n\d{2}:\d{2}:\d{2},\d{3} --> \d{2}:\d{2}:\d{2},\d{3}")
        .find_iter(text)
        .count()
}

/// Timing lines of a rendered SRT document, in order
pub fn parse_srt_timings(text: &str) -> Vec<(Timestamp, Timestamp)> {
    text.lines()
        .filter_map(|line| {
            let (start, end) = line.split_once(" --> ")?;
            Some((Timestamp::parse_srt(start)?, Timestamp::parse_srt(end)?))
        })
        .collect()
}
