//! Caption cue types

use std::fmt;

/// Millisecond-resolution caption timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    /// Round seconds to the nearest millisecond. Negative or non-finite
    /// input clamps to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Timestamp::ZERO;
        }
        Timestamp((secs * 1000.0).round() as u64)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Parse `HH:MM:SS,mmm` (a `.` separator is accepted too)
    pub fn parse_srt(ts: &str) -> Option<Self> {
        let (clock, millis) = ts.trim().split_once(|c: char| c == ',' || c == '.')?;
        let mut parts = clock.split(':');
        let hours: u64 = parts.next()?.parse().ok()?;
        let minutes: u64 = parts.next()?.parse().ok()?;
        let seconds: u64 = parts.next()?.parse().ok()?;
        if parts.next().is_some() || minutes >= 60 || seconds >= 60 || millis.len() != 3 {
            return None;
        }
        let millis: u64 = millis.parse().ok()?;
        Some(Timestamp(
            ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
        ))
    }
}

impl fmt::Display for Timestamp {
    /// `HH:MM:SS,mmm`, zero padded
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0 % 1000;
        let total_secs = self.0 / 1000;
        let secs = total_secs % 60;
        let total_mins = total_secs / 60;
        let mins = total_mins % 60;
        let hours = total_mins / 60;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
    }
}

/// One timed caption entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionCue {
    /// 1-based, strictly increasing
    pub sequence: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Text lines in order
    pub lines: Vec<String>,
}

impl CaptionCue {
    pub fn duration_ms(&self) -> u64 {
        self.end.as_millis().saturating_sub(self.start.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(Timestamp::ZERO.to_string(), "00:00:00,000");
        assert_eq!(Timestamp::from_secs_f64(1.5).to_string(), "00:00:01,500");
        assert_eq!(Timestamp::from_secs_f64(90.0).to_string(), "00:01:30,000");
        assert_eq!(
            Timestamp::from_millis(5_400_007).to_string(),
            "01:30:00,007"
        );
    }

    #[test]
    fn test_from_secs_rounds_to_millis() {
        assert_eq!(Timestamp::from_secs_f64(2.0004).as_millis(), 2000);
        assert_eq!(Timestamp::from_secs_f64(2.0006).as_millis(), 2001);
        assert_eq!(Timestamp::from_secs_f64(-1.0), Timestamp::ZERO);
        assert_eq!(Timestamp::from_secs_f64(f64::NAN), Timestamp::ZERO);
    }

    #[test]
    fn test_parse_srt_timestamp() {
        assert_eq!(
            Timestamp::parse_srt("00:00:01,500"),
            Some(Timestamp::from_millis(1500))
        );
        assert_eq!(
            Timestamp::parse_srt("01:30:00.000"),
            Some(Timestamp::from_millis(5_400_000))
        );
        assert_eq!(Timestamp::parse_srt("00:61:00,000"), None);
        assert_eq!(Timestamp::parse_srt("garbage"), None);
    }

    #[test]
    fn test_cue_duration() {
        let cue = CaptionCue {
            sequence: 1,
            start: Timestamp::from_millis(1000),
            end: Timestamp::from_millis(2500),
            lines: vec!["Hello".to_string()],
        };
        assert_eq!(cue.duration_ms(), 1500);
    }
}
