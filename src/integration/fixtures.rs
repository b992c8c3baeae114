//! Test fixtures for integration tests
//!
//! Provides canned probe reports, transcripts and a scripted `MediaTools`
//! so the pipeline runs without ffmpeg or real media files.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{Result, SelectError};
use crate::probe::ProbeResult;
use crate::tools::MediaTools;
use crate::types::IngestContext;

/// SubRip text with `n` cues
pub fn srt_with_cues(n: usize) -> String {
    let mut out = String::new();
    for i in 0..n {
        let start = i * 3;
        out.push_str(&format!(
            "{}\n00:{:02}:{:02},000 --> 00:{:02}:{:02},500\nLine {}\n\n",
            i + 1,
            (start / 60) % 60,
            start % 60,
            ((start + 2) / 60) % 60,
            (start + 2) % 60,
            i + 1
        ));
    }
    out
}

/// OCR dump that parses into `n` closed cues
pub fn ocr_with_cues(n: usize) -> String {
    let mut out = String::from("ffmpeg version n6.1 Copyright (c) 2000-2023 the FFmpeg developers\n");
    let mut frame = 0;
    for i in 0..n {
        let start = i as f64 * 4.0;
        out.push_str(&format!("frame:{}    pts:{}    pts_time:{}\n", frame, start * 1000.0, start));
        out.push_str(&format!("lavfi.ocr.text=Caption {}\n", i + 1));
        frame += 1;
        let end = start + 2.5;
        out.push_str(&format!("frame:{}    pts:{}    pts_time:{}\n", frame, end * 1000.0, end));
        out.push_str("lavfi.ocr.text=\n");
        frame += 1;
    }
    out
}

/// OCR dump whose second frame is missing its text line
pub fn malformed_ocr() -> String {
    "frame:0    pts:1000    pts_time:1.0\n\
     lavfi.ocr.text=Hello\n\
     frame:1    pts:2000    pts_time:2.0\n\
     frame:2    pts:3000    pts_time:3.0\n\
     lavfi.ocr.text=\n"
        .to_string()
}

/// OCR dump whose only text frame is never closed
pub fn trailing_only_ocr() -> String {
    "frame:0    pts:1000    pts_time:1\n\
     lavfi.ocr.text=Hi\n"
        .to_string()
}

/// Probe report of a typical remux source:
/// - 0: 1920 wide h264, 1: 1280 wide h264
/// - 2: eng ac3, 3: fre ac3, 4: eng aac
/// - 5, 6: eng subrip, 7: eng hdmv_pgs_subtitle, 8: spa subrip
/// - 9: attachment
pub const MOVIE_PROBE_JSON: &str = r#"{
  "streams": [
    { "index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920,
      "duration": "5400.5", "tags": { "language": "und" } },
    { "index": 1, "codec_type": "video", "codec_name": "h264", "width": 1280,
      "duration": "5400.5" },
    { "index": 2, "codec_type": "audio", "codec_name": "ac3", "tags": { "language": "eng" } },
    { "index": 3, "codec_type": "audio", "codec_name": "ac3", "tags": { "language": "fre" } },
    { "index": 4, "codec_type": "audio", "codec_name": "aac", "tags": { "language": "eng" } },
    { "index": 5, "codec_type": "subtitle", "codec_name": "subrip", "tags": { "language": "eng" } },
    { "index": 6, "codec_type": "subtitle", "codec_name": "subrip", "tags": { "language": "eng" } },
    { "index": 7, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle",
      "tags": { "language": "eng", "NUMBER_OF_FRAMES-eng": "96" } },
    { "index": 8, "codec_type": "subtitle", "codec_name": "subrip", "tags": { "language": "spa" } },
    { "index": 9, "codec_type": "attachment", "codec_name": "ttf" }
  ],
  "format": { "filename": "movie.mkv", "format_name": "matroska,webm" }
}"#;

/// A probe report with no stream list
pub const NO_STREAMS_PROBE_JSON: &str = r#"{ "format": { "filename": "broken.mkv" } }"#;

/// Scripted stand-in for the external tools.
///
/// Unscripted transcript requests return an empty transcript.
pub struct ScriptedTools {
    probe_json: String,
    transcripts: HashMap<usize, std::result::Result<String, String>>,
    ocr: HashMap<usize, String>,
    encodes: Mutex<Vec<Vec<String>>>,
    extract_calls: AtomicUsize,
    ocr_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTools {
    pub fn new() -> Self {
        Self {
            probe_json: MOVIE_PROBE_JSON.to_string(),
            transcripts: HashMap::new(),
            ocr: HashMap::new(),
            encodes: Mutex::new(Vec::new()),
            extract_calls: AtomicUsize::new(0),
            ocr_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_probe_json(mut self, json: &str) -> Self {
        self.probe_json = json.to_string();
        self
    }

    pub fn with_transcript(mut self, stream_index: usize, srt: String) -> Self {
        self.transcripts.insert(stream_index, Ok(srt));
        self
    }

    pub fn with_failing_transcript(mut self, stream_index: usize) -> Self {
        self.transcripts
            .insert(stream_index, Err("exit status: 1".to_string()));
        self
    }

    pub fn with_ocr_transcript(mut self, stream_index: usize, dump: String) -> Self {
        self.ocr.insert(stream_index, dump);
        self
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn ocr_calls(&self) -> usize {
        self.ocr_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn encodes(&self) -> Vec<Vec<String>> {
        self.encodes.lock().unwrap().clone()
    }
}

impl MediaTools for ScriptedTools {
    async fn probe(&self, _ctx: &IngestContext) -> Result<ProbeResult> {
        ProbeResult::from_json(&self.probe_json)
    }

    async fn extract_transcript(
        &self,
        _ctx: &IngestContext,
        stream_index: usize,
        _format_hint: &str,
    ) -> Result<String> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Let the rest of the batch start before finishing
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.transcripts.get(&stream_index) {
            Some(Ok(srt)) => Ok(srt.clone()),
            Some(Err(reason)) => Err(SelectError::ExtractionFailure {
                stream_index,
                reason: reason.clone(),
            }),
            None => Ok(String::new()),
        }
    }

    async fn extract_ocr_transcript(
        &self,
        _ctx: &IngestContext,
        stream_index: usize,
    ) -> Result<String> {
        self.ocr_calls.fetch_add(1, Ordering::SeqCst);
        self.ocr
            .get(&stream_index)
            .cloned()
            .ok_or_else(|| SelectError::ExtractionFailure {
                stream_index,
                reason: "no OCR output".to_string(),
            })
    }

    async fn encode(&self, _ctx: &IngestContext, args: &[String]) -> Result<()> {
        self.encodes.lock().unwrap().push(args.to_vec());
        Ok(())
    }
}

mod tests {
    use super::*;
    use crate::subtitle::{count_srt_cues, parse_ocr_transcript};

    #[test]
    fn test_srt_fixture_counts() {
        assert_eq!(count_srt_cues(&srt_with_cues(0)), 0);
        assert_eq!(count_srt_cues(&srt_with_cues(800)), 800);
    }

    #[test]
    fn test_ocr_fixture_parses() {
        assert_eq!(parse_ocr_transcript(&ocr_with_cues(3)).unwrap().len(), 3);
        assert!(parse_ocr_transcript(&malformed_ocr()).is_err());
        assert!(parse_ocr_transcript(&trailing_only_ocr()).unwrap().is_empty());
    }

    #[test]
    fn test_movie_probe_parses() {
        let probe = ProbeResult::from_json(MOVIE_PROBE_JSON).unwrap();
        assert_eq!(probe.streams.map(|s| s.len()), Some(10));
    }
}
