//! End-to-end integration tests
//!
//! Runs the whole pipeline against `ScriptedTools` and the canned movie
//! probe report from `fixtures`.

use crate::config::{EncoderConfig, OutputConfig, PipelineConfig};
use crate::config_file::ConfigFile;
use crate::encode::build_encode_args;
use crate::error::SelectError;
use crate::ingest::Pipeline;
use crate::integration::fixtures::{
    malformed_ocr, ocr_with_cues, srt_with_cues, trailing_only_ocr, ScriptedTools,
    NO_STREAMS_PROBE_JSON,
};
use crate::select::{RuleSet, SelectionRule};
use crate::subtitle::count_srt_cues;
use crate::tools::MediaTools;
use crate::types::{IngestContext, StreamKind};

/// Full subtitle track on 5, sparse track on 6, full bitmap track on 7
fn movie_tools() -> ScriptedTools {
    ScriptedTools::new()
        .with_transcript(5, srt_with_cues(600))
        .with_transcript(6, srt_with_cues(40))
        .with_ocr_transcript(7, ocr_with_cues(300))
}

fn config_with_captions(dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        caption_dir: Some(dir.to_path_buf()),
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn test_full_ingestion() {
    let captions = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(config_with_captions(captions.path()), movie_tools());
    let ctx = IngestContext::new("/watch/movie.mkv");

    let selection = pipeline.run(&ctx).await.unwrap();

    assert_eq!(selection.indices(StreamKind::Video), vec![0]);
    assert_eq!(selection.indices(StreamKind::Audio), vec![2, 4]);
    // Foreign set first, then the default set from what is left
    assert_eq!(selection.indices(StreamKind::Subtitle), vec![6, 5, 7]);

    let caption = captions.path().join("movie.7.srt");
    assert_eq!(selection.subtitle[2].caption_file.as_deref(), Some(caption.as_path()));
    assert!(selection.subtitle[0].caption_file.is_none());

    let srt = std::fs::read_to_string(&caption).unwrap();
    assert_eq!(count_srt_cues(&srt), 300);
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,500\nCaption 1\n\n"));

    // Once for the density count, once for the caption file
    assert_eq!(pipeline.tools().ocr_calls(), 2);
    assert_eq!(pipeline.tools().extract_calls(), 2);
}

#[tokio::test]
async fn test_malformed_ocr_drops_candidate() {
    let captions = tempfile::tempdir().unwrap();
    let tools = ScriptedTools::new()
        .with_transcript(5, srt_with_cues(600))
        .with_transcript(6, srt_with_cues(40))
        .with_ocr_transcript(7, malformed_ocr());
    let pipeline = Pipeline::new(config_with_captions(captions.path()), tools);
    let ctx = IngestContext::new("/watch/movie.mkv");

    let selection = pipeline.run(&ctx).await.unwrap();

    assert_eq!(selection.indices(StreamKind::Subtitle), vec![6, 5]);
    assert!(!captions.path().join("movie.7.srt").exists());
}

#[tokio::test]
async fn test_failed_foreign_search_keeps_later_rule_sets() {
    let captions = tempfile::tempdir().unwrap();
    let tools = ScriptedTools::new()
        .with_failing_transcript(5)
        .with_failing_transcript(6);
    let pipeline = Pipeline::new(config_with_captions(captions.path()), tools);
    let ctx = IngestContext::new("/watch/movie.mkv");

    // Foreign set picks nothing; default set picks 5, 6, 7; OCR of 7 fails
    let selection = pipeline.run(&ctx).await.unwrap();
    assert_eq!(selection.indices(StreamKind::Subtitle), vec![5, 6]);
}

#[tokio::test]
async fn test_failures_emptying_subtitles_fail_ingestion() {
    let captions = tempfile::tempdir().unwrap();
    let mut config = config_with_captions(captions.path());
    config.selection.subtitle = vec![RuleSet::new(
        "bitmap",
        vec![SelectionRule::Codec(vec!["hdmv_pgs_subtitle".to_string()])],
    )];
    let pipeline = Pipeline::new(config, ScriptedTools::new());
    let ctx = IngestContext::new("/watch/movie.mkv");

    let err = pipeline.run(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        SelectError::ExtractionFailure { stream_index: 7, .. }
    ));
}

#[tokio::test]
async fn test_empty_subtitle_selection_without_failures_is_ok() {
    let mut config = PipelineConfig::default();
    config.selection.subtitle = vec![RuleSet::new(
        "japanese",
        vec![SelectionRule::Language(vec!["jpn".to_string()])],
    )];
    let pipeline = Pipeline::new(config, ScriptedTools::new());
    let ctx = IngestContext::new("/watch/movie.mkv");

    let selection = pipeline.run(&ctx).await.unwrap();
    assert!(selection.subtitle.is_empty());
}

#[tokio::test]
async fn test_ocr_without_cues_writes_no_caption_file() {
    let captions = tempfile::tempdir().unwrap();
    let tools = ScriptedTools::new()
        .with_transcript(5, srt_with_cues(600))
        .with_transcript(6, srt_with_cues(40))
        .with_ocr_transcript(7, trailing_only_ocr());
    let pipeline = Pipeline::new(config_with_captions(captions.path()), tools);
    let ctx = IngestContext::new("/watch/movie.mkv");

    let selection = pipeline.run(&ctx).await.unwrap();

    assert_eq!(selection.indices(StreamKind::Subtitle), vec![6, 5]);
    assert!(selection.caption_files().is_empty());
    assert!(!captions.path().join("movie.7.srt").exists());
}

#[tokio::test]
async fn test_missing_stream_list_fails_ingestion() {
    let tools = ScriptedTools::new().with_probe_json(NO_STREAMS_PROBE_JSON);
    let pipeline = Pipeline::new(PipelineConfig::default(), tools);
    let ctx = IngestContext::new("/watch/broken.mkv");

    let err = pipeline.run(&ctx).await.unwrap_err();
    assert!(matches!(err, SelectError::MalformedProbeData(_)));
}

#[tokio::test]
async fn test_config_file_drives_selection() {
    let toml = r#"
[selection]
[[selection.video]]
resolution = "min"

[[selection.audio]]
language = ["fre"]

[[selection.subtitle]]
name = "spanish"
rules = [{ language = ["spa"] }]
"#;
    let config = ConfigFile::from_toml(toml)
        .unwrap()
        .into_pipeline_config()
        .unwrap();
    let pipeline = Pipeline::new(config, ScriptedTools::new());
    let ctx = IngestContext::new("/watch/movie.mkv");

    let selection = pipeline.run(&ctx).await.unwrap();
    assert_eq!(selection.indices(StreamKind::Video), vec![1]);
    assert_eq!(selection.indices(StreamKind::Audio), vec![3]);
    assert_eq!(selection.indices(StreamKind::Subtitle), vec![8]);
    assert_eq!(pipeline.tools().extract_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_runs_are_admitted_one_at_a_time() {
    let captions = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(config_with_captions(captions.path()), movie_tools());
    let first = IngestContext::new("/watch/movie.mkv");
    let second = IngestContext::new("/watch/movie.mkv");

    let (a, b) = tokio::join!(pipeline.run(&first), pipeline.run(&second));
    assert_eq!(a.unwrap(), b.unwrap());

    // Each run counts streams 5 and 6 together; runs never overlap
    assert_eq!(pipeline.tools().extract_calls(), 4);
    assert_eq!(pipeline.tools().max_in_flight(), 2);
}

#[tokio::test]
async fn test_selection_feeds_encoder() {
    let captions = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(config_with_captions(captions.path()), movie_tools());
    let ctx = IngestContext::new("/watch/movie.mkv");
    let output = OutputConfig {
        path: "/media/out".into(),
        global_options: vec!["-y".to_string()],
        video: EncoderConfig::copy(),
        audio: EncoderConfig::copy(),
        subtitle: EncoderConfig::copy(),
    };

    let selection = pipeline.run(&ctx).await.unwrap();
    let args = build_encode_args(&ctx, &selection, &output);
    pipeline.tools().encode(&ctx, &args).await.unwrap();

    let encodes = pipeline.tools().encodes();
    assert_eq!(encodes.len(), 1);
    let maps: Vec<&str> = encodes[0]
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == "-map")
        .map(|(i, _)| encodes[0][i + 1].as_str())
        .collect();
    assert_eq!(maps, vec!["0:0", "0:2", "0:4", "0:6", "0:5", "1:0"]);
    assert_eq!(
        encodes[0].last().map(String::as_str),
        Some("/media/out/movie.mkv")
    );
}

#[tokio::test]
async fn test_selection_report_json() {
    let captions = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(config_with_captions(captions.path()), movie_tools());
    let ctx = IngestContext::new("/watch/movie.mkv");

    let selection = pipeline.run(&ctx).await.unwrap();
    let report = serde_json::to_value(&selection).unwrap();

    assert_eq!(report["video"][0]["index"], 0);
    assert_eq!(report["video"][0]["width"], 1920);
    assert_eq!(report["audio"][1]["codec_name"], "aac");
    assert_eq!(report["subtitle"][0]["kind"], "subtitle");
    assert!(report["subtitle"][0].get("caption_file").is_none());
    assert!(report["subtitle"][2]["caption_file"].is_string());
}
