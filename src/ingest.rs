//! Ingestion pipeline
//!
//! One ingestion runs every stage in order for a single media file:
//! - probe the container and build the catalog
//! - narrow video and audio through their rule chains
//! - evaluate the subtitle rule-sets, including the foreign-audio heuristic
//! - synthesise SubRip captions for selected image-based subtitles
//!
//! Only one ingestion runs at a time per `Pipeline`.
//!
//! Transcript extraction and caption synthesis failures only exclude the
//! candidate involved. The ingestion fails with `ExtractionFailure` when
//! such failures leave no subtitle selected although the source had
//! subtitle streams.

use std::path::PathBuf;

use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::config::PipelineConfig;
use crate::error::{Result, SelectError};
use crate::probe::build_catalog;
use crate::select::{select, select_subtitles, ForeignAudioHeuristic};
use crate::subtitle::{format_srt, parse_ocr_transcript};
use crate::tools::MediaTools;
use crate::types::{CandidateSet, IngestContext, Selection, StreamDescriptor, StreamKind};

/// Runs ingestions against one set of tools and one configuration
pub struct Pipeline<T: MediaTools> {
    config: PipelineConfig,
    tools: T,
    admission: Semaphore,
}

impl<T: MediaTools> Pipeline<T> {
    pub fn new(config: PipelineConfig, tools: T) -> Self {
        Self {
            config,
            tools,
            admission: Semaphore::new(1),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Run one ingestion. Concurrent callers wait for the running one.
    pub async fn run(&self, ctx: &IngestContext) -> Result<Selection> {
        let span = tracing::info_span!(
            "ingest",
            id = %ctx.id,
            path = %ctx.media_path.display()
        );
        async {
            let _permit = self.admission.acquire().await.map_err(std::io::Error::other)?;
            self.run_stages(ctx).await
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, ctx: &IngestContext) -> Result<Selection> {
        let selection_config = &self.config.selection;

        let probe = self.tools.probe(ctx).await?;
        let catalog = build_catalog(&probe)?;
        tracing::debug!(
            "Catalog: {} video, {} audio, {} subtitle stream(s)",
            catalog.video.len(),
            catalog.audio.len(),
            catalog.subtitle.len()
        );

        let video = select(catalog.video, &selection_config.video)?;
        let audio = select(catalog.audio, &selection_config.audio)?;

        let heuristic = ForeignAudioHeuristic::new(
            &self.tools,
            ctx,
            &selection_config.image_codecs,
            selection_config.foreign_batch_size,
        );
        let had_subtitles = !catalog.subtitle.is_empty();
        let picked =
            select_subtitles(catalog.subtitle, &selection_config.subtitle, &heuristic).await?;
        let mut last_failure = picked.last_failure;
        let subtitle = self
            .synthesize_captions(ctx, picked.selected, &mut last_failure)
            .await?;

        if had_subtitles && subtitle.is_empty() {
            if let Some(e) = last_failure {
                tracing::error!("No subtitle stream left after extraction failures");
                return Err(e);
            }
        }

        let selection = Selection {
            video,
            audio,
            subtitle,
        };
        for kind in [StreamKind::Video, StreamKind::Audio, StreamKind::Subtitle] {
            tracing::info!("Selected {} streams: {:?}", kind, selection.indices(kind));
        }
        Ok(selection)
    }

    /// Attach a caption file to every image-based subtitle. Candidates whose
    /// OCR transcript cannot be turned into captions are dropped and the
    /// failure recorded in `last_failure`.
    async fn synthesize_captions(
        &self,
        ctx: &IngestContext,
        subtitles: CandidateSet,
        last_failure: &mut Option<SelectError>,
    ) -> Result<CandidateSet> {
        let image_codecs = &self.config.selection.image_codecs;
        let mut kept = CandidateSet::with_capacity(subtitles.len());

        for stream in subtitles {
            if !stream.is_image_based(image_codecs) {
                kept.push(stream);
                continue;
            }
            match self.write_captions(ctx, &stream).await {
                Ok(path) => {
                    tracing::info!(
                        "Captions for subtitle stream {} written to {}",
                        stream.index,
                        path.display()
                    );
                    kept.push(stream.with_caption_file(path));
                }
                Err(SelectError::MalformedOcrFrame { line, reason }) => {
                    tracing::warn!(
                        "Dropping subtitle stream {}: malformed OCR frame at line {}: {}",
                        stream.index,
                        line,
                        reason
                    );
                    *last_failure = Some(SelectError::ExtractionFailure {
                        stream_index: stream.index,
                        reason: format!("malformed OCR frame at line {}: {}", line, reason),
                    });
                }
                Err(e @ SelectError::ExtractionFailure { .. }) => {
                    tracing::warn!("Dropping subtitle stream {}: {}", stream.index, e);
                    *last_failure = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(kept)
    }

    /// OCR one stream and write its captions. A transcript without any
    /// complete cue is an `ExtractionFailure` and no file is written.
    async fn write_captions(
        &self,
        ctx: &IngestContext,
        stream: &StreamDescriptor,
    ) -> Result<PathBuf> {
        let dump = self.tools.extract_ocr_transcript(ctx, stream.index).await?;
        let cues = parse_ocr_transcript(&dump)?;
        if cues.is_empty() {
            return Err(SelectError::ExtractionFailure {
                stream_index: stream.index,
                reason: "OCR produced no captions".to_string(),
            });
        }

        let dir = self.caption_dir(ctx);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.{}.srt", ctx.stem(), stream.index));
        tokio::fs::write(&path, format_srt(&cues)).await?;
        Ok(path)
    }

    fn caption_dir(&self, ctx: &IngestContext) -> PathBuf {
        match &self.config.caption_dir {
            Some(dir) => dir.clone(),
            None => ctx
                .media_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}
