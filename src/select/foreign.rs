//! Foreign-audio heuristic
//!
//! A subtitle track that only captions non-native dialogue has far fewer
//! cues than a full track. Tracks are kept when their cue count is non-zero
//! and below a quarter of the densest track's count.

use futures::future::join_all;

use crate::error::{Result, SelectError};
use crate::subtitle::{count_srt_cues, format_srt, parse_ocr_transcript};
use crate::tools::MediaTools;
use crate::types::{CandidateSet, IngestContext, StreamDescriptor};

/// Fraction of the densest track a sparse track must stay under
const SPARSE_RATIO: f64 = 0.25;

/// Transcript format requested from the extractor for text subtitles
const TRANSCRIPT_FORMAT: &str = "srt";

/// Outcome of one heuristic pass
#[derive(Debug, Default)]
pub struct SparsePick {
    /// Sparse tracks, ascending by index
    pub selected: CandidateSet,
    /// Last extraction failure among the excluded candidates
    pub last_failure: Option<SelectError>,
}

/// Density-based sub-selector over a subtitle pool
pub struct ForeignAudioHeuristic<'a, T: MediaTools> {
    tools: &'a T,
    ctx: &'a IngestContext,
    image_codecs: &'a [String],
    batch_size: usize,
}

impl<'a, T: MediaTools> ForeignAudioHeuristic<'a, T> {
    pub fn new(
        tools: &'a T,
        ctx: &'a IngestContext,
        image_codecs: &'a [String],
        batch_size: usize,
    ) -> Self {
        Self {
            tools,
            ctx,
            image_codecs,
            batch_size: batch_size.max(1),
        }
    }

    /// Keep the sparse tracks of `pool`.
    ///
    /// Candidates whose transcript cannot be extracted are logged and left
    /// out. The last such failure is kept with the pick so the caller can
    /// decide whether it matters.
    pub async fn select(&self, pool: CandidateSet) -> SparsePick {
        let mut counts = Vec::with_capacity(pool.len());
        let mut last_failure = None;

        for (batch_no, batch) in pool.chunks(self.batch_size).enumerate() {
            tracing::debug!(
                "Counting subtitle cues, batch {} ({} stream(s))",
                batch_no + 1,
                batch.len()
            );
            let results = join_all(batch.iter().map(|stream| self.count_cues(stream))).await;
            for (stream, result) in batch.iter().zip(results) {
                match result {
                    Ok(count) => {
                        tracing::debug!("Subtitle stream {}: {} cue(s)", stream.index, count);
                        counts.push((count, stream.clone()));
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Excluding subtitle stream {} from foreign audio search: {}",
                            stream.index,
                            e
                        );
                        last_failure = Some(e);
                    }
                }
            }
        }

        SparsePick {
            selected: pick_sparse(counts),
            last_failure,
        }
    }

    async fn count_cues(&self, stream: &StreamDescriptor) -> Result<usize> {
        let transcript = if stream.is_image_based(self.image_codecs) {
            let dump = self
                .tools
                .extract_ocr_transcript(self.ctx, stream.index)
                .await?;
            let cues = parse_ocr_transcript(&dump).map_err(|e| SelectError::ExtractionFailure {
                stream_index: stream.index,
                reason: e.to_string(),
            })?;
            format_srt(&cues)
        } else {
            self.tools
                .extract_transcript(self.ctx, stream.index, TRANSCRIPT_FORMAT)
                .await?
        };
        Ok(count_srt_cues(&transcript))
    }
}

/// Apply the density threshold to (count, stream) pairs.
///
/// Result keeps ascending stream index order.
pub fn pick_sparse(mut counts: Vec<(usize, StreamDescriptor)>) -> CandidateSet {
    counts.sort_by(|a, b| b.0.cmp(&a.0));
    let max_count = counts.first().map(|(count, _)| *count).unwrap_or(0);
    let threshold = max_count as f64 * SPARSE_RATIO;

    let mut selected: CandidateSet = counts
        .into_iter()
        .filter(|(count, _)| *count > 0 && (*count as f64) < threshold)
        .map(|(_, stream)| stream)
        .collect();
    selected.sort_by_key(|s| s.index);

    tracing::info!(
        "Foreign audio search: max {} cue(s), threshold {:.1}, selected {:?}",
        max_count,
        threshold,
        selected.iter().map(|s| s.index).collect::<Vec<_>>()
    );
    selected
}
