//! Semantic chunking
//!
//! Text is split into sentences, each sentence is embedded together with its
//! neighbours, and a chunk boundary is placed wherever the cosine distance
//! between consecutive windows rises above a threshold derived from the
//! document's own distance distribution.

use futures::stream::{self, StreamExt, TryStreamExt};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::{BreakpointThreshold, ChunkingConfig};
use crate::error::{Error, Result};
use crate::providers::{cosine_distance, EmbeddingProvider};
use crate::types::Chunk;

/// Splits document text into semantically coherent chunks
pub struct SemanticChunker {
    config: ChunkingConfig,
}

impl SemanticChunker {
    /// Create a chunker with the given settings
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Chunking settings in use
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into chunks whose concatenation is exactly `text`.
    ///
    /// Empty or whitespace-only text yields no chunks. Embedding failures are
    /// returned unchanged.
    pub async fn split(&self, text: &str, embedder: &dyn EmbeddingProvider) -> Result<Vec<Chunk>> {
        let units = sentence_spans(text);
        if units.is_empty() {
            return Ok(Vec::new());
        }
        if units.len() == 1 {
            return Ok(build_chunks(text, &[(0, text.len())]));
        }

        let windows = self.windows(text, &units);
        let vectors = embed_batched(
            &windows,
            embedder,
            self.config.batch_size,
            self.config.max_concurrency,
        )
        .await?;

        let distances: Vec<f64> = vectors
            .windows(2)
            .map(|pair| cosine_distance(&pair[0], &pair[1]) as f64)
            .collect();
        let threshold = breakpoint_threshold(&distances, self.config.threshold);

        let mut ranges = Vec::new();
        let mut start_unit = 0;
        for (i, distance) in distances.iter().enumerate() {
            if *distance > threshold {
                ranges.push((units[start_unit].0, units[i].1));
                start_unit = i + 1;
            }
        }
        ranges.push((units[start_unit].0, units[units.len() - 1].1));

        if self.config.min_chunk_chars > 0 {
            merge_short(text, &mut ranges, self.config.min_chunk_chars);
        }

        tracing::debug!(
            "Chunked {} sentences into {} chunks (threshold {:.4})",
            units.len(),
            ranges.len(),
            threshold
        );

        Ok(build_chunks(text, &ranges))
    }

    /// Each sentence with `buffer_size` neighbours on both sides
    fn windows(&self, text: &str, units: &[(usize, usize)]) -> Vec<String> {
        let last = units.len() - 1;
        (0..units.len())
            .map(|i| {
                let lo = i.saturating_sub(self.config.buffer_size);
                let hi = (i + self.config.buffer_size).min(last);
                text[units[lo].0..units[hi].1].to_string()
            })
            .collect()
    }
}

/// Embed `texts` in slices of `batch_size`, keeping at most `concurrency`
/// calls in flight. Output is aligned with the input.
pub(crate) async fn embed_batched(
    texts: &[String],
    embedder: &dyn EmbeddingProvider,
    batch_size: usize,
    concurrency: usize,
) -> Result<Vec<Vec<f32>>> {
    let inputs: Vec<&[String]> = texts.chunks(batch_size.max(1)).collect();
    let calls: Vec<_> = inputs.iter().map(|batch| embedder.embed_batch(batch)).collect();

    let batches: Vec<Vec<Vec<f32>>> = stream::iter(calls)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut vectors = Vec::with_capacity(texts.len());
    for (batch, embedded) in inputs.iter().zip(batches) {
        if embedded.len() != batch.len() {
            return Err(Error::embedding(format!(
                "{} returned {} vectors for {} inputs",
                embedder.name(),
                embedded.len(),
                batch.len()
            )));
        }
        vectors.extend(embedded);
    }
    Ok(vectors)
}

/// Sentence byte ranges covering `text` end to end.
///
/// Whitespace-only pieces are folded into a neighbour so that every unit
/// carries visible content.
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut pending_start = None;

    for (start, piece) in text.split_sentence_bound_indices() {
        let end = start + piece.len();
        if piece.trim().is_empty() {
            match spans.last_mut() {
                Some(last) => last.1 = end,
                None => {
                    pending_start.get_or_insert(start);
                }
            }
            continue;
        }
        spans.push((pending_start.take().unwrap_or(start), end));
    }

    spans
}

/// Threshold above which a distance marks a boundary
fn breakpoint_threshold(distances: &[f64], policy: BreakpointThreshold) -> f64 {
    match policy {
        BreakpointThreshold::Percentile(p) => percentile(distances, p),
        BreakpointThreshold::StandardDeviation(k) => {
            let mean = mean(distances);
            let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>()
                / distances.len().max(1) as f64;
            mean + k * variance.sqrt()
        }
        BreakpointThreshold::Interquartile(k) => {
            let iqr = percentile(distances, 75.0) - percentile(distances, 25.0);
            mean(distances) + k * iqr
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear-interpolated percentile, `p` in 0..=100
fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Fold chunks shorter than `min_chars` into the next chunk (the last one
/// folds backwards)
fn merge_short(text: &str, ranges: &mut Vec<(usize, usize)>, min_chars: usize) {
    let mut i = 0;
    while ranges.len() > 1 && i < ranges.len() {
        let (start, end) = ranges[i];
        if text[start..end].chars().count() >= min_chars {
            i += 1;
            continue;
        }
        if i + 1 < ranges.len() {
            ranges[i + 1].0 = start;
        } else {
            ranges[i - 1].1 = end;
        }
        ranges.remove(i);
    }
}

fn build_chunks(text: &str, ranges: &[(usize, usize)]) -> Vec<Chunk> {
    ranges
        .iter()
        .enumerate()
        .map(|(index, &(start, end))| Chunk {
            index: index as u32,
            content: text[start..end].to_string(),
            byte_start: start,
            byte_end: end,
        })
        .collect()
}
