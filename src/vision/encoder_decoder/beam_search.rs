// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Beam search decoding
//!
//! Scores are summed log-probabilities. Finished hypotheses are ranked by
//! `score / len^length_penalty`. Ties are broken by beam index, then token
//! id, so the search is deterministic for a fixed scorer and config.

use anyhow::{ensure, Result};
use tracing::debug;

use crate::config::GenerationConfig;

/// Produces next-token logits for a batch of equal-length token sequences
pub trait TokenScorer {
    /// One row of logits (vocabulary-sized) per input sequence
    fn next_token_logits(&self, sequences: &[Vec<u32>]) -> Result<Vec<Vec<f32>>>;
}

/// Token ids that delimit a generated sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
}

/// A finished (or force-finished) sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    /// Token ids, starting with the decoder start token, without EOS
    pub tokens: Vec<u32>,
    /// Length-normalized score
    pub score: f32,
}

/// Bounded pool of the best finished hypotheses
struct FinishedHypotheses {
    capacity: usize,
    length_penalty: f32,
    early_stopping: bool,
    hyps: Vec<Hypothesis>,
    worst_score: f32,
}

impl FinishedHypotheses {
    fn new(capacity: usize, length_penalty: f32, early_stopping: bool) -> Self {
        Self {
            capacity,
            length_penalty,
            early_stopping,
            hyps: Vec::with_capacity(capacity + 1),
            worst_score: f32::INFINITY,
        }
    }

    fn normalize(&self, sum_logprobs: f32, len: usize) -> f32 {
        sum_logprobs / (len.max(1) as f32).powf(self.length_penalty)
    }

    fn add(&mut self, tokens: Vec<u32>, sum_logprobs: f32) {
        let score = self.normalize(sum_logprobs, tokens.len());
        if self.hyps.len() < self.capacity || score > self.worst_score {
            self.hyps.push(Hypothesis { tokens, score });
            if self.hyps.len() > self.capacity {
                if let Some(worst) = self
                    .hyps
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| a.score.total_cmp(&b.score))
                    .map(|(i, _)| i)
                {
                    self.hyps.remove(worst);
                }
                self.worst_score = self
                    .hyps
                    .iter()
                    .map(|h| h.score)
                    .fold(f32::INFINITY, f32::min);
            } else {
                self.worst_score = self.worst_score.min(score);
            }
        }
    }

    /// No running beam can still beat the finished pool
    fn is_done(&self, best_running_sum: f32, cur_len: usize) -> bool {
        if self.hyps.len() < self.capacity {
            return false;
        }
        if self.early_stopping {
            return true;
        }
        self.worst_score >= self.normalize(best_running_sum, cur_len)
    }

    fn into_sorted(mut self) -> Vec<Hypothesis> {
        self.hyps.sort_by(|a, b| b.score.total_cmp(&a.score));
        self.hyps
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    beam: usize,
    token: u32,
}

/// Numerically stable log-softmax; NaN logits are treated as impossible
pub fn log_softmax(logits: &[f32]) -> Result<Vec<f32>> {
    let max = logits
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    ensure!(max.is_finite(), "decoder produced no finite logits");

    let sum: f32 = logits
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| (v - max).exp())
        .sum();
    let log_sum = sum.ln();

    Ok(logits
        .iter()
        .map(|v| {
            if v.is_nan() {
                f32::NEG_INFINITY
            } else {
                v - max - log_sum
            }
        })
        .collect())
}

/// Indices of the `k` largest values, best first, lower index on ties
fn top_k(values: &[f32], k: usize) -> Vec<usize> {
    let k = k.min(values.len());
    if k == 0 {
        return Vec::new();
    }
    let cmp = |a: &usize, b: &usize| values[*b].total_cmp(&values[*a]).then(a.cmp(b));
    let mut indices: Vec<usize> = (0..values.len()).collect();
    if k < indices.len() {
        indices.select_nth_unstable_by(k - 1, cmp);
        indices.truncate(k);
    }
    indices.sort_by(cmp);
    indices
}

/// Run beam search and return the best hypotheses, best first
///
/// At most `config.num_return_sequences` hypotheses are returned.
pub fn beam_search<S: TokenScorer + ?Sized>(
    scorer: &S,
    config: &GenerationConfig,
    special: SpecialTokens,
) -> Result<Vec<Hypothesis>> {
    config.validate()?;

    let num_beams = config.num_beams;
    let mut finished =
        FinishedHypotheses::new(num_beams, config.length_penalty, config.early_stopping);

    // Only one live beam at the first step so the start token is not expanded num_beams times
    let mut beams: Vec<(Vec<u32>, f32)> = vec![(vec![special.decoder_start_token_id], 0.0)];
    let mut done = false;

    while beams[0].0.len() < config.max_length {
        let sequences: Vec<Vec<u32>> = beams.iter().map(|(tokens, _)| tokens.clone()).collect();
        let logits = scorer.next_token_logits(&sequences)?;
        ensure!(
            logits.len() == beams.len(),
            "scorer returned {} rows for {} sequences",
            logits.len(),
            beams.len()
        );

        let mut candidates = Vec::with_capacity(beams.len() * 2 * num_beams);
        for (beam, row) in logits.iter().enumerate() {
            let logprobs = log_softmax(row)?;
            for token in top_k(&logprobs, 2 * num_beams) {
                candidates.push(Candidate {
                    score: beams[beam].1 + logprobs[token],
                    beam,
                    token: token as u32,
                });
            }
        }
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.beam.cmp(&b.beam))
                .then(a.token.cmp(&b.token))
        });
        candidates.truncate(2 * num_beams);

        let mut next_beams: Vec<(Vec<u32>, f32)> = Vec::with_capacity(num_beams);
        for (rank, candidate) in candidates.iter().enumerate() {
            if candidate.score == f32::NEG_INFINITY {
                break;
            }
            if candidate.token == special.eos_token_id {
                // An EOS outside the top num_beams would not have survived as a beam
                if rank >= num_beams {
                    continue;
                }
                finished.add(beams[candidate.beam].0.clone(), candidate.score);
            } else {
                let mut tokens = beams[candidate.beam].0.clone();
                tokens.push(candidate.token);
                next_beams.push((tokens, candidate.score));
            }
            if next_beams.len() == num_beams {
                break;
            }
        }

        if next_beams.is_empty() {
            done = true;
            break;
        }

        let cur_len = next_beams[0].0.len();
        let best_running = next_beams
            .iter()
            .map(|(_, score)| *score)
            .fold(f32::NEG_INFINITY, f32::max);
        beams = next_beams;

        if finished.is_done(best_running, cur_len) {
            debug!("Beam search finished early at length {}", cur_len);
            done = true;
            break;
        }
    }

    if !done {
        for (tokens, score) in beams {
            finished.add(tokens, score);
        }
    }

    let mut hyps = finished.into_sorted();
    hyps.truncate(config.num_return_sequences);
    Ok(hyps)
}
