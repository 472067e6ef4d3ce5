//! Error-rate statistics for one SNR point.
//!
//! Accumulates per-frame decoder results into bit and word error rates,
//! the error-weight histogram and the completion-time distribution, with a
//! normal-approximation confidence interval on the BER.
//!
//! ## Example
//!
//! ```rust
//! use tanner_sim::stats::{ErrorStats, FrameRecord, StopCriteria};
//!
//! let mut stats = ErrorStats::new(96, 20);
//! stats.record(&FrameRecord { bit_errors: 0, uncoded_bit_errors: 3, iterations: 4, satisfied: true, anomalies: 0 });
//! stats.record(&FrameRecord { bit_errors: 5, uncoded_bit_errors: 9, iterations: 20, satisfied: false, anomalies: 0 });
//! assert_eq!(stats.word_errors(), 1);
//! assert!((stats.ber() - 5.0 / 192.0).abs() < 1e-12);
//!
//! let stop = StopCriteria { min_bit_errors: 5, min_word_errors: 1, max_frames: 1000 };
//! assert!(stop.is_met(&stats));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// When to stop simulating one SNR point.
///
/// Stops once both error minima are reached, or after `max_frames` frames
/// whatever the error counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopCriteria {
    pub min_bit_errors: u64,
    pub min_word_errors: u64,
    pub max_frames: u64,
}

impl Default for StopCriteria {
    fn default() -> Self {
        Self {
            min_bit_errors: 200,
            min_word_errors: 40,
            max_frames: 10_000_000,
        }
    }
}

impl StopCriteria {
    pub fn is_met(&self, stats: &ErrorStats) -> bool {
        (stats.bit_errors >= self.min_bit_errors && stats.word_errors >= self.min_word_errors)
            || stats.frames >= self.max_frames
    }
}

/// Decoder result of one frame, scored against the transmitted codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    /// Residual bit errors after decoding
    pub bit_errors: usize,
    /// Bit errors of the channel hard decisions
    pub uncoded_bit_errors: usize,
    pub iterations: usize,
    /// Decisions satisfy every check
    pub satisfied: bool,
    pub anomalies: usize,
}

/// Running error statistics.
#[derive(Debug, Clone)]
pub struct ErrorStats {
    code_length: usize,
    frames: u64,
    bit_errors: u64,
    word_errors: u64,
    /// Word errors whose decisions still satisfy every check
    undetected: u64,
    uncoded_bit_errors: u64,
    total_iterations: u64,
    anomalies: u64,
    /// Residual error weight -> frame count
    error_weights: BTreeMap<usize, u64>,
    /// Frames finishing after exactly k iterations, k in 0..=T
    completions: Vec<u64>,
}

impl ErrorStats {
    pub fn new(code_length: usize, max_iterations: usize) -> Self {
        Self {
            code_length,
            frames: 0,
            bit_errors: 0,
            word_errors: 0,
            undetected: 0,
            uncoded_bit_errors: 0,
            total_iterations: 0,
            anomalies: 0,
            error_weights: BTreeMap::new(),
            completions: vec![0; max_iterations + 1],
        }
    }

    pub fn record(&mut self, frame: &FrameRecord) {
        self.frames += 1;
        self.uncoded_bit_errors += frame.uncoded_bit_errors as u64;
        self.total_iterations += frame.iterations as u64;
        self.anomalies += frame.anomalies as u64;

        let slot = frame.iterations.min(self.completions.len() - 1);
        self.completions[slot] += 1;

        if frame.bit_errors > 0 {
            self.bit_errors += frame.bit_errors as u64;
            self.word_errors += 1;
            *self.error_weights.entry(frame.bit_errors).or_insert(0) += 1;
            if frame.satisfied {
                self.undetected += 1;
            }
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn total_bits(&self) -> u64 {
        self.frames * self.code_length as u64
    }

    pub fn bit_errors(&self) -> u64 {
        self.bit_errors
    }

    pub fn word_errors(&self) -> u64 {
        self.word_errors
    }

    pub fn undetected_errors(&self) -> u64 {
        self.undetected
    }

    pub fn uncoded_bit_errors(&self) -> u64 {
        self.uncoded_bit_errors
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    pub fn error_weights(&self) -> &BTreeMap<usize, u64> {
        &self.error_weights
    }

    pub fn ber(&self) -> f64 {
        ratio(self.bit_errors, self.total_bits())
    }

    pub fn wer(&self) -> f64 {
        ratio(self.word_errors, self.frames)
    }

    pub fn uncoded_ber(&self) -> f64 {
        ratio(self.uncoded_bit_errors, self.total_bits())
    }

    pub fn average_iterations(&self) -> f64 {
        ratio(self.total_iterations, self.frames)
    }

    /// Fraction of frames finished within k iterations, for k in 0..=T.
    pub fn completion_cdf(&self) -> Vec<f64> {
        let mut done = 0;
        self.completions
            .iter()
            .map(|&count| {
                done += count;
                ratio(done, self.frames)
            })
            .collect()
    }

    /// BER bounds from the normal approximation at the given confidence.
    pub fn confidence_interval(&self, confidence: f64) -> (f64, f64) {
        let n = self.total_bits();
        if n == 0 {
            return (0.0, 1.0);
        }
        let p = self.ber();
        let margin = z_score(confidence) * (p * (1.0 - p) / n as f64).sqrt();
        ((p - margin).max(0.0), (p + margin).min(1.0))
    }

    /// One-line progress report for logs.
    pub fn progress_line(&self) -> String {
        let weights: Vec<String> = self
            .error_weights
            .iter()
            .map(|(w, count)| format!("{}:{}", w, count))
            .collect();
        format!(
            "{} bit errs in {} words, BER={:.3e}, WER={:.3e}, avg iterations={:.2}, uncoded BER={:.3e}, weights [{}]",
            self.bit_errors,
            self.frames,
            self.ber(),
            self.wer(),
            self.average_iterations(),
            self.uncoded_ber(),
            weights.join(" ")
        )
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Two-sided normal quantile for a confidence level.
fn z_score(confidence: f64) -> f64 {
    match () {
        _ if (confidence - 0.90).abs() < 0.001 => 1.645,
        _ if (confidence - 0.95).abs() < 0.001 => 1.960,
        _ if (confidence - 0.99).abs() < 0.001 => 2.576,
        _ => {
            // rational approximation of the probit function
            let p = (1.0 - confidence) / 2.0;
            let t = (-2.0 * p.ln()).sqrt();
            t - (2.515517 + 0.802853 * t + 0.010328 * t * t)
                / (1.0 + 1.432788 * t + 0.189269 * t * t + 0.001308 * t * t * t)
        }
    }
}
