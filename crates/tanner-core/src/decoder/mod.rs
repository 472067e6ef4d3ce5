//! Iterative decoding over a shared [`TannerGraph`].
//!
//! Every binary decoder family is a [`NodeRules`] strategy driven by the
//! same convergence loop in [`Decoder::decode`]:
//!
//! ```text
//!   reset(samples) ──► check_update ──► satisfied? ──yes──► SATISFIED (iterations = it)
//!                          ▲                │no
//!                          │                ▼
//!                          └──────── symbol_update
//!                                           │ it == T
//!                                           ▼
//!                                   finish ──► BUDGET_EXHAUSTED (iterations = T)
//! ```
//!
//! The check update for all checks completes before any symbol consumes
//! its output, so results do not depend on traversal order. The only early
//! exit is the all-zero syndrome.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rand::SeedableRng;
//! use tanner_core::channel::AwgnChannel;
//! use tanner_core::config::{Algorithm, DecoderConfig, MinSumConfig};
//! use tanner_core::decoder::Decoder;
//! use tanner_core::graph::TannerGraph;
//!
//! let graph = Arc::new(TannerGraph::hamming_7_4());
//! let channel = AwgnChannel::new(8.0, graph.rate()).unwrap();
//! let config = DecoderConfig::new(Algorithm::MinSum(MinSumConfig::default()), 20);
//! let mut decoder = Decoder::new(graph, &config, &channel).unwrap();
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let samples = [1.0, 1.0, 1.0, 1.0, -0.3, 1.0, 1.0];
//! let outcome = decoder.decode(&samples, &mut rng).unwrap();
//! assert!(outcome.satisfied);
//! assert_eq!(outcome.iterations, 1);
//! assert_eq!(outcome.residual_errors(&[false; 7]), 0);
//! ```

mod bp;
mod dd_bmp;
mod gdbf;
pub mod messages;
mod min_sum;
mod ngdbf_hw;
pub mod nonbinary;

pub use messages::{EdgeMessages, ProbabilityMessages};
pub use nonbinary::{NonBinaryDecoder, SymbolOutcome};

use crate::channel::{AwgnChannel, NoiseSource};
use crate::config::{Algorithm, DecoderConfig};
use crate::error::{TannerError, TannerResult};
use crate::graph::TannerGraph;
use crate::quantize::count_non_finite;
use std::sync::Arc;

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Hard decisions, `true` for bit 1
    pub decisions: Vec<bool>,
    /// Iterations used; equals the budget when the loop ran out
    pub iterations: usize,
    /// All checks satisfied by `decisions`
    pub satisfied: bool,
    /// Decisions taken from a non-finite soft value
    pub anomalies: usize,
}

impl FrameOutcome {
    /// Bit positions where the decisions differ from `reference`.
    pub fn residual_errors(&self, reference: &[bool]) -> usize {
        self.decisions
            .iter()
            .zip(reference)
            .filter(|(d, r)| d != r)
            .count()
    }
}

/// Check-node and symbol-node rules of one decoder family.
///
/// `syndrome[c]` is `true` for an unsatisfied check. All per-frame state
/// (messages, thresholds, noise buffers) belongs to the implementor and is
/// rebuilt by [`reset`](Self::reset).
pub trait NodeRules: std::fmt::Debug + Send {
    /// Load a frame: initial decisions from `samples`, fresh messages and
    /// adaptive state.
    fn reset(&mut self, graph: &TannerGraph, samples: &[f64], decisions: &mut [bool], noise: &mut dyn NoiseSource);

    /// Recompute check outputs and the syndrome of `decisions`. Returns
    /// whether every check is satisfied.
    fn check_update(&mut self, graph: &TannerGraph, decisions: &[bool], syndrome: &mut [bool]) -> bool;

    /// Recompute symbol outputs and decisions for iteration `iteration`.
    /// Returns the number of decisions taken from non-finite values.
    fn symbol_update(
        &mut self,
        graph: &TannerGraph,
        syndrome: &[bool],
        decisions: &mut [bool],
        iteration: usize,
        noise: &mut dyn NoiseSource,
    ) -> usize;

    /// Adjust the decisions after the budget ran out.
    fn finish(&mut self, _decisions: &mut [bool]) {}
}

/// Hard decision from a soft total where positive means bit 0.
///
/// NaN is a numeric anomaly: it is logged, counted, and decided as bit 0.
#[inline]
pub(crate) fn decide(total: f64, symbol: usize, anomalies: &mut usize) -> bool {
    if total.is_nan() {
        tracing::warn!(symbol, "non-finite soft value at decision time; deciding bit 0");
        *anomalies += 1;
        return false;
    }
    !(total > 0.0)
}

/// Bipolar sign with zero counted as positive.
#[inline]
pub(crate) fn sign(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Convergence loop over one decoder family.
#[derive(Debug)]
pub struct Decoder {
    graph: Arc<TannerGraph>,
    rules: Box<dyn NodeRules>,
    name: &'static str,
    max_iterations: usize,
    decisions: Vec<bool>,
    syndrome: Vec<bool>,
}

impl Decoder {
    /// Build the decoder selected by `config` for `graph`.
    ///
    /// `channel` supplies the noise level used for LLR scaling and for the
    /// perturbation of noisy bit-flipping decoders.
    pub fn new(graph: Arc<TannerGraph>, config: &DecoderConfig, channel: &AwgnChannel) -> TannerResult<Self> {
        config.validate()?;
        if !graph.is_binary() {
            return Err(TannerError::config(format!(
                "graph over GF({}) needs the non-binary decoder",
                graph.field_order()
            )));
        }

        let max_iterations = config.max_iterations;
        let rules: Box<dyn NodeRules> = match &config.algorithm {
            Algorithm::Bp(cfg) => Box::new(bp::BeliefPropagation::new(&graph, cfg, channel)),
            Algorithm::MinSum(cfg) => Box::new(min_sum::MinSum::new(&graph, cfg)?),
            Algorithm::Gdbf(cfg) => Box::new(gdbf::Gdbf::new(&graph, cfg, channel, max_iterations)?),
            Algorithm::NgdbfHw(cfg) => Box::new(ngdbf_hw::NgdbfHw::new(&graph, cfg, channel)?),
            Algorithm::DdBmp(cfg) => Box::new(dd_bmp::DdBmp::new(&graph, cfg)?),
        };

        tracing::debug!(
            algorithm = config.algorithm.name(),
            symbols = graph.num_symbols(),
            checks = graph.num_checks(),
            edges = graph.num_edges(),
            max_iterations,
            sigma = channel.sigma(),
            "decoder ready"
        );

        Ok(Self {
            decisions: vec![false; graph.num_symbols()],
            syndrome: vec![false; graph.num_checks()],
            name: config.algorithm.name(),
            graph,
            rules,
            max_iterations,
        })
    }

    pub fn graph(&self) -> &Arc<TannerGraph> {
        &self.graph
    }

    /// Family name, as in [`Algorithm::name`].
    pub fn algorithm(&self) -> &'static str {
        self.name
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Decode one frame of received samples.
    ///
    /// Draws from `noise` only for perturbed families, in symbol order
    /// within each iteration, so a fixed seed reproduces the frame exactly.
    pub fn decode(&mut self, samples: &[f64], noise: &mut dyn NoiseSource) -> TannerResult<FrameOutcome> {
        TannerError::check_len(self.graph.num_symbols(), samples.len())?;
        let graph = &*self.graph;

        let mut anomalies = count_non_finite(samples);
        self.rules.reset(graph, samples, &mut self.decisions, noise);

        let mut iterations = self.max_iterations;
        let mut satisfied = false;
        for it in 0..self.max_iterations {
            if self.rules.check_update(graph, &self.decisions, &mut self.syndrome) {
                satisfied = true;
                iterations = it;
                break;
            }
            anomalies += self
                .rules
                .symbol_update(graph, &self.syndrome, &mut self.decisions, it, noise);
            tracing::trace!(
                iteration = it,
                unsatisfied = self.syndrome.iter().filter(|&&s| s).count(),
                "iteration"
            );
        }

        if !satisfied {
            self.rules.finish(&mut self.decisions);
            satisfied = graph.syndrome_into(&self.decisions, &mut self.syndrome);
        }

        if anomalies > 0 {
            tracing::warn!(anomalies, "frame decoded with numeric anomalies");
        }
        tracing::debug!(algorithm = self.name, iterations, satisfied, "frame decoded");

        Ok(FrameOutcome {
            decisions: self.decisions.clone(),
            iterations,
            satisfied,
            anomalies,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::config::{BpConfig, DdBmpConfig, GdbfConfig, MinSumConfig, NgdbfHwConfig, Perturbation};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn all_families() -> Vec<Algorithm> {
        vec![
            Algorithm::Bp(BpConfig::default()),
            Algorithm::MinSum(MinSumConfig::default()),
            Algorithm::Gdbf(GdbfConfig::default()),
            Algorithm::Gdbf(GdbfConfig {
                perturbation: Perturbation::Gaussian,
                ..GdbfConfig::default()
            }),
            Algorithm::NgdbfHw(NgdbfHwConfig::default()),
            Algorithm::DdBmp(DdBmpConfig::default()),
        ]
    }

    #[test]
    fn test_noiseless_codeword_satisfied_at_iteration_zero() {
        let graph = Arc::new(TannerGraph::hamming_7_4());
        let channel = AwgnChannel::new(3.0, graph.rate()).unwrap();
        let samples = noiseless(&HAMMING_CODEWORD);
        for algorithm in all_families() {
            let name = algorithm.name();
            let mut decoder = Decoder::new(graph.clone(), &DecoderConfig::new(algorithm, 10), &channel).unwrap();
            let outcome = decoder.decode(&samples, &mut StdRng::seed_from_u64(1)).unwrap();
            assert!(outcome.satisfied, "{}", name);
            assert_eq!(outcome.iterations, 0, "{}", name);
            assert_eq!(outcome.decisions, HAMMING_CODEWORD.to_vec(), "{}", name);
        }
    }

    #[test]
    fn test_satisfied_iff_syndrome_zero() {
        let graph = Arc::new(regular_graph(96, 4));
        let channel = AwgnChannel::new(1.0, graph.rate()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for algorithm in all_families() {
            let mut decoder = Decoder::new(graph.clone(), &DecoderConfig::new(algorithm, 15), &channel).unwrap();
            for _ in 0..20 {
                let samples = channel.transmit(&vec![false; 96], &mut rng);
                let outcome = decoder.decode(&samples, &mut rng).unwrap();
                assert_eq!(outcome.satisfied, graph.is_codeword(&outcome.decisions));
                if !outcome.satisfied {
                    assert_eq!(outcome.iterations, 15);
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let graph = Arc::new(regular_graph(96, 2));
        let channel = AwgnChannel::new(2.0, graph.rate()).unwrap();
        let samples = channel.transmit(&vec![false; 96], &mut StdRng::seed_from_u64(5));
        for algorithm in all_families() {
            let config = DecoderConfig::new(algorithm, 30);
            let mut a = Decoder::new(graph.clone(), &config, &channel).unwrap();
            let mut b = Decoder::new(graph.clone(), &config, &channel).unwrap();
            let first = a.decode(&samples, &mut StdRng::seed_from_u64(99)).unwrap();
            let second = b.decode(&samples, &mut StdRng::seed_from_u64(99)).unwrap();
            assert_eq!(first, second, "{}", config.algorithm.name());
        }
    }

    #[test]
    fn test_length_mismatch() {
        let graph = Arc::new(TannerGraph::hamming_7_4());
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let mut decoder = Decoder::new(graph, &DecoderConfig::default(), &channel).unwrap();
        let err = decoder.decode(&[1.0; 6], &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, TannerError::LengthMismatch { expected: 7, actual: 6 }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let graph = Arc::new(TannerGraph::hamming_7_4());
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let config = DecoderConfig::new(Algorithm::Bp(BpConfig::default()), 0);
        assert!(matches!(
            Decoder::new(graph, &config, &channel),
            Err(TannerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_nan_sample_counts_anomaly() {
        let graph = Arc::new(TannerGraph::hamming_7_4());
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let config = DecoderConfig::new(Algorithm::MinSum(MinSumConfig::default()), 5);
        let mut decoder = Decoder::new(graph, &config, &channel).unwrap();
        let mut samples = vec![1.0; 7];
        samples[3] = f64::NAN;
        let outcome = decoder.decode(&samples, &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(outcome.anomalies > 0);
        assert!(!outcome.decisions[3]);
    }

    #[test]
    fn test_nan_sample_counted_by_quantized_families() {
        let graph = Arc::new(TannerGraph::hamming_7_4());
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let mut samples = vec![1.0; 7];
        samples[3] = f64::NAN;
        for algorithm in [
            Algorithm::DdBmp(DdBmpConfig::default()),
            Algorithm::NgdbfHw(NgdbfHwConfig::default()),
        ] {
            let config = DecoderConfig::new(algorithm, 5);
            let mut decoder = Decoder::new(graph.clone(), &config, &channel).unwrap();
            let outcome = decoder.decode(&samples, &mut StdRng::seed_from_u64(0)).unwrap();
            assert_eq!(outcome.anomalies, 1);
            assert!(outcome.satisfied);
            assert!(outcome.decisions.iter().all(|&d| !d));
        }
    }

    #[test]
    fn test_residual_errors() {
        let outcome = FrameOutcome {
            decisions: vec![true, false, true],
            iterations: 3,
            satisfied: false,
            anomalies: 0,
        };
        assert_eq!(outcome.residual_errors(&[false, false, false]), 2);
        assert_eq!(outcome.residual_errors(&[true, false, true]), 0);
    }
}
