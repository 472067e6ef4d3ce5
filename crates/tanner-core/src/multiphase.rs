//! Multi-phase decoding: P restarts of one decoder over the same frame.
//!
//! Models P hardware decoders racing on one received word. Each phase starts
//! from the identical initial condition with its own perturbation stream,
//! seeded from one `u64` drawn from the caller's generator, so the caller's
//! stream advances by exactly P draws per frame whatever the decoder does.
//!
//! The report takes the minimum iteration count and, independently, the
//! minimum residual error count over the phases. The two minima may come
//! from different phases, so the error figure is optimistic; the per-phase
//! values are kept alongside for callers that need the exact pairing.

use crate::channel::AwgnChannel;
use crate::config::DecoderConfig;
use crate::decoder::{Decoder, FrameOutcome};
use crate::error::{TannerError, TannerResult};
use crate::graph::TannerGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Combined result of all phases of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    /// Outcome of the first phase reaching the minimum iteration count
    pub outcome: FrameOutcome,
    pub phase_iterations: Vec<usize>,
    pub phase_errors: Vec<usize>,
    /// Minimum over `phase_iterations`
    pub iterations: usize,
    /// Minimum over `phase_errors`
    pub errors: usize,
    /// Any phase satisfied every check
    pub satisfied: bool,
}

#[derive(Debug)]
pub struct PhaseController {
    decoder: Decoder,
    phases: usize,
}

impl PhaseController {
    pub fn new(decoder: Decoder, phases: usize) -> TannerResult<Self> {
        if phases == 0 {
            return Err(TannerError::config("at least one decoding phase is required"));
        }
        Ok(Self { decoder, phases })
    }

    /// Decoder and phase count from one configuration.
    pub fn from_config(graph: Arc<TannerGraph>, config: &DecoderConfig, channel: &AwgnChannel) -> TannerResult<Self> {
        if config.phases > 1 && !config.algorithm.is_stochastic() {
            tracing::debug!(
                algorithm = config.algorithm.name(),
                phases = config.phases,
                "deterministic decoder: every phase repeats the first"
            );
        }
        Self::new(Decoder::new(graph, config, channel)?, config.phases)
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn phases(&self) -> usize {
        self.phases
    }

    /// Run every phase on `samples` and score it against `reference`.
    pub fn decode<R: Rng>(
        &mut self,
        samples: &[f64],
        reference: &[bool],
        rng: &mut R,
    ) -> TannerResult<PhaseReport> {
        TannerError::check_len(self.decoder.graph().num_symbols(), reference.len())?;

        let mut phases = Vec::with_capacity(self.phases);
        for phase in 0..self.phases {
            let mut stream = StdRng::seed_from_u64(rng.gen());
            let outcome = self.decoder.decode(samples, &mut stream)?;
            let errors = outcome.residual_errors(reference);
            tracing::trace!(phase, iterations = outcome.iterations, errors, "phase finished");
            phases.push((outcome, errors));
        }
        PhaseReport::combine(phases)
    }
}

impl PhaseReport {
    /// Merge per-phase outcomes with their residual error counts.
    ///
    /// The iteration and error minima are taken separately; the kept
    /// outcome is the first one reaching the iteration minimum.
    pub fn combine(phases: Vec<(FrameOutcome, usize)>) -> TannerResult<Self> {
        let phase_iterations: Vec<usize> = phases.iter().map(|(o, _)| o.iterations).collect();
        let phase_errors: Vec<usize> = phases.iter().map(|&(_, e)| e).collect();
        let satisfied = phases.iter().any(|(o, _)| o.satisfied);

        let mut best: Option<FrameOutcome> = None;
        for (outcome, _) in phases {
            if best.as_ref().map_or(true, |b| outcome.iterations < b.iterations) {
                best = Some(outcome);
            }
        }
        let outcome = best.ok_or_else(|| TannerError::config("no decoding phase ran"))?;

        Ok(PhaseReport {
            iterations: phase_iterations.iter().copied().min().unwrap_or(outcome.iterations),
            errors: phase_errors.iter().copied().min().unwrap_or(0),
            outcome,
            phase_iterations,
            phase_errors,
            satisfied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::bpsk;
    use crate::config::{Algorithm, BpConfig, GdbfConfig, Perturbation};

    fn noisy_controller(phases: usize) -> (Arc<TannerGraph>, AwgnChannel, PhaseController) {
        let mut rng = StdRng::seed_from_u64(31);
        let graph = Arc::new(TannerGraph::regular(96, 3, 6, &mut rng).unwrap());
        let channel = AwgnChannel::new(2.0, graph.rate()).unwrap();
        let config = DecoderConfig::new(
            Algorithm::Gdbf(GdbfConfig {
                perturbation: Perturbation::Gaussian,
                ..GdbfConfig::default()
            }),
            40,
        )
        .with_phases(phases);
        let controller = PhaseController::from_config(graph.clone(), &config, &channel).unwrap();
        (graph, channel, controller)
    }

    #[test]
    fn test_zero_phases_rejected() {
        let graph = Arc::new(TannerGraph::hamming_7_4());
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let decoder = Decoder::new(graph, &DecoderConfig::default(), &channel).unwrap();
        assert!(PhaseController::new(decoder, 0).is_err());
    }

    #[test]
    fn test_reports_independent_minima() {
        let (graph, channel, mut controller) = noisy_controller(4);
        let mut rng = StdRng::seed_from_u64(7);
        let reference = vec![false; graph.num_symbols()];
        for _ in 0..25 {
            let samples = channel.transmit(&reference, &mut rng);
            let report = controller.decode(&samples, &reference, &mut rng).unwrap();
            assert_eq!(report.phase_iterations.len(), 4);
            assert_eq!(report.iterations, *report.phase_iterations.iter().min().unwrap());
            assert_eq!(report.errors, *report.phase_errors.iter().min().unwrap());
            assert_eq!(report.outcome.iterations, report.iterations);
            assert!(report.errors <= report.outcome.residual_errors(&reference));
        }
    }

    fn outcome(errors_at: &[usize], iterations: usize, satisfied: bool) -> FrameOutcome {
        let mut decisions = vec![false; 8];
        for &i in errors_at {
            decisions[i] = true;
        }
        FrameOutcome {
            decisions,
            iterations,
            satisfied,
            anomalies: 0,
        }
    }

    #[test]
    fn test_minima_from_different_phases() {
        // fast phase stalls on a wrong word, slow phase converges
        let fast = outcome(&[1, 4, 6], 12, false);
        let slow = outcome(&[], 30, true);
        let report = PhaseReport::combine(vec![(slow, 0), (fast.clone(), 3)]).unwrap();

        assert_eq!(report.iterations, 12);
        assert_eq!(report.errors, 0);
        assert_eq!(report.outcome, fast);
        assert_eq!(report.outcome.residual_errors(&[false; 8]), 3);
        assert!(report.errors < report.outcome.residual_errors(&[false; 8]));
        assert!(report.satisfied);
        assert_eq!(report.phase_iterations, vec![30, 12]);
        assert_eq!(report.phase_errors, vec![0, 3]);
    }

    #[test]
    fn test_combine_keeps_first_of_tied_phases() {
        let first = outcome(&[2], 5, false);
        let second = outcome(&[3, 5], 5, false);
        let report = PhaseReport::combine(vec![(first.clone(), 1), (second, 2)]).unwrap();
        assert_eq!(report.outcome, first);
        assert!(!report.satisfied);
        assert!(PhaseReport::combine(Vec::new()).is_err());
    }

    #[test]
    fn test_decisions_from_first_fastest_phase() {
        let (graph, channel, mut controller) = noisy_controller(3);
        let mut rng = StdRng::seed_from_u64(12);
        let reference = vec![false; graph.num_symbols()];
        let samples = channel.transmit(&reference, &mut rng);
        let report = controller.decode(&samples, &reference, &mut rng).unwrap();
        let first = report
            .phase_iterations
            .iter()
            .position(|&it| it == report.iterations)
            .unwrap();
        assert_eq!(report.outcome.residual_errors(&reference), report.phase_errors[first]);
    }

    #[test]
    fn test_same_seed_same_report() {
        let (graph, channel, mut a) = noisy_controller(3);
        let (_, _, mut b) = noisy_controller(3);
        let reference = vec![false; graph.num_symbols()];
        let samples = channel.transmit(&reference, &mut StdRng::seed_from_u64(4));
        let first = a.decode(&samples, &reference, &mut StdRng::seed_from_u64(5)).unwrap();
        let second = b.decode(&samples, &reference, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_deterministic_family_phases_agree() {
        let graph = Arc::new(TannerGraph::hamming_7_4());
        let channel = AwgnChannel::new(3.0, graph.rate()).unwrap();
        let config = DecoderConfig::new(Algorithm::Bp(BpConfig::default()), 20).with_phases(3);
        let mut controller = PhaseController::from_config(graph, &config, &channel).unwrap();
        let reference = [false; 7];
        let mut samples: Vec<f64> = reference.iter().map(|&b| bpsk(b)).collect();
        samples[6] = -0.2;
        let report = controller
            .decode(&samples, &reference, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert!(report.phase_iterations.iter().all(|&it| it == report.iterations));
        assert!(report.satisfied);
        assert_eq!(report.errors, 0);
    }
}
