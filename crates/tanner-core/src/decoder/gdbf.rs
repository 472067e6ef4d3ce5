//! Gradient-descent bit flipping, with the noisy (NGDBF) extensions.
//!
//! With bipolar decisions d and check products s_c = prod d over the check,
//! each symbol's energy is
//!
//! ```text
//! E_i = d_i * y_i + w * sum_{c in N(i)} s_c  (+ perturbation)
//! ```
//!
//! A symbol whose energy falls below its threshold flips. The objective
//! `f = sum d_i y_i + sum_c s_c` drives the parallel-to-sequential switch.

use super::NodeRules;
use crate::channel::{bpsk, hard_decision, normal_cdf, AwgnChannel, NoiseSource};
use crate::config::{GdbfConfig, GdbfMode, Perturbation};
use crate::error::TannerResult;
use crate::graph::TannerGraph;
use crate::quantize::Conditioner;

/// Flip probabilities available to the stochastic flip rule.
const FLIP_PROBABILITIES: [f64; 8] = [0.0, 0.0625, 0.125, 0.25, 0.34375, 0.4106, 0.68359, 1.0];

/// Nearest entry of [`FLIP_PROBABILITIES`]; the first wins ties.
fn quantized_probability(p: f64) -> f64 {
    let mut best = FLIP_PROBABILITIES[0];
    let mut best_dist = f64::INFINITY;
    for &level in &FLIP_PROBABILITIES {
        let dist = (level - p) * (level - p);
        if dist < best_dist {
            best_dist = dist;
            best = level;
        }
    }
    best
}

#[derive(Debug)]
pub(crate) struct Gdbf {
    theta: f64,
    lambda: f64,
    weight: f64,
    mode: GdbfMode,
    perturbation: Perturbation,
    noise_shaping: bool,
    stochastic_flips: bool,
    /// Perturbation standard deviation
    noise_sigma: f64,
    window: usize,
    max_iterations: usize,
    conditioner: Conditioner,

    y: Vec<f64>,
    thresholds: Vec<f64>,
    previous_draw: Vec<f64>,
    /// Bipolar decision sums over the smoothing window.
    votes: Vec<i64>,
    sequential: bool,
    /// Objective of the decisions entering the current symbol update
    objective: f64,
    /// Syndrome of the post-flip decisions, for the mode switch
    scratch: Vec<bool>,
}

impl Gdbf {
    pub(crate) fn new(
        graph: &TannerGraph,
        config: &GdbfConfig,
        channel: &AwgnChannel,
        max_iterations: usize,
    ) -> TannerResult<Self> {
        let n = graph.num_symbols();
        Ok(Self {
            theta: config.theta,
            lambda: config.lambda,
            weight: config.syndrome_weight,
            mode: config.mode,
            perturbation: config.perturbation,
            noise_shaping: config.noise_shaping,
            stochastic_flips: config.stochastic_flips,
            noise_sigma: channel.sigma() * config.noise_scale,
            window: config.smoothing_window,
            max_iterations,
            conditioner: config.front_end.conditioner()?,
            y: vec![0.0; n],
            thresholds: vec![config.theta; n],
            previous_draw: vec![0.0; n],
            votes: vec![0; n],
            sequential: config.mode == GdbfMode::Sequential,
            objective: 0.0,
            scratch: vec![false; graph.num_checks()],
        })
    }

    fn draw(&mut self, symbol: usize, noise: &mut dyn NoiseSource) -> f64 {
        let draw = match self.perturbation {
            Perturbation::None => return 0.0,
            Perturbation::Gaussian => self.noise_sigma * noise.gaussian(),
            // uniform on [-sqrt(3) sigma, sqrt(3) sigma] has variance sigma^2
            Perturbation::Uniform => 3f64.sqrt() * self.noise_sigma * 2.0 * (noise.uniform() - 0.5),
        };
        if self.noise_shaping {
            let shaped = draw - self.previous_draw[symbol];
            self.previous_draw[symbol] = draw;
            shaped
        } else {
            draw
        }
    }

    fn energy(&self, graph: &TannerGraph, syndrome: &[bool], decisions: &[bool], symbol: usize) -> f64 {
        let check_sum: f64 = graph
            .symbol_checks(symbol)
            .map(|c| if syndrome[c] { -1.0 } else { 1.0 })
            .sum();
        bpsk(decisions[symbol]) * self.y[symbol] + self.weight * check_sum
    }

    fn threshold_flip(&self, energy: f64, symbol: usize, noise: &mut dyn NoiseSource) -> bool {
        if self.stochastic_flips && self.noise_sigma > 0.0 {
            let p = normal_cdf((self.thresholds[symbol] - energy) / self.noise_sigma);
            noise.uniform() < quantized_probability(p)
        } else {
            energy < self.thresholds[symbol]
        }
    }

    fn adapt(&mut self, symbol: usize, flipped: bool) {
        if !flipped {
            self.thresholds[symbol] *= self.lambda;
        }
    }

    /// Enter sequential mode when this iteration's flips did not raise the
    /// objective. Takes effect from the next iteration.
    fn maybe_switch(&mut self, graph: &TannerGraph, decisions: &[bool], iteration: usize) {
        if let GdbfMode::Switching { after } = self.mode {
            if !self.sequential && iteration > after {
                graph.syndrome_into(decisions, &mut self.scratch);
                let flipped = objective(&self.y, decisions, &self.scratch);
                if self.objective >= flipped {
                    self.sequential = true;
                    tracing::trace!(iteration, before = self.objective, after = flipped, "switching to sequential flips");
                }
            }
        }
    }
}

/// `sum d_i y_i + sum_c s_c` in bipolar form.
fn objective(y: &[f64], decisions: &[bool], syndrome: &[bool]) -> f64 {
    let correlation: f64 = decisions.iter().zip(y).map(|(&d, &y)| bpsk(d) * y).sum();
    let checks: f64 = syndrome.iter().map(|&s| if s { -1.0 } else { 1.0 }).sum();
    correlation + checks
}

impl NodeRules for Gdbf {
    fn reset(&mut self, _graph: &TannerGraph, samples: &[f64], decisions: &mut [bool], _noise: &mut dyn NoiseSource) {
        self.conditioner.apply_into(samples, &mut self.y);
        for (d, &y) in decisions.iter_mut().zip(&self.y) {
            *d = hard_decision(y);
        }
        self.thresholds.fill(self.theta);
        self.previous_draw.fill(0.0);
        self.votes.fill(0);
        self.sequential = self.mode == GdbfMode::Sequential;
        self.objective = 0.0;
    }

    fn check_update(&mut self, graph: &TannerGraph, decisions: &[bool], syndrome: &mut [bool]) -> bool {
        let satisfied = graph.syndrome_into(decisions, syndrome);
        self.objective = objective(&self.y, decisions, syndrome);
        satisfied
    }

    fn symbol_update(
        &mut self,
        graph: &TannerGraph,
        syndrome: &[bool],
        decisions: &mut [bool],
        iteration: usize,
        noise: &mut dyn NoiseSource,
    ) -> usize {
        let mut anomalies = 0;
        let mut flips = 0;
        let mut lowest: Option<(usize, f64)> = None;
        for symbol in 0..graph.num_symbols() {
            let energy = self.energy(graph, syndrome, decisions, symbol) + self.draw(symbol, noise);
            if energy.is_nan() {
                tracing::warn!(symbol, "non-finite symbol energy; decision held");
                anomalies += 1;
                if !self.sequential {
                    self.adapt(symbol, false);
                }
                continue;
            }

            if self.sequential {
                if lowest.map_or(true, |(_, e)| energy < e) {
                    lowest = Some((symbol, energy));
                }
                continue;
            }

            let flip = self.threshold_flip(energy, symbol, noise);
            if flip {
                decisions[symbol] = !decisions[symbol];
                flips += 1;
            }
            self.adapt(symbol, flip);
        }

        // thresholds are unused while sequential and stay frozen
        if self.sequential {
            if let Some((symbol, _)) = lowest {
                decisions[symbol] = !decisions[symbol];
                flips = 1;
            }
        }

        self.maybe_switch(graph, decisions, iteration);

        if self.window > 0 && iteration + self.window >= self.max_iterations {
            for (vote, &d) in self.votes.iter_mut().zip(decisions.iter()) {
                *vote += if d { -1 } else { 1 };
            }
        }

        tracing::trace!(iteration, flips, sequential = self.sequential, "gdbf flips");
        anomalies
    }

    fn finish(&mut self, decisions: &mut [bool]) {
        if self.window == 0 {
            return;
        }
        for (d, &vote) in decisions.iter_mut().zip(&self.votes) {
            *d = vote <= 0;
        }
    }
}
