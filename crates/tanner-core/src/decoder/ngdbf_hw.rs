//! Fixed-point noisy GDBF, bit-exact with a hardware datapath.
//!
//! Channel samples and perturbation noise are scaled by 1/(2w), quantized to
//! NQ-bit level indices and stored as packed [`SignMagnitude`] words. The
//! energy is an integer sum:
//!
//! ```text
//! E_i = (1 - 2 d_i) * unpack(y_i) + Smult * #satisfied(N(i)) + unpack(q[i + ptr])
//! ```
//!
//! and a symbol flips when `E_i <= theta`. The noise buffer holds more words
//! than symbols; its read offset advances by one every iteration and wraps
//! before running past the end.

use super::NodeRules;
use crate::channel::{hard_decision, AwgnChannel, NoiseSource};
use crate::config::NgdbfHwConfig;
use crate::error::TannerResult;
use crate::graph::TannerGraph;
use crate::quantize::{saturate, Quantizer, SignMagnitude};

#[derive(Debug)]
pub(crate) struct NgdbfHw {
    config: NgdbfHwConfig,
    quantizer: Quantizer,
    codec: SignMagnitude,
    noise_sigma: f64,
    /// Integer weight of one satisfied check.
    smult: i32,
    /// Initial threshold, the level index of the reference sample.
    threshold: f64,
    /// Current threshold; moves only under flip-rate feedback.
    theta: f64,
    channel_words: Vec<u32>,
    noise_words: Vec<u32>,
    pointer: usize,
}

impl NgdbfHw {
    pub(crate) fn new(graph: &TannerGraph, config: &NgdbfHwConfig, channel: &AwgnChannel) -> TannerResult<Self> {
        let lmax = config.ymax / (2.0 * config.syndrome_weight);
        let quantizer = Quantizer::new(lmax, config.bits)?;
        let codec = SignMagnitude::new(config.bits)?;
        let buffer_len = config.buffer_len(graph.num_symbols())?;

        let levels = ((1u32 << config.bits) - 1) as f64;
        let smult = (levels / lmax).round() as i32;
        let threshold = codec.decode(codec.encode(quantizer.index(config.threshold_sample))) as f64;

        Ok(Self {
            config: config.clone(),
            quantizer,
            codec,
            noise_sigma: channel.sigma() * config.noise_scale,
            smult,
            threshold,
            theta: threshold,
            channel_words: vec![0; graph.num_symbols()],
            noise_words: vec![0; buffer_len],
            pointer: 0,
        })
    }

    fn pack(&self, x: f64) -> u32 {
        self.codec.encode(self.quantizer.index(x))
    }
}

impl NodeRules for NgdbfHw {
    fn reset(&mut self, _graph: &TannerGraph, samples: &[f64], decisions: &mut [bool], noise: &mut dyn NoiseSource) {
        let scale = 2.0 * self.config.syndrome_weight;
        for (i, &sample) in samples.iter().enumerate() {
            let y = saturate(sample, self.config.ymax);
            // NaN decides bit 0, like its quantized word
            decisions[i] = !y.is_nan() && hard_decision(y);
            self.channel_words[i] = self.pack(y / scale);
        }

        let lmax = self.quantizer.ymax();
        for i in 0..self.noise_words.len() {
            let q = self.noise_sigma * noise.gaussian();
            let scaled = ((q - self.config.theta0) / scale - self.config.noise_bias).clamp(-lmax, lmax);
            self.noise_words[i] = self.pack(scaled);
        }

        self.pointer = 0;
        self.theta = self.threshold;
    }

    fn check_update(&mut self, graph: &TannerGraph, decisions: &[bool], syndrome: &mut [bool]) -> bool {
        graph.syndrome_into(decisions, syndrome)
    }

    fn symbol_update(
        &mut self,
        graph: &TannerGraph,
        syndrome: &[bool],
        decisions: &mut [bool],
        iteration: usize,
        _noise: &mut dyn NoiseSource,
    ) -> usize {
        let mut flips = 0;
        for symbol in 0..graph.num_symbols() {
            let polarity = if decisions[symbol] { -1 } else { 1 };
            let satisfied = graph.symbol_checks(symbol).filter(|&c| !syndrome[c]).count() as i32;
            let energy = polarity * self.codec.decode(self.channel_words[symbol])
                + satisfied * self.smult
                + self.codec.decode(self.noise_words[symbol + self.pointer]);
            if energy as f64 <= self.theta {
                decisions[symbol] = !decisions[symbol];
                flips += 1;
            }
        }

        if let Some(feedback) = &self.config.flip_rate_feedback {
            self.theta = feedback.adjust(self.theta, flips);
        }

        self.pointer += 1;
        if self.pointer >= self.noise_words.len() - graph.num_symbols() {
            self.pointer = 0;
        }

        tracing::trace!(iteration, flips, theta = self.theta, "ngdbf flips");
        0
    }
}
