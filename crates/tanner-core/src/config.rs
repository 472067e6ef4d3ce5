//! # Decoder Configuration
//!
//! Every tunable of every decoder family lives in one immutable
//! [`DecoderConfig`] value that is handed to the decoder at construction.
//! The family is a serde-tagged [`Algorithm`], so a YAML run description
//! selects it at run time:
//!
//! ```yaml
//! max_iterations: 100
//! phases: 4
//! algorithm:
//!   kind: gdbf
//!   theta: -0.9
//!   lambda: 0.991
//!   mode:
//!     kind: switching
//!     after: 10
//!   perturbation: gaussian
//!   smoothing_window: 8
//! ```
//!
//! Omitted fields take the defaults documented on each struct.

use crate::error::{TannerError, TannerResult};
use crate::quantize::{FrontEnd, Quantizer, MAX_BITS};
use serde::{Deserialize, Serialize};

/// Iteration budget, phase count and decoder family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Iteration budget T per phase
    pub max_iterations: usize,
    /// Number of independently seeded phases P per frame
    pub phases: usize,
    /// Decoder family and its tunables
    pub algorithm: Algorithm,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            phases: 1,
            algorithm: Algorithm::default(),
        }
    }
}

impl DecoderConfig {
    pub fn new(algorithm: Algorithm, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            algorithm,
            ..Self::default()
        }
    }

    /// Set the phase count.
    pub fn with_phases(mut self, phases: usize) -> Self {
        self.phases = phases;
        self
    }

    /// Reject parameter combinations no decoder can run with.
    ///
    /// Graph-dependent limits (the NGDBF noise buffer length) are checked
    /// again when the decoder is built against a graph.
    pub fn validate(&self) -> TannerResult<()> {
        if self.max_iterations == 0 {
            return Err(TannerError::config("max_iterations must be at least 1"));
        }
        if self.phases == 0 {
            return Err(TannerError::config("phases must be at least 1"));
        }
        match &self.algorithm {
            Algorithm::Bp(bp) => bp.validate(),
            Algorithm::MinSum(ms) => ms.validate(),
            Algorithm::Gdbf(g) => g.validate(self.max_iterations),
            Algorithm::NgdbfHw(n) => n.validate(),
            Algorithm::DdBmp(d) => d.validate(),
        }
    }
}

/// Decoder family selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Algorithm {
    /// Sum-product belief propagation in the LLR domain
    Bp(BpConfig),
    /// Min-sum with optional normalization or offset
    MinSum(MinSumConfig),
    /// Gradient-descent bit flipping (GDBF / NGDBF)
    Gdbf(GdbfConfig),
    /// Fixed-point noisy GDBF with packed sign-magnitude state
    NgdbfHw(NgdbfHwConfig),
    /// Decision-driven bit-level message passing with per-edge memory
    DdBmp(DdBmpConfig),
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::MinSum(MinSumConfig::default())
    }
}

impl Algorithm {
    /// Short family name used in logs and result files.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Bp(_) => "bp",
            Algorithm::MinSum(_) => "min-sum",
            Algorithm::Gdbf(_) => "gdbf",
            Algorithm::NgdbfHw(_) => "ngdbf-hw",
            Algorithm::DdBmp(_) => "dd-bmp",
        }
    }

    /// Whether decoding consumes draws from the noise source.
    pub fn is_stochastic(&self) -> bool {
        match self {
            Algorithm::Gdbf(g) => g.perturbation != Perturbation::None || g.stochastic_flips,
            Algorithm::NgdbfHw(_) => true,
            _ => false,
        }
    }

    /// Tunables as (name, value) pairs, in a stable order for result logs.
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        match self {
            Algorithm::Bp(bp) => vec![("max_llr", bp.max_llr.to_string())],
            Algorithm::MinSum(ms) => {
                let mut params = match ms.correction {
                    Correction::None => vec![("correction", "none".to_string())],
                    Correction::Normalized { alpha } => vec![
                        ("correction", "normalized".to_string()),
                        ("alpha", alpha.to_string()),
                    ],
                    Correction::Offset { delta } => vec![
                        ("correction", "offset".to_string()),
                        ("delta", delta.to_string()),
                    ],
                };
                params.extend(front_end_parameters(&ms.front_end));
                params
            }
            Algorithm::Gdbf(g) => {
                let mode = match g.mode {
                    GdbfMode::Parallel => "parallel".to_string(),
                    GdbfMode::Sequential => "sequential".to_string(),
                    GdbfMode::Switching { after } => format!("switching@{}", after),
                };
                let mut params = vec![
                    ("theta", g.theta.to_string()),
                    ("lambda", g.lambda.to_string()),
                    ("w", g.syndrome_weight.to_string()),
                    ("mode", mode),
                    ("perturbation", g.perturbation.as_str().to_string()),
                    ("noise_scale", g.noise_scale.to_string()),
                    ("noise_shaping", g.noise_shaping.to_string()),
                    ("stochastic_flips", g.stochastic_flips.to_string()),
                    ("smoothing_window", g.smoothing_window.to_string()),
                ];
                params.extend(front_end_parameters(&g.front_end));
                params
            }
            Algorithm::NgdbfHw(n) => {
                let mut params = vec![
                    ("theta0", n.theta0.to_string()),
                    ("noise_scale", n.noise_scale.to_string()),
                    ("w", n.syndrome_weight.to_string()),
                    ("ymax", n.ymax.to_string()),
                    ("bits", n.bits.to_string()),
                    ("noise_bias", n.noise_bias.to_string()),
                ];
                if let Some(fb) = &n.flip_rate_feedback {
                    params.push(("target_flips", fb.target_flips.to_string()));
                    params.push(("gain", fb.gain.to_string()));
                }
                params
            }
            Algorithm::DdBmp(d) => vec![("ymax", d.ymax.to_string()), ("bits", d.bits.to_string())],
        }
    }
}

fn front_end_parameters(front_end: &FrontEnd) -> Vec<(&'static str, String)> {
    match *front_end {
        FrontEnd::Raw => vec![],
        FrontEnd::Saturate { ymax } => vec![("ymax", ymax.to_string())],
        FrontEnd::Quantize { ymax, bits } => vec![("ymax", ymax.to_string()), ("bits", bits.to_string())],
    }
}

fn check_quantizer(ymax: f64, bits: u32) -> TannerResult<()> {
    if bits == 0 || bits > MAX_BITS {
        return Err(TannerError::config(format!(
            "quantizer width Q = {} outside 1..={}",
            bits, MAX_BITS
        )));
    }
    Quantizer::new(ymax, bits).map(|_| ())
}

/// Belief propagation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BpConfig {
    /// LLR magnitude clip, applied to channel and symbol-to-check messages
    pub max_llr: f64,
}

impl Default for BpConfig {
    fn default() -> Self {
        Self { max_llr: 20.0 }
    }
}

impl BpConfig {
    fn validate(&self) -> TannerResult<()> {
        if !(self.max_llr > 0.0) {
            return Err(TannerError::config("max_llr must be positive"));
        }
        Ok(())
    }
}

/// Magnitude correction applied to min-sum check outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Correction {
    None,
    /// Divide by `alpha`
    Normalized { alpha: f64 },
    /// Subtract `delta`, floored at zero
    Offset { delta: f64 },
}

impl Default for Correction {
    fn default() -> Self {
        Correction::None
    }
}

impl Correction {
    #[inline]
    pub fn apply(&self, magnitude: f64) -> f64 {
        match *self {
            Correction::None => magnitude,
            Correction::Normalized { alpha } => magnitude / alpha,
            Correction::Offset { delta } => (magnitude - delta).max(0.0),
        }
    }
}

/// Min-sum settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinSumConfig {
    pub correction: Correction,
    /// Conditioning of channel samples before decoding
    pub front_end: FrontEnd,
}

impl Default for MinSumConfig {
    fn default() -> Self {
        Self {
            correction: Correction::None,
            front_end: FrontEnd::Raw,
        }
    }
}

impl MinSumConfig {
    fn validate(&self) -> TannerResult<()> {
        match self.correction {
            Correction::Normalized { alpha } if !(alpha > 0.0) => {
                return Err(TannerError::config(format!("normalization alpha {} must be > 0", alpha)));
            }
            Correction::Offset { delta } if !(delta >= 0.0) => {
                return Err(TannerError::config(format!("offset delta {} must be >= 0", delta)));
            }
            _ => {}
        }
        validate_front_end(&self.front_end)
    }
}

fn validate_front_end(front_end: &FrontEnd) -> TannerResult<()> {
    if let FrontEnd::Quantize { ymax, bits } = *front_end {
        check_quantizer(ymax, bits)?;
    }
    front_end.validate()
}

/// GDBF flip schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GdbfMode {
    /// Every symbol below threshold flips each iteration
    Parallel,
    /// Only the lowest-energy symbol flips each iteration
    Sequential,
    /// Parallel until the objective stops improving after iteration `after`,
    /// then sequential for the rest of the frame
    Switching { after: usize },
}

impl Default for GdbfMode {
    fn default() -> Self {
        GdbfMode::Parallel
    }
}

/// Noise added to GDBF symbol energies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perturbation {
    None,
    /// Zero-mean Gaussian with the channel sigma times `noise_scale`
    Gaussian,
    /// Zero-mean uniform with the same variance as `Gaussian`
    Uniform,
}

impl Default for Perturbation {
    fn default() -> Self {
        Perturbation::None
    }
}

impl Perturbation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Perturbation::None => "none",
            Perturbation::Gaussian => "gaussian",
            Perturbation::Uniform => "uniform",
        }
    }
}

/// GDBF / NGDBF settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdbfConfig {
    /// Initial flip threshold θ
    pub theta: f64,
    /// Per-iteration threshold decay on non-flips; 1.0 disables adaptation
    pub lambda: f64,
    /// Weight w of the check terms in the energy
    pub syndrome_weight: f64,
    pub mode: GdbfMode,
    pub perturbation: Perturbation,
    /// Perturbation sigma as a multiple of the channel sigma
    pub noise_scale: f64,
    /// Use the difference of consecutive draws as the perturbation
    pub noise_shaping: bool,
    /// Flip with a quantized probability instead of a hard threshold
    pub stochastic_flips: bool,
    /// Majority-vote window W over the last iterations; 0 disables
    pub smoothing_window: usize,
    pub front_end: FrontEnd,
}

impl Default for GdbfConfig {
    fn default() -> Self {
        Self {
            theta: -0.9,
            lambda: 0.991,
            syndrome_weight: 1.0,
            mode: GdbfMode::Parallel,
            perturbation: Perturbation::None,
            noise_scale: 1.0,
            noise_shaping: false,
            stochastic_flips: false,
            smoothing_window: 0,
            front_end: FrontEnd::Saturate { ymax: 2.25 },
        }
    }
}

impl GdbfConfig {
    fn validate(&self, max_iterations: usize) -> TannerResult<()> {
        if !(self.lambda > 0.0 && self.lambda <= 1.0) {
            return Err(TannerError::config(format!("lambda {} outside (0, 1]", self.lambda)));
        }
        if !self.theta.is_finite() || !self.syndrome_weight.is_finite() {
            return Err(TannerError::config("theta and syndrome_weight must be finite"));
        }
        if !(self.noise_scale >= 0.0) {
            return Err(TannerError::config("noise_scale must be >= 0"));
        }
        if self.smoothing_window > max_iterations {
            return Err(TannerError::config(format!(
                "smoothing window {} exceeds the iteration budget {}",
                self.smoothing_window, max_iterations
            )));
        }
        validate_front_end(&self.front_end)
    }
}

/// Global threshold controller for the fixed-point NGDBF decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlipRateFeedback {
    /// Desired flips per iteration
    pub target_flips: f64,
    /// Threshold change per unit of flip-count error
    pub gain: f64,
    /// Upper bound on the adapted threshold
    pub max_threshold: f64,
}

impl FlipRateFeedback {
    /// Threshold after an iteration with `flips` flips.
    ///
    /// The flip-count error is clamped to ±`target_flips` before scaling.
    pub fn adjust(&self, theta: f64, flips: usize) -> f64 {
        let target = self.target_flips;
        let error = (target - flips as f64).clamp(-target, target);
        (theta + self.gain * error).min(self.max_threshold)
    }
}

/// Fixed-point NGDBF settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NgdbfHwConfig {
    /// Syndrome weight w; samples and noise are scaled by 1 / (2w)
    pub syndrome_weight: f64,
    /// Channel clip Ymax
    pub ymax: f64,
    /// Perturbation sigma as a multiple of the channel sigma
    pub noise_scale: f64,
    /// Packed word width NQ
    pub bits: u32,
    /// Threshold offset folded into the noise samples
    pub theta0: f64,
    /// Sample whose quantized level becomes the flip threshold
    pub threshold_sample: f64,
    /// Constant subtracted from every scaled noise sample
    pub noise_bias: f64,
    /// Noise buffer length; 0 selects 2N
    pub noise_buffer_len: usize,
    pub flip_rate_feedback: Option<FlipRateFeedback>,
}

impl Default for NgdbfHwConfig {
    fn default() -> Self {
        Self {
            syndrome_weight: 0.185,
            ymax: 1.625,
            noise_scale: 0.95,
            bits: 5,
            theta0: -0.525,
            threshold_sample: 2.0,
            noise_bias: 1.0,
            noise_buffer_len: 0,
            flip_rate_feedback: None,
        }
    }
}

impl NgdbfHwConfig {
    fn validate(&self) -> TannerResult<()> {
        if !(self.syndrome_weight > 0.0) {
            return Err(TannerError::config("syndrome_weight must be > 0"));
        }
        check_quantizer(self.ymax, self.bits)?;
        if self.bits < 2 {
            return Err(TannerError::config("packed width NQ must be at least 2"));
        }
        if !(self.noise_scale >= 0.0) {
            return Err(TannerError::config("noise_scale must be >= 0"));
        }
        if let Some(fb) = &self.flip_rate_feedback {
            if !(fb.target_flips >= 0.0) || !fb.gain.is_finite() || !fb.max_threshold.is_finite() {
                return Err(TannerError::config("invalid flip-rate feedback parameters"));
            }
        }
        Ok(())
    }

    /// Noise buffer length for a code of `num_symbols` symbols.
    pub fn buffer_len(&self, num_symbols: usize) -> TannerResult<usize> {
        let len = if self.noise_buffer_len == 0 {
            2 * num_symbols
        } else {
            self.noise_buffer_len
        };
        if len <= num_symbols {
            return Err(TannerError::config(format!(
                "noise buffer length {} must exceed the code length {}",
                len, num_symbols
            )));
        }
        Ok(len)
    }
}

/// DD-BMP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdBmpConfig {
    pub ymax: f64,
    pub bits: u32,
}

impl Default for DdBmpConfig {
    fn default() -> Self {
        Self { ymax: 2.25, bits: 3 }
    }
}

impl DdBmpConfig {
    fn validate(&self) -> TannerResult<()> {
        check_quantizer(self.ymax, self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DecoderConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.phases, 1);
        assert_eq!(config.algorithm.name(), "min-sum");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_gdbf_yaml() {
        let yaml = r#"
max_iterations: 300
phases: 4
algorithm:
  kind: gdbf
  theta: -0.7
  mode:
    kind: switching
    after: 10
  perturbation: gaussian
  smoothing_window: 8
"#;
        let config: DecoderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_iterations, 300);
        assert_eq!(config.phases, 4);
        match &config.algorithm {
            Algorithm::Gdbf(g) => {
                assert_eq!(g.theta, -0.7);
                assert_eq!(g.lambda, 0.991);
                assert_eq!(g.mode, GdbfMode::Switching { after: 10 });
                assert_eq!(g.perturbation, Perturbation::Gaussian);
                assert_eq!(g.front_end, FrontEnd::Saturate { ymax: 2.25 });
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(config.algorithm.is_stochastic());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_min_sum_correction() {
        let yaml = "algorithm:\n  kind: min-sum\n  correction:\n    kind: offset\n    delta: 0.15\n";
        let config: DecoderConfig = serde_yaml::from_str(yaml).unwrap();
        match config.algorithm {
            Algorithm::MinSum(ms) => {
                assert_eq!(ms.correction, Correction::Offset { delta: 0.15 });
                assert_eq!(ms.correction.apply(0.1), 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects() {
        let bad = DecoderConfig::new(Algorithm::Bp(BpConfig::default()), 0);
        assert!(bad.validate().is_err());
        assert!(DecoderConfig::default().with_phases(0).validate().is_err());

        let lambda = Algorithm::Gdbf(GdbfConfig {
            lambda: 1.5,
            ..GdbfConfig::default()
        });
        assert!(DecoderConfig::new(lambda, 50).validate().is_err());

        let window = Algorithm::Gdbf(GdbfConfig {
            smoothing_window: 51,
            ..GdbfConfig::default()
        });
        assert!(DecoderConfig::new(window, 50).validate().is_err());

        let alpha = Algorithm::MinSum(MinSumConfig {
            correction: Correction::Normalized { alpha: 0.0 },
            ..MinSumConfig::default()
        });
        assert!(DecoderConfig::new(alpha, 50).validate().is_err());

        let delta = Algorithm::MinSum(MinSumConfig {
            correction: Correction::Offset { delta: -0.1 },
            ..MinSumConfig::default()
        });
        assert!(DecoderConfig::new(delta, 50).validate().is_err());

        let bits = Algorithm::DdBmp(DdBmpConfig { ymax: 2.0, bits: 17 });
        assert!(DecoderConfig::new(bits, 50).validate().is_err());

        let ymax = Algorithm::NgdbfHw(NgdbfHwConfig {
            ymax: 0.0,
            ..NgdbfHwConfig::default()
        });
        assert!(DecoderConfig::new(ymax, 50).validate().is_err());
    }

    #[test]
    fn test_noise_buffer_len() {
        let cfg = NgdbfHwConfig::default();
        assert_eq!(cfg.buffer_len(100).unwrap(), 200);
        let short = NgdbfHwConfig {
            noise_buffer_len: 100,
            ..NgdbfHwConfig::default()
        };
        assert!(short.buffer_len(100).is_err());
        assert_eq!(short.buffer_len(99).unwrap(), 100);
    }

    #[test]
    fn test_parameters_are_stable() {
        let params = Algorithm::MinSum(MinSumConfig {
            correction: Correction::Normalized { alpha: 1.25 },
            front_end: FrontEnd::Raw,
        })
        .parameters();
        assert_eq!(
            params,
            vec![("correction", "normalized".to_string()), ("alpha", "1.25".to_string())]
        );
    }
}
