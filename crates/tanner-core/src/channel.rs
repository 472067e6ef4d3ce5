//! BPSK over AWGN, the channel used to produce decoder test vectors
//!
//! Bit 0 maps to +1 and bit 1 to -1. The SNR is Eb/N0 in dB for a code of
//! rate R, so
//!
//! ```text
//! N0 = 10^(-SNR/10) / R        sigma = sqrt(N0 / 2)        LLR(y) = 4y / N0
//! ```
//!
//! Noise comes from a [`NoiseSource`], an explicit uniform/Gaussian draw
//! interface implemented for every [`rand::Rng`]. Passing the source in
//! keeps the draw order visible to the caller, which is what makes a seeded
//! run reproducible.
//!
//! ## Example
//!
//! ```rust
//! use tanner_core::channel::AwgnChannel;
//! use rand::SeedableRng;
//!
//! let channel = AwgnChannel::new(3.0, 0.5).unwrap();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let samples = channel.transmit(&[false; 8], &mut rng);
//! assert_eq!(samples.len(), 8);
//! ```

use crate::error::{TannerError, TannerResult};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Source of the uniform and Gaussian draws consumed by channels and
/// noise-perturbed decoders.
pub trait NoiseSource {
    /// Uniform draw in [0, 1).
    fn uniform(&mut self) -> f64;
    /// Standard normal draw.
    fn gaussian(&mut self) -> f64;
}

impl<R: Rng> NoiseSource for R {
    fn uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn gaussian(&mut self) -> f64 {
        self.sample(StandardNormal)
    }
}

/// Bipolar image of a bit.
#[inline]
pub fn bpsk(bit: bool) -> f64 {
    if bit {
        -1.0
    } else {
        1.0
    }
}

/// Hard decision: positive samples are bit 0, everything else bit 1.
#[inline]
pub fn hard_decision(sample: f64) -> bool {
    !(sample > 0.0)
}

/// Hard decisions for a whole frame.
pub fn hard_decisions(samples: &[f64]) -> Vec<bool> {
    samples.iter().map(|&y| hard_decision(y)).collect()
}

/// Binary-input AWGN channel parameterised by Eb/N0 and code rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AwgnChannel {
    snr_db: f64,
    rate: f64,
    n0: f64,
    sigma: f64,
}

impl AwgnChannel {
    /// Channel for Eb/N0 `snr_db` and code rate `rate` in (0, 1].
    pub fn new(snr_db: f64, rate: f64) -> TannerResult<Self> {
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(TannerError::config(format!("code rate {} outside (0, 1]", rate)));
        }
        if !snr_db.is_finite() {
            return Err(TannerError::config("SNR must be finite"));
        }
        let n0 = 10f64.powf(-snr_db / 10.0) / rate;
        Ok(Self {
            snr_db,
            rate,
            n0,
            sigma: (n0 / 2.0).sqrt(),
        })
    }

    /// Eb/N0 in dB.
    pub fn snr_db(&self) -> f64 {
        self.snr_db
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Noise spectral density N0.
    pub fn n0(&self) -> f64 {
        self.n0
    }

    /// Noise standard deviation per real sample.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Channel LLR of a received sample.
    #[inline]
    pub fn llr(&self, sample: f64) -> f64 {
        4.0 * sample / self.n0
    }

    /// Modulate `codeword` and add Gaussian noise.
    pub fn transmit<N: NoiseSource + ?Sized>(&self, codeword: &[bool], noise: &mut N) -> Vec<f64> {
        let mut samples = vec![0.0; codeword.len()];
        self.transmit_into(codeword, &mut samples, noise);
        samples
    }

    /// In-place variant of [`transmit`](Self::transmit).
    pub fn transmit_into<N: NoiseSource + ?Sized>(&self, codeword: &[bool], samples: &mut [f64], noise: &mut N) {
        for (y, &bit) in samples.iter_mut().zip(codeword) {
            *y = bpsk(bit) + self.sigma * noise.gaussian();
        }
    }

    /// Transmit GF(2^m) symbols as `bits` BPSK samples each, MSB first.
    pub fn transmit_symbols<N: NoiseSource + ?Sized>(&self, symbols: &[u32], bits: u32, noise: &mut N) -> Vec<f64> {
        let mut samples = Vec::with_capacity(symbols.len() * bits as usize);
        for &symbol in symbols {
            for b in (0..bits).rev() {
                let bit = (symbol >> b) & 1 == 1;
                samples.push(bpsk(bit) + self.sigma * noise.gaussian());
            }
        }
        samples
    }

    /// Bit error probability of uncoded hard decisions, Q(1 / sigma).
    pub fn uncoded_ber(&self) -> f64 {
        0.5 * erfc(1.0 / (self.sigma * std::f64::consts::SQRT_2))
    }
}

/// Standard normal CDF.
pub(crate) fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x * std::f64::consts::FRAC_1_SQRT_2)
}

/// Complementary error function approximation.
fn erfc(x: f64) -> f64 {
    // Abramowitz & Stegun approximation 7.1.26
    let t = 1.0 / (1.0 + 0.3275911 * x.abs());
    let poly = t * (0.254829592 + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let result = poly * (-x * x).exp();
    if x >= 0.0 {
        result
    } else {
        2.0 - result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sigma_from_snr() {
        // 0 dB at rate 1/2: N0 = 2, sigma = 1
        let ch = AwgnChannel::new(0.0, 0.5).unwrap();
        assert_relative_eq!(ch.n0(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(ch.sigma(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(ch.llr(0.5), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_rate() {
        assert!(AwgnChannel::new(3.0, 0.0).is_err());
        assert!(AwgnChannel::new(3.0, 1.5).is_err());
        assert!(AwgnChannel::new(f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_bpsk_mapping() {
        assert_eq!(bpsk(false), 1.0);
        assert_eq!(bpsk(true), -1.0);
        assert!(!hard_decision(0.3));
        assert!(hard_decision(-0.3));
        assert!(hard_decision(0.0));
    }

    #[test]
    fn test_noise_statistics() {
        let ch = AwgnChannel::new(2.0, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let samples = ch.transmit(&vec![false; 20_000], &mut rng);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!((mean - 1.0).abs() < 0.02, "mean {}", mean);
        assert!((var.sqrt() - ch.sigma()).abs() < 0.02, "sigma {}", var.sqrt());
    }

    #[test]
    fn test_uncoded_errors_match_theory() {
        let ch = AwgnChannel::new(1.0, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let samples = ch.transmit(&vec![true; 50_000], &mut rng);
        let errors = hard_decisions(&samples).iter().filter(|&&d| !d).count();
        let measured = errors as f64 / samples.len() as f64;
        assert!((measured - ch.uncoded_ber()).abs() < 0.01, "{} vs {}", measured, ch.uncoded_ber());
    }

    #[test]
    fn test_transmit_symbols_msb_first() {
        let ch = AwgnChannel::new(200.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let samples = ch.transmit_symbols(&[0b10, 0b01], 2, &mut rng);
        let bits = hard_decisions(&samples);
        assert_eq!(bits, vec![true, false, false, true]);
    }

    #[test]
    fn test_normal_cdf() {
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-6);
        assert_relative_eq!(normal_cdf(1.96), 0.975, epsilon = 1e-3);
        assert_relative_eq!(normal_cdf(-1.96), 0.025, epsilon = 1e-3);
    }

    #[test]
    fn test_seeded_transmission_repeats() {
        let ch = AwgnChannel::new(4.0, 0.5).unwrap();
        let a = ch.transmit(&[false; 16], &mut StdRng::seed_from_u64(5));
        let b = ch.transmit(&[false; 16], &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }
}
