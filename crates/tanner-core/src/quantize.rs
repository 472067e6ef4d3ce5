//! Fixed-point conditioning of channel samples
//!
//! [`Quantizer`] is a mid-riser uniform quantizer with Nq = 2^Q levels over
//! [-Ymax, Ymax]. Zero is a decision boundary, never a level, so every
//! quantized sample keeps a sign:
//!
//! ```text
//! Q = 2, Ymax = 3:   -3   -1 | +1   +3        unit = Ymax / (Nq - 1) = 1
//!                   idx -3 -1 | +1 +3
//! ```
//!
//! Levels are addressed by odd integer indices ±1, ±3, ..., ±(Nq - 1) so that
//! level = index × unit. [`SignMagnitude`] packs those indices into the
//! sign-magnitude words used by the hardware-oriented NGDBF decoder and
//! unpacks them back exactly.
//!
//! ## Example
//!
//! ```rust
//! use tanner_core::quantize::Quantizer;
//!
//! let q = Quantizer::new(2.25, 3).unwrap();
//! assert_eq!(q.levels(), 8);
//! assert!(q.quantize(1e-9) > 0.0);
//! assert_eq!(q.quantize(100.0), 2.25);
//! ```

use crate::error::{TannerError, TannerResult};
use serde::{Deserialize, Serialize};

/// Largest supported quantizer width in bits.
pub const MAX_BITS: u32 = 16;

/// Clip `x` to [-ymax, ymax], keeping its sign.
#[inline]
pub fn saturate(x: f64, ymax: f64) -> f64 {
    if x.abs() > ymax {
        x * (ymax / x.abs())
    } else {
        x
    }
}

/// Number of non-finite channel samples, each logged as a warning.
pub fn count_non_finite(samples: &[f64]) -> usize {
    let mut count = 0;
    for (symbol, &x) in samples.iter().enumerate() {
        if !x.is_finite() {
            tracing::warn!(symbol, sample = x, "non-finite channel sample");
            count += 1;
        }
    }
    count
}

/// Mid-riser uniform quantizer with 2^Q levels in [-Ymax, Ymax].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    ymax: f64,
    bits: u32,
    /// Nq / 2, the number of magnitude levels.
    half: i32,
    /// Smallest level magnitude Ymax / (Nq - 1).
    unit: f64,
}

impl Quantizer {
    pub fn new(ymax: f64, bits: u32) -> TannerResult<Self> {
        if !(ymax > 0.0 && ymax.is_finite()) {
            return Err(TannerError::config(format!("Ymax must be positive, got {}", ymax)));
        }
        if bits == 0 || bits > MAX_BITS {
            return Err(TannerError::config(format!(
                "quantizer width {} outside 1..={}",
                bits, MAX_BITS
            )));
        }
        let levels = 1u32 << bits;
        Ok(Self {
            ymax,
            bits,
            half: (levels / 2) as i32,
            unit: ymax / (levels - 1) as f64,
        })
    }

    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Level count Nq = 2^Q.
    pub fn levels(&self) -> u32 {
        (self.half as u32) * 2
    }

    /// Smallest nonzero level magnitude.
    pub fn unit(&self) -> f64 {
        self.unit
    }

    /// Odd level index of `x`, in ±1..=±(Nq - 1).
    ///
    /// Magnitudes below one unit land on ±1 instead of zero. Non-negative
    /// inputs (including zero) map to positive indices. NaN maps to +1.
    #[inline]
    pub fn index(&self, x: f64) -> i32 {
        if x.is_nan() {
            return 1;
        }
        let mag = x.abs().min(self.ymax);
        let k = ((mag / (2.0 * self.unit)).floor() as i32).clamp(0, self.half - 1);
        let odd = 2 * k + 1;
        if x < 0.0 {
            -odd
        } else {
            odd
        }
    }

    /// Reconstruction value of a level index.
    #[inline]
    pub fn value(&self, index: i32) -> f64 {
        index as f64 * self.unit
    }

    #[inline]
    pub fn quantize(&self, x: f64) -> f64 {
        self.value(self.index(x))
    }

    pub fn quantize_slice(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.quantize(x)).collect()
    }
}

/// Sign-magnitude word codec for odd level indices.
///
/// A `bits`-wide word holds the magnitude k of index ±(2k + 1) in its low
/// `bits - 1` bits and the sign in the top bit. Decoding restores the odd
/// index, which needs one more bit than the packed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignMagnitude {
    bits: u32,
}

impl SignMagnitude {
    pub fn new(bits: u32) -> TannerResult<Self> {
        if !(2..=31).contains(&bits) {
            return Err(TannerError::config(format!("packed width {} outside 2..=31", bits)));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    fn sign_bit(&self) -> u32 {
        1 << (self.bits - 1)
    }

    /// Largest storable magnitude k.
    pub fn max_magnitude(&self) -> u32 {
        self.sign_bit() - 1
    }

    /// Pack an odd index; magnitudes beyond the word saturate.
    pub fn encode(&self, index: i32) -> u32 {
        let k = ((index.unsigned_abs().max(1) - 1) / 2).min(self.max_magnitude());
        if index < 0 {
            k | self.sign_bit()
        } else {
            k
        }
    }

    /// Unpack a word into its odd index ±(2k + 1).
    pub fn decode(&self, word: u32) -> i32 {
        let value = (2 * (word & self.max_magnitude()) + 1) as i32;
        if word & self.sign_bit() != 0 {
            -value
        } else {
            value
        }
    }
}

/// How received samples are conditioned before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FrontEnd {
    /// Samples pass through untouched.
    Raw,
    /// Magnitudes are clipped to `ymax`.
    Saturate { ymax: f64 },
    /// Clipped to `ymax` and quantized to 2^`bits` levels.
    Quantize { ymax: f64, bits: u32 },
}

impl Default for FrontEnd {
    fn default() -> Self {
        FrontEnd::Raw
    }
}

impl FrontEnd {
    pub fn validate(&self) -> TannerResult<()> {
        self.conditioner().map(|_| ())
    }

    /// Build the per-sample conditioner.
    pub fn conditioner(&self) -> TannerResult<Conditioner> {
        match *self {
            FrontEnd::Raw => Ok(Conditioner::Raw),
            FrontEnd::Saturate { ymax } => {
                if !(ymax > 0.0 && ymax.is_finite()) {
                    return Err(TannerError::config(format!("Ymax must be positive, got {}", ymax)));
                }
                Ok(Conditioner::Saturate(ymax))
            }
            FrontEnd::Quantize { ymax, bits } => Ok(Conditioner::Quantize(Quantizer::new(ymax, bits)?)),
        }
    }
}

/// Validated form of [`FrontEnd`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conditioner {
    Raw,
    Saturate(f64),
    Quantize(Quantizer),
}

impl Conditioner {
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Conditioner::Raw => x,
            Conditioner::Saturate(ymax) => saturate(x, *ymax),
            Conditioner::Quantize(q) => q.quantize(x),
        }
    }

    pub fn apply_into(&self, samples: &[f64], out: &mut [f64]) {
        for (o, &x) in out.iter_mut().zip(samples) {
            *o = self.apply(x);
        }
    }
}
