//! GF(2^m) arithmetic for non-binary parity checks
//!
//! Elements are integers `0..q` whose bits are polynomial coefficients over
//! GF(2). Addition is XOR; multiplication goes through log/antilog tables
//! generated from a primitive polynomial for each supported degree.

use crate::error::{TannerError, TannerResult};

/// Primitive polynomials indexed by degree m (bit i = coefficient of x^i).
const PRIMITIVE_POLYNOMIALS: [u32; 9] = [
    0,
    0b11,
    0b111,
    0b1011,
    0b1_0011,
    0b10_0101,
    0b100_0011,
    0b1000_1001,
    0b1_0001_1101,
];

/// Finite field of order q = 2^m, 1 <= m <= 8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaloisField {
    order: u32,
    bits: u32,
    exp: Vec<u32>,
    log: Vec<u32>,
}

impl GaloisField {
    /// Build the field of the given order.
    pub fn new(order: u32) -> TannerResult<Self> {
        if !(2..=256).contains(&order) || !order.is_power_of_two() {
            return Err(TannerError::UnsupportedField(order));
        }
        let bits = order.trailing_zeros();
        let poly = PRIMITIVE_POLYNOMIALS[bits as usize];
        let cycle = (order - 1) as usize;

        let mut exp = vec![0u32; cycle];
        let mut log = vec![0u32; order as usize];
        let mut x = 1u32;
        for (i, slot) in exp.iter_mut().enumerate() {
            *slot = x;
            log[x as usize] = i as u32;
            x <<= 1;
            if x & order != 0 {
                x ^= poly;
            }
        }

        Ok(Self { order, bits, exp, log })
    }

    /// Field order q.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Bits per element, m.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    #[inline]
    pub fn add(&self, a: u32, b: u32) -> u32 {
        a ^ b
    }

    #[inline]
    pub fn mul(&self, a: u32, b: u32) -> u32 {
        if a == 0 || b == 0 {
            return 0;
        }
        let cycle = self.order - 1;
        let idx = (self.log[a as usize] + self.log[b as usize]) % cycle;
        self.exp[idx as usize]
    }

    /// Multiplicative inverse; `None` for zero.
    pub fn inv(&self, a: u32) -> Option<u32> {
        if a == 0 || a >= self.order {
            return None;
        }
        let cycle = self.order - 1;
        let idx = (cycle - self.log[a as usize]) % cycle;
        Some(self.exp[idx as usize])
    }

    /// `a / b`; `None` when `b` is zero.
    pub fn div(&self, a: u32, b: u32) -> Option<u32> {
        self.inv(b).map(|ib| self.mul(a, ib))
    }
}
