//! q-ary sum-product decoding over GF(2^m).
//!
//! Messages are probability vectors over the field. A check enforces
//! `sum_j h_j x_j = 0`; with `z_j = h_j x_j` the distribution of a sum of
//! independent field elements is an XOR-convolution, which the Walsh-Hadamard
//! transform turns into a pointwise product:
//!
//! ```text
//! P(z_j = u) = IWHT( prod_{k != j} WHT(p_{z_k}) )[u]
//! r_(c->j)(a) = P(z_j = h_j a)
//! ```
//!
//! Symbols multiply the channel prior with all incoming vectors except the
//! recipient's.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tanner_core::channel::AwgnChannel;
//! use tanner_core::decoder::NonBinaryDecoder;
//! use tanner_core::graph::TannerGraph;
//!
//! // one GF(4) check: x0 + 2 x1 = 0
//! let graph = TannerGraph::from_adjacency(
//!     4,
//!     &[vec![(0, 1)], vec![(0, 2)]],
//!     &[vec![(0, 1), (1, 2)]],
//! )
//! .unwrap();
//! let channel = AwgnChannel::new(6.0, 0.5).unwrap();
//! let mut decoder = NonBinaryDecoder::new(Arc::new(graph), 10, &channel).unwrap();
//! assert!(decoder.is_codeword(&[2, 1]));
//!
//! // symbols 2 and 1, two bits each, MSB first
//! let outcome = decoder.decode(&[-1.0, 1.0, 1.0, -1.0]).unwrap();
//! assert_eq!(outcome.symbols, vec![2, 1]);
//! assert!(outcome.satisfied);
//! ```

use super::messages::{normalize, ProbabilityMessages};
use crate::channel::{bpsk, AwgnChannel};
use crate::error::{TannerError, TannerResult};
use crate::gf::GaloisField;
use crate::graph::TannerGraph;
use std::sync::Arc;

/// Result of decoding one frame of GF(q) symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolOutcome {
    pub symbols: Vec<u32>,
    pub iterations: usize,
    pub satisfied: bool,
}

/// In-place fast Walsh-Hadamard transform; `v.len()` is a power of two.
fn wht(v: &mut [f64]) {
    let mut h = 1;
    while h < v.len() {
        for start in (0..v.len()).step_by(2 * h) {
            for j in start..start + h {
                let (a, b) = (v[j], v[j + h]);
                v[j] = a + b;
                v[j + h] = a - b;
            }
        }
        h *= 2;
    }
}

#[derive(Debug)]
pub struct NonBinaryDecoder {
    graph: Arc<TannerGraph>,
    field: GaloisField,
    sigma: f64,
    max_iterations: usize,
    /// Channel prior, q values per symbol.
    prior: Vec<f64>,
    messages: ProbabilityMessages,
    symbols: Vec<u32>,
    /// Transformed inputs of one check, q values per edge.
    spectra: Vec<f64>,
    /// Prefix products of `spectra`, one extra row for the empty product.
    prefix: Vec<f64>,
    scratch: Vec<f64>,
    suffix: Vec<f64>,
}

impl NonBinaryDecoder {
    /// Decoder for the field given by `graph.field_order()`.
    pub fn new(graph: Arc<TannerGraph>, max_iterations: usize, channel: &AwgnChannel) -> TannerResult<Self> {
        if max_iterations == 0 {
            return Err(TannerError::config("iteration budget must be at least 1"));
        }
        let field = GaloisField::new(graph.field_order())?;
        let q = field.order() as usize;
        let dc = graph.max_check_degree();

        tracing::debug!(
            field_order = q,
            symbols = graph.num_symbols(),
            checks = graph.num_checks(),
            max_iterations,
            "non-binary decoder ready"
        );

        Ok(Self {
            field,
            sigma: channel.sigma(),
            max_iterations,
            prior: vec![0.0; graph.num_symbols() * q],
            messages: ProbabilityMessages::new(graph.num_edges(), q),
            symbols: vec![0; graph.num_symbols()],
            spectra: vec![0.0; dc * q],
            prefix: vec![0.0; (dc + 1) * q],
            scratch: vec![0.0; q],
            suffix: vec![0.0; q],
            graph,
        })
    }

    pub fn field(&self) -> &GaloisField {
        &self.field
    }

    /// Symbol-level syndrome `H x` over GF(q); zero entries are satisfied.
    pub fn syndrome(&self, symbols: &[u32]) -> Vec<u32> {
        (0..self.graph.num_checks())
            .map(|check| {
                self.graph.check_edges(check).fold(0, |acc, e| {
                    let x = symbols[self.graph.edge_symbol(e)];
                    self.field.add(acc, self.field.mul(self.graph.edge_coefficient(e), x))
                })
            })
            .collect()
    }

    pub fn is_codeword(&self, symbols: &[u32]) -> bool {
        self.syndrome(symbols).iter().all(|&s| s == 0)
    }

    /// Decode `m` BPSK samples per symbol, MSB first.
    pub fn decode(&mut self, samples: &[f64]) -> TannerResult<SymbolOutcome> {
        let bits = self.field.bits() as usize;
        TannerError::check_len(self.graph.num_symbols() * bits, samples.len())?;

        self.load_prior(samples);
        self.messages.clear_to_symbol();
        let q = self.field.order() as usize;
        for e in 0..self.graph.num_edges() {
            let s = self.graph.edge_symbol(e);
            self.messages
                .to_check_mut(e)
                .copy_from_slice(&self.prior[s * q..(s + 1) * q]);
        }
        for s in 0..self.graph.num_symbols() {
            self.symbols[s] = argmax(&self.prior[s * q..(s + 1) * q]);
        }

        let mut iterations = self.max_iterations;
        let mut satisfied = false;
        for it in 0..self.max_iterations {
            if self.is_codeword(&self.symbols) {
                satisfied = true;
                iterations = it;
                break;
            }
            self.check_update();
            self.symbol_update();
        }
        if !satisfied {
            satisfied = self.is_codeword(&self.symbols);
        }

        tracing::debug!(iterations, satisfied, "non-binary frame decoded");
        Ok(SymbolOutcome {
            symbols: self.symbols.clone(),
            iterations,
            satisfied,
        })
    }

    fn load_prior(&mut self, samples: &[f64]) {
        let bits = self.field.bits();
        let q = self.field.order() as usize;
        let inv_var = 1.0 / (self.sigma * self.sigma);
        for (s, chunk) in samples.chunks(bits as usize).enumerate() {
            let prior = &mut self.prior[s * q..(s + 1) * q];
            for (a, p) in prior.iter_mut().enumerate() {
                *p = chunk
                    .iter()
                    .enumerate()
                    .map(|(b, &y)| {
                        let bit = (a >> (bits as usize - 1 - b)) & 1 == 1;
                        bpsk(bit) * y * inv_var
                    })
                    .sum();
            }
            let max = prior.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prior.iter_mut().for_each(|p| *p = (*p - max).exp());
            normalize(prior);
        }
    }

    fn check_update(&mut self) {
        let graph = &*self.graph;
        let q = self.field.order() as usize;
        for check in 0..graph.num_checks() {
            let edges = graph.check_edges(check);
            let degree = edges.len();

            for (j, e) in edges.clone().enumerate() {
                let h = graph.edge_coefficient(e);
                let spectrum = &mut self.spectra[j * q..(j + 1) * q];
                for (a, &p) in self.messages.to_check(e).iter().enumerate() {
                    spectrum[self.field.mul(h, a as u32) as usize] = p;
                }
                wht(spectrum);
            }

            self.prefix[..q].fill(1.0);
            for j in 0..degree {
                for a in 0..q {
                    self.prefix[(j + 1) * q + a] = self.prefix[j * q + a] * self.spectra[j * q + a];
                }
            }

            self.suffix.fill(1.0);
            for (j, e) in edges.enumerate().rev() {
                for a in 0..q {
                    self.scratch[a] = self.prefix[j * q + a] * self.suffix[a];
                    self.suffix[a] *= self.spectra[j * q + a];
                }
                // inverse transform up to the 1/q factor removed by normalize
                wht(&mut self.scratch);

                let h = graph.edge_coefficient(e);
                let out = self.messages.to_symbol_mut(e);
                for (a, r) in out.iter_mut().enumerate() {
                    *r = self.scratch[self.field.mul(h, a as u32) as usize].max(0.0);
                }
                normalize(out);
            }
        }
    }

    fn symbol_update(&mut self) {
        let graph = &*self.graph;
        let q = self.field.order() as usize;
        for symbol in 0..graph.num_symbols() {
            let prior = &self.prior[symbol * q..(symbol + 1) * q];
            let edges = graph.symbol_edges(symbol);

            for &e in edges {
                self.scratch.copy_from_slice(prior);
                for &other in edges.iter().filter(|&&other| other != e) {
                    for (p, &r) in self.scratch.iter_mut().zip(self.messages.to_symbol(other)) {
                        *p *= r;
                    }
                }
                normalize(&mut self.scratch);
                self.messages.to_check_mut(e).copy_from_slice(&self.scratch);
            }

            self.scratch.copy_from_slice(prior);
            for &e in edges {
                for (p, &r) in self.scratch.iter_mut().zip(self.messages.to_symbol(e)) {
                    *p *= r;
                }
            }
            self.symbols[symbol] = argmax(&self.scratch);
        }
    }
}

/// Index of the largest value; the first wins ties.
fn argmax(p: &[f64]) -> u32 {
    let mut best = 0;
    for (a, &v) in p.iter().enumerate() {
        if v > p[best] {
            best = a;
        }
    }
    best as u32
}

#[cfg(test)]
mod tests {
    use super::super::test_support::HAMMING_CODEWORD;
    use super::*;
    use approx::assert_relative_eq;

    fn gf4_pair() -> TannerGraph {
        TannerGraph::from_adjacency(4, &[vec![(0, 1)], vec![(0, 2)]], &[vec![(0, 1), (1, 2)]]).unwrap()
    }

    /// x0 + 2 x1 = 0 and x1 + 3 x2 = 0 over GF(4).
    fn gf4_chain() -> TannerGraph {
        TannerGraph::from_adjacency(
            4,
            &[vec![(0, 1)], vec![(0, 2), (1, 1)], vec![(1, 3)]],
            &[vec![(0, 1), (1, 2)], vec![(1, 1), (2, 3)]],
        )
        .unwrap()
    }

    #[test]
    fn test_wht_round_trip() {
        let original = [0.1, 0.2, 0.3, 0.4];
        let mut v = original;
        wht(&mut v);
        assert_relative_eq!(v[0], 1.0);
        wht(&mut v);
        for (a, b) in v.iter().zip(&original) {
            assert_relative_eq!(a / 4.0, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_symbol_syndrome() {
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let decoder = NonBinaryDecoder::new(Arc::new(gf4_pair()), 5, &channel).unwrap();
        assert_eq!(decoder.syndrome(&[2, 1]), vec![0]);
        assert_eq!(decoder.syndrome(&[1, 1]), vec![3]);
        assert!(decoder.is_codeword(&[0, 0]));
        assert!(!decoder.is_codeword(&[0, 1]));
    }

    #[test]
    fn test_prior_favours_received_symbol() {
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let mut decoder = NonBinaryDecoder::new(Arc::new(gf4_pair()), 5, &channel).unwrap();
        decoder.load_prior(&[-1.0, 1.0, 1.0, -1.0]);
        assert_eq!(argmax(&decoder.prior[0..4]), 2);
        assert_eq!(argmax(&decoder.prior[4..8]), 1);
        assert_relative_eq!(decoder.prior[0..4].iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_noiseless_codeword_at_iteration_zero() {
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let mut decoder = NonBinaryDecoder::new(Arc::new(gf4_pair()), 5, &channel).unwrap();
        let outcome = decoder.decode(&[-1.0, 1.0, 1.0, -1.0]).unwrap();
        assert_eq!(outcome.symbols, vec![2, 1]);
        assert_eq!(outcome.iterations, 0);
        assert!(outcome.satisfied);
    }

    #[test]
    fn test_check_message_follows_constraint() {
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let mut decoder = NonBinaryDecoder::new(Arc::new(gf4_pair()), 5, &channel).unwrap();
        decoder.load_prior(&[-1.0, 1.0, 1.0, -1.0]);
        for e in 0..2 {
            let s = decoder.graph.edge_symbol(e);
            let prior = decoder.prior[s * 4..(s + 1) * 4].to_vec();
            decoder.messages.to_check_mut(e).copy_from_slice(&prior);
        }
        decoder.check_update();

        // to x0: P(x0 = a) = P(2 x1 = a), so the mass of x1 = 1 lands on a = 2
        let field = GaloisField::new(4).unwrap();
        let to_x0 = decoder.messages.to_symbol(0).to_vec();
        for a in 0..4u32 {
            let x1 = field.div(a, 2).unwrap();
            assert_relative_eq!(to_x0[a as usize], decoder.prior[4 + x1 as usize], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_weak_symbol_recovered() {
        // sigma = 0.8 at rate 0.5
        let snr_db = -10.0 * (2.0 * 0.5 * 0.64f64).log10();
        let channel = AwgnChannel::new(snr_db, 0.5).unwrap();
        assert_relative_eq!(channel.sigma(), 0.8, epsilon = 1e-9);
        let mut decoder = NonBinaryDecoder::new(Arc::new(gf4_chain()), 10, &channel).unwrap();

        // x2 alone would be read as 2
        let samples = [1.0, 1.0, 1.0, 1.0, -0.3, 0.5];
        let outcome = decoder.decode(&samples).unwrap();
        assert_eq!(outcome.symbols, vec![0, 0, 0]);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.satisfied);
    }

    #[test]
    fn test_binary_field_matches_parity_checks() {
        let graph = Arc::new(TannerGraph::hamming_7_4());
        let channel = AwgnChannel::new(3.0, graph.rate()).unwrap();
        let mut decoder = NonBinaryDecoder::new(graph, 20, &channel).unwrap();
        let codeword: Vec<u32> = HAMMING_CODEWORD.iter().map(|&b| b as u32).collect();
        let mut samples: Vec<f64> = HAMMING_CODEWORD.iter().map(|&b| bpsk(b)).collect();
        samples[2] = 0.4;
        let outcome = decoder.decode(&samples).unwrap();
        assert!(outcome.satisfied);
        assert_eq!(outcome.symbols, codeword);
    }

    #[test]
    fn test_rejects_wrong_sample_count() {
        let channel = AwgnChannel::new(3.0, 0.5).unwrap();
        let mut decoder = NonBinaryDecoder::new(Arc::new(gf4_pair()), 5, &channel).unwrap();
        assert!(matches!(
            decoder.decode(&[1.0; 3]),
            Err(TannerError::LengthMismatch { expected: 4, actual: 3 })
        ));
    }
}
