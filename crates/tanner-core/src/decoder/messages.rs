//! Per-edge message storage.
//!
//! Both directions are indexed by the graph's check-major edge id, so a
//! check walks a contiguous range and a symbol reaches its edges through
//! [`TannerGraph::symbol_edges`].

use crate::graph::TannerGraph;

/// Symbol-to-check and check-to-symbol messages, one of each per edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMessages<T> {
    to_check: Vec<T>,
    to_symbol: Vec<T>,
}

impl<T: Copy> EdgeMessages<T> {
    pub fn new(num_edges: usize, init: T) -> Self {
        Self {
            to_check: vec![init; num_edges],
            to_symbol: vec![init; num_edges],
        }
    }

    pub fn num_edges(&self) -> usize {
        self.to_check.len()
    }

    /// Reset every edge: symbol-to-check messages to `f(symbol)`,
    /// check-to-symbol messages to `to_symbol`.
    pub fn reset_from<F: Fn(usize) -> T>(&mut self, graph: &TannerGraph, f: F, to_symbol: T) {
        for (edge, m) in self.to_check.iter_mut().enumerate() {
            *m = f(graph.edge_symbol(edge));
        }
        self.to_symbol.fill(to_symbol);
    }

    #[inline]
    pub fn to_check(&self) -> &[T] {
        &self.to_check
    }

    #[inline]
    pub fn to_check_mut(&mut self) -> &mut [T] {
        &mut self.to_check
    }

    #[inline]
    pub fn to_symbol(&self) -> &[T] {
        &self.to_symbol
    }

    #[inline]
    pub fn to_symbol_mut(&mut self) -> &mut [T] {
        &mut self.to_symbol
    }

    /// Both directions at once, for updates that read one and write the other.
    #[inline]
    pub fn split_mut(&mut self) -> (&mut [T], &mut [T]) {
        (&mut self.to_check, &mut self.to_symbol)
    }
}

/// Probability-vector messages over GF(q), `q` values per edge and direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMessages {
    order: usize,
    to_check: Vec<f64>,
    to_symbol: Vec<f64>,
}

impl ProbabilityMessages {
    pub fn new(num_edges: usize, order: usize) -> Self {
        let uniform = 1.0 / order as f64;
        Self {
            order,
            to_check: vec![uniform; num_edges * order],
            to_symbol: vec![uniform; num_edges * order],
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    pub fn to_check(&self, edge: usize) -> &[f64] {
        &self.to_check[edge * self.order..(edge + 1) * self.order]
    }

    #[inline]
    pub fn to_check_mut(&mut self, edge: usize) -> &mut [f64] {
        &mut self.to_check[edge * self.order..(edge + 1) * self.order]
    }

    #[inline]
    pub fn to_symbol(&self, edge: usize) -> &[f64] {
        &self.to_symbol[edge * self.order..(edge + 1) * self.order]
    }

    #[inline]
    pub fn to_symbol_mut(&mut self, edge: usize) -> &mut [f64] {
        &mut self.to_symbol[edge * self.order..(edge + 1) * self.order]
    }

    /// Set every check-to-symbol vector to uniform.
    pub fn clear_to_symbol(&mut self) {
        self.to_symbol.fill(1.0 / self.order as f64);
    }
}

/// Scale `p` to sum to one; a vector with no mass becomes uniform.
pub(crate) fn normalize(p: &mut [f64]) {
    let sum: f64 = p.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        p.iter_mut().for_each(|v| *v /= sum);
    } else {
        let uniform = 1.0 / p.len() as f64;
        p.fill(uniform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reset_from_symbol_values() {
        let graph = TannerGraph::hamming_7_4();
        let mut messages = EdgeMessages::new(graph.num_edges(), 0.0);
        let samples = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        messages.reset_from(&graph, |s| samples[s], -1.0);
        for edge in 0..graph.num_edges() {
            assert_eq!(messages.to_check()[edge], samples[graph.edge_symbol(edge)]);
            assert_eq!(messages.to_symbol()[edge], -1.0);
        }
    }

    #[test]
    fn test_probability_slices() {
        let mut messages = ProbabilityMessages::new(3, 4);
        assert_eq!(messages.to_check(2).len(), 4);
        messages.to_check_mut(1).copy_from_slice(&[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(messages.to_check(1)[0], 1.0);
        assert_relative_eq!(messages.to_check(0)[3], 0.25);
    }

    #[test]
    fn test_normalize() {
        let mut p = [2.0, 6.0];
        normalize(&mut p);
        assert_relative_eq!(p[0], 0.25);
        let mut zero = [0.0; 4];
        normalize(&mut zero);
        assert_relative_eq!(zero[2], 0.25);
    }
}
