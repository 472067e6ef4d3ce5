//! Decision-driven binary message passing.
//!
//! Messages are bipolar signs. Each symbol keeps one memory per edge that
//! integrates the extrinsic sum every iteration:
//!
//! ```text
//! m_(i,c) += y_i + sum_{c' in N(i)} r_(c'->i) - r_(c->i)
//! q_(i->c)  = sgn(m_(i,c))
//! d_i       = sgn(sgn(y_i) + sum_c q_(i->c))
//! ```
//!
//! so a decision follows the accumulated memory rather than the
//! instantaneous energy.

use super::messages::EdgeMessages;
use super::NodeRules;
use crate::channel::{hard_decision, NoiseSource};
use crate::config::DdBmpConfig;
use crate::error::TannerResult;
use crate::graph::TannerGraph;
use crate::quantize::Quantizer;

#[inline]
fn bipolar(x: f64) -> i8 {
    if x >= 0.0 {
        1
    } else {
        -1
    }
}

#[derive(Debug)]
pub(crate) struct DdBmp {
    quantizer: Quantizer,
    y: Vec<f64>,
    messages: EdgeMessages<i8>,
    /// Per-edge integrator, indexed like the messages.
    memory: Vec<f64>,
}

impl DdBmp {
    pub(crate) fn new(graph: &TannerGraph, config: &DdBmpConfig) -> TannerResult<Self> {
        Ok(Self {
            quantizer: Quantizer::new(config.ymax, config.bits)?,
            y: vec![0.0; graph.num_symbols()],
            messages: EdgeMessages::new(graph.num_edges(), 1),
            memory: vec![0.0; graph.num_edges()],
        })
    }
}

impl NodeRules for DdBmp {
    fn reset(&mut self, graph: &TannerGraph, samples: &[f64], decisions: &mut [bool], _noise: &mut dyn NoiseSource) {
        for ((y, d), &sample) in self.y.iter_mut().zip(decisions.iter_mut()).zip(samples) {
            *y = self.quantizer.quantize(sample);
            *d = hard_decision(*y);
        }
        let y = &self.y;
        self.messages.reset_from(graph, |s| bipolar(y[s]), 0);
        for (edge, m) in self.memory.iter_mut().enumerate() {
            *m = y[graph.edge_symbol(edge)];
        }
    }

    fn check_update(&mut self, graph: &TannerGraph, decisions: &[bool], syndrome: &mut [bool]) -> bool {
        if graph.syndrome_into(decisions, syndrome) {
            return true;
        }

        let (to_check, to_symbol) = self.messages.split_mut();
        for check in 0..graph.num_checks() {
            let edges = graph.check_edges(check);
            let product: i8 = to_check[edges.clone()].iter().product();
            for e in edges {
                to_symbol[e] = product * to_check[e];
            }
        }
        false
    }

    fn symbol_update(
        &mut self,
        graph: &TannerGraph,
        _syndrome: &[bool],
        decisions: &mut [bool],
        _iteration: usize,
        _noise: &mut dyn NoiseSource,
    ) -> usize {
        let (to_check, to_symbol) = self.messages.split_mut();
        for symbol in 0..graph.num_symbols() {
            let edges = graph.symbol_edges(symbol);
            let y = self.y[symbol];
            let sum = y + edges.iter().map(|&e| f64::from(to_symbol[e])).sum::<f64>();

            let mut vote = i32::from(bipolar(y));
            for &e in edges {
                self.memory[e] += sum - f64::from(to_symbol[e]);
                to_check[e] = bipolar(self.memory[e]);
                vote += i32::from(to_check[e]);
            }
            decisions[symbol] = vote <= 0;
        }
        0
    }
}
