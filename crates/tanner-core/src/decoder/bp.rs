//! Sum-product belief propagation in the LLR domain.
//!
//! ```text
//! L(c->v) = 2 * atanh( prod_{v' in N(c)\v} tanh(L(v'->c) / 2) )
//! L(v->c) = L_ch(v) + sum_{c' in N(v)\c} L(c'->v)
//! ```

use super::messages::EdgeMessages;
use super::{decide, NodeRules};
use crate::channel::{hard_decision, AwgnChannel, NoiseSource};
use crate::config::BpConfig;
use crate::graph::TannerGraph;

/// Products of tanh values are kept strictly inside (-1, 1).
const TANH_LIMIT: f64 = 1.0 - 1e-15;

#[derive(Debug)]
pub(crate) struct BeliefPropagation {
    channel: AwgnChannel,
    max_llr: f64,
    llr: Vec<f64>,
    messages: EdgeMessages<f64>,
    /// Scratch for tanh values and the prefix products of one check.
    tanh: Vec<f64>,
    prefix: Vec<f64>,
}

impl BeliefPropagation {
    pub(crate) fn new(graph: &TannerGraph, config: &BpConfig, channel: &AwgnChannel) -> Self {
        Self {
            channel: *channel,
            max_llr: config.max_llr,
            llr: vec![0.0; graph.num_symbols()],
            messages: EdgeMessages::new(graph.num_edges(), 0.0),
            tanh: Vec::with_capacity(graph.max_check_degree()),
            prefix: Vec::with_capacity(graph.max_check_degree() + 1),
        }
    }

    fn clip(&self, llr: f64) -> f64 {
        llr.clamp(-self.max_llr, self.max_llr)
    }
}

impl NodeRules for BeliefPropagation {
    fn reset(&mut self, graph: &TannerGraph, samples: &[f64], decisions: &mut [bool], _noise: &mut dyn NoiseSource) {
        for ((llr, d), &y) in self.llr.iter_mut().zip(decisions.iter_mut()).zip(samples) {
            *llr = self.channel.llr(y).clamp(-self.max_llr, self.max_llr);
            *d = hard_decision(*llr);
        }
        let llr = &self.llr;
        self.messages.reset_from(graph, |s| llr[s], 0.0);
    }

    fn check_update(&mut self, graph: &TannerGraph, decisions: &[bool], syndrome: &mut [bool]) -> bool {
        let satisfied = graph.syndrome_into(decisions, syndrome);
        if satisfied {
            return true;
        }

        let (to_check, to_symbol) = self.messages.split_mut();
        for check in 0..graph.num_checks() {
            let edges = graph.check_edges(check);
            let start = edges.start;

            self.tanh.clear();
            self.tanh.extend(to_check[edges.clone()].iter().map(|m| (0.5 * m).tanh()));

            // prefix[k] = product of tanh[0..k]
            self.prefix.clear();
            self.prefix.push(1.0);
            for k in 0..self.tanh.len() {
                let p = self.prefix[k] * self.tanh[k];
                self.prefix.push(p);
            }

            let mut suffix = 1.0;
            for k in (0..self.tanh.len()).rev() {
                let product = (self.prefix[k] * suffix).clamp(-TANH_LIMIT, TANH_LIMIT);
                to_symbol[start + k] = 2.0 * product.atanh();
                suffix *= self.tanh[k];
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
        let mut anomalies = 0;
        for symbol in 0..graph.num_symbols() {
            let edges = graph.symbol_edges(symbol);
            let total = self.llr[symbol] + edges.iter().map(|&e| self.messages.to_symbol()[e]).sum::<f64>();
            decisions[symbol] = decide(total, symbol, &mut anomalies);
            for &e in edges {
                let extrinsic = self.clip(total - self.messages.to_symbol()[e]);
                self.messages.to_check_mut()[e] = extrinsic;
            }
        }
        anomalies
    }
}
