//! Min-sum with normalized and offset corrections.
//!
//! Works on the conditioned channel samples directly; the check output
//! magnitude is the smallest extrinsic magnitude (the second smallest for
//! the edge that supplied the minimum) and its sign the product of the
//! extrinsic signs.

use super::messages::EdgeMessages;
use super::{decide, sign, NodeRules};
use crate::channel::{hard_decision, NoiseSource};
use crate::config::{Correction, MinSumConfig};
use crate::error::TannerResult;
use crate::graph::TannerGraph;
use crate::quantize::Conditioner;

#[derive(Debug)]
pub(crate) struct MinSum {
    correction: Correction,
    conditioner: Conditioner,
    y: Vec<f64>,
    messages: EdgeMessages<f64>,
}

impl MinSum {
    pub(crate) fn new(graph: &TannerGraph, config: &MinSumConfig) -> TannerResult<Self> {
        Ok(Self {
            correction: config.correction,
            conditioner: config.front_end.conditioner()?,
            y: vec![0.0; graph.num_symbols()],
            messages: EdgeMessages::new(graph.num_edges(), 0.0),
        })
    }
}

impl NodeRules for MinSum {
    fn reset(&mut self, graph: &TannerGraph, samples: &[f64], decisions: &mut [bool], _noise: &mut dyn NoiseSource) {
        self.conditioner.apply_into(samples, &mut self.y);
        for (d, &y) in decisions.iter_mut().zip(&self.y) {
            *d = hard_decision(y);
        }
        let y = &self.y;
        self.messages.reset_from(graph, |s| y[s], 0.0);
    }

    fn check_update(&mut self, graph: &TannerGraph, decisions: &[bool], syndrome: &mut [bool]) -> bool {
        if graph.syndrome_into(decisions, syndrome) {
            return true;
        }

        let (to_check, to_symbol) = self.messages.split_mut();
        for check in 0..graph.num_checks() {
            let edges = graph.check_edges(check);

            let mut sign_product = 1.0;
            let mut min1 = f64::MAX;
            let mut min2 = f64::MAX;
            let mut min_edge = edges.start;
            for e in edges.clone() {
                let m = to_check[e];
                sign_product *= sign(m);
                let mag = m.abs();
                if mag <= min1 {
                    min2 = min1;
                    min1 = mag;
                    min_edge = e;
                } else if mag < min2 {
                    min2 = mag;
                }
            }

            for e in edges {
                let magnitude = if e == min_edge { min2 } else { min1 };
                // sign(m) is ±1, so multiplying removes it from the product
                to_symbol[e] = sign_product * sign(to_check[e]) * self.correction.apply(magnitude);
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
        let (to_check, to_symbol) = self.messages.split_mut();
        for symbol in 0..graph.num_symbols() {
            let edges = graph.symbol_edges(symbol);
            let total = self.y[symbol] + edges.iter().map(|&e| to_symbol[e]).sum::<f64>();
            decisions[symbol] = decide(total, symbol, &mut anomalies);
            for &e in edges {
                to_check[e] = total - to_symbol[e];
            }
        }
        anomalies
    }
}
