//! Tanner Graph: sparse bipartite structure of a parity-check matrix
//!
//! Symbol nodes (columns of H) connect to check nodes (rows of H). The graph
//! owns contiguous, offset-indexed edge arrays in the style of CSR storage:
//!
//! ```text
//! edges are numbered check-major:   check 0 -> e0 e1 e2 | check 1 -> e3 e4 e5 | ...
//! symbols index into that numbering: symbol 0 -> [e0, e3] | symbol 1 -> [e1, e4] | ...
//! ```
//!
//! Each edge id addresses one slot in every per-edge message array, so the
//! check-node side walks a contiguous range while the symbol-node side follows
//! a precomputed edge table. The reverse position of a node inside its
//! neighbour's adjacency list is therefore an O(1) lookup rather than a scan.
//!
//! ## Example
//!
//! ```rust
//! use tanner_core::graph::TannerGraph;
//!
//! let graph = TannerGraph::hamming_7_4();
//! assert_eq!(graph.num_symbols(), 7);
//! assert_eq!(graph.num_checks(), 3);
//!
//! let codeword = [true, false, true, true, false, false, true];
//! assert!(graph.is_codeword(&codeword));
//! assert_eq!(graph.syndrome(&[true; 7]), vec![false, false, false]);
//! ```

use crate::error::{TannerError, TannerResult};
use rand::Rng;
use std::collections::HashMap;
use std::ops::Range;

/// Number of fresh attempts made by [`TannerGraph::regular`].
const REGULAR_ATTEMPTS: usize = 32;

/// Immutable Tanner graph with O(1) reverse-edge lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TannerGraph {
    num_symbols: usize,
    num_checks: usize,
    /// Field order q (2 for binary codes).
    field_order: u32,
    /// Declared maximum symbol (column) degree.
    max_symbol_degree: usize,
    /// Declared maximum check (row) degree.
    max_check_degree: usize,
    /// Start of each check's edge range; length M + 1.
    check_offsets: Vec<usize>,
    edge_symbol: Vec<usize>,
    edge_check: Vec<usize>,
    edge_coefficient: Vec<u32>,
    /// Start of each symbol's slot range; length N + 1.
    symbol_offsets: Vec<usize>,
    /// Symbol-major slot -> check-major edge id.
    symbol_edges: Vec<usize>,
    /// Check-major edge id -> position within its symbol's adjacency list.
    edge_symbol_position: Vec<usize>,
}

impl TannerGraph {
    /// Build a graph from per-symbol and per-check adjacency lists.
    ///
    /// Each list entry is `(neighbour, coefficient)` with 0-based indices.
    /// Binary graphs use `field_order == 2` and coefficient 1 on every edge.
    /// The order of both lists is preserved, which keeps alist output stable.
    pub fn from_adjacency(
        field_order: u32,
        symbol_lists: &[Vec<(usize, u32)>],
        check_lists: &[Vec<(usize, u32)>],
    ) -> TannerResult<Self> {
        let num_symbols = symbol_lists.len();
        let num_checks = check_lists.len();

        let mut check_offsets = Vec::with_capacity(num_checks + 1);
        let mut edge_symbol = Vec::new();
        let mut edge_check = Vec::new();
        let mut edge_coefficient = Vec::new();
        let mut lookup: HashMap<(usize, usize), usize> = HashMap::new();

        check_offsets.push(0);
        for (check, list) in check_lists.iter().enumerate() {
            for &(symbol, coefficient) in list {
                if symbol >= num_symbols {
                    return Err(TannerError::Inconsistent(format!(
                        "check {} references symbol {} but N = {}",
                        check + 1,
                        symbol + 1,
                        num_symbols
                    )));
                }
                validate_coefficient(field_order, coefficient)?;
                let edge = edge_symbol.len();
                if lookup.insert((symbol, check), edge).is_some() {
                    return Err(TannerError::Inconsistent(format!(
                        "duplicate edge between symbol {} and check {}",
                        symbol + 1,
                        check + 1
                    )));
                }
                edge_symbol.push(symbol);
                edge_check.push(check);
                edge_coefficient.push(coefficient);
            }
            check_offsets.push(edge_symbol.len());
        }

        let num_edges = edge_symbol.len();
        let mut symbol_offsets = Vec::with_capacity(num_symbols + 1);
        let mut symbol_edges = Vec::with_capacity(num_edges);
        let mut edge_symbol_position = vec![usize::MAX; num_edges];

        symbol_offsets.push(0);
        for (symbol, list) in symbol_lists.iter().enumerate() {
            for (position, &(check, coefficient)) in list.iter().enumerate() {
                if check >= num_checks {
                    return Err(TannerError::Inconsistent(format!(
                        "symbol {} references check {} but M = {}",
                        symbol + 1,
                        check + 1,
                        num_checks
                    )));
                }
                let edge = *lookup.get(&(symbol, check)).ok_or_else(|| {
                    TannerError::Inconsistent(format!(
                        "edge ({}, {}) listed by the symbol but not by the check",
                        symbol + 1,
                        check + 1
                    ))
                })?;
                if edge_symbol_position[edge] != usize::MAX {
                    return Err(TannerError::Inconsistent(format!(
                        "duplicate edge between symbol {} and check {}",
                        symbol + 1,
                        check + 1
                    )));
                }
                if edge_coefficient[edge] != coefficient {
                    return Err(TannerError::Inconsistent(format!(
                        "edge ({}, {}) has coefficient {} in the symbol list but {} in the check list",
                        symbol + 1,
                        check + 1,
                        coefficient,
                        edge_coefficient[edge]
                    )));
                }
                edge_symbol_position[edge] = position;
                symbol_edges.push(edge);
            }
            symbol_offsets.push(symbol_edges.len());
        }

        if let Some(edge) = edge_symbol_position.iter().position(|&p| p == usize::MAX) {
            return Err(TannerError::Inconsistent(format!(
                "edge ({}, {}) listed by the check but not by the symbol",
                edge_symbol[edge] + 1,
                edge_check[edge] + 1
            )));
        }

        let max_symbol_degree = symbol_lists.iter().map(Vec::len).max().unwrap_or(0);
        let max_check_degree = check_lists.iter().map(Vec::len).max().unwrap_or(0);

        Ok(Self {
            num_symbols,
            num_checks,
            field_order,
            max_symbol_degree,
            max_check_degree,
            check_offsets,
            edge_symbol,
            edge_check,
            edge_coefficient,
            symbol_offsets,
            symbol_edges,
            edge_symbol_position,
        })
    }

    /// Create from a dense binary matrix (row-major, `checks x symbols`).
    pub fn from_dense(matrix: &[Vec<u8>]) -> TannerResult<Self> {
        let num_symbols = matrix.first().map_or(0, Vec::len);
        let mut symbol_lists = vec![Vec::new(); num_symbols];
        let mut check_lists = vec![Vec::new(); matrix.len()];

        for (r, row) in matrix.iter().enumerate() {
            TannerError::check_len(num_symbols, row.len())?;
            for (c, &val) in row.iter().enumerate() {
                if val != 0 {
                    check_lists[r].push((c, 1));
                    symbol_lists[c].push((r, 1));
                }
            }
        }

        Self::from_adjacency(2, &symbol_lists, &check_lists)
    }

    /// (7,4) Hamming code parity-check matrix.
    pub fn hamming_7_4() -> Self {
        // H = [1 1 1 0 1 0 0]
        //     [1 1 0 1 0 1 0]
        //     [1 0 1 1 0 0 1]
        Self {
            num_symbols: 7,
            num_checks: 3,
            field_order: 2,
            max_symbol_degree: 3,
            max_check_degree: 4,
            check_offsets: vec![0, 4, 8, 12],
            edge_symbol: vec![0, 1, 2, 4, 0, 1, 3, 5, 0, 2, 3, 6],
            edge_check: vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2],
            edge_coefficient: vec![1; 12],
            symbol_offsets: vec![0, 3, 5, 7, 9, 10, 11, 12],
            symbol_edges: vec![0, 4, 8, 1, 5, 2, 9, 6, 10, 3, 7, 11],
            edge_symbol_position: vec![0, 0, 0, 0, 1, 1, 0, 0, 2, 1, 1, 0],
        }
    }

    /// Random regular code with symbol degree `dv` and check degree `dc`.
    ///
    /// Edges are placed one symbol at a time. Each new edge goes to a check
    /// with the most free sockets among those that close no 4-cycle; when no
    /// such check exists the 4-cycle constraint is dropped for that edge.
    pub fn regular<R: Rng + ?Sized>(
        num_symbols: usize,
        dv: usize,
        dc: usize,
        rng: &mut R,
    ) -> TannerResult<Self> {
        if dv == 0 || dc < 2 || num_symbols == 0 || (num_symbols * dv) % dc != 0 {
            return Err(TannerError::Inconsistent(format!(
                "no ({}, {}) regular graph with N = {}",
                dv, dc, num_symbols
            )));
        }
        let num_checks = num_symbols * dv / dc;
        if dv > num_checks {
            return Err(TannerError::Inconsistent(format!(
                "symbol degree {} exceeds M = {}",
                dv, num_checks
            )));
        }

        for _ in 0..REGULAR_ATTEMPTS {
            if let Some((symbol_lists, check_lists)) = place_regular_edges(num_symbols, num_checks, dv, dc, rng) {
                return Self::from_adjacency(2, &symbol_lists, &check_lists);
            }
        }
        Err(TannerError::Inconsistent(format!(
            "failed to place a ({}, {}) regular graph with N = {}",
            dv, dc, num_symbols
        )))
    }

    pub(crate) fn with_declared_degrees(mut self, max_symbol: usize, max_check: usize) -> TannerResult<Self> {
        if max_symbol < self.max_symbol_degree || max_check < self.max_check_degree {
            return Err(TannerError::Inconsistent(format!(
                "declared maximum degrees ({}, {}) below actual ({}, {})",
                max_symbol, max_check, self.max_symbol_degree, self.max_check_degree
            )));
        }
        self.max_symbol_degree = max_symbol;
        self.max_check_degree = max_check;
        Ok(self)
    }

    /// Number of symbol nodes (codeword length N).
    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    /// Number of check nodes M.
    pub fn num_checks(&self) -> usize {
        self.num_checks
    }

    pub fn num_edges(&self) -> usize {
        self.edge_symbol.len()
    }

    /// Field order q; 2 for binary graphs.
    pub fn field_order(&self) -> u32 {
        self.field_order
    }

    pub fn is_binary(&self) -> bool {
        self.field_order == 2
    }

    pub fn max_symbol_degree(&self) -> usize {
        self.max_symbol_degree
    }

    pub fn max_check_degree(&self) -> usize {
        self.max_check_degree
    }

    /// Design rate (N - M) / N.
    pub fn rate(&self) -> f64 {
        if self.num_symbols == 0 {
            return 0.0;
        }
        (self.num_symbols.saturating_sub(self.num_checks)) as f64 / self.num_symbols as f64
    }

    /// Edge ids of a check, contiguous.
    #[inline]
    pub fn check_edges(&self, check: usize) -> Range<usize> {
        self.check_offsets[check]..self.check_offsets[check + 1]
    }

    /// Symbols adjacent to a check, in file order.
    #[inline]
    pub fn check_symbols(&self, check: usize) -> &[usize] {
        &self.edge_symbol[self.check_edges(check)]
    }

    pub fn check_degree(&self, check: usize) -> usize {
        self.check_offsets[check + 1] - self.check_offsets[check]
    }

    /// Edge ids of a symbol, in file order.
    #[inline]
    pub fn symbol_edges(&self, symbol: usize) -> &[usize] {
        &self.symbol_edges[self.symbol_offsets[symbol]..self.symbol_offsets[symbol + 1]]
    }

    pub fn symbol_degree(&self, symbol: usize) -> usize {
        self.symbol_offsets[symbol + 1] - self.symbol_offsets[symbol]
    }

    /// Checks adjacent to a symbol, in file order.
    pub fn symbol_checks(&self, symbol: usize) -> impl Iterator<Item = usize> + '_ {
        self.symbol_edges(symbol).iter().map(move |&e| self.edge_check[e])
    }

    #[inline]
    pub fn edge_symbol(&self, edge: usize) -> usize {
        self.edge_symbol[edge]
    }

    #[inline]
    pub fn edge_check(&self, edge: usize) -> usize {
        self.edge_check[edge]
    }

    /// GF(q) coefficient carried by an edge (1 for binary graphs).
    #[inline]
    pub fn edge_coefficient(&self, edge: usize) -> u32 {
        self.edge_coefficient[edge]
    }

    /// Position of the edge's check within the symbol's adjacency list.
    #[inline]
    pub fn position_in_symbol(&self, edge: usize) -> usize {
        self.edge_symbol_position[edge]
    }

    /// Position of the edge's symbol within the check's adjacency list.
    #[inline]
    pub fn position_in_check(&self, edge: usize) -> usize {
        edge - self.check_offsets[self.edge_check[edge]]
    }

    /// Write the binary syndrome of `decisions` into `syndrome`.
    ///
    /// `true` marks an unsatisfied check. Returns whether every check is
    /// satisfied.
    pub fn syndrome_into(&self, decisions: &[bool], syndrome: &mut [bool]) -> bool {
        let mut satisfied = true;
        for (check, bit) in syndrome.iter_mut().enumerate().take(self.num_checks) {
            let parity = self
                .check_symbols(check)
                .iter()
                .fold(false, |acc, &s| acc ^ decisions[s]);
            *bit = parity;
            satisfied &= !parity;
        }
        satisfied
    }

    /// Binary syndrome H * d (mod 2).
    pub fn syndrome(&self, decisions: &[bool]) -> Vec<bool> {
        let mut syndrome = vec![false; self.num_checks];
        self.syndrome_into(decisions, &mut syndrome);
        syndrome
    }

    /// All checks satisfied.
    pub fn is_codeword(&self, decisions: &[bool]) -> bool {
        (0..self.num_checks).all(|check| {
            !self
                .check_symbols(check)
                .iter()
                .fold(false, |acc, &s| acc ^ decisions[s])
        })
    }

    /// Per-symbol adjacency as `(check, coefficient)` pairs, 0-based.
    pub fn symbol_lists(&self) -> Vec<Vec<(usize, u32)>> {
        (0..self.num_symbols)
            .map(|s| {
                self.symbol_edges(s)
                    .iter()
                    .map(|&e| (self.edge_check[e], self.edge_coefficient[e]))
                    .collect()
            })
            .collect()
    }

    /// Per-check adjacency as `(symbol, coefficient)` pairs, 0-based.
    pub fn check_lists(&self) -> Vec<Vec<(usize, u32)>> {
        (0..self.num_checks)
            .map(|c| {
                self.check_edges(c)
                    .map(|e| (self.edge_symbol[e], self.edge_coefficient[e]))
                    .collect()
            })
            .collect()
    }
}

fn validate_coefficient(field_order: u32, coefficient: u32) -> TannerResult<()> {
    if coefficient == 0 || coefficient >= field_order.max(2) {
        return Err(TannerError::Inconsistent(format!(
            "coefficient {} outside GF({})",
            coefficient, field_order
        )));
    }
    Ok(())
}

type AdjacencyPair = (Vec<Vec<(usize, u32)>>, Vec<Vec<(usize, u32)>>);

fn place_regular_edges<R: Rng + ?Sized>(
    num_symbols: usize,
    num_checks: usize,
    dv: usize,
    dc: usize,
    rng: &mut R,
) -> Option<AdjacencyPair> {
    let mut check_members: Vec<Vec<usize>> = vec![Vec::with_capacity(dc); num_checks];
    let mut symbol_checks: Vec<Vec<usize>> = vec![Vec::with_capacity(dv); num_symbols];
    let mut near = vec![false; num_symbols];
    let mut candidates = Vec::with_capacity(num_checks);

    for symbol in 0..num_symbols {
        for _ in 0..dv {
            for &c in &symbol_checks[symbol] {
                for &t in &check_members[c] {
                    near[t] = true;
                }
            }

            let open = |c: usize| check_members[c].len() < dc && !check_members[c].contains(&symbol);
            let mut best_free = 0;
            candidates.clear();
            for c in (0..num_checks).filter(|&c| open(c)) {
                if check_members[c].iter().any(|&t| near[t]) {
                    continue;
                }
                let free = dc - check_members[c].len();
                if free > best_free {
                    best_free = free;
                    candidates.clear();
                }
                if free == best_free {
                    candidates.push(c);
                }
            }
            if candidates.is_empty() {
                for c in (0..num_checks).filter(|&c| open(c)) {
                    let free = dc - check_members[c].len();
                    if free > best_free {
                        best_free = free;
                        candidates.clear();
                    }
                    if free == best_free {
                        candidates.push(c);
                    }
                }
            }

            for &c in &symbol_checks[symbol] {
                for &t in &check_members[c] {
                    near[t] = false;
                }
            }

            if candidates.is_empty() {
                return None;
            }
            let check = candidates[rng.gen_range(0..candidates.len())];
            check_members[check].push(symbol);
            symbol_checks[symbol].push(check);
        }
    }

    let symbol_lists = symbol_checks
        .into_iter()
        .map(|l| l.into_iter().map(|c| (c, 1)).collect())
        .collect();
    let check_lists = check_members
        .into_iter()
        .map(|l| l.into_iter().map(|s| (s, 1)).collect())
        .collect();
    Some((symbol_lists, check_lists))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn all_codewords(graph: &TannerGraph) -> Vec<Vec<bool>> {
        let n = graph.num_symbols();
        (0u32..(1 << n))
            .map(|bits| (0..n).map(|i| (bits >> i) & 1 == 1).collect::<Vec<_>>())
            .filter(|word| graph.is_codeword(word))
            .collect()
    }

    #[test]
    fn test_hamming_7_4_dimensions() {
        let graph = TannerGraph::hamming_7_4();
        assert_eq!(graph.num_symbols(), 7);
        assert_eq!(graph.num_checks(), 3);
        assert_eq!(graph.num_edges(), 12);
        assert_eq!(graph.max_symbol_degree(), 3);
        assert_eq!(graph.max_check_degree(), 4);
        assert!((graph.rate() - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_hamming_matches_dense_construction() {
        let dense = TannerGraph::from_dense(&[
            vec![1, 1, 1, 0, 1, 0, 0],
            vec![1, 1, 0, 1, 0, 1, 0],
            vec![1, 0, 1, 1, 0, 0, 1],
        ])
        .unwrap();
        assert_eq!(dense, TannerGraph::hamming_7_4());
    }

    #[test]
    fn test_hamming_has_sixteen_codewords() {
        let graph = TannerGraph::hamming_7_4();
        assert_eq!(all_codewords(&graph).len(), 16);
    }

    #[test]
    fn test_syndrome_is_parity_of_neighbours() {
        let graph = TannerGraph::hamming_7_4();
        let word = [true, false, false, true, true, false, true];
        let syndrome = graph.syndrome(&word);
        for check in 0..graph.num_checks() {
            let ones = graph.check_symbols(check).iter().filter(|&&s| word[s]).count();
            assert_eq!(syndrome[check], ones % 2 == 1);
        }
        let mut buf = vec![false; 3];
        let satisfied = graph.syndrome_into(&word, &mut buf);
        assert_eq!(satisfied, syndrome.iter().all(|&s| !s));
        assert_eq!(satisfied, graph.is_codeword(&word));
    }

    #[test]
    fn test_reverse_positions() {
        let graph = TannerGraph::hamming_7_4();
        for symbol in 0..graph.num_symbols() {
            for (pos, &edge) in graph.symbol_edges(symbol).iter().enumerate() {
                assert_eq!(graph.edge_symbol(edge), symbol);
                assert_eq!(graph.position_in_symbol(edge), pos);
                let check = graph.edge_check(edge);
                let in_check = graph.position_in_check(edge);
                assert_eq!(graph.check_symbols(check)[in_check], symbol);
            }
        }
    }

    #[test]
    fn test_from_adjacency_rejects_one_sided_edge() {
        let symbols = vec![vec![(0, 1)], vec![(0, 1)]];
        let checks = vec![vec![(0, 1)]];
        let err = TannerGraph::from_adjacency(2, &symbols, &checks).unwrap_err();
        assert!(matches!(err, TannerError::Inconsistent(_)));

        let symbols = vec![vec![(0, 1)], vec![]];
        let checks = vec![vec![(0, 1), (1, 1)]];
        assert!(TannerGraph::from_adjacency(2, &symbols, &checks).is_err());
    }

    #[test]
    fn test_from_adjacency_rejects_duplicates_and_range() {
        let symbols = vec![vec![(0, 1), (0, 1)]];
        let checks = vec![vec![(0, 1), (0, 1)]];
        assert!(TannerGraph::from_adjacency(2, &symbols, &checks).is_err());

        let symbols = vec![vec![(3, 1)]];
        let checks = vec![vec![(0, 1)]];
        assert!(TannerGraph::from_adjacency(2, &symbols, &checks).is_err());
    }

    #[test]
    fn test_coefficient_mismatch_rejected() {
        let symbols = vec![vec![(0, 2)], vec![(0, 1)]];
        let checks = vec![vec![(0, 3), (1, 1)]];
        assert!(TannerGraph::from_adjacency(4, &symbols, &checks).is_err());
        let checks = vec![vec![(0, 2), (1, 1)]];
        assert!(TannerGraph::from_adjacency(4, &symbols, &checks).is_ok());
        let checks = vec![vec![(0, 4), (1, 1)]];
        let symbols = vec![vec![(0, 4)], vec![(0, 1)]];
        assert!(TannerGraph::from_adjacency(4, &symbols, &checks).is_err());
    }

    #[test]
    fn test_regular_construction_degrees() {
        let mut rng = StdRng::seed_from_u64(7);
        let graph = TannerGraph::regular(96, 3, 6, &mut rng).unwrap();
        assert_eq!(graph.num_symbols(), 96);
        assert_eq!(graph.num_checks(), 48);
        assert_eq!(graph.num_edges(), 288);
        assert!((0..96).all(|s| graph.symbol_degree(s) == 3));
        assert!((0..48).all(|c| graph.check_degree(c) == 6));
        assert!(graph.is_codeword(&vec![false; 96]));
    }

    #[test]
    fn test_regular_is_seed_deterministic() {
        let a = TannerGraph::regular(60, 3, 6, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = TannerGraph::regular(60, 3, 6, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_regular_rejects_impossible_degrees() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(TannerGraph::regular(10, 3, 4, &mut rng).is_err());
        assert!(TannerGraph::regular(4, 3, 6, &mut rng).is_err());
    }
}
