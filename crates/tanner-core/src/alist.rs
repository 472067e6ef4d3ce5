//! alist reader and writer
//!
//! The alist format describes a sparse parity-check matrix line by line:
//!
//! ```text
//! N M [q]                     symbols, checks, field order (non-binary only)
//! dv_max dc_max               largest symbol and check degree
//! w_1 ... w_N                 symbol (column) weights
//! w_1 ... w_M                 check (row) weights
//! N lines of check indices    1-based, zero padded to dv_max
//! M lines of symbol indices   1-based, zero padded to dc_max
//! ```
//!
//! Non-binary files replace every index with an `index coefficient` pair and
//! pad with `0 0`. Every count is checked against the lists it describes;
//! anything that does not add up is a [`TannerError::Parse`].
//!
//! ## Example
//!
//! ```rust
//! use tanner_core::alist;
//!
//! let text = "3 2\n2 2\n1 2 1\n2 2\n1 0\n1 2\n2 0\n1 2\n2 3\n";
//! let graph = alist::parse(text).unwrap();
//! assert_eq!(graph.num_symbols(), 3);
//! assert_eq!(alist::to_alist(&graph), text);
//! ```

use crate::error::{TannerError, TannerResult};
use crate::gf::GaloisField;
use crate::graph::TannerGraph;
use std::fmt::Write as _;
use std::path::Path;

/// Load and parse an alist file.
pub fn load(path: impl AsRef<Path>) -> TannerResult<TannerGraph> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let graph = parse(&text)?;
    tracing::debug!(
        path = %path.as_ref().display(),
        symbols = graph.num_symbols(),
        checks = graph.num_checks(),
        edges = graph.num_edges(),
        q = graph.field_order(),
        "loaded Tanner graph"
    );
    Ok(graph)
}

/// Write a graph as an alist file.
pub fn save(graph: &TannerGraph, path: impl AsRef<Path>) -> TannerResult<()> {
    std::fs::write(path, to_alist(graph))?;
    Ok(())
}

/// Parse alist text into a graph.
pub fn parse(text: &str) -> TannerResult<TannerGraph> {
    let mut lines = Lines::new(text);

    let (line, header) = lines.next_numbers()?;
    let (num_symbols, num_checks, field_order) = match header.as_slice() {
        [n, m] => (*n, *m, None),
        [n, m, q] => (*n, *m, Some(*q)),
        _ => {
            return Err(TannerError::parse(
                line,
                format!("expected `N M` or `N M q`, found {} values", header.len()),
            ))
        }
    };
    if num_symbols == 0 || num_checks == 0 {
        return Err(TannerError::parse(line, "N and M must be positive"));
    }
    let q = match field_order {
        Some(q) => {
            let q = u32::try_from(q).map_err(|_| TannerError::parse(line, "field order too large"))?;
            GaloisField::new(q)?;
            q
        }
        None => 2,
    };
    let paired = field_order.is_some();

    let (line, maxima) = lines.next_numbers()?;
    let [max_symbol, max_check] = maxima[..] else {
        return Err(TannerError::parse(line, "expected two maximum degrees"));
    };

    let symbol_weights = lines.next_vector(num_symbols, "symbol weights")?;
    let check_weights = lines.next_vector(num_checks, "check weights")?;
    check_weights_bounded(&symbol_weights, max_symbol, lines.line, "symbol")?;
    check_weights_bounded(&check_weights, max_check, lines.line, "check")?;

    let symbol_total: usize = symbol_weights.iter().sum();
    let check_total: usize = check_weights.iter().sum();
    if symbol_total != check_total {
        return Err(TannerError::parse(
            lines.line,
            format!(
                "symbol weights sum to {} but check weights sum to {}",
                symbol_total, check_total
            ),
        ));
    }

    let mut symbol_lists = Vec::with_capacity(num_symbols);
    for &weight in &symbol_weights {
        symbol_lists.push(lines.next_neighbours(weight, max_symbol, num_checks, paired)?);
    }
    let mut check_lists = Vec::with_capacity(num_checks);
    for &weight in &check_weights {
        check_lists.push(lines.next_neighbours(weight, max_check, num_symbols, paired)?);
    }

    if let Some((line, _)) = lines.peek_content() {
        return Err(TannerError::parse(line, "unexpected content after check lists"));
    }

    TannerGraph::from_adjacency(q, &symbol_lists, &check_lists)?
        .with_declared_degrees(max_symbol, max_check)
}

/// Render a graph in canonical alist form.
///
/// Values are separated by single spaces and every neighbour line is padded
/// with zeros to the declared maximum degree.
pub fn to_alist(graph: &TannerGraph) -> String {
    let mut out = String::new();
    let paired = !graph.is_binary();

    if paired {
        let _ = writeln!(out, "{} {} {}", graph.num_symbols(), graph.num_checks(), graph.field_order());
    } else {
        let _ = writeln!(out, "{} {}", graph.num_symbols(), graph.num_checks());
    }
    let _ = writeln!(out, "{} {}", graph.max_symbol_degree(), graph.max_check_degree());

    let symbol_lists = graph.symbol_lists();
    let check_lists = graph.check_lists();
    push_joined(&mut out, symbol_lists.iter().map(Vec::len));
    push_joined(&mut out, check_lists.iter().map(Vec::len));

    for list in &symbol_lists {
        push_neighbours(&mut out, list, graph.max_symbol_degree(), paired);
    }
    for list in &check_lists {
        push_neighbours(&mut out, list, graph.max_check_degree(), paired);
    }
    out
}

fn push_joined(out: &mut String, values: impl Iterator<Item = usize>) {
    let parts: Vec<String> = values.map(|v| v.to_string()).collect();
    out.push_str(&parts.join(" "));
    out.push('\n');
}

fn push_neighbours(out: &mut String, list: &[(usize, u32)], width: usize, paired: bool) {
    let mut parts = Vec::with_capacity(width * 2);
    for &(index, coefficient) in list {
        parts.push((index + 1).to_string());
        if paired {
            parts.push(coefficient.to_string());
        }
    }
    for _ in list.len()..width {
        parts.push("0".to_string());
        if paired {
            parts.push("0".to_string());
        }
    }
    out.push_str(&parts.join(" "));
    out.push('\n');
}

fn check_weights_bounded(weights: &[usize], max: usize, line: usize, what: &str) -> TannerResult<()> {
    match weights.iter().position(|&w| w > max) {
        Some(i) => Err(TannerError::parse(
            line,
            format!("{} {} has weight {} above declared maximum {}", what, i + 1, weights[i], max),
        )),
        None => Ok(()),
    }
}

/// Non-blank line cursor that remembers line numbers for diagnostics.
struct Lines<'a> {
    inner: std::iter::Peekable<std::iter::Enumerate<std::str::Lines<'a>>>,
    line: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate().peekable(),
            line: 0,
        }
    }

    fn peek_content(&mut self) -> Option<(usize, &'a str)> {
        while let Some(&(idx, raw)) = self.inner.peek() {
            if raw.trim().is_empty() {
                self.inner.next();
            } else {
                return Some((idx + 1, raw));
            }
        }
        None
    }

    fn next_numbers(&mut self) -> TannerResult<(usize, Vec<usize>)> {
        let (line, raw) = self
            .peek_content()
            .ok_or_else(|| TannerError::parse(self.line + 1, "unexpected end of file"))?;
        self.inner.next();
        self.line = line;
        let values = raw
            .split_whitespace()
            .map(|tok| {
                tok.parse::<usize>()
                    .map_err(|_| TannerError::parse(line, format!("`{}` is not a non-negative integer", tok)))
            })
            .collect::<TannerResult<Vec<_>>>()?;
        Ok((line, values))
    }

    fn next_vector(&mut self, len: usize, what: &str) -> TannerResult<Vec<usize>> {
        let (line, values) = self.next_numbers()?;
        if values.len() != len {
            return Err(TannerError::parse(
                line,
                format!("expected {} {}, found {}", len, what, values.len()),
            ));
        }
        Ok(values)
    }

    fn next_neighbours(
        &mut self,
        weight: usize,
        max: usize,
        bound: usize,
        paired: bool,
    ) -> TannerResult<Vec<(usize, u32)>> {
        let (line, values) = self.next_numbers()?;
        let stride = if paired { 2 } else { 1 };
        if values.len() % stride != 0 {
            return Err(TannerError::parse(line, "index without a coefficient"));
        }
        let entries: Vec<(usize, usize)> = values
            .chunks(stride)
            .map(|c| (c[0], if paired { c[1] } else { 1 }))
            .collect();
        if entries.len() < weight || entries.len() > max.max(weight) {
            return Err(TannerError::parse(
                line,
                format!("expected {} to {} entries, found {}", weight, max, entries.len()),
            ));
        }

        let mut list = Vec::with_capacity(weight);
        for (pos, &(index, coefficient)) in entries.iter().enumerate() {
            if pos < weight {
                if index == 0 || index > bound {
                    return Err(TannerError::parse(
                        line,
                        format!("index {} outside 1..={}", index, bound),
                    ));
                }
                let coefficient = u32::try_from(coefficient)
                    .map_err(|_| TannerError::parse(line, "coefficient too large"))?;
                list.push((index - 1, coefficient));
            } else if index != 0 || (paired && coefficient != 0) {
                return Err(TannerError::parse(
                    line,
                    format!("{} neighbours listed but weight is {}", pos + 1, weight),
                ));
            }
        }
        Ok(list)
    }
}
