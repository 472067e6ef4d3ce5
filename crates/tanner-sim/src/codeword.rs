//! Codeword source for the frame loop.
//!
//! Either the all-zero word or a text file with one codeword per line,
//! written as `0`/`1` characters. Characters past the code length are
//! ignored. The file is read once and replayed from the top when it runs out.

use crate::error::{SimError, SimResult};
use std::path::Path;
use tanner_core::TannerGraph;

#[derive(Debug, Clone)]
pub enum CodewordSource {
    AllZero(Vec<bool>),
    Replay {
        words: Vec<Vec<bool>>,
        /// File line of each word
        lines: Vec<usize>,
        next: usize,
    },
}

impl CodewordSource {
    pub fn all_zero(length: usize) -> Self {
        CodewordSource::AllZero(vec![false; length])
    }

    pub fn load(path: &Path, length: usize) -> SimResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SimError::file(path, e))?;
        let source = Self::parse(&text, length)?;
        tracing::info!(path = %path.display(), words = source.len(), "loaded codewords");
        Ok(source)
    }

    pub fn parse(text: &str, length: usize) -> SimResult<Self> {
        let mut words = Vec::new();
        let mut lines = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if line.len() < length {
                return Err(SimError::Codeword {
                    line: line_no,
                    message: format!("{} symbols, expected {}", line.len(), length),
                });
            }
            let word = line
                .bytes()
                .take(length)
                .enumerate()
                .map(|(i, c)| match c {
                    b'0' => Ok(false),
                    b'1' => Ok(true),
                    other => Err(SimError::Codeword {
                        line: line_no,
                        message: format!("invalid symbol {:?} at index {}", other as char, i),
                    }),
                })
                .collect::<SimResult<Vec<bool>>>()?;
            words.push(word);
            lines.push(line_no);
        }
        if words.is_empty() {
            return Err(SimError::Codeword {
                line: 0,
                message: "no codewords".into(),
            });
        }
        Ok(CodewordSource::Replay { words, lines, next: 0 })
    }

    /// Reject words that violate a parity check of `graph`.
    pub fn check(&self, graph: &TannerGraph) -> SimResult<()> {
        if let CodewordSource::Replay { words, lines, .. } = self {
            for (word, &line) in words.iter().zip(lines) {
                if !graph.is_codeword(word) {
                    let unsatisfied = graph.syndrome(word).iter().filter(|&&s| s).count();
                    return Err(SimError::Codeword {
                        line,
                        message: format!("not a codeword, {} unsatisfied checks", unsatisfied),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of distinct codewords.
    pub fn len(&self) -> usize {
        match self {
            CodewordSource::AllZero(_) => 1,
            CodewordSource::Replay { words, .. } => words.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Codeword for the next frame.
    pub fn next_word(&mut self) -> &[bool] {
        match self {
            CodewordSource::AllZero(word) => word,
            CodewordSource::Replay { words, next, .. } => {
                let idx = *next;
                *next = (idx + 1) % words.len();
                &words[idx]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero() {
        let mut source = CodewordSource::all_zero(4);
        assert_eq!(source.next_word(), &[false; 4]);
        assert_eq!(source.next_word(), &[false; 4]);
    }

    #[test]
    fn test_replay_cycles() {
        let mut source = CodewordSource::parse("1011\n0110\n", 4).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.next_word(), &[true, false, true, true]);
        assert_eq!(source.next_word(), &[false, true, true, false]);
        assert_eq!(source.next_word(), &[true, false, true, true]);
    }

    #[test]
    fn test_extra_characters_ignored() {
        let mut source = CodewordSource::parse("10110\n", 4).unwrap();
        assert_eq!(source.next_word(), &[true, false, true, true]);
    }

    #[test]
    fn test_rejects_invalid_symbol() {
        let err = CodewordSource::parse("1011\n01x0\n", 4).unwrap_err();
        assert!(matches!(err, SimError::Codeword { line: 2, .. }));
    }

    #[test]
    fn test_rejects_short_line() {
        let err = CodewordSource::parse("101\n", 4).unwrap_err();
        assert!(matches!(err, SimError::Codeword { line: 1, .. }));
    }

    #[test]
    fn test_check_against_graph() {
        let graph = TannerGraph::hamming_7_4();
        let valid = CodewordSource::parse("0000000\n1000111\n", 7).unwrap();
        assert!(valid.check(&graph).is_ok());
        assert!(CodewordSource::all_zero(7).check(&graph).is_ok());

        // third line flips one bit of a codeword
        let wrong = CodewordSource::parse("0000000\n\n1000110\n", 7).unwrap();
        let err = wrong.check(&graph).unwrap_err();
        assert!(matches!(err, SimError::Codeword { line: 3, .. }));
        assert!(err.to_string().contains("1 unsatisfied checks"));
    }

    #[test]
    fn test_rejects_empty_file() {
        assert!(CodewordSource::parse("\n\n", 4).is_err());
    }
}
