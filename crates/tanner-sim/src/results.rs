//! Result files written between SNR points.
//!
//! - the result log: one tab-separated line appended per point
//! - `<prefix>_<snr>_itdist.dat`: iteration and cumulative completion
//!   fraction, one pair per line, rewritten for each point
//! - the JSON run summary, rewritten after every point

use crate::error::{SimError, SimResult};
use crate::stats::ErrorStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tanner_core::DecoderConfig;

/// Statistics of one finished SNR point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSummary {
    pub snr_db: f64,
    pub frames: u64,
    pub total_bits: u64,
    pub bit_errors: u64,
    pub word_errors: u64,
    pub undetected_errors: u64,
    pub ber: f64,
    pub wer: f64,
    pub uncoded_ber: f64,
    pub average_iterations: f64,
    /// 95% normal-approximation interval on the BER
    pub ber_interval: (f64, f64),
    pub anomalies: u64,
    pub error_weights: BTreeMap<usize, u64>,
}

impl PointSummary {
    pub fn new(snr_db: f64, stats: &ErrorStats) -> Self {
        Self {
            snr_db,
            frames: stats.frames(),
            total_bits: stats.total_bits(),
            bit_errors: stats.bit_errors(),
            word_errors: stats.word_errors(),
            undetected_errors: stats.undetected_errors(),
            ber: stats.ber(),
            wer: stats.wer(),
            uncoded_ber: stats.uncoded_ber(),
            average_iterations: stats.average_iterations(),
            ber_interval: stats.confidence_interval(0.95),
            anomalies: stats.anomalies(),
            error_weights: stats.error_weights().clone(),
        }
    }
}

/// Whole-run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub graph: PathBuf,
    pub rate: f64,
    pub seed: u64,
    pub algorithm: String,
    pub parameters: BTreeMap<String, String>,
    pub max_iterations: usize,
    pub phases: usize,
    pub points: Vec<PointSummary>,
}

impl RunSummary {
    pub fn new(graph: &Path, rate: f64, seed: u64, decoder: &DecoderConfig) -> Self {
        Self {
            graph: graph.to_path_buf(),
            rate,
            seed,
            algorithm: decoder.algorithm.name().to_string(),
            parameters: decoder
                .algorithm
                .parameters()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            max_iterations: decoder.max_iterations,
            phases: decoder.phases,
            points: Vec::new(),
        }
    }
}

/// Tab-separated result line for one point.
///
/// Columns: SNR, bit errors, BER, average iterations, WER, total bits,
/// total words, uncoded BER, iteration budget, phases, seed, the decoder
/// parameters as `name=value`, graph path.
pub fn result_line(point: &PointSummary, summary: &RunSummary) -> String {
    let mut line = String::new();
    let _ = write!(
        line,
        "{}\t{}\t{:e}\t{}\t{:e}\t{}\t{}\t{:e}\t{}\t{}\t{}",
        point.snr_db,
        point.bit_errors,
        point.ber,
        point.average_iterations,
        point.wer,
        point.total_bits,
        point.frames,
        point.uncoded_ber,
        summary.max_iterations,
        summary.phases,
        summary.seed,
    );
    let _ = write!(line, "\t{}", summary.algorithm);
    for (name, value) in &summary.parameters {
        let _ = write!(line, "\t{}={}", name, value);
    }
    let _ = write!(line, "\t{}", summary.graph.display());
    line
}

/// Append one line to the result log, creating it if needed.
pub fn append_result(path: &Path, line: &str) -> SimResult<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SimError::file(path, e))?;
    writeln!(file, "{}", line).map_err(|e| SimError::file(path, e))
}

/// Path of the completion-time distribution for one point.
pub fn itdist_path(prefix: &Path, snr_db: f64) -> PathBuf {
    PathBuf::from(format!("{}_{}_itdist.dat", prefix.display(), snr_db))
}

pub fn write_itdist(path: &Path, cdf: &[f64]) -> SimResult<()> {
    let mut text = String::new();
    for (iteration, fraction) in cdf.iter().enumerate() {
        let _ = writeln!(text, "{}\t{}", iteration, fraction);
    }
    std::fs::write(path, text).map_err(|e| SimError::file(path, e))
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> SimResult<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).map_err(|e| SimError::file(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::FrameRecord;
    use tanner_core::{Algorithm, DdBmpConfig};

    fn summary_with_point() -> (RunSummary, PointSummary) {
        let decoder = DecoderConfig::new(Algorithm::DdBmp(DdBmpConfig::default()), 50);
        let summary = RunSummary::new(Path::new("codes/h.alist"), 0.5, 7, &decoder);
        let mut stats = ErrorStats::new(100, 50);
        stats.record(&FrameRecord {
            bit_errors: 3,
            uncoded_bit_errors: 5,
            iterations: 50,
            satisfied: false,
            anomalies: 0,
        });
        stats.record(&FrameRecord {
            bit_errors: 0,
            uncoded_bit_errors: 1,
            iterations: 10,
            satisfied: true,
            anomalies: 0,
        });
        (summary, PointSummary::new(1.5, &stats))
    }

    #[test]
    fn test_result_line_columns() {
        let (summary, point) = summary_with_point();
        let line = result_line(&point, &summary);
        let cols: Vec<&str> = line.split('\t').collect();
        assert_eq!(cols[0], "1.5");
        assert_eq!(cols[1], "3");
        assert_eq!(cols[2].parse::<f64>().unwrap(), 0.015);
        assert_eq!(cols[3], "30");
        assert_eq!(cols[4].parse::<f64>().unwrap(), 0.5);
        assert_eq!(cols[5], "200");
        assert_eq!(cols[6], "2");
        assert_eq!(cols[11], "dd-bmp");
        assert!(cols.contains(&"bits=3"));
        assert_eq!(*cols.last().unwrap(), "codes/h.alist");
    }

    #[test]
    fn test_itdist_path() {
        assert_eq!(
            itdist_path(Path::new("out/run"), 2.5),
            PathBuf::from("out/run_2.5_itdist.dat")
        );
    }

    #[test]
    fn test_files_written() {
        let dir = std::env::temp_dir();
        let log = dir.join("tanner_sim_results_test.tsv");
        let json = dir.join("tanner_sim_results_test.json");
        let itdist = dir.join("tanner_sim_results_test_itdist.dat");
        std::fs::remove_file(&log).ok();

        let (mut summary, point) = summary_with_point();
        let line = result_line(&point, &summary);
        append_result(&log, &line).unwrap();
        append_result(&log, &line).unwrap();
        let text = std::fs::read_to_string(&log).unwrap();
        assert_eq!(text.lines().count(), 2);

        write_itdist(&itdist, &[0.0, 0.5, 1.0]).unwrap();
        assert_eq!(std::fs::read_to_string(&itdist).unwrap(), "0\t0\n1\t0.5\n2\t1\n");

        summary.points.push(point);
        write_summary(&json, &summary).unwrap();
        let back: RunSummary = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(back, summary);

        for path in [&log, &json, &itdist] {
            std::fs::remove_file(path).ok();
        }
    }
}
