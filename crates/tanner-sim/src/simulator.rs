//! Monte-Carlo frame loop
//!
//! For every SNR point of the sweep the simulator transmits codewords over
//! the AWGN channel, decodes each frame with the configured decoder (and
//! phase count), and accumulates error statistics until the stopping rule
//! fires. One seeded generator drives the whole run, so a fixed seed
//! reproduces every frame.
//!
//! ```text
//!   codeword ──► AwgnChannel ──► PhaseController ──► ErrorStats
//!      ▲                              (P phases)          │
//!      └──────── until StopCriteria::is_met ◄─────────────┘
//! ```
//!
//! After each point the result line is appended to the log, the
//! completion-time distribution is written when requested, and the JSON
//! summary is rewritten.

use crate::codeword::CodewordSource;
use crate::error::{SimError, SimResult};
use crate::results::{self, PointSummary, RunSummary};
use crate::settings::SimulationConfig;
use crate::stats::{ErrorStats, FrameRecord};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tanner_core::channel::hard_decisions;
use tanner_core::{alist, AwgnChannel, PhaseController, TannerGraph};
use tracing::info;

pub struct Simulator {
    config: SimulationConfig,
    graph: Arc<TannerGraph>,
}

impl Simulator {
    /// Validate the settings and load the graph they name.
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let graph = alist::load(&config.graph)?;
        info!(
            path = %config.graph.display(),
            symbols = graph.num_symbols(),
            checks = graph.num_checks(),
            edges = graph.num_edges(),
            "loaded graph"
        );
        Self::with_graph(config, Arc::new(graph))
    }

    /// Simulator over an already built graph. `config.graph` only labels
    /// the results.
    pub fn with_graph(config: SimulationConfig, graph: Arc<TannerGraph>) -> SimResult<Self> {
        config.validate()?;
        if !graph.is_binary() {
            return Err(SimError::config(format!(
                "the binary decoders need a GF(2) graph, got GF({})",
                graph.field_order()
            )));
        }
        Ok(Self { config, graph })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<TannerGraph> {
        &self.graph
    }

    /// Simulate every SNR point in order and write the result files.
    pub fn run(&self) -> SimResult<RunSummary> {
        let seed = match self.config.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random();
                info!(seed, "no seed configured, drew one");
                seed
            }
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut codewords = self.codeword_source()?;

        let mut summary = RunSummary::new(&self.config.graph, self.config.rate, seed, &self.config.decoder);
        for &snr_db in &self.config.snr_db {
            let stats = self.run_point(snr_db, &mut codewords, &mut rng)?;
            let point = PointSummary::new(snr_db, &stats);

            results::append_result(&self.config.log, &results::result_line(&point, &summary))?;
            if let Some(prefix) = &self.config.itdist {
                results::write_itdist(&results::itdist_path(prefix, snr_db), &stats.completion_cdf())?;
            }
            summary.points.push(point);
            if let Some(path) = &self.config.summary {
                results::write_summary(path, &summary)?;
            }
        }
        Ok(summary)
    }

    /// Run one SNR point until the stopping rule fires.
    pub fn run_point(
        &self,
        snr_db: f64,
        codewords: &mut CodewordSource,
        rng: &mut StdRng,
    ) -> SimResult<ErrorStats> {
        let channel = AwgnChannel::new(snr_db, self.config.rate)?;
        let decoder = &self.config.decoder;
        let mut controller = PhaseController::from_config(Arc::clone(&self.graph), decoder, &channel)?;
        let mut stats = ErrorStats::new(self.graph.num_symbols(), decoder.max_iterations);
        info!(
            snr_db,
            sigma = channel.sigma(),
            algorithm = decoder.algorithm.name(),
            phases = decoder.phases,
            "starting SNR point"
        );

        while !self.config.stop.is_met(&stats) {
            let codeword = codewords.next_word();
            let samples = channel.transmit(codeword, rng);
            let uncoded_bit_errors = hard_decisions(&samples)
                .iter()
                .zip(codeword)
                .filter(|(d, c)| d != c)
                .count();

            let report = controller.decode(&samples, codeword, rng)?;
            stats.record(&FrameRecord {
                bit_errors: report.errors,
                uncoded_bit_errors,
                iterations: report.iterations,
                satisfied: report.satisfied,
                anomalies: report.outcome.anomalies,
            });

            if stats.frames() % self.config.report_interval == 0 {
                info!(snr_db, "{}", stats.progress_line());
            }
        }

        info!(
            snr_db,
            frames = stats.frames(),
            ber = stats.ber(),
            wer = stats.wer(),
            avg_iterations = stats.average_iterations(),
            "finished SNR point"
        );
        Ok(stats)
    }

    fn codeword_source(&self) -> SimResult<CodewordSource> {
        let n = self.graph.num_symbols();
        match &self.config.codewords {
            Some(path) => {
                let source = CodewordSource::load(path, n)?;
                source.check(&self.graph)?;
                Ok(source)
            }
            None => Ok(CodewordSource::all_zero(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StopCriteria;
    use std::path::PathBuf;
    use tanner_core::{Algorithm, DecoderConfig, GdbfConfig, MinSumConfig, Perturbation};

    fn regular(n: usize) -> Arc<TannerGraph> {
        let mut rng = StdRng::seed_from_u64(7);
        Arc::new(TannerGraph::regular(n, 3, 6, &mut rng).unwrap())
    }

    fn config(name: &str, decoder: DecoderConfig, max_frames: u64) -> SimulationConfig {
        let log = std::env::temp_dir().join(format!("tanner_sim_{}.tsv", name));
        std::fs::remove_file(&log).ok();
        SimulationConfig {
            graph: PathBuf::from(format!("{}.alist", name)),
            seed: Some(11),
            stop: StopCriteria {
                min_bit_errors: u64::MAX,
                min_word_errors: u64::MAX,
                max_frames,
            },
            report_interval: 250,
            log,
            decoder,
            ..SimulationConfig::default()
        }
    }

    fn min_sum(max_iterations: usize) -> DecoderConfig {
        DecoderConfig::new(Algorithm::MinSum(MinSumConfig::default()), max_iterations)
    }

    #[test]
    fn test_min_sum_high_snr_is_error_free() {
        let config = config("min_sum_6db", min_sum(50), 1000);
        let sim = Simulator::with_graph(config, regular(504)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut words = CodewordSource::all_zero(504);
        let stats = sim.run_point(6.0, &mut words, &mut rng).unwrap();
        assert_eq!(stats.frames(), 1000);
        assert_eq!(stats.word_errors(), 0);
        assert_eq!(stats.bit_errors(), 0);
        assert!(stats.uncoded_bit_errors() > 0, "channel produced no errors");
    }

    #[test]
    fn test_min_sum_low_snr_has_bounded_errors() {
        let max_iterations = 50;
        let config = config("min_sum_low", min_sum(max_iterations), 200);
        let sim = Simulator::with_graph(config, regular(504)).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let mut words = CodewordSource::all_zero(504);
        let stats = sim.run_point(0.5, &mut words, &mut rng).unwrap();

        assert!(stats.wer() > 0.0 && stats.wer() <= 1.0);
        let cdf = stats.completion_cdf();
        if cdf[max_iterations - 1] > 0.0 {
            assert!(stats.average_iterations() < max_iterations as f64);
        }
    }

    #[test]
    fn test_stop_on_error_minima() {
        let mut config = config("stop_rule", min_sum(20), 100_000);
        config.stop.min_bit_errors = 30;
        config.stop.min_word_errors = 3;
        let sim = Simulator::with_graph(config, regular(96)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut words = CodewordSource::all_zero(96);
        let stats = sim.run_point(0.0, &mut words, &mut rng).unwrap();
        assert!(stats.bit_errors() >= 30);
        assert!(stats.word_errors() >= 3);
        assert!(stats.frames() < 100_000);
    }

    #[test]
    fn test_run_writes_results() {
        let mut config = config("run_files", min_sum(30), 40);
        let prefix = std::env::temp_dir().join("tanner_sim_run_files");
        let summary_path = std::env::temp_dir().join("tanner_sim_run_files.json");
        config.snr_db = vec![1.0, 3.0];
        config.itdist = Some(prefix.clone());
        config.summary = Some(summary_path.clone());
        let log = config.log.clone();

        let summary = Simulator::with_graph(config, regular(96)).unwrap().run().unwrap();
        assert_eq!(summary.seed, 11);
        assert_eq!(summary.points.len(), 2);
        assert!(summary.points.iter().all(|p| p.frames == 40));

        let lines = std::fs::read_to_string(&log).unwrap();
        assert_eq!(lines.lines().count(), 2);
        assert!(lines.lines().all(|l| l.ends_with("run_files.alist")));

        let itdist = results::itdist_path(&prefix, 3.0);
        let cdf = std::fs::read_to_string(&itdist).unwrap();
        assert_eq!(cdf.lines().count(), 31);
        assert_eq!(cdf.lines().last(), Some("30\t1"));

        let json: RunSummary = serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(json, summary);

        for path in [log, summary_path, itdist, results::itdist_path(&prefix, 1.0)] {
            std::fs::remove_file(path).ok();
        }
    }

    #[test]
    fn test_seeded_run_is_reproducible() {
        let decoder = DecoderConfig::new(
            Algorithm::Gdbf(GdbfConfig {
                perturbation: Perturbation::Gaussian,
                noise_scale: 0.8,
                ..GdbfConfig::default()
            }),
            40,
        )
        .with_phases(2);
        let graph = regular(96);

        let first = Simulator::with_graph(config("repro_a", decoder.clone(), 30), Arc::clone(&graph))
            .unwrap()
            .run()
            .unwrap();
        let second = Simulator::with_graph(config("repro_b", decoder, 30), graph)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(first.points[0].bit_errors, second.points[0].bit_errors);
        assert_eq!(first.points[0].average_iterations, second.points[0].average_iterations);
        assert_eq!(first.points[0].uncoded_ber, second.points[0].uncoded_ber);
    }

    #[test]
    fn test_codeword_file_replayed() {
        let graph = Arc::new(TannerGraph::hamming_7_4());
        let words: Vec<String> = (1u32..128)
            .map(|v| (0..7).map(|i| v >> (6 - i) & 1 == 1).collect::<Vec<bool>>())
            .filter(|w| graph.is_codeword(w))
            .take(3)
            .map(|w| w.iter().map(|&b| if b { '1' } else { '0' }).collect())
            .collect();
        assert_eq!(words.len(), 3);
        let path = std::env::temp_dir().join("tanner_sim_hamming_words.txt");
        std::fs::write(&path, words.join("\n")).unwrap();

        let mut config = config(
            "hamming",
            DecoderConfig::new(Algorithm::Bp(Default::default()), 20),
            60,
        );
        config.rate = 4.0 / 7.0;
        config.codewords = Some(path.clone());
        let sim = Simulator::with_graph(config, graph).unwrap();
        let mut source = sim.codeword_source().unwrap();
        assert_eq!(source.len(), 3);

        let mut rng = StdRng::seed_from_u64(5);
        let stats = sim.run_point(10.0, &mut source, &mut rng).unwrap();
        assert_eq!(stats.word_errors(), 0);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_codeword_file_must_satisfy_graph() {
        let path = std::env::temp_dir().join("tanner_sim_bad_words.txt");
        std::fs::write(&path, "0000000\n1000110\n").unwrap();
        let mut config = config("bad_words", min_sum(10), 5);
        config.rate = 4.0 / 7.0;
        config.codewords = Some(path.clone());
        let sim = Simulator::with_graph(config, Arc::new(TannerGraph::hamming_7_4())).unwrap();
        assert!(matches!(sim.run(), Err(SimError::Codeword { line: 2, .. })));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_graph_file() {
        let mut config = config("missing", min_sum(10), 1);
        config.graph = std::env::temp_dir().join("tanner_sim_does_not_exist.alist");
        assert!(matches!(Simulator::new(config), Err(SimError::Core(_))));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = config("invalid", min_sum(10), 1);
        config.decoder.phases = 0;
        assert!(Simulator::with_graph(config, regular(96)).is_err());
    }
}
