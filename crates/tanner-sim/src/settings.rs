//! Run configuration for the simulation harness.
//!
//! A run is one graph, one decoder configuration and a sweep of SNR
//! points. Settings come from YAML; the CLI builds the same structure from
//! its arguments.
//!
//! ```yaml
//! graph: codes/pegreg504x1008.alist
//! rate: 0.5
//! snr_db: [1.0, 1.5, 2.0]
//! seed: 1
//! stop:
//!   min_bit_errors: 200
//!   min_word_errors: 40
//! log: results/ngdbf.tsv
//! decoder:
//!   max_iterations: 300
//!   phases: 2
//!   algorithm:
//!     kind: ngdbf-hw
//!     syndrome_weight: 0.185
//! logging:
//!   level: info
//! ```

use crate::error::{SimError, SimResult};
use crate::stats::StopCriteria;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tanner_core::observe::LogConfig;
use tanner_core::DecoderConfig;

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV: &str = "TANNER_SIM_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// alist file of the code
    pub graph: PathBuf,
    /// Code rate used for the Eb/N0 to noise mapping
    pub rate: f64,
    /// Eb/N0 points in dB, simulated in order
    pub snr_db: Vec<f64>,
    /// Seed of the shared random stream; drawn at startup when absent
    pub seed: Option<u64>,
    pub stop: StopCriteria,
    /// Frames between progress lines
    pub report_interval: u64,
    /// Tab-separated result log, one line appended per SNR point
    pub log: PathBuf,
    /// Codeword file; the all-zero word when absent
    pub codewords: Option<PathBuf>,
    /// Prefix of the per-point completion-time distribution files
    pub itdist: Option<PathBuf>,
    /// Pretty JSON summary of the whole run
    pub summary: Option<PathBuf>,
    pub decoder: DecoderConfig,
    pub logging: LogConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            graph: PathBuf::new(),
            rate: 0.5,
            snr_db: vec![2.0],
            seed: None,
            stop: StopCriteria::default(),
            report_interval: 100,
            log: PathBuf::from("results.tsv"),
            codewords: None,
            itdist: None,
            summary: None,
            decoder: DecoderConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load settings from the default search path.
    ///
    /// Search order:
    /// 1. `TANNER_SIM_CONFIG` environment variable
    /// 2. `./tanner-sim.yaml`
    /// 3. `~/.config/tanner-sim/config.yaml`
    /// 4. `/etc/tanner-sim/config.yaml`
    ///
    /// Returns defaults if no file is found.
    pub fn load() -> SimResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if Path::new(&path).exists() {
                return Self::load_from(Path::new(&path));
            }
        }

        for path in &Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(path);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SimError::file(path, e))?;
        Self::parse(&content)
    }

    pub fn parse(yaml: &str) -> SimResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn save(&self, path: &Path) -> SimResult<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).map_err(|e| SimError::file(path, e))
    }

    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./tanner-sim.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "tanner-sim") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/tanner-sim/config.yaml"));
        paths
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.graph.as_os_str().is_empty() {
            return Err(SimError::config("graph path is required"));
        }
        if !(self.rate > 0.0 && self.rate <= 1.0) {
            return Err(SimError::config(format!("rate must lie in (0, 1], got {}", self.rate)));
        }
        if self.snr_db.is_empty() {
            return Err(SimError::config("at least one SNR point is required"));
        }
        if let Some(snr) = self.snr_db.iter().find(|s| !s.is_finite()) {
            return Err(SimError::config(format!("SNR {} is not finite", snr)));
        }
        if self.stop.max_frames == 0 {
            return Err(SimError::config("max_frames must be at least 1"));
        }
        if self.report_interval == 0 {
            return Err(SimError::config("report_interval must be at least 1"));
        }
        self.decoder.validate()?;
        Ok(())
    }
}
