//! # tanner-sim
//!
//! Monte-Carlo evaluation harness for the `tanner-core` decoders.
//!
//! ## Overview
//!
//! A run loads one Tanner graph, then sweeps a list of SNR points. Each
//! point transmits codewords over BPSK/AWGN, decodes every frame and
//! accumulates error statistics until enough errors (or frames) are seen.
//! Results go to an appended tab-separated log, optional completion-time
//! distribution files and an optional JSON summary.
//!
//! - [`settings`]: YAML run configuration
//! - [`cli`]: command-line front end producing the same configuration
//! - [`simulator`]: the frame loop
//! - [`stats`]: error counters and the stopping rule
//! - [`codeword`]: all-zero or file-backed codeword source
//! - [`results`]: result log, distribution and summary writers
//!
//! ## Example
//!
//! ```rust,no_run
//! use tanner_sim::settings::SimulationConfig;
//! use tanner_sim::simulator::Simulator;
//!
//! let config = SimulationConfig::load_from("sweep.yaml".as_ref()).unwrap();
//! let summary = Simulator::new(config).unwrap().run().unwrap();
//! for point in &summary.points {
//!     println!("{} dB: BER {:.3e}", point.snr_db, point.ber);
//! }
//! ```

pub mod cli;
pub mod codeword;
pub mod error;
pub mod results;
pub mod settings;
pub mod simulator;
pub mod stats;

pub use error::{SimError, SimResult};
pub use settings::SimulationConfig;
pub use simulator::Simulator;
