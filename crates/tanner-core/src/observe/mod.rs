//! # Observability
//!
//! Structured logging for decoders and the simulation harness via `tracing`.
//!
//! | Level | Emitted for |
//! |-------|-------------|
//! | trace | per-iteration syndrome weight and flip counts |
//! | debug | decoder construction, per-frame convergence |
//! | info  | harness progress and SNR point summaries |
//! | warn  | numeric anomalies (non-finite soft values at decision time) |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tanner_core::observe::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development());
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
