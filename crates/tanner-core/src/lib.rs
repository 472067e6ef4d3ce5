//! # Tanner Core
//!
//! Iterative decoding of LDPC codes on a shared Tanner graph.
//!
//! ## Overview
//!
//! The crate holds the decoding engine used by the `tanner-sim` harness:
//!
//! - **Graph**: CSR-style Tanner graph with O(1) reverse-edge lookup, loaded
//!   from alist text
//! - **Channel**: BPSK over AWGN with an injected noise source
//! - **Quantizer**: saturation, mid-riser level indices and the packed
//!   sign-magnitude words of the fixed-point datapaths
//! - **Decoders**: belief propagation, min-sum (normalized/offset), GDBF and
//!   its noisy variants, a bit-exact NGDBF datapath and DD-BMP, all driven by
//!   one convergence loop
//! - **Multi-phase**: P independently seeded restarts per frame
//! - **Non-binary**: GF(2^m) arithmetic and a q-ary sum-product decoder
//!
//! ## Decoding Flow
//!
//! ```text
//! samples → front end (saturate / quantize) → reset
//!         → [check update → syndrome == 0 ? → symbol update]* → decisions
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rand::SeedableRng;
//! use tanner_core::{AwgnChannel, Algorithm, BpConfig, Decoder, DecoderConfig, TannerGraph};
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let graph = Arc::new(TannerGraph::regular(96, 3, 6, &mut rng).unwrap());
//! let channel = AwgnChannel::new(5.0, graph.rate()).unwrap();
//! let config = DecoderConfig::new(Algorithm::Bp(BpConfig::default()), 50);
//! let mut decoder = Decoder::new(graph.clone(), &config, &channel).unwrap();
//!
//! let codeword = vec![false; graph.num_symbols()];
//! let samples = channel.transmit(&codeword, &mut rng);
//! let outcome = decoder.decode(&samples, &mut rng).unwrap();
//! assert_eq!(outcome.satisfied, graph.is_codeword(&outcome.decisions));
//! ```

pub mod alist;
pub mod channel;
pub mod config;
pub mod decoder;
pub mod error;
pub mod gf;
pub mod graph;
pub mod multiphase;
pub mod observe;
pub mod quantize;

pub use channel::{AwgnChannel, NoiseSource};
pub use config::{
    Algorithm, BpConfig, Correction, DdBmpConfig, DecoderConfig, FlipRateFeedback, GdbfConfig, GdbfMode,
    MinSumConfig, NgdbfHwConfig, Perturbation,
};
pub use decoder::{Decoder, FrameOutcome, NodeRules, NonBinaryDecoder, SymbolOutcome};
pub use error::{TannerError, TannerResult};
pub use gf::GaloisField;
pub use graph::TannerGraph;
pub use multiphase::{PhaseController, PhaseReport};
pub use quantize::{Conditioner, FrontEnd, Quantizer, SignMagnitude};
