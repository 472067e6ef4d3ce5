//! Command-line surface.
//!
//! One subcommand per decoder family takes the classic positional layout
//! `GRAPH RATE SNR ITERATIONS LOG [CODEWORDS]` plus the family tunables;
//! `run` loads a YAML sweep instead. The global options override either
//! source.
//!
//! ```text
//! tanner-sim ngdbf-hw codes/pegreg504x1008.alist 0.5 3.5 300 ngdbf.tsv --weight 0.2 --phases 4
//! tanner-sim run sweep.yaml --seed 7 --summary sweep.json
//! ```

use crate::error::SimResult;
use crate::settings::SimulationConfig;
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;
use tanner_core::observe::{LogFormat, LogLevel};
use tanner_core::{
    Algorithm, BpConfig, Correction, DdBmpConfig, DecoderConfig, FlipRateFeedback, FrontEnd, GdbfConfig, GdbfMode,
    MinSumConfig, NgdbfHwConfig, Perturbation,
};

/// Where the run settings come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// `run <config.yaml>`
    File(PathBuf),
    /// A decoder subcommand and its arguments
    Arguments(Box<SimulationConfig>),
}

/// Global options applied on top of the settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub seed: Option<u64>,
    pub frames: Option<u64>,
    pub min_bit_errors: Option<u64>,
    pub min_word_errors: Option<u64>,
    pub phases: Option<usize>,
    pub log_level: Option<LogLevel>,
    pub log_format: Option<LogFormat>,
    pub summary: Option<PathBuf>,
    pub itdist: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(frames) = self.frames {
            config.stop.max_frames = frames;
        }
        if let Some(bits) = self.min_bit_errors {
            config.stop.min_bit_errors = bits;
        }
        if let Some(words) = self.min_word_errors {
            config.stop.min_word_errors = words;
        }
        if let Some(phases) = self.phases {
            config.decoder.phases = phases;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(summary) = &self.summary {
            config.summary = Some(summary.clone());
        }
        if let Some(itdist) = &self.itdist {
            config.itdist = Some(itdist.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub source: ConfigSource,
    pub overrides: Overrides,
}

impl Cli {
    pub fn build_command() -> Command {
        Command::new("tanner-sim")
            .about("Monte-Carlo error-rate simulation of iterative LDPC decoders")
            .long_about(
                "Simulates BPSK over AWGN with an LDPC code given as an alist file and reports bit and word \
                 error rates per SNR point.\n\nSNR may be a comma-separated list to sweep several points.",
            )
            .version(env!("CARGO_PKG_VERSION"))
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new("seed")
                    .help("Seed of the random stream (drawn and logged when absent)")
                    .long("seed")
                    .value_name("SEED")
                    .global(true)
                    .value_parser(value_parser!(u64)),
            )
            .arg(
                Arg::new("frames")
                    .help("Maximum frames per SNR point")
                    .long("frames")
                    .value_name("N")
                    .global(true)
                    .value_parser(value_parser!(u64).range(1..)),
            )
            .arg(
                Arg::new("min-bit-errors")
                    .help("Bit errors to collect before a point may stop")
                    .long("min-bit-errors")
                    .value_name("N")
                    .global(true)
                    .value_parser(value_parser!(u64)),
            )
            .arg(
                Arg::new("min-word-errors")
                    .help("Word errors to collect before a point may stop")
                    .long("min-word-errors")
                    .value_name("N")
                    .global(true)
                    .value_parser(value_parser!(u64)),
            )
            .arg(
                Arg::new("phases")
                    .help("Independently seeded decoding phases per frame")
                    .short('p')
                    .long("phases")
                    .value_name("P")
                    .global(true)
                    .value_parser(value_parser!(usize)),
            )
            .arg(
                Arg::new("log-level")
                    .help("Log verbosity")
                    .long("log-level")
                    .value_name("LEVEL")
                    .global(true)
                    .value_parser(["trace", "debug", "info", "warn", "error"]),
            )
            .arg(
                Arg::new("log-format")
                    .help("Log output format")
                    .long("log-format")
                    .value_name("FORMAT")
                    .global(true)
                    .value_parser(["compact", "pretty", "json"]),
            )
            .arg(
                Arg::new("summary")
                    .help("Write a JSON summary of the run")
                    .long("summary")
                    .value_name("FILE")
                    .global(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("itdist")
                    .help("Prefix of the per-point completion-time distribution files")
                    .long("itdist")
                    .value_name("PREFIX")
                    .global(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .subcommand(
                Command::new("run").about("Run a sweep described by a YAML file").arg(
                    Arg::new("config")
                        .help("Simulation settings file")
                        .value_name("CONFIG")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
            )
            .subcommand(
                positionals(Command::new("bp").about("Sum-product belief propagation"))
                    .arg(float("max-llr", "LLR", "Clip for channel and symbol-to-check LLRs")),
            )
            .subcommand(
                positionals(Command::new("min-sum").about("Min-sum message passing"))
                    .arg(float("alpha", "A", "Normalized min-sum: scale check outputs by A").conflicts_with("offset"))
                    .arg(float("offset", "D", "Offset min-sum: subtract D from check output magnitudes"))
                    .arg(float("ymax", "Y", "Saturate channel samples at +/-Y"))
                    .arg(integer("bits", "Q", "Quantize channel samples to 2^Q levels")),
            )
            .subcommand(
                positionals(Command::new("gdbf").about("Gradient-descent bit flipping, optionally noisy"))
                    .arg(float("theta", "T", "Initial flip threshold"))
                    .arg(float("lambda", "L", "Threshold adaptation factor, 1 disables"))
                    .arg(float("weight", "W", "Syndrome weight in the inversion function"))
                    .arg(
                        Arg::new("mode")
                            .help("Flip schedule")
                            .long("mode")
                            .value_name("MODE")
                            .value_parser(["parallel", "sequential", "switching"])
                            .default_value("parallel"),
                    )
                    .arg(
                        Arg::new("switch-after")
                            .help("Iteration after which a stalled switching decoder goes sequential")
                            .long("switch-after")
                            .value_name("K")
                            .value_parser(value_parser!(usize))
                            .default_value("10"),
                    )
                    .arg(
                        Arg::new("perturbation")
                            .help("Noise added to the inversion function")
                            .long("perturbation")
                            .value_name("KIND")
                            .value_parser(["none", "gaussian", "uniform"])
                            .default_value("none"),
                    )
                    .arg(float("noise-scale", "S", "Perturbation deviation as a multiple of the channel sigma"))
                    .arg(flag("noise-shaping", "Perturb with the difference of successive draws"))
                    .arg(flag("stochastic-flips", "Flip with a probability instead of a hard threshold"))
                    .arg(integer("window", "W", "Decide by majority over the last W iterations"))
                    .arg(float("ymax", "Y", "Channel saturation level"))
                    .arg(integer("bits", "Q", "Quantize channel samples to 2^Q levels")),
            )
            .subcommand(
                positionals(Command::new("ngdbf-hw").about("Fixed-point noisy GDBF"))
                    .arg(float("weight", "W", "Syndrome weight"))
                    .arg(float("ymax", "Y", "Quantizer range"))
                    .arg(float("noise-scale", "S", "Noise deviation as a multiple of the channel sigma"))
                    .arg(integer("bits", "NQ", "Packed width including the sign"))
                    .arg(float("theta", "T", "Initial flip threshold"))
                    .arg(float("threshold-sample", "Y", "Reference sample the flip threshold is quantized from"))
                    .arg(float("noise-bias", "B", "Offset added to the noise before quantization"))
                    .arg(integer("buffer-len", "L", "Noise buffer length, 0 for twice the code length"))
                    .arg(float("target-flips", "F", "Enable flip-rate feedback towards F flips per iteration"))
                    .arg(float("gain", "G", "Flip-rate feedback gain").requires("target-flips"))
                    .arg(float("max-threshold", "T", "Flip-rate feedback threshold ceiling").requires("target-flips")),
            )
            .subcommand(
                positionals(Command::new("dd-bmp").about("Decision-driven bit-level message passing"))
                    .arg(float("ymax", "Y", "Quantizer range"))
                    .arg(integer("bits", "Q", "Quantizer width")),
            )
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let source = match matches.subcommand() {
            Some(("run", sub)) => ConfigSource::File(required::<PathBuf>(sub, "config")?),
            Some((family, sub)) => ConfigSource::Arguments(Box::new(arguments_config(family, sub)?)),
            None => return Err(usage_error(ErrorKind::MissingSubcommand, "a subcommand is required")),
        };

        let overrides = Overrides {
            seed: matches.get_one::<u64>("seed").copied(),
            frames: matches.get_one::<u64>("frames").copied(),
            min_bit_errors: matches.get_one::<u64>("min-bit-errors").copied(),
            min_word_errors: matches.get_one::<u64>("min-word-errors").copied(),
            phases: matches.get_one::<usize>("phases").copied(),
            log_level: matches.get_one::<String>("log-level").and_then(|s| s.parse().ok()),
            log_format: matches.get_one::<String>("log-format").and_then(|s| s.parse().ok()),
            summary: matches.get_one::<PathBuf>("summary").cloned(),
            itdist: matches.get_one::<PathBuf>("itdist").cloned(),
        };
        Ok(Self { source, overrides })
    }

    /// Parse a full argument list, program name first.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::build_command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    /// Resolve the settings, loading the YAML file for `run`.
    pub fn into_config(self) -> SimResult<SimulationConfig> {
        let mut config = match self.source {
            ConfigSource::File(path) => SimulationConfig::load_from(&path)?,
            ConfigSource::Arguments(config) => *config,
        };
        self.overrides.apply(&mut config);
        Ok(config)
    }
}

fn positionals(command: Command) -> Command {
    command
        .arg(
            Arg::new("graph")
                .help("Parity-check matrix in alist format")
                .value_name("GRAPH")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("rate")
                .help("Code rate used for the Eb/N0 mapping")
                .value_name("RATE")
                .required(true)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("snr")
                .help("Eb/N0 in dB, comma-separated for a sweep")
                .value_name("SNR")
                .required(true)
                .allow_negative_numbers(true)
                .value_delimiter(',')
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("iterations")
                .help("Iteration budget per frame")
                .value_name("ITERATIONS")
                .required(true)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("log")
                .help("Result log, one line appended per SNR point")
                .value_name("LOG")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("codewords")
                .help("Codeword file, one word per line, replayed when exhausted")
                .value_name("CODEWORDS")
                .value_parser(value_parser!(PathBuf)),
        )
}

fn float(name: &'static str, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .help(help)
        .long(name)
        .value_name(value_name)
        .allow_negative_numbers(true)
        .value_parser(value_parser!(f64))
}

fn integer(name: &'static str, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .help(help)
        .long(name)
        .value_name(value_name)
        .value_parser(value_parser!(u32))
}

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).help(help).long(name).action(ArgAction::SetTrue)
}

fn usage_error(kind: ErrorKind, message: &str) -> clap::Error {
    Cli::build_command().error(kind, message)
}

fn required<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, name: &str) -> Result<T, clap::Error> {
    matches
        .get_one::<T>(name)
        .cloned()
        .ok_or_else(|| usage_error(ErrorKind::MissingRequiredArgument, &format!("missing <{}>", name)))
}

fn float_or(matches: &ArgMatches, name: &str, default: f64) -> f64 {
    matches.get_one::<f64>(name).copied().unwrap_or(default)
}

fn integer_or(matches: &ArgMatches, name: &str, default: u32) -> u32 {
    matches.get_one::<u32>(name).copied().unwrap_or(default)
}

/// Channel front end from `--ymax`/`--bits`; `fallback` when neither is given.
fn front_end(matches: &ArgMatches, fallback: FrontEnd) -> FrontEnd {
    let ymax = matches.get_one::<f64>("ymax").copied();
    match (ymax, matches.get_one::<u32>("bits").copied()) {
        (ymax, Some(bits)) => FrontEnd::Quantize {
            ymax: ymax.unwrap_or(DdBmpConfig::default().ymax),
            bits,
        },
        (Some(ymax), None) => FrontEnd::Saturate { ymax },
        (None, None) => fallback,
    }
}

fn arguments_config(family: &str, matches: &ArgMatches) -> Result<SimulationConfig, clap::Error> {
    let algorithm = match family {
        "bp" => {
            let d = BpConfig::default();
            Algorithm::Bp(BpConfig {
                max_llr: float_or(matches, "max-llr", d.max_llr),
            })
        }
        "min-sum" => {
            let correction = match (
                matches.get_one::<f64>("alpha").copied(),
                matches.get_one::<f64>("offset").copied(),
            ) {
                (Some(alpha), _) => Correction::Normalized { alpha },
                (None, Some(delta)) => Correction::Offset { delta },
                (None, None) => Correction::None,
            };
            Algorithm::MinSum(MinSumConfig {
                correction,
                front_end: front_end(matches, FrontEnd::Raw),
            })
        }
        "gdbf" => {
            let d = GdbfConfig::default();
            let mode = match matches.get_one::<String>("mode").map(String::as_str) {
                Some("sequential") => GdbfMode::Sequential,
                Some("switching") => GdbfMode::Switching {
                    after: matches.get_one::<usize>("switch-after").copied().unwrap_or(10),
                },
                _ => GdbfMode::Parallel,
            };
            let perturbation = match matches.get_one::<String>("perturbation").map(String::as_str) {
                Some("gaussian") => Perturbation::Gaussian,
                Some("uniform") => Perturbation::Uniform,
                _ => Perturbation::None,
            };
            Algorithm::Gdbf(GdbfConfig {
                theta: float_or(matches, "theta", d.theta),
                lambda: float_or(matches, "lambda", d.lambda),
                syndrome_weight: float_or(matches, "weight", d.syndrome_weight),
                mode,
                perturbation,
                noise_scale: float_or(matches, "noise-scale", d.noise_scale),
                noise_shaping: matches.get_flag("noise-shaping"),
                stochastic_flips: matches.get_flag("stochastic-flips"),
                smoothing_window: integer_or(matches, "window", d.smoothing_window as u32) as usize,
                front_end: front_end(matches, d.front_end),
            })
        }
        "ngdbf-hw" => {
            let d = NgdbfHwConfig::default();
            let flip_rate_feedback = matches.get_one::<f64>("target-flips").map(|&target_flips| FlipRateFeedback {
                target_flips,
                gain: float_or(matches, "gain", 0.01),
                max_threshold: float_or(matches, "max-threshold", 0.0),
            });
            Algorithm::NgdbfHw(NgdbfHwConfig {
                syndrome_weight: float_or(matches, "weight", d.syndrome_weight),
                ymax: float_or(matches, "ymax", d.ymax),
                noise_scale: float_or(matches, "noise-scale", d.noise_scale),
                bits: integer_or(matches, "bits", d.bits),
                theta0: float_or(matches, "theta", d.theta0),
                threshold_sample: float_or(matches, "threshold-sample", d.threshold_sample),
                noise_bias: float_or(matches, "noise-bias", d.noise_bias),
                noise_buffer_len: integer_or(matches, "buffer-len", d.noise_buffer_len as u32) as usize,
                flip_rate_feedback,
            })
        }
        "dd-bmp" => {
            let d = DdBmpConfig::default();
            Algorithm::DdBmp(DdBmpConfig {
                ymax: float_or(matches, "ymax", d.ymax),
                bits: integer_or(matches, "bits", d.bits),
            })
        }
        other => {
            return Err(usage_error(
                ErrorKind::InvalidSubcommand,
                &format!("unknown decoder '{}'", other),
            ))
        }
    };

    Ok(SimulationConfig {
        graph: required(matches, "graph")?,
        rate: required(matches, "rate")?,
        snr_db: matches.get_many::<f64>("snr").map(|v| v.copied().collect()).unwrap_or_default(),
        log: required(matches, "log")?,
        codewords: matches.get_one::<PathBuf>("codewords").cloned(),
        decoder: DecoderConfig::new(algorithm, required(matches, "iterations")?),
        ..SimulationConfig::default()
    })
}
