//! tanner-sim: error-rate simulation of iterative LDPC decoders

use std::process;
use tanner_core::observe::init_logging;
use tanner_sim::cli::Cli;
use tanner_sim::{SimResult, Simulator};

fn run(cli: Cli) -> SimResult<()> {
    let config = cli.into_config()?;
    init_logging(&config.logging);

    let summary = Simulator::new(config)?.run()?;
    for point in &summary.points {
        println!(
            "{:>6.2} dB  BER {:.3e}  WER {:.3e}  avg iterations {:.2}  ({} frames)",
            point.snr_db, point.ber, point.wer, point.average_iterations, point.frames
        );
    }
    Ok(())
}

fn main() {
    // Usage problems print clap's message and exit cleanly.
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(0);
        }
    };

    if let Err(err) = run(cli) {
        tracing::error!(error = %err, "simulation failed");
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
