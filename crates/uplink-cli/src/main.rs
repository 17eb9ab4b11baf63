use clap::Parser;
use uplink_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // File logging under the XDG state dir; stderr when that is unavailable.
    if let Err(e) = logging::init_logging(cli.verbose) {
        logging::init_logging_stderr(cli.verbose);
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }

    if let Err(err) = cli.run().await {
        eprintln!("uplink error: {:#}", err);
        std::process::exit(1);
    }
}
