use clap::Parser;
use relinst_core::logging;

mod cli;

use crate::cli::Cli;

fn main() {
    // Usage errors exit with status 2 from inside clap.
    let cli = Cli::parse();

    if let Err(err) = logging::init_logging(cli.debug) {
        logging::init_logging_stderr();
        tracing::warn!("{:#}", err);
    }

    if let Err(err) = cli.run() {
        eprintln!("relinst error: {:#}", err);
        std::process::exit(1);
    }
}
