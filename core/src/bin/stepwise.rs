//! Stepwise CLI
//!
//! Runs, checks and dumps workflow scripts from the command line.

use stepwise_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
