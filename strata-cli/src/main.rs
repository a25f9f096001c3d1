//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use log::error;
use strata_cli::CliError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match strata_cli::run() {
        Ok(()) => {}
        // Help and version requests surface as parse errors; clap prints them.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            error!("strata: {err}");
            std::process::exit(1);
        }
    }
}
