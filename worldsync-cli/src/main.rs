//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use worldsync_cli::CliError;

fn main() {
    match worldsync_cli::run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("worldsync: {err}");
            std::process::exit(2);
        }
    }
}
