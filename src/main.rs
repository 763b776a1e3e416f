//! s2rgb CLI entrypoint.
//!
//! Parses arguments and hands off to the `cli` module, which routes the
//! `fetch` and `compose` subcommands onto the library API. Errors bubble
//! up here and set a non-zero exit status.

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
