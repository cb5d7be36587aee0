//! imgen CLI: build image variants by default; `lookup` and `check` subcommands.

use anyhow::Result;
use clap::Parser;
use imgen::engine::arg_parser::Cli;
use imgen::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
