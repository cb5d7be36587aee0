//! CLI command dispatch: build by default, `lookup` and `check` as subcommands.

use anyhow::Result;

use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::handlers::{handle_build, handle_check, handle_lookup};

/// Run the selected command. Errors propagate to `main`, which exits non-zero.
pub fn handle_run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => handle_build(&cli.build),
        Some(Commands::Lookup(args)) => handle_lookup(args),
        Some(Commands::Check(args)) => handle_check(args),
    }
}
