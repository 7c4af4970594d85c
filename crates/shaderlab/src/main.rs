//! Entry point wiring the CLI surface to the server and the one-shot `list`
//! and `paths` utilities.
mod cli;
mod paths;
mod run;
mod settings;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Serve(args)) => run::run_server(args),
        Some(Command::List(args)) => run::run_list(args),
        Some(Command::Paths(args)) => run::run_paths(args),
        None => run::run_server(cli.serve),
    }
}
