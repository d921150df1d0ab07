/// main.rs — genoset entry point

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use genoset::config::RunConfig;
use genoset::logging::{init_logger, LogDiagnostics};
use genoset::pipeline::{self, print_summary};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> genoset::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    let diag = LogDiagnostics;

    let summary = match cli.command {
        Command::Prepare { config } => {
            let config = RunConfig::load(&config)?;
            eprintln!("Preparing datasets in {}…", config.output.display());
            pipeline::prepare(&config, &diag)?
        }

        Command::Resplit { config, from } => {
            let config = RunConfig::load(&config)?;
            eprintln!("Re-splitting {}…", from.display());
            pipeline::resplit(&config, &from, &diag)?
        }

        Command::Map { config, intervals, to } => {
            let config = RunConfig::load(&config)?;
            eprintln!("Mapping {}…", intervals.display());
            pipeline::map_only(&config, &intervals, &to, &diag)?
        }
    };

    print_summary(&summary);
    Ok(())
}
