//! srcprof CLI: instrument sources and report block coverage
//!
//! ## Usage
//!
//! ```bash
//! srcprof instrument src -o build/instrumented     # Instrument a tree
//! srcprof merge run1.dat run2.dat -o all.dat       # Combine runs
//! srcprof report -o build/instrumented --counts all.dat --html coverage
//! srcprof inspect src/app/Main.java                # Show the block inventory
//! ```

use clap::Parser;
use srcprof_cli::{
    handlers, logging, Cli, CliConfig, CliResult, ColorChoice, Commands, ProjectConfig, Verbosity,
};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    console::set_colors_enabled(config.color.should_color());
    logging::init_logging(&config);
    let project = ProjectConfig::discover(cli.config.as_deref(), Path::new("."))?;

    match cli.command {
        Commands::Instrument(args) => {
            handlers::execute_instrument(&config, &project, &args)?;
        }
        Commands::Report(args) => {
            handlers::execute_report(&config, &project, &args)?;
        }
        Commands::Merge(args) => {
            handlers::execute_merge(&config, &args)?;
        }
        Commands::Inspect(args) => {
            handlers::execute_inspect(&config, &project, &args)?;
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
