use std::process::ExitCode;

use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use batchrun::cli::Cli;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "batchrun=debug",
        _ => "batchrun=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match batchrun::run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            ExitCode::from(batchrun::ERROR_EXIT_CODE)
        }
    }
}
