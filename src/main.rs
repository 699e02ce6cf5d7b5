use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;

use wholesale_portal::cli::Cli;
use wholesale_portal::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
