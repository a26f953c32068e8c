use std::process::ExitCode;

use clap::Parser;
use flashcard_maker::cli::Cli;
use flashcard_maker::config::Config;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    flashcard_maker::init_tracing(cli.debug);

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(?config, "configuration loaded");

    match flashcard_maker::run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
