//! slugger - deploy a pre-built slug to a Heroku app.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slugger::output::Console;
use slugger::{error, CliError, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Prefer RUST_LOG, fall back to the verbosity flag
    let default_filter = if cli.verbose { "slugger=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut console = Console::stdio();
    if let Err(e) = cli.run(&mut console).await {
        error::print_error(&e);
        if e.downcast_ref::<CliError>().is_some_and(CliError::is_usage) {
            eprintln!();
            slugger::cli::print_usage();
        }
        std::process::exit(error::exit_code(&e));
    }
}
