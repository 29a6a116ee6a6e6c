//! Binary entry point: parses arguments, sets up structured logging, and
//! dispatches into `clusterman-cli`.

use clap::Parser;
use clusterman_cli::cli::Cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("clusterman=info".parse().expect("static directive parses")))
        .json()
        .init();

    let cli = Cli::parse();
    let code = clusterman_cli::run(cli).await;
    std::process::exit(code);
}
