mod app;
mod channel;
mod cli;
mod commands;
mod config;
mod deck;
mod keys;
mod nav;
mod parser;
mod protocol;
mod render;
mod sync;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    cli.run()
}
