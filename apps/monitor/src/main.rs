#![warn(clippy::all)]

use clap::Parser;

mod cli;

use cli::Cli;
use uppe_monitor::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_ref())?;

    cli::execute(cli.command, config).await
}
