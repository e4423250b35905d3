use anyhow::Result;
use clap::Parser;
use flickerwatch::args::Cli;
use flickerwatch::{Config, driver, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_from_env();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = Config::load(cli.config.clone())?;
    cli.apply_overrides(&mut config);
    cli.validate(&config)?;

    driver::run(&config).await
}
