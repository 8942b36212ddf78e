use anyhow::Result;
use clap::Parser;
use climate_scraper::cli::{run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)?;
    Ok(())
}
