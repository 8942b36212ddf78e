use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::constants::{DEFAULT_DB_FILE, DEFAULT_LOCATION, DEFAULT_STATION_ID};

#[derive(Parser)]
#[command(name = "climate-scraper")]
#[command(about = "Scrape daily climate observations into a local SQLite store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, default_value = DEFAULT_DB_FILE, help = "SQLite database file")]
    pub db: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the full history back to the oldest available page
    Download {
        #[arg(short, long, default_value_t = DEFAULT_STATION_ID)]
        station_id: u32,

        #[arg(short, long, default_value = DEFAULT_LOCATION)]
        location: String,

        #[arg(long, help = "Stop after this many pages")]
        max_pages: Option<u64>,
    },

    /// Fetch only the months newer than the latest stored observation
    Update {
        #[arg(short, long, default_value_t = DEFAULT_STATION_ID)]
        station_id: u32,

        #[arg(short, long, default_value = DEFAULT_LOCATION)]
        location: String,
    },

    /// Show stored daily mean temperatures for one month
    Month {
        #[arg(help = "Month number (1-12)")]
        month: u32,

        #[arg(help = "Four-digit year")]
        year: i32,
    },

    /// Show monthly mean-temperature aggregates across a year range
    Range {
        #[arg(help = "First year of the range")]
        start_year: i32,

        #[arg(help = "Last year of the range")]
        end_year: i32,
    },

    /// Export all stored observations to CSV or JSON
    Export {
        #[arg(short, long, default_value = "weather.csv")]
        output: PathBuf,

        #[arg(short, long, default_value = "csv", help = "Output format: csv or json")]
        format: String,
    },

    /// Remove exact-duplicate stored rows, keeping the newest copy
    Dedupe,

    /// Delete every stored observation
    Purge,
}
