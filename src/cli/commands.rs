use chrono::Local;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::args::{Cli, Commands};
use crate::crawlers::CrawlController;
use crate::error::{Result, ScrapeError};
use crate::fetchers::HttpPageFetcher;
use crate::processors::SyncEngine;
use crate::store::{ClimateStore, SqliteStore};
use crate::utils::constants::DEFAULT_LOCATION;
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, JsonWriter};

pub fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose);

    let store = SqliteStore::open(&cli.db)?;

    match cli.command {
        Commands::Download {
            station_id,
            location,
            max_pages,
        } => {
            println!("Downloading full history for station {station_id}...");

            let fetcher = HttpPageFetcher::new(station_id)?;
            let crawl_progress = ProgressReporter::new_spinner("Fetching monthly pages", false);
            let mut controller =
                CrawlController::new(fetcher).with_progress(Box::new(crawl_progress));
            if let Some(cap) = max_pages {
                controller = controller.with_max_pages(cap);
            }

            let today = Local::now().date_naive();
            let batch = controller.full_crawl(today)?;
            println!("Fetched {} daily observations", batch.len());

            let sync_progress = ProgressReporter::new_spinner("Writing observations", false);
            let report = SyncEngine::new(&store, location)
                .with_progress(Box::new(sync_progress))
                .sync(&batch)?;
            println!(
                "Sync complete: {} inserted, {} updated",
                report.inserted, report.updated
            );
        }

        Commands::Update {
            station_id,
            location,
        } => {
            let dates = store.list_dates()?;
            let today = Local::now().date_naive();

            if dates.contains(&today) {
                println!("Store is already up to date ({today})");
                return Ok(());
            }

            let fetcher = HttpPageFetcher::new(station_id)?;
            let crawl_progress = ProgressReporter::new_spinner("Fetching monthly pages", false);
            let controller =
                CrawlController::new(fetcher).with_progress(Box::new(crawl_progress));

            let batch = match dates.last() {
                Some(latest) => {
                    println!("Updating from {latest} forward...");
                    controller.incremental_crawl(today, *latest)?
                }
                None => {
                    println!("Store is empty, downloading full history...");
                    controller.full_crawl(today)?
                }
            };
            println!("Fetched {} daily observations", batch.len());

            let sync_progress = ProgressReporter::new_spinner("Writing observations", false);
            let report = SyncEngine::new(&store, location)
                .with_progress(Box::new(sync_progress))
                .sync(&batch)?;
            println!(
                "Sync complete: {} inserted, {} updated",
                report.inserted, report.updated
            );
        }

        Commands::Month { month, year } => {
            if !(1..=12).contains(&month) {
                return Err(ScrapeError::Config(format!(
                    "month must be between 1 and 12, got {month}"
                )));
            }

            let means = store.month_means(month, year)?;
            if means.is_empty() {
                println!("No observations stored for {year}-{month:02}");
            }
            for (date, mean) in means {
                println!("{date}  {mean}");
            }
        }

        Commands::Range {
            start_year,
            end_year,
        } => {
            if start_year > end_year {
                return Err(ScrapeError::Config(format!(
                    "start year {start_year} is after end year {end_year}"
                )));
            }

            let monthly = store.year_range_means(start_year, end_year)?;
            println!("Monthly mean temperatures, {start_year}-{end_year}:");
            for (month, temps) in &monthly {
                if temps.is_empty() {
                    println!("{month:>3}: no data");
                } else {
                    let avg = temps.iter().sum::<f64>() / temps.len() as f64;
                    println!("{month:>3}: {:>4} days, mean {avg:.1} °C", temps.len());
                }
            }
        }

        Commands::Export { output, format } => {
            let observations = store.all_observations()?;
            match format.as_str() {
                "csv" => CsvWriter::new().write_observations(&observations, &output)?,
                "json" => JsonWriter::new().write_observations(&observations, &output)?,
                other => {
                    return Err(ScrapeError::Config(format!(
                        "unsupported export format: {other} (expected csv or json)"
                    )));
                }
            }
            println!(
                "Exported {} observations to {}",
                observations.len(),
                output.display()
            );
        }

        Commands::Dedupe => {
            let removed = SyncEngine::new(&store, DEFAULT_LOCATION).dedupe()?;
            println!("Removed {removed} duplicate rows");
        }

        Commands::Purge => {
            store.purge()?;
            println!("All observations deleted");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder().with_env_filter(env).init();
}
