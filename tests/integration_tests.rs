use std::cell::RefCell;

use chrono::NaiveDate;
use climate_scraper::crawlers::CrawlController;
use climate_scraper::error::Result;
use climate_scraper::fetchers::{PageFetcher, PageRequest};
use climate_scraper::models::{DailyTemps, TempValue};
use climate_scraper::processors::SyncEngine;
use climate_scraper::store::{ClimateStore, SqliteStore};
use climate_scraper::writers::{CsvWriter, JsonWriter};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const LOCATION: &str = "Winnipeg, MB";

fn data_row(title: &str, max: &str, min: &str, mean: &str) -> String {
    format!(
        r#"<tr><th scope="row"><abbr title="{title}">1</abbr></th><td>{max}</td><td>{min}</td><td>{mean}</td></tr>"#
    )
}

fn page_html(rows: &str, last_page: bool) -> String {
    let nav = if last_page {
        r##"<ul><li><a href="#" class="previous disabled">Previous</a></li></ul>"##
    } else {
        r##"<ul><li><a href="#" class="previous">Previous</a></li></ul>"##
    };
    format!("<html><body><table><tbody>{rows}</tbody></table>{nav}</body></html>")
}

struct ScriptedFetcher {
    pages: RefCell<Vec<String>>,
    fetches: RefCell<usize>,
}

impl ScriptedFetcher {
    fn new(pages: Vec<String>) -> Self {
        Self {
            pages: RefCell::new(pages),
            fetches: RefCell::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        *self.fetches.borrow()
    }
}

impl PageFetcher for &ScriptedFetcher {
    fn fetch(&self, _request: &PageRequest) -> Result<String> {
        *self.fetches.borrow_mut() += 1;
        let mut pages = self.pages.borrow_mut();
        assert!(!pages.is_empty(), "crawl fetched more pages than scripted");
        Ok(pages.remove(0))
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_full_pipeline_crawl_sync_store() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = SqliteStore::open(temp_dir.path().join("weather.sqlite")).unwrap();

    let october = format!(
        "{}{}",
        data_row("October 30, 1996", "-1.0", "-9.5", "-5.3"),
        data_row("October 31, 1996", "-3.5", "-12.8", "-8.2"),
    );
    let september = data_row("September 30, 1996", "10.1", "2.2", "M");

    let fetcher = ScriptedFetcher::new(vec![
        page_html(&october, false),
        page_html(&september, true),
    ]);

    let batch = CrawlController::new(&fetcher)
        .full_crawl(date(1996, 10, 19))
        .unwrap();

    // The last-page flag terminated the crawl after exactly two pages.
    assert_eq!(fetcher.fetch_count(), 2);
    assert_eq!(batch.len(), 3);

    let report = SyncEngine::new(&store, LOCATION).sync(&batch).unwrap();
    assert_eq!(report.inserted, 3);
    assert_eq!(report.updated, 0);

    let stored = store.all_observations().unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].date, date(1996, 9, 30));
    assert_eq!(stored[0].temps.mean, TempValue::Missing("M".to_string()));
    assert_eq!(
        stored[2].temps,
        DailyTemps::from_degrees(-3.5, -12.8, -8.2)
    );
    assert!(stored.iter().all(|obs| obs.location == LOCATION));

    // The marker never reaches an aggregate.
    let monthly = store.year_range_means(1996, 1996).unwrap();
    assert!(monthly[&9].is_empty());
    assert_eq!(monthly[&10], vec![-5.3, -8.2]);
}

#[test]
fn test_resync_same_batch_is_idempotent() {
    let store = SqliteStore::open_in_memory().unwrap();

    let rows = data_row("October 31, 1996", "-3.5", "-12.8", "-8.2");
    let fetcher = ScriptedFetcher::new(vec![page_html(&rows, true)]);
    let batch = CrawlController::new(&fetcher)
        .full_crawl(date(1996, 10, 19))
        .unwrap();

    let engine = SyncEngine::new(&store, LOCATION);
    engine.sync(&batch).unwrap();
    let before = store.all_observations().unwrap();

    let report = engine.sync(&batch).unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(store.all_observations().unwrap(), before);
}

#[test]
fn test_incremental_update_flow() {
    let store = SqliteStore::open_in_memory().unwrap();
    let engine = SyncEngine::new(&store, LOCATION);

    // The store already holds the end of October.
    let seeded: climate_scraper::models::TempBatch =
        [(date(1996, 10, 31), DailyTemps::from_degrees(-3.5, -12.8, -8.2))]
            .into_iter()
            .collect();
    engine.sync(&seeded).unwrap();

    // An update two months later walks December and November, then the
    // boundary month October, and stops.
    let fetcher = ScriptedFetcher::new(vec![
        page_html(&data_row("December 15, 1996", "-12.0", "-21.0", "-16.5"), false),
        page_html(&data_row("November 30, 1996", "-8.0", "-15.0", "-11.5"), false),
        page_html(&data_row("October 31, 1996", "-3.0", "-12.0", "-7.5"), false),
    ]);

    let latest = *store.list_dates().unwrap().last().unwrap();
    let batch = CrawlController::new(&fetcher)
        .incremental_crawl(date(1996, 12, 15), latest)
        .unwrap();

    assert_eq!(fetcher.fetch_count(), 3);

    let report = engine.sync(&batch).unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.updated, 1);

    // The re-scraped boundary day carries the batch's values, not the old
    // stored ones.
    let means = store.month_means(10, 1996).unwrap();
    assert_eq!(means[&date(1996, 10, 31)].as_degrees(), Some(-7.5));
}

#[test]
fn test_export_written_observations() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = SqliteStore::open_in_memory().unwrap();
    let engine = SyncEngine::new(&store, LOCATION);

    let batch: climate_scraper::models::TempBatch = [
        (date(1996, 10, 30), DailyTemps::from_degrees(-1.0, -9.5, -5.3)),
        (date(1996, 10, 31), DailyTemps::from_degrees(-3.5, -12.8, -8.2)),
    ]
    .into_iter()
    .collect();
    engine.sync(&batch).unwrap();

    let output = temp_dir.path().join("weather.csv");
    let observations = store.all_observations().unwrap();
    CsvWriter::new()
        .write_observations(&observations, &output)
        .unwrap();

    let contents = std::fs::read_to_string(&output).unwrap();
    assert_eq!(contents.lines().count(), 3); // header + two rows
    assert!(contents.contains("1996-10-31,-3.5,-12.8,-8.2"));

    // The JSON export round-trips the same stored observations.
    let json_output = temp_dir.path().join("weather.json");
    JsonWriter::new()
        .write_observations(&observations, &json_output)
        .unwrap();
    let parsed: Vec<climate_scraper::models::Observation> =
        serde_json::from_str(&std::fs::read_to_string(&json_output).unwrap()).unwrap();
    assert_eq!(parsed, observations);
}
