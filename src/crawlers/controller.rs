use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::error::Result;
use crate::fetchers::{PageFetcher, PageRequest};
use crate::models::TempBatch;
use crate::parsers::parse_daily_table;
use crate::utils::progress::{NoopProgress, ProgressSink};

/// The month a crawl is about to request. Only ever steps backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    pub year: i32,
    pub month: u32,
}

impl MonthCursor {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// January wraps to December of the prior year.
    pub fn step_back(&mut self) {
        if self.month == 1 {
            self.month = 12;
            self.year -= 1;
        } else {
            self.month -= 1;
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        self.year == date.year() && self.month == date.month()
    }
}

/// Walks the paginated table backward one month per page, parsing each page
/// and folding the rows into a single batch.
///
/// Transient fetch failures are logged and skipped; the cursor has already
/// advanced, so a persistently failing month cannot stall the walk. A
/// format error from the parser aborts the crawl, because every page after
/// a layout change would be equally untrustworthy.
pub struct CrawlController<F> {
    fetcher: F,
    progress: Box<dyn ProgressSink>,
    max_pages: Option<u64>,
}

impl<F: PageFetcher> CrawlController<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            progress: Box::new(NoopProgress),
            max_pages: None,
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Cap the number of pages a crawl may touch. The crawl itself has no
    /// deadline; callers needing bounded latency set this.
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Crawl from `start` back to the oldest available page, stopping when a
    /// page reports that no previous page exists.
    pub fn full_crawl(&self, start: NaiveDate) -> Result<TempBatch> {
        self.crawl(start, None)
    }

    /// Crawl from `start` back to `until`'s month inclusive. The boundary
    /// check happens before the final fetch, so the boundary month is
    /// fetched exactly once. Callers are expected to have checked that the
    /// store is not already current.
    pub fn incremental_crawl(&self, start: NaiveDate, until: NaiveDate) -> Result<TempBatch> {
        self.crawl(start, Some(until))
    }

    fn crawl(&self, start: NaiveDate, until: Option<NaiveDate>) -> Result<TempBatch> {
        let day = start.day();
        let mut cursor = MonthCursor::from_date(start);
        let mut batch = TempBatch::new();
        let mut pages: u64 = 0;
        let mut attempts: u64 = 0;

        loop {
            let final_page = until.is_some_and(|date| cursor.matches(date));
            attempts += 1;
            let request = PageRequest {
                year: cursor.year,
                month: cursor.month,
                day,
            };
            cursor.step_back();

            match self.fetcher.fetch(&request) {
                Ok(html) => {
                    let parsed = parse_daily_table(&html)?;
                    debug!(
                        year = request.year,
                        month = request.month,
                        rows = parsed.temps.len(),
                        "parsed page"
                    );

                    // Pages don't overlap in practice; a later page simply
                    // overwrites any date it shares with an earlier one.
                    batch.extend(parsed.temps);

                    pages += 1;
                    self.progress.on_progress(pages);

                    if parsed.last_page {
                        break;
                    }
                }
                Err(err) if err.is_transient() => {
                    warn!(
                        year = request.year,
                        month = request.month,
                        error = %err,
                        "page fetch failed, skipping month"
                    );
                }
                Err(err) => return Err(err),
            }

            if final_page {
                break;
            }
            if self.max_pages.is_some_and(|cap| attempts >= cap) {
                warn!(attempts, "page cap reached, stopping crawl early");
                break;
            }
        }

        Ok(batch)
    }
}
