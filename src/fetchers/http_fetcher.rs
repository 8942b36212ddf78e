use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::Result;
use crate::utils::constants::{
    DAILY_DATA_URL, FETCH_TIMEOUT_SECS, QUERY_END_YEAR, QUERY_START_YEAR,
};

/// Coordinates of one month's page.
///
/// The service keys a page by year and month; the day is carried in the URL
/// but does not change which page comes back, so a crawl holds it fixed at
/// its original start day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Source of raw page markup. The crawl controller only sees this seam, so
/// tests substitute scripted pages for the live service.
pub trait PageFetcher {
    fn fetch(&self, request: &PageRequest) -> Result<String>;
}

/// Fetches pages from the climate service over blocking HTTP.
pub struct HttpPageFetcher {
    client: Client,
    base_url: String,
    station_id: u32,
}

impl HttpPageFetcher {
    pub fn new(station_id: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: DAILY_DATA_URL.to_string(),
            station_id,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn page_url(&self, request: &PageRequest) -> String {
        format!(
            "{}?StationID={}&timeframe=2&StartYear={}&EndYear={}&Day={}&Year={}&Month={}",
            self.base_url,
            self.station_id,
            QUERY_START_YEAR,
            QUERY_END_YEAR,
            request.day,
            request.year,
            request.month,
        )
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, request: &PageRequest) -> Result<String> {
        let url = self.page_url(request);
        let body = self
            .client
            .get(&url)
            .send()?
            .error_for_status()?
            .text()?;
        Ok(body)
    }
}
