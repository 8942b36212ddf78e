use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Unexpected table format: {0}")]
    Format(String),

    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON export error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Whether a crawl may skip past this error and keep going.
    ///
    /// Only fetch failures are recoverable; a format error means the source
    /// markup no longer matches our assumptions and the crawl must stop.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScrapeError::Fetch(_))
    }
}
