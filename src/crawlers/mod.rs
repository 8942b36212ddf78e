pub mod controller;

pub use controller::{CrawlController, MonthCursor};
