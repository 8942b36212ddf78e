pub mod observation;

pub use observation::{DailyTemps, Observation, TempBatch, TempValue};
