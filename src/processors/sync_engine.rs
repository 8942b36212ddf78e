use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::Result;
use crate::models::{Observation, TempBatch};
use crate::store::ClimateStore;
use crate::utils::progress::{NoopProgress, ProgressSink};

/// What `sync` does with one scraped date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// Date not yet in the store.
    Insert,
    /// Date already stored; the batch's values win unconditionally.
    Update,
}

impl MergeDecision {
    pub fn for_date(known: &HashSet<NaiveDate>, date: NaiveDate) -> Self {
        if known.contains(&date) {
            MergeDecision::Update
        } else {
            MergeDecision::Insert
        }
    }
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Reconciles a scraped batch against the store.
///
/// The known-date set is read once per sync pass, not once per record.
/// Each record is written through individually, so a sync that fails
/// partway leaves the store valid and a re-run converges on the same
/// state (per-record idempotence).
pub struct SyncEngine<'a, S: ClimateStore + ?Sized> {
    store: &'a S,
    location: String,
    progress: Box<dyn ProgressSink>,
}

impl<'a, S: ClimateStore + ?Sized> SyncEngine<'a, S> {
    pub fn new(store: &'a S, location: impl Into<String>) -> Self {
        Self {
            store,
            location: location.into(),
            progress: Box::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Write every record in the batch, inserting unknown dates and
    /// overwriting known ones. Emits a 1-based running counter after each
    /// record and a completion signal after the last.
    pub fn sync(&self, batch: &TempBatch) -> Result<SyncReport> {
        let known: HashSet<NaiveDate> = self.store.list_dates()?.into_iter().collect();
        let mut report = SyncReport::default();

        for (index, (date, temps)) in batch.iter().enumerate() {
            let decision = MergeDecision::for_date(&known, *date);
            let observation = Observation::new(*date, temps.clone(), self.location.clone());
            self.store.upsert(&observation)?;

            match decision {
                MergeDecision::Insert => report.inserted += 1,
                MergeDecision::Update => report.updated += 1,
            }
            self.progress.on_progress(index as u64 + 1);
        }

        self.progress.on_complete();
        debug!(
            inserted = report.inserted,
            updated = report.updated,
            "sync finished"
        );
        Ok(report)
    }

    /// Post-hoc cleanup for accidental duplicate inserts; not part of a
    /// normal sync pass.
    pub fn dedupe(&self) -> Result<usize> {
        self.store.dedupe_exact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DailyTemps;
    use crate::store::SqliteStore;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(entries: &[(NaiveDate, (f64, f64, f64))]) -> TempBatch {
        entries
            .iter()
            .map(|(d, (max, min, mean))| (*d, DailyTemps::from_degrees(*max, *min, *mean)))
            .collect()
    }

    #[test]
    fn test_merge_decision_by_presence() {
        let known: HashSet<NaiveDate> = [date(2000, 1, 1)].into_iter().collect();
        assert_eq!(
            MergeDecision::for_date(&known, date(2000, 1, 1)),
            MergeDecision::Update
        );
        assert_eq!(
            MergeDecision::for_date(&known, date(2000, 1, 2)),
            MergeDecision::Insert
        );
    }

    #[test]
    fn test_sync_inserts_new_and_overwrites_existing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let engine = SyncEngine::new(&store, "Winnipeg, MB");

        engine
            .sync(&batch(&[(date(2000, 1, 1), (0.0, -10.0, -5.0))]))
            .unwrap();

        let report = engine
            .sync(&batch(&[
                (date(2000, 1, 1), (2.0, -4.0, -1.0)),
                (date(2000, 1, 2), (3.0, -3.0, 0.0)),
            ]))
            .unwrap();

        assert_eq!(report, SyncReport { inserted: 1, updated: 1 });
        assert_eq!(store.row_count().unwrap(), 2);

        let means = store.month_means(1, 2000).unwrap();
        assert_eq!(means[&date(2000, 1, 1)].as_degrees(), Some(-1.0));
        assert_eq!(means[&date(2000, 1, 2)].as_degrees(), Some(0.0));
    }

    #[test]
    fn test_sync_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let engine = SyncEngine::new(&store, "Winnipeg, MB");
        let batch = batch(&[
            (date(2000, 1, 1), (2.0, -4.0, -1.0)),
            (date(2000, 1, 2), (3.0, -3.0, 0.0)),
        ]);

        engine.sync(&batch).unwrap();
        let first = store.all_observations().unwrap();

        engine.sync(&batch).unwrap();
        let second = store.all_observations().unwrap();

        assert_eq!(first, second);
        assert_eq!(store.row_count().unwrap(), 2);
    }

    #[test]
    fn test_sync_progress_counter_is_one_based_and_contiguous() {
        struct Recorder {
            counts: RefCell<Vec<u64>>,
            completed: Cell<bool>,
        }
        impl ProgressSink for &Recorder {
            fn on_progress(&self, counter: u64) {
                self.counts.borrow_mut().push(counter);
            }
            fn on_complete(&self) {
                self.completed.set(true);
            }
        }

        let recorder: &'static Recorder = Box::leak(Box::new(Recorder {
            counts: RefCell::new(Vec::new()),
            completed: Cell::new(false),
        }));

        let store = SqliteStore::open_in_memory().unwrap();
        let engine = SyncEngine::new(&store, "Winnipeg, MB").with_progress(Box::new(recorder));

        engine
            .sync(&batch(&[
                (date(2000, 1, 1), (2.0, -4.0, -1.0)),
                (date(2000, 1, 2), (3.0, -3.0, 0.0)),
                (date(2000, 1, 3), (4.0, -2.0, 1.0)),
            ]))
            .unwrap();

        assert_eq!(*recorder.counts.borrow(), vec![1, 2, 3]);
        assert!(recorder.completed.get());
    }

    #[test]
    fn test_sync_applies_location_tag() {
        let store = SqliteStore::open_in_memory().unwrap();
        let engine = SyncEngine::new(&store, "Winnipeg, MB");

        engine
            .sync(&batch(&[(date(2000, 1, 1), (2.0, -4.0, -1.0))]))
            .unwrap();

        let all = store.all_observations().unwrap();
        assert_eq!(all[0].location, "Winnipeg, MB");
    }

    #[test]
    fn test_dedupe_delegates_to_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let engine = SyncEngine::new(&store, "Winnipeg, MB");

        engine
            .sync(&batch(&[(date(2000, 1, 1), (2.0, -4.0, -1.0))]))
            .unwrap();
        // One sync never creates duplicates, so there is nothing to remove.
        assert_eq!(engine.dedupe().unwrap(), 0);
    }
}
