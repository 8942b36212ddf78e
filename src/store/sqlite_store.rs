use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{DailyTemps, Observation, TempValue};

/// The persistence gateway the sync engine writes through.
///
/// The gateway owns the schema and makes each write durable before
/// returning; callers treat the store as exclusively theirs for the
/// duration of a sync pass.
pub trait ClimateStore {
    /// Every date with at least one stored observation, ascending.
    fn list_dates(&self) -> Result<Vec<NaiveDate>>;

    /// Insert the observation, or overwrite the stored one for the same
    /// date (last write wins).
    fn upsert(&self, observation: &Observation) -> Result<()>;

    /// Daily mean temperatures for one month, keyed by date. Values are
    /// returned as stored, missing-value markers included.
    fn month_means(&self, month: u32, year: i32) -> Result<BTreeMap<NaiveDate, TempValue>>;

    /// Mean temperatures grouped by calendar month across every year in
    /// the inclusive range. Missing-value markers are excluded; all twelve
    /// months are present even when empty.
    fn year_range_means(&self, start_year: i32, end_year: i32)
        -> Result<BTreeMap<u32, Vec<f64>>>;

    /// Delete every row except the highest-id copy of each exact
    /// (date, min, max, mean, location) tuple. Returns rows removed.
    fn dedupe_exact(&self) -> Result<usize>;

    /// Delete every stored observation. The store stays usable.
    fn purge(&self) -> Result<()>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS weather (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    sample_date TEXT NOT NULL,
    location TEXT,
    min_temp REAL,
    max_temp REAL,
    avg_temp REAL
);
CREATE INDEX IF NOT EXISTS idx_weather_sample_date ON weather (sample_date);
";

/// SQLite-backed store. Temperatures are stored with the column's REAL
/// affinity; the missing-value marker survives as TEXT, which is what the
/// aggregate queries filter on.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Every stored row as an observation, ordered by date then insertion
    /// order. Exact duplicates, if any, are all returned.
    pub fn all_observations(&self) -> Result<Vec<Observation>> {
        let mut stmt = self.conn.prepare(
            "SELECT sample_date, max_temp, min_temp, avg_temp, location
             FROM weather ORDER BY sample_date, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Observation {
                date: row.get(0)?,
                temps: DailyTemps {
                    max: row.get(1)?,
                    min: row.get(2)?,
                    mean: row.get(3)?,
                },
                location: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            })
        })?;

        let mut observations = Vec::new();
        for row in rows {
            observations.push(row?);
        }
        Ok(observations)
    }

    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM weather", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl ClimateStore for SqliteStore {
    fn list_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT sample_date FROM weather ORDER BY sample_date")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut dates = Vec::new();
        for row in rows {
            dates.push(row?);
        }
        Ok(dates)
    }

    fn upsert(&self, observation: &Observation) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE weather
             SET max_temp = ?1, min_temp = ?2, avg_temp = ?3, location = ?4
             WHERE sample_date = ?5",
            params![
                observation.temps.max,
                observation.temps.min,
                observation.temps.mean,
                observation.location,
                observation.date,
            ],
        )?;

        if updated == 0 {
            self.conn.execute(
                "INSERT INTO weather (sample_date, max_temp, min_temp, avg_temp, location)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    observation.date,
                    observation.temps.max,
                    observation.temps.min,
                    observation.temps.mean,
                    observation.location,
                ],
            )?;
        }
        Ok(())
    }

    fn month_means(&self, month: u32, year: i32) -> Result<BTreeMap<NaiveDate, TempValue>> {
        let pattern = format!("{:04}-{:02}-%", year, month);
        let mut stmt = self.conn.prepare(
            "SELECT sample_date, avg_temp FROM weather
             WHERE sample_date LIKE ?1 ORDER BY sample_date",
        )?;
        let rows = stmt.query_map(params![pattern], |row| {
            Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, TempValue>(1)?))
        })?;

        let mut means = BTreeMap::new();
        for row in rows {
            let (date, mean) = row?;
            means.insert(date, mean);
        }
        Ok(means)
    }

    fn year_range_means(
        &self,
        start_year: i32,
        end_year: i32,
    ) -> Result<BTreeMap<u32, Vec<f64>>> {
        let mut monthly: BTreeMap<u32, Vec<f64>> = (1..=12).map(|m| (m, Vec::new())).collect();

        let mut stmt = self.conn.prepare(
            "SELECT sample_date, avg_temp FROM weather
             WHERE sample_date >= ?1 AND sample_date <= ?2
             ORDER BY sample_date",
        )?;
        let rows = stmt.query_map(
            params![
                format!("{:04}-01-01", start_year),
                format!("{:04}-12-31", end_year),
            ],
            |row| Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, TempValue>(1)?)),
        )?;

        for row in rows {
            let (date, mean) = row?;
            // Markers stand for unrecorded readings and never enter an
            // aggregate.
            if let Some(deg) = mean.as_degrees() {
                monthly.entry(date.month()).or_default().push(deg);
            }
        }
        Ok(monthly)
    }

    fn dedupe_exact(&self) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM weather WHERE id NOT IN (
                 SELECT MAX(id) FROM weather
                 GROUP BY sample_date, min_temp, max_temp, avg_temp, location
             )",
            [],
        )?;
        Ok(deleted)
    }

    fn purge(&self) -> Result<()> {
        self.conn.execute("DELETE FROM weather", [])?;
        Ok(())
    }
}
