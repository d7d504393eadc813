//! Mock record store for integration testing.
//!
//! Provides a deterministic `RecordStore` that keeps records in memory,
//! counts replacements, and can be told to fail every write.

use anyhow::{anyhow, Result};
use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use umalog::storage::{MemoryStore, RecordStore};
use umalog::types::{start_of_day, BetRecord, PopularityBand, RaceGrade, TicketType};

pub struct MockStore {
    inner: MemoryStore,
    replace_calls: Arc<Mutex<usize>>,
    /// If set, every write returns this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockStore {
    pub fn with_records(records: Vec<BetRecord>) -> Self {
        Self {
            inner: MemoryStore::with_records(records),
            replace_calls: Arc::new(Mutex::new(0)),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Force all subsequent writes to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn replace_calls(&self) -> usize {
        *self.replace_calls.lock().unwrap()
    }

    fn check(&self) -> Result<()> {
        match self.force_error.lock().unwrap().as_ref() {
            Some(msg) => Err(anyhow!("{msg}")),
            None => Ok(()),
        }
    }
}

impl RecordStore for MockStore {
    fn list(&self) -> Vec<BetRecord> {
        self.inner.list()
    }

    fn insert(&mut self, record: BetRecord) -> Result<()> {
        self.check()?;
        self.inner.insert(record)
    }

    fn update(&mut self, record: BetRecord) -> Result<bool> {
        self.check()?;
        self.inner.update(record)
    }

    fn delete(&mut self, id: Uuid) -> Result<bool> {
        self.check()?;
        self.inner.delete(id)
    }

    fn replace_all(&mut self, records: Vec<BetRecord>) -> Result<()> {
        *self.replace_calls.lock().unwrap() += 1;
        self.check()?;
        self.inner.replace_all(records)
    }
}

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

pub fn bet_on(
    day: u32,
    ticket: TicketType,
    band: PopularityBand,
    grade: RaceGrade,
    investment: Decimal,
    payout: Decimal,
) -> BetRecord {
    BetRecord::new(
        start_of_day(NaiveDate::from_ymd_opt(2026, 4, day).unwrap(), &jst()),
        ticket,
        band,
        grade,
        investment,
        payout,
    )
}

pub fn turf(mut record: BetRecord) -> BetRecord {
    record.course_surface = Some("芝".into());
    record
}
