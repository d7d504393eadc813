//! Persistence layer.
//!
//! `RecordStore` is the contract the rest of the crate programs against.
//! `MemoryStore` backs tests and throwaway sessions; `JsonFileStore`
//! keeps the ledger in a JSON file, written to a temporary sibling and
//! renamed into place so that every mutation (a full restore included)
//! either lands completely or not at all.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::BetRecord;

/// Default ledger file path.
pub const DEFAULT_LEDGER_FILE: &str = "umalog_records.json";

const LEDGER_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Owner of the authoritative record list.
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore {
    /// All records, newest race day first. Records on the same day keep
    /// their insertion order.
    fn list(&self) -> Vec<BetRecord>;

    fn insert(&mut self, record: BetRecord) -> Result<()>;

    /// Replace the record with the same id. `false` if there is none.
    fn update(&mut self, record: BetRecord) -> Result<bool>;

    /// `false` if no record has this id.
    fn delete(&mut self, id: Uuid) -> Result<bool>;

    /// Swap the whole record set in one step.
    fn replace_all(&mut self, records: Vec<BetRecord>) -> Result<()>;
}

fn newest_first(records: &[BetRecord]) -> Vec<BetRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
}

fn with_inserted(records: &[BetRecord], record: BetRecord) -> Result<Vec<BetRecord>> {
    if records.iter().any(|r| r.id == record.id) {
        bail!("Record {} already exists", record.id);
    }
    let mut next = records.to_vec();
    next.push(record);
    Ok(next)
}

fn with_updated(records: &[BetRecord], record: BetRecord) -> Option<Vec<BetRecord>> {
    let pos = records.iter().position(|r| r.id == record.id)?;
    let mut next = records.to_vec();
    next[pos] = record;
    Some(next)
}

fn with_deleted(records: &[BetRecord], id: Uuid) -> Option<Vec<BetRecord>> {
    let pos = records.iter().position(|r| r.id == id)?;
    let mut next = records.to_vec();
    next.remove(pos);
    Some(next)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<BetRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<BetRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn list(&self) -> Vec<BetRecord> {
        newest_first(&self.records)
    }

    fn insert(&mut self, record: BetRecord) -> Result<()> {
        self.records = with_inserted(&self.records, record)?;
        Ok(())
    }

    fn update(&mut self, record: BetRecord) -> Result<bool> {
        match with_updated(&self.records, record) {
            Some(next) => {
                self.records = next;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&mut self, id: Uuid) -> Result<bool> {
        match with_deleted(&self.records, id) {
            Some(next) => {
                self.records = next;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn replace_all(&mut self, records: Vec<BetRecord>) -> Result<()> {
        self.records = records;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// On-disk layout of the ledger file.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    records: Vec<BetRecord>,
}

/// Ledger persisted as pretty-printed JSON.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Vec<BetRecord>,
}

impl JsonFileStore {
    /// Open the ledger at `path`, starting empty if the file does not
    /// exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!(path = %path.display(), "No ledger found, starting fresh");
            return Ok(Self {
                path,
                records: Vec::new(),
            });
        }

        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read ledger from {}", path.display()))?;
        let ledger: LedgerFile = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse ledger from {}", path.display()))?;

        info!(
            path = %path.display(),
            version = ledger.version,
            records = ledger.records.len(),
            "Ledger loaded from disk"
        );

        Ok(Self {
            path,
            records: ledger.records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `records` to disk; the in-memory list is only swapped by the
    /// caller after this succeeds.
    fn persist(&self, records: &[BetRecord]) -> Result<()> {
        let ledger = LedgerFile {
            version: LEDGER_VERSION,
            records: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&ledger).context("Failed to serialise ledger")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .with_context(|| format!("Failed to write ledger to {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move ledger into {}", self.path.display()))?;

        debug!(path = %self.path.display(), records = records.len(), "Ledger saved");
        Ok(())
    }

    fn commit(&mut self, next: Vec<BetRecord>) -> Result<()> {
        self.persist(&next)?;
        self.records = next;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn list(&self) -> Vec<BetRecord> {
        newest_first(&self.records)
    }

    fn insert(&mut self, record: BetRecord) -> Result<()> {
        let next = with_inserted(&self.records, record)?;
        self.commit(next)
    }

    fn update(&mut self, record: BetRecord) -> Result<bool> {
        match with_updated(&self.records, record) {
            Some(next) => self.commit(next).map(|_| true),
            None => Ok(false),
        }
    }

    fn delete(&mut self, id: Uuid) -> Result<bool> {
        match with_deleted(&self.records, id) {
            Some(next) => self.commit(next).map(|_| true),
            None => Ok(false),
        }
    }

    fn replace_all(&mut self, records: Vec<BetRecord>) -> Result<()> {
        let count = records.len();
        self.commit(records)?;
        info!(path = %self.path.display(), records = count, "Ledger replaced");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
