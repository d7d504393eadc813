//! Backup export and restore.
//!
//! Export writes every record through the CSV codec. Restore decodes a
//! backup and, only when at least one row survives, swaps the whole
//! record set in a single `replace_all`. Every failure path leaves the
//! store exactly as it was.

pub mod csv;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::storage::RecordStore;
use crate::types::ImportError;

pub const BACKUP_EXTENSION: &str = "csv";

/// `UmaLog_Backup_20260411_2130`, without extension.
pub fn backup_file_name(at: DateTime<FixedOffset>) -> String {
    format!("UmaLog_Backup_{}", at.format("%Y%m%d_%H%M"))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// A ready-to-write backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupExport {
    pub file_name: String,
    pub contents: String,
}

impl BackupExport {
    /// File name including the `.csv` extension.
    pub fn full_file_name(&self) -> String {
        format!("{}.{}", self.file_name, BACKUP_EXTENSION)
    }
}

pub fn export(store: &dyn RecordStore, at: DateTime<FixedOffset>) -> BackupExport {
    let records = store.list();
    let export = BackupExport {
        file_name: backup_file_name(at),
        contents: csv::encode(&records),
    };
    info!(file = %export.file_name, records = records.len(), "Backup prepared");
    export
}

/// Write a backup into `dir`, creating it if needed.
pub fn export_to_dir(store: &dyn RecordStore, dir: &Path, at: DateTime<FixedOffset>) -> Result<PathBuf> {
    let export = export(store, at);
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create backup directory {}", dir.display()))?;

    let path = dir.join(export.full_file_name());
    std::fs::write(&path, &export.contents)
        .with_context(|| format!("Failed to write backup to {}", path.display()))?;

    info!(path = %path.display(), "Backup written");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// What a successful restore did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    pub imported: usize,
    pub skipped: usize,
}

impl RestoreReport {
    pub fn title(&self) -> &'static str {
        "復元しました"
    }

    pub fn message(&self) -> String {
        format!("{}件の記録を読み込みました。", self.imported)
    }
}

/// Result of an import request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Restored { count: usize },
    /// No file was chosen. Nothing happens and nothing is reported.
    Cancelled,
}

pub fn restore_from_text(store: &mut dyn RecordStore, text: &str) -> Result<RestoreReport, ImportError> {
    let decoded = csv::decode(text);

    if decoded.data_rows == 0 {
        warn!("Backup has no data rows");
        return Err(ImportError::NoRecords);
    }
    if decoded.records.is_empty() {
        warn!(rows = decoded.data_rows, "Backup has no valid rows");
        return Err(ImportError::NoValidRecords {
            rows: decoded.data_rows,
        });
    }

    let report = RestoreReport {
        imported: decoded.records.len(),
        skipped: decoded.skipped_rows,
    };
    store.replace_all(decoded.records).map_err(ImportError::Store)?;

    info!(
        imported = report.imported,
        skipped = report.skipped,
        "Backup restored"
    );
    Ok(report)
}

pub fn restore_from_bytes(store: &mut dyn RecordStore, bytes: &[u8]) -> Result<RestoreReport, ImportError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ImportError::NotText)?;
    restore_from_text(store, text)
}

pub fn restore_from_file(store: &mut dyn RecordStore, path: &Path) -> Result<RestoreReport, ImportError> {
    let bytes = std::fs::read(path).map_err(ImportError::Unreadable)?;
    info!(path = %path.display(), bytes = bytes.len(), "Reading backup");
    restore_from_bytes(store, &bytes)
}

/// Restore from the chosen file, or do nothing when the selection was
/// cancelled.
pub fn import_selection(store: &mut dyn RecordStore, selection: Option<&Path>) -> Result<ImportOutcome, ImportError> {
    match selection {
        None => Ok(ImportOutcome::Cancelled),
        Some(path) => {
            let report = restore_from_file(store, path)?;
            Ok(ImportOutcome::Restored {
                count: report.imported,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, MockRecordStore};
    use crate::types::{start_of_day, BetRecord, PopularityBand, RaceGrade, TicketType};
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn sample(day: u32) -> BetRecord {
        BetRecord::new(
            start_of_day(NaiveDate::from_ymd_opt(2026, 3, day).unwrap(), &jst()),
            TicketType::Quinella,
            PopularityBand::Mid,
            RaceGrade::Graded,
            dec!(2000),
            dec!(0),
        )
    }

    fn backup_of(records: &[BetRecord]) -> String {
        csv::encode(records)
    }

    #[test]
    fn test_backup_file_name() {
        let at = jst().with_ymd_and_hms(2026, 4, 11, 21, 30, 59).unwrap();
        assert_eq!(backup_file_name(at), "UmaLog_Backup_20260411_2130");
    }

    #[test]
    fn test_export_uses_store_contents() {
        let store = MemoryStore::with_records(vec![sample(1), sample(2)]);
        let at = jst().with_ymd_and_hms(2026, 3, 3, 9, 5, 0).unwrap();
        let export = export(&store, at);
        assert_eq!(export.full_file_name(), "UmaLog_Backup_20260303_0905.csv");
        assert!(export.contents.starts_with(csv::HEADER));
        assert_eq!(export.contents.lines().count(), 3);
    }

    #[test]
    fn test_restore_replaces_everything() {
        let mut store = MemoryStore::with_records(vec![sample(9)]);
        let text = backup_of(&[sample(1), sample(2)]);
        let report = restore_from_text(&mut store, &text).unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.message(), "2件の記録を読み込みました。");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_restore_counts_skipped_rows() {
        let mut store = MemoryStore::new();
        let mut text = backup_of(&[sample(1)]);
        text.push_str("\n2026-03-02T15:00:00Z,単勝,本命,平場,abc,0");
        let report = restore_from_text(&mut store, &text).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_header_only_never_touches_store() {
        let mut store = MockRecordStore::new();
        store.expect_replace_all().never();
        let err = restore_from_text(&mut store, csv::HEADER).unwrap_err();
        assert!(matches!(err, ImportError::NoRecords));
        assert_eq!(err.to_string(), "記録が見つかりませんでした。");
    }

    #[test]
    fn test_all_rows_invalid_never_touches_store() {
        let mut store = MockRecordStore::new();
        store.expect_replace_all().never();
        let text = format!("{}\nyesterday,単勝,本命,平場,100,0\n,単勝", csv::HEADER);
        let err = restore_from_text(&mut store, &text).unwrap_err();
        assert!(matches!(err, ImportError::NoValidRecords { rows: 2 }));
        assert_eq!(err.title(), "読み込みに失敗しました");
    }

    #[test]
    fn test_non_utf8_never_touches_store() {
        let mut store = MockRecordStore::new();
        store.expect_replace_all().never();
        let err = restore_from_bytes(&mut store, &[0xff, 0xfe, 0x00, 0x81]).unwrap_err();
        assert!(matches!(err, ImportError::NotText));
    }

    #[test]
    fn test_store_failure_is_reported() {
        let mut store = MockRecordStore::new();
        store
            .expect_replace_all()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("disk full")));
        let err = restore_from_text(&mut store, &backup_of(&[sample(4)])).unwrap_err();
        assert!(matches!(err, ImportError::Store(_)));
        assert_eq!(err.title(), "復元に失敗しました");
        assert!(!err.to_string().contains("disk full"));
    }

    #[test]
    fn test_replace_all_receives_decoded_records() {
        let mut store = MockRecordStore::new();
        store
            .expect_replace_all()
            .withf(|records| records.len() == 3 && records.iter().all(|r| r.investment == dec!(2000)))
            .times(1)
            .returning(|_| Ok(()));
        let text = backup_of(&[sample(1), sample(2), sample(3)]);
        restore_from_text(&mut store, &text).unwrap();
    }

    #[test]
    fn test_cancelled_selection_is_silent() {
        let mut store = MockRecordStore::new();
        store.expect_replace_all().never();
        let outcome = import_selection(&mut store, None).unwrap();
        assert_eq!(outcome, ImportOutcome::Cancelled);
    }

    #[test]
    fn test_unreadable_file() {
        let mut store = MockRecordStore::new();
        store.expect_replace_all().never();
        let missing = std::env::temp_dir().join(format!("umalog_missing_{}.csv", uuid::Uuid::new_v4()));
        let err = import_selection(&mut store, Some(&missing)).unwrap_err();
        assert!(matches!(err, ImportError::Unreadable(_)));
    }

    #[test]
    fn test_export_then_import_through_files() {
        let dir = std::env::temp_dir().join(format!("umalog_backup_test_{}", uuid::Uuid::new_v4()));
        let source = MemoryStore::with_records(vec![sample(5), sample(6)]);
        let at = jst().with_ymd_and_hms(2026, 3, 7, 18, 0, 0).unwrap();
        let path = export_to_dir(&source, &dir, at).unwrap();
        assert!(path.ends_with("UmaLog_Backup_20260307_1800.csv"));

        let mut target = MemoryStore::new();
        let outcome = import_selection(&mut target, Some(&path)).unwrap();
        assert_eq!(outcome, ImportOutcome::Restored { count: 2 });
        assert_eq!(target.len(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
