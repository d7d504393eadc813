//! Backup export and restore, end to end.

use rust_decimal_macros::dec;
use uuid::Uuid;

use umalog::backup::{self, csv, ImportOutcome};
use umalog::storage::{JsonFileStore, RecordStore};
use umalog::types::{BetRecord, ImportError, PopularityBand, RaceGrade, TicketType};

use crate::mock_store::{bet_on, jst, turf, MockStore};

fn detailed_record() -> BetRecord {
    let mut r = turf(bet_on(
        12,
        TicketType::Trifecta,
        PopularityBand::DarkHorse,
        RaceGrade::G1,
        dec!(3000),
        dec!(125400),
    ));
    r.racecourse = Some("中山".into());
    r.race_number = Some("11".into());
    r.horse_number = Some("4-9-13".into());
    r.jockey_name = Some("横山武史".into());
    r.horse_name = Some("ドウデュース".into());
    r.race_time_detail = Some("15:40".into());
    r.course_direction = Some("右回り".into());
    r.course_length = Some("2500".into());
    r.weather = Some("晴".into());
    r.track_condition = Some("良".into());
    r.memo = Some("line1,\"quoted\",line2\nline3".into());
    r
}

fn without_id(mut record: BetRecord) -> BetRecord {
    record.id = Uuid::nil();
    record
}

#[test]
fn test_round_trip_preserves_everything_but_ids() {
    let originals = vec![
        detailed_record(),
        bet_on(3, TicketType::Place, PopularityBand::Mid, RaceGrade::Flat, dec!(500), dec!(0)),
    ];
    let decoded = csv::decode(&csv::encode(&originals));

    assert_eq!(decoded.skipped_rows, 0);
    assert_eq!(decoded.records.len(), 2);
    for (original, restored) in originals.iter().zip(&decoded.records) {
        assert_ne!(original.id, restored.id);
        assert_eq!(without_id(original.clone()), without_id(restored.clone()));
    }
}

#[test]
fn test_restore_replaces_existing_records() {
    let mut store = MockStore::with_records(vec![
        bet_on(1, TicketType::Win, PopularityBand::Favorite, RaceGrade::Flat, dec!(100), dec!(0)),
    ]);
    let text = csv::encode(&[detailed_record()]);

    let report = backup::restore_from_text(&mut store, &text).unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(store.replace_calls(), 1);

    let records = store.list();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].horse_name.as_deref(), Some("ドウデュース"));
}

#[test]
fn test_store_failure_keeps_previous_records() {
    let existing = bet_on(1, TicketType::Win, PopularityBand::Favorite, RaceGrade::Flat, dec!(100), dec!(0));
    let mut store = MockStore::with_records(vec![existing.clone()]);
    store.set_error("disk full");

    let err = backup::restore_from_text(&mut store, &csv::encode(&[detailed_record()])).unwrap_err();
    assert!(matches!(err, ImportError::Store(_)));
    assert_eq!(store.list(), vec![existing]);
}

#[test]
fn test_header_only_is_no_records_found() {
    let mut store = MockStore::with_records(Vec::new());
    let err = backup::restore_from_text(&mut store, &format!("{}\n", csv::HEADER)).unwrap_err();
    assert!(matches!(err, ImportError::NoRecords));
    assert_eq!(store.replace_calls(), 0);

    let err = backup::restore_from_text(&mut store, "").unwrap_err();
    assert!(matches!(err, ImportError::NoRecords));
}

#[test]
fn test_missing_trailing_columns_are_absent() {
    let text = format!("{}\n2026-04-11T15:00:00Z,\"馬連\",\"中穴\",\"重賞\",1200,0,\"東京\"", csv::HEADER);
    let decoded = csv::decode(&text);
    let record = &decoded.records[0];

    assert_eq!(record.ticket_type, TicketType::Quinella);
    assert_eq!(record.racecourse.as_deref(), Some("東京"));
    assert_eq!(record.race_number, None);
    assert_eq!(record.memo, None);
}

#[test]
fn test_invalid_rows_are_dropped_individually() {
    let text = [
        csv::HEADER,
        "2026-04-11T15:00:00Z,\"単勝\",\"中穴\",\"平場\",abc,0",
        "not-a-date,\"単勝\",\"中穴\",\"平場\",100,0",
        "2026-04-11T15:00:00Z,\"三連系\",\"本命\",\"G2\",800,-50",
    ]
    .join("\n");

    let mut store = MockStore::with_records(Vec::new());
    let report = backup::restore_from_text(&mut store, &text).unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 2);

    let record = &store.list()[0];
    assert_eq!(record.ticket_type, TicketType::Trio);
    assert_eq!(record.popularity_band, PopularityBand::Mid);
    assert_eq!(record.race_grade, RaceGrade::Flat);
    assert_eq!(record.payout, dec!(0));
}

#[test]
fn test_export_then_restore_into_json_ledger() {
    let root = std::env::temp_dir().join(format!("umalog_it_{}", Uuid::new_v4()));
    let ledger_path = root.join("ledger.json");

    let mut source = MockStore::with_records(Vec::new());
    source.insert(detailed_record()).unwrap();
    let at = chrono::Utc::now().with_timezone(&jst());
    let backup_path = backup::export_to_dir(&source, &root.join("backups"), at).unwrap();

    {
        let mut ledger = JsonFileStore::open(&ledger_path).unwrap();
        ledger
            .insert(bet_on(2, TicketType::Wide, PopularityBand::Mid, RaceGrade::Flat, dec!(200), dec!(0)))
            .unwrap();
        let outcome = backup::import_selection(&mut ledger, Some(&backup_path)).unwrap();
        assert_eq!(outcome, ImportOutcome::Restored { count: 1 });
    }

    let reopened = JsonFileStore::open(&ledger_path).unwrap();
    let records = reopened.list();
    assert_eq!(records.len(), 1);
    assert_eq!(without_id(records[0].clone()), without_id(detailed_record()));

    std::fs::remove_dir_all(&root).unwrap();
}
