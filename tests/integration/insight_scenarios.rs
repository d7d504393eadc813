//! Loss attribution and worst-pattern scenarios over realistic ledgers.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use umalog::analysis::{
    daily_totals, find_loss_insight, loss_insight_text, ticket_type_breakdown, worst_popularity_pattern, Summary,
    NO_INSIGHT_MESSAGE,
};
use umalog::amount::AmountLocale;
use umalog::backup::csv;
use umalog::types::{PopularityBand, RaceGrade, TicketType, MAX_AMOUNT};

use crate::mock_store::{bet_on, jst, turf};

#[test]
fn test_turf_favourite_losses() {
    let records = vec![
        turf(bet_on(5, TicketType::Win, PopularityBand::Favorite, RaceGrade::Flat, dec!(1000), dec!(200))),
        turf(bet_on(5, TicketType::Win, PopularityBand::Favorite, RaceGrade::Flat, dec!(1000), dec!(100))),
        bet_on(6, TicketType::Place, PopularityBand::DarkHorse, RaceGrade::Flat, dec!(500), dec!(600)),
    ];

    let insight = find_loss_insight(&records).unwrap();
    assert_eq!(insight.race_descriptor, "芝のレース");
    assert!(insight.bet_descriptor.starts_with("単勝"));
    assert_eq!(insight.bet_descriptor, "単勝の1〜3番人気狙い");
    assert_eq!(insight.losing_records, 2);
    assert_eq!(
        loss_insight_text(&records),
        "芝のレースで、単勝の1〜3番人気狙いが負けがちです。"
    );
}

#[test]
fn test_no_insight_without_losses() {
    let records = vec![
        turf(bet_on(5, TicketType::Win, PopularityBand::Favorite, RaceGrade::Flat, dec!(1000), dec!(1000))),
        turf(bet_on(6, TicketType::Wide, PopularityBand::Mid, RaceGrade::G1, dec!(500), dec!(2300))),
    ];
    assert!(find_loss_insight(&records).is_none());
    assert_eq!(loss_insight_text(&records), NO_INSIGHT_MESSAGE);
    assert!(worst_popularity_pattern(&records).is_none());
}

#[test]
fn test_detailed_ledger_prefers_segment_and_grade() {
    let mut records = Vec::new();
    for (day, payout) in [(1, dec!(0)), (2, dec!(300)), (3, dec!(0))] {
        let mut r = bet_on(day, TicketType::Quinella, PopularityBand::Mid, RaceGrade::G1, dec!(2000), payout);
        r.race_number = Some("11".into());
        r.course_surface = Some("ダート".into());
        r.weather = Some("雨".into());
        r.horse_number = Some("2-8".into());
        records.push(r);
    }
    // A big winner in the same conditions does not enter the mining.
    let mut winner = bet_on(4, TicketType::Quinella, PopularityBand::Mid, RaceGrade::G1, dec!(2000), dec!(30000));
    winner.race_number = Some("11".into());
    records.push(winner);

    let insight = find_loss_insight(&records).unwrap();
    assert_eq!(insight.race_descriptor, "後半レース（ダート・雨）");
    // Band, grade and selection size all lose the same; the band appears first.
    assert_eq!(insight.bet_descriptor, "馬連の中穴狙い");
    assert_eq!(insight.losing_records, 3);
}

#[test]
fn test_insight_is_stable_across_runs_and_backups() {
    let records = vec![
        turf(bet_on(5, TicketType::Exacta, PopularityBand::DarkHorse, RaceGrade::Graded, dec!(700), dec!(0))),
        turf(bet_on(7, TicketType::Trio, PopularityBand::DarkHorse, RaceGrade::Graded, dec!(700), dec!(0))),
    ];
    let first = loss_insight_text(&records);
    assert_eq!(first, loss_insight_text(&records));

    let restored = csv::decode(&csv::encode(&records)).records;
    assert_eq!(first, loss_insight_text(&restored));
}

#[test]
fn test_worst_pattern_counts_winners_too() {
    let records = vec![
        bet_on(1, TicketType::Win, PopularityBand::Favorite, RaceGrade::Flat, dec!(1000), dec!(0)),
        bet_on(1, TicketType::Win, PopularityBand::Favorite, RaceGrade::Flat, dec!(1000), dec!(1900)),
        bet_on(2, TicketType::Win, PopularityBand::DarkHorse, RaceGrade::Flat, dec!(300), dec!(0)),
        bet_on(2, TicketType::Win, PopularityBand::DarkHorse, RaceGrade::Flat, dec!(300), dec!(0)),
    ];
    let worst = worst_popularity_pattern(&records).unwrap();
    assert_eq!(worst.band, PopularityBand::DarkHorse);
    assert_eq!(worst.message(), "穴 で最も負けています");
    assert_eq!(worst.detail(), "同じ買い方で 2 件記録。回収率 0%。");
}

#[test]
fn test_hand_edited_backup_with_huge_amounts() {
    let huge = "70000000000000000000000000000";
    let text = format!(
        "{header}\n\
         2026-04-05T15:00:00Z,\"単勝\",\"中穴\",\"平場\",{huge},0,,,,,,,\"芝\"\n\
         2026-04-06T15:00:00Z,\"単勝\",\"中穴\",\"平場\",{huge},0,,,,,,,\"芝\"\n\
         2026-04-07T15:00:00Z,\"単勝\",\"中穴\",\"平場\",{max},0,,,,,,,\"芝\"\n\
         2026-04-08T15:00:00Z,\"単勝\",\"中穴\",\"平場\",{max},0,,,,,,,\"芝\"\n",
        header = csv::HEADER,
        max = MAX_AMOUNT,
    );

    let decoded = csv::decode(&text);
    assert_eq!(decoded.records.len(), 2);
    assert_eq!(decoded.skipped_rows, 2);

    let records = decoded.records;
    assert_eq!(loss_insight_text(&records), "芝のレースで、単勝の中穴狙いが負けがちです。");
    assert_eq!(worst_popularity_pattern(&records).unwrap().loss, MAX_AMOUNT * dec!(2));
    assert_eq!(Summary::of(&records).total_investment, MAX_AMOUNT * dec!(2));
}

#[test]
fn test_amounts_beyond_decimal_range_do_not_break_analysis() {
    // Ledger files are not range-checked on load, so totals can leave `Decimal` range.
    let mut records = vec![
        turf(bet_on(5, TicketType::Win, PopularityBand::Favorite, RaceGrade::Flat, Decimal::MAX, dec!(0))),
        turf(bet_on(5, TicketType::Win, PopularityBand::Favorite, RaceGrade::Flat, Decimal::MAX, dec!(0))),
    ];
    let mut dirt = bet_on(6, TicketType::Wide, PopularityBand::DarkHorse, RaceGrade::G1, dec!(500), dec!(0));
    dirt.course_surface = Some("ダート".into());
    records.push(dirt);

    // Tags whose totals overflow drop out; the rest still rank.
    let insight = find_loss_insight(&records).unwrap();
    assert_eq!(insight.race_descriptor, "ダートのレース");
    assert!(insight.bet_descriptor.starts_with("ワイド"));
    assert_eq!(insight.losing_records, 3);

    assert_eq!(worst_popularity_pattern(&records).unwrap().band, PopularityBand::DarkHorse);

    let summary = Summary::of(&records);
    assert_eq!(summary.total_investment, Decimal::MAX);
    assert_eq!(summary.render(&AmountLocale::ja_jp()).return_rate, "0%");
    assert_eq!(ticket_type_breakdown(&records)[0].value, Decimal::MAX);
    assert_eq!(daily_totals(&records, &jst()).len(), 2);
}
