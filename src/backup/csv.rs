//! CSV backup codec.
//!
//! One fixed header row, then one row per record. Text fields are always
//! quoted with `"` doubled inside; absent fields are empty and unquoted;
//! amounts are plain decimals; `createdAt` is RFC 3339 in UTC.
//!
//! Decoding is deliberately lenient: it scans character by character,
//! drops rows it cannot rebuild, and falls back to defaults for unknown
//! enum labels.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use crate::types::{is_amount_in_range, BetRecord, PopularityBand, RaceGrade, TicketType};

pub const HEADER: &str = "createdAt,ticketType,popularityBand,raceGrade,investment,payout,racecourse,raceNumber,horseNumber,jockeyName,horseName,raceTimeDetail,courseSurface,courseDirection,courseLength,weather,trackCondition,memo";

/// Fallbacks for blank or unknown enum labels.
pub const DEFAULT_TICKET_TYPE: TicketType = TicketType::Win;
pub const DEFAULT_POPULARITY_BAND: PopularityBand = PopularityBand::Mid;
pub const DEFAULT_RACE_GRADE: RaceGrade = RaceGrade::Flat;

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Serialize every record under the header. Rows are `\n`-joined with no
/// trailing newline.
pub fn encode(records: &[BetRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(HEADER.to_string());
    lines.extend(records.iter().map(encode_row));
    lines.join("\n")
}

fn encode_row(record: &BetRecord) -> String {
    let fields = [
        record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        quote(Some(record.ticket_type.label())),
        quote(Some(record.popularity_band.label())),
        quote(Some(record.race_grade.label())),
        record.investment.normalize().to_string(),
        record.payout.normalize().to_string(),
        quote(record.racecourse.as_deref()),
        quote(record.race_number.as_deref()),
        quote(record.horse_number.as_deref()),
        quote(record.jockey_name.as_deref()),
        quote(record.horse_name.as_deref()),
        quote(record.race_time_detail.as_deref()),
        quote(record.course_surface.as_deref()),
        quote(record.course_direction.as_deref()),
        quote(record.course_length.as_deref()),
        quote(record.weather.as_deref()),
        quote(record.track_condition.as_deref()),
        quote(record.memo.as_deref()),
    ];
    fields.join(",")
}

fn quote(text: Option<&str>) -> String {
    match text {
        Some(t) if !t.is_empty() => format!("\"{}\"", t.replace('"', "\"\"")),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Split CSV text into rows of raw field values.
///
/// `"` toggles quoting except that `""` inside quotes yields one literal
/// quote. `,` and `\n` only separate outside quotes. `\r` is dropped
/// everywhere. A trailing row without a newline is still emitted.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            '\r' => {}
            other => field.push(other),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Why a single data row was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("createdAt is missing or not an RFC 3339 timestamp: {0:?}")]
    Timestamp(String),

    #[error("investment is missing, not a plain non-negative number, or too large: {0:?}")]
    Investment(String),
}

/// Trimmed field at `index`, `None` when the column is missing or blank.
fn value(row: &[String], index: usize) -> Option<String> {
    row.get(index)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Digits with at most one `.`, within the record amount range.
fn parse_plain_amount(text: &str) -> Option<Decimal> {
    let (integer, fraction) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(integer) || !fraction.map_or(true, digits) {
        return None;
    }
    Decimal::from_str(text).ok().filter(|v| is_amount_in_range(*v))
}

/// Rebuild one record from a data row, positionally.
pub fn record_from_row(row: &[String]) -> Result<BetRecord, RowError> {
    let created_text = value(row, 0).unwrap_or_default();
    let created_at = DateTime::parse_from_rfc3339(&created_text)
        .map_err(|_| RowError::Timestamp(created_text.clone()))?
        .with_timezone(&Utc);

    let ticket_type = value(row, 1)
        .and_then(|l| TicketType::from_stored_label(&l))
        .unwrap_or(DEFAULT_TICKET_TYPE);
    let popularity_band = value(row, 2)
        .and_then(|l| PopularityBand::from_label(&l))
        .unwrap_or(DEFAULT_POPULARITY_BAND);
    let race_grade = value(row, 3)
        .and_then(|l| RaceGrade::from_label(&l))
        .unwrap_or(DEFAULT_RACE_GRADE);

    let investment_text = value(row, 4).unwrap_or_default();
    let investment = parse_plain_amount(&investment_text)
        .ok_or_else(|| RowError::Investment(investment_text.clone()))?;
    let payout = value(row, 5)
        .and_then(|t| parse_plain_amount(&t))
        .unwrap_or(Decimal::ZERO);

    Ok(BetRecord {
        id: Uuid::new_v4(),
        created_at,
        ticket_type,
        popularity_band,
        race_grade,
        investment,
        payout,
        racecourse: value(row, 6),
        race_number: value(row, 7),
        horse_number: value(row, 8),
        jockey_name: value(row, 9),
        horse_name: value(row, 10),
        race_time_detail: value(row, 11),
        course_surface: value(row, 12),
        course_direction: value(row, 13),
        course_length: value(row, 14),
        weather: value(row, 15),
        track_condition: value(row, 16),
        memo: value(row, 17),
    })
}

/// Result of decoding a backup.
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub records: Vec<BetRecord>,
    /// Rows after the header.
    pub data_rows: usize,
    /// Data rows that could not be rebuilt.
    pub skipped_rows: usize,
}

/// Decode a backup. Row 0 is the header; bad rows are skipped, never
/// fatal.
pub fn decode(text: &str) -> Decoded {
    let rows = parse_rows(text);
    let mut decoded = Decoded {
        data_rows: rows.len().saturating_sub(1),
        ..Decoded::default()
    };

    for (line, row) in rows.iter().enumerate().skip(1) {
        match record_from_row(row) {
            Ok(record) => decoded.records.push(record),
            Err(e) => {
                debug!(row = line, error = %e, "Skipping backup row");
                decoded.skipped_rows += 1;
            }
        }
    }

    decoded
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
