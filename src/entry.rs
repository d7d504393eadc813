//! Record entry and edit.
//!
//! A `RecordDraft` holds what the user typed. `build` turns it into a new
//! record; `apply_to` writes it over an existing one. Which optional
//! fields are taken from the draft is decided by `FieldVisibility`.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::amount::{format_plain, parse_amount, AmountLocale};
use crate::analysis::features::parse_horse_numbers;
use crate::types::{is_amount_in_range, start_of_day, BetRecord, EntryError, PopularityBand, RaceGrade, TicketType};

// ---------------------------------------------------------------------------
// Field visibility
// ---------------------------------------------------------------------------

/// Which optional fields the entry form shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldVisibility {
    pub racecourse: bool,
    pub horse_number: bool,
    pub jockey: bool,
    pub horse_name: bool,
    pub race_time: bool,
    pub course_surface: bool,
    pub course_direction: bool,
    pub course_length: bool,
    pub weather: bool,
    pub track_condition: bool,
    pub memo: bool,
}

impl FieldVisibility {
    /// Amounts and enums only.
    pub fn quick() -> Self {
        Self::default()
    }

    /// Every optional field.
    pub fn detailed() -> Self {
        Self {
            racecourse: true,
            horse_number: true,
            jockey: true,
            horse_name: true,
            race_time: true,
            course_surface: true,
            course_direction: true,
            course_length: true,
            weather: true,
            track_condition: true,
            memo: true,
        }
    }

    pub fn is_quick(&self) -> bool {
        *self == Self::quick()
    }
}

/// Trimmed text, `None` when blank.
fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn visible_value(text: &str, visible: bool) -> Option<String> {
    if visible {
        non_empty(text)
    } else {
        None
    }
}

fn preserved_value(text: &str, visible: bool, original: &Option<String>) -> Option<String> {
    if visible {
        non_empty(text)
    } else {
        original.clone()
    }
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub date: NaiveDate,
    pub ticket_type: TicketType,
    pub popularity_band: PopularityBand,
    pub race_grade: RaceGrade,
    pub investment_text: String,
    pub payout_text: String,
    pub racecourse: String,
    pub race_number: u32,
    pub horse_numbers: Vec<u32>,
    pub jockey_name: String,
    pub horse_name: String,
    pub race_time_detail: String,
    pub course_surface: String,
    pub course_direction: String,
    pub course_length: String,
    pub weather: String,
    pub track_condition: String,
    pub memo: String,
}

/// Amounts that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidAmounts {
    pub investment: Decimal,
    pub payout: Decimal,
}

impl RecordDraft {
    /// Empty draft for `date` with the form's default selections.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ticket_type: TicketType::Win,
            popularity_band: PopularityBand::Favorite,
            race_grade: RaceGrade::Flat,
            investment_text: String::new(),
            payout_text: String::new(),
            racecourse: String::new(),
            race_number: 1,
            horse_numbers: Vec::new(),
            jockey_name: String::new(),
            horse_name: String::new(),
            race_time_detail: String::new(),
            course_surface: String::new(),
            course_direction: String::new(),
            course_length: String::new(),
            weather: String::new(),
            track_condition: String::new(),
            memo: String::new(),
        }
    }

    /// Load an existing record for editing.
    pub fn from_record(record: &BetRecord, offset: &FixedOffset) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            date: record.race_day(offset),
            ticket_type: record.ticket_type,
            popularity_band: record.popularity_band,
            race_grade: record.race_grade,
            investment_text: format_plain(record.investment),
            payout_text: format_plain(record.payout),
            racecourse: text(&record.racecourse),
            race_number: record
                .race_number
                .as_deref()
                .and_then(|n| n.trim().parse().ok())
                .unwrap_or(1),
            horse_numbers: record
                .horse_number
                .as_deref()
                .map(lenient_horse_numbers)
                .unwrap_or_default(),
            jockey_name: text(&record.jockey_name),
            horse_name: text(&record.horse_name),
            race_time_detail: text(&record.race_time_detail),
            course_surface: text(&record.course_surface),
            course_direction: text(&record.course_direction),
            course_length: record
                .course_length
                .as_deref()
                .map(|l| l.chars().filter(|c| c.is_ascii_digit()).collect())
                .unwrap_or_default(),
            weather: text(&record.weather),
            track_condition: text(&record.track_condition),
            memo: text(&record.memo),
        }
    }

    /// Drop selections beyond what the ticket type names.
    pub fn normalize_horse_selection(&mut self) {
        self.horse_numbers
            .truncate(self.ticket_type.required_horse_selections());
    }

    /// `3-7-12`, or `None` with nothing selected.
    pub fn horse_number_text(&self) -> Option<String> {
        if self.horse_numbers.is_empty() {
            return None;
        }
        let parts: Vec<String> = self.horse_numbers.iter().map(u32::to_string).collect();
        Some(parts.join("-"))
    }

    pub fn validate(&self, locale: &AmountLocale) -> Result<ValidAmounts, EntryError> {
        let investment = parse_amount(&self.investment_text, locale)
            .filter(|v| *v > Decimal::ZERO && is_amount_in_range(*v))
            .ok_or_else(|| EntryError::InvalidInvestment(self.investment_text.clone()))?;

        let payout = parse_amount(&self.payout_text, locale).unwrap_or(Decimal::ZERO);
        if !is_amount_in_range(payout) {
            return Err(EntryError::InvalidPayout(self.payout_text.clone()));
        }

        if self.race_number == 0 {
            return Err(EntryError::InvalidRaceNumber);
        }

        Ok(ValidAmounts { investment, payout })
    }

    pub fn is_valid(&self, locale: &AmountLocale) -> bool {
        self.validate(locale).is_ok()
    }

    /// New record from the draft. Hidden fields are left empty.
    pub fn build(
        &self,
        locale: &AmountLocale,
        offset: &FixedOffset,
        fields: &FieldVisibility,
    ) -> Result<BetRecord, EntryError> {
        let amounts = self.validate(locale)?;
        let mut draft = self.clone();
        draft.normalize_horse_selection();

        let mut record = BetRecord::new(
            start_of_day(draft.date, offset),
            draft.ticket_type,
            draft.popularity_band,
            draft.race_grade,
            amounts.investment,
            amounts.payout,
        );
        record.race_number = Some(draft.race_number.to_string());
        record.racecourse = visible_value(&draft.racecourse, fields.racecourse);
        record.horse_number = if fields.horse_number {
            draft.horse_number_text()
        } else {
            None
        };
        record.jockey_name = visible_value(&draft.jockey_name, fields.jockey);
        record.horse_name = visible_value(&draft.horse_name, fields.horse_name);
        record.race_time_detail = visible_value(&draft.race_time_detail, fields.race_time);
        record.course_surface = visible_value(&draft.course_surface, fields.course_surface);
        record.course_direction = visible_value(&draft.course_direction, fields.course_direction);
        record.course_length = visible_value(&draft.course_length, fields.course_length);
        record.weather = visible_value(&draft.weather, fields.weather);
        record.track_condition = visible_value(&draft.track_condition, fields.track_condition);
        record.memo = visible_value(&draft.memo, fields.memo);
        Ok(record)
    }

    /// Write the draft over `record`. Hidden fields keep their stored
    /// value. The record is untouched when validation fails.
    pub fn apply_to(
        &self,
        record: &mut BetRecord,
        locale: &AmountLocale,
        offset: &FixedOffset,
        fields: &FieldVisibility,
    ) -> Result<(), EntryError> {
        let amounts = self.validate(locale)?;
        let mut draft = self.clone();
        draft.normalize_horse_selection();

        record.created_at = start_of_day(draft.date, offset);
        record.ticket_type = draft.ticket_type;
        record.popularity_band = draft.popularity_band;
        record.race_grade = draft.race_grade;
        record.investment = amounts.investment;
        record.payout = amounts.payout;
        record.race_number = Some(draft.race_number.to_string());
        record.racecourse = preserved_value(&draft.racecourse, fields.racecourse, &record.racecourse);
        record.horse_number = preserved_value(
            &draft.horse_number_text().unwrap_or_default(),
            fields.horse_number,
            &record.horse_number,
        );
        record.jockey_name = preserved_value(&draft.jockey_name, fields.jockey, &record.jockey_name);
        record.horse_name = preserved_value(&draft.horse_name, fields.horse_name, &record.horse_name);
        record.race_time_detail =
            preserved_value(&draft.race_time_detail, fields.race_time, &record.race_time_detail);
        record.course_surface =
            preserved_value(&draft.course_surface, fields.course_surface, &record.course_surface);
        record.course_direction =
            preserved_value(&draft.course_direction, fields.course_direction, &record.course_direction);
        record.course_length =
            preserved_value(&draft.course_length, fields.course_length, &record.course_length);
        record.weather = preserved_value(&draft.weather, fields.weather, &record.weather);
        record.track_condition =
            preserved_value(&draft.track_condition, fields.track_condition, &record.track_condition);
        record.memo = preserved_value(&draft.memo, fields.memo, &record.memo);
        Ok(())
    }
}

/// Horse numbers for editing. Unlike the insight tag, pieces that are not
/// numbers are skipped instead of discarding the whole selection.
fn lenient_horse_numbers(text: &str) -> Vec<u32> {
    parse_horse_numbers(text).unwrap_or_else(|| {
        text.split(crate::analysis::features::HORSE_NUMBER_SEPARATORS)
            .filter_map(|p| p.trim().parse().ok())
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

fn distinct_names<'a>(names: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    names
        .flatten()
        .filter_map(non_empty)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// Previously entered jockey names, sorted.
pub fn jockey_suggestions(records: &[BetRecord]) -> Vec<String> {
    distinct_names(records.iter().map(|r| r.jockey_name.as_deref()))
}

/// Previously entered horse names, sorted.
pub fn horse_suggestions(records: &[BetRecord]) -> Vec<String> {
    distinct_names(records.iter().map(|r| r.horse_name.as_deref()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
