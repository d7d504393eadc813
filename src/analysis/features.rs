//! Feature tags derived from a single bet record.
//!
//! A record emits zero or more tags from each family. Tags are the
//! aggregation keys of the loss-attribution engine, so two records that
//! share a tag land in the same bucket.

use std::collections::BTreeSet;

use crate::types::BetRecord;

/// Separators accepted between horse numbers.
pub const HORSE_NUMBER_SEPARATORS: &[char] = &[',', '-', '/', '・'];

/// Which kind of fact a tag describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureFamily {
    // Race context
    RaceSegment,
    Surface,
    Direction,
    Length,
    Weather,
    TrackCondition,
    RaceTime,
    // Bet context
    TicketType,
    PopularityBand,
    RaceGrade,
    HorseSelection,
    JockeyName,
    HorseName,
}

impl FeatureFamily {
    /// Race-context families that describe the track and conditions,
    /// everything except the race segment.
    pub const CONDITIONS: &'static [FeatureFamily] = &[
        FeatureFamily::Surface,
        FeatureFamily::Direction,
        FeatureFamily::Length,
        FeatureFamily::Weather,
        FeatureFamily::TrackCondition,
        FeatureFamily::RaceTime,
    ];

    /// Bet-context families that can qualify the ticket type.
    pub const BET_SECONDARY: &'static [FeatureFamily] = &[
        FeatureFamily::PopularityBand,
        FeatureFamily::RaceGrade,
        FeatureFamily::HorseSelection,
        FeatureFamily::JockeyName,
        FeatureFamily::HorseName,
    ];
}

/// A derived label plus the family it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureTag {
    pub label: String,
    pub family: FeatureFamily,
}

impl FeatureTag {
    pub fn new(label: impl Into<String>, family: FeatureFamily) -> Self {
        Self {
            label: label.into(),
            family,
        }
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Race-context tags for one record.
pub fn race_features(record: &BetRecord) -> Vec<FeatureTag> {
    let mut tags = Vec::new();

    if let Some(segment) = record.race_number.as_deref().and_then(race_segment_label) {
        tags.push(FeatureTag::new(segment, FeatureFamily::RaceSegment));
    }
    if let Some(surface) = non_empty(record.course_surface.as_deref()) {
        tags.push(FeatureTag::new(surface, FeatureFamily::Surface));
    }
    if let Some(direction) = non_empty(record.course_direction.as_deref()) {
        tags.push(FeatureTag::new(direction, FeatureFamily::Direction));
    }
    if let Some(length) = record.course_length.as_deref().and_then(course_length_label) {
        tags.push(FeatureTag::new(length, FeatureFamily::Length));
    }
    if let Some(weather) = non_empty(record.weather.as_deref()) {
        tags.push(FeatureTag::new(weather, FeatureFamily::Weather));
    }
    if let Some(condition) = non_empty(record.track_condition.as_deref()) {
        tags.push(FeatureTag::new(condition, FeatureFamily::TrackCondition));
    }
    if let Some(time) = non_empty(record.race_time_detail.as_deref()) {
        tags.push(FeatureTag::new(format!("{time}発走"), FeatureFamily::RaceTime));
    }

    tags
}

/// Bet-context tags for one record. Ticket type, popularity band and
/// grade are always present.
pub fn bet_features(record: &BetRecord) -> Vec<FeatureTag> {
    let mut tags = vec![
        FeatureTag::new(record.ticket_type.label(), FeatureFamily::TicketType),
        FeatureTag::new(
            format!("{}狙い", record.popularity_band.label()),
            FeatureFamily::PopularityBand,
        ),
        FeatureTag::new(record.race_grade.label(), FeatureFamily::RaceGrade),
    ];

    if let Some(selection) = record.horse_number.as_deref().and_then(horse_selection_label) {
        tags.push(FeatureTag::new(selection, FeatureFamily::HorseSelection));
    }
    if let Some(jockey) = non_empty(record.jockey_name.as_deref()) {
        tags.push(FeatureTag::new(format!("{jockey}騎手"), FeatureFamily::JockeyName));
    }
    if let Some(horse) = non_empty(record.horse_name.as_deref()) {
        tags.push(FeatureTag::new(format!("{horse}指名"), FeatureFamily::HorseName));
    }

    tags
}

/// Bucket a race number into the early, middle, or late part of the card.
pub fn race_segment_label(text: &str) -> Option<&'static str> {
    let number: i64 = text.trim().parse().ok()?;
    match number {
        1..=4 => Some("序盤レース"),
        5..=8 => Some("中盤レース"),
        9..=12 => Some("後半レース"),
        _ => None,
    }
}

/// Bucket a course length (`1600`, `1600m`, `芝1600`) by its digits.
pub fn course_length_label(text: &str) -> Option<&'static str> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    let length: u64 = digits.parse().ok()?;
    Some(match length {
        0..=1400 => "短距離",
        1401..=2000 => "中距離",
        _ => "長距離",
    })
}

/// Parse a joined horse-number list. `None` when any piece is not a
/// number or the list is empty.
pub fn parse_horse_numbers(text: &str) -> Option<Vec<u32>> {
    let numbers = text
        .split(HORSE_NUMBER_SEPARATORS)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| piece.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;

    if numbers.is_empty() {
        None
    } else {
        Some(numbers)
    }
}

/// `<n>頭選び` where n counts distinct horse numbers.
pub fn horse_selection_label(text: &str) -> Option<String> {
    let numbers = parse_horse_numbers(text)?;
    let distinct: BTreeSet<u32> = numbers.into_iter().collect();
    Some(format!("{}頭選び", distinct.len()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
