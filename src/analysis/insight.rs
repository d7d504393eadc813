//! Loss attribution: which race and bet features the user loses on.
//!
//! Only losing records (positive stake, payout below stake) are mined.
//! Each contributes its investment and payout to every feature tag it
//! emits; the most lossy tags are then stitched into one sentence:
//!
//! `<race descriptor>で、<bet descriptor>が負けがちです。`

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::features::{bet_features, race_features, FeatureFamily, FeatureTag};
use crate::types::{return_rate, BetRecord};

/// Shown by callers when there is no insight to report.
pub const NO_INSIGHT_MESSAGE: &str = "まだ負けの傾向は見えていません。";

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Aggregate outcome of every record sharing one feature tag.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStat {
    pub tag: FeatureTag,
    pub investment: Decimal,
    pub payout: Decimal,
    pub count: usize,
}

impl FeatureStat {
    pub fn loss(&self) -> Decimal {
        self.investment.saturating_sub(self.payout)
    }

    pub fn return_rate(&self) -> Decimal {
        return_rate(self.investment, self.payout)
    }

    pub fn family(&self) -> FeatureFamily {
        self.tag.family
    }

    pub fn label(&self) -> &str {
        &self.tag.label
    }
}

/// Sum every record into the buckets of the tags `extract` yields.
///
/// Buckets come back in order of first appearance, which makes the
/// final tie-break deterministic for a given input order.
pub fn feature_stats<F>(records: &[BetRecord], extract: F) -> Vec<FeatureStat>
where
    F: Fn(&BetRecord) -> Vec<FeatureTag>,
{
    let mut index: HashMap<FeatureTag, usize> = HashMap::new();
    let mut stats: Vec<FeatureStat> = Vec::new();
    let mut overflowed: Vec<bool> = Vec::new();

    for record in records {
        for tag in extract(record) {
            match index.get(&tag) {
                Some(&i) if overflowed[i] => {}
                Some(&i) => {
                    let stat = &mut stats[i];
                    match (
                        stat.investment.checked_add(record.investment),
                        stat.payout.checked_add(record.payout),
                    ) {
                        (Some(investment), Some(payout)) => {
                            stat.investment = investment;
                            stat.payout = payout;
                            stat.count += 1;
                        }
                        _ => {
                            debug!(tag = %stat.tag.label, "Feature total out of range, tag dropped");
                            overflowed[i] = true;
                        }
                    }
                }
                None => {
                    index.insert(tag.clone(), stats.len());
                    stats.push(FeatureStat {
                        tag,
                        investment: record.investment,
                        payout: record.payout,
                        count: 1,
                    });
                    overflowed.push(false);
                }
            }
        }
    }

    // Dropping keeps the remaining buckets in appearance order.
    stats
        .into_iter()
        .zip(overflowed)
        .filter(|(_, dropped)| !dropped)
        .map(|(stat, _)| stat)
        .collect()
}

/// Losing stats of the given families, worst first: loss desc, then
/// count desc, then first appearance.
pub fn ranked_losses<'a>(
    stats: &'a [FeatureStat],
    families: &[FeatureFamily],
) -> Vec<&'a FeatureStat> {
    let mut ranked: Vec<&FeatureStat> = stats
        .iter()
        .filter(|s| families.contains(&s.family()) && s.loss() > Decimal::ZERO)
        .collect();
    // `sort_by` is stable, so equal entries keep appearance order.
    ranked.sort_by(|a, b| b.loss().cmp(&a.loss()).then(b.count.cmp(&a.count)));
    ranked
}

/// The single worst stat among `families`, if any is losing.
pub fn best_stat<'a>(stats: &'a [FeatureStat], families: &[FeatureFamily]) -> Option<&'a FeatureStat> {
    ranked_losses(stats, families).into_iter().next()
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// `序盤レース（芝・雨）`, `芝・雨のレース`, `序盤レース`, or empty.
pub fn build_race_descriptor(stats: &[FeatureStat]) -> String {
    let segment = best_stat(stats, &[FeatureFamily::RaceSegment]).map(FeatureStat::label);
    let conditions: Vec<&str> = ranked_losses(stats, FeatureFamily::CONDITIONS)
        .into_iter()
        .take(2)
        .map(FeatureStat::label)
        .collect();

    match (segment, conditions.is_empty()) {
        (Some(segment), false) => format!("{segment}（{}）", conditions.join("・")),
        (Some(segment), true) => segment.to_string(),
        (None, false) => format!("{}のレース", conditions.join("・")),
        (None, true) => String::new(),
    }
}

/// `単勝の穴狙い`, `馬連で重賞`, `単勝`, or empty when no ticket type loses.
pub fn build_bet_descriptor(stats: &[FeatureStat]) -> String {
    let Some(ticket) = best_stat(stats, &[FeatureFamily::TicketType]) else {
        return String::new();
    };

    match best_stat(stats, FeatureFamily::BET_SECONDARY) {
        Some(secondary) if secondary.family() == FeatureFamily::RaceGrade => {
            format!("{}で{}", ticket.label(), secondary.label())
        }
        Some(secondary) => format!("{}の{}", ticket.label(), secondary.label()),
        None => ticket.label().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Insight
// ---------------------------------------------------------------------------

/// The "where am I losing" finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LossInsight {
    pub race_descriptor: String,
    pub bet_descriptor: String,
    /// Number of losing records the finding was mined from.
    pub losing_records: usize,
}

impl fmt::Display for LossInsight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}で、{}が負けがちです。", self.race_descriptor, self.bet_descriptor)
    }
}

impl LossInsight {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Mine `records` for the race and bet features most associated with
/// losing money. `None` when there are no losing records or either
/// descriptor comes out empty.
pub fn find_loss_insight(records: &[BetRecord]) -> Option<LossInsight> {
    let losing: Vec<BetRecord> = records.iter().filter(|r| r.is_loss()).cloned().collect();
    if losing.is_empty() {
        return None;
    }

    let race_stats = feature_stats(&losing, race_features);
    let bet_stats = feature_stats(&losing, bet_features);

    let race_descriptor = build_race_descriptor(&race_stats);
    let bet_descriptor = build_bet_descriptor(&bet_stats);
    if race_descriptor.is_empty() || bet_descriptor.is_empty() {
        return None;
    }

    Some(LossInsight {
        race_descriptor,
        bet_descriptor,
        losing_records: losing.len(),
    })
}

/// The insight sentence, or the placeholder message.
pub fn loss_insight_text(records: &[BetRecord]) -> String {
    find_loss_insight(records)
        .map(|i| i.message())
        .unwrap_or_else(|| NO_INSIGHT_MESSAGE.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
