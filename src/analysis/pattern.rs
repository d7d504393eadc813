//! Worst simple pattern: the popularity band that has lost the most.
//!
//! Unlike the feature insight this looks at every record, winners
//! included, grouped by popularity band alone.

use rust_decimal::Decimal;

use crate::amount::format_return_rate;
use crate::types::{return_rate, BetRecord, PopularityBand};

/// Aggregate loss for one popularity band.
#[derive(Debug, Clone, PartialEq)]
pub struct LossPattern {
    pub band: PopularityBand,
    pub loss: Decimal,
    pub count: usize,
    pub return_rate: Decimal,
}

impl LossPattern {
    pub fn message(&self) -> String {
        format!("{} で最も負けています", self.band.label())
    }

    /// e.g. `同じ買い方で 4 件記録。回収率 35%。`
    pub fn detail(&self) -> String {
        format!(
            "同じ買い方で {} 件記録。回収率 {}。",
            self.count,
            self.return_rate_text()
        )
    }

    pub fn return_rate_text(&self) -> String {
        format_return_rate(Some(self.return_rate))
    }
}

fn checked_total(amounts: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    amounts.fold(Some(Decimal::ZERO), |acc, v| acc?.checked_add(v))
}

/// The band with the largest positive loss. Ties go to the band with
/// more records, then to band order (favorite, mid, dark horse).
pub fn worst_popularity_pattern(records: &[BetRecord]) -> Option<LossPattern> {
    let mut patterns: Vec<LossPattern> = PopularityBand::ALL
        .iter()
        .filter_map(|band| {
            let group: Vec<&BetRecord> = records.iter().filter(|r| r.popularity_band == *band).collect();
            if group.is_empty() {
                return None;
            }
            // A band whose totals leave `Decimal` range is not ranked.
            let investment = checked_total(group.iter().map(|r| r.investment))?;
            let payout = checked_total(group.iter().map(|r| r.payout))?;
            let loss = investment.saturating_sub(payout);
            if loss <= Decimal::ZERO {
                return None;
            }
            Some(LossPattern {
                band: *band,
                loss,
                count: group.len(),
                return_rate: return_rate(investment, payout),
            })
        })
        .collect();

    patterns.sort_by(|a, b| b.loss.cmp(&a.loss).then(b.count.cmp(&a.count)));
    patterns.into_iter().next()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
