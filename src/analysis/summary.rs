//! Totals, breakdowns, and per-day aggregates for the overview screens.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::amount::{format_currency, format_return_rate, format_signed_currency, AmountLocale};
use crate::types::{return_rate, BetRecord, RaceGrade, TicketType};

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Sum that pins at `Decimal::MAX` instead of overflowing.
fn saturating_total(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    amounts.fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}

/// Investment and payout totals over a set of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub record_count: usize,
    pub total_investment: Decimal,
    pub total_payout: Decimal,
}

impl Summary {
    pub fn of(records: &[BetRecord]) -> Self {
        Self {
            record_count: records.len(),
            total_investment: saturating_total(records.iter().map(|r| r.investment)),
            total_payout: saturating_total(records.iter().map(|r| r.payout)),
        }
    }

    pub fn net_profit(&self) -> Decimal {
        self.total_payout.saturating_sub(self.total_investment)
    }

    /// `None` when nothing was invested.
    pub fn return_rate(&self) -> Option<Decimal> {
        if self.total_investment > Decimal::ZERO {
            Some(return_rate(self.total_investment, self.total_payout))
        } else {
            None
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.total_payout >= self.total_investment
    }

    /// Display strings for a summary card.
    pub fn render(&self, locale: &AmountLocale) -> SummaryText {
        SummaryText {
            investment: format_currency(self.total_investment, locale),
            payout: format_currency(self.total_payout, locale),
            net_profit: format_signed_currency(self.net_profit(), locale),
            return_rate: format_return_rate(self.return_rate()),
            record_count: format!("対象件数: {}件", self.record_count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryText {
    pub investment: String,
    pub payout: String,
    pub net_profit: String,
    pub return_rate: String,
    pub record_count: String,
}

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Inclusive range of local days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// An end before the start is pulled up to the start.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    pub fn filter(&self, records: &[BetRecord], offset: &FixedOffset) -> Vec<BetRecord> {
        records
            .iter()
            .filter(|r| self.contains(r.race_day(offset)))
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Breakdowns
// ---------------------------------------------------------------------------

/// One bar of a breakdown chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub label: String,
    pub value: Decimal,
}

fn sorted_desc(mut entries: Vec<BreakdownEntry>) -> Vec<BreakdownEntry> {
    entries.sort_by(|a, b| b.value.cmp(&a.value));
    entries
}

/// Investment per ticket type, largest first. Types with no records are
/// left out.
pub fn ticket_type_breakdown(records: &[BetRecord]) -> Vec<BreakdownEntry> {
    let entries = TicketType::ALL
        .iter()
        .filter(|t| records.iter().any(|r| r.ticket_type == **t))
        .map(|t| BreakdownEntry {
            label: t.label().to_string(),
            value: saturating_total(records.iter().filter(|r| r.ticket_type == *t).map(|r| r.investment)),
        })
        .collect();
    sorted_desc(entries)
}

/// Payout per race grade, largest first.
pub fn grade_payout_breakdown(records: &[BetRecord]) -> Vec<BreakdownEntry> {
    let entries = RaceGrade::ALL
        .iter()
        .filter(|g| records.iter().any(|r| r.race_grade == **g))
        .map(|g| BreakdownEntry {
            label: g.label().to_string(),
            value: saturating_total(records.iter().filter(|r| r.race_grade == *g).map(|r| r.payout)),
        })
        .collect();
    sorted_desc(entries)
}

// ---------------------------------------------------------------------------
// Daily totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyTotal {
    pub investment: Decimal,
    pub payout: Decimal,
    pub count: usize,
}

impl DailyTotal {
    pub fn net_profit(&self) -> Decimal {
        self.payout.saturating_sub(self.investment)
    }
}

/// Totals per local day, in calendar order.
pub fn daily_totals(records: &[BetRecord], offset: &FixedOffset) -> BTreeMap<NaiveDate, DailyTotal> {
    let mut totals: BTreeMap<NaiveDate, DailyTotal> = BTreeMap::new();
    for record in records {
        let day = totals.entry(record.race_day(offset)).or_default();
        day.investment = day.investment.saturating_add(record.investment);
        day.payout = day.payout.saturating_add(record.payout);
        day.count += 1;
    }
    totals
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
