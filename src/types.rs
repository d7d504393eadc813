//! Shared types for UmaLog.
//!
//! The bet record and its enums are the one data shape every other
//! module depends on: the analysis engine reads it, the CSV codec writes
//! and rebuilds it, the store persists it.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Wager structure. Each type fixes how many horse numbers a ticket names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Win,
    Place,
    BracketQuinella,
    Quinella,
    Wide,
    Exacta,
    Trio,
    Trifecta,
}

impl TicketType {
    /// All canonical ticket types, in picker order.
    pub const ALL: &'static [TicketType] = &[
        TicketType::Win,
        TicketType::Place,
        TicketType::BracketQuinella,
        TicketType::Quinella,
        TicketType::Wide,
        TicketType::Exacta,
        TicketType::Trio,
        TicketType::Trifecta,
    ];

    /// Labels written by older versions of the app. Only consulted when
    /// decoding backups.
    const LEGACY_LABELS: &'static [(&'static str, TicketType)] = &[("三連系", TicketType::Trio)];

    /// Canonical display label (also the CSV raw value).
    pub fn label(&self) -> &'static str {
        match self {
            TicketType::Win => "単勝",
            TicketType::Place => "複勝",
            TicketType::BracketQuinella => "枠連",
            TicketType::Quinella => "馬連",
            TicketType::Wide => "ワイド",
            TicketType::Exacta => "馬単",
            TicketType::Trio => "三連複",
            TicketType::Trifecta => "三連単",
        }
    }

    /// Number of horse numbers a ticket of this type names.
    pub fn required_horse_selections(&self) -> usize {
        match self {
            TicketType::Win | TicketType::Place => 1,
            TicketType::BracketQuinella
            | TicketType::Quinella
            | TicketType::Wide
            | TicketType::Exacta => 2,
            TicketType::Trio | TicketType::Trifecta => 3,
        }
    }

    /// Exact match against the canonical labels.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.label() == label)
    }

    /// Canonical label first, then the legacy migration table.
    pub fn from_stored_label(label: &str) -> Option<Self> {
        Self::from_label(label).or_else(|| {
            Self::LEGACY_LABELS
                .iter()
                .find(|(legacy, _)| *legacy == label)
                .map(|(_, t)| *t)
        })
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Accepts either the display label or an ASCII name (case-insensitive).
impl std::str::FromStr for TicketType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(t) = Self::from_label(s) {
            return Ok(t);
        }
        match s.to_lowercase().as_str() {
            "win" => Ok(TicketType::Win),
            "place" | "show" => Ok(TicketType::Place),
            "bracket_quinella" | "bracket" => Ok(TicketType::BracketQuinella),
            "quinella" => Ok(TicketType::Quinella),
            "wide" | "quinella_place" => Ok(TicketType::Wide),
            "exacta" => Ok(TicketType::Exacta),
            "trio" => Ok(TicketType::Trio),
            "trifecta" => Ok(TicketType::Trifecta),
            _ => Err(anyhow::anyhow!("Unknown ticket type: {s}")),
        }
    }
}

/// How heavily the public favoured the horse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopularityBand {
    Favorite,
    Mid,
    DarkHorse,
}

impl PopularityBand {
    pub const ALL: &'static [PopularityBand] = &[
        PopularityBand::Favorite,
        PopularityBand::Mid,
        PopularityBand::DarkHorse,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PopularityBand::Favorite => "1〜3番人気",
            PopularityBand::Mid => "中穴",
            PopularityBand::DarkHorse => "穴",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.label() == label)
    }
}

impl fmt::Display for PopularityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for PopularityBand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(b) = Self::from_label(s) {
            return Ok(b);
        }
        match s.to_lowercase().as_str() {
            "favorite" | "favourite" | "fav" => Ok(PopularityBand::Favorite),
            "mid" | "middle" => Ok(PopularityBand::Mid),
            "dark_horse" | "darkhorse" | "longshot" => Ok(PopularityBand::DarkHorse),
            _ => Err(anyhow::anyhow!("Unknown popularity band: {s}")),
        }
    }
}

/// Prestige tier of the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceGrade {
    G1,
    Graded,
    Flat,
}

impl RaceGrade {
    pub const ALL: &'static [RaceGrade] = &[RaceGrade::G1, RaceGrade::Graded, RaceGrade::Flat];

    pub fn label(&self) -> &'static str {
        match self {
            RaceGrade::G1 => "G1",
            RaceGrade::Graded => "重賞",
            RaceGrade::Flat => "平場",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.label() == label)
    }
}

impl fmt::Display for RaceGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for RaceGrade {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(g) = Self::from_label(s) {
            return Ok(g);
        }
        match s.to_lowercase().as_str() {
            "g1" => Ok(RaceGrade::G1),
            "graded" | "g2" | "g3" => Ok(RaceGrade::Graded),
            "flat" | "ordinary" => Ok(RaceGrade::Flat),
            _ => Err(anyhow::anyhow!("Unknown race grade: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Bet record
// ---------------------------------------------------------------------------

/// One logged wager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: Uuid,
    /// Local midnight of the race day, as a UTC instant.
    pub created_at: DateTime<Utc>,
    pub ticket_type: TicketType,
    pub popularity_band: PopularityBand,
    pub race_grade: RaceGrade,
    pub investment: Decimal,
    pub payout: Decimal,
    #[serde(default)]
    pub racecourse: Option<String>,
    #[serde(default)]
    pub race_number: Option<String>,
    /// Horse numbers joined with `-` (older data may use `,` `/` `・`).
    #[serde(default)]
    pub horse_number: Option<String>,
    #[serde(default)]
    pub jockey_name: Option<String>,
    #[serde(default)]
    pub horse_name: Option<String>,
    /// Start time, e.g. `15:40`.
    #[serde(default)]
    pub race_time_detail: Option<String>,
    #[serde(default)]
    pub course_surface: Option<String>,
    #[serde(default)]
    pub course_direction: Option<String>,
    #[serde(default)]
    pub course_length: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub track_condition: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// One-line summary. The date is left to the caller, which knows the
/// local offset.
impl fmt::Display for BetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let net = self.net_profit();
        let sign = if net >= Decimal::ZERO { "+" } else { "" };
        write!(
            f,
            "{} {} {} invest={} payout={} ({sign}{})",
            self.ticket_type,
            self.popularity_band,
            self.race_grade,
            self.investment.normalize(),
            self.payout.normalize(),
            net.normalize(),
        )
    }
}

impl BetRecord {
    /// Build a record with a fresh id and no optional context.
    pub fn new(
        created_at: DateTime<Utc>,
        ticket_type: TicketType,
        popularity_band: PopularityBand,
        race_grade: RaceGrade,
        investment: Decimal,
        payout: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            ticket_type,
            popularity_band,
            race_grade,
            investment,
            payout,
            racecourse: None,
            race_number: None,
            horse_number: None,
            jockey_name: None,
            horse_name: None,
            race_time_detail: None,
            course_surface: None,
            course_direction: None,
            course_length: None,
            weather: None,
            track_condition: None,
            memo: None,
        }
    }

    /// payout - investment.
    pub fn net_profit(&self) -> Decimal {
        self.payout.saturating_sub(self.investment)
    }

    /// Payout as a percentage of investment; 0 when nothing was invested.
    pub fn return_rate(&self) -> Decimal {
        return_rate(self.investment, self.payout)
    }

    /// Positive stake that paid back less than it cost.
    pub fn is_loss(&self) -> bool {
        self.investment > Decimal::ZERO && self.payout < self.investment
    }

    /// The local calendar day this record belongs to.
    pub fn race_day(&self, offset: &FixedOffset) -> NaiveDate {
        self.created_at.with_timezone(offset).date_naive()
    }
}

/// Largest investment or payout a single record may carry. Keeps every
/// sum over a realistic ledger far inside `Decimal` range.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

/// Non-negative and no larger than [`MAX_AMOUNT`].
pub fn is_amount_in_range(amount: Decimal) -> bool {
    amount >= Decimal::ZERO && amount <= MAX_AMOUNT
}

/// Shared return-rate rule: payout / investment * 100, or 0. Saturates
/// instead of overflowing on extreme ratios.
pub fn return_rate(investment: Decimal, payout: Decimal) -> Decimal {
    if investment > Decimal::ZERO {
        payout
            .checked_div(investment)
            .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::MAX)
    } else {
        Decimal::ZERO
    }
}

/// UTC instant of local midnight for `date` in `offset`.
pub fn start_of_day(date: NaiveDate, offset: &FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    match offset.from_local_datetime(&local).single() {
        Some(dt) => dt.with_timezone(&Utc),
        // A fixed offset has no gaps or folds.
        None => Utc.from_utc_datetime(&local),
    }
}

/// Today's date in `offset`.
pub fn today(offset: &FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(offset).date_naive()
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a backup restore did not happen. Every variant leaves the store
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("ファイルの読み込み中に問題が発生しました。もう一度お試しください。")]
    Unreadable(#[source] std::io::Error),

    #[error("ファイルを読み込めませんでした。UTF-8形式のCSVを指定してください。")]
    NotText,

    #[error("記録が見つかりませんでした。")]
    NoRecords,

    #[error("有効な記録がありませんでした。")]
    NoValidRecords { rows: usize },

    #[error("記録の置き換えに失敗しました。もう一度お試しください。")]
    Store(#[source] anyhow::Error),
}

impl ImportError {
    /// Alert title shown alongside the message.
    pub fn title(&self) -> &'static str {
        match self {
            ImportError::Unreadable(_) | ImportError::Store(_) => "復元に失敗しました",
            ImportError::NotText | ImportError::NoRecords | ImportError::NoValidRecords { .. } => {
                "読み込みに失敗しました"
            }
        }
    }
}

/// Why a form draft could not become a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntryError {
    #[error("Investment must be a positive amount no larger than 1,000,000,000,000, got {0:?}")]
    InvalidInvestment(String),

    #[error("Payout must be between 0 and 1,000,000,000,000, got {0:?}")]
    InvalidPayout(String),

    #[error("Race number must be at least 1")]
    InvalidRaceNumber,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
