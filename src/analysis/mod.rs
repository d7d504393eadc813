//! Analysis over the record set: loss attribution, the worst
//! popularity band, and summary aggregates.
//!
//! Everything here is a pure function of a record slice.

pub mod features;
pub mod insight;
pub mod pattern;
pub mod summary;

pub use insight::{find_loss_insight, loss_insight_text, LossInsight, NO_INSIGHT_MESSAGE};
pub use pattern::{worst_popularity_pattern, LossPattern};
pub use summary::{daily_totals, grade_payout_breakdown, ticket_type_breakdown, DateRange, Summary};
