//! Dashboard API route handlers.
//!
//! All endpoints except the CSV export return JSON. State is shared via
//! `Arc<DashboardState>`.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::amount::AmountLocale;
use crate::analysis::summary::{BreakdownEntry, SummaryText};
use crate::analysis::{
    daily_totals, find_loss_insight, grade_payout_breakdown, ticket_type_breakdown, worst_popularity_pattern,
    DateRange, Summary, NO_INSIGHT_MESSAGE,
};
use crate::backup;
use crate::storage::RecordStore;
use crate::types::{BetRecord, ImportError};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub store: RwLock<Box<dyn RecordStore + Send + Sync>>,
    pub locale: AmountLocale,
    pub offset: FixedOffset,
}

impl DashboardState {
    pub fn new(store: Box<dyn RecordStore + Send + Sync>, locale: AmountLocale, offset: FixedOffset) -> Self {
        Self {
            store: RwLock::new(store),
            locale,
            offset,
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Optional inclusive day range, e.g. `?start=2026-05-01&end=2026-05-31`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl RangeQuery {
    fn apply(&self, records: Vec<BetRecord>, offset: &FixedOffset) -> Vec<BetRecord> {
        match (self.start, self.end) {
            (None, None) => records,
            (start, end) => {
                let start = start.unwrap_or(NaiveDate::MIN);
                let end = end.unwrap_or(NaiveDate::MAX);
                DateRange::new(start, end).filter(&records, offset)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyEntry {
    pub date: NaiveDate,
    pub investment: Decimal,
    pub payout: Decimal,
    pub net_profit: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    /// ISO 4217 code the amounts are in.
    pub currency: String,
    pub summary: Summary,
    pub text: SummaryText,
    pub ticket_types: Vec<BreakdownEntry>,
    pub grade_payouts: Vec<BreakdownEntry>,
    pub daily: Vec<DailyEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightResponse {
    pub message: String,
    pub race_descriptor: Option<String>,
    pub bet_descriptor: Option<String>,
    pub losing_records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternResponse {
    pub band: String,
    pub loss: Decimal,
    pub count: usize,
    pub return_rate: String,
    pub message: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    pub title: String,
    pub message: String,
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub title: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/records
pub async fn get_records(State(state): State<AppState>, Query(range): Query<RangeQuery>) -> Json<Vec<BetRecord>> {
    let records = state.store.read().await.list();
    Json(range.apply(records, &state.offset))
}

/// GET /api/summary
pub async fn get_summary(State(state): State<AppState>, Query(range): Query<RangeQuery>) -> Json<SummaryResponse> {
    let records = range.apply(state.store.read().await.list(), &state.offset);
    let summary = Summary::of(&records);

    let daily = daily_totals(&records, &state.offset)
        .into_iter()
        .map(|(date, total)| DailyEntry {
            date,
            investment: total.investment,
            payout: total.payout,
            net_profit: total.net_profit(),
            count: total.count,
        })
        .collect();

    Json(SummaryResponse {
        currency: state.locale.currency_code.clone(),
        text: summary.render(&state.locale),
        summary,
        ticket_types: ticket_type_breakdown(&records),
        grade_payouts: grade_payout_breakdown(&records),
        daily,
    })
}

/// GET /api/insight
pub async fn get_insight(State(state): State<AppState>) -> Json<InsightResponse> {
    let records = state.store.read().await.list();
    let response = match find_loss_insight(&records) {
        Some(insight) => InsightResponse {
            message: insight.message(),
            race_descriptor: Some(insight.race_descriptor),
            bet_descriptor: Some(insight.bet_descriptor),
            losing_records: insight.losing_records,
        },
        None => InsightResponse {
            message: NO_INSIGHT_MESSAGE.to_string(),
            race_descriptor: None,
            bet_descriptor: None,
            losing_records: 0,
        },
    };
    Json(response)
}

/// GET /api/pattern
pub async fn get_pattern(State(state): State<AppState>) -> Json<Option<PatternResponse>> {
    let records = state.store.read().await.list();
    Json(worst_popularity_pattern(&records).map(|p| PatternResponse {
        band: p.band.label().to_string(),
        loss: p.loss,
        count: p.count,
        return_rate: p.return_rate_text(),
        message: p.message(),
        detail: p.detail(),
    }))
}

/// GET /api/export
pub async fn get_export(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now().with_timezone(&state.offset);
    let export = {
        let store = state.store.read().await;
        backup::export(&**store, now)
    };

    let disposition = format!("attachment; filename=\"{}\"", export.full_file_name());
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.contents,
    )
}

/// POST /api/import
pub async fn post_import(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportResponse>, (StatusCode, Json<ErrorResponse>)> {
    let result = {
        let mut store = state.store.write().await;
        backup::restore_from_bytes(&mut **store, &body)
    };

    match result {
        Ok(report) => {
            info!(imported = report.imported, skipped = report.skipped, "Import via dashboard");
            Ok(Json(ImportResponse {
                title: report.title().to_string(),
                message: report.message(),
                imported: report.imported,
                skipped: report.skipped,
            }))
        }
        Err(e) => {
            warn!(error = ?e, "Import via dashboard failed");
            let status = match &e {
                ImportError::Store(_) | ImportError::Unreadable(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            Err((
                status,
                Json(ErrorResponse {
                    title: e.title().to_string(),
                    message: e.to_string(),
                }),
            ))
        }
    }
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
