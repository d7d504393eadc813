//! UmaLog: horse-race betting ledger.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the ledger, and runs one subcommand.

use anyhow::{bail, Result};
use chrono::{FixedOffset, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use umalog::analysis::{
    daily_totals, loss_insight_text, ticket_type_breakdown, worst_popularity_pattern, DateRange, Summary,
};
use umalog::backup::{self, ImportOutcome};
use umalog::config::AppConfig;
use umalog::dashboard::{self, DashboardState};
use umalog::entry::{FieldVisibility, RecordDraft};
use umalog::storage::{JsonFileStore, RecordStore};
use umalog::types::{today, BetRecord, PopularityBand, RaceGrade, TicketType};

#[derive(Parser)]
#[command(name = "umalog")]
#[command(author, version, about = "Horse-race betting ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to $UMALOG_CONFIG, then config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List records, newest first
    List {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Record a bet
    Add(AddArgs),

    /// Change the amounts or memo of a record
    Edit {
        id: Uuid,

        #[arg(long)]
        investment: Option<String>,

        #[arg(long)]
        payout: Option<String>,

        #[arg(long)]
        memo: Option<String>,

        /// Write optional fields even when the configured form hides them
        #[arg(long)]
        detailed: bool,
    },

    /// Delete a record by id
    Delete {
        id: Uuid,
    },

    /// Totals, return rate and breakdowns
    Summary {
        #[command(flatten)]
        range: RangeArgs,

        /// Also print per-day totals
        #[arg(long)]
        daily: bool,
    },

    /// Where the losses come from
    Insight,

    /// Write a CSV backup
    Export {
        /// Target directory (defaults to ledger.backup_dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Replace every record with the contents of a CSV backup
    Import {
        /// Backup file. Without one nothing is imported.
        file: Option<PathBuf>,
    },

    /// Run the local dashboard
    Serve {
        /// Port (defaults to dashboard.port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct RangeArgs {
    /// First day (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
}

impl RangeArgs {
    fn filter(&self, records: Vec<BetRecord>, offset: &FixedOffset) -> Vec<BetRecord> {
        if self.start.is_none() && self.end.is_none() {
            return records;
        }
        let range = DateRange::new(
            self.start.unwrap_or(NaiveDate::MIN),
            self.end.unwrap_or(NaiveDate::MAX),
        );
        range.filter(&records, offset)
    }
}

#[derive(Args)]
struct AddArgs {
    /// Race day (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Ticket type, e.g. 単勝 or win
    #[arg(long, default_value = "win")]
    ticket: TicketType,

    /// Popularity band, e.g. 中穴 or mid
    #[arg(long, default_value = "favorite")]
    band: PopularityBand,

    /// Race grade, e.g. G1 or flat
    #[arg(long, default_value = "平場")]
    grade: RaceGrade,

    /// Amount staked
    #[arg(long)]
    investment: String,

    /// Amount paid back (blank for nothing)
    #[arg(long, default_value = "")]
    payout: String,

    /// Race number (1-12)
    #[arg(long, default_value = "1")]
    race: u32,

    /// Horse numbers, e.g. 3-7-12
    #[arg(long)]
    horses: Option<String>,

    #[arg(long)]
    racecourse: Option<String>,

    #[arg(long)]
    jockey: Option<String>,

    #[arg(long)]
    horse: Option<String>,

    /// Start time, e.g. 15:40
    #[arg(long)]
    time: Option<String>,

    #[arg(long)]
    surface: Option<String>,

    #[arg(long)]
    direction: Option<String>,

    /// Distance in metres
    #[arg(long)]
    length: Option<String>,

    #[arg(long)]
    weather: Option<String>,

    #[arg(long)]
    track: Option<String>,

    #[arg(long)]
    memo: Option<String>,

    /// Keep every optional field regardless of the configured form
    #[arg(long)]
    detailed: bool,
}

impl AddArgs {
    fn draft(&self, offset: &FixedOffset) -> RecordDraft {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut draft = RecordDraft::new(self.date.unwrap_or_else(|| today(offset)));
        draft.ticket_type = self.ticket;
        draft.popularity_band = self.band;
        draft.race_grade = self.grade;
        draft.investment_text = self.investment.clone();
        draft.payout_text = self.payout.clone();
        draft.race_number = self.race;
        draft.horse_numbers = self
            .horses
            .as_deref()
            .and_then(umalog::analysis::features::parse_horse_numbers)
            .unwrap_or_default();
        draft.racecourse = text(&self.racecourse);
        draft.jockey_name = text(&self.jockey);
        draft.horse_name = text(&self.horse);
        draft.race_time_detail = text(&self.time);
        draft.course_surface = text(&self.surface);
        draft.course_direction = text(&self.direction);
        draft.course_length = text(&self.length);
        draft.weather = text(&self.weather);
        draft.track_condition = text(&self.track);
        draft.memo = text(&self.memo);
        draft
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::resolve_path);
    let cfg = AppConfig::load_or_default(&config_path)?;
    info!(
        config = %config_path.display(),
        ledger = %cfg.ledger.data_file.display(),
        "UmaLog starting"
    );

    let offset = cfg.ledger.offset()?;
    let mut store = JsonFileStore::open(&cfg.ledger.data_file)?;

    match cli.command {
        Commands::List { range } => {
            let records = range.filter(store.list(), &offset);
            if records.is_empty() {
                println!("記録がありません。");
            }
            for record in &records {
                println!("{} {}  {}", record.race_day(&offset), record, record.id);
            }
        }

        Commands::Add(args) => {
            let fields = if args.detailed {
                FieldVisibility::detailed()
            } else {
                cfg.fields
            };
            let record = args.draft(&offset).build(&cfg.locale, &offset, &fields)?;
            let id = record.id;
            store.insert(record)?;
            info!(%id, "Record added");
            println!("記録しました: {id}");
        }

        Commands::Edit {
            id,
            investment,
            payout,
            memo,
            detailed,
        } => {
            let Some(mut record) = store.list().into_iter().find(|r| r.id == id) else {
                bail!("No record with id {id}");
            };
            let mut draft = RecordDraft::from_record(&record, &offset);
            if let Some(investment) = investment {
                draft.investment_text = investment;
            }
            if let Some(payout) = payout {
                draft.payout_text = payout;
            }
            if let Some(memo) = memo {
                draft.memo = memo;
            }
            let fields = if detailed {
                FieldVisibility::detailed()
            } else {
                cfg.fields
            };
            draft.apply_to(&mut record, &cfg.locale, &offset, &fields)?;
            store.update(record)?;
            info!(%id, "Record updated");
            println!("更新しました: {id}");
        }

        Commands::Delete { id } => {
            if !store.delete(id)? {
                bail!("No record with id {id}");
            }
            info!(%id, "Record deleted");
            println!("削除しました: {id}");
        }

        Commands::Summary { range, daily } => {
            let records = range.filter(store.list(), &offset);
            let text = Summary::of(&records).render(&cfg.locale);
            println!("{}", text.record_count);
            println!("投資: {}", text.investment);
            println!("払戻: {}", text.payout);
            println!("収支: {}", text.net_profit);
            println!("回収率: {}", text.return_rate);

            for entry in ticket_type_breakdown(&records) {
                println!("  {} {}", entry.label, umalog::amount::format_currency(entry.value, &cfg.locale));
            }

            if daily {
                for (day, total) in daily_totals(&records, &offset) {
                    println!(
                        "{day} {}件 {}",
                        total.count,
                        umalog::amount::format_signed_currency(total.net_profit(), &cfg.locale)
                    );
                }
            }
        }

        Commands::Insight => {
            let records = store.list();
            println!("{}", loss_insight_text(&records));
            if let Some(pattern) = worst_popularity_pattern(&records) {
                println!("{}", pattern.message());
                println!("{}", pattern.detail());
            }
        }

        Commands::Export { dir } => {
            let dir = dir.unwrap_or_else(|| cfg.ledger.backup_dir.clone());
            let path = backup::export_to_dir(&store, &dir, Utc::now().with_timezone(&offset))?;
            println!("{}", path.display());
        }

        Commands::Import { file } => match backup::import_selection(&mut store, file.as_deref()) {
            Ok(ImportOutcome::Restored { count }) => {
                println!("復元しました");
                println!("{count}件の記録を読み込みました。");
            }
            Ok(ImportOutcome::Cancelled) => {}
            Err(e) => {
                error!(error = ?e, "Import failed");
                bail!("{}: {e}", e.title());
            }
        },

        Commands::Serve { port } => {
            if !cfg.dashboard.enabled {
                bail!("Dashboard is disabled in the configuration");
            }
            let port = port.unwrap_or(cfg.dashboard.port);
            let state = Arc::new(DashboardState::new(Box::new(store), cfg.locale.clone(), offset));
            dashboard::serve(state, port).await?;
        }
    }

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("umalog=info"));

    let json_logging = std::env::var("UMALOG_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
