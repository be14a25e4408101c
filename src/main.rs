use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use integrity_signals::config::SignalsConfig;
use integrity_signals::models::{Granularity, SignalType};
use integrity_signals::time::{self, Clock, SystemClock};
use integrity_signals::{aggregate, db, report, validation};

#[derive(Parser)]
#[command(name = "integrity-signals")]
#[command(about = "Aggregate-only integrity signal reporting", version, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Submit a single signal
    Submit {
        #[arg(long = "type")]
        signal_type: String,
        /// ISO-8601 timestamp, defaults to now
        #[arg(long)]
        timestamp: Option<String>,
        #[arg(long)]
        event_id: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Check a raw JSON payload without storing it
    Validate {
        #[arg(long)]
        payload: String,
    },
    /// Import signals from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print aggregated stats as JSON
    Aggregate {
        #[arg(long, default_value = "day")]
        window: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Render text charts from aggregated stats
    Charts {
        #[arg(long, default_value = "day")]
        window: String,
        #[arg(long, default_value = "output/charts.txt")]
        out: PathBuf,
    },
    /// List the accepted signal types
    SignalTypes {
        #[arg(long)]
        json: bool,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn submission_payload(
    signal_type: String,
    timestamp: Option<String>,
    event_id: Option<String>,
    note: Option<String>,
    clock: &dyn Clock,
) -> Value {
    let mut context = Map::new();
    if let Some(event_id) = event_id {
        context.insert("eventId".to_string(), Value::String(event_id));
    }
    if let Some(note) = note {
        context.insert("note".to_string(), Value::String(note));
    }

    json!({
        "type": signal_type,
        "timestamp": timestamp.unwrap_or_else(|| time::format_iso8601(clock.now())),
        "context": context,
        "source": "form",
        "version": 1,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = SignalsConfig::resolve(cli.config.as_deref())?;
    let clock = SystemClock;

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Submit {
            signal_type,
            timestamp,
            event_id,
            note,
        } => {
            let payload = submission_payload(signal_type, timestamp, event_id, note, &clock);
            let record = match validation::normalize(&payload, &clock) {
                Ok(record) => record,
                Err(e) => {
                    eprintln!("Validation failed: {e}");
                    std::process::exit(1);
                }
            };

            let pool = connect().await?;
            db::append_signal(&pool, &record).await?;
            tracing::info!(signal_type = %record.signal_type, "signal stored");
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Validate { payload } => {
            let payload: Value =
                serde_json::from_str(&payload).context("payload must be valid JSON")?;
            let errors = validation::validate(&payload, &clock);
            if errors.is_empty() {
                println!("ok");
            } else {
                for error in &errors {
                    println!("- {error}");
                }
                std::process::exit(1);
            }
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let summary = db::import_csv(&pool, &csv, &clock).await?;
            println!(
                "Inserted {} signals from {} ({} duplicates, {} rejected).",
                summary.inserted,
                csv.display(),
                summary.duplicates,
                summary.rejected.len()
            );
            for row in &summary.rejected {
                println!("- line {}: {}", row.line, row.reason);
            }
        }
        Commands::Aggregate { window, output } => {
            let granularity: Granularity = window.parse()?;
            let pool = connect().await?;
            let signals = db::fetch_signals(&pool).await?;
            let stats = aggregate::aggregate_with(&signals, granularity, &config.analysis);
            let rendered = serde_json::to_string_pretty(&stats)?;

            if let Some(path) = output {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, &rendered)?;
                eprintln!("Aggregates saved to {}.", path.display());
            }
            println!("{rendered}");
        }
        Commands::Charts { window, out } => {
            let granularity: Granularity = window.parse()?;
            let pool = connect().await?;
            let signals = db::fetch_signals(&pool).await?;
            let stats = aggregate::aggregate_with(&signals, granularity, &config.analysis);

            if stats.is_empty() {
                println!("No data available for charts.");
                return Ok(());
            }
            report::write_text_charts(&stats, &out)?;
            println!("Charts written to {}.", out.display());
        }
        Commands::SignalTypes { json } => {
            if json {
                let catalog: Vec<Value> = SignalType::ALL
                    .iter()
                    .map(|t| json!({"key": t.key(), "description": t.description()}))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                for (index, signal_type) in SignalType::ALL.iter().enumerate() {
                    println!(
                        "{}. {} - {}",
                        index + 1,
                        signal_type.key(),
                        signal_type.description()
                    );
                }
            }
        }
    }

    Ok(())
}
