use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod analyze;
mod config;
mod fetch;
mod html;
mod jobs;
mod models;
mod report;
mod server;
mod store;
mod telegram;

use config::Config;
use jobs::JobContext;
use store::{HistoryState, HistoryStore};

#[derive(Parser)]
#[command(name = "permwatch")]
#[command(about = "Scheduled Telegram notifier for PERM queue-position predictions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the report history schema
    InitDb,
    /// Run one daily report cycle and deliver it
    Daily,
    /// Run one weekly summary cycle and deliver it
    Weekly,
    /// Scheduled entry point: weekly on Sunday (UTC), daily otherwise
    Tick,
    /// Run forever, firing the scheduled entry point at 06:00 UTC
    Watch,
    /// Serve the status page and report trigger endpoint
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = match &config.database_url {
        Some(url) => Some(
            PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .context("failed to connect to Postgres")?,
        ),
        None => {
            info!("DATABASE_URL not set; report history resets on restart");
            None
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;
    let store = HistoryStore::new(pool.clone());

    match cli.command {
        Commands::InitDb => {
            let pool: PgPool =
                pool.context("DATABASE_URL must be set to initialize the schema")?;
            HistoryStore::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Daily => {
            let ctx = JobContext {
                config: &config,
                client: &client,
                store: &store,
            };
            let mut history = HistoryState::default();
            let outcome = jobs::run_daily(&ctx, &mut history).await?;
            println!(
                "Daily report sent to {} of {} chat(s).",
                outcome.successful, outcome.total
            );
        }
        Commands::Weekly => {
            let ctx = JobContext {
                config: &config,
                client: &client,
                store: &store,
            };
            let mut history = HistoryState::default();
            let outcome = jobs::run_weekly(&ctx, &mut history).await?;
            println!(
                "Weekly report sent to {} of {} chat(s).",
                outcome.successful, outcome.total
            );
        }
        Commands::Tick => {
            let ctx = JobContext {
                config: &config,
                client: &client,
                store: &store,
            };
            let mut history = HistoryState::default();
            jobs::run_tick(&ctx, &mut history).await;
        }
        Commands::Watch => {
            let ctx = JobContext {
                config: &config,
                client: &client,
                store: &store,
            };
            let mut history = HistoryState::default();
            loop {
                let now = Utc::now();
                let next = jobs::next_run_after(now);
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                info!("next scheduled run at {next}");
                tokio::time::sleep(wait).await;
                jobs::run_tick(&ctx, &mut history).await;
            }
        }
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            let state = server::AppState::new(config, client, store);
            server::serve(state, port).await?;
        }
    }

    Ok(())
}
