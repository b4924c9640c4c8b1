//! Tierwatch Control - CLI host adapter.
//!
//! Thin by design: loads a captured bundle, hands it to the engine, prints
//! the result. The watch command owns the one live re-tick timer for its
//! session, the way any host surface is expected to.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tierwatch::config::EngineConfig;
use tierwatch::session::TicketSession;

use tierwatchctl::bundle::{Bundle, BundleSource};
use tierwatchctl::render;

#[derive(Parser)]
#[command(name = "tierwatchctl")]
#[command(about = "SLA clocks and escalation timelines for support tickets", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every applicable SLA clock for the bundled ticket
    Evaluate {
        /// Captured ticket bundle (JSON)
        bundle: PathBuf,

        /// Evaluate as of this instant instead of the wall clock
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Emit the view as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Reconstruct the tier-assignment history from the audit trail
    Timeline {
        bundle: PathBuf,

        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Compare the ticket against its resolved-ticket population
    Mttr { bundle: PathBuf },

    /// Live countdown: re-tick the clocks on a fixed interval
    Watch {
        bundle: PathBuf,

        /// Seconds between re-ticks
        #[arg(long, default_value_t = 1)]
        interval: u64,

        /// Stop after this many ticks (runs until interrupted otherwise)
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Evaluate { bundle, at, json } => evaluate(config, &bundle, at, json).await,
        Commands::Timeline { bundle, at } => timeline(config, &bundle, at).await,
        Commands::Mttr { bundle } => mttr(config, &bundle).await,
        Commands::Watch { bundle, interval, ticks } => watch(config, &bundle, interval, ticks).await,
    }
}

fn open_session(config: EngineConfig, path: &PathBuf) -> Result<(TicketSession<BundleSource>, Bundle)> {
    let bundle = Bundle::load(path)?;
    let session = TicketSession::new(BundleSource::new(bundle.clone()), config, bundle.ticket.id);
    Ok((session, bundle))
}

async fn evaluate(config: EngineConfig, path: &PathBuf, at: Option<DateTime<Utc>>, json: bool) -> Result<()> {
    let (session, _) = open_session(config, path)?;
    let evaluation = session.evaluate(at.unwrap_or_else(Utc::now)).await?;
    let view = evaluation.view();
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        render::print_evaluation(&view);
    }
    Ok(())
}

async fn timeline(config: EngineConfig, path: &PathBuf, at: Option<DateTime<Utc>>) -> Result<()> {
    let policy = config.effective_policy();
    let (session, bundle) = open_session(config, path)?;
    let timeline = session.timeline().await?;
    render::print_timeline(
        &timeline,
        &policy,
        bundle.ticket.priority,
        &tierwatch::clock::StatusProfile::live_bar(),
        at.unwrap_or_else(Utc::now),
    );
    Ok(())
}

async fn mttr(config: EngineConfig, path: &PathBuf) -> Result<()> {
    let (mut session, bundle) = open_session(config, path)?;
    let summary = session.mttr().await?;
    render::print_mttr(summary.as_ref(), Utc::now(), bundle.ticket.created_at);
    Ok(())
}

async fn watch(config: EngineConfig, path: &PathBuf, interval: u64, ticks: Option<u64>) -> Result<()> {
    let (session, _) = open_session(config, path)?;
    let mut evaluation = session.evaluate(Utc::now()).await?;
    render::print_evaluation(&evaluation.view());

    let mut timer = tokio::time::interval(std::time::Duration::from_secs(interval.max(1)));
    timer.tick().await; // first tick fires immediately
    let mut remaining = ticks;
    loop {
        if let Some(0) = remaining {
            break;
        }
        timer.tick().await;
        evaluation.retick(Utc::now());
        println!();
        render::print_evaluation(&evaluation.view());
        remaining = remaining.map(|n| n - 1);
    }
    Ok(())
}
