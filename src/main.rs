mod cache;
mod config;
mod models;
mod scrapers;
mod service;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use config::Config;
use models::Mode;
use scrapers::{AvailabilitySource, BookingScraper, BrowserSessions};
use service::{AvailabilityError, AvailabilityQuery, AvailabilityService, Envelope};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Room availability and prices for the bungalow booking site
#[derive(Parser, Debug)]
#[command(name = "bungalow-availability", version)]
struct Args {
    /// calendar (default), check or single
    #[arg(long)]
    mode: Option<String>,

    /// Calendar pages scraped per room
    #[arg(long)]
    months: Option<u32>,

    /// Calendar pages skipped per room before scraping
    #[arg(long)]
    offset: Option<u32>,

    /// First night, YYYY-MM-DD (default: today)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Run the same query this many times; later runs hit the cache
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Also write the last response to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    fn query(&self) -> Result<AvailabilityQuery, AvailabilityError> {
        let mode = self
            .mode
            .as_deref()
            .map(|m| m.parse::<Mode>())
            .transpose()
            .map_err(AvailabilityError::InvalidQuery)?;
        Ok(AvailabilityQuery::new(
            mode,
            self.months,
            self.offset,
            self.start_date,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    info!("🏝  Bungalow availability - {}", config.site.booking_url);

    let site = Arc::new(config.site.clone());
    let sessions = Arc::new(BrowserSessions::new(config.launch.clone(), site.clone()));
    let service = AvailabilityService::new(
        BookingScraper::new(sessions.clone(), site, config.delays),
        config.cache_ttl,
    );
    info!("Scraping source: {}", service.source().source_name());

    let outcome = match args.query() {
        Ok(query) => run(&service, query, args.repeat).await,
        Err(e) => Err(e),
    };
    service.cache().purge_expired();
    if !service.cache().is_empty() {
        info!("Cache: {:?}", service.cache().stats());
    }
    sessions.shutdown().await;

    match outcome {
        Ok(envelopes) => {
            for envelope in &envelopes {
                println!("{}", serde_json::to_string_pretty(envelope)?);
            }
            if let (Some(path), Some(last)) = (&args.output, envelopes.last()) {
                let json = serde_json::to_string_pretty(last)?;
                tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("💾 Saved response to {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let body = e.envelope();
            error!("{}: {}", body.error, body.details);
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Issue `query` `repeat` times (at least once); later runs hit the cache
async fn run<A>(
    service: &AvailabilityService<A>,
    query: AvailabilityQuery,
    repeat: u32,
) -> Result<Vec<Envelope>, AvailabilityError>
where
    A: AvailabilitySource,
{
    let mut envelopes = Vec::new();
    for _ in 0..repeat.max(1) {
        let envelope = service.query(query).await?;
        info!(source = ?envelope.source, "Availability served");
        envelopes.push(envelope);
    }
    Ok(envelopes)
}
