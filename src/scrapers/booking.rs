use crate::models::{CalendarScanResult, FastCheckResult};
use crate::scrapers::calendar::CalendarScan;
use crate::scrapers::fast_check::fast_check;
use crate::scrapers::traits::{AvailabilitySource, SessionProvider};
use crate::scrapers::types::{ScanRequest, SettleDelays, SiteConfig};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info};

/// Runs each extraction inside its own browsing context
pub struct BookingScraper<S> {
    sessions: Arc<S>,
    site: Arc<SiteConfig>,
    delays: SettleDelays,
}

impl<S: SessionProvider> BookingScraper<S> {
    pub fn new(sessions: Arc<S>, site: Arc<SiteConfig>, delays: SettleDelays) -> Self {
        Self {
            sessions,
            site,
            delays,
        }
    }
}

#[async_trait]
impl<S: SessionProvider> AvailabilitySource for BookingScraper<S> {
    async fn calendar_scan(&self, request: ScanRequest) -> Result<CalendarScanResult> {
        info!(
            months = request.months,
            skip = request.skip_months,
            "Starting calendar scan from {}",
            request.start_date
        );
        let page = self.sessions.acquire().await?;
        let mut scan = CalendarScan::new(&page, self.delays);
        let outcome = scan.run(&request).await;
        let reached = scan.state();
        self.sessions.release(page).await;

        if let Err(e) = &outcome {
            error!(state = ?reached, "Scraping failed: {:#}", e);
        }
        outcome
    }

    async fn fast_check(&self, start_date: NaiveDate) -> Result<FastCheckResult> {
        let page = self.sessions.acquire().await?;
        let outcome = fast_check(&page, start_date, &self.site.sold_out_phrase, &self.delays).await;
        self.sessions.release(page).await;

        if let Err(e) = &outcome {
            error!("Fast check failed: {:#}", e);
        }
        outcome
    }

    fn source_name(&self) -> &'static str {
        "ipms247"
    }
}
