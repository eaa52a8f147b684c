use crate::cache::{CacheKey, ResponseCache};
use crate::models::{iso_date, Mode, Payload};
use crate::scrapers::traits::AvailabilitySource;
use crate::scrapers::types::ScanRequest;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error("Failed to fetch availability")]
    Extraction(#[source] anyhow::Error),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl AvailabilityError {
    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            AvailabilityError::Extraction(cause) => format!("{:#}", cause),
            AvailabilityError::InvalidQuery(reason) => reason.clone(),
        };
        ErrorEnvelope {
            error: self.to_string(),
            details,
        }
    }
}

/// Failure response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub details: String,
}

/// Query parameters after defaults are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub mode: Mode,
    pub months: u32,
    pub offset: u32,
    pub start_date: NaiveDate,
}

impl AvailabilityQuery {
    /// Fill in defaults: 2 months, no offset, calendar mode, today (UTC)
    pub fn new(
        mode: Option<Mode>,
        months: Option<u32>,
        offset: Option<u32>,
        start_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            mode: mode.unwrap_or_default(),
            months: months.unwrap_or(2),
            offset: offset.unwrap_or(0),
            start_date: start_date.unwrap_or_else(|| Utc::now().date_naive()),
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            mode: self.mode,
            months: self.months,
            offset: self.offset,
            start_date: self.start_date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoParams {
    pub mode: Mode,
    pub start_date: String,
}

/// Successful response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub source: Source,
    /// Capture time, epoch milliseconds
    pub timestamp: i64,
    pub params: EchoParams,
    pub data: Payload,
}

/// Cache-aside front of an [`AvailabilitySource`]
pub struct AvailabilityService<A> {
    source: A,
    cache: ResponseCache<CacheKey, Payload>,
    builds: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl<A: AvailabilitySource> AvailabilityService<A> {
    pub fn new(source: A, ttl: Duration) -> Self {
        Self {
            source,
            cache: ResponseCache::new(ttl),
            builds: DashMap::new(),
        }
    }

    pub fn source(&self) -> &A {
        &self.source
    }

    pub fn cache(&self) -> &ResponseCache<CacheKey, Payload> {
        &self.cache
    }

    /// Serve from cache, or scrape and cache. Concurrent misses on one key
    /// run a single scrape; the others wait for it and read the cache.
    pub async fn query(&self, query: AvailabilityQuery) -> Result<Envelope, AvailabilityError> {
        let key = query.cache_key();

        if let Some(data) = self.cache.get(&key) {
            debug!(%key, "Cache hit");
            return Ok(envelope(Source::Cache, &query, data));
        }

        let build = self
            .builds
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let outcome = {
            let _guard = build.lock().await;
            match self.cache.get(&key) {
                Some(data) => Ok(envelope(Source::Cache, &query, data)),
                None => self.build(&query).await.map(|data| {
                    self.cache.insert(key, data.clone());
                    envelope(Source::Live, &query, data)
                }),
            }
        };
        drop(build);
        self.builds
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    async fn build(&self, query: &AvailabilityQuery) -> Result<Payload, AvailabilityError> {
        info!(
            "Cache miss. Starting {} scraper job against {} (Start: {})...",
            query.mode,
            self.source.source_name(),
            iso_date(query.start_date)
        );

        let payload = if query.mode.is_fast_check() {
            self.source
                .fast_check(query.start_date)
                .await
                .map(Payload::Check)
        } else {
            self.source
                .calendar_scan(ScanRequest {
                    start_date: query.start_date,
                    months: query.months,
                    skip_months: query.offset,
                })
                .await
                .map(Payload::Calendar)
        };
        payload.map_err(AvailabilityError::Extraction)
    }
}

fn envelope(source: Source, query: &AvailabilityQuery, data: Payload) -> Envelope {
    Envelope {
        source,
        timestamp: Utc::now().timestamp_millis(),
        params: EchoParams {
            mode: query.mode,
            start_date: iso_date(query.start_date),
        },
        data,
    }
}
