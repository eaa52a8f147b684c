use crate::cache::DEFAULT_TTL;
use crate::scrapers::session::LaunchSettings;
use crate::scrapers::types::{SettleDelays, SiteConfig};
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub site: SiteConfig,
    pub delays: SettleDelays,
    pub launch: LaunchSettings,
    pub cache_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; unset variables keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut site = SiteConfig::default();
        if let Some(url) = var("BOOKING_URL") {
            site.booking_url = url;
        }
        site.navigation_timeout = millis(&var, "NAVIGATION_TIMEOUT_MS", site.navigation_timeout)?;

        let defaults = SettleDelays::default();
        let delays = SettleDelays {
            after_search: millis(&var, "SETTLE_AFTER_SEARCH_MS", defaults.after_search)?,
            after_check_search: millis(&var, "SETTLE_AFTER_CHECK_MS", defaults.after_check_search)?,
            after_room_select: millis(&var, "SETTLE_AFTER_ROOM_MS", defaults.after_room_select)?,
            after_skip: millis(&var, "SETTLE_AFTER_SKIP_MS", defaults.after_skip)?,
            after_page_advance: millis(&var, "SETTLE_AFTER_PAGE_MS", defaults.after_page_advance)?,
            empty_retry: millis(&var, "SETTLE_EMPTY_RETRY_MS", defaults.empty_retry)?,
        };

        let launch = LaunchSettings {
            headless: parsed::<bool, _>(&var, "CHROME_HEADLESS")?.unwrap_or(true),
            chrome_path: var("CHROME_PATH").map(PathBuf::from),
            ..LaunchSettings::default()
        };

        let cache_ttl = parsed::<u64, _>(&var, "CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TTL);

        Ok(Self {
            site,
            delays,
            launch,
            cache_ttl,
        })
    }
}

fn parsed<T, F>(var: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} must be a valid {}", name, std::any::type_name::<T>()))
        })
        .transpose()
}

fn millis<F>(var: &F, name: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parsed::<u64, _>(var, name)?
        .map(Duration::from_millis)
        .unwrap_or(default))
}
