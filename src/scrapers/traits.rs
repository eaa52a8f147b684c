use crate::models::{CalendarScanResult, FastCheckResult, RoomCard, RoomOption};
use crate::scrapers::types::{CalendarTable, DateField, ScanRequest};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Low-level interactions with the booking page inside one browsing context.
/// The extraction strategies only talk to the site through this trait.
#[async_trait]
pub trait BookingPage: Send + Sync {
    /// Load the booking page
    async fn open(&self) -> Result<()>;

    /// Write a date into a locked input and fire its change/input listeners
    async fn set_date_field(&self, field: DateField, value: &str) -> Result<()>;

    /// Press search. A missing navigation is not an error; the site may refresh in place.
    async fn submit_search(&self) -> Result<()>;

    /// Open the availability calendar overlay and wait for its table
    async fn open_calendar_overlay(&self) -> Result<()>;

    /// Every option of the room-type selector, placeholders included
    async fn room_options(&self) -> Result<Vec<RoomOption>>;

    /// Pick a room in the first room-type selector
    async fn select_room(&self, value: &str) -> Result<()>;

    /// Move the calendar one page forward. `false` means there is no further page.
    async fn advance_page(&self) -> Result<bool>;

    /// The currently rendered availability table
    async fn calendar_table(&self) -> Result<CalendarTable>;

    /// Rendered text of the whole page
    async fn body_text(&self) -> Result<String>;

    /// Room cards of the search results page
    async fn room_cards(&self) -> Result<Vec<RoomCard>>;
}

/// Hands out isolated browsing contexts backed by one shared browser
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Page: BookingPage;

    async fn acquire(&self) -> Result<Self::Page>;

    /// Close the context. Never touches the shared browser process.
    async fn release(&self, page: Self::Page);
}

/// Source of availability data behind the cache
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    async fn calendar_scan(&self, request: ScanRequest) -> Result<CalendarScanResult>;

    async fn fast_check(&self, start_date: NaiveDate) -> Result<FastCheckResult>;

    /// Get the name of the source
    fn source_name(&self) -> &'static str;
}
