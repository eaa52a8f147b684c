use std::time::Duration;

/// Booking page the engine drives
pub const DEFAULT_BOOKING_URL: &str = "https://live.ipms247.com/booking/book-rooms-blytonbungalow";

/// Selectors, phrases and step timeouts of the target site.
/// Every field here is owned by the third party and drifts with their markup.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub booking_url: String,
    pub check_in_field: String,
    pub check_out_field: String,
    pub search_button: String,
    pub calendar_trigger: String,
    pub results_table: String,
    pub room_select: String,
    pub next_page: String,
    /// Overlays that swallow clicks on the calendar trigger
    pub blockers: Vec<String>,
    /// Cell class marking a bookable day
    pub available_class: String,
    pub room_card: String,
    /// Page text shown when nothing at all can be booked
    pub sold_out_phrase: String,
    pub card_sold_out_text: String,
    pub card_sold_out_class: String,
    /// Price-bearing elements inside a card, tried before the text fallback
    pub card_price: String,
    /// Room name elements inside a card, in priority order
    pub card_name: Vec<String>,
    pub navigation_timeout: Duration,
    pub field_timeout: Duration,
    pub search_navigation_timeout: Duration,
    pub calendar_trigger_timeout: Duration,
    pub table_timeout: Duration,
    pub room_select_timeout: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            booking_url: DEFAULT_BOOKING_URL.to_string(),
            check_in_field: "#eZ_chkin".to_string(),
            check_out_field: "#eZ_chkout".to_string(),
            search_button: "#book".to_string(),
            calendar_trigger: "#availcalmain".to_string(),
            results_table: "table.scroll-tble".to_string(),
            room_select: "#avairoomtype".to_string(),
            next_page: "#next_dt_clk".to_string(),
            blockers: vec![
                ".sweet-alert".to_string(),
                ".sweet-overlay".to_string(),
                ".modal-backdrop".to_string(),
                ".loadingbar".to_string(),
            ],
            available_class: "avail".to_string(),
            room_card: ".vres-roomlisting".to_string(),
            sold_out_phrase: "We have no rooms available".to_string(),
            card_sold_out_text: "Sold Out".to_string(),
            card_sold_out_class: "sold-out".to_string(),
            card_price: ".price, .amount, .room-rate".to_string(),
            card_name: vec!["h3.followMeBar em".to_string(), "h3".to_string()],
            navigation_timeout: Duration::from_secs(60),
            field_timeout: Duration::from_secs(10),
            search_navigation_timeout: Duration::from_secs(5),
            calendar_trigger_timeout: Duration::from_secs(10),
            table_timeout: Duration::from_secs(15),
            room_select_timeout: Duration::from_secs(10),
        }
    }
}

/// Fixed waits after actions whose page update has no completion signal.
/// Tuned by hand against the live site; keep them configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    pub after_search: Duration,
    pub after_check_search: Duration,
    pub after_room_select: Duration,
    pub after_skip: Duration,
    pub after_page_advance: Duration,
    pub empty_retry: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            after_search: Duration::from_millis(3000),
            after_check_search: Duration::from_millis(2000),
            after_room_select: Duration::from_millis(3000),
            after_skip: Duration::from_millis(1000),
            after_page_advance: Duration::from_millis(1500),
            empty_retry: Duration::from_millis(2000),
        }
    }
}

/// Which of the two date inputs to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    CheckIn,
    CheckOut,
}

/// One cell of the availability table before date parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCell {
    /// aria-label text; carries the real calendar date
    pub label: String,
    pub price: Option<String>,
    pub available: bool,
}

/// One render of the availability table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarTable {
    /// Rows holding at least one `td`, header-only rows included
    pub data_rows: usize,
    pub cells: Vec<CalendarCell>,
}

impl CalendarTable {
    /// Nothing rendered yet: no row carries a `td`
    pub fn is_empty(&self) -> bool {
        self.data_rows == 0
    }
}

/// Parameters of a calendar scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequest {
    pub start_date: chrono::NaiveDate,
    /// Pages scraped per room
    pub months: u32,
    /// Pages skipped per room before scraping
    pub skip_months: u32,
}
