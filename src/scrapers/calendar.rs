use crate::models::{CalendarScanResult, DateRange, DayRecord, RoomAvailability, RoomOption};
use crate::scrapers::parse::date_from_label;
use crate::scrapers::traits::BookingPage;
use crate::scrapers::types::{CalendarCell, DateField, ScanRequest, SettleDelays};
use anyhow::{Context, Result};
use std::collections::HashSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Progress of a calendar scan, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Init,
    DatesSet,
    Searched,
    CalendarOpened,
    RoomSelected,
    TableScraped(u32),
    NextRoom,
    Done,
}

/// Day records of one room, first occurrence of each date wins
#[derive(Debug, Default)]
pub struct DayCollector {
    seen: HashSet<String>,
    days: Vec<DayRecord>,
    unparsed: usize,
}

impl DayCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the cells of one table render. Returns how many labels carried no date.
    pub fn absorb(&mut self, cells: Vec<CalendarCell>) -> usize {
        let mut unparsed = 0;
        for cell in cells {
            let Some(date) = date_from_label(&cell.label) else {
                unparsed += 1;
                continue;
            };
            if self.seen.insert(date.clone()) {
                self.days.push(DayRecord {
                    date,
                    price: cell.price,
                    available: cell.available,
                });
            }
        }
        self.unparsed += unparsed;
        unparsed
    }

    pub fn unparsed(&self) -> usize {
        self.unparsed
    }

    pub fn into_days(self) -> Vec<DayRecord> {
        self.days
    }
}

/// Drop placeholder entries of the room selector
pub fn bookable_rooms(options: Vec<RoomOption>) -> Vec<RoomOption> {
    options.into_iter().filter(RoomOption::is_room).collect()
}

/// Read the table, retrying exactly once after a delay if no row carried a `td`.
/// A second empty read is accepted as an empty page.
pub async fn scrape_cells<P>(page: &P, delays: &SettleDelays) -> Result<Vec<CalendarCell>>
where
    P: BookingPage + ?Sized,
{
    let table = page.calendar_table().await?;
    if !table.is_empty() {
        return Ok(table.cells);
    }
    debug!("Calendar table empty, retrying once");
    sleep(delays.empty_retry).await;
    Ok(page.calendar_table().await?.cells)
}

/// Multi-room, multi-month scan over one browsing context
pub struct CalendarScan<'a, P: BookingPage + ?Sized> {
    page: &'a P,
    delays: SettleDelays,
    state: ScanState,
}

impl<'a, P: BookingPage + ?Sized> CalendarScan<'a, P> {
    pub fn new(page: &'a P, delays: SettleDelays) -> Self {
        Self {
            page,
            delays,
            state: ScanState::Init,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    fn enter(&mut self, state: ScanState) {
        debug!(from = ?self.state, to = ?state, "Calendar scan transition");
        self.state = state;
    }

    pub async fn run(&mut self, request: &ScanRequest) -> Result<CalendarScanResult> {
        let range = DateRange::one_night(request.start_date)
            .context("Start date has no following day")?;
        info!(
            "Setting search range: {} to {}",
            range.site_check_in(),
            range.site_check_out()
        );

        self.page.open().await?;
        self.page
            .set_date_field(DateField::CheckIn, &range.site_check_in())
            .await?;
        self.page
            .set_date_field(DateField::CheckOut, &range.site_check_out())
            .await?;
        self.enter(ScanState::DatesSet);

        self.page.submit_search().await?;
        sleep(self.delays.after_search).await;
        self.enter(ScanState::Searched);

        self.page.open_calendar_overlay().await?;
        self.enter(ScanState::CalendarOpened);

        let rooms = bookable_rooms(self.page.room_options().await?);
        info!("Found {} room types", rooms.len());

        let mut results = Vec::with_capacity(rooms.len());
        for room in &rooms {
            results.push(self.scan_room(room, request).await?);
            self.enter(ScanState::NextRoom);
        }

        self.enter(ScanState::Done);
        Ok(results)
    }

    async fn scan_room(&mut self, room: &RoomOption, request: &ScanRequest) -> Result<RoomAvailability> {
        info!("Scraping room: {}", room.label);
        self.page
            .select_room(&room.value)
            .await
            .with_context(|| format!("Failed to select room {}", room.label))?;
        sleep(self.delays.after_room_select).await;
        self.enter(ScanState::RoomSelected);

        if request.skip_months > 0 {
            debug!("Skipping {} months", request.skip_months);
            for _ in 0..request.skip_months {
                if !self.page.advance_page().await? {
                    break;
                }
                sleep(self.delays.after_skip).await;
            }
        }

        let mut collector = DayCollector::new();
        for month in 0..request.months {
            let cells = scrape_cells(self.page, &self.delays).await?;
            collector.absorb(cells);
            self.enter(ScanState::TableScraped(month + 1));

            if month + 1 < request.months {
                if !self.page.advance_page().await? {
                    debug!("No further calendar pages after {} months", month + 1);
                    break;
                }
                sleep(self.delays.after_page_advance).await;
            }
        }

        if collector.unparsed() > 0 {
            warn!(room = %room.label, unparsed = collector.unparsed(), "Skipped cells without a date");
        }
        let availability = collector.into_days();
        info!(room = %room.label, days = availability.len(), "Room scraped");

        Ok(RoomAvailability {
            room: room.label.clone(),
            availability,
        })
    }
}
