//! In-memory booking page and session provider for driving the engine in tests.

use crate::models::{RoomCard, RoomOption};
use crate::scrapers::traits::{BookingPage, SessionProvider};
use crate::scrapers::types::{CalendarCell, CalendarTable, DateField};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn cell(label: &str, price: Option<&str>, available: bool) -> CalendarCell {
    CalendarCell {
        label: label.to_string(),
        price: price.map(str::to_string),
        available,
    }
}

#[derive(Default)]
struct PageState {
    selected: Option<String>,
    page_index: usize,
    empty_reads_left: usize,
    table_reads: usize,
    advances: usize,
    date_fields: Vec<(DateField, String)>,
    calls: Vec<&'static str>,
}

/// Site simulation: each room owns a list of calendar pages
#[derive(Default)]
pub struct ScriptedPage {
    rooms: Vec<RoomOption>,
    pages: HashMap<String, Vec<Vec<CalendarCell>>>,
    body_text: String,
    cards: Vec<RoomCard>,
    empty_reads: usize,
    fail_selecting: Option<String>,
    fail_open: bool,
    header_rows_only: bool,
    state: Mutex<PageState>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(mut self, value: &str, label: &str, pages: Vec<Vec<CalendarCell>>) -> Self {
        self.rooms.push(RoomOption::new(value, label));
        self.pages.insert(value.to_string(), pages);
        self
    }

    /// Table reads that come back empty after each room selection
    pub fn empty_reads(mut self, count: usize) -> Self {
        self.empty_reads = count;
        self
    }

    pub fn fail_selecting(mut self, value: &str) -> Self {
        self.fail_selecting = Some(value.to_string());
        self
    }

    /// Pages without cells still render rows holding only their header `td`
    pub fn header_rows_only(mut self) -> Self {
        self.header_rows_only = true;
        self
    }

    pub fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn body_text(mut self, text: &str) -> Self {
        self.body_text = text.to_string();
        self
    }

    pub fn cards(mut self, cards: Vec<RoomCard>) -> Self {
        self.cards = cards;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PageState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: &'static str) {
        self.state().calls.push(call);
    }

    pub fn table_reads(&self) -> usize {
        self.state().table_reads
    }

    pub fn advances(&self) -> usize {
        self.state().advances
    }

    pub fn date_fields(&self) -> Vec<(DateField, String)> {
        self.state().date_fields.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    fn current_pages(&self, state: &PageState) -> Option<&Vec<Vec<CalendarCell>>> {
        state.selected.as_ref().and_then(|room| self.pages.get(room))
    }
}

#[async_trait]
impl BookingPage for ScriptedPage {
    async fn open(&self) -> Result<()> {
        self.record("open");
        if self.fail_open {
            bail!("Timed out waiting for `#eZ_chkin`");
        }
        Ok(())
    }

    async fn set_date_field(&self, field: DateField, value: &str) -> Result<()> {
        self.record("set_date_field");
        self.state().date_fields.push((field, value.to_string()));
        Ok(())
    }

    async fn submit_search(&self) -> Result<()> {
        self.record("submit_search");
        Ok(())
    }

    async fn open_calendar_overlay(&self) -> Result<()> {
        self.record("open_calendar_overlay");
        Ok(())
    }

    async fn room_options(&self) -> Result<Vec<RoomOption>> {
        self.record("room_options");
        Ok(self.rooms.clone())
    }

    async fn select_room(&self, value: &str) -> Result<()> {
        self.record("select_room");
        if self.fail_selecting.as_deref() == Some(value) {
            bail!("Room selector `#avairoomtype` is gone");
        }
        if !self.pages.contains_key(value) {
            return Err(anyhow!("no such room {}", value));
        }
        let mut state = self.state();
        state.selected = Some(value.to_string());
        state.page_index = 0;
        state.empty_reads_left = self.empty_reads;
        Ok(())
    }

    async fn advance_page(&self) -> Result<bool> {
        self.record("advance_page");
        let mut state = self.state();
        let page_count = self.current_pages(&state).map_or(0, Vec::len);
        if state.page_index + 1 >= page_count {
            return Ok(false);
        }
        state.page_index += 1;
        state.advances += 1;
        Ok(true)
    }

    async fn calendar_table(&self) -> Result<CalendarTable> {
        self.record("calendar_table");
        let mut state = self.state();
        state.table_reads += 1;
        if state.empty_reads_left > 0 {
            state.empty_reads_left -= 1;
            return Ok(CalendarTable::default());
        }
        let cells = self
            .current_pages(&state)
            .and_then(|pages| pages.get(state.page_index))
            .cloned()
            .unwrap_or_default();
        let data_rows = usize::from(!cells.is_empty() || self.header_rows_only);
        Ok(CalendarTable { data_rows, cells })
    }

    async fn body_text(&self) -> Result<String> {
        self.record("body_text");
        Ok(self.body_text.clone())
    }

    async fn room_cards(&self) -> Result<Vec<RoomCard>> {
        self.record("room_cards");
        Ok(self.cards.clone())
    }
}

/// Provider handing out clones of one scripted page and counting releases
pub struct ScriptedSessions {
    page: Arc<ScriptedPage>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    fail_acquire: bool,
}

impl ScriptedSessions {
    pub fn new(page: ScriptedPage) -> Self {
        Self {
            page: Arc::new(page),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            fail_acquire: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_acquire: true,
            ..Self::new(ScriptedPage::new())
        }
    }

    pub fn page(&self) -> &ScriptedPage {
        &self.page
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for ScriptedSessions {
    type Page = Arc<ScriptedPage>;

    async fn acquire(&self) -> Result<Arc<ScriptedPage>> {
        if self.fail_acquire {
            bail!("Failed to launch Chrome browser");
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(self.page.clone())
    }

    async fn release(&self, _page: Arc<ScriptedPage>) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<P: BookingPage + ?Sized> BookingPage for Arc<P> {
    async fn open(&self) -> Result<()> {
        (**self).open().await
    }

    async fn set_date_field(&self, field: DateField, value: &str) -> Result<()> {
        (**self).set_date_field(field, value).await
    }

    async fn submit_search(&self) -> Result<()> {
        (**self).submit_search().await
    }

    async fn open_calendar_overlay(&self) -> Result<()> {
        (**self).open_calendar_overlay().await
    }

    async fn room_options(&self) -> Result<Vec<RoomOption>> {
        (**self).room_options().await
    }

    async fn select_room(&self, value: &str) -> Result<()> {
        (**self).select_room(value).await
    }

    async fn advance_page(&self) -> Result<bool> {
        (**self).advance_page().await
    }

    async fn calendar_table(&self) -> Result<CalendarTable> {
        (**self).calendar_table().await
    }

    async fn body_text(&self) -> Result<String> {
        (**self).body_text().await
    }

    async fn room_cards(&self) -> Result<Vec<RoomCard>> {
        (**self).room_cards().await
    }
}
