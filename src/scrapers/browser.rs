use crate::models::{RoomCard, RoomOption};
use crate::scrapers::dom::{self, Reveal};
use crate::scrapers::parse;
use crate::scrapers::session::{blocking, BrowsingContext};
use crate::scrapers::traits::BookingPage;
use crate::scrapers::types::{CalendarTable, DateField, SiteConfig};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use headless_chrome::browser::tab::Tab;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Booking page driven through a headless Chrome tab
pub struct ChromePage {
    context: BrowsingContext,
    site: Arc<SiteConfig>,
}

impl ChromePage {
    pub fn new(context: BrowsingContext, site: Arc<SiteConfig>) -> Self {
        Self { context, site }
    }

    pub fn into_context(self) -> BrowsingContext {
        self.context
    }

    fn tab(&self) -> Arc<Tab> {
        self.context.tab()
    }

    /// Evaluate `script` and return its primitive result
    async fn eval(&self, script: String) -> Result<Value> {
        let tab = self.tab();
        blocking(move || {
            let result = tab
                .evaluate(&script, false)
                .context("Script evaluation failed")?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
    }

    async fn eval_bool(&self, script: String) -> Result<bool> {
        Ok(self.eval(script).await?.as_bool().unwrap_or(false))
    }

    async fn eval_string(&self, script: &str) -> Result<String> {
        Ok(self
            .eval(script.to_string())
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        let tab = self.tab();
        let selector = selector.to_string();
        blocking(move || {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .with_context(|| format!("Timed out waiting for `{}`", selector))?;
            Ok(())
        })
        .await
    }

    async fn document_html(&self) -> Result<String> {
        self.eval_string(dom::DOCUMENT_HTML).await
    }
}

#[async_trait]
impl BookingPage for ChromePage {
    async fn open(&self) -> Result<()> {
        let tab = self.tab();
        let url = self.site.booking_url.clone();
        debug!("Opening {}", url);
        blocking(move || {
            tab.navigate_to(&url)
                .with_context(|| format!("Failed to open {}", url))?;
            tab.wait_until_navigated()
                .with_context(|| format!("Navigation to {} did not finish", url))?;
            Ok(())
        })
        .await
    }

    async fn set_date_field(&self, field: DateField, value: &str) -> Result<()> {
        let selector = match field {
            DateField::CheckIn => &self.site.check_in_field,
            DateField::CheckOut => &self.site.check_out_field,
        };
        self.wait_for(selector, self.site.field_timeout).await?;
        if !self.eval_bool(dom::set_locked_input(selector, value)).await? {
            bail!("Date field `{}` disappeared before it could be set", selector);
        }
        debug!(field = ?field, value, "Date field set");
        Ok(())
    }

    async fn submit_search(&self) -> Result<()> {
        let tab = self.tab();
        let button = self.site.search_button.clone();
        let field_timeout = self.site.field_timeout;
        let nav_timeout = self.site.search_navigation_timeout;
        let default_timeout = self.site.navigation_timeout;
        blocking(move || {
            tab.wait_for_element_with_custom_timeout(&button, field_timeout)
                .with_context(|| format!("Search control `{}` not found", button))?
                .click()
                .context("Failed to click search")?;

            // The site often refreshes results over AJAX without navigating
            tab.set_default_timeout(nav_timeout);
            if let Err(e) = tab.wait_until_navigated() {
                debug!("No navigation after search: {}", e);
            }
            tab.set_default_timeout(default_timeout);
            Ok(())
        })
        .await
    }

    async fn open_calendar_overlay(&self) -> Result<()> {
        let trigger = &self.site.calendar_trigger;
        self.wait_for(trigger, self.site.calendar_trigger_timeout)
            .await?;
        self.eval(dom::normalize_interactability(
            trigger,
            Reveal::Basic,
            &self.site.blockers,
        ))
        .await?;

        let tab = self.tab();
        let selector = trigger.clone();
        blocking(move || {
            tab.find_element(&selector)
                .with_context(|| format!("Calendar control `{}` not found", selector))?
                .click()
                .context("Failed to click calendar control")?;
            Ok(())
        })
        .await?;

        self.wait_for(&self.site.results_table, self.site.table_timeout)
            .await
    }

    async fn room_options(&self) -> Result<Vec<RoomOption>> {
        let select = &self.site.room_select;
        self.wait_for(select, self.site.room_select_timeout).await?;
        self.eval(dom::normalize_interactability(select, Reveal::Full, &[]))
            .await?;
        let html = self.document_html().await?;
        parse::parse_room_options(&html, &self.site)
    }

    async fn select_room(&self, value: &str) -> Result<()> {
        let select = &self.site.room_select;
        if !self.eval_bool(dom::select_first_option(select, value)).await? {
            bail!("Room selector `{}` is gone", select);
        }
        Ok(())
    }

    async fn advance_page(&self) -> Result<bool> {
        self.eval_bool(dom::click_if_present(&self.site.next_page))
            .await
    }

    async fn calendar_table(&self) -> Result<CalendarTable> {
        let html = self.document_html().await?;
        parse::parse_calendar_table(&html, &self.site)
    }

    async fn body_text(&self) -> Result<String> {
        self.eval_string(dom::BODY_TEXT).await
    }

    async fn room_cards(&self) -> Result<Vec<RoomCard>> {
        self.eval(dom::stamp_rendered(&self.site.room_card)).await?;
        let html = self.document_html().await?;
        parse::parse_room_cards(&html, &self.site)
    }
}
