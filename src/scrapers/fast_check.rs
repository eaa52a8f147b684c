use crate::models::{DateRange, FastCheckResult};
use crate::scrapers::traits::BookingPage;
use crate::scrapers::types::{DateField, SettleDelays};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::time::sleep;
use tracing::{debug, info};

/// Search one night and classify the results page
pub async fn fast_check<P>(
    page: &P,
    start_date: NaiveDate,
    sold_out_phrase: &str,
    delays: &SettleDelays,
) -> Result<FastCheckResult>
where
    P: BookingPage + ?Sized,
{
    let range = DateRange::one_night(start_date).context("Start date has no following day")?;
    let date = range.site_check_in();
    info!("[Fast Check] Searching: {} to {}", date, range.site_check_out());

    page.open().await?;
    page.set_date_field(DateField::CheckIn, &date).await?;
    page.set_date_field(DateField::CheckOut, &range.site_check_out())
        .await?;
    page.submit_search().await?;
    sleep(delays.after_check_search).await;

    let text = page.body_text().await?;
    if text.contains(sold_out_phrase) {
        info!("[Fast Check] {} is sold out", date);
        return Ok(FastCheckResult::sold_out(date));
    }

    let rooms = page.room_cards().await?;
    debug!("[Fast Check] Scraped {} room cards", rooms.len());
    Ok(FastCheckResult::from_cards(date, rooms))
}
