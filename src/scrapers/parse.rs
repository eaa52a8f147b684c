use crate::models::{RoomCard, RoomOption, RoomStatus};
use crate::scrapers::types::{CalendarCell, CalendarTable, SiteConfig};
use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Attribute stamped on room cards with the result of the layout probe
pub const RENDERED_ATTR: &str = "data-rendered";

/// Card price shown when neither a price element nor a price pattern is found
pub const PRICE_UNKNOWN: &str = "Check Details";

pub const UNKNOWN_ROOM: &str = "Unknown Room";

static DATE_IN_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)for\s+(.*?)\s+with").expect("valid date pattern"));

static CURRENCY_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Rs\.?\s*([\d,]+)").expect("valid price pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector `{}`: {}", css, e))
}

fn text_of(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Calendar date inside a cell label: the text between "for " and " with"
pub fn date_from_label(label: &str) -> Option<String> {
    let captures = DATE_IN_LABEL.captures(label)?;
    let date = collapse_whitespace(captures.get(1)?.as_str());
    if date.is_empty() {
        None
    } else {
        Some(date)
    }
}

/// Number following a currency prefix ("Rs. 4,500" -> "4,500")
pub fn price_from_text(text: &str) -> Option<String> {
    CURRENCY_PRICE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Options of the first room selector in the document.
/// The site sometimes renders the selector twice with the same id.
pub fn parse_room_options(html: &str, site: &SiteConfig) -> Result<Vec<RoomOption>> {
    let document = Html::parse_document(html);
    let select_selector = selector(&site.room_select)?;
    let option_selector = selector("option")?;

    let Some(select) = document.select(&select_selector).next() else {
        return Ok(Vec::new());
    };

    Ok(select
        .select(&option_selector)
        .map(|option| {
            let label = text_of(&option).trim().to_string();
            let value = option.value().attr("value").unwrap_or(label.as_str()).to_string();
            RoomOption::new(value, label)
        })
        .collect())
}

/// Rows of the availability table that hold a `td`, and their cells.
/// The first cell of a row is its header.
pub fn parse_calendar_table(html: &str, site: &SiteConfig) -> Result<CalendarTable> {
    let document = Html::parse_document(html);
    let row_selector = selector(&format!("{} tr", site.results_table))?;
    let cell_selector = selector("td")?;
    let span_selector = selector("span")?;

    let mut table = CalendarTable::default();
    for row in document.select(&row_selector) {
        let mut row_cells = row.select(&cell_selector).peekable();
        if row_cells.peek().is_none() {
            continue;
        }
        table.data_rows += 1;

        for cell in row_cells.skip(1) {
            let label = cell.value().attr("aria-label").unwrap_or_default().to_string();
            // an empty span is an empty price; no span at all is no price
            let price = cell
                .select(&span_selector)
                .next()
                .map(|span| text_of(&span).trim().to_string());
            let available = cell
                .value()
                .classes()
                .any(|class| class == site.available_class);
            table.cells.push(CalendarCell {
                label,
                price,
                available,
            });
        }
    }
    Ok(table)
}

/// Room cards of the results page. Expects the layout probe to have stamped
/// `data-rendered`; cards without the stamp count as rendered.
pub fn parse_room_cards(html: &str, site: &SiteConfig) -> Result<Vec<RoomCard>> {
    let document = Html::parse_document(html);
    let card_selector = selector(&site.room_card)?;
    let price_selector = selector(&site.card_price)?;
    let name_selectors = site
        .card_name
        .iter()
        .map(|css| selector(css))
        .collect::<Result<Vec<_>>>()?;

    let cards = document
        .select(&card_selector)
        .map(|card| {
            let rendered = card.value().attr(RENDERED_ATTR) != Some("0");
            let text = text_of(&card);

            let name = name_selectors
                .iter()
                .find_map(|s| card.select(s).next())
                .map(|el| text_of(&el).trim().to_string())
                .unwrap_or_else(|| UNKNOWN_ROOM.to_string());

            let marked_sold_out = text.contains(&site.card_sold_out_text)
                || card
                    .value()
                    .classes()
                    .any(|class| class == site.card_sold_out_class);

            let price = card
                .select(&price_selector)
                .next()
                .map(|el| text_of(&el).trim().to_string())
                .filter(|p| !p.is_empty())
                .or_else(|| price_from_text(&text))
                .unwrap_or_else(|| PRICE_UNKNOWN.to_string());

            RoomCard {
                name,
                status: if !rendered || marked_sold_out {
                    RoomStatus::SoldOut
                } else {
                    RoomStatus::Available
                },
                price,
            }
        })
        .collect();
    Ok(cards)
}
