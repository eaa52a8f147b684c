use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date format the booking site expects in its date inputs
pub const SITE_DATE_FORMAT: &str = "%d-%m-%Y";

/// Date format used in cache keys and response envelopes
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// One-night stay used as the availability probe.
/// `check_out` is always `check_in` plus one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl DateRange {
    /// Build the probe starting at `check_in`. `None` only at the end of the calendar.
    pub fn one_night(check_in: NaiveDate) -> Option<Self> {
        let check_out = check_in.checked_add_days(Days::new(1))?;
        Some(Self { check_in, check_out })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Check-in formatted for the site (`DD-MM-YYYY`)
    pub fn site_check_in(&self) -> String {
        site_date(self.check_in())
    }

    /// Check-out formatted for the site (`DD-MM-YYYY`)
    pub fn site_check_out(&self) -> String {
        site_date(self.check_out())
    }
}

pub fn site_date(date: NaiveDate) -> String {
    date.format(SITE_DATE_FORMAT).to_string()
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Entry of the site's room-type dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOption {
    pub value: String,
    pub label: String,
}

impl RoomOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Placeholder entries ("--Select--" or empty value) are not rooms
    pub fn is_room(&self) -> bool {
        !self.value.is_empty() && self.label != "--Select--"
    }
}

/// Availability of one room on one day, as read from the calendar table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    /// Site-native date text, e.g. "Friday, 17 October 2026"
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub available: bool,
}

/// Day-by-day availability for one room type, in page traversal order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAvailability {
    pub room: String,
    pub availability: Vec<DayRecord>,
}

/// One entry per enumerated room, in enumeration order
pub type CalendarScanResult = Vec<RoomAvailability>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Available,
    #[serde(rename = "Sold Out")]
    SoldOut,
}

/// Room card shown on the search results page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCard {
    pub name: String,
    pub status: RoomStatus,
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastCheckResult {
    /// Check-in date in site format
    pub date: String,
    pub available: bool,
    pub status: RoomStatus,
    pub rooms: Vec<RoomCard>,
}

impl FastCheckResult {
    pub fn sold_out(date: String) -> Self {
        Self {
            date,
            available: false,
            status: RoomStatus::SoldOut,
            rooms: Vec::new(),
        }
    }

    /// Results page without the sold-out notice. `status` stays `Available`;
    /// `available` is true iff any card is bookable.
    pub fn from_cards(date: String, rooms: Vec<RoomCard>) -> Self {
        let available = rooms.iter().any(|r| r.status == RoomStatus::Available);
        Self {
            date,
            available,
            status: RoomStatus::Available,
            rooms,
        }
    }
}

/// Result of either extraction strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Calendar(CalendarScanResult),
    Check(FastCheckResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Calendar,
    Check,
    Single,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Calendar => "calendar",
            Mode::Check => "check",
            Mode::Single => "single",
        }
    }

    /// `check` and `single` both run the fast check
    pub fn is_fast_check(&self) -> bool {
        matches!(self, Mode::Check | Mode::Single)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calendar" => Ok(Mode::Calendar),
            "check" => Ok(Mode::Check),
            "single" => Ok(Mode::Single),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn one_night_crosses_month_and_year_boundaries() {
        for start in [date(2026, 10, 16), date(2026, 10, 31), date(2026, 12, 31), date(2028, 2, 28)] {
            let range = DateRange::one_night(start).unwrap();
            assert_eq!(range.check_in(), start);
            assert_eq!(range.check_out(), start.succ_opt().unwrap());
        }
        assert!(DateRange::one_night(NaiveDate::MAX).is_none());
    }

    #[test]
    fn site_and_iso_formats_differ() {
        let range = DateRange::one_night(date(2026, 3, 9)).unwrap();
        assert_eq!(range.site_check_in(), "09-03-2026");
        assert_eq!(range.site_check_out(), "10-03-2026");
        assert_eq!(iso_date(range.check_in()), "2026-03-09");
    }

    #[test]
    fn placeholder_rooms_are_not_rooms() {
        assert!(!RoomOption::new("", "X").is_room());
        assert!(!RoomOption::new("1", "--Select--").is_room());
        assert!(RoomOption::new("2", "Deluxe").is_room());
    }

    #[test]
    fn fast_check_is_available_when_any_card_is() {
        let cards = vec![
            RoomCard { name: "A".into(), status: RoomStatus::SoldOut, price: "Check Details".into() },
            RoomCard { name: "B".into(), status: RoomStatus::Available, price: "4,500".into() },
        ];
        let result = FastCheckResult::from_cards("17-10-2026".into(), cards);
        assert!(result.available);
        assert_eq!(result.status, RoomStatus::Available);

        let none = FastCheckResult::from_cards("17-10-2026".into(), Vec::new());
        assert!(!none.available);
        assert_eq!(none.status, RoomStatus::Available);
    }

    #[test]
    fn room_status_serializes_as_site_wording() {
        let json = serde_json::to_string(&FastCheckResult::sold_out("01-01-2027".into())).unwrap();
        assert_eq!(json, r#"{"date":"01-01-2027","available":false,"status":"Sold Out","rooms":[]}"#);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Check".parse::<Mode>().unwrap(), Mode::Check);
        assert_eq!("single".parse::<Mode>().unwrap(), Mode::Single);
        assert!("weekly".parse::<Mode>().is_err());
        assert!(Mode::Single.is_fast_check());
        assert!(!Mode::Calendar.is_fast_check());
    }
}
