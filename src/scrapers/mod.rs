pub mod booking;
pub mod browser;
pub mod calendar;
pub mod dom;
pub mod fast_check;
pub mod parse;
pub mod session;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use booking::BookingScraper;
pub use session::BrowserSessions;
pub use traits::AvailabilitySource;
