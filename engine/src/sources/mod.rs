//! External text sources.
//!
//! The render pipeline only depends on the traits in this module. Each has
//! one HTTP-backed implementation:
//!
//! - [`weather::TomorrowIo`]: current weather via the tomorrow.io REST API
//! - [`webuntis::WebUntis`]: today's lessons and the holiday list via the
//!   WebUntis JSON-RPC API
//!
//! [`timetable`] turns the raw timetable data into display lines.

pub mod timetable;
pub mod weather;
pub mod webuntis;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::FetchError;

pub use timetable::{Holiday, Lesson, LessonCode, Timetable};
pub use weather::TomorrowIo;
pub use webuntis::WebUntis;

/// Provides a one-line-ish weather summary for "now".
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetches the current weather. `stamp` is the render time as shown to
    /// the user (`HH:MM:SS`).
    async fn current(&self, stamp: &str) -> Result<String, FetchError>;
}

/// Provides the lessons of a day and the school holiday calendar.
#[async_trait]
pub trait TimetableSource: Send + Sync {
    /// Fetches lessons for `day` and all known holidays.
    async fn fetch(&self, day: NaiveDate) -> Result<Timetable, FetchError>;
}
