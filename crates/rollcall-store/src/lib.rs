//! rollcall-store — Local persistence for lectures and attendance.
//!
//! A single SQLite file holds two tables (`lectures`, `attendance`). Enrolled
//! people are not rows: each one is a JPEG in the known-faces directory,
//! handled by [`roster`].

pub mod attendance;
pub mod lectures;
pub mod maintenance;
pub mod report;
pub mod roster;
pub mod schema;

use thiserror::Error;

pub use attendance::{AttendanceRecord, Mark};
pub use lectures::Lecture;
pub use report::Report;
pub use roster::Enrollee;
pub use schema::open;

/// `YYYY-MM-DD`, the on-disk date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// `HH:MM:SS`, the on-disk time-of-day format. Lexical order equals time order.
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid time of day: {0} (expected HH:MM or HH:MM:SS)")]
    InvalidTime(String),
    #[error("invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("lecture name must not be empty")]
    EmptyLectureName,
    #[error("lecture {0} not found")]
    LectureNotFound(i64),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Parse and validate a `YYYY-MM-DD` date, returning it in canonical form.
pub fn parse_date(text: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| StoreError::InvalidDate(text.to_string()))
}
