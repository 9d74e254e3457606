//! What the live session does with a sighting, against a plain connection.

use crate::engine::Sighting;
use rollcall_store::attendance::{self, AttendanceRecord, Mark};
use rollcall_store::{lectures, Lecture, StoreError};
use rusqlite::Connection;

/// Rows shown after each new record.
pub const RECENT_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nobody is recorded outside a lecture.
    NoLecture,
    AlreadyMarked { lecture: Lecture },
    Recorded {
        id: i64,
        lecture: Lecture,
        recent: Vec<AttendanceRecord>,
    },
}

/// Resolve the running lecture at the sighting time and mark attendance.
pub fn record(conn: &Connection, sighting: &Sighting) -> Result<Outcome, StoreError> {
    let Some(lecture) = lectures::current(conn, sighting.at.time())? else {
        return Ok(Outcome::NoLecture);
    };
    match attendance::mark_attendance(conn, &sighting.label, Some(&lecture), sighting.at)? {
        Mark::AlreadyMarked => Ok(Outcome::AlreadyMarked { lecture }),
        Mark::Recorded(id) => {
            let recent = attendance::todays(conn, sighting.at.date(), RECENT_ROWS)?;
            Ok(Outcome::Recorded {
                id,
                lecture,
                recent,
            })
        }
    }
}

/// Human-readable lecture status line.
pub fn status_line(lecture: Option<&Lecture>) -> String {
    match lecture {
        Some(l) => format!("ACTIVE: {} ({})", l.name, l.time_slot()),
        None => "No active lecture, attendance will not be marked".to_string(),
    }
}

/// Tracks the last announced lecture so status is only logged on change.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last: Option<Option<i64>>,
}

impl StatusTracker {
    /// Returns the status line if it differs from the previous call.
    pub fn update(&mut self, lecture: Option<&Lecture>) -> Option<String> {
        let id = lecture.map(|l| l.id);
        if self.last == Some(id) {
            return None;
        }
        self.last = Some(id);
        Some(status_line(lecture))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use rollcall_store::schema;

    fn db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn).unwrap();
        conn
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn seen(label: &str, when: NaiveDateTime) -> Sighting {
        Sighting {
            label: label.to_string(),
            similarity: 0.8,
            at: when,
        }
    }

    #[test]
    fn test_record_outside_lecture_writes_nothing() {
        let conn = db();
        let outcome = record(&conn, &seen("1_Alice", at(11, 0))).unwrap();
        assert_eq!(outcome, Outcome::NoLecture);
        assert_eq!(attendance::count_all(&conn).unwrap(), 0);
    }

    #[test]
    fn test_record_once_per_lecture() {
        let conn = db();
        let first = record(&conn, &seen("1_Alice", at(9, 15))).unwrap();
        let Outcome::Recorded { lecture, recent, .. } = first else {
            panic!("expected a new record, got {first:?}");
        };
        assert_eq!(lecture.name, "Morning Lecture");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].name, "1_Alice");

        let again = record(&conn, &seen("1_Alice", at(9, 40))).unwrap();
        assert!(matches!(again, Outcome::AlreadyMarked { .. }));

        let afternoon = record(&conn, &seen("1_Alice", at(13, 5))).unwrap();
        assert!(matches!(afternoon, Outcome::Recorded { .. }));
        assert_eq!(attendance::count_all(&conn).unwrap(), 2);
    }

    #[test]
    fn test_status_tracker_reports_changes_only() {
        let conn = db();
        let morning = lectures::current(&conn, NaiveTime::from_hms_opt(9, 30, 0).unwrap())
            .unwrap()
            .unwrap();

        let mut tracker = StatusTracker::default();
        let line = tracker.update(None).unwrap();
        assert!(line.starts_with("No active lecture"));
        assert_eq!(tracker.update(None), None);

        let line = tracker.update(Some(&morning)).unwrap();
        assert_eq!(line, "ACTIVE: Morning Lecture (09:00:00 - 10:30:00)");
        assert_eq!(tracker.update(Some(&morning)), None);
        assert!(tracker.update(None).is_some());
    }
}
