//! Lectures: named time-of-day windows that attendance is recorded against.
//!
//! A lecture is "running" purely by comparing wall-clock time of day with its
//! window. There is no recurrence, timezone or overlap handling.

use crate::{Result, StoreError, TIME_FORMAT};
use chrono::NaiveTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lecture {
    pub id: i64,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

impl Lecture {
    /// True when `now` lies inside `[start_time, end_time]`.
    pub fn is_running(&self, now: NaiveTime) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    /// `HH:MM:SS - HH:MM:SS`
    pub fn time_slot(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format(TIME_FORMAT),
            self.end_time.format(TIME_FORMAT)
        )
    }
}

/// Parse `HH:MM` or `HH:MM:SS`. `HH:MM` means second zero.
pub fn parse_clock(text: &str) -> Result<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|_| StoreError::InvalidTime(text.to_string()))
}

/// A lecture row as stored. Databases written by older tools may hold
/// free-text times, so the columns are read as text and parsed afterwards.
struct StoredLecture {
    id: i64,
    name: String,
    start: String,
    end: String,
    is_active: bool,
}

impl StoredLecture {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            start: row.get(2)?,
            end: row.get(3)?,
            is_active: row.get::<_, Option<bool>>(4)?.unwrap_or(true),
        })
    }

    fn parse(&self) -> Option<Lecture> {
        Some(Lecture {
            id: self.id,
            name: self.name.clone(),
            start_time: parse_clock(&self.start).ok()?,
            end_time: parse_clock(&self.end).ok()?,
            is_active: self.is_active,
        })
    }
}

fn stored(conn: &Connection) -> Result<Vec<StoredLecture>> {
    let mut stmt = conn.prepare(&format!("{SELECT_LECTURE} ORDER BY start_time, id"))?;
    let rows = stmt
        .query_map([], StoredLecture::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

const SELECT_LECTURE: &str =
    "SELECT id, lecture_name, start_time, end_time, is_active FROM lectures";

/// Insert a lecture and return its id.
pub fn create(conn: &Connection, name: &str, start: NaiveTime, end: NaiveTime) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::EmptyLectureName);
    }
    conn.execute(
        "INSERT INTO lectures (lecture_name, start_time, end_time) VALUES (?1, ?2, ?3)",
        params![
            name,
            start.format(TIME_FORMAT).to_string(),
            end.format(TIME_FORMAT).to_string()
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, name, "lecture created");
    Ok(id)
}

/// All lectures ordered by start time.
///
/// Rows whose times cannot be read are logged and left out.
pub fn list(conn: &Connection) -> Result<Vec<Lecture>> {
    let mut lectures = Vec::new();
    for row in stored(conn)? {
        match row.parse() {
            Some(l) => lectures.push(l),
            None => tracing::warn!(
                id = row.id,
                start = %row.start,
                end = %row.end,
                "skipping lecture with unreadable times"
            ),
        }
    }
    lectures.sort_by_key(|l| (l.start_time, l.id));
    Ok(lectures)
}

/// The lecture with this id, or `None` if there is none or its times
/// cannot be read.
pub fn get(conn: &Connection, id: i64) -> Result<Option<Lecture>> {
    let row = conn
        .query_row(
            &format!("{SELECT_LECTURE} WHERE id = ?1"),
            [id],
            StoredLecture::from_row,
        )
        .optional()?;
    Ok(row.and_then(|r| r.parse()))
}

/// The active lecture whose window contains `now`, earliest start first.
pub fn current(conn: &Connection, now: NaiveTime) -> Result<Option<Lecture>> {
    let lecture = stored(conn)?
        .iter()
        .filter(|r| r.is_active)
        .filter_map(|r| {
            let parsed = r.parse();
            if parsed.is_none() {
                tracing::debug!(id = r.id, "ignoring lecture with unreadable times");
            }
            parsed
        })
        .filter(|l| l.is_running(now))
        .min_by_key(|l| (l.start_time, l.id));
    Ok(lecture)
}

/// Number of stored lecture rows, readable or not.
pub fn count(conn: &Connection) -> Result<i64> {
    let n = conn.query_row("SELECT COUNT(*) FROM lectures", [], |r| r.get(0))?;
    Ok(n)
}

/// Number of attendance rows recorded against a lecture.
pub fn attendance_count(conn: &Connection, id: i64) -> Result<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM attendance WHERE lecture_id = ?1",
        [id],
        |r| r.get(0),
    )?;
    Ok(n)
}

/// Delete a lecture together with its attendance rows.
///
/// Returns the number of attendance rows removed.
pub fn delete(conn: &Connection, id: i64) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let removed = tx.execute("DELETE FROM attendance WHERE lecture_id = ?1", [id])?;
    let deleted = tx.execute("DELETE FROM lectures WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(StoreError::LectureNotFound(id));
    }
    tx.commit()?;
    tracing::info!(id, attendance_removed = removed, "lecture deleted");
    Ok(removed)
}

/// Number of attendance rows tied to any lecture.
pub fn linked_attendance_count(conn: &Connection) -> Result<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM attendance WHERE lecture_id IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    Ok(n)
}

/// Delete every lecture and every attendance row tied to one.
///
/// Returns `(lectures_removed, attendance_removed)`.
pub fn delete_all(conn: &Connection) -> Result<(usize, usize)> {
    let tx = conn.unchecked_transaction()?;
    let attendance = tx.execute("DELETE FROM attendance WHERE lecture_id IS NOT NULL", [])?;
    let lectures = tx.execute("DELETE FROM lectures", [])?;
    tx.commit()?;
    tracing::info!(lectures, attendance, "all lectures deleted");
    Ok((lectures, attendance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn t(s: &str) -> NaiveTime {
        parse_clock(s).unwrap()
    }

    fn db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn).unwrap();
        conn
    }

    #[test]
    fn test_parse_clock_short_and_long() {
        assert_eq!(t("09:05"), NaiveTime::from_hms_opt(9, 5, 0).unwrap());
        assert_eq!(t("09:05:30"), NaiveTime::from_hms_opt(9, 5, 30).unwrap());
        assert!(matches!(parse_clock("9am"), Err(StoreError::InvalidTime(_))));
        assert!(parse_clock("25:00").is_err());
    }

    #[test]
    fn test_seeded_lectures_listed_by_start() {
        let conn = db();
        let names: Vec<String> = list(&conn).unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, ["Morning Lecture", "Afternoon Lecture", "Evening Lecture"]);
    }

    #[test]
    fn test_current_inclusive_bounds() {
        let conn = db();
        assert_eq!(current(&conn, t("09:00:00")).unwrap().unwrap().name, "Morning Lecture");
        assert_eq!(current(&conn, t("10:30:00")).unwrap().unwrap().name, "Morning Lecture");
        assert!(current(&conn, t("10:30:01")).unwrap().is_none());
        assert!(current(&conn, t("08:59:59")).unwrap().is_none());
        assert_eq!(current(&conn, t("13:45")).unwrap().unwrap().name, "Afternoon Lecture");
    }

    #[test]
    fn test_current_ignores_inactive() {
        let conn = db();
        conn.execute(
            "UPDATE lectures SET is_active = 0 WHERE lecture_name = 'Morning Lecture'",
            [],
        )
        .unwrap();
        assert!(current(&conn, t("09:30")).unwrap().is_none());
    }

    #[test]
    fn test_current_prefers_earliest_start_on_overlap() {
        let conn = db();
        create(&conn, "Lab", t("08:30"), t("09:45")).unwrap();
        assert_eq!(current(&conn, t("09:15")).unwrap().unwrap().name, "Lab");
    }

    #[test]
    fn test_create_normalizes_short_times() {
        let conn = db();
        let id = create(&conn, "  Seminar ", t("18:00"), t("19:00")).unwrap();
        let raw: String = conn
            .query_row(
                "SELECT start_time FROM lectures WHERE id = ?1",
                [id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(raw, "18:00:00");
        assert_eq!(get(&conn, id).unwrap().unwrap().name, "Seminar");
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let conn = db();
        assert!(matches!(
            create(&conn, "   ", t("08:00"), t("09:00")),
            Err(StoreError::EmptyLectureName)
        ));
    }

    #[test]
    fn test_is_running_and_time_slot() {
        let conn = db();
        let morning = list(&conn).unwrap().remove(0);
        assert!(morning.is_running(t("10:00")));
        assert!(!morning.is_running(t("11:00")));
        assert_eq!(morning.time_slot(), "09:00:00 - 10:30:00");
    }

    #[test]
    fn test_delete_cascades_attendance() {
        let conn = db();
        conn.execute(
            "INSERT INTO attendance (name, date, time, lecture_id, lecture_name)
             VALUES ('1_Ann', '2025-01-01', '09:10:00', 1, 'Morning Lecture'),
                    ('2_Bob', '2025-01-01', '13:10:00', 2, 'Afternoon Lecture')",
            [],
        )
        .unwrap();
        assert_eq!(attendance_count(&conn, 1).unwrap(), 1);
        assert_eq!(delete(&conn, 1).unwrap(), 1);
        assert!(get(&conn, 1).unwrap().is_none());
        assert_eq!(attendance_count(&conn, 2).unwrap(), 1);
    }

    #[test]
    fn test_unreadable_times_are_skipped() {
        let conn = db();
        conn.execute(
            "INSERT INTO lectures (lecture_name, start_time, end_time)
             VALUES ('Legacy', '9am', '10am')",
            [],
        )
        .unwrap();
        let legacy = conn.last_insert_rowid();

        let names: Vec<String> = list(&conn).unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, ["Morning Lecture", "Afternoon Lecture", "Evening Lecture"]);
        assert!(get(&conn, legacy).unwrap().is_none());
        assert_eq!(current(&conn, t("09:30")).unwrap().unwrap().name, "Morning Lecture");
        assert_eq!(count(&conn).unwrap(), 4);
        assert_eq!(delete(&conn, legacy).unwrap(), 0);
    }

    #[test]
    fn test_zero_length_window_is_running_at_its_instant() {
        let conn = db();
        create(&conn, "Roll call", t("08:00"), t("08:00")).unwrap();
        assert_eq!(current(&conn, t("08:00:00")).unwrap().unwrap().name, "Roll call");
        assert!(current(&conn, t("08:00:01")).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_lecture() {
        let conn = db();
        assert!(matches!(delete(&conn, 99), Err(StoreError::LectureNotFound(99))));
    }

    #[test]
    fn test_delete_all_keeps_unlinked_attendance() {
        let conn = db();
        conn.execute(
            "INSERT INTO attendance (name, date, time, lecture_id, lecture_name)
             VALUES ('1_Ann', '2025-01-01', '09:10:00', 1, 'Morning Lecture'),
                    ('2_Bob', '2025-01-01', '12:00:00', NULL, NULL)",
            [],
        )
        .unwrap();
        assert_eq!(linked_attendance_count(&conn).unwrap(), 1);
        assert_eq!(delete_all(&conn).unwrap(), (3, 1));
        assert!(list(&conn).unwrap().is_empty());
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM attendance", [], |r| r.get(0))
            .unwrap();
        assert_eq!(left, 1);
    }
}
