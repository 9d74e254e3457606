//! Attendance rows: marking, viewing and deleting.

use crate::lectures::Lecture;
use crate::{Result, DATE_FORMAT, TIME_FORMAT};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub name: String,
    pub date: String,
    pub time: String,
    pub lecture_id: Option<i64>,
    pub lecture_name: Option<String>,
}

/// Outcome of [`mark_attendance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// A new row was written with this id.
    Recorded(i64),
    /// The student already has a row for this lecture (or day) today.
    AlreadyMarked,
}

/// Per-lecture totals for the summary view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LectureSummary {
    pub lecture_name: String,
    pub start_time: String,
    pub end_time: String,
    pub students: i64,
    pub records: i64,
    pub last_activity: Option<String>,
}

/// Per-student totals for the student view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    pub name: String,
    pub days_present: i64,
    pub lectures_attended: i64,
    pub attended_lectures: Option<String>,
}

/// Database-wide counters for the maintenance view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_records: i64,
    pub unique_students: i64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub lectures: i64,
    pub tables: Vec<String>,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        date: row.get(2)?,
        time: row.get(3)?,
        lecture_id: row.get(4)?,
        lecture_name: row.get(5)?,
    })
}

fn collect(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<AttendanceRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(args, from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn date_text(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Record `name` as present at `at`, unless already recorded.
///
/// With a lecture, a student is recorded at most once per lecture per
/// calendar day. Without one, at most once per calendar day. The existence
/// check and the insert run in one transaction.
pub fn mark_attendance(
    conn: &Connection,
    name: &str,
    lecture: Option<&Lecture>,
    at: NaiveDateTime,
) -> Result<Mark> {
    let date = at.format(DATE_FORMAT).to_string();
    let time = at.format(TIME_FORMAT).to_string();

    let tx = conn.unchecked_transaction()?;

    let existing: Option<i64> = match lecture {
        Some(l) => tx
            .query_row(
                "SELECT id FROM attendance WHERE name = ?1 AND date = ?2 AND lecture_id = ?3",
                params![name, date, l.id],
                |r| r.get(0),
            )
            .optional()?,
        None => tx
            .query_row(
                "SELECT id FROM attendance WHERE name = ?1 AND date = ?2",
                params![name, date],
                |r| r.get(0),
            )
            .optional()?,
    };

    if existing.is_some() {
        return Ok(Mark::AlreadyMarked);
    }

    tx.execute(
        "INSERT INTO attendance (name, date, time, lecture_id, lecture_name)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            name,
            date,
            time,
            lecture.map(|l| l.id),
            lecture.map(|l| l.name.as_str())
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    tracing::info!(
        name,
        lecture = lecture.map(|l| l.name.as_str()).unwrap_or("-"),
        %date,
        %time,
        "attendance marked"
    );
    Ok(Mark::Recorded(id))
}

/// Latest rows of one day, newest first.
pub fn todays(conn: &Connection, date: NaiveDate, limit: usize) -> Result<Vec<AttendanceRecord>> {
    collect(
        conn,
        "SELECT id, name, date, time, lecture_id, lecture_name
         FROM attendance WHERE date = ?1
         ORDER BY time DESC, id DESC
         LIMIT ?2",
        params![date_text(date), limit as i64],
    )
}

/// All rows, or only one lecture's, newest first.
///
/// The lecture name comes from the `lectures` table when the lecture still
/// exists and falls back to the name stored on the row.
pub fn by_lecture(conn: &Connection, lecture_id: Option<i64>) -> Result<Vec<AttendanceRecord>> {
    const BASE: &str = "SELECT a.id, a.name, a.date, a.time, a.lecture_id,
                               COALESCE(l.lecture_name, a.lecture_name)
                        FROM attendance a
                        LEFT JOIN lectures l ON a.lecture_id = l.id";
    match lecture_id {
        Some(id) => collect(
            conn,
            &format!("{BASE} WHERE a.lecture_id = ?1 ORDER BY a.date DESC, a.time DESC"),
            [id],
        ),
        None => collect(conn, &format!("{BASE} ORDER BY a.date DESC, a.time DESC"), []),
    }
}

/// Rows whose date lies in `[from, to]`, newest first.
pub fn by_date_range(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<AttendanceRecord>> {
    collect(
        conn,
        "SELECT a.id, a.name, a.date, a.time, a.lecture_id,
                COALESCE(l.lecture_name, a.lecture_name)
         FROM attendance a
         LEFT JOIN lectures l ON a.lecture_id = l.id
         WHERE a.date BETWEEN ?1 AND ?2
         ORDER BY a.date DESC, a.time DESC",
        params![date_text(from), date_text(to)],
    )
}

pub fn lecture_summary(conn: &Connection) -> Result<Vec<LectureSummary>> {
    let mut stmt = conn.prepare(
        "SELECT l.lecture_name, l.start_time, l.end_time,
                COUNT(DISTINCT a.name), COUNT(a.id), MAX(a.date)
         FROM lectures l
         LEFT JOIN attendance a ON l.id = a.lecture_id
         GROUP BY l.id, l.lecture_name, l.start_time, l.end_time
         ORDER BY l.start_time",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(LectureSummary {
                lecture_name: r.get(0)?,
                start_time: r.get(1)?,
                end_time: r.get(2)?,
                students: r.get(3)?,
                records: r.get(4)?,
                last_activity: r.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn student_summary(conn: &Connection, name: Option<&str>) -> Result<Vec<StudentSummary>> {
    const BASE: &str = "SELECT name, COUNT(DISTINCT date), COUNT(DISTINCT lecture_id),
                               GROUP_CONCAT(DISTINCT lecture_name)
                        FROM attendance";
    let map = |r: &Row<'_>| -> rusqlite::Result<StudentSummary> {
        Ok(StudentSummary {
            name: r.get(0)?,
            days_present: r.get(1)?,
            lectures_attended: r.get(2)?,
            attended_lectures: r.get(3)?,
        })
    };
    let sql = match name {
        Some(_) => format!("{BASE} WHERE name = ?1 GROUP BY name"),
        None => format!("{BASE} GROUP BY name ORDER BY name"),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = match name {
        Some(n) => stmt.query_map([n], map)?.collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt.query_map([], map)?.collect::<rusqlite::Result<Vec<_>>>()?,
    };
    Ok(rows)
}

pub fn statistics(conn: &Connection) -> Result<Statistics> {
    let (total_records, unique_students, first_date, last_date) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT name), MIN(date), MAX(date) FROM attendance",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )?;
    let lectures = conn.query_row("SELECT COUNT(*) FROM lectures", [], |r| r.get(0))?;
    Ok(Statistics {
        total_records,
        unique_students,
        first_date,
        last_date,
        lectures,
        tables: crate::schema::table_names(conn)?,
    })
}

// --- Deletion ---
//
// Each `count_*` pairs with a `delete_*` over the same predicate so callers
// can confirm before removing anything.

pub fn count_by_name(conn: &Connection, name: &str) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM attendance WHERE name = ?1", [name], |r| r.get(0))?)
}

pub fn delete_by_name(conn: &Connection, name: &str) -> Result<usize> {
    let n = conn.execute("DELETE FROM attendance WHERE name = ?1", [name])?;
    tracing::info!(name, deleted = n, "attendance deleted by name");
    Ok(n)
}

pub fn count_by_date(conn: &Connection, date: NaiveDate) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM attendance WHERE date = ?1",
        [date_text(date)],
        |r| r.get(0),
    )?)
}

pub fn delete_by_date(conn: &Connection, date: NaiveDate) -> Result<usize> {
    let n = conn.execute("DELETE FROM attendance WHERE date = ?1", [date_text(date)])?;
    tracing::info!(%date, deleted = n, "attendance deleted by date");
    Ok(n)
}

pub fn count_by_date_range(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM attendance WHERE date BETWEEN ?1 AND ?2",
        params![date_text(from), date_text(to)],
        |r| r.get(0),
    )?)
}

pub fn delete_by_date_range(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM attendance WHERE date BETWEEN ?1 AND ?2",
        params![date_text(from), date_text(to)],
    )?;
    tracing::info!(%from, %to, deleted = n, "attendance deleted by date range");
    Ok(n)
}

pub fn count_all(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM attendance", [], |r| r.get(0))?)
}

pub fn delete_all(conn: &Connection) -> Result<usize> {
    let n = conn.execute("DELETE FROM attendance", [])?;
    tracing::info!(deleted = n, "all attendance deleted");
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lectures, schema};

    fn db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn).unwrap();
        conn
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        crate::parse_date(s).unwrap()
    }

    fn lecture(conn: &Connection, id: i64) -> Lecture {
        lectures::get(conn, id).unwrap().unwrap()
    }

    #[test]
    fn test_mark_once_per_lecture_per_day() {
        let conn = db();
        let morning = lecture(&conn, 1);

        let first =
            mark_attendance(&conn, "7_Ann", Some(&morning), at("2025-03-03 09:05:00")).unwrap();
        assert!(matches!(first, Mark::Recorded(_)));

        let again =
            mark_attendance(&conn, "7_Ann", Some(&morning), at("2025-03-03 09:40:00")).unwrap();
        assert_eq!(again, Mark::AlreadyMarked);
        assert_eq!(count_all(&conn).unwrap(), 1);
    }

    #[test]
    fn test_mark_other_lecture_same_day() {
        let conn = db();
        let morning = lecture(&conn, 1);
        let afternoon = lecture(&conn, 2);
        mark_attendance(&conn, "7_Ann", Some(&morning), at("2025-03-03 09:05:00")).unwrap();
        let r =
            mark_attendance(&conn, "7_Ann", Some(&afternoon), at("2025-03-03 13:05:00")).unwrap();
        assert!(matches!(r, Mark::Recorded(_)));
    }

    #[test]
    fn test_mark_same_lecture_next_day() {
        let conn = db();
        let morning = lecture(&conn, 1);
        mark_attendance(&conn, "7_Ann", Some(&morning), at("2025-03-03 09:05:00")).unwrap();
        let r = mark_attendance(&conn, "7_Ann", Some(&morning), at("2025-03-04 09:05:00")).unwrap();
        assert!(matches!(r, Mark::Recorded(_)));
    }

    #[test]
    fn test_mark_without_lecture_is_once_per_day() {
        let conn = db();
        let morning = lecture(&conn, 1);
        mark_attendance(&conn, "7_Ann", Some(&morning), at("2025-03-03 09:05:00")).unwrap();
        let r = mark_attendance(&conn, "7_Ann", None, at("2025-03-03 12:00:00")).unwrap();
        assert_eq!(r, Mark::AlreadyMarked);
        let r = mark_attendance(&conn, "8_Bob", None, at("2025-03-03 12:00:00")).unwrap();
        assert!(matches!(r, Mark::Recorded(_)));
    }

    #[test]
    fn test_mark_stores_denormalized_lecture_name() {
        let conn = db();
        let morning = lecture(&conn, 1);
        mark_attendance(&conn, "7_Ann", Some(&morning), at("2025-03-03 09:05:07")).unwrap();
        let rows = todays(&conn, day("2025-03-03"), 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time, "09:05:07");
        assert_eq!(rows[0].lecture_id, Some(1));
        assert_eq!(rows[0].lecture_name.as_deref(), Some("Morning Lecture"));
    }

    #[test]
    fn test_todays_newest_first_with_limit() {
        let conn = db();
        for (i, t) in ["09:01:00", "09:03:00", "09:02:00"].iter().enumerate() {
            let when = at(&format!("2025-03-03 {t}"));
            mark_attendance(&conn, &format!("{i}_S"), None, when).unwrap();
        }
        mark_attendance(&conn, "9_Other", None, at("2025-03-02 09:00:00")).unwrap();

        let rows = todays(&conn, day("2025-03-03"), 2).unwrap();
        let times: Vec<&str> = rows.iter().map(|r| r.time.as_str()).collect();
        assert_eq!(times, ["09:03:00", "09:02:00"]);
    }

    #[test]
    fn test_by_lecture_filters() {
        let conn = db();
        let morning = lecture(&conn, 1);
        let evening = lecture(&conn, 3);
        mark_attendance(&conn, "1_A", Some(&morning), at("2025-03-03 09:05:00")).unwrap();
        mark_attendance(&conn, "1_A", Some(&evening), at("2025-03-03 16:05:00")).unwrap();
        mark_attendance(&conn, "2_B", Some(&evening), at("2025-03-04 16:10:00")).unwrap();

        assert_eq!(by_lecture(&conn, None).unwrap().len(), 3);
        let evening_rows = by_lecture(&conn, Some(3)).unwrap();
        assert_eq!(evening_rows.len(), 2);
        assert_eq!(evening_rows[0].date, "2025-03-04");
        assert!(evening_rows.iter().all(|r| r.lecture_name.as_deref() == Some("Evening Lecture")));
    }

    #[test]
    fn test_by_date_range_inclusive() {
        let conn = db();
        for d in ["2025-03-01", "2025-03-02", "2025-03-03", "2025-03-04"] {
            mark_attendance(&conn, "1_A", None, at(&format!("{d} 10:00:00"))).unwrap();
        }
        let rows = by_date_range(&conn, day("2025-03-02"), day("2025-03-03")).unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, ["2025-03-03", "2025-03-02"]);
    }

    #[test]
    fn test_lecture_summary_counts() {
        let conn = db();
        let morning = lecture(&conn, 1);
        mark_attendance(&conn, "1_A", Some(&morning), at("2025-03-03 09:05:00")).unwrap();
        mark_attendance(&conn, "1_A", Some(&morning), at("2025-03-04 09:05:00")).unwrap();
        mark_attendance(&conn, "2_B", Some(&morning), at("2025-03-04 09:06:00")).unwrap();

        let summary = lecture_summary(&conn).unwrap();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].lecture_name, "Morning Lecture");
        assert_eq!(summary[0].students, 2);
        assert_eq!(summary[0].records, 3);
        assert_eq!(summary[0].last_activity.as_deref(), Some("2025-03-04"));
        assert_eq!(summary[1].records, 0);
        assert_eq!(summary[1].last_activity, None);
    }

    #[test]
    fn test_student_summary() {
        let conn = db();
        let morning = lecture(&conn, 1);
        let afternoon = lecture(&conn, 2);
        mark_attendance(&conn, "1_A", Some(&morning), at("2025-03-03 09:05:00")).unwrap();
        mark_attendance(&conn, "1_A", Some(&afternoon), at("2025-03-03 13:05:00")).unwrap();
        mark_attendance(&conn, "1_A", Some(&morning), at("2025-03-04 09:05:00")).unwrap();
        mark_attendance(&conn, "2_B", Some(&morning), at("2025-03-04 09:06:00")).unwrap();

        let all = student_summary(&conn, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "1_A");
        assert_eq!(all[0].days_present, 2);
        assert_eq!(all[0].lectures_attended, 2);
        let lectures = all[0].attended_lectures.clone().unwrap();
        assert!(lectures.contains("Morning Lecture") && lectures.contains("Afternoon Lecture"));

        let one = student_summary(&conn, Some("2_B")).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].days_present, 1);
        assert!(student_summary(&conn, Some("nobody")).unwrap().is_empty());
    }

    #[test]
    fn test_statistics() {
        let conn = db();
        let empty = statistics(&conn).unwrap();
        assert_eq!(empty.total_records, 0);
        assert_eq!(empty.first_date, None);
        assert_eq!(empty.lectures, 3);

        mark_attendance(&conn, "1_A", None, at("2025-03-01 10:00:00")).unwrap();
        mark_attendance(&conn, "1_A", None, at("2025-03-05 10:00:00")).unwrap();
        mark_attendance(&conn, "2_B", None, at("2025-03-03 10:00:00")).unwrap();
        let stats = statistics(&conn).unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.unique_students, 2);
        assert_eq!(stats.first_date.as_deref(), Some("2025-03-01"));
        assert_eq!(stats.last_date.as_deref(), Some("2025-03-05"));
    }

    #[test]
    fn test_delete_helpers() {
        let conn = db();
        let rows = [
            ("1_A", "2025-03-01"),
            ("1_A", "2025-03-02"),
            ("2_B", "2025-03-02"),
            ("2_B", "2025-03-09"),
        ];
        for (name, d) in rows {
            mark_attendance(&conn, name, None, at(&format!("{d} 10:00:00"))).unwrap();
        }

        assert_eq!(count_by_name(&conn, "1_A").unwrap(), 2);
        assert_eq!(delete_by_name(&conn, "1_A").unwrap(), 2);

        assert_eq!(count_by_date(&conn, day("2025-03-02")).unwrap(), 1);
        assert_eq!(delete_by_date(&conn, day("2025-03-02")).unwrap(), 1);

        assert_eq!(count_by_date_range(&conn, day("2025-03-01"), day("2025-03-31")).unwrap(), 1);
        assert_eq!(delete_by_date_range(&conn, day("2025-03-10"), day("2025-03-31")).unwrap(), 0);

        assert_eq!(count_all(&conn).unwrap(), 1);
        assert_eq!(delete_all(&conn).unwrap(), 1);
        assert_eq!(count_all(&conn).unwrap(), 0);
    }
}
