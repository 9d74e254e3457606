//! Table creation and first-run seeding.

use crate::Result;
use rusqlite::{params, Connection};
use std::path::Path;

const CREATE_ATTENDANCE: &str = "
    CREATE TABLE IF NOT EXISTS attendance (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        date TEXT NOT NULL,
        time TEXT NOT NULL,
        lecture_id INTEGER,
        lecture_name TEXT,
        FOREIGN KEY (lecture_id) REFERENCES lectures(id)
    )";

const CREATE_LECTURES: &str = "
    CREATE TABLE IF NOT EXISTS lectures (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        lecture_name TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        is_active BOOLEAN DEFAULT 1
    )";

/// Lectures inserted when the table is empty at startup.
pub const SEED_LECTURES: [(&str, &str, &str); 3] = [
    ("Morning Lecture", "09:00:00", "10:30:00"),
    ("Afternoon Lecture", "13:00:00", "14:30:00"),
    ("Evening Lecture", "16:00:00", "17:30:00"),
];

/// Open the database file, creating parent directories and tables as needed.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    init(&conn)?;
    tracing::debug!(path = %path.display(), "database opened");
    Ok(conn)
}

/// Create both tables and seed lectures if none exist.
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!("{CREATE_LECTURES}; {CREATE_ATTENDANCE};"))?;

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM lectures", [], |r| r.get(0))?;
    if count == 0 {
        seed_lectures(conn)?;
    }
    Ok(())
}

fn seed_lectures(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO lectures (lecture_name, start_time, end_time) VALUES (?1, ?2, ?3)",
    )?;
    for (name, start, end) in SEED_LECTURES {
        stmt.execute(params![name, start, end])?;
    }
    tracing::info!(count = SEED_LECTURES.len(), "seeded sample lectures");
    Ok(())
}

/// Names of the user tables, for diagnostics.
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}
