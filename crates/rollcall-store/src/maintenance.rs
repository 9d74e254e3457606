//! Database housekeeping: compaction, backup, full reset.

use crate::Result;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Rebuild the database file, reclaiming free pages.
pub fn vacuum(conn: &Connection) -> Result<()> {
    conn.execute_batch("VACUUM")?;
    tracing::info!("database vacuumed");
    Ok(())
}

/// `attendance_backup_YYYYmmdd_HHMMSS.db`
pub fn backup_file_name(at: NaiveDateTime) -> String {
    format!("attendance_backup_{}.db", at.format("%Y%m%d_%H%M%S"))
}

/// Write a consistent copy of the open database to `dest`.
///
/// `dest` must not exist yet; SQLite refuses to overwrite it.
pub fn backup(conn: &Connection, dest: &Path) -> Result<PathBuf> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    conn.execute("VACUUM INTO ?1", [dest.to_string_lossy().into_owned()])?;
    tracing::info!(dest = %dest.display(), "database backed up");
    Ok(dest.to_path_buf())
}

/// Delete every attendance row and every lecture.
///
/// Lectures are seeded again the next time the schema is initialized.
/// Returns `(attendance_removed, lectures_removed)`.
pub fn reset(conn: &Connection) -> Result<(usize, usize)> {
    let tx = conn.unchecked_transaction()?;
    let attendance = tx.execute("DELETE FROM attendance", [])?;
    let lectures = tx.execute("DELETE FROM lectures", [])?;
    tx.commit()?;
    tracing::warn!(attendance, lectures, "database reset");
    Ok((attendance, lectures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{attendance, schema};

    #[test]
    fn test_backup_file_name() {
        let at = NaiveDateTime::parse_from_str("2025-04-02 07:08:09", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(backup_file_name(at), "attendance_backup_20250402_070809.db");
    }

    #[test]
    fn test_backup_copies_rows() {
        let dir = tempfile::tempdir().unwrap();
        let conn = schema::open(&dir.path().join("attendance.db")).unwrap();
        let at = NaiveDateTime::parse_from_str("2025-04-02 09:10:00", "%Y-%m-%d %H:%M:%S").unwrap();
        attendance::mark_attendance(&conn, "1_Ann", None, at).unwrap();

        let dest = dir.path().join("backups/copy.db");
        backup(&conn, &dest).unwrap();

        let copy = Connection::open(&dest).unwrap();
        assert_eq!(attendance::count_all(&copy).unwrap(), 1);
    }

    #[test]
    fn test_reset_then_init_reseeds() {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn).unwrap();
        assert_eq!(reset(&conn).unwrap(), (0, 3));
        schema::init(&conn).unwrap();
        assert_eq!(crate::lectures::list(&conn).unwrap().len(), 3);
    }

    #[test]
    fn test_vacuum_on_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let conn = schema::open(&dir.path().join("attendance.db")).unwrap();
        vacuum(&conn).unwrap();
    }
}
