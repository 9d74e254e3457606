use super::Context;
use crate::cli::DbAction;
use anyhow::{Context as _, Result};
use chrono::Local;
use rollcall_store::{attendance, maintenance, roster, schema};
use std::path::{Path, PathBuf};

pub fn run(ctx: &Context, action: DbAction) -> Result<()> {
    let db_path = &ctx.config.db_path;
    let conn = ctx.open_db()?;
    match action {
        DbAction::Stats => {
            let s = attendance::statistics(&conn)?;
            let size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
            println!("Database:        {}", db_path.display());
            println!("Size:            {:.1} KB", size as f64 / 1024.0);
            println!("Tables:          {}", s.tables.join(", "));
            println!("Lectures:        {}", s.lectures);
            println!("Total records:   {}", s.total_records);
            println!("Unique students: {}", s.unique_students);
            match (s.first_date, s.last_date) {
                (Some(first), Some(last)) => println!("Date range:      {first} to {last}"),
                _ => println!("Date range:      no records"),
            }
        }
        DbAction::Vacuum => {
            maintenance::vacuum(&conn)?;
            println!("Database optimized");
        }
        DbAction::Backup { dest } => {
            let dest = dest.unwrap_or_else(|| default_backup_path(db_path));
            let written = maintenance::backup(&conn, &dest)
                .with_context(|| format!("failed to back up to {}", dest.display()))?;
            println!("Backup written to {}", written.display());
        }
        DbAction::Reset => {
            let question = "Delete ALL attendance records, lectures and registered user photos?";
            if !ctx.confirm(question) {
                println!("Cancelled");
                return Ok(());
            }
            let (records, lectures) = maintenance::reset(&conn)?;
            let photos = roster::clear(&ctx.config.faces_dir)?;
            // reseeds the sample lectures
            schema::init(&conn)?;
            println!(
                "Reset complete: {records} records, {lectures} lectures and {photos} photos removed"
            );
        }
    }
    Ok(())
}

/// Timestamped backup file next to the database.
fn default_backup_path(db_path: &Path) -> PathBuf {
    let name = maintenance::backup_file_name(Local::now().naive_local());
    match db_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => PathBuf::from(name),
    }
}
