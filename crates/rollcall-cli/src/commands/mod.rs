pub mod db;
pub mod delete;
pub mod lecture;
pub mod register;
pub mod users;
pub mod view;

use crate::cli::OutputArgs;
use anyhow::{Context as _, Result};
use rollcall_core::Config;
use rollcall_hw::Camera;
use rollcall_store::Report;
use rusqlite::Connection;

/// Resolved configuration plus global flags, shared by every command.
pub struct Context {
    pub config: Config,
    pub assume_yes: bool,
}

impl Context {
    pub fn open_db(&self) -> Result<Connection> {
        rollcall_store::open(&self.config.db_path)
            .with_context(|| format!("failed to open database {}", self.config.db_path.display()))
    }

    pub fn confirm(&self, question: &str) -> bool {
        crate::prompt::confirm(question, self.assume_yes)
    }
}

/// Print a report as a table or JSON, and export it to CSV if asked.
///
/// An empty report still exports its header row.
pub fn emit(report: &Report, out: &OutputArgs) -> Result<()> {
    if out.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else if report.is_empty() {
        println!("{}: no records found", report.title);
    } else {
        print!("{report}");
    }

    if let Some(path) = &out.export {
        report
            .write_csv(path)
            .with_context(|| format!("failed to export to {}", path.display()))?;
        println!("Exported {} rows to {}", report.rows.len(), path.display());
    }
    Ok(())
}

pub fn devices() {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No video capture devices found");
        return;
    }
    for d in devices {
        println!("{}  {} ({}, {})", d.path, d.name, d.driver, d.bus);
    }
}
