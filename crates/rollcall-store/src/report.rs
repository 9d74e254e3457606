//! Tabular views over query results, printable and exportable to CSV.

use crate::attendance::{AttendanceRecord, LectureSummary, StudentSummary};
use crate::lectures::Lecture;
use crate::{Result, TIME_FORMAT};
use chrono::NaiveTime;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// A titled grid of string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Report {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn attendance(title: impl Into<String>, records: &[AttendanceRecord]) -> Self {
        let mut report = Self::new(title, &["Name", "Date", "Time", "Lecture"]);
        for r in records {
            report.push(vec![
                r.name.clone(),
                r.date.clone(),
                r.time.clone(),
                r.lecture_name.clone().unwrap_or_default(),
            ]);
        }
        report
    }

    pub fn lecture_summary(rows: &[LectureSummary]) -> Self {
        let mut report = Self::new(
            "Lecture summary",
            &["Lecture", "Time Slot", "Students", "Records", "Last Activity"],
        );
        for r in rows {
            report.push(vec![
                r.lecture_name.clone(),
                format!("{} - {}", r.start_time, r.end_time),
                r.students.to_string(),
                r.records.to_string(),
                r.last_activity.clone().unwrap_or_else(|| "No records".to_string()),
            ]);
        }
        report
    }

    pub fn students(rows: &[StudentSummary]) -> Self {
        let mut report = Self::new(
            "Student summary",
            &["Name", "Days Present", "Lectures Attended", "Attended Lectures"],
        );
        for r in rows {
            report.push(vec![
                r.name.clone(),
                r.days_present.to_string(),
                r.lectures_attended.to_string(),
                r.attended_lectures.clone().unwrap_or_default(),
            ]);
        }
        report
    }

    /// Lecture list with a running/not-running status as of `now`.
    pub fn lectures(lectures: &[Lecture], now: NaiveTime) -> Self {
        let mut report = Self::new("Lectures", &["ID", "Name", "Start", "End", "Status"]);
        for l in lectures {
            let status = if l.is_active && l.is_running(now) {
                "Active"
            } else {
                "Inactive"
            };
            report.push(vec![
                l.id.to_string(),
                l.name.clone(),
                l.start_time.format(TIME_FORMAT).to_string(),
                l.end_time.format(TIME_FORMAT).to_string(),
                status.to_string(),
            ]);
        }
        report
    }

    /// Write headers then rows.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        tracing::info!(path = %path.display(), rows = self.rows.len(), "report exported");
        Ok(())
    }

    /// Rows as JSON objects keyed by header.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    let obj: Map<String, Value> = self
                        .headers
                        .iter()
                        .cloned()
                        .zip(row.iter().cloned().map(Value::String))
                        .collect();
                    Value::Object(obj)
                })
                .collect(),
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(c, &w)| format!("{c:<w$}"))
                .collect();
            writeln!(f, "{}", padded.join("  ").trim_end())
        };

        writeln!(f, "{}", self.title)?;
        line(f, &self.headers)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        line(f, &rule)?;
        for row in &self.rows {
            line(f, row)?;
        }
        Ok(())
    }
}
