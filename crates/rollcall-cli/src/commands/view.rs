use super::{emit, Context};
use crate::cli::ViewAction;
use anyhow::{bail, Result};
use chrono::{Days, Local, NaiveDate};
use rollcall_store::{attendance, parse_date, Report, DATE_FORMAT};

/// Days covered by `view range` when no `--from` is given.
const DEFAULT_RANGE_DAYS: u64 = 7;

pub fn today(ctx: &Context, limit: usize) -> Result<()> {
    let conn = ctx.open_db()?;
    let date = Local::now().date_naive();
    let rows = attendance::todays(&conn, date, limit)?;
    if rows.is_empty() {
        println!("No attendance recorded today ({})", date.format(DATE_FORMAT));
    } else {
        print!("{}", Report::attendance(format!("Today ({})", date.format(DATE_FORMAT)), &rows));
    }
    Ok(())
}

pub fn run(ctx: &Context, action: ViewAction) -> Result<()> {
    let conn = ctx.open_db()?;
    match action {
        ViewAction::Summary { out } => {
            let rows = attendance::lecture_summary(&conn)?;
            emit(&Report::lecture_summary(&rows), &out)?;
        }
        ViewAction::Records { lecture, out } => {
            let rows = attendance::by_lecture(&conn, lecture)?;
            let title = match lecture {
                Some(id) => format!("Attendance records (lecture {id})"),
                None => "Attendance records".to_string(),
            };
            emit(&Report::attendance(title, &rows), &out)?;
        }
        ViewAction::Students { name, out } => {
            let rows = attendance::student_summary(&conn, name.as_deref())?;
            emit(&Report::students(&rows), &out)?;
        }
        ViewAction::Range { from, to, out } => {
            let today = Local::now().date_naive();
            let (from, to) = resolve_range(from.as_deref(), to.as_deref(), today)?;
            let rows = attendance::by_date_range(&conn, from, to)?;
            let title = format!(
                "Attendance {} to {}",
                from.format(DATE_FORMAT),
                to.format(DATE_FORMAT)
            );
            emit(&Report::attendance(title, &rows), &out)?;
        }
    }
    Ok(())
}

/// Fill in missing bounds: `to` defaults to today, `from` to a week before `to`.
fn resolve_range(
    from: Option<&str>,
    to: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let to = match to {
        Some(t) => parse_date(t)?,
        None => today,
    };
    let from = match from {
        Some(f) => parse_date(f)?,
        None => to.checked_sub_days(Days::new(DEFAULT_RANGE_DAYS)).unwrap_or(to),
    };
    if from > to {
        bail!("start date {from} is after end date {to}");
    }
    Ok((from, to))
}
