use super::Context;
use crate::cli::DeleteAction;
use anyhow::{bail, Result};
use rollcall_store::{attendance, parse_date};

pub fn run(ctx: &Context, action: DeleteAction) -> Result<()> {
    let conn = ctx.open_db()?;

    let (count, what) = match &action {
        DeleteAction::Name { name } => (
            attendance::count_by_name(&conn, name)?,
            format!("for '{name}'"),
        ),
        DeleteAction::Date { date } => {
            let date = parse_date(date)?;
            (attendance::count_by_date(&conn, date)?, format!("on {date}"))
        }
        DeleteAction::Range { from, to } => {
            let (from, to) = (parse_date(from)?, parse_date(to)?);
            if from > to {
                bail!("start date {from} is after end date {to}");
            }
            (
                attendance::count_by_date_range(&conn, from, to)?,
                format!("from {from} to {to}"),
            )
        }
        DeleteAction::All => (attendance::count_all(&conn)?, "in the database".to_string()),
    };

    if count == 0 {
        println!("No records {what}");
        return Ok(());
    }
    if !ctx.confirm(&format!("Delete {count} record(s) {what}? This cannot be undone.")) {
        println!("Cancelled");
        return Ok(());
    }

    let deleted = match action {
        DeleteAction::Name { name } => attendance::delete_by_name(&conn, &name)?,
        DeleteAction::Date { date } => attendance::delete_by_date(&conn, parse_date(&date)?)?,
        DeleteAction::Range { from, to } => {
            attendance::delete_by_date_range(&conn, parse_date(&from)?, parse_date(&to)?)?
        }
        DeleteAction::All => attendance::delete_all(&conn)?,
    };
    println!("Deleted {deleted} record(s) {what}");
    Ok(())
}
