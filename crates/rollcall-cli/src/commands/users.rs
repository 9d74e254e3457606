use super::Context;
use crate::cli::UsersAction;
use anyhow::Result;
use rollcall_store::{attendance, roster, Report};

pub fn run(ctx: &Context, action: UsersAction) -> Result<()> {
    let dir = &ctx.config.faces_dir;
    match action {
        UsersAction::List => {
            let enrolled = roster::list(dir)?;
            if enrolled.is_empty() {
                println!("No users registered in {}", dir.display());
                return Ok(());
            }
            let mut report = Report::new(
                format!("Registered users ({})", enrolled.len()),
                &["ID", "Name", "Photo"],
            );
            for e in &enrolled {
                report.push(vec![e.id.clone(), e.name.clone(), e.path.display().to_string()]);
            }
            print!("{report}");
        }
        UsersAction::Remove { id, keep_records } => {
            let id = roster::sanitize_id(&id);
            let victims = roster::find_by_id(dir, &id)?;
            if victims.is_empty() {
                println!("No user with id '{id}'");
                return Ok(());
            }
            let labels: Vec<String> = victims.iter().map(|e| e.label()).collect();
            let conn = ctx.open_db()?;
            let records: i64 = if keep_records {
                0
            } else {
                labels
                    .iter()
                    .map(|l| attendance::count_by_name(&conn, l))
                    .sum::<Result<i64, _>>()?
            };

            let question = format!(
                "Remove {} and {records} attendance record(s)?",
                labels.join(", ")
            );
            if !ctx.confirm(&question) {
                println!("Cancelled");
                return Ok(());
            }

            roster::remove_user(dir, &id)?;
            let mut deleted = 0;
            if !keep_records {
                for l in &labels {
                    deleted += attendance::delete_by_name(&conn, l)?;
                }
            }
            println!("Removed {} ({deleted} attendance records deleted)", labels.join(", "));
        }
        UsersAction::Clear => {
            let count = roster::list(dir)?.len();
            if count == 0 {
                println!("No users registered");
                return Ok(());
            }
            if !ctx.confirm(&format!("Remove all {count} registered user photo(s)?")) {
                println!("Cancelled");
                return Ok(());
            }
            let removed = roster::clear(dir)?;
            println!("Removed {removed} file(s) from {}", dir.display());
        }
    }
    Ok(())
}
