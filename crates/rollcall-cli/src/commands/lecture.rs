use super::Context;
use crate::cli::LectureAction;
use anyhow::Result;
use chrono::Local;
use rollcall_store::{lectures, Report};

pub fn run(ctx: &Context, action: LectureAction) -> Result<()> {
    let conn = ctx.open_db()?;
    match action {
        LectureAction::Add { name, start, end } => {
            let start = lectures::parse_clock(&start)?;
            let end = lectures::parse_clock(&end)?;
            if start > end {
                println!(
                    "Warning: end time is before start time; this lecture will never be current"
                );
            }
            let id = lectures::create(&conn, &name, start, end)?;
            println!("Added lecture {id}: {}", name.trim());
        }
        LectureAction::List => {
            let all = lectures::list(&conn)?;
            if all.is_empty() {
                println!("No lectures scheduled");
            } else {
                print!("{}", Report::lectures(&all, Local::now().time()));
            }
        }
        LectureAction::Current => match lectures::current(&conn, Local::now().time())? {
            Some(l) => println!("ACTIVE: {} ({})", l.name, l.time_slot()),
            None => println!("No active lecture"),
        },
        LectureAction::Remove { id } => {
            let Some(lecture) = lectures::get(&conn, id)? else {
                println!("Lecture {id} not found");
                return Ok(());
            };
            let linked = lectures::attendance_count(&conn, id)?;
            let question = format!(
                "Delete lecture '{}' and {linked} attendance record(s)?",
                lecture.name
            );
            if !ctx.confirm(&question) {
                println!("Cancelled");
                return Ok(());
            }
            let removed = lectures::delete(&conn, id)?;
            println!("Deleted lecture '{}' ({removed} attendance records)", lecture.name);
        }
        LectureAction::Clear => {
            let count = lectures::count(&conn)?;
            if count == 0 {
                println!("No lectures to delete");
                return Ok(());
            }
            let linked = lectures::linked_attendance_count(&conn)?;
            let question =
                format!("Delete all {count} lecture(s) and {linked} attendance record(s)?");
            if !ctx.confirm(&question) {
                println!("Cancelled");
                return Ok(());
            }
            let (lectures_removed, attendance_removed) = lectures::delete_all(&conn)?;
            println!(
                "Deleted {lectures_removed} lectures and {attendance_removed} attendance records"
            );
        }
    }
    Ok(())
}
