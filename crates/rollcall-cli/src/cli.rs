use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Face-recognition attendance: registration, lectures and records"
)]
pub struct Cli {
    /// Attendance database (overrides config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Directory of enrollment photos (overrides config)
    #[arg(long, global = true)]
    pub faces_dir: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a face from the camera and enroll it
    Register {
        /// Student or staff id
        #[arg(long)]
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Replace an existing photo for this person
        #[arg(long)]
        force: bool,
        /// Frames to capture (default from config)
        #[arg(long)]
        frames: Option<usize>,
        /// V4L2 device (default from config)
        #[arg(long)]
        camera: Option<String>,
    },
    /// Enrolled users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Lecture schedule
    Lecture {
        #[command(subcommand)]
        action: LectureAction,
    },
    /// Latest attendance rows for today
    Today {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Attendance reports
    View {
        #[command(subcommand)]
        action: ViewAction,
    },
    /// Delete attendance records
    Delete {
        #[command(subcommand)]
        action: DeleteAction,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    /// List camera devices
    Devices,
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List enrolled users
    List,
    /// Remove a user's photos and attendance records
    Remove {
        id: String,
        /// Keep the user's attendance records
        #[arg(long)]
        keep_records: bool,
    },
    /// Remove every enrollment photo
    Clear,
}

#[derive(Subcommand)]
pub enum LectureAction {
    /// Add a lecture (times as HH:MM or HH:MM:SS)
    Add { name: String, start: String, end: String },
    /// List lectures with their current status
    List,
    /// Show the lecture running now
    Current,
    /// Delete a lecture and its attendance records
    Remove { id: i64 },
    /// Delete every lecture and their attendance records
    Clear,
}

/// Where a report goes besides the terminal table.
#[derive(Args, Debug, Default)]
pub struct OutputArgs {
    /// Also write the report to this CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum ViewAction {
    /// Per-lecture totals
    Summary {
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Raw records, optionally for one lecture
    Records {
        #[arg(long)]
        lecture: Option<i64>,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Per-student totals
    Students {
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Records between two dates, inclusive (default: last 7 days)
    Range {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[command(flatten)]
        out: OutputArgs,
    },
}

#[derive(Subcommand)]
pub enum DeleteAction {
    /// Every record for one student label
    Name { name: String },
    /// Every record on one date (YYYY-MM-DD)
    Date { date: String },
    /// Every record between two dates, inclusive
    Range { from: String, to: String },
    /// Every record
    All,
}

#[derive(Subcommand)]
pub enum DbAction {
    /// Record counts and date span
    Stats,
    /// Compact the database file
    Vacuum,
    /// Copy the database to DEST (default: timestamped file next to it)
    Backup { dest: Option<PathBuf> },
    /// Delete all records, lectures and enrollment photos
    Reset,
}
