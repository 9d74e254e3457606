use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use rollcall_core::{Config, FacePipeline, Gallery};
use rollcall_hw::Camera;
use rollcall_store::{lectures, schema, StoreError};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod engine;
mod session;

use engine::{EngineSettings, Sighting};
use session::{Outcome, StatusTracker};

#[derive(Parser)]
#[command(
    name = "rollcalld",
    about = "Live attendance session: recognize faces and mark attendance"
)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Attendance database
    #[arg(long)]
    db: Option<PathBuf>,
    /// Directory of enrollment photos
    #[arg(long)]
    faces_dir: Option<PathBuf>,
    /// V4L2 device, e.g. /dev/video0
    #[arg(long)]
    camera: Option<String>,
}

fn store_err(e: StoreError) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if let Some(dir) = args.faces_dir {
        config.faces_dir = dir;
    }
    if let Some(dev) = args.camera {
        config.camera_device = dev;
    }

    tracing::info!(
        db = %config.db_path.display(),
        faces = %config.faces_dir.display(),
        camera = %config.camera_device,
        threshold = config.similarity_threshold,
        "rollcalld starting"
    );

    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db = tokio_rusqlite::Connection::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;
    db.call(|conn| schema::init(conn).map_err(store_err))
        .await
        .context("failed to initialize database")?;

    let mut pipeline = FacePipeline::load(&config.scrfd_model_path(), &config.arcface_model_path())
        .context("failed to load face models")?;

    let (gallery, report) = Gallery::load(&config.faces_dir, &mut pipeline)
        .with_context(|| format!("failed to read {}", config.faces_dir.display()))?;
    if gallery.is_empty() {
        tracing::warn!(
            skipped = report.skipped.len(),
            "no known faces loaded; register users with `rollcall register`"
        );
    }

    let camera = Camera::open(&config.camera_device)
        .with_context(|| format!("failed to open camera {}", config.camera_device))?;

    let settings = EngineSettings {
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        warmup_frames: config.warmup_frames,
        threshold: config.similarity_threshold,
    };
    let mut engine = engine::spawn_engine(camera, pipeline, gallery, settings)?;

    let mut status = StatusTracker::default();
    let mut status_tick =
        tokio::time::interval(Duration::from_secs(config.status_interval_secs.max(1)));

    tracing::info!("rollcalld ready");

    loop {
        tokio::select! {
            sighting = engine.next_sighting() => {
                let Some(sighting) = sighting else {
                    tracing::warn!("engine stopped");
                    break;
                };
                if let Err(e) = handle_sighting(&db, sighting).await {
                    tracing::error!(error = %e, "failed to record attendance");
                }
            }
            _ = status_tick.tick() => {
                let now = Local::now().time();
                match db.call(move |conn| lectures::current(conn, now).map_err(store_err)).await {
                    Ok(lecture) => {
                        if let Some(line) = status.update(lecture.as_ref()) {
                            tracing::info!("{line}");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "failed to read lecture status"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("rollcalld shutting down");
                break;
            }
        }
    }

    let engine_result = tokio::task::spawn_blocking(move || engine.shutdown())
        .await
        .context("engine shutdown task failed")?;
    if let Err(e) = db.close().await {
        tracing::warn!(error = %e, "database close failed");
    }
    engine_result.context("engine failed")?;
    Ok(())
}

async fn handle_sighting(db: &tokio_rusqlite::Connection, sighting: Sighting) -> Result<()> {
    let label = sighting.label.clone();
    let similarity = sighting.similarity;
    let outcome = db
        .call(move |conn| session::record(conn, &sighting).map_err(store_err))
        .await?;

    match outcome {
        Outcome::NoLecture => {
            tracing::debug!(name = %label, "no active lecture; not recorded");
        }
        Outcome::AlreadyMarked { lecture } => {
            tracing::debug!(name = %label, lecture = %lecture.name, "already marked");
        }
        Outcome::Recorded { id, lecture, recent } => {
            tracing::info!(
                id,
                name = %label,
                lecture = %lecture.name,
                similarity,
                "attendance recorded"
            );
            for row in recent {
                tracing::info!(
                    name = %row.name,
                    time = %row.time,
                    lecture = row.lecture_name.as_deref().unwrap_or("-"),
                    "today"
                );
            }
        }
    }
    Ok(())
}
