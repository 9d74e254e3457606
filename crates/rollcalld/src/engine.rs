use chrono::{Local, NaiveDateTime};
use rollcall_core::{EncodedFace, FaceEncoder, Gallery, PipelineError};
use rollcall_hw::{Camera, CameraError, FrameError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("face pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread panicked")]
    Panicked,
}

/// An enrolled person recognized in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting {
    pub label: String,
    pub similarity: f32,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub poll_interval: Duration,
    pub warmup_frames: usize,
    pub threshold: f32,
}

/// Receiving end of the engine thread.
pub struct EngineHandle {
    sightings: mpsc::Receiver<Sighting>,
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Result<(), EngineError>>,
}

impl EngineHandle {
    /// Next recognized face. `None` once the engine thread has exited.
    pub async fn next_sighting(&mut self) -> Option<Sighting> {
        self.sightings.recv().await
    }

    /// Stop the capture loop and wait for the thread, returning its error
    /// if it failed.
    pub fn shutdown(self) -> Result<(), EngineError> {
        self.stop.store(true, Ordering::Relaxed);
        drop(self.sightings);
        self.thread.join().map_err(|_| EngineError::Panicked)?
    }
}

/// Spawn the capture loop on a dedicated OS thread.
///
/// The camera must already be open and the encoder loaded, so startup
/// failures surface before anything runs.
pub fn spawn_engine<E>(
    camera: Camera,
    mut encoder: E,
    gallery: Gallery,
    settings: EngineSettings,
) -> Result<EngineHandle, EngineError>
where
    E: FaceEncoder + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Sighting>(16);
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);

    let thread = std::thread::Builder::new()
        .name("rollcall-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            let result =
                capture_loop(&camera, &mut encoder, &gallery, &settings, &tx, &thread_stop);
            if let Err(e) = &result {
                tracing::error!(error = %e, "engine stopped");
            }
            tracing::info!("engine thread exiting");
            result
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle {
        sightings: rx,
        stop,
        thread,
    })
}

fn capture_loop<E: FaceEncoder>(
    camera: &Camera,
    encoder: &mut E,
    gallery: &Gallery,
    settings: &EngineSettings,
    tx: &mpsc::Sender<Sighting>,
    stop: &AtomicBool,
) -> Result<(), EngineError> {
    let mut stream = camera.stream()?;
    if settings.warmup_frames > 0 {
        tracing::info!(count = settings.warmup_frames, "discarding warmup frames");
        stream.warm_up(settings.warmup_frames)?;
    }

    while !stop.load(Ordering::Relaxed) {
        let frame = stream.next_frame()?;
        if frame.is_dark {
            tracing::trace!(seq = frame.sequence, "dark frame");
        } else {
            let faces = encoder.encode_all(&frame.into_image()?)?;
            let now = Local::now().naive_local();
            for sighting in sightings(&faces, gallery, settings.threshold, now) {
                if tx.blocking_send(sighting).is_err() {
                    // receiver dropped: session is shutting down
                    return Ok(());
                }
            }
        }
        std::thread::sleep(settings.poll_interval);
    }
    Ok(())
}

/// Match every face against the gallery; unknown faces are dropped.
pub fn sightings(
    faces: &[EncodedFace],
    gallery: &Gallery,
    threshold: f32,
    at: NaiveDateTime,
) -> Vec<Sighting> {
    faces
        .iter()
        .filter_map(|face| {
            let result = gallery.identify(&face.embedding, threshold);
            match result.label {
                Some(label) if result.matched => Some(Sighting {
                    label,
                    similarity: result.similarity,
                    at,
                }),
                _ => {
                    tracing::debug!(
                        similarity = result.similarity,
                        confidence = face.bbox.confidence,
                        "unknown face"
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rollcall_core::{BoundingBox, Embedding, KnownFace};
    use std::path::PathBuf;

    fn face(values: Vec<f32>) -> EncodedFace {
        EncodedFace {
            bbox: BoundingBox {
                x: 10.0,
                y: 10.0,
                width: 50.0,
                height: 60.0,
                confidence: 0.9,
                landmarks: None,
            },
            embedding: Embedding::new(values),
        }
    }

    fn gallery() -> Gallery {
        let known = |label: &str, values: Vec<f32>| KnownFace {
            label: label.to_string(),
            embedding: Embedding::new(values),
            source: PathBuf::from(format!("{label}.jpg")),
        };
        Gallery::new(vec![
            known("1_Alice", vec![1.0, 0.0, 0.0]),
            known("2_Bob", vec![0.0, 1.0, 0.0]),
        ])
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_sightings_keep_only_matches() {
        let faces = vec![
            face(vec![0.1, 0.95, 0.0]),
            face(vec![0.0, 0.0, 1.0]),
            face(vec![0.9, 0.1, 0.1]),
        ];
        let found = sightings(&faces, &gallery(), 0.6, noon());
        let labels: Vec<&str> = found.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["2_Bob", "1_Alice"]);
        assert!(found.iter().all(|s| s.at == noon() && s.similarity >= 0.6));
    }

    #[test]
    fn test_sightings_empty_gallery() {
        let found = sightings(&[face(vec![1.0, 0.0, 0.0])], &Gallery::default(), 0.4, noon());
        assert!(found.is_empty());
    }
}
