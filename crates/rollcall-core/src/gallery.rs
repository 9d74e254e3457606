//! Known faces, rebuilt from the enrollment photos at every start.

use crate::pipeline::FaceEncoder;
use crate::types::{CosineMatcher, Embedding, KnownFace, MatchResult, Matcher};
use rollcall_store::roster::{self, RosterError};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("enrollment directory: {0}")]
    Roster(#[from] RosterError),
}

/// Why an enrollment photo did not make it into the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Unreadable(String),
    NoFace,
    Encoding(String),
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<(PathBuf, SkipReason)>,
}

/// The enrolled faces to match against.
#[derive(Debug, Default)]
pub struct Gallery {
    faces: Vec<KnownFace>,
}

impl Gallery {
    pub fn new(faces: Vec<KnownFace>) -> Self {
        Self { faces }
    }

    /// Encode every photo in `dir`. Photos that cannot be decoded or contain
    /// no face are skipped and logged.
    pub fn load<E: FaceEncoder>(
        dir: &Path,
        encoder: &mut E,
    ) -> Result<(Self, LoadReport), GalleryError> {
        let mut faces = Vec::new();
        let mut report = LoadReport::default();

        for enrollee in roster::list(dir)? {
            let path = enrollee.path.clone();
            let outcome = match image::open(&path) {
                Err(e) => Err(SkipReason::Unreadable(e.to_string())),
                Ok(img) => match encoder.encode_best(&img.to_rgb8()) {
                    Ok(Some(face)) => Ok(face.embedding),
                    Ok(None) => Err(SkipReason::NoFace),
                    Err(e) => Err(SkipReason::Encoding(e.to_string())),
                },
            };

            match outcome {
                Ok(embedding) => {
                    tracing::info!(label = %enrollee.label(), "loaded known face");
                    faces.push(KnownFace {
                        label: enrollee.label(),
                        embedding,
                        source: path,
                    });
                    report.loaded += 1;
                }
                Err(reason) => {
                    tracing::warn!(
                        path = %path.display(),
                        ?reason,
                        "could not encode enrollment photo; use a clearer image"
                    );
                    report.skipped.push((path, reason));
                }
            }
        }

        tracing::info!(loaded = report.loaded, skipped = report.skipped.len(), "gallery ready");
        Ok((Self { faces }, report))
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn faces(&self) -> &[KnownFace] {
        &self.faces
    }

    /// Best enrolled match for `probe`.
    pub fn identify(&self, probe: &Embedding, threshold: f32) -> MatchResult {
        CosineMatcher.compare(probe, &self.faces, threshold)
    }
}
