use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Integer pixel rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Grow the box by `margin` (fraction of its size) on every side and clamp
    /// it to an image of `img_w`×`img_h`. Returns `None` if nothing is left.
    pub fn region(&self, margin: f32, img_w: u32, img_h: u32) -> Option<Region> {
        let dx = self.width * margin;
        let dy = self.height * margin;
        let x0 = (self.x - dx).floor().max(0.0);
        let y0 = (self.y - dy).floor().max(0.0);
        let x1 = (self.x + self.width + dx).ceil().min(img_w as f32);
        let y1 = (self.y + self.height + dy).ceil().min(img_h as f32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Region {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Cosine similarity in [-1, 1]. Higher = more similar; zero vectors give 0.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let (dot, norm_a, norm_b) = self
            .values
            .iter()
            .zip(&other.values)
            .fold((0.0f32, 0.0f32, 0.0f32), |(d, na, nb), (a, b)| {
                (d + a * b, na + a * a, nb + b * b)
            });
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }

    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// An enrolled person: the label recorded on attendance plus the embedding
/// computed from their photo.
#[derive(Debug, Clone)]
pub struct KnownFace {
    /// `id_name`, from the photo file stem.
    pub label: String,
    pub embedding: Embedding,
    pub source: PathBuf,
}

/// Result of matching a probe embedding against the enrolled faces.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Cosine similarity of the best candidate, 0 for an empty gallery.
    pub similarity: f32,
    /// Label of the matched face, `None` when unmatched.
    pub label: Option<String>,
}

impl MatchResult {
    pub fn unknown(similarity: f32) -> Self {
        Self {
            matched: false,
            similarity,
            label: None,
        }
    }

    /// The label to show for this face.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or("Unknown")
    }
}

/// Strategy for comparing a probe embedding against enrolled faces.
pub trait Matcher {
    fn compare(&self, probe: &Embedding, gallery: &[KnownFace], threshold: f32) -> MatchResult;
}

/// Picks the most similar enrolled face and accepts it at or above the threshold.
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn compare(&self, probe: &Embedding, gallery: &[KnownFace], threshold: f32) -> MatchResult {
        let best = gallery
            .iter()
            .map(|face| (face, probe.similarity(&face.embedding)))
            .fold(None::<(&KnownFace, f32)>, |best, (face, sim)| match best {
                Some((_, best_sim)) if best_sim >= sim => best,
                _ => Some((face, sim)),
            });

        match best {
            Some((face, sim)) if sim >= threshold => MatchResult {
                matched: true,
                similarity: sim,
                label: Some(face.label.clone()),
            },
            Some((_, sim)) => MatchResult::unknown(sim),
            None => MatchResult::unknown(0.0),
        }
    }
}
