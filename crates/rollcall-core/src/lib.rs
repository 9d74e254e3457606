//! rollcall-core — Face detection and recognition for attendance.
//!
//! SCRFD finds faces, ArcFace embeds them, and the [`gallery::Gallery`]
//! matches embeddings against the enrolled photos. Both models run on the
//! CPU through ONNX Runtime.

pub mod alignment;
pub mod config;
pub mod detector;
pub mod gallery;
pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use config::{default_model_dir, Config};
pub use detector::FaceDetector;
pub use gallery::Gallery;
pub use pipeline::{EncodedFace, FaceEncoder, FacePipeline, PipelineError};
pub use recognizer::FaceRecognizer;
pub use types::{BoundingBox, CosineMatcher, Embedding, KnownFace, MatchResult, Matcher, Region};
