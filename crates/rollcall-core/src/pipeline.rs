//! Detector + recognizer wired together: frame in, embeddings out.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, Embedding};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// A face found in a frame together with its embedding.
#[derive(Debug, Clone)]
pub struct EncodedFace {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// Anything that turns an image into face embeddings.
pub trait FaceEncoder {
    /// Every face in the image, most confident first.
    fn encode_all(&mut self, image: &RgbImage) -> Result<Vec<EncodedFace>, PipelineError>;

    /// The most confident face, if any.
    fn encode_best(&mut self, image: &RgbImage) -> Result<Option<EncodedFace>, PipelineError> {
        Ok(self.encode_all(image)?.into_iter().next())
    }
}

/// SCRFD detection followed by ArcFace embedding.
pub struct FacePipeline {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl FacePipeline {
    pub fn load(scrfd_path: &Path, arcface_path: &Path) -> Result<Self, PipelineError> {
        let detector = FaceDetector::load(scrfd_path)?;
        let recognizer = FaceRecognizer::load(arcface_path)?;
        Ok(Self {
            detector,
            recognizer,
        })
    }

    /// Face boxes only, without embeddings.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, PipelineError> {
        Ok(self.detector.detect(image)?)
    }
}

impl FaceEncoder for FacePipeline {
    fn encode_all(&mut self, image: &RgbImage) -> Result<Vec<EncodedFace>, PipelineError> {
        let faces = self.detector.detect(image)?;
        let mut out = Vec::with_capacity(faces.len());
        for bbox in faces {
            match self.recognizer.extract(image, &bbox) {
                Ok(embedding) => out.push(EncodedFace { bbox, embedding }),
                Err(RecognizerError::NoLandmarks) => {
                    tracing::debug!(confidence = bbox.confidence, "face without landmarks skipped");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }

    fn encode_best(&mut self, image: &RgbImage) -> Result<Option<EncodedFace>, PipelineError> {
        let faces = self.detector.detect(image)?;
        for bbox in faces {
            if bbox.landmarks.is_none() {
                continue;
            }
            let embedding = self.recognizer.extract(image, &bbox)?;
            return Ok(Some(EncodedFace { bbox, embedding }));
        }
        Ok(None)
    }
}
