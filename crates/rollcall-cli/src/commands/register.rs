//! Enrollment from the camera: best face of a short burst, cropped with a
//! margin and saved as `{id}_{name}.jpg`.

use super::Context;
use anyhow::{bail, Context as _, Result};
use image::{imageops, RgbImage};
use rollcall_core::{BoundingBox, FaceDetector};
use rollcall_hw::Camera;
use rollcall_store::roster::{self, RosterError};

pub struct RegisterArgs {
    pub id: String,
    pub name: String,
    pub force: bool,
    pub frames: Option<usize>,
    pub camera: Option<String>,
}

pub fn run(ctx: &Context, args: RegisterArgs) -> Result<()> {
    let config = &ctx.config;
    let (id, name) = roster::clean_identity(&args.id, &args.name)?;
    let label = roster::label(&id, &name);

    let path = match roster::reserve(&config.faces_dir, &id, &name, args.force) {
        Ok(path) => path,
        Err(RosterError::AlreadyEnrolled(_))
            if ctx.confirm(&format!("User '{label}' already exists. Overwrite?")) =>
        {
            roster::reserve(&config.faces_dir, &id, &name, true)?
        }
        Err(RosterError::AlreadyEnrolled(_)) => {
            println!("Registration cancelled");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut detector = FaceDetector::load(&config.scrfd_model_path())
        .context("failed to load face detection model")?;

    let device = args.camera.as_deref().unwrap_or(&config.camera_device);
    let camera = Camera::open(device).with_context(|| format!("failed to open camera {device}"))?;

    let count = args.frames.unwrap_or(config.frames_per_register).max(1);
    println!("Look at the camera...");

    let mut best: Option<(RgbImage, BoundingBox)> = None;
    let mut stream = camera.stream()?;
    stream.warm_up(config.warmup_frames)?;
    let mut captured = 0;
    let mut attempts = 0;
    while captured < count && attempts < count * 3 {
        attempts += 1;
        let frame = stream.next_frame()?;
        if frame.is_dark {
            tracing::debug!(seq = frame.sequence, "skipping dark frame");
            continue;
        }
        captured += 1;
        let image = frame.into_image()?;
        let Some(face) = most_confident(detector.detect(&image)?) else {
            continue;
        };
        tracing::debug!(confidence = face.confidence, "face detected");
        if best.as_ref().map_or(true, |(_, b)| face.confidence > b.confidence) {
            best = Some((image, face));
        }
    }

    let Some((image, face)) = best else {
        bail!("no face detected in {captured} frames; check lighting and face the camera");
    };

    let crop = crop_face(&image, &face, config.face_margin)
        .context("detected face lies outside the frame")?;
    crop.save(&path)
        .with_context(|| format!("failed to save {}", path.display()))?;

    tracing::info!(
        label = %label,
        confidence = face.confidence,
        path = %path.display(),
        "user registered"
    );
    println!("Registered {label} ({})", path.display());
    Ok(())
}

fn most_confident(faces: Vec<BoundingBox>) -> Option<BoundingBox> {
    faces
        .into_iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

/// The face region grown by `margin` on every side, clamped to the image.
pub fn crop_face(image: &RgbImage, face: &BoundingBox, margin: f32) -> Option<RgbImage> {
    let r = face.region(margin, image.width(), image.height())?;
    Some(imageops::crop_imm(image, r.x, r.y, r.width, r.height).to_image())
}
