//! Face alignment via a 4-DOF similarity transform.
//!
//! Maps the five detected landmarks onto the InsightFace reference layout and
//! warps the colour frame into the 112×112 crop ArcFace expects.

use image::{Rgb, RgbImage};

/// ArcFace reference landmarks for a 112×112 output.
pub const REFERENCE_LANDMARKS_112: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

pub const ALIGNED_SIZE: u32 = 112;

/// Similarity transform `dst = [a -b; b a] * src + [tx; ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    pub const IDENTITY: Similarity = Similarity {
        a: 1.0,
        b: 0.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Least-squares fit from `src` to `dst` point pairs.
    ///
    /// Closed form on centred coordinates; degenerate input (all source
    /// points coincident) yields the identity.
    pub fn estimate(src: &[(f32, f32)], dst: &[(f32, f32)]) -> Self {
        let n = src.len().min(dst.len());
        if n == 0 {
            return Self::IDENTITY;
        }
        let centroid = |pts: &[(f32, f32)]| {
            let (sx, sy) = pts[..n]
                .iter()
                .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
            (sx / n as f32, sy / n as f32)
        };
        let (scx, scy) = centroid(src);
        let (dcx, dcy) = centroid(dst);

        let mut dot = 0.0f32;
        let mut cross = 0.0f32;
        let mut norm = 0.0f32;
        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst).take(n) {
            let (sx, sy) = (sx - scx, sy - scy);
            let (dx, dy) = (dx - dcx, dy - dcy);
            dot += sx * dx + sy * dy;
            cross += sx * dy - sy * dx;
            norm += sx * sx + sy * sy;
        }
        if norm < 1e-12 {
            return Self::IDENTITY;
        }

        let a = dot / norm;
        let b = cross / norm;
        Self {
            a,
            b,
            tx: dcx - (a * scx - b * scy),
            ty: dcy - (b * scx + a * scy),
        }
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// Map a destination point back to the source. `None` if not invertible.
    pub fn invert(&self, (x, y): (f32, f32)) -> Option<(f32, f32)> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let (dx, dy) = (x - self.tx, y - self.ty);
        Some((
            (self.a * dx + self.b * dy) / det,
            (-self.b * dx + self.a * dy) / det,
        ))
    }
}

/// Bilinear sample of an RGB image; pixels outside read as black.
fn sample(image: &RgbImage, x: f32, y: f32) -> [f32; 3] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (w, h) = (image.width() as i64, image.height() as i64);

    let px = |xi: i64, yi: i64| -> [f32; 3] {
        if xi < 0 || yi < 0 || xi >= w || yi >= h {
            return [0.0; 3];
        }
        let Rgb(p) = *image.get_pixel(xi as u32, yi as u32);
        [p[0] as f32, p[1] as f32, p[2] as f32]
    };

    let (xi, yi) = (x0 as i64, y0 as i64);
    let (tl, tr, bl, br) = (px(xi, yi), px(xi + 1, yi), px(xi, yi + 1), px(xi + 1, yi + 1));
    std::array::from_fn(|c| {
        tl[c] * (1.0 - fx) * (1.0 - fy)
            + tr[c] * fx * (1.0 - fy)
            + bl[c] * (1.0 - fx) * fy
            + br[c] * fx * fy
    })
}

/// Warp `image` through `transform` into a square `size`×`size` output.
pub fn warp(image: &RgbImage, transform: &Similarity, size: u32) -> RgbImage {
    let mut out = RgbImage::new(size, size);
    for (ox, oy, pixel) in out.enumerate_pixels_mut() {
        let Some((sx, sy)) = transform.invert((ox as f32, oy as f32)) else {
            continue;
        };
        let v = sample(image, sx, sy);
        *pixel = Rgb(v.map(|c| c.round().clamp(0.0, 255.0) as u8));
    }
    out
}

/// Align a detected face to the canonical 112×112 ArcFace crop.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> RgbImage {
    let transform = Similarity::estimate(landmarks, &REFERENCE_LANDMARKS_112);
    warp(image, &transform, ALIGNED_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_identity_estimate() {
        let t = Similarity::estimate(&REFERENCE_LANDMARKS_112, &REFERENCE_LANDMARKS_112);
        assert!(close(t.a, 1.0, 1e-4), "a = {}", t.a);
        assert!(close(t.b, 0.0, 1e-4), "b = {}", t.b);
        assert!(close(t.tx, 0.0, 1e-3) && close(t.ty, 0.0, 1e-3));
    }

    #[test]
    fn test_scale_and_shift_recovered() {
        // Source is the reference doubled and moved by (+40, +10).
        let src: Vec<(f32, f32)> = REFERENCE_LANDMARKS_112
            .iter()
            .map(|&(x, y)| (2.0 * x + 40.0, 2.0 * y + 10.0))
            .collect();
        let t = Similarity::estimate(&src, &REFERENCE_LANDMARKS_112);
        assert!(close(t.a, 0.5, 1e-3), "a = {}", t.a);
        assert!(close(t.b, 0.0, 1e-3));
        for (s, d) in src.iter().zip(REFERENCE_LANDMARKS_112) {
            let (x, y) = t.apply(*s);
            assert!(close(x, d.0, 1e-2) && close(y, d.1, 1e-2));
        }
    }

    #[test]
    fn test_rotation_recovered() {
        // 90° rotation: (x, y) -> (-y, x)
        let src = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];
        let dst = [(0.0, 1.0), (-1.0, 0.0), (0.0, -1.0), (1.0, 0.0)];
        let t = Similarity::estimate(&src, &dst);
        assert!(close(t.a, 0.0, 1e-5) && close(t.b, 1.0, 1e-5));
    }

    #[test]
    fn test_invert_roundtrip() {
        let t = Similarity {
            a: 0.7,
            b: 0.3,
            tx: 5.0,
            ty: -2.0,
        };
        let p = (13.0, 42.0);
        let (x, y) = t.invert(t.apply(p)).unwrap();
        assert!(close(x, p.0, 1e-3) && close(y, p.1, 1e-3));
    }

    #[test]
    fn test_degenerate_input_is_identity() {
        let src = [(5.0, 5.0); 5];
        assert_eq!(Similarity::estimate(&src, &REFERENCE_LANDMARKS_112), Similarity::IDENTITY);
    }

    #[test]
    fn test_align_output_size() {
        let frame = RgbImage::from_pixel(640, 480, Rgb([90, 120, 200]));
        let aligned = align_face(&frame, &REFERENCE_LANDMARKS_112);
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
        // Reference landmarks on a uniform frame: identity warp keeps the colour.
        assert_eq!(aligned.get_pixel(56, 56), &Rgb([90, 120, 200]));
    }

    #[test]
    fn test_left_eye_lands_on_reference() {
        let mut frame = RgbImage::new(200, 200);
        let src = [(80.0, 60.0), (120.0, 60.0), (100.0, 85.0), (85.0, 110.0), (115.0, 110.0)];
        for y in 58..=62 {
            for x in 78..=82 {
                frame.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }

        let aligned = align_face(&frame, &src);
        let (rx, ry) = (
            REFERENCE_LANDMARKS_112[0].0.round() as u32,
            REFERENCE_LANDMARKS_112[0].1.round() as u32,
        );
        let max_red = (ry - 1..=ry + 1)
            .flat_map(|y| (rx - 1..=rx + 1).map(move |x| (x, y)))
            .map(|(x, y)| aligned.get_pixel(x, y)[0])
            .max()
            .unwrap();
        assert!(max_red > 100, "expected red patch near ({rx}, {ry}), max={max_red}");
        assert_eq!(aligned.get_pixel(rx, ry)[1], 0);
    }
}
