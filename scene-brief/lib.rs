use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use scene_core::{Descriptor, Image, Keypoint, DESCRIPTOR_BITS, DESCRIPTOR_BYTES};

/// Seed of the sampling pattern. Changing it invalidates stored descriptors.
pub const PATTERN_SEED: u64 = 0x0b71_ef5e_ed00_0256;

/// Steered BRIEF: one intensity comparison per descriptor bit, with the
/// sampling pattern rotated by the keypoint orientation.
pub struct BriefGenerator {
    pairs: Vec<(f32, f32, f32, f32)>,
}

/// Smallest patch whose sampling disc holds distinct point pairs
pub const MIN_PATCH_SIZE: usize = 5;

impl BriefGenerator {
    /// `None` when the patch is smaller than [`MIN_PATCH_SIZE`]
    pub fn new(patch_size: usize) -> Option<Self> {
        if patch_size < MIN_PATCH_SIZE {
            return None;
        }
        let radius = (patch_size / 2) as f32 - 1.0;
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let mut sample = || loop {
            let x: f32 = rng.gen_range(-radius..=radius);
            let y: f32 = rng.gen_range(-radius..=radius);
            if x * x + y * y <= radius * radius {
                return (x.round(), y.round());
            }
        };

        let mut pairs = Vec::with_capacity(DESCRIPTOR_BITS);
        while pairs.len() < DESCRIPTOR_BITS {
            let (x1, y1) = sample();
            let (x2, y2) = sample();
            // identical points give a constant bit
            if (x1, y1) != (x2, y2) {
                pairs.push((x1, y1, x2, y2));
            }
        }

        Some(Self { pairs })
    }

    pub fn generate_descriptors(&self, img: &Image, kps: &[Keypoint]) -> Vec<Descriptor> {
        kps.par_iter().map(|kp| self.describe(img, kp)).collect()
    }

    fn describe(&self, img: &Image, kp: &Keypoint) -> Descriptor {
        let (s, c) = kp.angle.sin_cos();
        let (cx, cy) = (kp.x, kp.y);
        let mut d = [0u8; DESCRIPTOR_BYTES];

        for (i, &(dx1, dy1, dx2, dy2)) in self.pairs.iter().enumerate() {
            let (rx1, ry1) = (cx + c * dx1 - s * dy1, cy + s * dx1 + c * dy1);
            let (rx2, ry2) = (cx + c * dx2 - s * dy2, cy + s * dx2 + c * dy2);

            let bit = (bilinear_sample(img, rx1, ry1) < bilinear_sample(img, rx2, ry2)) as u8;
            d[i / 8] |= bit << (i % 8);
        }
        d
    }

    pub fn pattern(&self) -> &[(f32, f32, f32, f32)] {
        &self.pairs
    }
}

/// Bilinear interpolation for subpixel sampling, clamped at the border
fn bilinear_sample(img: &Image, x: f32, y: f32) -> f32 {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let raw = img.as_raw();
    let x0 = x.floor();
    let y0 = y.floor();
    let x1 = x0 + 1.0;
    let y1 = y0 + 1.0;

    if x0 < 0.0 || y0 < 0.0 || x1 >= w as f32 || y1 >= h as f32 {
        let cx = x.round().clamp(0.0, (w - 1) as f32) as usize;
        let cy = y.round().clamp(0.0, (h - 1) as f32) as usize;
        return raw[cy * w + cx] as f32;
    }

    let dx = x - x0;
    let dy = y - y0;
    let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);

    let p00 = raw[y0 * w + x0] as f32;
    let p10 = raw[y0 * w + x1] as f32;
    let p01 = raw[y1 * w + x0] as f32;
    let p11 = raw[y1 * w + x1] as f32;

    let top = p00 * (1.0 - dx) + p10 * dx;
    let bottom = p01 * (1.0 - dx) + p11 * dx;

    top * (1.0 - dy) + bottom * dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_core::hamming_distance;

    fn textured(w: u32, h: u32, salt: u32) -> Image {
        Image::from_fn(w, h, |x, y| {
            let v = (x.wrapping_mul(73) ^ y.wrapping_mul(151) ^ salt).wrapping_mul(2654435761) >> 24;
            image::Luma([v as u8])
        })
    }

    #[test]
    fn test_pattern_is_deterministic_and_inside_patch() {
        let a = BriefGenerator::new(31).unwrap();
        let b = BriefGenerator::new(31).unwrap();
        assert_eq!(a.pattern(), b.pattern());
        assert_eq!(a.pattern().len(), DESCRIPTOR_BITS);
        for &(x1, y1, x2, y2) in a.pattern() {
            assert!(x1.abs() <= 15.0 && y1.abs() <= 15.0);
            assert!(x2.abs() <= 15.0 && y2.abs() <= 15.0);
            assert!((x1, y1) != (x2, y2));
        }
    }

    #[test]
    fn test_small_patch_rejected() {
        assert!(BriefGenerator::new(3).is_none());
        assert!(BriefGenerator::new(0).is_none());
        assert!(BriefGenerator::new(MIN_PATCH_SIZE).is_some());
    }

    #[test]
    fn test_descriptor_count_matches_keypoints() {
        let gen = BriefGenerator::new(31).unwrap();
        let img = textured(64, 64, 0);
        let kps = vec![Keypoint::new(20.0, 20.0), Keypoint::new(40.5, 31.25)];
        assert_eq!(gen.generate_descriptors(&img, &kps).len(), 2);
        assert!(gen.generate_descriptors(&img, &[]).is_empty());
    }

    #[test]
    fn test_translation_invariance() {
        let gen = BriefGenerator::new(31).unwrap();
        let img = textured(96, 96, 7);
        let shifted = Image::from_fn(80, 80, |x, y| *img.get_pixel(x + 10, y + 6));
        let a = gen.generate_descriptors(&img, &[Keypoint::new(40.0, 40.0)]);
        let b = gen.generate_descriptors(&shifted, &[Keypoint::new(30.0, 34.0)]);
        assert_eq!(hamming_distance(&a[0], &b[0]), 0);
    }

    #[test]
    fn test_distinct_patches_differ() {
        let gen = BriefGenerator::new(31).unwrap();
        let img = textured(96, 96, 3);
        let d = gen.generate_descriptors(&img, &[Keypoint::new(25.0, 25.0), Keypoint::new(70.0, 70.0)]);
        assert!(hamming_distance(&d[0], &d[1]) > 32);
    }

    #[test]
    fn test_border_sampling_is_clamped() {
        let gen = BriefGenerator::new(31).unwrap();
        let img = textured(16, 16, 1);
        // pattern reaches outside the image; must not panic
        let d = gen.generate_descriptors(&img, &[Keypoint::new(0.0, 0.0), Keypoint::new(15.0, 15.0)]);
        assert_eq!(d.len(), 2);
    }
}
