use scene_core::{Image, Keypoint, OrbConfig};
use crate::error::{FastError, FastResult};
use crate::refinement::KeypointRefinement;
use crate::types::{FAST_OFFSETS, FAST_RADIUS};
use crate::utils::has_consecutive_bits;
use rayon::prelude::*;

/// FAST-N corner detector with oriented, subpixel keypoints
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: OrbConfig,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: OrbConfig) -> FastResult<Self> {
        // 0 accepts every pixel; above 127 no pixel can sit on both arc sides
        if cfg.threshold == 0 || cfg.threshold > 127 {
            return Err(FastError::InvalidThreshold(cfg.threshold));
        }

        if !(9..=16).contains(&cfg.fast_n) {
            return Err(FastError::InvalidArcLength(cfg.fast_n));
        }

        if cfg.patch_size % 2 == 0 || cfg.patch_size < 7 {
            return Err(FastError::InvalidPatchSize { patch_size: cfg.patch_size });
        }

        Ok(Self { cfg })
    }

    /// Distance from the image edge inside which no corner is reported.
    /// The orientation patch of every keypoint lies inside the image.
    pub fn border(&self) -> usize {
        (self.cfg.patch_size / 2).max(FAST_RADIUS)
    }

    /// Smallest image side the detector accepts
    pub fn min_image_size(&self) -> usize {
        2 * self.border() + 1
    }

    /// Detect, suppress, refine and cap keypoints, strongest first
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        let candidates = self.detect_keypoints_with_response(img)?;
        let mut suppressed = KeypointRefinement::non_maximum_suppression(&candidates, self.cfg.nms_distance);
        suppressed.truncate(self.cfg.max_features);

        log::debug!(
            "FAST: {} candidates, {} after suppression",
            candidates.len(),
            suppressed.len()
        );

        Ok(suppressed
            .into_iter()
            .map(|kp| KeypointRefinement::refine_keypoint_subpixel(img, kp))
            .collect())
    }

    /// Raw FAST corners with orientation and response, in row-major order
    pub fn detect_keypoints_with_response(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let min_size = self.min_image_size();
        if w < min_size || h < min_size {
            return Err(FastError::ImageTooSmall { width: w, height: h, min_size });
        }

        let border = self.border();
        let raw = img.as_raw();

        let keypoints = (border..h - border)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut v = Vec::new();
                for x in border..w - border {
                    if let Some(response) = self.classify(raw, w, x, y) {
                        v.push(Keypoint {
                            x: x as f32,
                            y: y as f32,
                            angle: KeypointRefinement::compute_orientation(img, x, y, self.cfg.patch_size),
                            response,
                        });
                    }
                }
                v
            })
            .collect();

        Ok(keypoints)
    }

    /// FAST segment test at one pixel. Returns the mean absolute difference
    /// of the pixels on the winning arc side.
    fn classify(&self, raw: &[u8], w: usize, x: usize, y: usize) -> Option<f32> {
        // widened so the threshold never saturates at 0 or 255
        let p = raw[y * w + x] as i16;
        let t = self.cfg.threshold as i16;
        let mut bright_mask = 0u16;
        let mut dark_mask = 0u16;
        let mut bright_sum = 0i32;
        let mut dark_sum = 0i32;

        for (i, &(dx, dy)) in FAST_OFFSETS.iter().enumerate() {
            let xx = (x as i32 + dx) as usize;
            let yy = (y as i32 + dy) as usize;
            let q = raw[yy * w + xx] as i16;

            if q >= p + t {
                bright_mask |= 1 << i;
                bright_sum += (q - p) as i32;
            } else if q <= p - t {
                dark_mask |= 1 << i;
                dark_sum += (p - q) as i32;
            }
        }

        let n = self.cfg.fast_n as usize;
        if has_consecutive_bits(bright_mask, n) {
            Some(bright_sum as f32 / bright_mask.count_ones() as f32)
        } else if has_consecutive_bits(dark_mask, n) {
            Some(dark_sum as f32 / dark_mask.count_ones() as f32)
        } else {
            None
        }
    }

    /// Get detector configuration
    pub fn config(&self) -> &OrbConfig {
        &self.cfg
    }
}
