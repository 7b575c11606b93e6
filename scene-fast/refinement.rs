use scene_core::{Image, Keypoint};

/// Subpixel refinement, orientation and suppression of detected corners
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Refine keypoint to subpixel accuracy using quadratic surface fitting
    pub fn refine_keypoint_subpixel(img: &Image, kp: Keypoint) -> Keypoint {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let x = kp.x as usize;
        let y = kp.y as usize;

        // 3x3 neighbourhood required
        if x < 1 || y < 1 || x + 1 >= width || y + 1 >= height {
            return kp;
        }

        let s = |xx: usize, yy: usize| img.get_pixel(xx as u32, yy as u32)[0] as f32;
        let samples = [
            [s(x - 1, y - 1), s(x, y - 1), s(x + 1, y - 1)],
            [s(x - 1, y), s(x, y), s(x + 1, y)],
            [s(x - 1, y + 1), s(x, y + 1), s(x + 1, y + 1)],
        ];

        // f(x,y) = Ax² + By² + Cxy + Dx + Ey + F via finite differences
        let dx = (samples[1][2] - samples[1][0]) / 2.0;
        let dy = (samples[2][1] - samples[0][1]) / 2.0;
        let dxx = samples[1][2] - 2.0 * samples[1][1] + samples[1][0];
        let dyy = samples[2][1] - 2.0 * samples[1][1] + samples[0][1];
        let dxy = (samples[2][2] - samples[2][0] - samples[0][2] + samples[0][0]) / 4.0;

        let det = dxx * dyy - dxy * dxy;
        if det.abs() < 1e-6 {
            return kp;
        }

        let offset_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
        let offset_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);

        Keypoint {
            x: kp.x + offset_x,
            y: kp.y + offset_y,
            ..kp
        }
    }

    /// Orientation from the intensity centroid of a square patch.
    /// The caller guarantees the patch lies inside the image.
    pub fn compute_orientation(img: &Image, x: usize, y: usize, patch_size: usize) -> f32 {
        let half = (patch_size / 2) as i64;
        let width = img.width() as usize;
        let raw = img.as_raw();
        let mut m10 = 0i64;
        let mut m01 = 0i64;

        for dy in -half..=half {
            let row = ((y as i64 + dy) as usize) * width;
            for dx in -half..=half {
                let val = raw[row + (x as i64 + dx) as usize] as i64;
                m10 += dx * val;
                m01 += dy * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }

    /// Non-maximum suppression, strongest first. The result is sorted by
    /// descending response; equal responses keep their input order.
    pub fn non_maximum_suppression(keypoints: &[Keypoint], min_distance: f32) -> Vec<Keypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }

        let mut sorted_keypoints = keypoints.to_vec();
        sorted_keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));

        let mut suppressed: Vec<Keypoint> = Vec::new();
        let min_distance_sq = min_distance * min_distance;

        for candidate in sorted_keypoints {
            let is_local_max = suppressed.iter().all(|existing| {
                let dx = candidate.x - existing.x;
                let dy = candidate.y - existing.y;
                dx * dx + dy * dy >= min_distance_sq
            });

            if is_local_max {
                suppressed.push(candidate);
            }
        }

        suppressed
    }
}
