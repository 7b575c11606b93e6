//! Planar homography estimation.
//!
//! `dlt_homography` is the Hartley-normalised Direct Linear Transform;
//! `RansacHomography` wraps it in a seeded RANSAC loop with an adaptive
//! iteration bound and a final refit on the consensus set. Residuals are
//! forward transfer errors in pixels: `|H * src - dst|`.

use nalgebra::{DMatrix, Matrix3, Point2, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::RansacConfig;

/// Smallest point set that determines a homography
pub const MIN_HOMOGRAPHY_POINTS: usize = 4;

const EPS: f64 = 1e-12;

/// Query-image point and the reference-image point it corresponds to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair {
    pub src: Point2<f64>,
    pub dst: Point2<f64>,
}

impl PointPair {
    pub fn new(src: (f64, f64), dst: (f64, f64)) -> Self {
        Self {
            src: Point2::new(src.0, src.1),
            dst: Point2::new(dst.0, dst.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomographyFit {
    pub matrix: Matrix3<f64>,
    /// One flag per input pair, in input order
    pub inliers: Vec<bool>,
}

impl HomographyFit {
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&i| i).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    TooFewPoints(usize),
    Degenerate,
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::TooFewPoints(n) => {
                write!(f, "need at least {} point pairs, got {}", MIN_HOMOGRAPHY_POINTS, n)
            }
            FitError::Degenerate => write!(f, "degenerate point configuration"),
        }
    }
}

impl std::error::Error for FitError {}

/// Robust homography fit over pairs contaminated by outliers
pub trait HomographyEstimator: Send + Sync {
    fn fit(&self, pairs: &[PointPair], threshold: f64) -> Result<HomographyFit, FitError>;
}

/// Forward transfer error of one pair under `h`
pub fn transfer_error(h: &Matrix3<f64>, pair: &PointPair) -> f64 {
    let p = h * Vector3::new(pair.src.x, pair.src.y, 1.0);
    if p[2].abs() < EPS {
        return f64::INFINITY;
    }
    let dx = p[0] / p[2] - pair.dst.x;
    let dy = p[1] / p[2] - pair.dst.y;
    (dx * dx + dy * dy).sqrt()
}

/// Zero-mean, mean distance sqrt(2). None when all points coincide.
fn normalize_points(points: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < EPS {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((normalized, t))
}

/// Normalised DLT over at least four pairs
pub fn dlt_homography(pairs: &[PointPair]) -> Option<Matrix3<f64>> {
    let n = pairs.len();
    if n < MIN_HOMOGRAPHY_POINTS {
        return None;
    }

    let src: Vec<Point2<f64>> = pairs.iter().map(|p| p.src).collect();
    let dst: Vec<Point2<f64>> = pairs.iter().map(|p| p.dst).collect();
    let (src_n, t_src) = normalize_points(&src)?;
    let (dst_n, t_dst) = normalize_points(&dst)?;

    // 2n x 9 design matrix, padded to square when underdetermined
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (s, d)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);
        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    // h is the right singular vector of the smallest singular value
    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h_vec = v_t.row(min_idx);

    let mut h = Matrix3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h[(r, c)] = h_vec[3 * r + c];
        }
    }

    let h = t_dst.try_inverse()? * h * t_src;
    let scale = h[(2, 2)];
    let h = if scale.abs() > EPS { h / scale } else { h };

    h.iter().all(|v| v.is_finite()).then_some(h)
}

fn collinear(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> bool {
    let area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    area.abs() < 1e-6
}

/// A minimal sample with three collinear points on either side cannot
/// determine a homography
fn is_degenerate(sample: &[PointPair]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        collinear(&sample[i].src, &sample[j].src, &sample[k].src)
            || collinear(&sample[i].dst, &sample[j].dst, &sample[k].dst)
    })
}

/// Seeded RANSAC over the normalised DLT. The same input always yields the
/// same fit.
#[derive(Debug, Clone)]
pub struct RansacHomography {
    pub max_iterations: usize,
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacHomography {
    fn default() -> Self {
        Self::from_config(&RansacConfig::default())
    }
}

impl RansacHomography {
    pub fn from_config(cfg: &RansacConfig) -> Self {
        Self {
            max_iterations: cfg.max_iterations,
            confidence: cfg.confidence,
            seed: cfg.seed,
        }
    }

    /// Iterations needed to draw one all-inlier sample with `confidence`
    fn required_iterations(&self, inlier_ratio: f64) -> usize {
        let p_good = inlier_ratio.powi(MIN_HOMOGRAPHY_POINTS as i32);
        if p_good <= f64::EPSILON {
            return self.max_iterations;
        }
        if p_good >= 1.0 - f64::EPSILON {
            return 1;
        }
        let k = (1.0 - self.confidence).ln() / (1.0 - p_good).ln();
        if k.is_finite() {
            (k.ceil() as usize).clamp(1, self.max_iterations)
        } else {
            self.max_iterations
        }
    }

    /// Inlier mask and summed inlier error of a model
    fn score(h: &Matrix3<f64>, pairs: &[PointPair], threshold: f64) -> (Vec<bool>, usize, f64) {
        let mut mask = Vec::with_capacity(pairs.len());
        let mut count = 0;
        let mut error = 0.0;
        for pair in pairs {
            let e = transfer_error(h, pair);
            let inlier = e <= threshold;
            if inlier {
                count += 1;
                error += e;
            }
            mask.push(inlier);
        }
        (mask, count, error)
    }
}

impl HomographyEstimator for RansacHomography {
    fn fit(&self, pairs: &[PointPair], threshold: f64) -> Result<HomographyFit, FitError> {
        let n = pairs.len();
        if n < MIN_HOMOGRAPHY_POINTS {
            return Err(FitError::TooFewPoints(n));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(Matrix3<f64>, Vec<bool>, usize, f64)> = None;
        let mut needed = self.max_iterations;
        let mut iteration = 0;

        while iteration < needed {
            iteration += 1;

            let sample: Vec<PointPair> = rand::seq::index::sample(&mut rng, n, MIN_HOMOGRAPHY_POINTS)
                .into_iter()
                .map(|i| pairs[i])
                .collect();
            if is_degenerate(&sample) {
                continue;
            }
            let Some(h) = dlt_homography(&sample) else {
                continue;
            };

            let (mask, count, error) = Self::score(&h, pairs, threshold);
            let better = match &best {
                None => true,
                Some((_, _, best_count, best_error)) => {
                    count > *best_count || (count == *best_count && error < *best_error)
                }
            };
            if better {
                needed = needed.min(self.required_iterations(count as f64 / n as f64));
                best = Some((h, mask, count, error));
                if count == n {
                    break;
                }
            }
        }

        let (h, mask, count, _) = best.ok_or(FitError::Degenerate)?;
        log::trace!("RANSAC: {} iterations, {}/{} inliers", iteration, count, n);

        // Least-squares refit on the consensus set, kept only if it does not lose support
        if count > MIN_HOMOGRAPHY_POINTS {
            let consensus: Vec<PointPair> = pairs
                .iter()
                .zip(&mask)
                .filter(|(_, &inlier)| inlier)
                .map(|(p, _)| *p)
                .collect();
            if let Some(refit) = dlt_homography(&consensus) {
                let (refit_mask, refit_count, _) = Self::score(&refit, pairs, threshold);
                if refit_count >= count {
                    return Ok(HomographyFit {
                        matrix: refit,
                        inliers: refit_mask,
                    });
                }
            }
        }

        Ok(HomographyFit { matrix: h, inliers: mask })
    }
}
