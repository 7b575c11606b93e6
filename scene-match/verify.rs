use nalgebra::Matrix3;
use scene_core::{Correspondence, DescriptorSet};

use crate::config::{MatcherConfig, VerificationStrategy};
use crate::cross_check::cross_validate;
use crate::homography::{HomographyEstimator, PointPair, RansacHomography, MIN_HOMOGRAPHY_POINTS};
use crate::matching::{BruteForceMatcher, CorrespondenceFinder};

/// Why a comparison scored what it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    /// Fewer filtered correspondences than a fit needs
    TooFewCorrespondences,
    /// The estimator found no non-degenerate model
    FitFailed,
    NoInliers,
}

/// Result of comparing one query against one reference entry
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    /// Query-to-reference transform; `None` below four inliers
    pub homography: Option<Matrix3<f64>>,
    /// Filtered correspondences, in forward-scan order of the query
    pub correspondences: Vec<Correspondence>,
    /// Aligned with `correspondences`
    pub inliers: Vec<bool>,
    /// Mean inlier distance, or the failure score
    pub support: f32,
    pub outcome: VerificationOutcome,
}

impl VerificationResult {
    fn failed(correspondences: Vec<Correspondence>, outcome: VerificationOutcome, failure_score: f32) -> Self {
        let inliers = vec![false; correspondences.len()];
        Self {
            homography: None,
            correspondences,
            inliers,
            support: failure_score,
            outcome,
        }
    }

    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&i| i).count()
    }

    pub fn is_verified(&self) -> bool {
        self.outcome == VerificationOutcome::Verified
    }
}

/// Mean distance over the masked correspondences
fn masked_mean(correspondences: &[Correspondence], mask: &[bool]) -> Option<f32> {
    let (sum, count) = correspondences
        .iter()
        .zip(mask)
        .filter(|(_, &keep)| keep)
        .fold((0.0f32, 0usize), |(s, n), (c, _)| (s + c.distance, n + 1));
    (count > 0).then(|| sum / count as f32)
}

/// Runs the configured strategy for one query/reference pair
pub struct GeometricVerifier {
    finder: Box<dyn CorrespondenceFinder>,
    estimator: Box<dyn HomographyEstimator>,
    strategy: VerificationStrategy,
    min_correspondences: usize,
    inlier_threshold: f64,
    failure_score: f32,
}

impl GeometricVerifier {
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            finder: Box::new(BruteForceMatcher),
            estimator: Box::new(RansacHomography::from_config(&config.ransac)),
            strategy: config.strategy,
            min_correspondences: config.min_correspondences.max(MIN_HOMOGRAPHY_POINTS),
            inlier_threshold: config.ransac.threshold,
            failure_score: config.failure_score,
        }
    }

    pub fn with_finder(mut self, finder: Box<dyn CorrespondenceFinder>) -> Self {
        self.finder = finder;
        self
    }

    pub fn with_estimator(mut self, estimator: Box<dyn HomographyEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn strategy(&self) -> VerificationStrategy {
        self.strategy
    }

    pub fn failure_score(&self) -> f32 {
        self.failure_score
    }

    pub fn verify(&self, query: &DescriptorSet, reference: &DescriptorSet) -> VerificationResult {
        let correspondences = if self.strategy.uses_cross_check() {
            cross_validate(self.finder.as_ref(), query, reference)
        } else {
            self.finder.nearest_neighbors(query, reference)
        };

        if !self.strategy.uses_homography() {
            let inliers = vec![true; correspondences.len()];
            return match masked_mean(&correspondences, &inliers) {
                Some(support) => VerificationResult {
                    homography: None,
                    correspondences,
                    inliers,
                    support,
                    outcome: VerificationOutcome::Verified,
                },
                None => VerificationResult::failed(
                    correspondences,
                    VerificationOutcome::TooFewCorrespondences,
                    self.failure_score,
                ),
            };
        }

        if correspondences.len() < self.min_correspondences {
            return VerificationResult::failed(
                correspondences,
                VerificationOutcome::TooFewCorrespondences,
                self.failure_score,
            );
        }

        let (query_kps, reference_kps) = (query.keypoints(), reference.keypoints());
        let pairs: Vec<PointPair> = correspondences
            .iter()
            .map(|c| {
                let q = &query_kps[c.query_idx];
                let r = &reference_kps[c.reference_idx];
                PointPair::new((q.x as f64, q.y as f64), (r.x as f64, r.y as f64))
            })
            .collect();

        let fit = match self.estimator.fit(&pairs, self.inlier_threshold) {
            Ok(fit) => fit,
            Err(e) => {
                log::trace!("Homography fit failed: {}", e);
                return VerificationResult::failed(
                    correspondences,
                    VerificationOutcome::FitFailed,
                    self.failure_score,
                );
            }
        };

        let inlier_count = fit.inlier_count();
        match masked_mean(&correspondences, &fit.inliers) {
            Some(support) => VerificationResult {
                homography: (inlier_count >= MIN_HOMOGRAPHY_POINTS).then_some(fit.matrix),
                correspondences,
                inliers: fit.inliers,
                support,
                outcome: VerificationOutcome::Verified,
            },
            None => VerificationResult::failed(correspondences, VerificationOutcome::NoInliers, self.failure_score),
        }
    }
}
