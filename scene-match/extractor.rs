use std::borrow::Cow;

use scene_brief::BriefGenerator;
use scene_core::{DescriptorSet, Image, OrbConfig};
use scene_fast::{FastDetector, FastError, FastResult};

use crate::error::ExtractionError;

/// Turns an image into aligned keypoints and descriptors.
/// Implementations must be deterministic for a fixed image and configuration.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, image: &Image) -> Result<DescriptorSet, ExtractionError>;
}

/// ORB features: FAST-N corners with steered BRIEF descriptors
pub struct OrbExtractor {
    fast_detector: FastDetector,
    brief_generator: BriefGenerator,
    blur_sigma: f32,
}

impl OrbExtractor {
    pub fn new(cfg: OrbConfig) -> FastResult<Self> {
        let patch_size = cfg.patch_size;
        let blur_sigma = cfg.blur_sigma;
        let fast_detector = FastDetector::new(cfg)?;
        let brief_generator =
            BriefGenerator::new(patch_size).ok_or(FastError::InvalidPatchSize { patch_size })?;

        Ok(Self {
            fast_detector,
            brief_generator,
            blur_sigma,
        })
    }

    /// Get detector configuration
    pub fn config(&self) -> &OrbConfig {
        self.fast_detector.config()
    }
}

impl FeatureExtractor for OrbExtractor {
    fn extract(&self, image: &Image) -> Result<DescriptorSet, ExtractionError> {
        let keypoints = self.fast_detector.detect_keypoints(image)?;
        if keypoints.is_empty() {
            return Err(ExtractionError::NoKeypoints);
        }

        // BRIEF compares single pixels, so sample a smoothed copy
        let smoothed = if self.blur_sigma > 0.0 {
            Cow::Owned(imageproc::filter::gaussian_blur_f32(image, self.blur_sigma))
        } else {
            Cow::Borrowed(image)
        };

        let descriptors = self.brief_generator.generate_descriptors(&smoothed, &keypoints);
        Ok(DescriptorSet::new(keypoints, descriptors)?)
    }
}
