#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 8-bit grayscale image, row-major
pub type Image = image::GrayImage;

/// Key-point ≙ FAST corner + orientation (radians) with subpixel precision
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Corner strength reported by the detector
    pub response: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, angle: 0.0, response: 0.0 }
    }
}

pub const DESCRIPTOR_BYTES: usize = 32;
pub const DESCRIPTOR_BITS: usize = DESCRIPTOR_BYTES * 8;

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// Number of differing bits between two descriptors.
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSetError {
    Misaligned { keypoints: usize, descriptors: usize },
}

impl std::fmt::Display for FeatureSetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureSetError::Misaligned { keypoints, descriptors } => {
                write!(f, "Feature set misaligned: {} keypoints vs {} descriptors", keypoints, descriptors)
            }
        }
    }
}

impl std::error::Error for FeatureSetError {}

/// Keypoints and descriptors of one image. Position `i` of both sequences
/// describes the same feature.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DescriptorSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Descriptor>,
}

impl DescriptorSet {
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Vec<Descriptor>) -> Result<Self, FeatureSetError> {
        if keypoints.len() != descriptors.len() {
            return Err(FeatureSetError::Misaligned {
                keypoints: keypoints.len(),
                descriptors: descriptors.len(),
            });
        }
        Ok(Self { keypoints, descriptors })
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Iterate over aligned (keypoint, descriptor) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&Keypoint, &Descriptor)> {
        self.keypoints.iter().zip(self.descriptors.iter())
    }

    pub fn into_parts(self) -> (Vec<Keypoint>, Vec<Descriptor>) {
        (self.keypoints, self.descriptors)
    }
}

/// Candidate pairing of a query feature with a reference feature.
/// Lower distance means more similar.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Correspondence {
    pub query_idx: usize,
    pub reference_idx: usize,
    pub distance: f32,
}

impl Correspondence {
    pub fn new(query_idx: usize, reference_idx: usize, distance: f32) -> Self {
        Self { query_idx, reference_idx, distance }
    }

    /// Same pairing seen from the other side
    pub fn reversed(&self) -> Self {
        Self {
            query_idx: self.reference_idx,
            reference_idx: self.query_idx,
            distance: self.distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct OrbConfig {
    /// FAST intensity threshold (1-127)
    pub threshold: u8,
    /// Contiguous arc length of the FAST test (9-16)
    pub fast_n: u8,
    /// Odd patch size used for orientation and BRIEF sampling
    pub patch_size: usize,
    pub nms_distance: f32,
    /// Strongest corners kept per image
    pub max_features: usize,
    /// Gaussian smoothing applied before descriptor sampling, 0 disables
    pub blur_sigma: f32,
    pub n_threads: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            fast_n: 9,
            patch_size: 31,
            nms_distance: 3.0,
            max_features: 500,
            blur_sigma: 1.2,
            n_threads: num_cpus::get().max(1),
        }
    }
}

pub use rayon::ThreadPoolBuildError;

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
