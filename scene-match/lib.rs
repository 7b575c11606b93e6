//! Reference-image retrieval by local feature matching.
//!
//! Training extracts ORB features from every image of a directory into a
//! [`ReferenceIndex`]. A query is compared against each entry by mutual
//! nearest-neighbour filtering followed by a RANSAC homography fit; the
//! entry with the lowest mean inlier distance wins, and the gap to the
//! runner-up is reported as confidence.
//!
//! ```no_run
//! use scene_match::ImageMatcher;
//!
//! let matcher = ImageMatcher::builder().threshold(20).build()?;
//! matcher.train("reference/")?;
//! let report = matcher.find_best_match("query.jpg")?;
//! println!("{} (confidence {:.1})", report.name, report.confidence);
//! # Ok::<(), scene_match::MatchError>(())
//! ```

pub mod cancel;
pub mod config;
pub mod cross_check;
pub mod error;
pub mod extractor;
pub mod homography;
pub mod index;
pub mod matcher;
pub mod matching;
pub mod observer;
pub mod ranking;
pub mod source;
pub mod verify;

pub use cancel::CancellationToken;
pub use config::{ConfigError, MatcherConfig, RansacConfig, VerificationStrategy};
pub use cross_check::cross_validate;
pub use error::{ExtractionError, MatchError, MatchResult, SourceError};
pub use extractor::{FeatureExtractor, OrbExtractor};
pub use homography::{FitError, HomographyEstimator, HomographyFit, PointPair, RansacHomography};
pub use index::{ReferenceEntry, ReferenceIndex};
pub use matcher::{ImageMatcher, MatchReport, MatcherBuilder};
pub use matching::{BruteForceMatcher, CorrespondenceFinder};
pub use observer::{LogObserver, MatchObserver, NoopObserver};
pub use ranking::{rank, Ranking};
pub use source::{load_image, DirectorySource, ImageSource, MemorySource, IMAGE_EXTENSIONS};
pub use verify::{GeometricVerifier, VerificationOutcome, VerificationResult};

pub use scene_core::{self, Correspondence, Descriptor, DescriptorSet, Image, Keypoint, OrbConfig};

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use scene_core::{Descriptor, DescriptorSet, Image, Keypoint};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Fresh empty directory under the system temp dir
    pub fn scratch_dir(tag: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("scene-match-{}-{}-{}", tag, std::process::id(), n));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Descriptor with `byte` in its first byte, zero elsewhere
    pub fn desc(byte: u8) -> Descriptor {
        let mut d = [0u8; 32];
        d[0] = byte;
        d
    }

    /// Keypoints at (i, 0); only the descriptors matter
    pub fn set_of(descriptors: Vec<Descriptor>) -> DescriptorSet {
        let keypoints = (0..descriptors.len()).map(|i| Keypoint::new(i as f32, 0.0)).collect();
        DescriptorSet::new(keypoints, descriptors).unwrap()
    }

    /// Gray background covered with random filled rectangles
    pub fn textured_scene(width: u32, height: u32, seed: u64) -> Image {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut img = Image::from_pixel(width, height, image::Luma([128]));
        for _ in 0..(width * height / 150).max(8) {
            let w = rng.gen_range(4..=(width / 4).max(5));
            let h = rng.gen_range(4..=(height / 4).max(5));
            let x = rng.gen_range(0..width as i32);
            let y = rng.gen_range(0..height as i32);
            let shade = if rng.gen_bool(0.5) { rng.gen_range(0..80) } else { rng.gen_range(176..=255) };
            draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), image::Luma([shade]));
        }
        img
    }
}
