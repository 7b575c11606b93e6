//! FAST corner detection for scene matching.
//!
//! Corners are found with the FAST-N segment test (a contiguous arc of at
//! least N circle pixels all brighter or all darker than the centre),
//! thinned by non-maximum suppression, refined to subpixel precision and
//! oriented by the intensity centroid of their patch.

pub mod detector;
pub mod error;
pub mod refinement;
pub mod types;
pub mod utils;

pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use refinement::KeypointRefinement;
