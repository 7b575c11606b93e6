use std::path::PathBuf;

use scene_core::FeatureSetError;
use scene_fast::FastError;

use crate::config::ConfigError;

/// Failures reading images or directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    NotFound(PathBuf),
    NotADirectory(PathBuf),
    Unreadable { path: PathBuf, reason: String },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotFound(path) => write!(f, "No such file: {}", path.display()),
            SourceError::NotADirectory(path) => write!(f, "No such directory: {}", path.display()),
            SourceError::Unreadable { path, reason } => {
                write!(f, "Cannot load image {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// An image that produced no usable features
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionError {
    NoKeypoints,
    Detector(FastError),
    Misaligned(FeatureSetError),
}

impl std::fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionError::NoKeypoints => write!(f, "No keypoints found"),
            ExtractionError::Detector(e) => write!(f, "FAST error: {}", e),
            ExtractionError::Misaligned(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ExtractionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractionError::Detector(e) => Some(e),
            ExtractionError::Misaligned(e) => Some(e),
            ExtractionError::NoKeypoints => None,
        }
    }
}

impl From<FastError> for ExtractionError {
    fn from(err: FastError) -> Self {
        ExtractionError::Detector(err)
    }
}

impl From<FeatureSetError> for ExtractionError {
    fn from(err: FeatureSetError) -> Self {
        ExtractionError::Misaligned(err)
    }
}

/// Whole-operation failures surfaced by the matcher. Per-entry verification
/// failures never show up here; they become the failure score.
#[derive(Debug)]
pub enum MatchError {
    /// Training directory missing or not a directory
    Configuration(SourceError),
    /// Query image missing/unreadable, or a training image failed to load
    Source(SourceError),
    /// Query image without usable features
    Extraction(ExtractionError),
    /// Query issued before training, or training indexed nothing
    EmptyIndex,
    Cancelled,
    InvalidConfig(ConfigError),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::Configuration(e) => write!(f, "Training failed: {}", e),
            MatchError::Source(e) => write!(f, "{}", e),
            MatchError::Extraction(e) => write!(f, "Feature extraction failed: {}", e),
            MatchError::EmptyIndex => write!(f, "Reference index is empty; train before matching"),
            MatchError::Cancelled => write!(f, "Matching cancelled"),
            MatchError::InvalidConfig(e) => write!(f, "Invalid configuration: {}", e),
            MatchError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
        }
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatchError::Configuration(e) | MatchError::Source(e) => Some(e),
            MatchError::Extraction(e) => Some(e),
            MatchError::InvalidConfig(e) => Some(e),
            MatchError::ThreadPool(e) => Some(e),
            MatchError::EmptyIndex | MatchError::Cancelled => None,
        }
    }
}

impl From<SourceError> for MatchError {
    fn from(err: SourceError) -> Self {
        MatchError::Source(err)
    }
}

impl From<ExtractionError> for MatchError {
    fn from(err: ExtractionError) -> Self {
        MatchError::Extraction(err)
    }
}

impl From<ConfigError> for MatchError {
    fn from(err: ConfigError) -> Self {
        MatchError::InvalidConfig(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for MatchError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        MatchError::ThreadPool(err)
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
