use scene_core::{OrbConfig, DESCRIPTOR_BITS};
use scene_fast::{FastDetector, FastError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a query/reference pair is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "kebab-case"))]
pub enum VerificationStrategy {
    /// Plain nearest neighbours, scored by mean distance
    NearestNeighbor,
    /// Mutual nearest neighbours, scored by mean distance
    CrossCheck,
    /// Mutual nearest neighbours, scored by mean distance over homography inliers
    #[default]
    CrossCheckHomography,
}

impl VerificationStrategy {
    pub fn uses_cross_check(&self) -> bool {
        !matches!(self, VerificationStrategy::NearestNeighbor)
    }

    pub fn uses_homography(&self) -> bool {
        matches!(self, VerificationStrategy::CrossCheckHomography)
    }
}

impl std::fmt::Display for VerificationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VerificationStrategy::NearestNeighbor => "nearest-neighbor",
            VerificationStrategy::CrossCheck => "cross-check",
            VerificationStrategy::CrossCheckHomography => "cross-check-homography",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for VerificationStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest-neighbor" | "nn" => Ok(VerificationStrategy::NearestNeighbor),
            "cross-check" => Ok(VerificationStrategy::CrossCheck),
            "cross-check-homography" | "homography" => Ok(VerificationStrategy::CrossCheckHomography),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Robust homography estimation settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct RansacConfig {
    /// Inlier reprojection threshold in pixels
    pub threshold: f64,
    pub max_iterations: usize,
    /// Probability of drawing at least one outlier-free sample
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Detector(FastError),
    InvalidMaxFeatures(usize),
    InvalidBlurSigma(f32),
    InvalidRansacThreshold(f64),
    InvalidConfidence(f64),
    InvalidIterations(usize),
    TooFewCorrespondences(usize),
    InvalidFailureScore(f32),
    UnknownStrategy(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Detector(e) => write!(f, "Invalid detector settings: {}", e),
            ConfigError::InvalidMaxFeatures(n) => write!(f, "Invalid max features: {} (must be > 0)", n),
            ConfigError::InvalidBlurSigma(s) => write!(f, "Invalid blur sigma: {} (must be >= 0)", s),
            ConfigError::InvalidRansacThreshold(t) => {
                write!(f, "Invalid RANSAC threshold: {} (must be > 0)", t)
            }
            ConfigError::InvalidConfidence(c) => write!(f, "Invalid RANSAC confidence: {} (must be in (0, 1))", c),
            ConfigError::InvalidIterations(n) => write!(f, "Invalid RANSAC iterations: {} (must be > 0)", n),
            ConfigError::TooFewCorrespondences(n) => {
                write!(f, "Minimum correspondences {} below the 4 a homography needs", n)
            }
            ConfigError::InvalidFailureScore(s) => {
                write!(f, "Failure score {} must be finite and at least {}", s, DESCRIPTOR_BITS)
            }
            ConfigError::UnknownStrategy(s) => write!(f, "Unknown verification strategy: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<FastError> for ConfigError {
    fn from(err: FastError) -> Self {
        ConfigError::Detector(err)
    }
}

/// Complete matcher configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct MatcherConfig {
    pub orb: OrbConfig,
    pub strategy: VerificationStrategy,
    pub ransac: RansacConfig,
    /// Fewest filtered correspondences a homography fit is attempted on
    pub min_correspondences: usize,
    /// Score of a reference entry whose verification failed
    pub failure_score: f32,
    /// Compare reference entries on the rayon pool
    pub parallel: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            orb: OrbConfig::default(),
            strategy: VerificationStrategy::default(),
            ransac: RansacConfig::default(),
            min_correspondences: 4,
            failure_score: DESCRIPTOR_BITS as f32,
            parallel: true,
        }
    }
}

impl MatcherConfig {
    /// Fewer features and RANSAC iterations
    pub fn fast_preset() -> Self {
        let mut config = Self::default();
        config.orb.threshold = 30;
        config.orb.max_features = 300;
        config.ransac.max_iterations = 500;
        config.ransac.confidence = 0.99;
        config
    }

    /// More features, more RANSAC effort
    pub fn accurate_preset() -> Self {
        let mut config = Self::default();
        config.orb.threshold = 12;
        config.orb.max_features = 1000;
        config.orb.nms_distance = 2.0;
        config.ransac.max_iterations = 5000;
        config.ransac.confidence = 0.999;
        config
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        FastDetector::new(self.orb.clone())?;
        if self.orb.max_features == 0 {
            return Err(ConfigError::InvalidMaxFeatures(self.orb.max_features));
        }
        if !(self.orb.blur_sigma >= 0.0 && self.orb.blur_sigma.is_finite()) {
            return Err(ConfigError::InvalidBlurSigma(self.orb.blur_sigma));
        }
        if !(self.ransac.threshold > 0.0 && self.ransac.threshold.is_finite()) {
            return Err(ConfigError::InvalidRansacThreshold(self.ransac.threshold));
        }
        if !(self.ransac.confidence > 0.0 && self.ransac.confidence < 1.0) {
            return Err(ConfigError::InvalidConfidence(self.ransac.confidence));
        }
        if self.ransac.max_iterations == 0 {
            return Err(ConfigError::InvalidIterations(self.ransac.max_iterations));
        }
        if self.min_correspondences < 4 {
            return Err(ConfigError::TooFewCorrespondences(self.min_correspondences));
        }
        if !self.failure_score.is_finite() || self.failure_score < DESCRIPTOR_BITS as f32 {
            return Err(ConfigError::InvalidFailureScore(self.failure_score));
        }
        Ok(())
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "MatcherConfig: strategy={}, threshold={}, fast_n={}, max_features={}, ransac=[{:.1}px, {} iters, {:.3}], parallel={}",
            self.strategy,
            self.orb.threshold,
            self.orb.fast_n,
            self.orb.max_features,
            self.ransac.threshold,
            self.ransac.max_iterations,
            self.ransac.confidence,
            self.parallel
        )
    }

    /// Load configuration from a `.json` or `.toml` file, by extension
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::load_json(path),
            _ => Self::load_toml(path),
        }
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
