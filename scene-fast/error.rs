#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastError {
    InvalidThreshold(u8),
    InvalidArcLength(u8),
    InvalidPatchSize { patch_size: usize },
    ImageTooSmall { width: usize, height: usize, min_size: usize },
}

impl std::fmt::Display for FastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FastError::InvalidThreshold(t) => {
                write!(f, "Invalid threshold: {} (must be 1-127)", t)
            }
            FastError::InvalidArcLength(n) => {
                write!(f, "Invalid FAST arc length: {} (must be 9-16)", n)
            }
            FastError::InvalidPatchSize { patch_size } => {
                write!(f, "Invalid patch size {} (must be odd and at least 7)", patch_size)
            }
            FastError::ImageTooSmall { width, height, min_size } => {
                write!(f, "Image {}x{} too small (minimum {}x{})", width, height, min_size, min_size)
            }
        }
    }
}

impl std::error::Error for FastError {}

pub type FastResult<T> = Result<T, FastError>;
