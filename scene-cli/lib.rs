use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use scene_match::scene_core::init_thread_pool;
use scene_match::{ImageMatcher, LogObserver, MatchError, MatchReport, MatcherConfig, VerificationStrategy};

#[derive(Debug)]
pub enum CliError {
    Match(MatchError),
    Config(Box<dyn std::error::Error>),
    ThreadPool(scene_match::scene_core::ThreadPoolBuildError),
    Io(std::io::Error),
    /// Some queries of a directory run failed
    QueriesFailed(usize),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Match(e) => write!(f, "{}", e),
            CliError::Config(e) => write!(f, "Cannot load configuration: {}", e),
            CliError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::QueriesFailed(n) => write!(f, "{} queries failed", n),
        }
    }
}

impl std::error::Error for CliError {}

impl From<MatchError> for CliError {
    fn from(err: MatchError) -> Self {
        CliError::Match(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<scene_match::scene_core::ThreadPoolBuildError> for CliError {
    fn from(err: scene_match::scene_core::ThreadPoolBuildError) -> Self {
        CliError::ThreadPool(err)
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Find which training image shows the same scene as each query
#[derive(Debug, Parser)]
#[command(name = "scene-match")]
#[command(version)]
pub struct Cli {
    /// Directory of reference images (.tiff, .jpg, .JPG)
    pub training_dir: PathBuf,

    /// Query image, or a directory of query images
    pub query: PathBuf,

    /// Matcher configuration (.toml or .json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// FAST intensity threshold
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Maximum features kept per image
    #[arg(long)]
    pub max_features: Option<usize>,

    /// nearest-neighbor, cross-check or cross-check-homography
    #[arg(long)]
    pub strategy: Option<VerificationStrategy>,

    /// RANSAC inlier threshold in pixels
    #[arg(long)]
    pub ransac_threshold: Option<f64>,

    /// Worker threads
    #[arg(long)]
    pub threads: Option<usize>,

    /// Compare reference entries one at a time
    #[arg(long)]
    pub serial: bool,
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn matcher_config(&self) -> CliResult<MatcherConfig> {
        let mut config = match &self.config {
            Some(path) => MatcherConfig::load(path).map_err(CliError::Config)?,
            None => MatcherConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            config.orb.threshold = threshold;
        }
        if let Some(max_features) = self.max_features {
            config.orb.max_features = max_features;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(pixels) = self.ransac_threshold {
            config.ransac.threshold = pixels;
        }
        if let Some(threads) = self.threads {
            config.orb.n_threads = threads;
        }
        if self.serial {
            config.parallel = false;
        }
        Ok(config)
    }
}

fn write_report<W: Write>(out: &mut W, query: &str, report: &MatchReport) -> std::io::Result<()> {
    writeln!(
        out,
        "{} -> {} (support {:.2}, confidence {:.2})",
        query, report.name, report.support, report.confidence
    )
}

/// Train on `training_dir`, then match the query file or every image of
/// the query directory
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> CliResult<()> {
    let config = cli.matcher_config()?;
    log::info!("{}", config.summary());
    if let Err(e) = init_thread_pool(config.orb.n_threads) {
        // the global pool can only be configured once per process
        log::warn!("Keeping existing thread pool: {}", e);
    }

    let matcher = ImageMatcher::builder()
        .config(config)
        .observer(Box::new(LogObserver))
        .build()?;
    let indexed = matcher.train(&cli.training_dir)?;
    log::info!("Trained on {} images", indexed);

    if !cli.query.is_dir() {
        let report = matcher.find_best_match(&cli.query)?;
        write_report(out, &cli.query.display().to_string(), &report)?;
        return Ok(());
    }

    let mut failed = 0;
    for (name, result) in matcher.find_best_matches(&cli.query)? {
        match result {
            Ok(report) => write_report(out, &name, &report)?,
            Err(e) => {
                log::error!("{}: {}", name, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::QueriesFailed(failed));
    }
    Ok(())
}
