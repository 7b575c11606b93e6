//! Query orchestration: one extraction per query, one verification per
//! reference entry, then a single-pass ranking.
//!
//! The reference index lives behind `RwLock<Option<Arc<_>>>`. Training
//! builds a complete index before taking the write lock, so a query sees
//! either the old index or the new one, never a mix. A running query holds
//! its own `Arc` snapshot and is unaffected by a concurrent retrain.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;
use scene_core::{DescriptorSet, Image};

use crate::cancel::CancellationToken;
use crate::config::{ConfigError, MatcherConfig, VerificationStrategy};
use crate::error::{MatchError, MatchResult};
use crate::extractor::{FeatureExtractor, OrbExtractor};
use crate::homography::HomographyEstimator;
use crate::index::{ReferenceEntry, ReferenceIndex};
use crate::matching::CorrespondenceFinder;
use crate::observer::{MatchObserver, NoopObserver};
use crate::ranking::rank;
use crate::source::{load_image, DirectorySource, ImageSource};
use crate::verify::GeometricVerifier;

/// Outcome of one query
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    /// Name of the best reference entry
    pub name: String,
    /// Position of the best entry in the index
    pub index: usize,
    pub support: f32,
    pub second_support: f32,
    /// `second_support - support`; larger is more decisive
    pub confidence: f32,
    /// Support of every entry, in index order
    pub scores: Vec<f32>,
    /// Generation of the index the query ran against
    pub generation: u64,
}

pub struct ImageMatcher {
    config: MatcherConfig,
    extractor: Box<dyn FeatureExtractor>,
    verifier: GeometricVerifier,
    observer: Box<dyn MatchObserver>,
    pool: Option<rayon::ThreadPool>,
    index: RwLock<Option<Arc<ReferenceIndex>>>,
    generation: AtomicU64,
}

impl ImageMatcher {
    /// Matcher with the ORB extractor and no observer
    pub fn new(config: MatcherConfig) -> MatchResult<Self> {
        MatcherBuilder::new().config(config).build()
    }

    pub fn builder() -> MatcherBuilder {
        MatcherBuilder::new()
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Replace the index with the images of `dir`. Returns the number of
    /// indexed entries.
    pub fn train<P: AsRef<Path>>(&self, dir: P) -> MatchResult<usize> {
        let source = DirectorySource::open(dir).map_err(MatchError::Configuration)?;
        self.train_from(&source)
    }

    /// Replace the index with the images of `source`. On failure the
    /// previous index stays in place.
    pub fn train_from<S: ImageSource + Sync + ?Sized>(&self, source: &S) -> MatchResult<usize> {
        let index = self.install(|| ReferenceIndex::build(source, self.extractor.as_ref()))?;
        let len = index.len();

        // numbered under the lock so generations follow install order
        let mut slot = self.index.write().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *slot = Some(Arc::new(index.with_generation(generation)));
        log::info!("Installed index generation {} ({} entries)", generation, len);
        Ok(len)
    }

    pub fn is_trained(&self) -> bool {
        self.index().is_some()
    }

    /// Snapshot of the current index
    pub fn index(&self) -> Option<Arc<ReferenceIndex>> {
        self.index.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn trained_index(&self) -> MatchResult<Arc<ReferenceIndex>> {
        self.index()
            .filter(|index| !index.is_empty())
            .ok_or(MatchError::EmptyIndex)
    }

    pub fn find_best_match<P: AsRef<Path>>(&self, query: P) -> MatchResult<MatchReport> {
        self.find_best_match_with_cancel(query, &CancellationToken::new())
    }

    pub fn find_best_match_with_cancel<P: AsRef<Path>>(
        &self,
        query: P,
        cancel: &CancellationToken,
    ) -> MatchResult<MatchReport> {
        let index = self.trained_index()?;
        let image = load_image(query.as_ref())?;
        log::debug!("Query {}", query.as_ref().display());
        self.query_image(&index, &image, cancel)
    }

    pub fn find_best_match_image(&self, image: &Image) -> MatchResult<MatchReport> {
        let index = self.trained_index()?;
        self.query_image(&index, image, &CancellationToken::new())
    }

    /// Rank the index against already extracted query features
    pub fn match_features(&self, query: &DescriptorSet, cancel: &CancellationToken) -> MatchResult<MatchReport> {
        let index = self.trained_index()?;
        self.rank_against(&index, query, cancel)
    }

    /// Match every image of a query directory, in lexical order. Per-query
    /// failures are reported alongside the name; only an untrained matcher
    /// or an unusable directory fails the whole call.
    pub fn find_best_matches<P: AsRef<Path>>(&self, dir: P) -> MatchResult<Vec<(String, MatchResult<MatchReport>)>> {
        let index = self.trained_index()?;
        let source = DirectorySource::open(dir)?;
        let cancel = CancellationToken::new();

        Ok(source
            .names()
            .iter()
            .map(|name| {
                let report = source
                    .load(name)
                    .map_err(MatchError::from)
                    .and_then(|image| self.query_image(&index, &image, &cancel));
                (name.clone(), report)
            })
            .collect())
    }

    fn query_image(
        &self,
        index: &ReferenceIndex,
        image: &Image,
        cancel: &CancellationToken,
    ) -> MatchResult<MatchReport> {
        if cancel.is_cancelled() {
            return Err(MatchError::Cancelled);
        }
        let query = self.install(|| self.extractor.extract(image))?;
        log::debug!("Query has {} features", query.len());
        self.rank_against(index, &query, cancel)
    }

    fn rank_against(
        &self,
        index: &ReferenceIndex,
        query: &DescriptorSet,
        cancel: &CancellationToken,
    ) -> MatchResult<MatchReport> {
        let scores = self.score_entries(index, query, cancel)?;
        let ranking = rank(&scores, self.config.failure_score).ok_or(MatchError::EmptyIndex)?;
        let best = index.get(ranking.best).ok_or(MatchError::EmptyIndex)?;

        let report = MatchReport {
            name: best.name.clone(),
            index: ranking.best,
            support: ranking.best_score,
            second_support: ranking.second_score,
            confidence: ranking.confidence,
            scores,
            generation: index.generation(),
        };
        self.observer.on_ranked(&report);
        Ok(report)
    }

    /// Support of every entry, in index order regardless of scheduling
    fn score_entries(
        &self,
        index: &ReferenceIndex,
        query: &DescriptorSet,
        cancel: &CancellationToken,
    ) -> MatchResult<Vec<f32>> {
        let verify_one = |(i, entry): (usize, &ReferenceEntry)| -> MatchResult<f32> {
            if cancel.is_cancelled() {
                return Err(MatchError::Cancelled);
            }
            let result = self.verifier.verify(query, &entry.features);
            self.observer.on_verified(i, entry, &result);
            Ok(result.support)
        };

        if self.config.parallel {
            self.install(|| index.entries().par_iter().enumerate().map(&verify_one).collect())
        } else {
            index.entries().iter().enumerate().map(&verify_one).collect()
        }
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// Fluent construction of an [`ImageMatcher`]
pub struct MatcherBuilder {
    config: MatcherConfig,
    threads: Option<usize>,
    observer: Option<Box<dyn MatchObserver>>,
    extractor: Option<Box<dyn FeatureExtractor>>,
    finder: Option<Box<dyn CorrespondenceFinder>>,
    estimator: Option<Box<dyn HomographyEstimator>>,
}

impl Default for MatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: MatcherConfig::default(),
            threads: None,
            observer: None,
            extractor: None,
            finder: None,
            estimator: None,
        }
    }

    pub fn config(mut self, config: MatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// FAST intensity threshold
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.orb.threshold = threshold;
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.config.orb.max_features = max_features;
        self
    }

    pub fn strategy(mut self, strategy: VerificationStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn ransac_threshold(mut self, pixels: f64) -> Self {
        self.config.ransac.threshold = pixels;
        self
    }

    pub fn failure_score(mut self, score: f32) -> Self {
        self.config.failure_score = score;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Run on a dedicated pool of `n` threads instead of the global one
    pub fn threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }

    pub fn observer(mut self, observer: Box<dyn MatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn extractor(mut self, extractor: Box<dyn FeatureExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Replace the brute-force nearest-neighbour search
    pub fn finder(mut self, finder: Box<dyn CorrespondenceFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    /// Replace the RANSAC estimator built from `ransac` settings
    pub fn estimator(mut self, estimator: Box<dyn HomographyEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn build(self) -> MatchResult<ImageMatcher> {
        self.config.validate()?;

        let extractor = match self.extractor {
            Some(extractor) => extractor,
            None => Box::new(OrbExtractor::new(self.config.orb.clone()).map_err(ConfigError::from)?),
        };
        let pool = self
            .threads
            .map(|n| rayon::ThreadPoolBuilder::new().num_threads(n).build())
            .transpose()?;

        let mut verifier = GeometricVerifier::new(&self.config);
        if let Some(finder) = self.finder {
            verifier = verifier.with_finder(finder);
        }
        if let Some(estimator) = self.estimator {
            verifier = verifier.with_estimator(estimator);
        }

        log::debug!("{}", self.config.summary());

        Ok(ImageMatcher {
            verifier,
            config: self.config,
            extractor,
            observer: self.observer.unwrap_or_else(|| Box::new(NoopObserver)),
            pool,
            index: RwLock::new(None),
            generation: AtomicU64::new(0),
        })
    }
}
