use scene_core::DescriptorSet;

use crate::error::SourceError;
use crate::extractor::FeatureExtractor;
use crate::source::ImageSource;

/// One training image
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    pub name: String,
    pub features: DescriptorSet,
}

/// Features of every training image, in scan order. Immutable once
/// installed; the matcher stamps the generation when it swaps the index in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceIndex {
    entries: Vec<ReferenceEntry>,
    generation: u64,
}

impl ReferenceIndex {
    /// Extract features for every image of `source`.
    ///
    /// An image that fails to load aborts the build. An image without
    /// usable features is logged and left out. The result has generation 0.
    pub fn build<S: ImageSource + ?Sized>(source: &S, extractor: &dyn FeatureExtractor) -> Result<Self, SourceError> {
        let mut entries = Vec::with_capacity(source.len());

        for item in source.scan() {
            let (name, image) = item?;
            match extractor.extract(&image) {
                Ok(features) => {
                    log::debug!("{}: {} features", name, features.len());
                    entries.push(ReferenceEntry { name, features });
                }
                Err(e) => log::warn!("Skipping {}: {}", name, e),
            }
        }

        log::info!("Indexed {} of {} images", entries.len(), source.len());

        Ok(Self { entries, generation: 0 })
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn from_entries(entries: Vec<ReferenceEntry>, generation: u64) -> Self {
        Self { entries, generation }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ReferenceEntry> {
        self.entries.get(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
