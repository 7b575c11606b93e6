//! Image sources for training and querying.
//!
//! A source exposes its image names in scan order and loads images on
//! demand, so a training pass never holds more than one decoded image.
//! Scanning is a plain iterator: `None` means the listing is exhausted,
//! `Some(Err(_))` is a real read failure.

use std::path::{Path, PathBuf};

use scene_core::Image;

use crate::error::SourceError;

/// File extensions accepted by a directory scan (case-sensitive)
pub const IMAGE_EXTENSIONS: [&str; 3] = ["tiff", "jpg", "JPG"];

pub trait ImageSource {
    /// Image names in scan order
    fn names(&self) -> &[String];

    fn load(&self, name: &str) -> Result<Image, SourceError>;

    fn len(&self) -> usize {
        self.names().len()
    }

    fn is_empty(&self) -> bool {
        self.names().is_empty()
    }

    /// Lazily load every image in scan order
    fn scan(&self) -> ImageScan<'_, Self> {
        ImageScan { source: self, next: 0 }
    }
}

/// Iterator over the images of a source, loading each on demand
pub struct ImageScan<'a, S: ?Sized> {
    source: &'a S,
    next: usize,
}

impl<'a, S: ImageSource + ?Sized> Iterator for ImageScan<'a, S> {
    type Item = Result<(String, Image), SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.source.names().get(self.next)?.clone();
        self.next += 1;

        log::debug!("Loading image {}", name);
        Some(self.source.load(&name).map(|image| (name, image)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.source.names().len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

/// Load a single image from disk as 8-bit grayscale
pub fn load_image(path: &Path) -> Result<Image, SourceError> {
    if !path.is_file() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    let unreadable = |reason: String| {
        log::error!("Could not open image {}", path.display());
        SourceError::Unreadable {
            path: path.to_path_buf(),
            reason,
        }
    };

    let image = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| unreadable(e.to_string()))?
        .decode()
        .map_err(|e| unreadable(e.to_string()))?;

    Ok(image.into_luma8())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext))
}

/// Images of one directory, sorted lexically by file name
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    names: Vec<String>,
}

impl DirectorySource {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(SourceError::NotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(SourceError::NotADirectory(dir.to_path_buf()));
        }

        let unreadable = |e: std::io::Error| SourceError::Unreadable {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };

        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if !path.is_file() || !has_image_extension(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();

        log::info!("Set image directory to: {}", dir.display());
        log::info!("Number of images in the directory: {}", names.len());

        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Load the image at `index` in scan order
    pub fn load_at(&self, index: usize) -> Option<Result<Image, SourceError>> {
        self.names.get(index).map(|name| self.load(name))
    }

    /// Load every image, logging and skipping the unreadable ones
    pub fn load_all(&self) -> Vec<(String, Image)> {
        log::info!("Loading all image files...");
        self.scan()
            .filter_map(Result::ok)
            .collect()
    }
}

impl ImageSource for DirectorySource {
    fn names(&self) -> &[String] {
        &self.names
    }

    fn load(&self, name: &str) -> Result<Image, SourceError> {
        load_image(&self.path_of(name))
    }
}

/// In-memory images, kept in lexical name order
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    names: Vec<String>,
    images: Vec<Option<Image>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, name: &str, image: Image) -> Self {
        self.insert(name, Some(image));
        self
    }

    /// Register a name whose load always fails
    pub fn with_unreadable(mut self, name: &str) -> Self {
        self.insert(name, None);
        self
    }

    fn insert(&mut self, name: &str, image: Option<Image>) {
        match self.names.binary_search_by(|n| n.as_str().cmp(name)) {
            Ok(pos) => self.images[pos] = image,
            Err(pos) => {
                self.names.insert(pos, name.to_string());
                self.images.insert(pos, image);
            }
        }
    }
}

impl ImageSource for MemorySource {
    fn names(&self) -> &[String] {
        &self.names
    }

    fn load(&self, name: &str) -> Result<Image, SourceError> {
        let pos = self
            .names
            .binary_search_by(|n| n.as_str().cmp(name))
            .map_err(|_| SourceError::NotFound(PathBuf::from(name)))?;

        self.images[pos].clone().ok_or_else(|| SourceError::Unreadable {
            path: PathBuf::from(name),
            reason: "unreadable in-memory image".to_string(),
        })
    }
}
