//! Image collaborator: path resolution, decoding and colour keys.

use macroquad::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supplies decoded pixel buffers to the loader.
pub trait ImageLoader {
    /// `true` if `path` names an image this loader can open.
    fn exists(&self, path: &Path) -> bool;

    /// Decode the image at `path` into RGBA8.
    fn load(&mut self, path: &Path) -> Result<Image, String>;
}

/// Reads images from disk and decodes them with macroquad.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn load(&mut self, path: &Path) -> Result<Image, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        Image::from_file_with_format(&bytes, None).map_err(|e| format!("{e:?}"))
    }
}

/// In-memory images keyed by path; for tests and embedded assets.
#[derive(Default, Clone)]
pub struct MemoryImageLoader {
    images: HashMap<PathBuf, Image>,
}

impl MemoryImageLoader {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `image` under `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, image: Image) {
        self.images.insert(path.into(), image);
    }
}

impl ImageLoader for MemoryImageLoader {
    fn exists(&self, path: &Path) -> bool {
        self.images.contains_key(path)
    }

    fn load(&mut self, path: &Path) -> Result<Image, String> {
        self.images
            .get(path)
            .cloned()
            .ok_or_else(|| format!("no image registered for {}", path.display()))
    }
}

/// Turn a document image reference into a path the loader can open: the
/// literal path first, then the path joined to the map directory.
pub fn resolve_image_path(
    reference: &str,
    map_dir: &Path,
    loader: &dyn ImageLoader,
) -> Option<PathBuf> {
    let literal = PathBuf::from(reference);
    if loader.exists(&literal) {
        return Some(literal);
    }
    let joined = map_dir.join(reference);
    if loader.exists(&joined) {
        return Some(joined);
    }
    None
}

/// Decode-once cache in front of an [`ImageLoader`].
pub struct ImageCache<'l> {
    loader: &'l mut dyn ImageLoader,
    decoded: HashMap<PathBuf, Arc<Image>>,
}

impl<'l> ImageCache<'l> {
    /// Empty cache over `loader`.
    pub fn new(loader: &'l mut dyn ImageLoader) -> Self {
        Self {
            loader,
            decoded: HashMap::new(),
        }
    }

    /// See [`resolve_image_path`].
    pub fn resolve(&self, reference: &str, map_dir: &Path) -> Option<PathBuf> {
        resolve_image_path(reference, map_dir, &*self.loader)
    }

    /// Decoded image at `path`, loading it on first use.
    pub fn get(&mut self, path: &Path) -> Result<Arc<Image>, String> {
        if let Some(img) = self.decoded.get(path) {
            return Ok(Arc::clone(img));
        }
        let img = Arc::new(self.loader.load(path)?);
        self.decoded.insert(path.to_path_buf(), Arc::clone(&img));
        Ok(img)
    }
}

/// Rewrite every pixel whose RGB equals `key` to transparent white. Stored
/// alpha is ignored when matching. Returns the number of pixels changed.
pub fn apply_color_key(image: &mut Image, key: [u8; 3]) -> usize {
    let mut changed = 0;
    for px in image.bytes.chunks_exact_mut(4) {
        if px[..3] == key {
            px.copy_from_slice(&[255, 255, 255, 0]);
            changed += 1;
        }
    }
    changed
}

/// The part of an image an entity shows.
#[derive(Clone)]
pub struct TextureRegion {
    /// Resolved file path
    pub path: PathBuf,
    /// Source rectangle in pixels
    pub source: Rect,
    /// Pixels, when the loader already holds them (image layers, pixel hitboxes)
    pub image: Option<Arc<Image>>,
}

impl TextureRegion {
    /// Region without pixels.
    pub fn new(path: PathBuf, source: Rect) -> Self {
        Self {
            path,
            source,
            image: None,
        }
    }
}

impl fmt::Debug for TextureRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureRegion")
            .field("path", &self.path)
            .field("source", &self.source)
            .field("decoded", &self.image.is_some())
            .finish()
    }
}

impl PartialEq for TextureRegion {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.source == other.source
    }
}
