use crate::config::MapConfig;
use crate::document::{Properties, SourceDocument};
use crate::error::{LoadWarning, MapError};
use crate::image::{FsImageLoader, ImageCache, ImageLoader};
use crate::layer::{process_layer, LayerOutput, LoadContext, TiledObjectRecord};
use crate::loader::json_loader::decode_map_file;
use crate::sprite_list::SpriteList;
use anyhow::Context;
use macroquad::prelude::*;
use std::path::Path;

/// Insertion-ordered name → value map.
#[derive(Debug, Clone)]
pub struct LayerMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for LayerMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> LayerMap<T> {
    /// Value for `name`.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// `true` if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, name: String, value: T) {
        self.entries.push((name, value));
    }
}

impl<T> IntoIterator for LayerMap<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// The result of a successful load.
#[derive(Debug)]
pub struct LoadedMap {
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Tile width in source pixels
    pub tile_width: u32,
    /// Tile height in source pixels
    pub tile_height: u32,
    /// Global scale the map was loaded with
    pub scaling: f32,
    /// Map background
    pub background_color: Option<Color>,
    /// Map properties
    pub properties: Properties,
    /// Entity layers in draw order
    pub sprite_lists: LayerMap<SpriteList>,
    /// Object record layers in document order
    pub object_lists: LayerMap<Vec<TiledObjectRecord>>,
    warnings: Vec<LoadWarning>,
}

impl LoadedMap {
    /// Build every layer of `doc`. Fails without partial output on the first
    /// fatal error; recoverable problems end up in [`LoadedMap::warnings`].
    pub fn from_document(
        doc: &SourceDocument,
        config: &MapConfig,
        loader: &mut dyn ImageLoader,
    ) -> Result<Self, MapError> {
        let mut ctx = LoadContext::new(doc, ImageCache::new(loader));
        let mut sprite_lists = LayerMap::default();
        let mut object_lists = LayerMap::default();

        let mut sink = |name: &str, out: LayerOutput| -> Result<(), MapError> {
            if let Some(list) = out.sprites {
                sprite_lists.push(name.to_owned(), list);
            }
            if let Some(records) = out.objects {
                object_lists.push(name.to_owned(), records);
            }
            Ok(())
        };
        for layer in &doc.layers {
            process_layer(&mut ctx, layer, config, 0, &mut sink)?;
        }

        let warnings = ctx.diagnostics.into_warnings();
        log::info!(
            "loaded map {}x{}: {} sprite lists, {} object lists, {} warnings",
            doc.width,
            doc.height,
            sprite_lists.len(),
            object_lists.len(),
            warnings.len()
        );

        Ok(Self {
            width: doc.width,
            height: doc.height,
            tile_width: doc.tile_width,
            tile_height: doc.tile_height,
            scaling: config.defaults.scaling,
            background_color: doc.background_color,
            properties: doc.properties.clone(),
            sprite_lists,
            object_lists,
            warnings,
        })
    }

    /// Decode a Tiled JSON file and load it, reading images from disk.
    pub fn load(path: impl AsRef<Path>, config: &MapConfig) -> Result<Self, MapError> {
        let doc = decode_map_file(path.as_ref())?;
        Self::from_document(&doc, config, &mut FsImageLoader)
    }

    /// Entities of a layer.
    pub fn sprite_list(&self, name: &str) -> Result<&SpriteList, MapError> {
        self.sprite_lists
            .get(name)
            .ok_or_else(|| MapError::LayerNotFound(name.to_owned()))
    }

    /// Object records of a layer.
    pub fn object_list(&self, name: &str) -> Result<&[TiledObjectRecord], MapError> {
        self.object_lists
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| MapError::LayerNotFound(name.to_owned()))
    }

    /// Recoverable problems met while loading.
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Pixel coordinates to tile grid coordinates, always rounding down.
    ///
    /// With 128x128 tiles at scale 1, `(500, 250)` gives `(3, 1)`.
    pub fn get_cartesian(&self, x: f32, y: f32) -> (i32, i32) {
        let tw = self.tile_width as f32 * self.scaling;
        let th = self.tile_height as f32 * self.scaling;
        ((x / tw).floor() as i32, (y / th).floor() as i32)
    }

    /// Map size in output pixels.
    pub fn pixel_size(&self) -> Vec2 {
        vec2(
            self.width as f32 * self.tile_width as f32,
            self.height as f32 * self.tile_height as f32,
        ) * self.scaling
    }
}

/// Load a map file with context attached to any failure.
pub fn load_tilemap(path: impl AsRef<Path>, config: &MapConfig) -> anyhow::Result<LoadedMap> {
    let path = path.as_ref();
    let map = LoadedMap::load(path, config)
        .with_context(|| format!("Loading tile map {}", path.display()))?;
    Ok(map)
}
