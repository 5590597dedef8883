#![warn(missing_docs)]

//! Tiled JSON map loader for Macroquad.
//!
//! A map is decoded into a [`SourceDocument`], then every layer is turned
//! into positioned, hit-boxed [`RenderableEntity`] values grouped in named
//! [`SpriteList`]s, plus plain [`TiledObjectRecord`]s for non-tile shapes.
//!
//! ```no_run
//! use macroquad_tiled_scene::{load_tilemap, MapConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let map = load_tilemap("assets/level.json", &MapConfig::with_scaling(2.0))?;
//! for (name, list) in map.sprite_lists.iter() {
//!     println!("{name}: {} entities", list.len());
//! }
//! # Ok(())
//! # }
//! ```

/// Load options and per-layer overrides
pub mod config;
/// Parsed map document
pub mod document;
mod error;
/// Shape reconstruction
pub mod geometry;
/// Pixel-derived hitboxes
pub mod hitbox;
/// Image loading collaborator
pub mod image;
/// Layer builders
pub mod layer;
/// Source format decoders
pub mod loader {
    /// Tiled JSON
    pub mod json_loader;
}
mod map;
mod scene;
/// Chunked spatial hash
pub mod spatial;
/// Entities and the tile → entity builder
pub mod sprite;
mod sprite_list;
/// Global tile ids and tileset lookup
pub mod tileset;

pub use config::{HitBoxAlgorithm, LayerOverrides, LoadOptions, MapConfig};
pub use document::{Properties, PropertyValue, SourceDocument};
pub use error::{Diagnostics, LoadWarning, MapError};
pub use image::{FsImageLoader, ImageLoader, MemoryImageLoader};
pub use layer::{RecordShape, TiledObjectRecord};
pub use map::{load_tilemap, LayerMap, LoadedMap};
pub use scene::Scene;
pub use sprite::{Keyframe, MotionHints, RenderableEntity};
pub use sprite_list::SpriteList;
pub use tileset::{Orientation, TileId};
