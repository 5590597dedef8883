//! Canonical, format-agnostic map document.
//!
//! Everything the loader consumes lives here. Decoders (see
//! `loader::json_loader`) produce a [`SourceDocument`]; the assembler only
//! ever reads it.

use macroquad::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A single typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `bool` property
    Bool(bool),
    /// `int` / `object` property
    Int(i64),
    /// `float` property
    Float(f64),
    /// `string` / `file` / `color` / `class` property
    String(String),
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::String(v) => f.write_str(v),
        }
    }
}

/// Ordered string -> value map. Author-defined keys round-trip in the order
/// they were declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Copy every entry of `other` over this map.
    pub fn extend_from(&mut self, other: &Properties) {
        for (k, v) in other.iter() {
            self.insert(k, v.clone());
        }
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// `true` if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Typed accessor for `bool` values.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Typed accessor for integers.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer accessor that refuses values outside `i32`.
    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get_i64(key).and_then(|v| i32::try_from(v).ok())
    }

    /// Numeric accessor; integers widen.
    pub fn get_f32(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            PropertyValue::Float(v) => Some(*v as f32),
            PropertyValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Typed accessor for strings.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            PropertyValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

/// An image reference with its pixel size as declared by the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    /// Path as written in the document (literal or map-relative)
    pub path: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Geometry kind of a map object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// Axis-aligned rectangle spanning the object's width/height
    Rectangle,
    /// Ellipse inscribed in the object's width/height
    Ellipse,
    /// A single point
    Point,
    /// Closed polygon, points relative to the object origin
    Polygon(Vec<Vec2>),
    /// Open polyline, points relative to the object origin
    Polyline(Vec<Vec2>),
    /// Tile object; `gid` still carries orientation flags
    Tile {
        /// Raw gid
        gid: u32,
    },
    /// Text object (never turned into geometry)
    Text,
}

/// One object from an object layer or a tile's collision group.
#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    /// Document id
    pub id: u32,
    /// Object name
    pub name: String,
    /// `type` / `class` tag
    pub class_name: String,
    /// Origin x in source pixels (Y down)
    pub x: f32,
    /// Origin y in source pixels (Y down)
    pub y: f32,
    /// Width in source pixels
    pub width: f32,
    /// Height in source pixels
    pub height: f32,
    /// Clockwise rotation in degrees
    pub rotation: f32,
    /// Editor visibility
    pub visible: bool,
    /// Shape
    pub shape: ObjectShape,
    /// Custom properties
    pub properties: Properties,
}

impl MapObject {
    /// Bare rectangle object at `(x, y)`; handy for building documents by hand.
    pub fn new(id: u32, shape: ObjectShape, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id,
            name: String::new(),
            class_name: String::new(),
            x,
            y,
            width,
            height,
            rotation: 0.0,
            visible: true,
            shape,
            properties: Properties::new(),
        }
    }

    /// Origin as a vector.
    pub fn origin(&self) -> Vec2 {
        vec2(self.x, self.y)
    }

    /// `None` when the editor stored no extent (both sides zero).
    pub fn size(&self) -> Option<Vec2> {
        if self.width == 0.0 && self.height == 0.0 {
            None
        } else {
            Some(vec2(self.width, self.height))
        }
    }
}

/// One frame of a tile animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Local id, in the same tileset, of the tile shown
    pub tile_id: u32,
    /// Display time in milliseconds
    pub duration_ms: u32,
}

/// Per-tile data from a tileset. Shared by every cell referencing it and never
/// mutated after decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileDefinition {
    /// Local id
    pub id: u32,
    /// Own image (image-collection tilesets)
    pub image: Option<ImageRef>,
    /// Collision shapes in tile-local pixels, Y down
    pub hitboxes: Vec<MapObject>,
    /// Animation frames, in order
    pub animation: Vec<Frame>,
    /// Custom properties
    pub properties: Properties,
    /// `type` / `class` tag
    pub kind: Option<String>,
}

impl TileDefinition {
    /// A definition with nothing but its id; used for sheet tiles without an
    /// explicit entry.
    pub fn bare(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// A tileset. Sheet-backed when `image` is set, an image collection otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSet {
    /// Tileset name
    pub name: String,
    /// First global id owned by this set
    pub first_gid: u32,
    /// Number of tiles
    pub tile_count: u32,
    /// Sheet columns
    pub columns: u32,
    /// Grid cell width in pixels
    pub tile_width: u32,
    /// Grid cell height in pixels
    pub tile_height: u32,
    /// Pixels between sheet cells
    pub spacing: u32,
    /// Pixels around the sheet
    pub margin: u32,
    /// Shared sheet image
    pub image: Option<ImageRef>,
    /// Explicit tile entries keyed by local id
    pub tiles: BTreeMap<u32, TileDefinition>,
    /// Custom properties
    pub properties: Properties,
}

impl TileSet {
    /// Sheet-backed tileset with a regular grid and no explicit entries.
    pub fn sheet(
        name: impl Into<String>,
        first_gid: u32,
        image: ImageRef,
        tile_width: u32,
        tile_height: u32,
        tile_count: u32,
        columns: u32,
    ) -> Self {
        Self {
            name: name.into(),
            first_gid,
            tile_count,
            columns,
            tile_width,
            tile_height,
            spacing: 0,
            margin: 0,
            image: Some(image),
            tiles: BTreeMap::new(),
            properties: Properties::new(),
        }
    }

    /// `true` for sheet-backed sets.
    pub fn is_sheet(&self) -> bool {
        self.image.is_some()
    }

    /// Explicit entry for a local id.
    pub fn tile(&self, local_id: u32) -> Option<&TileDefinition> {
        self.tiles.get(&local_id)
    }

    /// Source rectangle of a local id on the sheet.
    pub fn sheet_rect(&self, local_id: u32) -> Rect {
        let cols = self.columns.max(1);
        let col = local_id % cols;
        let row = local_id / cols;
        let sx = self.margin as f32 + col as f32 * (self.tile_width as f32 + self.spacing as f32);
        let sy = self.margin as f32 + row as f32 * (self.tile_height as f32 + self.spacing as f32);
        Rect::new(
            sx,
            sy,
            self.tile_width as f32,
            self.tile_height as f32,
        )
    }
}

/// What a layer holds.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// Tile grid, `data` row-major from the top row
    Tiles {
        /// Columns
        width: usize,
        /// Rows
        height: usize,
        /// Raw gids, flags included
        data: Vec<u32>,
    },
    /// Object collection
    Objects {
        /// Objects in draw order
        objects: Vec<MapObject>,
    },
    /// A single static image
    Image {
        /// The image
        image: String,
        /// Colour key: RGB triple rewritten to transparent
        transparent_color: Option<[u8; 3]>,
    },
    /// Organisational group
    Group {
        /// Children in draw order
        layers: Vec<Layer>,
    },
}

/// One document layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Unique name
    pub name: String,
    /// Editor visibility
    pub visible: bool,
    /// 0.0 ..= 1.0
    pub opacity: f32,
    /// Pixel offset
    pub offset: Vec2,
    /// Optional tint
    pub tint_color: Option<Color>,
    /// Custom properties
    pub properties: Properties,
    /// Content
    pub kind: LayerKind,
}

impl Layer {
    /// Visible, opaque, untinted layer with no offset.
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            offset: Vec2::ZERO,
            tint_color: None,
            properties: Properties::new(),
            kind,
        }
    }
}

/// A parsed map, ready for the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Tile cell width in pixels
    pub tile_width: u32,
    /// Tile cell height in pixels
    pub tile_height: u32,
    /// Map background
    pub background_color: Option<Color>,
    /// Sorted by `first_gid`, ranges never overlap
    pub tilesets: Vec<TileSet>,
    /// Draw order: array order
    pub layers: Vec<Layer>,
    /// Map properties
    pub properties: Properties,
    /// Directory map-relative image paths are joined to
    pub base_dir: PathBuf,
}

impl SourceDocument {
    /// Empty document of the given dimensions.
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            width,
            height,
            tile_width,
            tile_height,
            background_color: None,
            tilesets: Vec::new(),
            layers: Vec::new(),
            properties: Properties::new(),
            base_dir: PathBuf::from("./"),
        }
    }

    /// Map size in source pixels.
    pub fn pixel_size(&self) -> Vec2 {
        vec2(
            self.width as f32 * self.tile_width as f32,
            self.height as f32 * self.tile_height as f32,
        )
    }

    /// Find a layer by slash separated path through groups, e.g.
    /// `"background/clouds"`. Leading and trailing slashes are ignored.
    pub fn find_layer(&self, path: &str) -> Option<&Layer> {
        let mut parts = path.trim_matches('/').split('/').peekable();
        let mut layers = &self.layers;
        while let Some(part) = parts.next() {
            let layer = layers.iter().find(|l| l.name == part)?;
            match (&layer.kind, parts.peek()) {
                (_, None) => return Some(layer),
                (LayerKind::Group { layers: children }, Some(_)) => layers = children,
                _ => return None,
            }
        }
        None
    }
}
