use std::fmt;
use std::io;
use std::path::PathBuf;

/// Fatal errors. Any of these aborts the whole load and no map is returned.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// File I/O error while reading a map or tileset
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// JSON parse error
    #[error("JSON parse error in {path}: {source}")]
    Json {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// Structurally invalid map (wrong format, bad encoding, bad colour, ...)
    #[error("invalid map: {0}")]
    InvalidMap(String),
    /// A property declared a type this crate does not understand
    #[error("unsupported type '{kind}' for property '{name}'")]
    UnsupportedPropertyType {
        /// Property name
        name: String,
        /// Declared type
        kind: String,
    },
    /// A tile layer's data length does not match width * height
    #[error("layer '{layer}' has {actual} cells, expected {expected}")]
    InvalidLayerSize {
        /// Layer name
        layer: String,
        /// width * height
        expected: usize,
        /// data.len()
        actual: usize,
    },
    /// Two layers share a name
    #[error("duplicate layer name '{0}'; layer names must be unique across the map")]
    DuplicateLayer(String),
    /// A populated grid cell references a gid no tileset owns
    #[error("no tile for gid {gid} in layer '{layer}' at ({column}, {row})")]
    TileNotFound {
        /// Layer name
        layer: String,
        /// Gid with flags stripped
        gid: u32,
        /// Grid column
        column: usize,
        /// Grid row, counted from the top as stored
        row: usize,
    },
    /// A tile object references a gid no tileset owns
    #[error("no tile for gid {gid} on object {object_id} in layer '{layer}'")]
    ObjectTileNotFound {
        /// Layer name
        layer: String,
        /// Object id from the document
        object_id: u32,
        /// Gid with flags stripped
        gid: u32,
    },
    /// A motion hint property is not a number
    #[error("property '{key}' in layer '{layer}' must be numeric, got '{value}'")]
    InvalidMotionHint {
        /// Layer name
        layer: String,
        /// Property key
        key: String,
        /// Offending value as text
        value: String,
    },
    /// Groups nested deeper than the loader accepts
    #[error("layer '{layer}' is nested {depth} groups deep")]
    GroupTooDeep {
        /// Layer name
        layer: String,
        /// Depth reached
        depth: usize,
    },
    /// Lookup of a layer that was never loaded
    #[error("layer '{0}' not found")]
    LayerNotFound(String),
}

/// A recoverable problem met while loading. The load carries on without the
/// affected feature.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadWarning {
    /// Layer being processed, empty for map-wide issues
    pub layer: String,
    /// Item index inside the layer (cell or object), if any
    pub index: Option<usize>,
    /// Human readable description
    pub message: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "[{}#{}] {}", self.layer, i, self.message),
            None => write!(f, "[{}] {}", self.layer, self.message),
        }
    }
}

/// Collects warnings for one load and mirrors them to the `log` facade.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<LoadWarning>,
}

impl Diagnostics {
    /// No warnings yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, layer: &str, index: Option<usize>, message: impl Into<String>) {
        let w = LoadWarning {
            layer: layer.to_owned(),
            index,
            message: message.into(),
        };
        log::warn!("{w}");
        self.warnings.push(w);
    }

    /// Warnings so far.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// `true` while nothing went wrong.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Everything recorded, in order.
    pub fn into_warnings(self) -> Vec<LoadWarning> {
        self.warnings
    }
}
