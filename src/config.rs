//! Load options and per-layer overrides.

use serde::Deserialize;
use std::collections::HashMap;

/// How hitboxes are derived for tiles without authored collision shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum HitBoxAlgorithm {
    /// Full image rectangle, pixels are never inspected
    None,
    /// Tight box around non-transparent pixels
    #[default]
    Simple,
    /// Simplified convex outline of non-transparent pixels
    Detailed,
}

/// Options applied to every layer unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Uniform scale applied to positions and sizes
    pub scaling: f32,
    /// Build a spatial hash for each sprite list
    pub use_spatial_hash: bool,
    /// Hitbox strategy
    pub hit_box_algorithm: HitBoxAlgorithm,
    /// Outline tolerance in pixels for [`HitBoxAlgorithm::Detailed`]
    pub hit_box_detail: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            scaling: 1.0,
            use_spatial_hash: false,
            hit_box_algorithm: HitBoxAlgorithm::Simple,
            hit_box_detail: 4.5,
        }
    }
}

/// Per-layer replacements. Unset fields inherit the global value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayerOverrides {
    /// Replaces [`LoadOptions::scaling`]
    pub scaling: Option<f32>,
    /// Replaces [`LoadOptions::use_spatial_hash`]
    pub use_spatial_hash: Option<bool>,
    /// Replaces [`LoadOptions::hit_box_algorithm`]
    pub hit_box_algorithm: Option<HitBoxAlgorithm>,
    /// Replaces [`LoadOptions::hit_box_detail`]
    pub hit_box_detail: Option<f32>,
}

impl LoadOptions {
    /// These options with every set override applied.
    pub fn with_overrides(&self, o: &LayerOverrides) -> LoadOptions {
        LoadOptions {
            scaling: o.scaling.unwrap_or(self.scaling),
            use_spatial_hash: o.use_spatial_hash.unwrap_or(self.use_spatial_hash),
            hit_box_algorithm: o.hit_box_algorithm.unwrap_or(self.hit_box_algorithm),
            hit_box_detail: o.hit_box_detail.unwrap_or(self.hit_box_detail),
        }
    }
}

/// Everything the assembler is configured with.
///
/// ```json
/// { "scaling": 2.0, "layer_options": { "Platforms": { "use_spatial_hash": true } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MapConfig {
    /// Global defaults
    #[serde(flatten)]
    pub defaults: LoadOptions,
    /// Overrides keyed by layer name
    #[serde(default)]
    pub layer_options: HashMap<String, LayerOverrides>,
}

impl MapConfig {
    /// Defaults with the given global scale.
    pub fn with_scaling(scaling: f32) -> Self {
        Self {
            defaults: LoadOptions {
                scaling,
                ..LoadOptions::default()
            },
            layer_options: HashMap::new(),
        }
    }

    /// Parse a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Add or replace the overrides for one layer.
    pub fn layer(mut self, name: impl Into<String>, overrides: LayerOverrides) -> Self {
        self.layer_options.insert(name.into(), overrides);
        self
    }

    /// Effective options for the layer called `name`.
    pub fn options_for(&self, name: &str) -> LoadOptions {
        match self.layer_options.get(name) {
            Some(o) => self.defaults.with_overrides(o),
            None => self.defaults,
        }
    }
}
