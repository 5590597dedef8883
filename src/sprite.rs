//! Renderable entities and the tile → entity builder.

use crate::config::{HitBoxAlgorithm, LoadOptions};
use crate::document::{ObjectShape, Properties, PropertyValue, TileDefinition, TileSet};
use crate::error::MapError;
use crate::geometry::{self, GeometryError};
use crate::hitbox;
use crate::image::TextureRegion;
use crate::layer::LoadContext;
use crate::tileset::{Orientation, ResolvedTile, TilesetRegistry};
use macroquad::prelude::*;
use std::path::PathBuf;

/// One animation frame, ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    /// Local id of the tile shown
    pub tile_id: u32,
    /// Display time in milliseconds
    pub duration_ms: u32,
    /// What to draw
    pub texture: TextureRegion,
}

/// Motion hints lifted from well-known properties.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionHints {
    /// `change_x`
    pub change_x: Option<f32>,
    /// `change_y`
    pub change_y: Option<f32>,
    /// `boundary_left`
    pub boundary_left: Option<f32>,
    /// `boundary_right`
    pub boundary_right: Option<f32>,
    /// `boundary_top`
    pub boundary_top: Option<f32>,
    /// `boundary_bottom`
    pub boundary_bottom: Option<f32>,
}

impl MotionHints {
    /// Parse the six motion keys out of `props`. Numbers and numeric strings
    /// are accepted; anything else fails the load.
    pub fn from_properties(props: &Properties, layer: &str) -> Result<Self, MapError> {
        let read = |key: &str| -> Result<Option<f32>, MapError> {
            let Some(value) = props.get(key) else {
                return Ok(None);
            };
            let parsed = match value {
                PropertyValue::Float(v) => Some(*v as f32),
                PropertyValue::Int(v) => Some(*v as f32),
                PropertyValue::String(s) => s.trim().parse::<f32>().ok(),
                PropertyValue::Bool(_) => None,
            };
            parsed.map(Some).ok_or_else(|| MapError::InvalidMotionHint {
                layer: layer.to_owned(),
                key: key.to_owned(),
                value: value.to_string(),
            })
        };
        Ok(Self {
            change_x: read("change_x")?,
            change_y: read("change_y")?,
            boundary_left: read("boundary_left")?,
            boundary_right: read("boundary_right")?,
            boundary_top: read("boundary_top")?,
            boundary_bottom: read("boundary_bottom")?,
        })
    }
}

/// A positioned, drawable thing produced by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableEntity {
    /// Centre, Y up
    pub position: Vec2,
    /// Drawn size (already scaled)
    pub size: Vec2,
    /// Scale applied on top of the natural size
    pub scale: f32,
    /// Counter-clockwise rotation in radians
    pub rotation: f32,
    /// Per-instance flips
    pub orientation: Orientation,
    /// Global id the entity came from, 0 for image layers
    pub gid: u32,
    /// Texture; `None` for collision-only entities
    pub texture: Option<TextureRegion>,
    /// Hitbox relative to the centre, Y up, scaled
    pub hitbox: Option<Vec<Vec2>>,
    /// Animation frames
    pub keyframes: Vec<Keyframe>,
    /// Copied properties plus `type` / `name`
    pub properties: Properties,
    /// Tint
    pub color: Color,
    /// 0 ..= 255
    pub alpha: u8,
    /// Velocity / boundary hints
    pub motion: MotionHints,
}

impl RenderableEntity {
    /// Untextured entity of `size` centred at `position`.
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            scale: 1.0,
            rotation: 0.0,
            orientation: Orientation::NONE,
            gid: 0,
            texture: None,
            hitbox: None,
            keyframes: Vec::new(),
            properties: Properties::new(),
            color: WHITE,
            alpha: 255,
            motion: MotionHints::default(),
        }
    }

    /// `true` when the entity has an animation.
    pub fn is_animated(&self) -> bool {
        !self.keyframes.is_empty()
    }

    /// Axis-aligned bounds of the rotated rectangle, as `(min, max)`.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        let half = self.size / 2.0;
        let (s, c) = self.rotation.sin_cos();
        let ext = vec2(
            (half.x * c).abs() + (half.y * s).abs(),
            (half.x * s).abs() + (half.y * c).abs(),
        );
        (self.position - ext, self.position + ext)
    }

    /// Hitbox in world space: rotated about and translated by the centre.
    pub fn world_hitbox(&self) -> Option<Vec<Vec2>> {
        let rot = Vec2::from_angle(self.rotation);
        self.hitbox
            .as_ref()
            .map(|pts| pts.iter().map(|p| self.position + rot.rotate(*p)).collect())
    }

    /// Replace the drawn size, stretching the hitbox with it.
    pub fn resize(&mut self, size: Vec2) {
        if let Some(points) = self.hitbox.as_mut() {
            let ratio = vec2(
                if self.size.x != 0.0 { size.x / self.size.x } else { 1.0 },
                if self.size.y != 0.0 { size.y / self.size.y } else { 1.0 },
            );
            for p in points.iter_mut() {
                *p *= ratio;
            }
        }
        self.size = size;
    }

    /// Apply a layer's tint and opacity.
    pub fn apply_style(&mut self, style: &LayerStyle) {
        if let Some(tint) = style.tint {
            self.color = tint;
        }
        self.alpha = (style.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

/// Visual settings a layer pushes onto every entity it builds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    /// Tint colour
    pub tint: Option<Color>,
    /// 0.0 ..= 1.0
    pub opacity: f32,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            tint: None,
            opacity: 1.0,
        }
    }
}

/// Where a tile is being built; used to label diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct Site<'a> {
    /// Layer name
    pub layer: &'a str,
    /// Cell or object index within the layer
    pub index: usize,
}

/// Image reference and source rectangle for a tile: its own image first,
/// then the sheet.
fn image_source(tileset: &TileSet, tile: &TileDefinition) -> (Option<String>, Rect) {
    if let Some(img) = &tile.image {
        let rect = Rect::new(0.0, 0.0, img.width as f32, img.height as f32);
        return (Some(img.path.clone()), rect);
    }
    let rect = tileset.sheet_rect(tile.id);
    (tileset.image.as_ref().map(|i| i.path.clone()), rect)
}

/// Resolve a tile's texture, reporting missing sources. The rectangle is
/// returned even when the image is not, so geometry survives.
fn tile_texture(
    ctx: &mut LoadContext<'_, '_>,
    tileset: &TileSet,
    tile: &TileDefinition,
    site: Site<'_>,
) -> (Option<PathBuf>, Rect) {
    let (reference, rect) = image_source(tileset, tile);
    let Some(reference) = reference else {
        ctx.diagnostics.warn(
            site.layer,
            Some(site.index),
            format!(
                "no image source for tile {} in tileset '{}', neither per tile nor on the sheet",
                tile.id, tileset.name
            ),
        );
        return (None, rect);
    };
    let path = ctx.images.resolve(&reference, ctx.map_dir);
    if path.is_none() {
        ctx.diagnostics.warn(
            site.layer,
            Some(site.index),
            format!("can't find image {reference} for tile {}", tile.id),
        );
    }
    (path, rect)
}

/// Build one entity from a resolved tile. Position is left at the origin for
/// the layer processor to place.
pub fn build_sprite(
    ctx: &mut LoadContext<'_, '_>,
    resolved: &ResolvedTile<'_>,
    options: &LoadOptions,
    style: &LayerStyle,
    site: Site<'_>,
) -> Result<RenderableEntity, MapError> {
    let tileset = resolved.tileset;
    let tile = resolved.tile.as_ref();
    let scale = options.scaling;

    let (path, rect) = tile_texture(ctx, tileset, tile, site);
    let natural = vec2(rect.w, rect.h);

    let mut entity = RenderableEntity::new(Vec2::ZERO, natural * scale);
    entity.scale = scale;
    entity.orientation = resolved.orientation;
    entity.gid = resolved.gid;

    let needs_pixels = options.hit_box_algorithm != HitBoxAlgorithm::None;
    let mut texture = path.map(|p| TextureRegion::new(p, rect));
    if let Some(tex) = texture.as_mut().filter(|_| needs_pixels) {
        match ctx.images.get(&tex.path) {
            Ok(img) => tex.image = Some(img),
            Err(e) => ctx.diagnostics.warn(
                site.layer,
                Some(site.index),
                format!("failed to decode {}: {e}", tex.path.display()),
            ),
        }
    }

    entity.hitbox = authored_hitbox(ctx, tile, natural, site)
        .or_else(|| {
            let image = texture.as_ref().and_then(|t| t.image.as_deref());
            hitbox::compute(
                options.hit_box_algorithm,
                options.hit_box_detail,
                image,
                rect,
                resolved.orientation,
            )
        })
        .map(|pts| pts.into_iter().map(|p| p * scale).collect());
    entity.texture = texture;

    if !tile.animation.is_empty() {
        entity.keyframes = keyframes(ctx, tileset, tile, site);
        if let Some(first) = entity.keyframes.first() {
            entity.texture = Some(first.texture.clone());
        }
    }

    entity.properties.extend_from(&tile.properties);
    if let Some(kind) = &tile.kind {
        entity
            .properties
            .insert("type", PropertyValue::String(kind.clone()));
    }
    entity.motion = MotionHints::from_properties(&entity.properties, site.layer)?;
    entity.apply_style(style);

    Ok(entity)
}

/// First authored collision shape, anchored at the tile's half extent. Only
/// outlines count as hitboxes; points, text and tiles fall through to the
/// pixel strategy.
fn authored_hitbox(
    ctx: &mut LoadContext<'_, '_>,
    tile: &TileDefinition,
    natural: Vec2,
    site: Site<'_>,
) -> Option<Vec<Vec2>> {
    let first = tile.hitboxes.first()?;
    if tile.hitboxes.len() > 1 {
        ctx.diagnostics.warn(
            site.layer,
            Some(site.index),
            format!(
                "tile {} has {} hitbox shapes, only the first is used",
                tile.id,
                tile.hitboxes.len()
            ),
        );
    }
    let outline = match first.shape {
        ObjectShape::Point => Err(GeometryError::Unsupported("point")),
        ObjectShape::Text => Err(GeometryError::Unsupported("text")),
        ObjectShape::Tile { .. } => Err(GeometryError::Unsupported("tile")),
        _ => geometry::reconstruct(first, natural / 2.0),
    };
    match outline {
        Ok(outline) => Some(outline.points),
        Err(e) => {
            ctx.diagnostics.warn(
                site.layer,
                Some(site.index),
                format!("hitbox of tile {} ignored: {e}", tile.id),
            );
            None
        }
    }
}

fn keyframes(
    ctx: &mut LoadContext<'_, '_>,
    tileset: &TileSet,
    tile: &TileDefinition,
    site: Site<'_>,
) -> Vec<Keyframe> {
    let mut frames = Vec::with_capacity(tile.animation.len());
    for frame in &tile.animation {
        let Some(frame_tile) = TilesetRegistry::tile_in(tileset, frame.tile_id) else {
            ctx.diagnostics.warn(
                site.layer,
                Some(site.index),
                format!(
                    "animation frame references missing tile {} in tileset '{}'",
                    frame.tile_id, tileset.name
                ),
            );
            continue;
        };
        let (path, rect) = tile_texture(ctx, tileset, &frame_tile, site);
        // tile_texture already reported a missing image
        if let Some(path) = path {
            frames.push(Keyframe {
                tile_id: frame.tile_id,
                duration_ms: frame.duration_ms,
                texture: TextureRegion::new(path, rect),
            });
        }
    }
    frames
}
