//! Per-layer builders: tile grids, object layers, image layers and groups.

use crate::config::{LoadOptions, MapConfig};
use crate::document::{
    Layer, LayerKind, MapObject, ObjectShape, Properties, PropertyValue, SourceDocument,
};
use crate::error::{Diagnostics, MapError};
use crate::geometry;
use crate::hitbox;
use crate::image::{apply_color_key, ImageCache, TextureRegion};
use crate::sprite::{build_sprite, LayerStyle, MotionHints, RenderableEntity, Site};
use crate::sprite_list::SpriteList;
use crate::tileset::{Orientation, TileId, TilesetRegistry};
use macroquad::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Groups nested deeper than this are rejected as malformed.
pub const MAX_GROUP_DEPTH: usize = 64;

/// Shared state for one load.
pub struct LoadContext<'d, 'l> {
    /// Document being loaded
    pub doc: &'d SourceDocument,
    /// Tileset lookup over `doc`
    pub registry: TilesetRegistry<'d>,
    /// Decoded images, shared between tiles
    pub images: ImageCache<'l>,
    /// Warnings so far
    pub diagnostics: Diagnostics,
    /// Base for map-relative image paths
    pub map_dir: &'d Path,
    /// Non-group layer names claimed so far
    pub layer_names: HashSet<String>,
}

impl<'d, 'l> LoadContext<'d, 'l> {
    /// Fresh context for one load of `doc`.
    pub fn new(doc: &'d SourceDocument, images: ImageCache<'l>) -> Self {
        Self {
            doc,
            registry: TilesetRegistry::new(&doc.tilesets),
            images,
            diagnostics: Diagnostics::new(),
            map_dir: &doc.base_dir,
            layer_names: HashSet::new(),
        }
    }
}

/// Shape kind of a [`TiledObjectRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Single point
    Point,
    /// Four corners
    Rectangle,
    /// Closed outline
    Polygon,
    /// Open outline
    Polyline,
    /// Eight-point approximation
    Ellipse,
}

/// A non-tile object from an object layer, in map space (Y up, scaled).
#[derive(Debug, Clone, PartialEq)]
pub struct TiledObjectRecord {
    /// Document id
    pub id: u32,
    /// Shape kind
    pub shape: RecordShape,
    /// Point sequence
    pub points: Vec<Vec2>,
    /// Object name
    pub name: String,
    /// `type` / `class` tag
    pub kind: String,
    /// Custom properties
    pub properties: Properties,
}

/// What processing one non-group layer yields.
#[derive(Debug, Default)]
pub struct LayerOutput {
    /// Entities, when the layer kind produces any
    pub sprites: Option<SpriteList>,
    /// Object records, when the layer holds non-tile shapes
    pub objects: Option<Vec<TiledObjectRecord>>,
}

fn style_of(layer: &Layer) -> LayerStyle {
    LayerStyle {
        tint: layer.tint_color,
        opacity: layer.opacity,
    }
}

/// Walk `layer`, calling `sink` for each non-group layer in document order
/// with its name and output. Groups recurse with the same option table.
/// A non-group name already seen in this load fails before the layer is built.
pub fn process_layer(
    ctx: &mut LoadContext<'_, '_>,
    layer: &Layer,
    config: &MapConfig,
    depth: usize,
    sink: &mut dyn FnMut(&str, LayerOutput) -> Result<(), MapError>,
) -> Result<(), MapError> {
    if depth > MAX_GROUP_DEPTH {
        return Err(MapError::GroupTooDeep {
            layer: layer.name.clone(),
            depth,
        });
    }
    if let LayerKind::Group { layers } = &layer.kind {
        log::debug!("entering group '{}' ({} children)", layer.name, layers.len());
        for child in layers {
            process_layer(ctx, child, config, depth + 1, sink)?;
        }
        return Ok(());
    }

    // Claimed before building so a duplicate never hides behind a later error
    if !ctx.layer_names.insert(layer.name.clone()) {
        return Err(MapError::DuplicateLayer(layer.name.clone()));
    }

    let options = config.options_for(&layer.name);
    let out = match &layer.kind {
        LayerKind::Tiles {
            width,
            height,
            data,
        } => LayerOutput {
            sprites: Some(tile_layer(ctx, layer, *width, *height, data, &options)?),
            objects: None,
        },
        LayerKind::Objects { objects } => object_layer(ctx, layer, objects, &options)?,
        LayerKind::Image {
            image,
            transparent_color,
        } => LayerOutput {
            sprites: Some(image_layer(ctx, layer, image, *transparent_color, &options)),
            objects: None,
        },
        LayerKind::Group { .. } => unreachable!("groups handled above"),
    };
    sink(&layer.name, out)
}

/// Grid cells become entities; row 0 of the data is the top map row.
pub fn tile_layer(
    ctx: &mut LoadContext<'_, '_>,
    layer: &Layer,
    width: usize,
    height: usize,
    data: &[u32],
    options: &LoadOptions,
) -> Result<SpriteList, MapError> {
    let expected = width.checked_mul(height).ok_or_else(|| {
        MapError::InvalidMap(format!(
            "layer '{}' claims {width}x{height} cells",
            layer.name
        ))
    })?;
    if data.len() != expected {
        return Err(MapError::InvalidLayerSize {
            layer: layer.name.clone(),
            expected,
            actual: data.len(),
        });
    }
    let mut list = SpriteList::new(options.use_spatial_hash);
    if width == 0 {
        return Ok(list);
    }

    let doc = ctx.doc;
    let style = style_of(layer);
    let cell = vec2(doc.tile_width as f32, doc.tile_height as f32) * options.scaling;

    for (row, cells) in data.chunks(width).enumerate() {
        for (column, &raw) in cells.iter().enumerate() {
            let id = TileId(raw);
            if id.is_empty() {
                continue;
            }
            let resolved = ctx.registry.resolve(id).ok_or_else(|| MapError::TileNotFound {
                layer: layer.name.clone(),
                gid: id.clean(),
                column,
                row,
            })?;
            let site = Site {
                layer: &layer.name,
                index: row * width + column,
            };
            let mut entity = build_sprite(ctx, &resolved, options, &style, site)?;

            let from_bottom = doc.height as f32 - row as f32 - 1.0;
            entity.position = vec2(
                column as f32 * cell.x + entity.size.x / 2.0,
                from_bottom * cell.y + entity.size.y / 2.0,
            );
            list.push(entity);
        }
    }
    log::debug!("tile layer '{}': {} entities", layer.name, list.len());
    Ok(list)
}

/// Tile objects become entities, every other shape becomes a record.
pub fn object_layer(
    ctx: &mut LoadContext<'_, '_>,
    layer: &Layer,
    objects: &[MapObject],
    options: &LoadOptions,
) -> Result<LayerOutput, MapError> {
    let mut sprites: Option<SpriteList> = None;
    let mut records: Vec<TiledObjectRecord> = Vec::new();
    let style = style_of(layer);
    let map_px_h = ctx.doc.pixel_size().y;

    for (index, obj) in objects.iter().enumerate() {
        if let ObjectShape::Tile { gid } = obj.shape {
            let entity = tile_object(ctx, layer, obj, gid, index, options, &style, map_px_h)?;
            sprites
                .get_or_insert_with(|| SpriteList::new(options.use_spatial_hash))
                .push(entity);
            continue;
        }

        let outline = match geometry::reconstruct(obj, Vec2::ZERO) {
            Ok(o) => o,
            Err(e) => {
                ctx.diagnostics.warn(
                    &layer.name,
                    Some(index),
                    format!("object {} ignored: {e}", obj.id),
                );
                continue;
            }
        };
        let shape = match obj.shape {
            ObjectShape::Point => RecordShape::Point,
            ObjectShape::Rectangle => RecordShape::Rectangle,
            ObjectShape::Polygon(_) => RecordShape::Polygon,
            ObjectShape::Polyline(_) => RecordShape::Polyline,
            ObjectShape::Ellipse => RecordShape::Ellipse,
            ObjectShape::Tile { .. } | ObjectShape::Text => continue,
        };
        let points = outline
            .points
            .into_iter()
            .map(|p| vec2(p.x, p.y + map_px_h) * options.scaling)
            .collect();
        records.push(TiledObjectRecord {
            id: obj.id,
            shape,
            points,
            name: obj.name.clone(),
            kind: obj.class_name.clone(),
            properties: obj.properties.clone(),
        });
    }

    Ok(LayerOutput {
        sprites,
        objects: (!records.is_empty()).then_some(records),
    })
}

#[allow(clippy::too_many_arguments)]
fn tile_object(
    ctx: &mut LoadContext<'_, '_>,
    layer: &Layer,
    obj: &MapObject,
    gid: u32,
    index: usize,
    options: &LoadOptions,
    style: &LayerStyle,
    map_px_h: f32,
) -> Result<RenderableEntity, MapError> {
    let id = TileId(gid);
    let resolved = ctx
        .registry
        .resolve(id)
        .ok_or_else(|| MapError::ObjectTileNotFound {
            layer: layer.name.clone(),
            object_id: obj.id,
            gid: id.clean(),
        })?;
    let site = Site {
        layer: &layer.name,
        index,
    };
    let mut entity = build_sprite(ctx, &resolved, options, style, site)?;

    let scale = options.scaling;
    // Tile objects are anchored at their bottom-left corner.
    let anchor = vec2(obj.x * scale, (map_px_h - obj.y) * scale);
    if let Some(size) = obj.size() {
        entity.resize(size * scale);
    }
    let rotation = -obj.rotation.to_radians();
    let half = entity.size / 2.0;
    entity.position = anchor + Vec2::from_angle(rotation).rotate(half);
    entity.rotation = rotation;

    entity.properties.extend_from(&obj.properties);
    if !obj.class_name.is_empty() {
        entity
            .properties
            .insert("type", PropertyValue::String(obj.class_name.clone()));
    }
    if !obj.name.is_empty() {
        entity
            .properties
            .insert("name", PropertyValue::String(obj.name.clone()));
    }
    entity.motion = MotionHints::from_properties(&entity.properties, &layer.name)?;
    Ok(entity)
}

/// One entity from the layer's image, colour key applied once to the pixels.
pub fn image_layer(
    ctx: &mut LoadContext<'_, '_>,
    layer: &Layer,
    reference: &str,
    transparent_color: Option<[u8; 3]>,
    options: &LoadOptions,
) -> SpriteList {
    let mut list = SpriteList::new(options.use_spatial_hash);

    let Some(path) = ctx.images.resolve(reference, ctx.map_dir) else {
        ctx.diagnostics.warn(
            &layer.name,
            None,
            format!("can't find image {reference} for image layer"),
        );
        return list;
    };
    let image = match ctx.images.get(&path) {
        Ok(img) => img,
        Err(e) => {
            ctx.diagnostics.warn(
                &layer.name,
                None,
                format!("failed to decode {}: {e}", path.display()),
            );
            return list;
        }
    };
    let image = match transparent_color {
        Some(key) => {
            let mut keyed = (*image).clone();
            let n = apply_color_key(&mut keyed, key);
            log::debug!("image layer '{}': {n} pixels keyed out", layer.name);
            Arc::new(keyed)
        }
        None => image,
    };

    let natural = vec2(image.width as f32, image.height as f32);
    let scale = options.scaling;
    let mut entity = RenderableEntity::new(Vec2::ZERO, natural * scale);
    entity.scale = scale;
    entity.position = vec2(
        layer.offset.x * scale + entity.size.x / 2.0,
        layer.offset.y * scale,
    );
    entity.hitbox = hitbox::compute(
        options.hit_box_algorithm,
        options.hit_box_detail,
        Some(image.as_ref()),
        Rect::new(0.0, 0.0, natural.x, natural.y),
        Orientation::NONE,
    )
    .map(|pts| pts.into_iter().map(|p| p * scale).collect());
    entity.texture = Some(TextureRegion {
        path,
        source: Rect::new(0.0, 0.0, natural.x, natural.y),
        image: Some(image),
    });
    entity.properties.extend_from(&layer.properties);
    entity.apply_style(&style_of(layer));
    list.push(entity);
    list
}
