// src/loader/json_loader.rs
use crate::document::*;
use crate::error::MapError;
use macroquad::prelude::{vec2, Color};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonLayerData {
    Cells(Vec<u32>),
    Encoded(String),
}

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(default)]
    data: Option<JsonLayerData>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default = "one")]
    opacity: f32,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    objects: Vec<JsonObject>,
    #[serde(default)]
    image: String,
    #[serde(default)]
    transparentcolor: Option<String>,
    #[serde(default)]
    tintcolor: Option<String>,
    #[serde(default)]
    layers: Vec<JsonLayer>,
}

fn default_true() -> bool {
    true
}
fn one() -> f32 {
    1.0
}

#[derive(Deserialize)]
struct JsonTilesetRef {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Deserialize)]
struct JsonMap {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    backgroundcolor: Option<String>,
    #[serde(default)]
    layers: Vec<JsonLayer>,
    #[serde(default)]
    tilesets: Vec<JsonValue>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonTileset {
    #[serde(default)]
    name: String,
    tilewidth: u32,
    tileheight: u32,
    tilecount: u32,
    #[serde(default)]
    columns: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    tiles: Vec<JsonTile>,
}

#[derive(Deserialize)]
struct JsonProperty {
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    value: JsonValue,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    point: bool,
    #[serde(default)]
    ellipse: bool,
    #[serde(default)]
    polygon: Vec<JsonObjectPoint>,
    #[serde(default)]
    polyline: Vec<JsonObjectPoint>,
    #[serde(default)]
    text: Option<JsonValue>,
    #[serde(default)]
    gid: Option<u32>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonObjectPoint {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Default)]
struct JsonObjectGroup {
    #[serde(default)]
    objects: Vec<JsonObject>,
}

#[derive(Deserialize)]
struct JsonFrame {
    tileid: u32,
    duration: u32,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    objectgroup: JsonObjectGroup,
    #[serde(default)]
    animation: Vec<JsonFrame>,
}

fn json_property_to_ir(prop: JsonProperty) -> Result<Option<(String, PropertyValue)>, MapError> {
    let JsonProperty { name, kind, value } = prop;

    let parsed = match kind.as_deref() {
        Some("bool") => value.as_bool().map(PropertyValue::Bool),
        Some("int") | Some("object") => value.as_i64().map(PropertyValue::Int),
        Some("float") => value.as_f64().map(PropertyValue::Float),
        Some("string") | Some("file") | Some("color") => {
            value.as_str().map(|s| PropertyValue::String(s.to_owned()))
        }
        Some("class") => Some(PropertyValue::String(value.to_string())),
        Some(other) => {
            return Err(MapError::UnsupportedPropertyType {
                name,
                kind: other.to_owned(),
            });
        }
        None => {
            if let Some(v) = value.as_bool() {
                Some(PropertyValue::Bool(v))
            } else if let Some(v) = value.as_i64() {
                Some(PropertyValue::Int(v))
            } else if let Some(v) = value.as_f64() {
                Some(PropertyValue::Float(v))
            } else {
                value.as_str().map(|s| PropertyValue::String(s.to_owned()))
            }
        }
    };

    Ok(parsed.map(|value| (name, value)))
}

fn properties_from_json(props: Vec<JsonProperty>) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    for p in props {
        if let Some((name, value)) = json_property_to_ir(p)? {
            out.insert(name, value);
        }
    }
    Ok(out)
}

/// `#RRGGBB` or `#AARRGGBB`.
fn parse_color_bytes(s: &str) -> Result<[u8; 4], MapError> {
    let hex = s.trim_start_matches('#');
    let bad = || MapError::InvalidMap(format!("bad colour '{s}'"));
    let byte = |i: usize| -> Result<u8, MapError> {
        hex.get(i..i + 2)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(bad)
    };
    match hex.len() {
        6 => Ok([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Ok([byte(2)?, byte(4)?, byte(6)?, byte(0)?]),
        _ => Err(bad()),
    }
}

fn parse_color(s: &str) -> Result<Color, MapError> {
    let [r, g, b, a] = parse_color_bytes(s)?;
    Ok(Color::from_rgba(r, g, b, a))
}

fn object_to_ir(obj: JsonObject) -> Result<MapObject, MapError> {
    let shape = if let Some(gid) = obj.gid {
        ObjectShape::Tile { gid }
    } else if obj.point {
        ObjectShape::Point
    } else if obj.ellipse {
        ObjectShape::Ellipse
    } else if !obj.polygon.is_empty() {
        ObjectShape::Polygon(obj.polygon.into_iter().map(|p| vec2(p.x, p.y)).collect())
    } else if !obj.polyline.is_empty() {
        ObjectShape::Polyline(obj.polyline.into_iter().map(|p| vec2(p.x, p.y)).collect())
    } else if obj.text.is_some() {
        ObjectShape::Text
    } else {
        ObjectShape::Rectangle
    };

    let class_name = if !obj.class.is_empty() {
        obj.class
    } else {
        obj.kind
    };

    Ok(MapObject {
        id: obj.id,
        name: obj.name,
        class_name,
        x: obj.x,
        y: obj.y,
        width: obj.width,
        height: obj.height,
        rotation: obj.rotation,
        visible: obj.visible,
        shape,
        properties: properties_from_json(obj.properties)?,
    })
}

/// Image paths inside an external tileset are relative to the tileset file;
/// rebase them onto the map directory.
fn rebase(image: String, tileset_dir: Option<&Path>) -> String {
    match tileset_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(image).to_string_lossy().into_owned(),
        _ => image,
    }
}

fn tileset_to_ir(
    ts: JsonTileset,
    first_gid: u32,
    tileset_dir: Option<&Path>,
) -> Result<TileSet, MapError> {
    let image = ts.image.filter(|i| !i.is_empty()).map(|path| ImageRef {
        path: rebase(path, tileset_dir),
        width: ts.imagewidth,
        height: ts.imageheight,
    });

    let mut tiles = BTreeMap::new();
    for tile in ts.tiles {
        let def = TileDefinition {
            id: tile.id,
            image: tile.image.filter(|i| !i.is_empty()).map(|path| ImageRef {
                path: rebase(path, tileset_dir),
                width: tile.imagewidth,
                height: tile.imageheight,
            }),
            hitboxes: tile
                .objectgroup
                .objects
                .into_iter()
                .map(object_to_ir)
                .collect::<Result<Vec<_>, _>>()?,
            animation: tile
                .animation
                .into_iter()
                .map(|f| Frame {
                    tile_id: f.tileid,
                    duration_ms: f.duration,
                })
                .collect(),
            properties: properties_from_json(tile.properties)?,
            kind: tile
                .class
                .filter(|k| !k.is_empty())
                .or(tile.kind.filter(|k| !k.is_empty())),
        };
        tiles.insert(def.id, def);
    }

    Ok(TileSet {
        name: ts.name,
        first_gid,
        tile_count: ts.tilecount,
        columns: ts.columns,
        tile_width: ts.tilewidth,
        tile_height: ts.tileheight,
        spacing: ts.spacing,
        margin: ts.margin,
        image,
        tiles,
        properties: properties_from_json(ts.properties)?,
    })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, MapError> {
    let txt = std::fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&txt).map_err(|source| MapError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn layer_to_ir(l: JsonLayer) -> Result<Layer, MapError> {
    let layer_name = l.name.clone();
    let kind = match l.kind.as_deref().unwrap_or("tilelayer") {
        "tilelayer" => {
            let data = match (l.data, l.encoding.as_deref()) {
                (None, _) => Vec::new(),
                (Some(JsonLayerData::Cells(cells)), None | Some("csv")) => cells,
                (Some(_), enc) => {
                    return Err(MapError::InvalidMap(format!(
                        "layer '{layer_name}' uses unsupported encoding {}; save the map with CSV layer data",
                        enc.unwrap_or("string")
                    )));
                }
            };
            LayerKind::Tiles {
                width: l.width,
                height: l.height,
                data,
            }
        }
        "objectgroup" => LayerKind::Objects {
            objects: l
                .objects
                .into_iter()
                .map(object_to_ir)
                .collect::<Result<Vec<_>, _>>()?,
        },
        "imagelayer" => LayerKind::Image {
            image: l.image,
            transparent_color: l
                .transparentcolor
                .as_deref()
                .map(|c| parse_color_bytes(c).map(|[r, g, b, _]| [r, g, b]))
                .transpose()?,
        },
        "group" => LayerKind::Group {
            layers: l
                .layers
                .into_iter()
                .map(layer_to_ir)
                .collect::<Result<Vec<_>, _>>()?,
        },
        other => {
            return Err(MapError::InvalidMap(format!(
                "layer '{layer_name}' has unknown type '{other}'"
            )));
        }
    };

    Ok(Layer {
        name: l.name,
        visible: l.visible,
        opacity: l.opacity,
        offset: vec2(l.offsetx, l.offsety),
        tint_color: l.tintcolor.as_deref().map(parse_color).transpose()?,
        properties: properties_from_json(l.properties)?,
        kind,
    })
}

/// Path reported for errors in JSON that did not come from a file.
pub const INLINE_SOURCE: &str = "<inline>";

/// Decode map JSON text. External tilesets are read relative to `map_dir`.
pub fn decode_map_str(txt: &str, map_dir: &Path) -> Result<SourceDocument, MapError> {
    let j: JsonMap = serde_json::from_str(txt).map_err(|source| MapError::Json {
        path: PathBuf::from(INLINE_SOURCE),
        source,
    })?;
    map_to_ir(j, map_dir, Path::new(INLINE_SOURCE))
}

/// Decode a Tiled JSON map file and every external tileset it references.
pub fn decode_map_file(path: &Path) -> Result<SourceDocument, MapError> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(MapError::InvalidMap(format!(
            "Map file must be a JSON file: {}",
            path.display()
        )));
    }
    let j: JsonMap = read_json(path)?;
    let map_dir = path
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));
    map_to_ir(j, &map_dir, path)
}

fn map_to_ir(j: JsonMap, map_dir: &Path, source_path: &Path) -> Result<SourceDocument, MapError> {
    let mut tilesets = Vec::with_capacity(j.tilesets.len());
    for entry in j.tilesets {
        let json_err = |source: serde_json::Error| MapError::Json {
            path: source_path.to_path_buf(),
            source,
        };
        let ts: JsonTilesetRef = serde_json::from_value(entry.clone()).map_err(json_err)?;
        let tileset = match ts.source {
            Some(source) => {
                if !source.ends_with(".json") {
                    return Err(MapError::InvalidMap(format!(
                        "External tileset must be JSON: {source}"
                    )));
                }
                let ext: JsonTileset = read_json(&map_dir.join(&source))?;
                let dir = Path::new(&source).parent();
                tileset_to_ir(ext, ts.firstgid, dir)?
            }
            None => {
                let embedded: JsonTileset = serde_json::from_value(entry).map_err(json_err)?;
                tileset_to_ir(embedded, ts.firstgid, None)?
            }
        };
        if tileset.first_gid.checked_add(tileset.tile_count).is_none() {
            return Err(MapError::InvalidMap(format!(
                "tileset '{}' range {}+{} exceeds the gid space",
                tileset.name, tileset.first_gid, tileset.tile_count
            )));
        }
        tilesets.push(tileset);
    }

    // Sorted ranges keep gid lookup a binary search
    tilesets.sort_by_key(|t| t.first_gid);
    for pair in tilesets.windows(2) {
        // Both bounds were range-checked above
        let end = pair[0].first_gid.saturating_add(pair[0].tile_count);
        if pair[0].is_sheet() && end > pair[1].first_gid {
            return Err(MapError::InvalidMap(format!(
                "tilesets '{}' and '{}' overlap",
                pair[0].name, pair[1].name
            )));
        }
    }

    let layers = j
        .layers
        .into_iter()
        .map(layer_to_ir)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SourceDocument {
        width: j.width,
        height: j.height,
        tile_width: j.tilewidth,
        tile_height: j.tileheight,
        background_color: j.backgroundcolor.as_deref().map(parse_color).transpose()?,
        tilesets,
        layers,
        properties: properties_from_json(j.properties)?,
        base_dir: map_dir.to_path_buf(),
    })
}
