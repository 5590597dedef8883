// tests/map_tests.rs

use macroquad::prelude::*;
use macroquad_tiled_scene::document::{
    Frame, ImageRef, Layer, LayerKind, MapObject, ObjectShape, SourceDocument, TileDefinition,
    TileSet,
};
use macroquad_tiled_scene::{
    HitBoxAlgorithm, LayerOverrides, LoadOptions, LoadedMap, MapConfig, MapError,
    MemoryImageLoader, PropertyValue, RecordShape, Scene,
};

fn sheet(tile_count: u32, columns: u32) -> TileSet {
    TileSet::sheet(
        "terrain",
        1,
        ImageRef {
            path: "tiles.png".into(),
            width: 16 * columns,
            height: 16 * tile_count.div_ceil(columns),
        },
        16,
        16,
        tile_count,
        columns,
    )
}

fn images() -> MemoryImageLoader {
    let mut loader = MemoryImageLoader::new();
    loader.insert("tiles.png", Image::gen_image_color(64, 64, WHITE));
    loader
}

fn grid(name: &str, width: usize, height: usize, data: Vec<u32>) -> Layer {
    Layer::new(
        name,
        LayerKind::Tiles {
            width,
            height,
            data,
        },
    )
}

fn doc_2x2() -> SourceDocument {
    let mut doc = SourceDocument::new(2, 2, 16, 16);
    doc.tilesets.push(sheet(1, 1));
    doc
}

fn load(doc: &SourceDocument, config: &MapConfig) -> Result<LoadedMap, MapError> {
    LoadedMap::from_document(doc, config, &mut images())
}

#[test]
fn diagonal_grid_yields_two_entities_flipped_to_y_up() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("ground", 2, 2, vec![1, 0, 0, 1]));

    let map = load(&doc, &MapConfig::default()).expect("load");
    let ground = map.sprite_list("ground").unwrap();
    assert_eq!(ground.len(), 2);

    let positions: Vec<Vec2> = ground.iter().map(|e| e.position).collect();
    assert_eq!(positions, [vec2(8.0, 24.0), vec2(24.0, 8.0)]);
    for e in ground {
        assert_eq!(e.gid, 1);
        assert!(!e.orientation.any());
        assert_eq!(e.size, vec2(16.0, 16.0));
        assert_eq!(
            e.texture.as_ref().map(|t| t.source),
            Some(Rect::new(0.0, 0.0, 16.0, 16.0))
        );
    }
    assert!(map.warnings().is_empty());
}

#[test]
fn all_zero_grid_yields_no_entities() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("empty", 2, 2, vec![0; 4]));

    let map = load(&doc, &MapConfig::default()).unwrap();
    assert!(map.sprite_list("empty").unwrap().is_empty());
}

#[test]
fn flags_travel_on_the_entity() {
    let mut doc = SourceDocument::new(1, 1, 16, 16);
    doc.tilesets.push(sheet(1, 1));
    doc.layers.push(grid("flipped", 1, 1, vec![0x8000_0001]));

    let config = MapConfig {
        defaults: LoadOptions {
            hit_box_algorithm: HitBoxAlgorithm::None,
            ..LoadOptions::default()
        },
        ..MapConfig::default()
    };
    let map = load(&doc, &config).unwrap();
    let e = map.sprite_list("flipped").unwrap().get(0).unwrap();
    assert!(e.orientation.flip_h);
    assert!(!e.orientation.flip_v && !e.orientation.flip_d);
    assert_eq!(e.gid, 1);
    // Horizontal flip mirrors the full rectangle onto itself in reverse.
    assert_eq!(
        e.hitbox.as_deref(),
        Some(&[vec2(8.0, 8.0), vec2(-8.0, 8.0), vec2(-8.0, -8.0), vec2(8.0, -8.0)][..])
    );
}

#[test]
fn duplicate_layer_names_are_fatal_even_across_groups() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("walls", 2, 2, vec![0; 4]));
    doc.layers.push(grid("walls", 2, 2, vec![0; 4]));
    let err = load(&doc, &MapConfig::default()).unwrap_err();
    assert!(matches!(err, MapError::DuplicateLayer(ref n) if n == "walls"));

    let mut nested = doc_2x2();
    nested.layers.push(Layer::new(
        "a",
        LayerKind::Group {
            layers: vec![grid("deco", 2, 2, vec![0; 4])],
        },
    ));
    nested.layers.push(Layer::new(
        "b",
        LayerKind::Group {
            layers: vec![Layer::new("deco", LayerKind::Objects { objects: vec![] })],
        },
    ));
    let err = load(&nested, &MapConfig::default()).unwrap_err();
    assert!(matches!(err, MapError::DuplicateLayer(ref n) if n == "deco"));
}

#[test]
fn groups_flatten_in_document_order() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("floor", 2, 2, vec![1, 1, 1, 1]));
    doc.layers.push(Layer::new(
        "props",
        LayerKind::Group {
            layers: vec![
                grid("rugs", 2, 2, vec![0, 1, 0, 0]),
                Layer::new(
                    "inner",
                    LayerKind::Group {
                        layers: vec![grid("lamps", 2, 2, vec![1, 0, 0, 0])],
                    },
                ),
            ],
        },
    ));

    let map = load(&doc, &MapConfig::default()).unwrap();
    assert_eq!(
        map.sprite_lists.names().collect::<Vec<_>>(),
        ["floor", "rugs", "lamps"]
    );

    let scene = Scene::from_map(map);
    assert_eq!(scene.entities().count(), 6);
}

#[test]
fn absurd_group_nesting_is_rejected() {
    let mut layer = grid("leaf", 2, 2, vec![0; 4]);
    for depth in 0..70 {
        layer = Layer::new(
            format!("g{depth}"),
            LayerKind::Group {
                layers: vec![layer],
            },
        );
    }
    let mut doc = doc_2x2();
    doc.layers.push(layer);
    assert!(matches!(
        load(&doc, &MapConfig::default()),
        Err(MapError::GroupTooDeep { .. })
    ));
}

#[test]
fn unknown_gid_in_populated_cell_is_fatal() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("ground", 2, 2, vec![0, 7, 0, 0]));
    let err = load(&doc, &MapConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        MapError::TileNotFound { gid: 7, column: 1, row: 0, ref layer } if layer == "ground"
    ));
}

#[test]
fn wrong_cell_count_is_fatal() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("oops", 2, 2, vec![1, 2, 3]));
    let err = load(&doc, &MapConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        MapError::InvalidLayerSize { expected: 4, actual: 3, ref layer } if layer == "oops"
    ));
}

#[test]
fn per_layer_overrides_only_replace_set_keys() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("small", 2, 2, vec![1, 0, 0, 0]));
    doc.layers.push(grid("big", 2, 2, vec![1, 0, 0, 0]));

    let config = MapConfig::with_scaling(1.0).layer(
        "big",
        LayerOverrides {
            scaling: Some(2.0),
            use_spatial_hash: Some(true),
            ..LayerOverrides::default()
        },
    );
    let map = load(&doc, &config).unwrap();

    let small = map.sprite_list("small").unwrap();
    let big = map.sprite_list("big").unwrap();
    assert_eq!(small.get(0).unwrap().size, vec2(16.0, 16.0));
    assert_eq!(big.get(0).unwrap().size, vec2(32.0, 32.0));
    assert_eq!(big.get(0).unwrap().position, vec2(16.0, 48.0));
    assert!(!small.uses_spatial_hash());
    assert!(big.uses_spatial_hash());
    assert_eq!(big.query_rect(vec2(0.0, 40.0), vec2(4.0, 44.0)).len(), 1);
}

#[test]
fn only_first_authored_hitbox_is_used() {
    let mut doc = doc_2x2();
    let mut ts = sheet(1, 1);
    ts.tiles.insert(
        0,
        TileDefinition {
            hitboxes: vec![
                MapObject::new(1, ObjectShape::Rectangle, 0.0, 8.0, 16.0, 8.0),
                MapObject::new(2, ObjectShape::Point, 4.0, 4.0, 0.0, 0.0),
            ],
            ..TileDefinition::bare(0)
        },
    );
    doc.tilesets = vec![ts];
    doc.layers.push(grid("ground", 2, 2, vec![1, 0, 0, 0]));

    let map = load(&doc, &MapConfig::default()).unwrap();
    let e = map.sprite_list("ground").unwrap().get(0).unwrap();
    assert_eq!(
        e.hitbox.as_deref(),
        Some(&[vec2(-8.0, 0.0), vec2(8.0, 0.0), vec2(8.0, -8.0), vec2(-8.0, -8.0)][..])
    );
    assert_eq!(map.warnings().len(), 1);
    assert_eq!(map.warnings()[0].layer, "ground");
    assert_eq!(map.warnings()[0].index, Some(0));
}

#[test]
fn animation_keyframes_skip_missing_frames() {
    let mut doc = doc_2x2();
    let mut ts = sheet(2, 2);
    ts.tiles.insert(
        0,
        TileDefinition {
            animation: vec![
                Frame {
                    tile_id: 0,
                    duration_ms: 100,
                },
                Frame {
                    tile_id: 1,
                    duration_ms: 200,
                },
                Frame {
                    tile_id: 9,
                    duration_ms: 300,
                },
            ],
            kind: Some("water".into()),
            ..TileDefinition::bare(0)
        },
    );
    doc.tilesets = vec![ts];
    doc.layers.push(grid("water", 2, 2, vec![1, 0, 0, 0]));

    let map = load(&doc, &MapConfig::default()).unwrap();
    let e = map.sprite_list("water").unwrap().get(0).unwrap();
    assert!(e.is_animated());
    assert_eq!(e.keyframes.len(), 2);
    assert_eq!(e.keyframes[1].texture.source.x, 16.0);
    assert_eq!(e.keyframes[1].duration_ms, 200);
    assert_eq!(e.properties.get_string("type"), Some("water"));
    assert_eq!(map.warnings().len(), 1);
}

#[test]
fn object_layer_splits_tile_objects_and_records() {
    let mut doc = doc_2x2();
    let mut rect = MapObject::new(3, ObjectShape::Rectangle, 4.0, 2.0, 8.0, 4.0);
    rect.name = "trigger".into();
    rect.class_name = "zone".into();
    let mut tile = MapObject::new(4, ObjectShape::Tile { gid: 1 }, 16.0, 32.0, 16.0, 16.0);
    tile.name = "crate".into();
    tile.properties.insert("change_x", PropertyValue::Float(2.0));
    let text = MapObject::new(5, ObjectShape::Text, 0.0, 0.0, 10.0, 10.0);
    let no_size = MapObject::new(6, ObjectShape::Ellipse, 0.0, 0.0, 0.0, 0.0);
    doc.layers.push(Layer::new(
        "things",
        LayerKind::Objects {
            objects: vec![rect, tile, text, no_size],
        },
    ));

    let map = load(&doc, &MapConfig::with_scaling(2.0)).unwrap();

    let records = map.object_list("things").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].shape, RecordShape::Rectangle);
    assert_eq!(records[0].name, "trigger");
    assert_eq!(records[0].kind, "zone");
    assert_eq!(
        records[0].points,
        [
            vec2(8.0, 60.0),
            vec2(24.0, 60.0),
            vec2(24.0, 52.0),
            vec2(8.0, 52.0)
        ]
    );

    let sprites = map.sprite_list("things").unwrap();
    assert_eq!(sprites.len(), 1);
    let e = sprites.get(0).unwrap();
    assert_eq!(e.position, vec2(48.0, 16.0));
    assert_eq!(e.size, vec2(32.0, 32.0));
    assert_eq!(e.properties.get_string("name"), Some("crate"));
    assert_eq!(e.motion.change_x, Some(2.0));

    // text and the sizeless ellipse
    assert_eq!(map.warnings().len(), 2);
}

#[test]
fn rotated_tile_object_pivots_on_its_anchor() {
    let mut doc = doc_2x2();
    let mut tile = MapObject::new(1, ObjectShape::Tile { gid: 1 }, 16.0, 32.0, 16.0, 16.0);
    tile.rotation = 90.0;
    doc.layers.push(Layer::new(
        "objects",
        LayerKind::Objects {
            objects: vec![tile],
        },
    ));

    let map = load(&doc, &MapConfig::default()).unwrap();
    let e = map.sprite_list("objects").unwrap().get(0).unwrap();
    assert!((e.rotation + std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    assert!((e.position - vec2(24.0, -8.0)).length() < 1e-4);
}

#[test]
fn unresolvable_tile_object_and_bad_motion_hint_are_fatal() {
    let mut doc = doc_2x2();
    doc.layers.push(Layer::new(
        "objects",
        LayerKind::Objects {
            objects: vec![MapObject::new(9, ObjectShape::Tile { gid: 50 }, 0.0, 0.0, 0.0, 0.0)],
        },
    ));
    assert!(matches!(
        load(&doc, &MapConfig::default()),
        Err(MapError::ObjectTileNotFound {
            object_id: 9,
            gid: 50,
            ..
        })
    ));

    let mut doc = doc_2x2();
    let mut tile = MapObject::new(1, ObjectShape::Tile { gid: 1 }, 0.0, 16.0, 0.0, 0.0);
    tile.properties
        .insert("boundary_left", PropertyValue::String("far".into()));
    doc.layers.push(Layer::new(
        "objects",
        LayerKind::Objects {
            objects: vec![tile],
        },
    ));
    assert!(matches!(
        load(&doc, &MapConfig::default()),
        Err(MapError::InvalidMotionHint { .. })
    ));
}

#[test]
fn image_layer_keys_out_colour_and_uses_offset() {
    let mut bg = Image::gen_image_color(4, 2, BLUE);
    bg.set_pixel(0, 0, Color::from_rgba(255, 0, 255, 255));
    let mut loader = images();
    loader.insert("bg.png", bg);

    let mut doc = doc_2x2();
    let mut layer = Layer::new(
        "backdrop",
        LayerKind::Image {
            image: "bg.png".into(),
            transparent_color: Some([255, 0, 255]),
        },
    );
    layer.offset = vec2(10.0, 20.0);
    layer.opacity = 0.5;
    doc.layers.push(layer);
    doc.layers.push(Layer::new(
        "sky",
        LayerKind::Image {
            image: "missing.png".into(),
            transparent_color: None,
        },
    ));

    let map = LoadedMap::from_document(&doc, &MapConfig::with_scaling(2.0), &mut loader).unwrap();

    let list = map.sprite_list("backdrop").unwrap();
    assert_eq!(list.len(), 1);
    let e = list.get(0).unwrap();
    assert_eq!(e.size, vec2(8.0, 4.0));
    assert_eq!(e.position, vec2(24.0, 40.0));
    assert_eq!(e.alpha, 128);
    let pixels = e
        .texture
        .as_ref()
        .and_then(|t| t.image.as_ref())
        .expect("image layer keeps its pixels");
    assert_eq!(&pixels.bytes[..4], &[255, 255, 255, 0]);

    assert!(map.sprite_list("sky").unwrap().is_empty());
    assert_eq!(map.warnings().len(), 1);
    assert_eq!(map.warnings()[0].layer, "sky");
}

#[test]
fn missing_tile_image_is_a_warning_not_an_error() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("ground", 2, 2, vec![1, 0, 0, 0]));

    let map = LoadedMap::from_document(&doc, &MapConfig::default(), &mut MemoryImageLoader::new())
        .unwrap();
    let e = map.sprite_list("ground").unwrap().get(0).unwrap();
    assert!(e.texture.is_none());
    assert_eq!(e.size, vec2(16.0, 16.0));
    assert_eq!(map.warnings().len(), 1);
}

#[test]
fn unknown_layer_lookups_fail() {
    let map = load(&doc_2x2(), &MapConfig::default()).unwrap();
    assert!(matches!(
        map.sprite_list("nope"),
        Err(MapError::LayerNotFound(ref n)) if n == "nope"
    ));
    assert!(map.object_list("nope").is_err());
}

fn transparent(w: u16, h: u16) -> Image {
    Image::gen_image_color(w, h, Color::from_rgba(0, 0, 0, 0))
}

fn fill(img: &mut Image, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) {
    for y in ys {
        for x in xs.clone() {
            img.set_pixel(x, y, WHITE);
        }
    }
}

#[test]
fn point_hitbox_falls_back_to_pixels_with_a_warning() {
    let mut doc = doc_2x2();
    let mut ts = sheet(1, 1);
    ts.tiles.insert(
        0,
        TileDefinition {
            hitboxes: vec![MapObject::new(1, ObjectShape::Point, 4.0, 4.0, 0.0, 0.0)],
            ..TileDefinition::bare(0)
        },
    );
    doc.tilesets = vec![ts];
    doc.layers.push(grid("ground", 2, 2, vec![1, 0, 0, 0]));

    let map = load(&doc, &MapConfig::default()).unwrap();
    let e = map.sprite_list("ground").unwrap().get(0).unwrap();
    assert_eq!(
        e.hitbox.as_deref(),
        Some(&[vec2(-8.0, 8.0), vec2(8.0, 8.0), vec2(8.0, -8.0), vec2(-8.0, -8.0)][..])
    );
    assert_eq!(map.warnings().len(), 1);
    assert!(map.warnings()[0].message.contains("point"));
}

#[test]
fn duplicate_name_wins_over_broken_content() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("walls", 2, 2, vec![0; 4]));
    doc.layers.push(grid("walls", 2, 2, vec![0, 7, 0, 0]));
    let err = load(&doc, &MapConfig::default()).unwrap_err();
    assert!(matches!(err, MapError::DuplicateLayer(ref n) if n == "walls"));
}

#[test]
fn overflowing_grid_dimensions_are_invalid() {
    let mut doc = doc_2x2();
    doc.layers.push(grid("vast", usize::MAX, 2, vec![]));
    assert!(matches!(
        load(&doc, &MapConfig::default()),
        Err(MapError::InvalidMap(_))
    ));
}

#[test]
fn image_collection_tile_uses_its_own_image() {
    let mut loader = images();
    loader.insert("crate.png", Image::gen_image_color(32, 16, WHITE));

    let mut props = sheet(1, 1);
    props.name = "props".into();
    props.first_gid = 2;
    props.columns = 0;
    props.image = None;
    props.tiles.insert(
        0,
        TileDefinition {
            image: Some(ImageRef {
                path: "crate.png".into(),
                width: 32,
                height: 16,
            }),
            hitboxes: vec![MapObject::new(1, ObjectShape::Rectangle, 4.0, 2.0, 8.0, 4.0)],
            ..TileDefinition::bare(0)
        },
    );
    let mut doc = doc_2x2();
    doc.tilesets.push(props);
    doc.layers.push(grid("crates", 2, 2, vec![2, 0, 0, 0]));

    let map = LoadedMap::from_document(&doc, &MapConfig::default(), &mut loader).unwrap();
    let e = map.sprite_list("crates").unwrap().get(0).unwrap();
    assert_eq!(e.gid, 2);
    assert_eq!(e.size, vec2(32.0, 16.0));
    assert_eq!(e.position, vec2(16.0, 24.0));
    assert_eq!(
        e.texture.as_ref().map(|t| t.source),
        Some(Rect::new(0.0, 0.0, 32.0, 16.0))
    );
    // Anchored at the centre of the 32x16 image, not of a grid cell.
    assert_eq!(
        e.hitbox.as_deref(),
        Some(&[vec2(-12.0, 6.0), vec2(-4.0, 6.0), vec2(-4.0, 2.0), vec2(-12.0, 2.0)][..])
    );
    assert!(map.warnings().is_empty());
}

#[test]
fn detailed_hitbox_follows_the_opaque_outline() {
    // L shape: full top half, left half of the bottom.
    let mut img = transparent(16, 16);
    fill(&mut img, 0..16, 0..8);
    fill(&mut img, 0..8, 8..16);
    let mut loader = MemoryImageLoader::new();
    loader.insert("tiles.png", img);

    let mut doc = SourceDocument::new(1, 1, 16, 16);
    doc.tilesets.push(sheet(1, 1));
    doc.layers.push(grid("ledge", 1, 1, vec![1]));

    let config = MapConfig {
        defaults: LoadOptions {
            hit_box_algorithm: HitBoxAlgorithm::Detailed,
            hit_box_detail: 0.5,
            ..LoadOptions::default()
        },
        ..MapConfig::default()
    };
    let map = LoadedMap::from_document(&doc, &config, &mut loader).unwrap();
    let e = map.sprite_list("ledge").unwrap().get(0).unwrap();
    let hitbox = e.hitbox.clone().expect("opaque tile has a hitbox");
    assert_eq!(hitbox.len(), 5, "{hitbox:?}");
    for corner in [
        vec2(-8.0, 8.0),
        vec2(8.0, 8.0),
        vec2(8.0, 0.0),
        vec2(0.0, -8.0),
        vec2(-8.0, -8.0),
    ] {
        assert!(hitbox.contains(&corner), "missing {corner:?} in {hitbox:?}");
    }
}

#[test]
fn diagonal_flag_transposes_pixel_hitbox() {
    // Opaque strip along the top-left: 8 wide, 4 tall.
    let mut img = transparent(16, 16);
    fill(&mut img, 0..8, 0..4);
    let mut loader = MemoryImageLoader::new();
    loader.insert("tiles.png", img);

    let mut doc = SourceDocument::new(2, 1, 16, 16);
    doc.tilesets.push(sheet(1, 1));
    doc.layers.push(grid("turned", 2, 1, vec![0x2000_0001, 0xA000_0001]));

    let map = LoadedMap::from_document(&doc, &MapConfig::default(), &mut loader).unwrap();
    let list = map.sprite_list("turned").unwrap();

    let transposed = list.get(0).unwrap();
    assert!(transposed.orientation.flip_d && !transposed.orientation.flip_h);
    assert_eq!(
        transposed.hitbox.as_deref(),
        Some(&[vec2(-8.0, 8.0), vec2(-8.0, 0.0), vec2(-4.0, 0.0), vec2(-4.0, 8.0)][..])
    );

    // Diagonal plus horizontal is a clockwise quarter turn: the strip now
    // stands against the right edge.
    let turned = list.get(1).unwrap();
    assert_eq!(turned.gid, 1);
    assert_eq!(
        turned.hitbox.as_deref(),
        Some(&[vec2(8.0, 8.0), vec2(8.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 8.0)][..])
    );
}

#[test]
fn tile_object_gid_flags_are_decoded() {
    let mut doc = doc_2x2();
    let tile = MapObject::new(
        1,
        ObjectShape::Tile { gid: 0x8000_0001 },
        16.0,
        32.0,
        16.0,
        16.0,
    );
    doc.layers.push(Layer::new(
        "objects",
        LayerKind::Objects {
            objects: vec![tile],
        },
    ));

    let map = load(&doc, &MapConfig::default()).unwrap();
    let e = map.sprite_list("objects").unwrap().get(0).unwrap();
    assert_eq!(e.gid, 1);
    assert!(e.orientation.flip_h);
    assert!(!e.orientation.flip_v && !e.orientation.flip_d);
    assert_eq!(e.position, vec2(24.0, 8.0));
    assert_eq!(
        e.hitbox.as_deref(),
        Some(&[vec2(8.0, 8.0), vec2(-8.0, 8.0), vec2(-8.0, -8.0), vec2(8.0, -8.0)][..])
    );
}
