use macroquad::prelude::*;
use macroquad_tiled_scene::{load_tilemap, MapConfig, RenderableEntity, Scene};
use std::collections::HashMap;
use std::path::PathBuf;

fn window_conf() -> Conf {
    Conf {
        window_title: "Render Map".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

async fn texture_for(
    cache: &mut HashMap<PathBuf, Texture2D>,
    entity: &RenderableEntity,
) -> Option<Texture2D> {
    let region = entity.texture.as_ref()?;
    if let Some(tex) = cache.get(&region.path) {
        return Some(tex.clone());
    }
    let tex = match &region.image {
        Some(image) => Texture2D::from_image(image),
        None => match load_texture(&region.path.to_string_lossy()).await {
            Ok(t) => t,
            Err(e) => {
                eprintln!("{}: {e}", region.path.display());
                return None;
            }
        },
    };
    tex.set_filter(FilterMode::Nearest);
    cache.insert(region.path.clone(), tex.clone());
    Some(tex)
}

#[macroquad::main(window_conf)]
async fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "assets/map.json".to_owned());
    let map = match load_tilemap(&path, &MapConfig::with_scaling(2.0)) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("{e:#}");
            return;
        }
    };
    for w in map.warnings() {
        eprintln!("warning: {w}");
    }

    let background = map.background_color.unwrap_or(BLACK);
    let height = map.pixel_size().y;
    let records: Vec<Vec<Vec2>> = map
        .object_lists
        .iter()
        .flat_map(|(_, list)| list.iter().map(|r| r.points.clone()))
        .collect();
    let scene = Scene::from_map(map);

    let mut textures = HashMap::new();
    let mut draw_list = Vec::new();
    for entity in scene.entities() {
        draw_list.push((entity, texture_for(&mut textures, entity).await));
    }

    // Y up in the map, Y down on screen
    let to_screen = |p: Vec2| vec2(p.x, height - p.y);
    let mut show_hitboxes = false;

    loop {
        if is_key_pressed(KeyCode::H) {
            show_hitboxes = !show_hitboxes;
        }
        clear_background(background);

        for (entity, texture) in &draw_list {
            let centre = to_screen(entity.position);
            let top_left = centre - entity.size / 2.0;
            let mut tint = entity.color;
            tint.a = entity.alpha as f32 / 255.0;
            match (texture, &entity.texture) {
                (Some(tex), Some(region)) => draw_texture_ex(
                    tex,
                    top_left.x,
                    top_left.y,
                    tint,
                    DrawTextureParams {
                        dest_size: Some(entity.size),
                        source: Some(region.source),
                        rotation: -entity.rotation,
                        flip_x: entity.orientation.flip_h,
                        flip_y: entity.orientation.flip_v,
                        ..Default::default()
                    },
                ),
                _ => draw_rectangle_lines(
                    top_left.x,
                    top_left.y,
                    entity.size.x,
                    entity.size.y,
                    1.0,
                    MAGENTA,
                ),
            }

            if show_hitboxes {
                if let Some(points) = entity.world_hitbox() {
                    draw_outline(&points, to_screen, GREEN);
                }
            }
        }

        if show_hitboxes {
            for points in &records {
                draw_outline(points, to_screen, YELLOW);
            }
        }

        draw_text(
            &format!("FPS: {}  [H] hitboxes", get_fps()),
            20.0,
            30.0,
            30.0,
            RED,
        );
        next_frame().await;
    }
}

fn draw_outline(points: &[Vec2], to_screen: impl Fn(Vec2) -> Vec2, color: Color) {
    if let [p] = points {
        let p = to_screen(*p);
        draw_circle(p.x, p.y, 3.0, color);
        return;
    }
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        let (a, b) = (to_screen(*a), to_screen(b));
        draw_line(a.x, a.y, b.x, b.y, 1.0, color);
    }
}
