//! Hitboxes derived from pixels, for tiles without authored collision shapes.
//!
//! All points are relative to the centre of the source region, Y up, in
//! unscaled pixels.

use crate::config::HitBoxAlgorithm;
use crate::tileset::Orientation;
use macroquad::prelude::*;

/// Full rectangle of a `w` x `h` region: top-left, top-right, bottom-right,
/// bottom-left.
pub fn full_rect(w: f32, h: f32) -> Vec<Vec2> {
    let (hw, hh) = (w / 2.0, h / 2.0);
    vec![vec2(-hw, hh), vec2(hw, hh), vec2(hw, -hh), vec2(-hw, -hh)]
}

/// Apply Tiled orientation to centred Y-up points: diagonal first, then
/// horizontal, then vertical.
pub fn orient(points: &mut [Vec2], o: Orientation) {
    for p in points.iter_mut() {
        if o.flip_d {
            *p = vec2(-p.y, -p.x);
        }
        if o.flip_h {
            p.x = -p.x;
        }
        if o.flip_v {
            p.y = -p.y;
        }
    }
}

/// Compute a hitbox for the `source` region of `image`.
///
/// `None` means the region has no opaque pixel at all. Pixel strategies fall
/// back to the full rectangle when no image is available.
pub fn compute(
    algorithm: HitBoxAlgorithm,
    detail: f32,
    image: Option<&Image>,
    source: Rect,
    orientation: Orientation,
) -> Option<Vec<Vec2>> {
    let mut points = match (algorithm, image) {
        (HitBoxAlgorithm::None, _) | (_, None) => full_rect(source.w, source.h),
        (HitBoxAlgorithm::Simple, Some(img)) => simple(img, source)?,
        (HitBoxAlgorithm::Detailed, Some(img)) => detailed(img, source, detail)?,
    };
    orient(&mut points, orientation);
    Some(points)
}

/// Opaque test with the region clamped to the image.
fn opaque(img: &Image, x: u32, y: u32) -> bool {
    if x >= img.width as u32 || y >= img.height as u32 {
        return false;
    }
    let idx = (y as usize * img.width as usize + x as usize) * 4 + 3;
    img.bytes.get(idx).is_some_and(|a| *a > 0)
}

/// Per row of the region, leftmost and rightmost opaque columns.
fn row_spans(img: &Image, source: Rect) -> Vec<(u32, u32, u32)> {
    let (x0, y0) = (source.x as u32, source.y as u32);
    let (w, h) = (source.w as u32, source.h as u32);
    (0..h)
        .filter_map(|ry| {
            let mut cols = (0..w).filter(|&rx| opaque(img, x0 + rx, y0 + ry));
            let first = cols.next()?;
            let last = cols.last().unwrap_or(first);
            Some((ry, first, last))
        })
        .collect()
}

/// Region pixel coordinates (Y down, origin top-left) to centred Y up.
fn centred(p: Vec2, source: Rect) -> Vec2 {
    vec2(p.x - source.w / 2.0, -(p.y - source.h / 2.0))
}

fn simple(img: &Image, source: Rect) -> Option<Vec<Vec2>> {
    let spans = row_spans(img, source);
    let top = spans.first()?.0 as f32;
    let bottom = spans.last()?.0 as f32 + 1.0;
    let left = spans.iter().map(|s| s.1).min()? as f32;
    let right = spans.iter().map(|s| s.2).max()? as f32 + 1.0;

    Some(
        [
            vec2(left, top),
            vec2(right, top),
            vec2(right, bottom),
            vec2(left, bottom),
        ]
        .into_iter()
        .map(|p| centred(p, source))
        .collect(),
    )
}

fn detailed(img: &Image, source: Rect, detail: f32) -> Option<Vec<Vec2>> {
    let spans = row_spans(img, source);
    if spans.is_empty() {
        return None;
    }
    let mut corners = Vec::with_capacity(spans.len() * 4);
    for (y, l, r) in spans {
        let (y, l, r) = (y as f32, l as f32, r as f32 + 1.0);
        corners.extend([vec2(l, y), vec2(l, y + 1.0), vec2(r, y), vec2(r, y + 1.0)]);
    }
    let hull = convex_hull(corners);
    let simplified = simplify(hull, detail);
    Some(simplified.into_iter().map(|p| centred(p, source)).collect())
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Monotone chain hull; collinear points are dropped.
pub fn convex_hull(mut pts: Vec<Vec2>) -> Vec<Vec2> {
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let mut hull: Vec<Vec2> = Vec::with_capacity(pts.len() * 2);
    for pass in 0..2 {
        let start = hull.len();
        let iter: Box<dyn Iterator<Item = &Vec2>> = if pass == 0 {
            Box::new(pts.iter())
        } else {
            Box::new(pts.iter().rev())
        };
        for &p in iter {
            while hull.len() >= start + 2
                && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
            {
                hull.pop();
            }
            hull.push(p);
        }
        hull.pop();
    }
    hull
}

/// Distance from `p` to the line through `a` and `b`.
fn line_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let len = (b - a).length();
    if len == 0.0 {
        return (p - a).length();
    }
    cross(a, b, p).abs() / len
}

/// Drop vertices closer than `tolerance` to the segment joining their
/// neighbours, smallest deviation first, never going below a triangle.
pub fn simplify(mut pts: Vec<Vec2>, tolerance: f32) -> Vec<Vec2> {
    while pts.len() > 3 {
        let n = pts.len();
        let (idx, dist) = (0..n)
            .map(|i| {
                let d = line_distance(pts[i], pts[(i + n - 1) % n], pts[(i + 1) % n]);
                (i, d)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, f32::INFINITY));
        if dist >= tolerance {
            break;
        }
        pts.remove(idx);
    }
    pts
}
