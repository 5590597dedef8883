//! Shape → point sequence conversion.
//!
//! Source shapes are in editor pixels with Y growing downward. Output points
//! are `source - anchor` with Y negated, so they sit in a Y-up cartesian frame.

use crate::document::{MapObject, ObjectShape};
use macroquad::prelude::*;
use std::f32::consts::TAU;

/// Ellipses are approximated with this many points.
pub const ELLIPSE_SEGMENTS: usize = 8;

/// Why a shape produced no geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// Rectangle or ellipse without an extent
    #[error("{0} has no width or height")]
    MissingSize(&'static str),
    /// Shape kind that has no outline
    #[error("{0} shapes are not supported")]
    Unsupported(&'static str),
}

/// A reconstructed point sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    /// Points in output space
    pub points: Vec<Vec2>,
    /// Whether the last point connects back to the first
    pub closed: bool,
}

#[inline]
fn to_output(p: Vec2, anchor: Vec2) -> Vec2 {
    let d = p - anchor;
    vec2(d.x, -d.y)
}

/// Four corners: top-left, top-right, bottom-right, bottom-left of source space.
pub fn rectangle(origin: Vec2, size: Option<Vec2>, anchor: Vec2) -> Result<Outline, GeometryError> {
    let size = size.ok_or(GeometryError::MissingSize("rectangle"))?;
    let end = origin + size;
    let points = [
        vec2(origin.x, origin.y),
        vec2(end.x, origin.y),
        vec2(end.x, end.y),
        vec2(origin.x, end.y),
    ]
    .into_iter()
    .map(|p| to_output(p, anchor))
    .collect();
    Ok(Outline {
        points,
        closed: true,
    })
}

/// Polygon/polyline points are relative to `origin`. A repeated closing point
/// is dropped.
pub fn poly(origin: Vec2, points: &[Vec2], anchor: Vec2, closed: bool) -> Outline {
    let mut out: Vec<Vec2> = points
        .iter()
        .map(|p| to_output(origin + *p, anchor))
        .collect();
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    Outline {
        points: out,
        closed,
    }
}

/// Eight-point ellipse inscribed in the box at `origin` of `size`.
pub fn ellipse(origin: Vec2, size: Option<Vec2>, anchor: Vec2) -> Result<Outline, GeometryError> {
    let size = size.ok_or(GeometryError::MissingSize("ellipse"))?;
    let hw = size.x / 2.0;
    let hh = size.y / 2.0;
    let c = origin + vec2(hw, hh) - anchor;

    let points = (0..ELLIPSE_SEGMENTS)
        .map(|step| {
            let angle = step as f32 / ELLIPSE_SEGMENTS as f32 * TAU;
            vec2(hw * angle.cos() + c.x, -(hh * angle.sin() + c.y))
        })
        .collect();
    Ok(Outline {
        points,
        closed: true,
    })
}

/// Reconstruct any object shape. Tile and text objects have no outline.
pub fn reconstruct(object: &MapObject, anchor: Vec2) -> Result<Outline, GeometryError> {
    let origin = object.origin();
    match &object.shape {
        ObjectShape::Rectangle => rectangle(origin, object.size(), anchor),
        ObjectShape::Ellipse => ellipse(origin, object.size(), anchor),
        ObjectShape::Polygon(points) => Ok(poly(origin, points, anchor, true)),
        ObjectShape::Polyline(points) => Ok(poly(origin, points, anchor, false)),
        ObjectShape::Point => Ok(Outline {
            points: vec![to_output(origin, anchor)],
            closed: false,
        }),
        ObjectShape::Tile { .. } => Err(GeometryError::Unsupported("tile")),
        ObjectShape::Text => Err(GeometryError::Unsupported("text")),
    }
}

/// Axis-aligned extent of a point set as `(min, max)`.
pub fn bounds(points: &[Vec2]) -> Option<(Vec2, Vec2)> {
    let first = *points.first()?;
    Some(
        points
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
    )
}
