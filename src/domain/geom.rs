/// Planar helpers shared by the pipe, the drill head and the resolver.

use glam::Vec2;

use super::tile::Direction;

/// Shortest distance from `p` to the segment `a`-`b`.
/// A degenerate segment collapses to point distance.
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Axis direction of travel from `a` to `b`.
/// `None` for coincident points or a diagonal.
pub fn axis_direction(a: Vec2, b: Vec2) -> Option<Direction> {
    let d = b - a;
    let horizontal = d.x.abs() > f32::EPSILON;
    let vertical = d.y.abs() > f32::EPSILON;
    match (horizontal, vertical) {
        (true, false) => Some(if d.x > 0.0 { Direction::Right } else { Direction::Left }),
        (false, true) => Some(if d.y > 0.0 { Direction::Down } else { Direction::Up }),
        _ => None,
    }
}
