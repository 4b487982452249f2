/// The pipe: a polyline from the well anchor to the drill head.
///
/// Layout of `points`:
///   `[anchor]`                       : nothing dug yet
///   `[anchor, corner.., head]`       : dug; the last point is the head
///
/// Invariants:
///   - every consecutive pair is axis-aligned (never diagonal)
///   - interior points are corners, recorded at exact tile centers
///   - the head is moved in place while travelling, never appended
///
/// Growth and retraction are symmetric: a turn adds one corner,
/// retracting past that corner removes it again.

use glam::Vec2;

use super::geom::{axis_direction, point_segment_distance};
use super::tile::Direction;

#[derive(Clone, Debug, PartialEq)]
pub struct PathPipe {
    points: Vec<Vec2>,
}

impl PathPipe {
    pub fn new(anchor: Vec2) -> Self {
        PathPipe { points: vec![anchor] }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Only the anchor is left: nothing to retract, nothing to hit.
    pub fn is_anchored_only(&self) -> bool {
        self.points.len() <= 1
    }

    pub fn anchor(&self) -> Vec2 {
        self.points[0]
    }

    pub fn head(&self) -> Vec2 {
        self.points[self.points.len() - 1]
    }

    /// Direction of the last non-degenerate segment.
    pub fn terminal_direction(&self) -> Option<Direction> {
        self.points.windows(2)
            .rev()
            .find_map(|w| axis_direction(w[0], w[1]))
    }

    /// Start a leg from the current head toward `target` (a tile center).
    ///
    /// Straight continuation keeps the point count; a turn freezes the
    /// current head as a corner and starts a new head on top of it.
    /// The first leg out of the anchor just spawns the head.
    pub fn extend_toward(&mut self, target: Vec2) {
        let head = self.head();
        if self.points.len() == 1 {
            self.points.push(head);
            return;
        }
        let Some(leg) = axis_direction(head, target) else {
            return;
        };
        match self.terminal_direction() {
            Some(dir) if dir == leg => {}
            None => {}
            Some(_) => self.points.push(head),
        }
    }

    /// Move the head point in place.
    pub fn set_head(&mut self, p: Vec2) {
        if self.points.len() >= 2 {
            let last = self.points.len() - 1;
            self.points[last] = p;
        }
    }

    /// Slide the head back toward the previous waypoint by `distance`.
    ///
    /// If the waypoint is within reach the head snaps onto it and the old
    /// head is popped; the leftover distance is dropped, so one call does
    /// at most one shrink. Returns true when a point was removed.
    pub fn retract_step(&mut self, distance: f32) -> bool {
        let n = self.points.len();
        if n < 2 {
            return false;
        }
        let head = self.points[n - 1];
        let prev = self.points[n - 2];
        let gap = head.distance(prev);
        if gap <= distance {
            self.points.pop();
            true
        } else {
            let toward = (prev - head) / gap;
            self.points[n - 1] = head + toward * distance;
            false
        }
    }

    /// Minimum distance from `p` to any pipe segment; `None` with no segments.
    pub fn distance_to(&self, p: Vec2) -> Option<f32> {
        self.points.windows(2)
            .map(|w| point_segment_distance(p, w[0], w[1]))
            .reduce(f32::min)
    }

    /// Total length along the polyline.
    pub fn length(&self) -> f32 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.points.windows(2).all(|w| {
            let d = w[1] - w[0];
            d.x.abs() <= f32::EPSILON || d.y.abs() <= f32::EPSILON
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    /// Walk the head to `target` the way the drill does: open a leg,
    /// then move the head in place.
    fn walk(pipe: &mut PathPipe, target: Vec2) {
        pipe.extend_toward(target);
        pipe.set_head(target);
    }

    #[test]
    fn first_leg_spawns_head() {
        let mut p = PathPipe::new(v(5.0, 5.0));
        assert!(p.is_anchored_only());
        walk(&mut p, v(5.0, 15.0));
        assert_eq!(p.points(), &[v(5.0, 5.0), v(5.0, 15.0)]);
        assert_eq!(p.terminal_direction(), Some(Direction::Down));
    }

    #[test]
    fn straight_run_does_not_add_points() {
        let mut p = PathPipe::new(v(5.0, 5.0));
        walk(&mut p, v(5.0, 15.0));
        walk(&mut p, v(5.0, 25.0));
        walk(&mut p, v(5.0, 35.0));
        assert_eq!(p.len(), 2);
        assert_eq!(p.head(), v(5.0, 35.0));
    }

    #[test]
    fn turn_records_corner_at_tile_center() {
        let mut p = PathPipe::new(v(5.0, 5.0));
        walk(&mut p, v(5.0, 15.0));
        p.extend_toward(v(15.0, 15.0));
        // Mid-leg the head moves while the corner stays put.
        p.set_head(v(9.0, 15.0));
        assert_eq!(p.points(), &[v(5.0, 5.0), v(5.0, 15.0), v(9.0, 15.0)]);
        assert!(p.is_axis_aligned());
        p.set_head(v(15.0, 15.0));
        assert_eq!(p.terminal_direction(), Some(Direction::Right));
    }

    #[test]
    fn retract_slides_then_pops() {
        let mut p = PathPipe::new(v(0.0, 0.0));
        walk(&mut p, v(0.0, 10.0));
        p.extend_toward(v(10.0, 10.0));
        p.set_head(v(10.0, 10.0));
        assert_eq!(p.len(), 3);

        assert!(!p.retract_step(4.0));
        assert_eq!(p.head(), v(6.0, 10.0));
        // 6 left to the corner; a 7-step snaps and drops the excess.
        assert!(p.retract_step(7.0));
        assert_eq!(p.len(), 2);
        assert_eq!(p.head(), v(0.0, 10.0));
        assert!(p.retract_step(100.0));
        assert!(p.is_anchored_only());
        assert!(!p.retract_step(1.0));
    }

    #[test]
    fn grow_and_retract_point_counts_mirror() {
        // A -> B -> C with a turn at B.
        let mut p = PathPipe::new(v(0.0, 0.0));
        let mut grow = vec![p.len()];
        for target in [v(0.0, 10.0), v(0.0, 20.0), v(10.0, 20.0), v(20.0, 20.0)] {
            walk(&mut p, target);
            grow.push(p.len());
        }
        let mut shrink = vec![p.len()];
        while !p.is_anchored_only() {
            // Exactly one tile per step.
            p.retract_step(10.0);
            shrink.push(p.len());
        }
        assert_eq!(grow, vec![1, 2, 2, 3, 3]);
        // Retraction pops on arrival at each waypoint, so counts step down
        // at the same positions growth stepped up.
        let mirrored: Vec<usize> = grow.iter().rev().copied().collect();
        assert_eq!(shrink, mirrored);
        assert_eq!(p.points(), &[v(0.0, 0.0)]);
    }

    #[test]
    fn distance_to_segments() {
        let mut p = PathPipe::new(v(0.0, 0.0));
        assert_eq!(p.distance_to(v(1.0, 1.0)), None);
        walk(&mut p, v(0.0, 10.0));
        p.extend_toward(v(10.0, 10.0));
        p.set_head(v(10.0, 10.0));
        assert!((p.distance_to(v(5.0, 13.0)).unwrap() - 3.0).abs() < 1e-5);
        assert!((p.distance_to(v(-2.0, 5.0)).unwrap() - 2.0).abs() < 1e-5);
        assert!((p.length() - 20.0).abs() < 1e-5);
    }
}
