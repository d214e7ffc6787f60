//! Proximity and line tests
//!
//! Projectiles move up to 400 units a tick while the hit radius is 350, so a
//! point test at the end position alone would let fast torpedoes tunnel
//! through ships. Hits are tested against the swept segment instead.

use glam::Vec2;

/// Result of a proximity check
#[derive(Debug, Clone, Copy)]
pub struct ProximityResult {
    /// Whether the point came within range
    pub hit: bool,
    /// Closest point on the swept segment
    pub point: Vec2,
    /// Distance from the target to `point`
    pub distance: f32,
}

impl ProximityResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            distance: f32::INFINITY,
        }
    }
}

/// Closest point on segment `a..b` to `p`
pub fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let line_vec = b - a;
    let line_len_sq = line_vec.length_squared();
    if line_len_sq < 0.0001 {
        return a; // Degenerate segment
    }
    let t = ((p - a).dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
    a + line_vec * t
}

/// Did something moving from `from` to `to` pass within `radius` of `target`?
pub fn swept_proximity(from: Vec2, to: Vec2, target: Vec2, radius: f32) -> ProximityResult {
    let point = closest_on_segment(target, from, to);
    let distance = (target - point).length();
    if distance < radius {
        ProximityResult {
            hit: true,
            point,
            distance,
        }
    } else {
        ProximityResult::miss()
    }
}

/// Project `point` onto a ray.
///
/// Returns `(along, perpendicular)` when the projection falls in front of
/// the origin, `None` when it is behind. `unit_dir` must be normalized.
pub fn ray_offset(origin: Vec2, unit_dir: Vec2, point: Vec2) -> Option<(f32, f32)> {
    let rel = point - origin;
    let along = rel.dot(unit_dir);
    if along < 0.0 {
        return None;
    }
    let perp = rel.perp_dot(unit_dir).abs();
    Some((along, perp))
}

/// Is `point` inside the galaxy square?
#[inline]
pub fn in_galaxy(point: Vec2, width: f32) -> bool {
    (0.0..=width).contains(&point.x) && (0.0..=width).contains(&point.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swept_hit_catches_tunnelling() {
        // Endpoints both 400 away from the target, midpoint passes through it
        let result = swept_proximity(
            Vec2::new(-400.0, 0.0),
            Vec2::new(400.0, 0.0),
            Vec2::ZERO,
            350.0,
        );
        assert!(result.hit);
        assert!(result.distance < 0.001);
    }

    #[test]
    fn test_swept_miss() {
        let result = swept_proximity(
            Vec2::new(0.0, 400.0),
            Vec2::new(400.0, 400.0),
            Vec2::ZERO,
            350.0,
        );
        assert!(!result.hit);
    }

    #[test]
    fn test_degenerate_segment_is_point_test() {
        let p = Vec2::new(100.0, 100.0);
        assert_eq!(closest_on_segment(Vec2::new(100.0, 400.0), p, p), p);
        let result = swept_proximity(p, p, Vec2::new(100.0, 400.0), 350.0);
        assert!(result.hit);
        assert!((result.distance - 300.0).abs() < 0.001);
    }

    #[test]
    fn test_ray_offset() {
        let (along, perp) =
            ray_offset(Vec2::ZERO, Vec2::X, Vec2::new(3000.0, -200.0)).expect("in front");
        assert!((along - 3000.0).abs() < 0.001);
        assert!((perp - 200.0).abs() < 0.001);
        assert!(ray_offset(Vec2::ZERO, Vec2::X, Vec2::new(-10.0, 0.0)).is_none());
    }

    #[test]
    fn test_in_galaxy() {
        assert!(in_galaxy(Vec2::new(0.0, 100.0), 1000.0));
        assert!(!in_galaxy(Vec2::new(-1.0, 100.0), 1000.0));
        assert!(!in_galaxy(Vec2::new(10.0, 1000.5), 1000.0));
    }
}
