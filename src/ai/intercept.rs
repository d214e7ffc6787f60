//! Intercept solver for constant-speed projectiles
//!
//! Finds the smallest non-negative `t` with
//! `|target + velocity * t - shooter| = speed * t` and the bearing to the
//! point where the target will be at that time. Degenerate inputs fall back
//! to the direct bearing so callers never see NaN.

use glam::Vec2;

use crate::bearing;
use crate::sim::ship_class::WeaponProfile;

/// Below this a quadratic coefficient is treated as zero
const EPSILON: f32 = 1e-6;

/// Where and when a projectile meets its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intercept {
    /// Ticks until impact
    pub time: f32,
    /// Launch direction in radians
    pub direction: f32,
    /// Predicted meeting point
    pub point: Vec2,
}

/// Why a bot held fire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Withhold {
    /// Target is outrunning the projectile
    NoSolution,
    /// Lead distance beyond the effective range
    OutOfRange { needed: f32, limit: f32 },
}

/// A firing decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireSolution {
    Fire { direction: f32, time: f32 },
    Withhold(Withhold),
}

impl FireSolution {
    pub fn direction(&self) -> Option<f32> {
        match self {
            FireSolution::Fire { direction, .. } => Some(*direction),
            FireSolution::Withhold(_) => None,
        }
    }
}

/// Solve the intercept for a projectile of `speed` units per tick
pub fn solve_intercept(
    shooter: Vec2,
    target: Vec2,
    target_velocity: Vec2,
    speed: f32,
) -> Option<Intercept> {
    let offset = target - shooter;
    let c = offset.length_squared();
    if c < EPSILON {
        // Already on top of it
        return Some(Intercept {
            time: 0.0,
            direction: bearing(shooter, target),
            point: target,
        });
    }
    if !speed.is_finite() || speed < EPSILON {
        return None;
    }

    let a = target_velocity.length_squared() - speed * speed;
    let b = 2.0 * offset.dot(target_velocity);

    let time = if a.abs() < EPSILON {
        // Target exactly as fast as the projectile: linear, only if closing
        if b >= -EPSILON {
            return None;
        }
        -c / b
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let t1 = (-b - root) / (2.0 * a);
        let t2 = (-b + root) / (2.0 * a);
        match (t1 >= 0.0, t2 >= 0.0) {
            (true, true) => t1.min(t2),
            (true, false) => t1,
            (false, true) => t2,
            (false, false) => return None,
        }
    };

    if !time.is_finite() {
        return None;
    }
    let point = target + target_velocity * time;
    let direction = bearing(shooter, point);
    Some(Intercept {
        time,
        direction: if direction.is_finite() {
            direction
        } else {
            bearing(shooter, target)
        },
        point,
    })
}

/// Decide whether and where to fire a projectile weapon.
///
/// Shots whose lead distance exceeds the weapon's effective range are held:
/// they would burn out before arriving.
pub fn aim_weapon(
    shooter: Vec2,
    target: Vec2,
    target_velocity: Vec2,
    weapon: &WeaponProfile,
) -> FireSolution {
    let Some(intercept) = solve_intercept(shooter, target, target_velocity, weapon.speed) else {
        return FireSolution::Withhold(Withhold::NoSolution);
    };
    let needed = weapon.speed * intercept.time;
    let limit = weapon.effective_range();
    if needed > limit {
        return FireSolution::Withhold(Withhold::OutOfRange { needed, limit });
    }
    FireSolution::Fire {
        direction: intercept.direction,
        time: intercept.time,
    }
}

/// Direct-bearing aim for instant weapons
pub fn aim_direct(shooter: Vec2, target: Vec2, range: f32) -> FireSolution {
    let distance = shooter.distance(target);
    if distance > range {
        return FireSolution::Withhold(Withhold::OutOfRange {
            needed: distance,
            limit: range,
        });
    }
    FireSolution::Fire {
        direction: bearing(shooter, target),
        time: 0.0,
    }
}
