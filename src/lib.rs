//! Star Arena - authoritative simulation for a multiplayer space-combat arena
//!
//! Core modules:
//! - `sim`: Deterministic world model and fixed-tick pipeline
//! - `ai`: Bot targeting, maneuvering and intercept aiming
//! - `server`: Lock discipline, tick driver and snapshot hand-off
//! - `settings`: Server configuration

pub mod ai;
pub mod server;
pub mod settings;
pub mod sim;

pub use server::{GameServer, Liveness};
pub use settings::Settings;

use glam::Vec2;

/// Galaxy and timing constants
pub mod consts {
    /// Logical updates per second
    pub const TICKS_PER_SECOND: u32 = 10;

    /// Galaxy is a square of this side length, origin at a corner
    pub const GALAXY_WIDTH: f32 = 100_000.0;

    /// Galaxy units travelled per tick per warp of speed
    pub const WARP1: f32 = 20.0;

    /// Direction units in a full circle
    pub const DIRECTIONS: u32 = 256;

    /// Denominator for turn/speed/repair residues (thousandths)
    pub const RESIDUE_SCALE: u32 = 1000;

    /// Torpedo/plasma proximity hit radius
    pub const HIT_RADIUS: f32 = 350.0;

    /// Base phaser range, scaled by class phaser damage / 100
    pub const PHASER_BASE_RANGE: f32 = 6000.0;
    /// Max distance from the phaser ray for a ship to be hit
    pub const PHASER_SHIP_TOLERANCE: f32 = 390.0;
    /// Max distance from the phaser ray for a plasma to be zapped
    pub const PHASER_PLASMA_TOLERANCE: f32 = 1500.0;

    /// Enemy torps within this distance of a detonating ship explode
    pub const DETONATE_DIST: f32 = 1700.0;

    /// Base tractor range, scaled by class tractor range factor
    pub const TRACTOR_BASE_RANGE: f32 = 6000.0;

    /// Ship explosion damage falloff distance
    pub const EXPLOSION_DIST: f32 = 3000.0;
    /// Ticks a ship spends exploding before it is dead
    pub const EXPLODE_TICKS: u32 = 10;

    /// Ticks between phaser shots
    pub const PHASER_RELOAD: u32 = 10;

    /// Maximum torpedoes in flight per ship
    pub const MAX_TORPS: usize = 8;
    /// Maximum plasmas in flight per ship
    pub const MAX_PLASMAS: usize = 1;

    /// Orbit entry distance from planet center
    pub const ENTER_ORBIT_DIST: f32 = 900.0;
    /// Orbit radius
    pub const ORBIT_DIST: f32 = 800.0;
    /// Maximum warp at which orbit can be entered
    pub const ORBIT_MAX_SPEED: u32 = 2;
    /// Direction units advanced per tick while orbiting
    pub const ORBIT_TURN: u8 = 2;

    /// Planet body radius; projectiles crossing it detonate
    pub const PLANET_RADIUS: f32 = 500.0;
    /// Planet defensive fire range
    pub const PLANET_FIRE_DIST: f32 = 1500.0;
    /// Scouting distance at which a team learns about a planet
    pub const SCOUT_DIST: f32 = 10_000.0;

    /// Cloaked enemies closer than this are still detected
    pub const CLOAK_DETECT_DIST: f32 = 2000.0;

    /// Ticks between army transfers while beaming
    pub const BEAM_INTERVAL: u64 = 8;
    /// Ticks between bombing runs
    pub const BOMB_INTERVAL: u64 = 10;
    /// Ticks between planet defensive volleys
    pub const PLANET_FIRE_INTERVAL: u64 = 5;
    /// Ticks between army growth on owned planets
    pub const POP_INTERVAL: u64 = 100;

    /// Bombing never reduces a planet below this many armies
    pub const BOMB_FLOOR: u32 = 4;
    /// Armies an attacker must hold to flip a 0-army planet
    pub const CAPTURE_MIN_ARMIES: u32 = 1;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert a 256-unit direction to radians (0 = +x, counter-clockwise)
#[inline]
pub fn dir_to_radians(dir: u8) -> f32 {
    dir as f32 * std::f32::consts::TAU / consts::DIRECTIONS as f32
}

/// Convert radians to the nearest 256-unit direction
#[inline]
pub fn radians_to_dir(angle: f32) -> u8 {
    let turns = normalize_angle(angle).rem_euclid(std::f32::consts::TAU) / std::f32::consts::TAU;
    ((turns * consts::DIRECTIONS as f32).round() as u32 % consts::DIRECTIONS) as u8
}

/// Unit vector for a 256-unit direction
#[inline]
pub fn dir_vector(dir: u8) -> Vec2 {
    Vec2::from_angle(dir_to_radians(dir))
}

/// Bearing in radians from `from` to `to`. Coincident points give 0.
#[inline]
pub fn bearing(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_dir_round_trip_cardinals() {
        assert_eq!(radians_to_dir(0.0), 0);
        assert_eq!(radians_to_dir(FRAC_PI_2), 64);
        assert_eq!(radians_to_dir(PI), 128);
        assert_eq!(radians_to_dir(-FRAC_PI_2), 192);
        assert!((dir_to_radians(64) - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_degenerate_is_finite() {
        let p = Vec2::new(500.0, 500.0);
        assert_eq!(bearing(p, p), 0.0);
        assert!((bearing(Vec2::ZERO, Vec2::new(0.0, 10.0)) - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_angle_rejects_nan() {
        assert_eq!(normalize_angle(f32::NAN), 0.0);
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
    }
}
