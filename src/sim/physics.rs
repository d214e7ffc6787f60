//! Ship movement integrator
//!
//! Heading and speed approach their desired values through integer residues
//! carried between ticks, so slow turn rates and small acceleration steps
//! still make progress instead of truncating to zero every tick.

use super::state::{Ship, World};
use crate::consts::{GALAXY_WIDTH, RESIDUE_SCALE, WARP1};
use crate::dir_vector;

/// Advance every free-flying ship by one tick
pub fn integrate(world: &mut World) {
    for ship in world.ships.iter_mut() {
        if !ship.is_alive() || ship.orbiting.is_some() {
            continue;
        }
        turn(ship);
        accelerate(ship);
        translate(ship);
    }
}

/// Rotate toward the desired heading
pub fn turn(ship: &mut Ship) {
    if ship.dir == ship.desired_dir {
        ship.sub_dir = 0;
        return;
    }
    if ship.speed == 0 {
        ship.dir = ship.desired_dir;
        ship.sub_dir = 0;
        return;
    }

    ship.sub_dir += ship.stats().turn_rate / ship.speed.max(1);
    let steps = ship.sub_dir / RESIDUE_SCALE;
    ship.sub_dir %= RESIDUE_SCALE;
    if steps == 0 {
        return;
    }

    // Shortest way round; exactly opposite turns clockwise
    let delta = ship.desired_dir.wrapping_sub(ship.dir) as i8;
    let remaining = delta.unsigned_abs() as u32;
    if steps >= remaining {
        ship.dir = ship.desired_dir;
        ship.sub_dir = 0;
    } else if delta > 0 {
        ship.dir = ship.dir.wrapping_add(steps as u8);
    } else {
        ship.dir = ship.dir.wrapping_sub(steps as u8);
    }
}

/// Target speed after damage, overheat and repair limits
pub fn speed_limit(ship: &Ship) -> u32 {
    if ship.repairing || ship.engines_overheated {
        return 0;
    }
    ship.desired_speed
        .min(ship.stats().effective_max_speed(ship.hull_damage))
}

/// Move speed toward its limit by class acceleration steps
pub fn accelerate(ship: &mut Ship) {
    let stats = ship.stats();
    let target = speed_limit(ship);

    if target > ship.speed {
        ship.sub_speed += stats.accel;
    } else if target < ship.speed {
        ship.sub_speed -= stats.decel;
    } else {
        ship.sub_speed = 0;
        return;
    }

    let scale = RESIDUE_SCALE as i32;
    if ship.sub_speed >= scale {
        let steps = (ship.sub_speed / scale) as u32;
        ship.sub_speed %= scale;
        ship.speed += steps;
        if ship.speed >= target {
            ship.speed = target;
            ship.sub_speed = 0;
        }
    } else if ship.sub_speed <= -scale {
        let steps = (-ship.sub_speed / scale) as u32;
        ship.sub_speed = -(-ship.sub_speed % scale);
        ship.speed = ship.speed.saturating_sub(steps);
        if ship.speed <= target {
            ship.speed = target;
            ship.sub_speed = 0;
        }
    }
}

/// Move along the heading, bouncing off galaxy edges
pub fn translate(ship: &mut Ship) {
    if ship.speed == 0 {
        return;
    }
    ship.pos += dir_vector(ship.dir) * (ship.speed as f32 * WARP1);

    // Mirror x velocity: theta -> pi - theta
    if ship.pos.x < 0.0 {
        ship.pos.x = -ship.pos.x;
        bounce(ship, |d| 128u8.wrapping_sub(d));
    } else if ship.pos.x > GALAXY_WIDTH {
        ship.pos.x = 2.0 * GALAXY_WIDTH - ship.pos.x;
        bounce(ship, |d| 128u8.wrapping_sub(d));
    }
    // Mirror y velocity: theta -> -theta
    if ship.pos.y < 0.0 {
        ship.pos.y = -ship.pos.y;
        bounce(ship, |d| 0u8.wrapping_sub(d));
    } else if ship.pos.y > GALAXY_WIDTH {
        ship.pos.y = 2.0 * GALAXY_WIDTH - ship.pos.y;
        bounce(ship, |d| 0u8.wrapping_sub(d));
    }
}

fn bounce(ship: &mut Ship, mirror: impl Fn(u8) -> u8) {
    ship.dir = mirror(ship.dir);
    ship.desired_dir = ship.dir;
    ship.sub_dir = 0;
}
