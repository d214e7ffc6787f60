//! Per-tick ship upkeep
//!
//! Fuel, temperatures, repair, force beams and the life cycle from
//! outfitting through explosion to respawn.

use glam::Vec2;
use rand::Rng;

use super::damage::{falloff, strike};
use super::galaxy::home_position;
use super::state::{ForceBeam, Ship, ShipId, ShipStatus, SimEvent, World};
use crate::consts::*;
use crate::radians_to_dir;

/// Damage at the heart of a ship explosion
pub const SHIP_EXPLOSION_DAMAGE: u32 = 100;
/// Spawn scatter around the home world
const SPAWN_SCATTER: f32 = 3000.0;

/// Run all ship systems for one tick
pub fn update(world: &mut World) {
    launch_outfitted(world);
    for id in 0..world.ships.len() {
        if world.ships[id].is_alive() {
            let (fuel_bonus, repair_bonus) = orbit_bonuses(world, id);
            let ship = &mut world.ships[id];
            burn_fuel(ship, fuel_bonus);
            cool(ship);
            repair(ship, repair_bonus);
            ship.phaser_reload = ship.phaser_reload.saturating_sub(1);
        }
    }
    force_beams(world);
    explosions(world);
    respawns(world);
}

/// Doubling factors from orbiting an own fuel or repair planet
fn orbit_bonuses(world: &World, id: ShipId) -> (u32, u32) {
    let ship = &world.ships[id];
    let Some(planet) = ship.orbiting.and_then(|p| world.planets.get(p)) else {
        return (1, 1);
    };
    if planet.owner != Some(ship.team) {
        return (1, 1);
    }
    (
        if planet.flags.fuel { 2 } else { 1 },
        if planet.flags.repair { 2 } else { 1 },
    )
}

/// Put outfitting ships into play near their home world
fn launch_outfitted(world: &mut World) {
    for id in 0..world.ships.len() {
        if world.ships[id].status == ShipStatus::Outfitting {
            spawn(world, id);
        }
    }
}

/// Launch `id` at a random spot near its team's home world
pub fn spawn(world: &mut World, id: ShipId) {
    let team = world.ships[id].team;
    let home = home_position(team);
    let offset = Vec2::new(
        world.rng.random_range(-SPAWN_SCATTER..SPAWN_SCATTER),
        world.rng.random_range(-SPAWN_SCATTER..SPAWN_SCATTER),
    );
    let pos = (home + offset).clamp(Vec2::ZERO, Vec2::splat(GALAXY_WIDTH));
    // Face the galaxy center
    let dir = radians_to_dir(crate::bearing(pos, Vec2::splat(GALAXY_WIDTH / 2.0)));
    world.ships[id].launch(pos, dir);
    log::debug!("{} ({}) launched at {:?}", world.ships[id].name, id, pos);
}

/// Pay for engines, shields, cloak and beams, then recharge
pub fn burn_fuel(ship: &mut Ship, bonus: u32) {
    let stats = ship.stats();
    let mut cost = stats.warp_cost * ship.speed;
    if ship.shields_up {
        cost += stats.shield_cost;
    }
    if ship.cloaked {
        cost += stats.cloak_cost;
    }
    if ship.force_beam.is_some() {
        cost += stats.tractor_cost;
    }

    ship.fuel = (ship.fuel + stats.recharge * bonus).min(stats.max_fuel);
    if cost <= ship.fuel {
        ship.fuel -= cost;
        return;
    }

    // Out of fuel: everything optional shuts off, engines wind down
    ship.fuel = ship.fuel.saturating_sub(stats.warp_cost * ship.speed);
    ship.shields_up = false;
    ship.cloaked = false;
    ship.force_beam = None;
    if ship.fuel == 0 {
        ship.desired_speed = ship.desired_speed.min(ship.speed.saturating_sub(1));
    }
}

/// Heat up and cool down weapons and engines.
///
/// Going over the limit locks the system out until it cools below half.
pub fn cool(ship: &mut Ship) {
    let stats = ship.stats();

    ship.weapon_temp = ship.weapon_temp.saturating_sub(stats.weapon_cool);
    if ship.weapon_temp > stats.max_weapon_temp {
        ship.weapons_overheated = true;
    } else if ship.weapons_overheated && ship.weapon_temp < stats.max_weapon_temp / 2 {
        ship.weapons_overheated = false;
    }

    ship.engine_temp = (ship.engine_temp + ship.speed).saturating_sub(stats.engine_cool);
    if ship.engine_temp > stats.max_engine_temp {
        ship.engines_overheated = true;
    } else if ship.engines_overheated && ship.engine_temp < stats.max_engine_temp / 2 {
        ship.engines_overheated = false;
    }
}

/// Regenerate shields and hull through thousandth residues
pub fn repair(ship: &mut Ship, bonus: u32) {
    let stats = ship.stats();
    let rate = stats.repair * bonus * if ship.repairing { 2 } else { 1 };

    if ship.shields < stats.max_shields {
        ship.sub_shield += rate;
        ship.shields = (ship.shields + ship.sub_shield / RESIDUE_SCALE).min(stats.max_shields);
        ship.sub_shield %= RESIDUE_SCALE;
    } else {
        ship.sub_shield = 0;
    }

    if ship.hull_damage > 0 {
        ship.sub_repair += rate;
        ship.hull_damage = ship
            .hull_damage
            .saturating_sub(ship.sub_repair / RESIDUE_SCALE);
        ship.sub_repair %= RESIDUE_SCALE;
    } else {
        ship.sub_repair = 0;
    }
}

/// Tractors pull both ships together, pressors push them apart
fn force_beams(world: &mut World) {
    for id in 0..world.ships.len() {
        let source = &world.ships[id];
        let Some(beam) = source.force_beam else {
            continue;
        };
        if !source.is_alive() {
            world.ships[id].force_beam = None;
            continue;
        }
        let stats = source.stats();
        let target_id = beam.target();
        let Some(target) = world.ships.get(target_id).filter(|t| t.is_alive()) else {
            world.ships[id].force_beam = None;
            continue;
        };
        let distance = source.pos.distance(target.pos);
        if distance > stats.tractor_reach() {
            log::debug!("{} ({}) lost beam lock on {}", source.name, id, target_id);
            world.ships[id].force_beam = None;
            continue;
        }

        let toward = (target.pos - source.pos).normalize_or_zero();
        let sign = match beam {
            ForceBeam::Tractor(_) => 1.0,
            ForceBeam::Pressor(_) => -1.0,
        };
        let strength = WARP1 * stats.tractor_strength as f32 / 2.0;
        let source_step = toward * sign * strength / source.stats().mass as f32;
        let target_step = -toward * sign * strength / target.stats().mass as f32;

        let bounds = Vec2::splat(GALAXY_WIDTH);
        let source = &mut world.ships[id];
        source.pos = (source.pos + source_step).clamp(Vec2::ZERO, bounds);
        source.orbiting = None;
        let target = &mut world.ships[target_id];
        target.pos = (target.pos + target_step).clamp(Vec2::ZERO, bounds);
        target.orbiting = None;
    }
}

/// Count down explosions; the blast damages everyone nearby on the first tick
fn explosions(world: &mut World) {
    for id in 0..world.ships.len() {
        if world.ships[id].status != ShipStatus::Exploding {
            continue;
        }
        if world.ships[id].explode_ticks == EXPLODE_TICKS {
            blast(world, id);
        }
        let respawn = world.rules.respawn_ticks;
        let ship = &mut world.ships[id];
        ship.explode_ticks = ship.explode_ticks.saturating_sub(1);
        if ship.explode_ticks == 0 {
            ship.status = ShipStatus::Dead;
            ship.respawn_ticks = respawn;
            ship.speed = 0;
        }
    }
}

fn blast(world: &mut World, id: ShipId) {
    let center = world.ships[id].pos;
    let victims: Vec<(ShipId, u32)> = world
        .ships
        .iter()
        .filter(|s| s.id != id && s.is_alive())
        .map(|s| {
            let amount = falloff(
                SHIP_EXPLOSION_DAMAGE,
                s.pos.distance(center),
                HIT_RADIUS,
                EXPLOSION_DIST,
            );
            (s.id, amount)
        })
        .filter(|(_, amount)| *amount > 0)
        .collect();
    for (victim, amount) in victims {
        strike(world, victim, Some(id), amount);
    }
}

/// Bring dead ships back once their timer runs out
fn respawns(world: &mut World) {
    for id in 0..world.ships.len() {
        let ship = &mut world.ships[id];
        if ship.status != ShipStatus::Dead {
            continue;
        }
        ship.respawn_ticks = ship.respawn_ticks.saturating_sub(1);
        if ship.respawn_ticks == 0 {
            spawn(world, id);
            world.events.push(SimEvent::ShipRespawned { ship: id });
        }
    }
}
