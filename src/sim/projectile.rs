//! Torpedoes, plasmas and phasers
//!
//! Projectiles move in id order after physics, so they always test against
//! the ships' post-movement positions. Phasers are instant and resolve at
//! command time.

use glam::Vec2;

use super::collision::{in_galaxy, ray_offset, swept_proximity};
use super::command::CommandError;
use super::damage::{DamageReport, strike};
use super::state::{Projectile, ProjectileKind, ProjectileStatus, ShipId, World};
use crate::consts::*;
use crate::normalize_angle;

/// Plasmas only seek enemies this close
pub const PLASMA_SEEK_DIST: f32 = 8000.0;

/// What a phaser shot did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaserOutcome {
    Hit { target: ShipId, report: DamageReport },
    PlasmaZapped { projectile: u32 },
    Miss,
}

/// What a projectile ran into this tick
enum Impact {
    Ship(ShipId),
    Planet,
}

/// Move every projectile one tick and resolve hits.
///
/// Ships and planet bodies both stop a projectile; whichever lies first
/// along its path takes the hit.
pub fn advance(world: &mut World) {
    // Explosions that already went out in a snapshot are done
    world.projectiles.retain(|p| p.lingering());

    for index in 0..world.projectiles.len() {
        if !world.projectiles[index].in_flight() {
            continue;
        }
        if world.projectiles[index].kind == ProjectileKind::Plasma {
            steer_plasma(world, index);
        }

        let projectile = &mut world.projectiles[index];
        let from = projectile.pos;
        projectile.pos += projectile.velocity();
        projectile.fuse = projectile.fuse.saturating_sub(1);
        let to = projectile.pos;
        let team = projectile.team;
        let owner = projectile.owner;
        let damage = projectile.damage;

        let ships = world
            .ships
            .iter()
            .filter(|s| s.is_alive() && s.team != team)
            .map(|s| (Impact::Ship(s.id), swept_proximity(from, to, s.pos, HIT_RADIUS)));
        let planets = world
            .planets
            .iter()
            .map(|p| (Impact::Planet, swept_proximity(from, to, p.pos, PLANET_RADIUS)));
        let impact = ships
            .chain(planets)
            .filter(|(_, hit)| hit.hit)
            .map(|(what, hit)| (what, from.distance_squared(hit.point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(what, _)| what);

        match impact {
            Some(Impact::Ship(victim)) => {
                world.projectiles[index].status = ProjectileStatus::Detonated;
                strike(world, victim, Some(owner), damage);
            }
            Some(Impact::Planet) => {
                world.projectiles[index].status = ProjectileStatus::Detonated;
            }
            None => {
                let projectile = &mut world.projectiles[index];
                if projectile.fuse == 0 || !in_galaxy(projectile.pos, GALAXY_WIDTH) {
                    projectile.status = ProjectileStatus::Exploding;
                }
            }
        }
    }

    world
        .projectiles
        .retain(|p| p.status != ProjectileStatus::Detonated);
}

/// Mark explosions as published. Runs once at the end of every tick, so each
/// explosion appears in exactly one snapshot whether it came from a fuse, a
/// phaser or a detonation.
pub fn settle(world: &mut World) {
    for p in world.projectiles.iter_mut() {
        if p.status == ProjectileStatus::Exploding {
            p.shown = true;
        }
    }
}

/// Turn a plasma toward the nearest visible enemy in range
fn steer_plasma(world: &mut World, index: usize) {
    let plasma = &world.projectiles[index];
    let target = world
        .ships
        .iter()
        .filter(|s| s.is_alive() && s.team != plasma.team)
        .filter(|s| !s.cloaked || s.pos.distance(plasma.pos) < CLOAK_DETECT_DIST)
        .map(|s| (s.pos, s.pos.distance_squared(plasma.pos)))
        .filter(|(_, d2)| *d2 < PLASMA_SEEK_DIST * PLASMA_SEEK_DIST)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(pos, _)| pos);

    let Some(target) = target else {
        return;
    };
    let plasma = &mut world.projectiles[index];
    let wanted = crate::bearing(plasma.pos, target);
    let delta = normalize_angle(wanted - plasma.heading);
    plasma.heading = normalize_angle(plasma.heading + delta.clamp(-plasma.turn, plasma.turn));
}

/// Common checks for any weapon. Firing cancels repair mode.
fn ready_to_fire(world: &World, shooter: ShipId, fuel: u32) -> Result<(), CommandError> {
    let ship = world.ship(shooter).ok_or(CommandError::UnknownShip(shooter))?;
    if !ship.is_alive() {
        return Err(CommandError::NotInPlay);
    }
    if ship.cloaked {
        return Err(CommandError::Cloaked);
    }
    if ship.weapons_overheated {
        return Err(CommandError::WeaponsOverheated);
    }
    if ship.fuel < fuel {
        return Err(CommandError::NotEnoughFuel {
            needed: fuel,
            available: ship.fuel,
        });
    }
    Ok(())
}

fn checked_direction(direction: f32) -> Result<f32, CommandError> {
    if direction.is_finite() {
        Ok(normalize_angle(direction))
    } else {
        Err(CommandError::InvalidValue("direction"))
    }
}

/// Launch a torpedo along `direction` (radians)
pub fn fire_torpedo(world: &mut World, shooter: ShipId, direction: f32) -> Result<u32, CommandError> {
    let direction = checked_direction(direction)?;
    let stats = world
        .ship(shooter)
        .ok_or(CommandError::UnknownShip(shooter))?
        .stats();
    ready_to_fire(world, shooter, stats.torp_cost)?;
    if world.in_flight_count(shooter, ProjectileKind::Torpedo) >= MAX_TORPS {
        return Err(CommandError::TorpedoLimit);
    }

    let id = world.next_projectile_id();
    let ship = &mut world.ships[shooter];
    ship.fuel -= stats.torp_cost;
    ship.weapon_temp += stats.torp_cost / 10;
    ship.repairing = false;
    let projectile = Projectile {
        id,
        kind: ProjectileKind::Torpedo,
        owner: shooter,
        team: ship.team,
        pos: ship.pos,
        heading: direction,
        speed: stats.torp_speed as f32 * WARP1,
        damage: stats.torp_damage,
        fuse: stats.torp_fuse,
        status: ProjectileStatus::InFlight,
        turn: 0.0,
        shown: false,
    };
    world.projectiles.push(projectile);
    Ok(id)
}

/// Launch a plasma along `direction` (radians)
pub fn fire_plasma(world: &mut World, shooter: ShipId, direction: f32) -> Result<u32, CommandError> {
    let direction = checked_direction(direction)?;
    let stats = world
        .ship(shooter)
        .ok_or(CommandError::UnknownShip(shooter))?
        .stats();
    let plasma = stats.plasma.ok_or(CommandError::NoPlasma)?;
    ready_to_fire(world, shooter, plasma.cost)?;
    if world.in_flight_count(shooter, ProjectileKind::Plasma) >= MAX_PLASMAS {
        return Err(CommandError::PlasmaLimit);
    }

    let id = world.next_projectile_id();
    let ship = &mut world.ships[shooter];
    ship.fuel -= plasma.cost;
    ship.weapon_temp += plasma.cost / 10;
    ship.repairing = false;
    let projectile = Projectile {
        id,
        kind: ProjectileKind::Plasma,
        owner: shooter,
        team: ship.team,
        pos: ship.pos,
        heading: direction,
        speed: plasma.speed as f32 * WARP1,
        damage: plasma.damage,
        fuse: plasma.fuse,
        status: ProjectileStatus::InFlight,
        turn: plasma.turn,
        shown: false,
    };
    world.projectiles.push(projectile);
    Ok(id)
}

/// Fire the phaser along `direction` (radians).
///
/// The closest enemy ship near the ray takes damage that falls off with
/// distance. With no ship in the beam it burns down the closest enemy plasma
/// instead.
pub fn fire_phaser(
    world: &mut World,
    shooter: ShipId,
    direction: f32,
) -> Result<PhaserOutcome, CommandError> {
    let direction = checked_direction(direction)?;
    let ship = world.ship(shooter).ok_or(CommandError::UnknownShip(shooter))?;
    let stats = ship.stats();
    ready_to_fire(world, shooter, stats.phaser_cost)?;
    if ship.phaser_reload > 0 {
        return Err(CommandError::PhaserReloading);
    }

    let origin = ship.pos;
    let team = ship.team;
    let range = stats.phaser_range();
    let ray = Vec2::from_angle(direction);

    let target = world
        .ships
        .iter()
        .filter(|s| s.is_alive() && s.team != team)
        .filter_map(|s| {
            let (along, perp) = ray_offset(origin, ray, s.pos)?;
            (along <= range && perp < PHASER_SHIP_TOLERANCE).then_some((s.id, along))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let ship = &mut world.ships[shooter];
    ship.fuel -= stats.phaser_cost;
    ship.weapon_temp += stats.phaser_cost / 10;
    ship.phaser_reload = PHASER_RELOAD;
    ship.repairing = false;

    if let Some((target, along)) = target {
        let amount = (stats.phaser_damage as f32 * (1.0 - along / range)) as u32;
        let report = strike(world, target, Some(shooter), amount);
        return Ok(PhaserOutcome::Hit { target, report });
    }

    let plasma = world
        .projectiles
        .iter()
        .filter(|p| p.kind == ProjectileKind::Plasma && p.in_flight() && p.team != team)
        .filter_map(|p| {
            let (along, perp) = ray_offset(origin, ray, p.pos)?;
            (along <= range && perp < PHASER_PLASMA_TOLERANCE).then_some((p.id, along))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id);

    match plasma {
        Some(id) => {
            if let Some(p) = world.projectiles.iter_mut().find(|p| p.id == id) {
                p.status = ProjectileStatus::Exploding;
            }
            Ok(PhaserOutcome::PlasmaZapped { projectile: id })
        }
        None => Ok(PhaserOutcome::Miss),
    }
}

/// Blow up enemy torpedoes close to the ship. Returns how many went off.
pub fn detonate(world: &mut World, shooter: ShipId) -> Result<usize, CommandError> {
    let ship = world.ship(shooter).ok_or(CommandError::UnknownShip(shooter))?;
    let cost = ship.stats().detonate_cost;
    if !ship.is_alive() {
        return Err(CommandError::NotInPlay);
    }
    if ship.fuel < cost {
        return Err(CommandError::NotEnoughFuel {
            needed: cost,
            available: ship.fuel,
        });
    }
    let (pos, team) = (ship.pos, ship.team);
    world.ships[shooter].fuel -= cost;

    let mut count = 0;
    for p in world.projectiles.iter_mut() {
        if p.kind == ProjectileKind::Torpedo
            && p.in_flight()
            && p.team != team
            && p.pos.distance(pos) < DETONATE_DIST
        {
            p.status = ProjectileStatus::Exploding;
            count += 1;
        }
    }
    Ok(count)
}
