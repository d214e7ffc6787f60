//! Planets, orbits and army transfer
//!
//! Ownership only changes here. A planet falls independent when its last
//! defender is beamed away, and changes hands when a carrier beams an army
//! onto an empty world.

use rand::Rng;
use rand_pcg::Pcg32;

use super::command::CommandError;
use super::damage::strike;
use super::state::{BeamMode, Planet, PlanetId, Ship, ShipId, SimEvent, World};
use crate::consts::*;
use crate::dir_vector;

/// What one beam-down step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamDown {
    /// Own planet gained an army
    Reinforced,
    /// One defender killed
    Attacked,
    /// Last defender killed; planet is now independent
    Neutralized,
    /// Empty planet taken over
    Captured,
    /// Nothing to move
    Idle,
}

/// Lock into orbit around the nearest planet in reach
pub fn enter_orbit(world: &mut World, id: ShipId) -> Result<PlanetId, CommandError> {
    let ship = world.ship(id).ok_or(CommandError::UnknownShip(id))?;
    if !ship.is_alive() {
        return Err(CommandError::NotInPlay);
    }
    let planet = world
        .planets
        .iter()
        .map(|p| (p.id, p.pos.distance(ship.pos)))
        .filter(|(_, d)| *d <= ENTER_ORBIT_DIST)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, _)| p)
        .ok_or(CommandError::NotNearPlanet)?;
    if ship.speed > ORBIT_MAX_SPEED {
        return Err(CommandError::TooFast {
            speed: ship.speed,
            max: ORBIT_MAX_SPEED,
        });
    }

    let center = world.planets[planet].pos;
    let radial = crate::radians_to_dir(crate::bearing(center, ship.pos));
    let team = ship.team;
    let ship = &mut world.ships[id];
    ship.orbiting = Some(planet);
    ship.speed = 0;
    ship.desired_speed = 0;
    ship.sub_speed = 0;
    ship.dir = radial.wrapping_add(64);
    ship.desired_dir = ship.dir;
    ship.pos = center + dir_vector(radial) * ORBIT_DIST;
    world.planets[planet].info |= team.bit();
    Ok(planet)
}

/// Move orbiting ships around their planets
pub fn advance_orbits(world: &mut World) {
    for ship in world.ships.iter_mut() {
        let Some(planet) = ship.orbiting else {
            continue;
        };
        if !ship.is_alive() {
            continue;
        }
        let center = world.planets[planet].pos;
        ship.dir = ship.dir.wrapping_add(ORBIT_TURN);
        ship.desired_dir = ship.dir;
        // Heading is tangent, counter-clockwise
        let radial = ship.dir.wrapping_sub(64);
        ship.pos = center + dir_vector(radial) * ORBIT_DIST;
    }
}

/// Beam one army from `ship` down to `planet`
pub fn beam_down_one(planet: &mut Planet, ship: &mut Ship) -> BeamDown {
    if ship.armies == 0 {
        return BeamDown::Idle;
    }
    if planet.owner == Some(ship.team) {
        if planet.armies >= planet.army_cap() {
            return BeamDown::Idle;
        }
        ship.armies -= 1;
        planet.armies += 1;
        return BeamDown::Reinforced;
    }

    if planet.armies == 0 {
        if ship.armies < CAPTURE_MIN_ARMIES {
            return BeamDown::Idle;
        }
        ship.armies -= 1;
        planet.owner = Some(ship.team);
        planet.armies = 1;
        planet.info |= ship.team.bit();
        return BeamDown::Captured;
    }

    ship.armies -= 1;
    planet.armies -= 1;
    if planet.armies == 0 && planet.owner.is_some() {
        planet.owner = None;
        BeamDown::Neutralized
    } else {
        BeamDown::Attacked
    }
}

/// Beam one army up from an own planet. The planet keeps at least one.
pub fn beam_up_one(planet: &mut Planet, ship: &mut Ship) -> bool {
    let capacity = ship.stats().army_capacity(ship.kills);
    if planet.owner != Some(ship.team) || planet.armies <= 1 || ship.armies >= capacity {
        return false;
    }
    planet.armies -= 1;
    ship.armies += 1;
    true
}

/// One bombing run: kills 1-3 armies but never goes below the floor
pub fn bomb(planet: &mut Planet, rng: &mut Pcg32) -> u32 {
    if planet.armies <= BOMB_FLOOR {
        return 0;
    }
    let killed = rng.random_range(1..=3).min(planet.armies - BOMB_FLOOR);
    planet.armies -= killed;
    killed
}

/// Owned planets breed armies up to their cap
pub fn grow_armies(planet: &mut Planet) {
    if planet.owner.is_none() {
        return;
    }
    let growth = if planet.flags.agri { 2 } else { 1 };
    planet.armies = (planet.armies + growth).min(planet.army_cap());
}

/// Planet subsystem tick
pub fn update(world: &mut World) {
    advance_orbits(world);
    let tick = world.tick;
    if tick % BEAM_INTERVAL == 0 {
        beaming(world);
    }
    if tick % BOMB_INTERVAL == 0 {
        bombing(world);
    }
    if tick % POP_INTERVAL == 0 {
        world.planets.iter_mut().for_each(grow_armies);
    }
    if tick % PLANET_FIRE_INTERVAL == 0 {
        defensive_fire(world);
    }
    scouting(world);
}

fn beaming(world: &mut World) {
    let tournament = world.tournament.active;
    for id in 0..world.ships.len() {
        let ship = &mut world.ships[id];
        let Some(planet_id) = ship.orbiting else {
            continue;
        };
        if !ship.is_alive() {
            continue;
        }
        let planet = &mut world.planets[planet_id];
        match ship.beam {
            BeamMode::Off => {}
            BeamMode::Up => {
                if !beam_up_one(planet, ship) {
                    ship.beam = BeamMode::Off;
                }
            }
            BeamMode::Down => {
                let before = planet.owner;
                let result = beam_down_one(planet, ship);
                if tournament && result != BeamDown::Idle && result != BeamDown::Reinforced {
                    ship.record.armies_landed += 1;
                }
                match result {
                    BeamDown::Idle => ship.beam = BeamMode::Off,
                    BeamDown::Neutralized => {
                        log::info!(
                            "{} neutralized by {} ({})",
                            planet.name,
                            ship.name,
                            id
                        );
                        world.events.push(SimEvent::PlanetNeutralized {
                            planet: planet_id,
                            by: id,
                        });
                    }
                    BeamDown::Captured => {
                        if tournament {
                            ship.record.planets_taken += 1;
                        }
                        log::info!(
                            "{} captured by {:?} ({} from {:?})",
                            planet.name,
                            ship.team,
                            ship.name,
                            before
                        );
                        world.events.push(SimEvent::PlanetCaptured {
                            planet: planet_id,
                            team: ship.team,
                            by: id,
                        });
                    }
                    BeamDown::Reinforced | BeamDown::Attacked => {}
                }
                if ship.armies == 0 {
                    ship.beam = BeamMode::Off;
                }
            }
        }
    }
}

fn bombing(world: &mut World) {
    let tournament = world.tournament.active;
    for id in 0..world.ships.len() {
        let ship = &mut world.ships[id];
        let Some(planet_id) = ship.orbiting else {
            continue;
        };
        if !ship.is_alive() || !ship.bombing {
            continue;
        }
        let planet = &mut world.planets[planet_id];
        if !planet.is_hostile_to(ship.team) {
            ship.bombing = false;
            continue;
        }
        let killed = bomb(planet, &mut world.rng);
        if tournament {
            ship.record.armies_bombed += killed;
        }
    }
}

/// Planets with armies shoot at hostile ships close by
fn defensive_fire(world: &mut World) {
    let mut shots = Vec::new();
    for planet in world.planets.iter().filter(|p| p.armies > 0) {
        let damage = planet.armies / 10 + 2;
        for ship in world.ships.iter().filter(|s| s.is_alive()) {
            if planet.is_hostile_to(ship.team) && ship.pos.distance(planet.pos) <= PLANET_FIRE_DIST
            {
                shots.push((ship.id, damage));
            }
        }
    }
    for (victim, damage) in shots {
        strike(world, victim, None, damage);
    }
}

/// Teams learn about planets their ships fly near
fn scouting(world: &mut World) {
    for ship in world.ships.iter().filter(|s| s.is_alive()) {
        for planet in world.planets.iter_mut() {
            if planet.pos.distance(ship.pos) <= SCOUT_DIST {
                planet.info |= ship.team.bit();
            }
        }
    }
}
