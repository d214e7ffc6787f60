//! Player and bot commands
//!
//! Every state change that does not come from the tick pipeline goes through
//! [`apply`]. Bots use the same entry point, so they cannot do anything a
//! player could not.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::planet;
use super::projectile::{self, PhaserOutcome};
use super::ship_class::ShipClass;
use super::state::{BeamMode, ForceBeam, Ship, ShipId, ShipStatus, Team, World};
use crate::ai::BotBrain;
use crate::radians_to_dir;

/// A request from a player or bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Course in radians
    SetHeading { heading: f32 },
    /// Warp; clamped to the class maximum
    SetSpeed { speed: u32 },
    FireTorpedo { direction: f32 },
    FirePhaser { direction: f32 },
    FirePlasma { direction: f32 },
    Shields { up: bool },
    Orbit,
    Repair { on: bool },
    Cloak { on: bool },
    Tractor { target: ShipId },
    Pressor { target: ShipId },
    ReleaseBeam,
    Bomb { on: bool },
    BeamUp,
    BeamDown,
    BeamOff,
    Detonate,
    AddBot { team: Team, class: ShipClass },
    Quit,
}

/// Why a command was refused. The world is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("game is over")]
    GameOver,
    #[error("no ship in slot {0}")]
    UnknownShip(ShipId),
    #[error("ship is not in play")]
    NotInPlay,
    #[error("no free ship slots")]
    ServerFull,
    #[error("{0:?} already has a starbase")]
    StarbaseTaken(Team),
    #[error("invalid {0}")]
    InvalidValue(&'static str),
    #[error("not enough fuel: need {needed}, have {available}")]
    NotEnoughFuel { needed: u32, available: u32 },
    #[error("weapons overheated")]
    WeaponsOverheated,
    #[error("cannot fire while cloaked")]
    Cloaked,
    #[error("torpedo limit reached")]
    TorpedoLimit,
    #[error("plasma already in flight")]
    PlasmaLimit,
    #[error("ship class has no plasma launcher")]
    NoPlasma,
    #[error("phaser is recharging")]
    PhaserReloading,
    #[error("no planet close enough to orbit")]
    NotNearPlanet,
    #[error("warp {speed} too fast to orbit (max {max})")]
    TooFast { speed: u32, max: u32 },
    #[error("not orbiting a planet")]
    NotOrbiting,
    #[error("planet is not ours")]
    NotOwnPlanet,
    #[error("planet is not hostile")]
    NotHostilePlanet,
    #[error("no armies aboard")]
    NoArmies,
    #[error("target {0} is not a valid beam target")]
    InvalidTarget(ShipId),
    #[error("target out of range")]
    OutOfRange,
}

/// Result of an accepted command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Launched { projectile: u32 },
    Phaser(PhaserOutcome),
    Orbiting(usize),
    Detonated(usize),
    /// A new slot was filled (bots)
    Spawned(ShipId),
}

/// Validate and apply `command` on behalf of ship `actor`
pub fn apply(
    world: &mut World,
    actor: ShipId,
    command: &Command,
) -> Result<CommandOutcome, CommandError> {
    if world.outcome.is_terminal() {
        return Err(CommandError::GameOver);
    }
    let status = world
        .ship(actor)
        .map(|s| s.status)
        .filter(|s| *s != ShipStatus::Free)
        .ok_or(CommandError::UnknownShip(actor))?;

    // Slot management works from any state
    match command {
        Command::AddBot { team, class } => {
            return world.join_bot(*team, *class).map(CommandOutcome::Spawned);
        }
        Command::Quit => {
            world.leave(actor);
            return Ok(CommandOutcome::Applied);
        }
        _ => {}
    }
    if status != ShipStatus::Alive {
        return Err(CommandError::NotInPlay);
    }

    match *command {
        Command::SetHeading { heading } => {
            if !heading.is_finite() {
                return Err(CommandError::InvalidValue("heading"));
            }
            let ship = &mut world.ships[actor];
            break_orbit(ship);
            ship.desired_dir = radians_to_dir(heading);
        }
        Command::SetSpeed { speed } => {
            let ship = &mut world.ships[actor];
            break_orbit(ship);
            ship.repairing = false;
            ship.desired_speed = speed.min(ship.stats().max_speed);
        }
        Command::FireTorpedo { direction } => {
            let projectile = projectile::fire_torpedo(world, actor, direction)?;
            return Ok(CommandOutcome::Launched { projectile });
        }
        Command::FirePlasma { direction } => {
            let projectile = projectile::fire_plasma(world, actor, direction)?;
            return Ok(CommandOutcome::Launched { projectile });
        }
        Command::FirePhaser { direction } => {
            return projectile::fire_phaser(world, actor, direction).map(CommandOutcome::Phaser);
        }
        Command::Shields { up } => {
            let ship = &mut world.ships[actor];
            if up && ship.fuel == 0 {
                return Err(CommandError::NotEnoughFuel {
                    needed: ship.stats().shield_cost,
                    available: 0,
                });
            }
            ship.shields_up = up;
            if up {
                ship.repairing = false;
            }
        }
        Command::Orbit => {
            return planet::enter_orbit(world, actor).map(CommandOutcome::Orbiting);
        }
        Command::Repair { on } => {
            let ship = &mut world.ships[actor];
            ship.repairing = on;
            if on {
                ship.shields_up = false;
                ship.desired_speed = 0;
            }
        }
        Command::Cloak { on } => {
            let ship = &mut world.ships[actor];
            if on && ship.fuel < ship.stats().cloak_cost {
                return Err(CommandError::NotEnoughFuel {
                    needed: ship.stats().cloak_cost,
                    available: ship.fuel,
                });
            }
            ship.cloaked = on;
        }
        Command::Tractor { target } => lock_beam(world, actor, ForceBeam::Tractor(target))?,
        Command::Pressor { target } => lock_beam(world, actor, ForceBeam::Pressor(target))?,
        Command::ReleaseBeam => world.ships[actor].force_beam = None,
        Command::Bomb { on } => {
            if on {
                let planet = orbited(world, actor)?;
                if !world.planets[planet].is_hostile_to(world.ships[actor].team) {
                    return Err(CommandError::NotHostilePlanet);
                }
            }
            world.ships[actor].bombing = on;
        }
        Command::BeamUp => {
            let planet = orbited(world, actor)?;
            if world.planets[planet].owner != Some(world.ships[actor].team) {
                return Err(CommandError::NotOwnPlanet);
            }
            world.ships[actor].beam = BeamMode::Up;
        }
        Command::BeamDown => {
            orbited(world, actor)?;
            if world.ships[actor].armies == 0 {
                return Err(CommandError::NoArmies);
            }
            world.ships[actor].beam = BeamMode::Down;
        }
        Command::BeamOff => world.ships[actor].beam = BeamMode::Off,
        Command::Detonate => {
            return projectile::detonate(world, actor).map(CommandOutcome::Detonated);
        }
        Command::AddBot { .. } | Command::Quit => {}
    }
    Ok(CommandOutcome::Applied)
}

fn break_orbit(ship: &mut Ship) {
    if ship.orbiting.take().is_some() {
        ship.bombing = false;
        ship.beam = BeamMode::Off;
    }
}

fn orbited(world: &World, actor: ShipId) -> Result<usize, CommandError> {
    world.ships[actor].orbiting.ok_or(CommandError::NotOrbiting)
}

fn lock_beam(world: &mut World, actor: ShipId, beam: ForceBeam) -> Result<(), CommandError> {
    let target_id = beam.target();
    let ship = &world.ships[actor];
    let target = world
        .ship(target_id)
        .filter(|t| t.is_alive() && t.id != actor)
        .ok_or(CommandError::InvalidTarget(target_id))?;
    if ship.pos.distance(target.pos) > ship.stats().tractor_reach() {
        return Err(CommandError::OutOfRange);
    }
    if ship.fuel < ship.stats().tractor_cost {
        return Err(CommandError::NotEnoughFuel {
            needed: ship.stats().tractor_cost,
            available: ship.fuel,
        });
    }
    world.ships[actor].force_beam = Some(beam);
    Ok(())
}

impl World {
    /// Fill a free slot with a new player.
    ///
    /// Players launch on the next tick; observers never get a ship.
    pub fn join(
        &mut self,
        name: &str,
        team: Team,
        class: ShipClass,
        observer: bool,
    ) -> Result<ShipId, CommandError> {
        if self.outcome.is_terminal() {
            return Err(CommandError::GameOver);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(CommandError::InvalidValue("name"));
        }
        if !observer && class == ShipClass::Starbase && self.has_starbase(team) {
            return Err(CommandError::StarbaseTaken(team));
        }
        let id = self.free_slot().ok_or(CommandError::ServerFull)?;
        let ship = &mut self.ships[id];
        *ship = Ship::free(id);
        ship.name = name.to_string();
        ship.team = team;
        ship.class = class;
        ship.status = if observer {
            ShipStatus::Observing
        } else {
            ShipStatus::Outfitting
        };
        log::info!(
            "{} joined {:?} as {} in slot {}",
            ship.name,
            team,
            if observer { "observer" } else { class.stats().name },
            id
        );
        Ok(id)
    }

    /// Add a computer-controlled ship
    pub fn join_bot(&mut self, team: Team, class: ShipClass) -> Result<ShipId, CommandError> {
        let slot = self.free_slot().ok_or(CommandError::ServerFull)?;
        let name = format!("{}-{}", team_tag(team), slot);
        let id = self.join(&name, team, class, false)?;
        let brain_seed = self.seed ^ (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        self.ships[id].brain = Some(BotBrain::new(brain_seed, id, self.tick));
        Ok(id)
    }

    /// Free a slot. The ship's torpedoes and plasmas go with it, so the next
    /// occupant starts with a clean weapon count and no stray kill credit.
    pub fn leave(&mut self, id: ShipId) {
        if let Some(ship) = self.ships.get_mut(id) {
            log::info!("{} left slot {}", ship.name, id);
            *ship = Ship::free(id);
        }
        self.projectiles.retain(|p| p.owner != id);
        for other in self.ships.iter_mut() {
            if other.force_beam.map(ForceBeam::target) == Some(id) {
                other.force_beam = None;
            }
        }
    }

    fn has_starbase(&self, team: Team) -> bool {
        self.ships
            .iter()
            .any(|s| s.team == team && s.class == ShipClass::Starbase && s.status.is_active())
    }
}

fn team_tag(team: Team) -> &'static str {
    match team {
        Team::Federation => "F",
        Team::Romulan => "R",
        Team::Klingon => "K",
        Team::Orion => "O",
    }
}
