//! World state and core simulation types
//!
//! Everything the tick pipeline reads or writes lives in [`World`]. Entities
//! are plain data; behavior lives in the subsystem modules.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::galaxy;
use super::ship_class::{ClassStats, ShipClass};
use crate::ai::BotBrain;
use crate::consts::*;

pub type ShipId = usize;
pub type PlanetId = usize;

/// Playing teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    Federation,
    Romulan,
    Klingon,
    Orion,
}

impl Team {
    pub const ALL: [Team; 4] = [Team::Federation, Team::Romulan, Team::Klingon, Team::Orion];

    pub fn index(self) -> usize {
        match self {
            Team::Federation => 0,
            Team::Romulan => 1,
            Team::Klingon => 2,
            Team::Orion => 3,
        }
    }

    /// Bit used in planet scouting masks
    pub fn bit(self) -> u8 {
        1 << self.index()
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fed" | "federation" => Some(Team::Federation),
            "rom" | "romulan" => Some(Team::Romulan),
            "kli" | "klingon" => Some(Team::Klingon),
            "ori" | "orion" => Some(Team::Orion),
            _ => None,
        }
    }
}

/// Slot lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShipStatus {
    /// Slot unused
    #[default]
    Free,
    /// Joined, ship launches on the next tick
    Outfitting,
    Alive,
    /// Blowing up; `explode_ticks` counts down
    Exploding,
    /// Waiting for respawn; `respawn_ticks` counts down
    Dead,
    /// Spectator without a ship
    Observing,
}

impl ShipStatus {
    /// Counted as a team member for tournament and genocide rules
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ShipStatus::Outfitting | ShipStatus::Alive | ShipStatus::Exploding | ShipStatus::Dead
        )
    }
}

/// Army transfer mode while orbiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BeamMode {
    #[default]
    Off,
    Up,
    Down,
}

/// Force beam lock on another ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForceBeam {
    Tractor(ShipId),
    Pressor(ShipId),
}

impl ForceBeam {
    pub fn target(self) -> ShipId {
        match self {
            ForceBeam::Tractor(id) | ForceBeam::Pressor(id) => id,
        }
    }
}

/// Per-player statistics, tracked while tournament mode is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentRecord {
    pub kills: u32,
    pub deaths: u32,
    pub planets_taken: u32,
    pub armies_bombed: u32,
    pub armies_landed: u32,
    pub damage_dealt: u32,
}

/// A player or bot slot
#[derive(Debug, Clone)]
pub struct Ship {
    pub id: ShipId,
    pub name: String,
    pub team: Team,
    pub class: ShipClass,
    pub status: ShipStatus,

    pub pos: Vec2,
    /// Current heading (256 units per circle)
    pub dir: u8,
    pub desired_dir: u8,
    /// Turn residue in thousandths of a direction unit
    pub sub_dir: u32,
    /// Warp
    pub speed: u32,
    pub desired_speed: u32,
    /// Speed residue in thousandths of a warp
    pub sub_speed: i32,

    pub shields: u32,
    /// Accumulated hull damage (destroyed at class max)
    pub hull_damage: u32,
    pub fuel: u32,
    pub weapon_temp: u32,
    pub engine_temp: u32,
    pub sub_shield: u32,
    pub sub_repair: u32,

    pub shields_up: bool,
    pub cloaked: bool,
    pub repairing: bool,
    pub bombing: bool,
    pub beam: BeamMode,
    pub weapons_overheated: bool,
    pub engines_overheated: bool,
    pub force_beam: Option<ForceBeam>,
    pub orbiting: Option<PlanetId>,

    pub armies: u32,
    pub kills: u32,
    pub deaths: u32,
    pub record: TournamentRecord,

    /// Ticks until the phaser may fire again
    pub phaser_reload: u32,
    pub explode_ticks: u32,
    pub respawn_ticks: u32,
    /// Ship (or planet, as `None`) that last damaged us
    pub last_attacker: Option<ShipId>,

    /// Present for computer-controlled ships
    pub brain: Option<BotBrain>,
}

impl Ship {
    /// An empty slot
    pub fn free(id: ShipId) -> Self {
        Self {
            id,
            name: String::new(),
            team: Team::Federation,
            class: ShipClass::default(),
            status: ShipStatus::Free,
            pos: Vec2::ZERO,
            dir: 0,
            desired_dir: 0,
            sub_dir: 0,
            speed: 0,
            desired_speed: 0,
            sub_speed: 0,
            shields: 0,
            hull_damage: 0,
            fuel: 0,
            weapon_temp: 0,
            engine_temp: 0,
            sub_shield: 0,
            sub_repair: 0,
            shields_up: false,
            cloaked: false,
            repairing: false,
            bombing: false,
            beam: BeamMode::Off,
            weapons_overheated: false,
            engines_overheated: false,
            force_beam: None,
            orbiting: None,
            armies: 0,
            kills: 0,
            deaths: 0,
            record: TournamentRecord::default(),
            phaser_reload: 0,
            explode_ticks: 0,
            respawn_ticks: 0,
            last_attacker: None,
            brain: None,
        }
    }

    pub fn stats(&self) -> &'static ClassStats {
        self.class.stats()
    }

    pub fn is_alive(&self) -> bool {
        self.status == ShipStatus::Alive
    }

    pub fn is_bot(&self) -> bool {
        self.brain.is_some()
    }

    /// Velocity in galaxy units per tick
    pub fn velocity(&self) -> Vec2 {
        if self.orbiting.is_some() {
            return Vec2::ZERO;
        }
        crate::dir_vector(self.dir) * (self.speed as f32 * WARP1)
    }

    /// Put the ship into play at `pos` with full gauges
    pub fn launch(&mut self, pos: Vec2, dir: u8) {
        let stats = self.stats();
        self.status = ShipStatus::Alive;
        self.pos = pos;
        self.dir = dir;
        self.desired_dir = dir;
        self.sub_dir = 0;
        self.speed = 0;
        self.desired_speed = 0;
        self.sub_speed = 0;
        self.shields = stats.max_shields;
        self.hull_damage = 0;
        self.fuel = stats.max_fuel;
        self.weapon_temp = 0;
        self.engine_temp = 0;
        self.sub_shield = 0;
        self.sub_repair = 0;
        self.shields_up = false;
        self.cloaked = false;
        self.repairing = false;
        self.bombing = false;
        self.beam = BeamMode::Off;
        self.weapons_overheated = false;
        self.engines_overheated = false;
        self.force_beam = None;
        self.orbiting = None;
        self.armies = 0;
        self.kills = 0;
        self.phaser_reload = 0;
        self.explode_ticks = 0;
        self.respawn_ticks = 0;
        self.last_attacker = None;
    }

    /// Drop everything that only makes sense while flying under command
    pub fn clear_activity(&mut self) {
        self.orbiting = None;
        self.bombing = false;
        self.beam = BeamMode::Off;
        self.force_beam = None;
        self.repairing = false;
    }
}

/// Planet capability flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetFlags {
    pub repair: bool,
    pub fuel: bool,
    pub agri: bool,
    pub home: bool,
    pub core: bool,
}

/// A planet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,
    pub name: String,
    pub pos: Vec2,
    /// `None` = independent
    pub owner: Option<Team>,
    pub armies: u32,
    pub flags: PlanetFlags,
    /// Teams that have scouted this planet (see [`Team::bit`])
    pub info: u8,
    /// Team whose home world this is
    pub home_of: Option<Team>,
}

impl Planet {
    /// Max armies this planet will hold
    pub fn army_cap(&self) -> u32 {
        if self.flags.home {
            60
        } else if self.flags.agri {
            50
        } else {
            40
        }
    }

    pub fn known_to(&self, team: Team) -> bool {
        self.owner == Some(team) || self.info & team.bit() != 0
    }

    pub fn is_hostile_to(&self, team: Team) -> bool {
        self.owner != Some(team)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    Torpedo,
    Plasma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileStatus {
    InFlight,
    /// Fuse ran out; shown for one tick then freed
    Exploding,
    /// Hit something; freed in the same tick
    Detonated,
}

/// A torpedo or plasma
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub kind: ProjectileKind,
    pub owner: ShipId,
    pub team: Team,
    pub pos: Vec2,
    /// Radians
    pub heading: f32,
    /// Galaxy units per tick
    pub speed: f32,
    pub damage: u32,
    pub fuse: u32,
    pub status: ProjectileStatus,
    /// Homing turn limit (radians per tick), 0 for torpedoes
    pub turn: f32,
    /// Explosion already went out in a tick's snapshot
    #[serde(skip)]
    pub shown: bool,
}

impl Projectile {
    pub fn velocity(&self) -> Vec2 {
        Vec2::from_angle(self.heading) * self.speed
    }

    pub fn in_flight(&self) -> bool {
        self.status == ProjectileStatus::InFlight
    }

    /// Still needed: in flight, or exploding but not yet published
    pub fn lingering(&self) -> bool {
        match self.status {
            ProjectileStatus::InFlight => true,
            ProjectileStatus::Exploding => !self.shown,
            ProjectileStatus::Detonated => false,
        }
    }
}

/// Win state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    Ongoing,
    Genocide { winner: Team },
    Conquest { winner: Team },
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Outcome::Ongoing
    }
}

/// Tournament window state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentState {
    pub active: bool,
    pub started_tick: Option<u64>,
}

/// Per-team tallies, refreshed every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTally {
    pub team: Team,
    pub players: u32,
    pub alive: u32,
    pub planets: u32,
    pub armies: u32,
}

/// Things that happened during a tick, surfaced in snapshots and logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    ShipDestroyed {
        victim: ShipId,
        killer: Option<ShipId>,
    },
    ShipRespawned {
        ship: ShipId,
    },
    PlanetNeutralized {
        planet: PlanetId,
        by: ShipId,
    },
    PlanetCaptured {
        planet: PlanetId,
        team: Team,
        by: ShipId,
    },
    TournamentStarted,
    Victory(Outcome),
}

/// Rules the world runs under (derived from settings)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    pub max_ships: usize,
    pub tournament_min_per_team: usize,
    pub bot_think_interval: u64,
    pub respawn_ticks: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            max_ships: 32,
            tournament_min_per_team: 4,
            bot_think_interval: 3,
            respawn_ticks: 50,
        }
    }
}

/// Consistency check failures. A violation is a programming defect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("ship {ship}: {gauge} = {value} exceeds class max {max}")]
    GaugeOverflow {
        ship: ShipId,
        gauge: &'static str,
        value: u32,
        max: u32,
    },
    #[error("ship slot {slot} holds id {id}")]
    SlotMismatch { slot: usize, id: ShipId },
    #[error("ship {ship} has {count} torpedoes in flight")]
    TorpedoCap { ship: ShipId, count: usize },
    #[error("ship {ship} has {count} plasmas in flight")]
    PlasmaCap { ship: ShipId, count: usize },
    #[error("planet {planet} holds {armies} armies, cap {cap}")]
    ArmyOverflow { planet: PlanetId, armies: u32, cap: u32 },
    #[error("ship {ship} orbits missing planet {planet}")]
    BadOrbit { ship: ShipId, planet: PlanetId },
    #[error("ship {ship} position {x},{y} outside galaxy")]
    OutOfBounds { ship: ShipId, x: f32, y: f32 },
}

/// The single mutable aggregate
#[derive(Debug, Clone)]
pub struct World {
    pub seed: u64,
    pub rules: Rules,
    pub tick: u64,
    /// Fixed slot array; index == ship id
    pub ships: Vec<Ship>,
    pub planets: Vec<Planet>,
    pub projectiles: Vec<Projectile>,
    pub tournament: TournamentState,
    pub outcome: Outcome,
    pub tallies: Vec<TeamTally>,
    /// Events since the last tick was published
    pub events: Vec<SimEvent>,
    pub rng: Pcg32,
    next_projectile_id: u32,
}

impl World {
    /// Create a fresh galaxy with the given seed
    pub fn new(seed: u64, rules: Rules) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let planets = galaxy::generate_planets(&mut rng);
        let mut world = Self {
            seed,
            rules,
            tick: 0,
            ships: (0..rules.max_ships).map(Ship::free).collect(),
            planets,
            projectiles: Vec::new(),
            tournament: TournamentState::default(),
            outcome: Outcome::Ongoing,
            tallies: Vec::new(),
            events: Vec::new(),
            rng,
            next_projectile_id: 1,
        };
        world.refresh_tallies();
        world
    }

    /// Start over with the same seed and rules, keeping nobody
    pub fn reset(&mut self) {
        *self = World::new(self.seed, self.rules);
    }

    /// Drain the event buffer
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Allocate a projectile id
    pub fn next_projectile_id(&mut self) -> u32 {
        let id = self.next_projectile_id;
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
        id
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(id)
    }

    /// Lowest free slot
    pub fn free_slot(&self) -> Option<ShipId> {
        self.ships
            .iter()
            .position(|s| s.status == ShipStatus::Free)
    }

    /// Live projectiles of one kind owned by `owner`
    pub fn in_flight_count(&self, owner: ShipId, kind: ProjectileKind) -> usize {
        self.projectiles
            .iter()
            .filter(|p| p.owner == owner && p.kind == kind && p.in_flight())
            .count()
    }

    /// Home planet for a team
    pub fn home_planet(&self, team: Team) -> Option<&Planet> {
        self.planets.iter().find(|p| p.home_of == Some(team))
    }

    /// Active players on a team
    pub fn team_players(&self, team: Team) -> usize {
        self.ships
            .iter()
            .filter(|s| s.team == team && s.status.is_active())
            .count()
    }

    /// Recount per-team tallies
    pub fn refresh_tallies(&mut self) {
        self.tallies = Team::ALL
            .iter()
            .map(|&team| TeamTally {
                team,
                players: self.team_players(team) as u32,
                alive: self
                    .ships
                    .iter()
                    .filter(|s| s.team == team && s.is_alive())
                    .count() as u32,
                planets: self
                    .planets
                    .iter()
                    .filter(|p| p.owner == Some(team))
                    .count() as u32,
                armies: self
                    .planets
                    .iter()
                    .filter(|p| p.owner == Some(team))
                    .map(|p| p.armies)
                    .sum(),
            })
            .collect();
    }

    /// Verify world invariants
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (slot, ship) in self.ships.iter().enumerate() {
            if ship.id != slot {
                return Err(InvariantViolation::SlotMismatch { slot, id: ship.id });
            }
            if ship.status == ShipStatus::Free || ship.status == ShipStatus::Observing {
                continue;
            }
            let stats = ship.stats();
            let gauges = [
                ("shields", ship.shields, stats.max_shields),
                ("hull", ship.hull_damage, stats.max_damage),
                ("fuel", ship.fuel, stats.max_fuel),
                ("armies", ship.armies, stats.max_armies),
                ("speed", ship.speed, stats.max_speed),
            ];
            for (gauge, value, max) in gauges {
                if value > max {
                    return Err(InvariantViolation::GaugeOverflow {
                        ship: ship.id,
                        gauge,
                        value,
                        max,
                    });
                }
            }
            if let Some(planet) = ship.orbiting {
                if planet >= self.planets.len() {
                    return Err(InvariantViolation::BadOrbit {
                        ship: ship.id,
                        planet,
                    });
                }
            }
            let inside = (0.0..=GALAXY_WIDTH).contains(&ship.pos.x)
                && (0.0..=GALAXY_WIDTH).contains(&ship.pos.y);
            if ship.is_alive() && !inside {
                return Err(InvariantViolation::OutOfBounds {
                    ship: ship.id,
                    x: ship.pos.x,
                    y: ship.pos.y,
                });
            }
            let torps = self.in_flight_count(ship.id, ProjectileKind::Torpedo);
            if torps > MAX_TORPS {
                return Err(InvariantViolation::TorpedoCap {
                    ship: ship.id,
                    count: torps,
                });
            }
            let plasmas = self.in_flight_count(ship.id, ProjectileKind::Plasma);
            if plasmas > MAX_PLASMAS {
                return Err(InvariantViolation::PlasmaCap {
                    ship: ship.id,
                    count: plasmas,
                });
            }
        }
        for planet in &self.planets {
            if planet.armies > planet.army_cap() {
                return Err(InvariantViolation::ArmyOverflow {
                    planet: planet.id,
                    armies: planet.armies,
                    cap: planet.army_cap(),
                });
            }
        }
        Ok(())
    }
}
