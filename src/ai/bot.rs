//! Bot decision making
//!
//! Each bot thinks every `bot_think_interval` ticks, staggered by slot so
//! bots spread their work across ticks. Thinking produces a list of
//! [`Command`]s; every bot plans against the same world state and the
//! commands are applied afterwards through [`command::apply`].

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::intercept::{FireSolution, aim_direct, aim_weapon};
use super::targeting::{Target, nearest_contact, select_target, still_valid};
use crate::consts::*;
use crate::sim::command::{self, Command};
use crate::sim::state::{BeamMode, Planet, ProjectileKind, Ship, ShipId, World};
use crate::{bearing, radians_to_dir};

/// Angle between torpedoes of a spread volley
pub const SPREAD_ANGLE: f32 = 0.06;
/// Torpedoes in a spread volley
pub const SPREAD_COUNT: usize = 3;
/// Ticks between torpedo volleys
const FIRE_COOLDOWN: u64 = 3;
/// Hull damage fraction that sends a bot home
const RETREAT_DAMAGE: f32 = 0.6;
/// Fuel fraction that sends a bot home
const RETREAT_FUEL: f32 = 0.2;
/// Never spend fuel below this fraction on weapons
const FIRE_FUEL_RESERVE: f32 = 0.25;
/// Torpedoes closer than this are considered for dodging
const DODGE_DIST: f32 = 4000.0;
/// Distance at which a bot starts slowing for orbit
const ORBIT_APPROACH_DIST: f32 = 3000.0;

/// What the ship is doing, independent of what it shoots at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Maneuver {
    #[default]
    Patrol,
    Approach,
    Strafe,
    Evade,
    Orbit,
    Retreat,
}

/// Per-bot memory
#[derive(Debug, Clone)]
pub struct BotBrain {
    rng: Pcg32,
    pub target: Option<Target>,
    pub maneuver: Maneuver,
    /// Earliest tick for the next torpedo volley
    pub next_fire_tick: u64,
    /// Which way to circle the current target: 1.0 or -1.0
    pub strafe_side: f32,
}

impl BotBrain {
    pub fn new(seed: u64, slot: ShipId, tick: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            target: None,
            maneuver: Maneuver::Patrol,
            next_fire_tick: tick + slot as u64 % FIRE_COOLDOWN,
            strafe_side: 1.0,
        }
    }

    /// Plan this tick's commands for ship `id`
    pub fn think(&mut self, world: &World, id: ShipId) -> Vec<Command> {
        let Some(ship) = world.ship(id).filter(|s| s.is_alive()) else {
            return Vec::new();
        };
        let mut commands = Vec::new();

        let previous = self.target;
        if self.target.is_some_and(|t| !still_valid(world, ship, t)) {
            self.target = None;
        }
        if self.target.is_none() || self.rng.random_bool(0.1) {
            self.target = select_target(world, ship);
        }
        if self.target != previous {
            self.strafe_side = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        }

        self.maneuver = self.choose_maneuver(world, ship);
        self.steer(world, ship, &mut commands);
        self.defend(world, ship, &mut commands);
        self.shoot(world, ship, &mut commands);
        commands
    }

    fn choose_maneuver(&self, world: &World, ship: &Ship) -> Maneuver {
        let stats = ship.stats();
        let damaged = ship.hull_damage as f32 > stats.max_damage as f32 * RETREAT_DAMAGE;
        let low_fuel = (ship.fuel as f32) < stats.max_fuel as f32 * RETREAT_FUEL;
        if damaged || low_fuel || (self.maneuver == Maneuver::Retreat && needs_refit(ship)) {
            return Maneuver::Retreat;
        }
        if incoming_torpedo(world, ship).is_some() {
            return Maneuver::Evade;
        }
        match self.target {
            Some(Target::Ship(enemy)) => {
                let distance = ship.pos.distance(world.ships[enemy].pos);
                if distance > stats.torpedo_profile().effective_range() {
                    Maneuver::Approach
                } else {
                    Maneuver::Strafe
                }
            }
            Some(Target::Planet(planet)) => {
                if ship.orbiting == Some(planet) {
                    Maneuver::Orbit
                } else {
                    Maneuver::Approach
                }
            }
            None => Maneuver::Patrol,
        }
    }

    fn steer(&mut self, world: &World, ship: &Ship, out: &mut Vec<Command>) {
        let max = ship.stats().max_speed;
        match self.maneuver {
            Maneuver::Patrol => match nearest_contact(world, ship) {
                // Close in on an enemy seen on the scanner but not yet in reach
                Some(contact) => set_course(ship, bearing(ship.pos, contact), max, out),
                // Drift toward the galaxy center
                None => {
                    let heading = bearing(ship.pos, Vec2::splat(GALAXY_WIDTH / 2.0));
                    set_course(ship, heading, max / 2, out);
                }
            },
            Maneuver::Approach => match self.target {
                Some(Target::Ship(enemy)) => {
                    let enemy = &world.ships[enemy];
                    let lead = aim_weapon(
                        ship.pos,
                        enemy.pos,
                        enemy.velocity(),
                        &ship.stats().torpedo_profile(),
                    );
                    let heading = lead
                        .direction()
                        .unwrap_or_else(|| bearing(ship.pos, enemy.pos));
                    set_course(ship, heading, max, out);
                }
                Some(Target::Planet(planet)) => {
                    approach_planet(ship, &world.planets[planet], out);
                }
                None => {}
            },
            Maneuver::Strafe => {
                if let Some(Target::Ship(enemy)) = self.target {
                    let to_enemy = bearing(ship.pos, world.ships[enemy].pos);
                    // Circle the target at an angle, on the side picked when it was chosen
                    let heading = to_enemy + self.strafe_side * std::f32::consts::FRAC_PI_3;
                    set_course(ship, heading, (max * 2 / 3).max(1), out);
                }
            }
            Maneuver::Evade => {
                if let Some(torp_heading) = incoming_torpedo(world, ship) {
                    let heading = torp_heading + std::f32::consts::FRAC_PI_2;
                    set_course(ship, heading, max, out);
                }
            }
            Maneuver::Orbit => {
                if let Some(Target::Planet(planet)) = self.target {
                    work_planet(ship, &world.planets[planet], out);
                }
            }
            Maneuver::Retreat => self.retreat(world, ship, out),
        }
    }

    fn retreat(&mut self, world: &World, ship: &Ship, out: &mut Vec<Command>) {
        let Some(haven) = nearest_haven(world, ship) else {
            let heading = bearing(ship.pos, crate::sim::galaxy::home_position(ship.team));
            set_course(ship, heading, ship.stats().max_speed, out);
            return;
        };
        if ship.orbiting == Some(haven.id) {
            if !ship.repairing && ship.hull_damage > 0 {
                out.push(Command::Repair { on: true });
            }
            if !needs_refit(ship) {
                self.maneuver = Maneuver::Patrol;
                self.target = None;
            }
            return;
        }
        approach_planet(ship, haven, out);
    }

    /// Docked for repairs; shields and weapons would cancel repair mode
    fn docked(&self, ship: &Ship) -> bool {
        ship.repairing || (self.maneuver == Maneuver::Retreat && ship.orbiting.is_some())
    }

    fn defend(&mut self, world: &World, ship: &Ship, out: &mut Vec<Command>) {
        if self.docked(ship) {
            return;
        }
        let threatened = incoming_torpedo(world, ship).is_some()
            || world.ships.iter().any(|s| {
                s.team != ship.team && s.is_alive() && s.pos.distance(ship.pos) < 8000.0
            });
        if threatened != ship.shields_up && (ship.fuel > 0 || !threatened) {
            out.push(Command::Shields { up: threatened });
        }

        let close_torps = world
            .projectiles
            .iter()
            .filter(|p| {
                p.kind == ProjectileKind::Torpedo
                    && p.in_flight()
                    && p.team != ship.team
                    && p.pos.distance(ship.pos) < DETONATE_DIST
            })
            .count();
        if close_torps >= 2 && ship.fuel > ship.stats().detonate_cost * 4 {
            out.push(Command::Detonate);
        }
    }

    fn shoot(&mut self, world: &World, ship: &Ship, out: &mut Vec<Command>) {
        let Some(Target::Ship(enemy)) = self.target else {
            return;
        };
        let stats = ship.stats();
        if ship.weapons_overheated
            || self.docked(ship)
            || (ship.fuel as f32) < stats.max_fuel as f32 * FIRE_FUEL_RESERVE
        {
            return;
        }
        let enemy = &world.ships[enemy];

        let phaser_range = stats.phaser_range() * stats.safety_margin;
        if ship.phaser_reload == 0 {
            if let Some(direction) = aim_direct(ship.pos, enemy.pos, phaser_range).direction() {
                out.push(Command::FirePhaser { direction });
            }
        }

        if world.tick < self.next_fire_tick {
            return;
        }
        let torps = torpedo_solution(ship, enemy);
        if let FireSolution::Fire { direction, .. } = torps {
            let free = MAX_TORPS.saturating_sub(world.in_flight_count(ship.id, ProjectileKind::Torpedo));
            let distance = ship.pos.distance(enemy.pos);
            let spread = free >= SPREAD_COUNT
                && distance < stats.torpedo_profile().effective_range() / 2.0
                && self.rng.random_bool(0.5);
            if spread {
                out.extend(
                    spread_volley(direction, SPREAD_COUNT, SPREAD_ANGLE)
                        .map(|direction| Command::FireTorpedo { direction }),
                );
            } else if free > 0 {
                out.push(Command::FireTorpedo { direction });
            }
            self.next_fire_tick = world.tick + FIRE_COOLDOWN;
        }

        if let Some(FireSolution::Fire { direction, .. }) = plasma_solution(ship, enemy) {
            if world.in_flight_count(ship.id, ProjectileKind::Plasma) < MAX_PLASMAS
                && self.rng.random_bool(0.2)
            {
                out.push(Command::FirePlasma { direction });
            }
        }
    }
}

/// Torpedo aim from `shooter` at `target`. Depends only on positions and the
/// target's motion, never on the shooter's heading.
pub fn torpedo_solution(shooter: &Ship, target: &Ship) -> FireSolution {
    aim_weapon(
        shooter.pos,
        target.pos,
        target.velocity(),
        &shooter.stats().torpedo_profile(),
    )
}

/// Plasma aim, if the shooter carries one
pub fn plasma_solution(shooter: &Ship, target: &Ship) -> Option<FireSolution> {
    let profile = shooter.stats().plasma_profile()?;
    Some(aim_weapon(shooter.pos, target.pos, target.velocity(), &profile))
}

/// Directions of a volley of `count` shots centered on `center`
pub fn spread_volley(center: f32, count: usize, step: f32) -> impl Iterator<Item = f32> {
    let half = (count as f32 - 1.0) / 2.0;
    (0..count).map(move |i| crate::normalize_angle(center + (i as f32 - half) * step))
}

/// Issue course and speed changes, but only when they differ from the
/// current orders (any course command breaks orbit)
fn set_course(ship: &Ship, heading: f32, speed: u32, out: &mut Vec<Command>) {
    if radians_to_dir(heading) != ship.desired_dir || ship.orbiting.is_some() {
        out.push(Command::SetHeading { heading });
    }
    if speed != ship.desired_speed || ship.orbiting.is_some() {
        out.push(Command::SetSpeed { speed });
    }
}

fn approach_planet(ship: &Ship, planet: &Planet, out: &mut Vec<Command>) {
    let distance = ship.pos.distance(planet.pos);
    if distance <= ENTER_ORBIT_DIST && ship.speed <= ORBIT_MAX_SPEED {
        out.push(Command::Orbit);
        return;
    }
    let speed = if distance < ORBIT_APPROACH_DIST {
        ORBIT_MAX_SPEED
    } else {
        ship.stats().max_speed
    };
    set_course(ship, bearing(ship.pos, planet.pos), speed, out);
}

/// Beam, bomb or pick up depending on who owns the planet
fn work_planet(ship: &Ship, planet: &Planet, out: &mut Vec<Command>) {
    if planet.owner == Some(ship.team) {
        if ship.beam != BeamMode::Up {
            out.push(Command::BeamUp);
        }
        return;
    }
    if ship.armies > 0 {
        if ship.beam != BeamMode::Down {
            out.push(Command::BeamDown);
        }
    } else if planet.armies > BOMB_FLOOR && !ship.bombing {
        out.push(Command::Bomb { on: true });
    }
}

/// Still hurt or short on fuel
fn needs_refit(ship: &Ship) -> bool {
    let stats = ship.stats();
    ship.hull_damage > 0 || (ship.fuel as f32) < stats.max_fuel as f32 * 0.9
}

/// Closest own planet with repair or fuel
fn nearest_haven<'w>(world: &'w World, ship: &Ship) -> Option<&'w Planet> {
    world
        .planets
        .iter()
        .filter(|p| p.owner == Some(ship.team) && (p.flags.repair || p.flags.fuel))
        .min_by(|a, b| {
            a.pos
                .distance_squared(ship.pos)
                .total_cmp(&b.pos.distance_squared(ship.pos))
        })
}

/// Heading of the most dangerous enemy torpedo on a collision course
fn incoming_torpedo(world: &World, ship: &Ship) -> Option<f32> {
    world
        .projectiles
        .iter()
        .filter(|p| p.in_flight() && p.team != ship.team)
        .filter_map(|p| {
            let rel = ship.pos - p.pos;
            let distance = rel.length();
            if distance > DODGE_DIST {
                return None;
            }
            let dir = Vec2::from_angle(p.heading);
            // Closing, and passing close enough to hit
            (rel.dot(dir) > 0.0 && rel.perp_dot(dir).abs() < HIT_RADIUS * 2.0)
                .then_some((p.heading, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(heading, _)| heading)
}

/// Plan every due bot against the current state, then apply all commands
pub fn run_bots(world: &mut World) {
    let interval = world.rules.bot_think_interval.max(1);
    let mut plans: Vec<(ShipId, Vec<Command>)> = Vec::new();

    for id in 0..world.ships.len() {
        if !world.ships[id].is_alive() || (world.tick + id as u64) % interval != 0 {
            continue;
        }
        let Some(mut brain) = world.ships[id].brain.take() else {
            continue;
        };
        let commands = brain.think(world, id);
        world.ships[id].brain = Some(brain);
        plans.push((id, commands));
    }

    for (id, commands) in plans {
        for cmd in &commands {
            if let Err(err) = command::apply(world, id, cmd) {
                log::trace!("bot {} command {:?} refused: {}", id, cmd, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ship_class::ShipClass;
    use crate::sim::state::{Rules, Team};
    use proptest::prelude::*;

    fn face_off(distance: f32) -> World {
        let mut world = World::new(5, Rules::default());
        let bot = world.join_bot(Team::Federation, ShipClass::Destroyer).expect("slot");
        let enemy = world
            .join("target", Team::Klingon, ShipClass::Cruiser, false)
            .expect("slot");
        world.ships[bot].launch(Vec2::new(40_000.0, 40_000.0), 0);
        world.ships[enemy].launch(Vec2::new(40_000.0 + distance, 40_000.0), 64);
        world
    }

    #[test]
    fn test_spread_centres_on_intercept() {
        let shots: Vec<f32> = spread_volley(1.0, 3, SPREAD_ANGLE).collect();
        assert_eq!(shots.len(), 3);
        assert!((shots[0] - 0.94).abs() < 1e-5);
        assert!((shots[1] - 1.0).abs() < 1e-6);
        assert!((shots[2] - 1.06).abs() < 1e-5);
    }

    #[test]
    fn test_bot_fires_at_target_in_range() {
        let mut world = face_off(4000.0);
        let mut brain = world.ships[0].brain.take().expect("bot");
        brain.next_fire_tick = 0;
        let commands = brain.think(&world, 0);
        assert_eq!(brain.target, Some(Target::Ship(1)));
        assert!(commands.iter().any(|c| matches!(c, Command::FireTorpedo { .. })));
    }

    #[test]
    fn test_bot_withholds_beyond_effective_range() {
        // 6000 is inside max torp range (8400) but beyond the 5880 gate
        let mut world = face_off(6000.0);
        let mut brain = world.ships[0].brain.take().expect("bot");
        brain.next_fire_tick = 0;
        let commands = brain.think(&world, 0);
        assert!(!commands.iter().any(|c| matches!(c, Command::FireTorpedo { .. })));
        assert_eq!(brain.maneuver, Maneuver::Approach);
    }

    #[test]
    fn test_lead_points_ahead_of_crossing_target() {
        let mut world = face_off(4000.0);
        world.ships[1].speed = 6;
        let solution = torpedo_solution(&world.ships[0], &world.ships[1]);
        // Target heads +y, so the lead is above the direct bearing
        let direction = solution.direction().expect("in range");
        assert!(direction > 0.0);
    }

    #[test]
    fn test_strafe_side_kept_while_target_unchanged() {
        let mut world = face_off(4000.0);
        world.planets.clear();
        let mut brain = world.ships[0].brain.take().expect("bot");
        brain.next_fire_tick = u64::MAX;
        let headings: Vec<f32> = (0..20)
            .map(|_| {
                let commands = brain.think(&world, 0);
                assert_eq!(brain.target, Some(Target::Ship(1)));
                assert_eq!(brain.maneuver, Maneuver::Strafe);
                commands
                    .iter()
                    .find_map(|c| match c {
                        Command::SetHeading { heading } => Some(*heading),
                        _ => None,
                    })
                    .expect("strafe heading")
            })
            .collect();
        assert!(headings.iter().all(|h| *h == headings[0]));
        assert!(brain.strafe_side == 1.0 || brain.strafe_side == -1.0);
    }

    #[test]
    fn test_patrol_heads_for_distant_contact() {
        // Scanned at 15000, out of the 8400 torpedo reach
        let mut world = face_off(-15_000.0);
        world.planets.clear();
        let mut brain = world.ships[0].brain.take().expect("bot");
        let commands = brain.think(&world, 0);
        assert_eq!(brain.target, None);
        assert_eq!(brain.maneuver, Maneuver::Patrol);
        // Enemy sits due -x, away from the galaxy center
        assert!(commands.contains(&Command::SetHeading {
            heading: std::f32::consts::PI
        }));
        assert!(commands.contains(&Command::SetSpeed {
            speed: world.ships[0].stats().max_speed
        }));
    }

    #[test]
    fn test_damaged_bot_retreats() {
        let mut world = face_off(20_000.0);
        world.ships[0].hull_damage = 70;
        let mut brain = world.ships[0].brain.take().expect("bot");
        brain.think(&world, 0);
        assert_eq!(brain.maneuver, Maneuver::Retreat);
    }

    #[test]
    fn test_bot_commands_go_through_validation() {
        let mut world = face_off(4000.0);
        world.ships[0].fuel = 0;
        world.tick = 0;
        world.rules.bot_think_interval = 1;
        run_bots(&mut world);
        // Fuel reserve keeps the bot from even trying; nothing fired
        assert!(world.projectiles.is_empty());
        assert!(world.ships[0].brain.is_some());
    }

    #[test]
    fn test_bots_plan_on_same_state() {
        let mut world = World::new(9, Rules::default());
        let a = world.join_bot(Team::Romulan, ShipClass::Scout).expect("slot");
        let b = world.join_bot(Team::Orion, ShipClass::Scout).expect("slot");
        world.ships[a].launch(Vec2::new(30_000.0, 30_000.0), 0);
        world.ships[b].launch(Vec2::new(33_000.0, 30_000.0), 128);
        world.rules.bot_think_interval = 1;
        run_bots(&mut world);
        // Both saw each other alive and engaged
        let targets: Vec<_> = [a, b]
            .iter()
            .map(|&id| world.ships[id].brain.as_ref().and_then(|br| br.target))
            .collect();
        assert_eq!(targets, vec![Some(Target::Ship(b)), Some(Target::Ship(a))]);
    }

    proptest! {
        #[test]
        fn prop_aim_ignores_shooter_heading(
            dx in -5000.0f32..5000.0,
            dy in -5000.0f32..5000.0,
            target_dir in any::<u8>(),
            target_speed in 0u32..9,
            heading_a in any::<u8>(),
            heading_b in any::<u8>(),
        ) {
            let world = face_off(1000.0);
            let mut shooter = world.ships[0].clone();
            let mut target = world.ships[1].clone();
            target.pos = shooter.pos + Vec2::new(dx, dy);
            target.dir = target_dir;
            target.speed = target_speed;

            shooter.dir = heading_a;
            let first = torpedo_solution(&shooter, &target);
            shooter.dir = heading_b;
            shooter.desired_dir = heading_b;
            let second = torpedo_solution(&shooter, &target);
            prop_assert_eq!(first, second);
        }
    }
}
