//! Target selection
//!
//! Candidates are scored on distance, threat and strategic value. Ships that
//! a bot cannot see or cannot reach with any weapon are never candidates,
//! and neither are planets its team has not scouted. Enemies seen on the
//! scanner but out of reach are left to [`nearest_contact`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{BOMB_FLOOR, CLOAK_DETECT_DIST, GALAXY_WIDTH};
use crate::sim::state::{Planet, PlanetId, Ship, ShipId, World};

/// How far bot sensors reach
pub const SCAN_RANGE: f32 = 25_000.0;

/// Something a bot is going after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Ship(ShipId),
    Planet(PlanetId),
}

/// A candidate with its priority
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub target: Target,
    pub score: f32,
}

/// Can `observer` see `other`?
pub fn can_see(observer: &Ship, other: &Ship) -> bool {
    if !other.is_alive() || other.id == observer.id {
        return false;
    }
    let distance = observer.pos.distance(other.pos);
    if distance > SCAN_RANGE {
        return false;
    }
    !other.cloaked || distance < CLOAK_DETECT_DIST
}

/// Is `enemy` an enemy `bot` can both see and hit from here?
pub fn in_weapon_range(bot: &Ship, enemy: &Ship) -> bool {
    enemy.team != bot.team
        && can_see(bot, enemy)
        && bot.pos.distance(enemy.pos) <= bot.stats().max_weapon_range()
}

/// Position of the closest visible enemy, in weapon range or not
pub fn nearest_contact(world: &World, bot: &Ship) -> Option<Vec2> {
    world
        .ships
        .iter()
        .filter(|s| s.team != bot.team && can_see(bot, s))
        .map(|s| s.pos)
        .min_by(|a, b| a.distance_squared(bot.pos).total_cmp(&b.distance_squared(bot.pos)))
}

/// Priority of an enemy ship
pub fn score_ship(bot: &Ship, enemy: &Ship) -> f32 {
    let distance = bot.pos.distance(enemy.pos);
    let closeness = 1.0 - distance / SCAN_RANGE;
    let stats = enemy.stats();
    // Wounded ships are easier kills
    let weakness = enemy.hull_damage as f32 / stats.max_damage as f32;
    // Army carriers are about to take planets
    let carrier = if enemy.armies > 0 { 1.5 } else { 0.0 };
    // Whoever is shooting at us
    let threat = if bot.last_attacker == Some(enemy.id) {
        1.0
    } else {
        0.0
    };
    2.0 * closeness + weakness + carrier + threat
}

/// Priority of a planet, or `None` if the bot has no business there
pub fn score_planet(bot: &Ship, planet: &Planet) -> Option<f32> {
    if !planet.known_to(bot.team) {
        return None;
    }
    let distance = bot.pos.distance(planet.pos);
    let closeness = 1.0 - distance / GALAXY_WIDTH;
    let capacity = bot.stats().army_capacity(bot.kills);

    if planet.owner == Some(bot.team) {
        // Pick up armies to carry to the front
        if bot.armies < capacity && planet.armies > BOMB_FLOOR {
            return Some(0.5 + closeness);
        }
        return None;
    }
    if bot.armies > 0 {
        // Worth landing on if we can overwhelm the defenders
        let odds = bot.armies as f32 / (planet.armies + 1) as f32;
        return Some(1.0 + closeness + odds.min(2.0) + if planet.flags.core { 0.5 } else { 0.0 });
    }
    if planet.armies > BOMB_FLOOR {
        let value = if planet.flags.agri { 0.5 } else { 0.0 };
        return Some(0.25 + closeness + value);
    }
    None
}

/// All candidates for `bot`, best first. Ties go to the lower id.
pub fn rank_targets(world: &World, bot: &Ship) -> Vec<Scored> {
    let mut scored: Vec<Scored> = world
        .ships
        .iter()
        .filter(|s| in_weapon_range(bot, s))
        .map(|s| Scored {
            target: Target::Ship(s.id),
            score: score_ship(bot, s),
        })
        .chain(world.planets.iter().filter_map(|p| {
            score_planet(bot, p).map(|score| Scored {
                target: Target::Planet(p.id),
                score,
            })
        }))
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Best target for `bot`
pub fn select_target(world: &World, bot: &Ship) -> Option<Target> {
    rank_targets(world, bot).first().map(|s| s.target)
}

/// Is a previously chosen target still worth chasing?
pub fn still_valid(world: &World, bot: &Ship, target: Target) -> bool {
    match target {
        Target::Ship(id) => world
            .ship(id)
            .is_some_and(|s| in_weapon_range(bot, s)),
        Target::Planet(id) => world
            .planets
            .get(id)
            .is_some_and(|p| score_planet(bot, p).is_some()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ship_class::ShipClass;
    use crate::sim::state::{Rules, Team};
    use glam::Vec2;

    fn arena() -> World {
        let mut world = World::new(77, Rules::default());
        for (slot, team, x) in [
            (0, Team::Federation, 50_000.0),
            (1, Team::Klingon, 53_000.0),
            (2, Team::Klingon, 57_000.0),
        ] {
            world.ships[slot].team = team;
            world.ships[slot].class = ShipClass::Destroyer;
            world.ships[slot].launch(Vec2::new(x, 50_000.0), 0);
        }
        world
    }

    #[test]
    fn test_nearest_enemy_preferred() {
        let world = arena();
        assert_eq!(select_target(&world, &world.ships[0]), Some(Target::Ship(1)));
    }

    #[test]
    fn test_dead_and_cloaked_excluded() {
        let mut world = arena();
        world.ships[1].status = crate::sim::state::ShipStatus::Dead;
        world.ships[2].cloaked = true;
        let ranked = rank_targets(&world, &world.ships[0]);
        assert!(ranked.iter().all(|s| !matches!(s.target, Target::Ship(_))));
    }

    #[test]
    fn test_cloak_seen_up_close() {
        let mut world = arena();
        world.ships[1].cloaked = true;
        world.ships[1].pos.x = 51_500.0;
        assert!(can_see(&world.ships[0], &world.ships[1]));
    }

    #[test]
    fn test_attacker_is_a_threat() {
        let mut world = arena();
        world.ships[0].last_attacker = Some(2);
        // The farther ship outranks the nearer one once it opens fire
        let bot = &world.ships[0];
        assert!(score_ship(bot, &world.ships[2]) > score_ship(bot, &world.ships[1]));
        assert_eq!(select_target(&world, bot), Some(Target::Ship(2)));
    }

    #[test]
    fn test_enemy_beyond_weapon_range_not_targeted() {
        let mut world = World::new(77, Rules::default());
        world.planets.clear();
        for (slot, team, x) in [(0, Team::Federation, 30_000.0), (1, Team::Klingon, 50_000.0)] {
            world.ships[slot].team = team;
            world.ships[slot].class = ShipClass::Destroyer;
            world.ships[slot].launch(Vec2::new(x, 30_000.0), 0);
        }
        let bot = &world.ships[0];
        // On the scanner at 20000 but far past the 8400 torpedo reach
        assert!(can_see(bot, &world.ships[1]));
        assert!(!in_weapon_range(bot, &world.ships[1]));
        assert_eq!(select_target(&world, bot), None);
        assert!(!still_valid(&world, bot, Target::Ship(1)));
        assert_eq!(nearest_contact(&world, bot), Some(Vec2::new(50_000.0, 30_000.0)));

        world.ships[1].pos.x = 38_000.0;
        assert_eq!(select_target(&world, &world.ships[0]), Some(Target::Ship(1)));
    }

    #[test]
    fn test_unscouted_planets_ignored() {
        let world = arena();
        let bot = &world.ships[0];
        let enemy_planet = world
            .planets
            .iter()
            .find(|p| p.owner == Some(Team::Orion))
            .expect("orion planet");
        assert!(score_planet(bot, enemy_planet).is_none());
    }

    #[test]
    fn test_carrier_wants_weak_planets() {
        let mut world = arena();
        let planet = world
            .planets
            .iter()
            .position(|p| p.owner == Some(Team::Klingon))
            .expect("klingon planet");
        world.planets[planet].info |= Team::Federation.bit();
        world.planets[planet].armies = 2;
        world.ships[0].kills = 3;
        world.ships[0].armies = 5;
        let loaded = score_planet(&world.ships[0], &world.planets[planet]).expect("candidate");
        world.ships[0].armies = 0;
        assert!(score_planet(&world.ships[0], &world.planets[planet]).is_none());
        assert!(loaded > 1.0);
    }
}
