//! Fixed-order world update
//!
//! One call advances the world by exactly one tick. Subsystems run in a fixed
//! order so each phase sees the previous phases' results for the same tick.

use super::state::{SimEvent, World};
use super::{physics, planet, projectile, systems, victory};

/// Advance the world by one tick and return what happened during it.
///
/// A finished game is frozen: nothing moves and no events are produced until
/// the world is reset.
pub fn tick(world: &mut World) -> Vec<SimEvent> {
    if world.outcome.is_terminal() {
        return Vec::new();
    }

    world.tick += 1;

    physics::integrate(world);
    systems::update(world);
    // Projectiles test against post-movement ship positions
    projectile::advance(world);
    planet::update(world);
    crate::ai::run_bots(world);

    world.refresh_tallies();
    victory::update(world);
    projectile::settle(world);

    debug_assert_eq!(world.check_invariants(), Ok(()));

    world.take_events()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ship_class::ShipClass;
    use crate::sim::snapshot::WorldSnapshot;
    use crate::sim::state::{Outcome, ProjectileStatus, Rules, ShipStatus, Team};
    use glam::Vec2;

    fn skirmish(seed: u64) -> World {
        let mut world = World::new(seed, Rules::default());
        for team in [Team::Federation, Team::Klingon] {
            for class in [ShipClass::Destroyer, ShipClass::Cruiser] {
                world.join_bot(team, class).expect("slot");
            }
        }
        world
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut world = World::new(1, Rules::default());
        tick(&mut world);
        tick(&mut world);
        assert_eq!(world.tick, 2);
    }

    #[test]
    fn test_outfitting_ships_launch() {
        let mut world = World::new(1, Rules::default());
        let id = world
            .join("pilot", Team::Romulan, ShipClass::Scout, false)
            .expect("slot");
        assert_eq!(world.ships[id].status, ShipStatus::Outfitting);
        tick(&mut world);
        assert_eq!(world.ships[id].status, ShipStatus::Alive);
    }

    #[test]
    fn test_same_seed_same_game() {
        let mut a = skirmish(99);
        let mut b = skirmish(99);
        for _ in 0..300 {
            let ea = tick(&mut a);
            let eb = tick(&mut b);
            assert_eq!(ea, eb);
        }
        assert_eq!(
            WorldSnapshot::capture(&a, Vec::new()),
            WorldSnapshot::capture(&b, Vec::new())
        );
    }

    #[test]
    fn test_finished_game_is_frozen() {
        let mut world = skirmish(3);
        tick(&mut world);
        world.outcome = Outcome::Conquest {
            winner: Team::Klingon,
        };
        let before = WorldSnapshot::capture(&world, Vec::new());
        for _ in 0..20 {
            assert!(tick(&mut world).is_empty());
        }
        assert_eq!(WorldSnapshot::capture(&world, Vec::new()), before);
    }

    #[test]
    fn test_burnt_out_torpedo_visible_for_one_tick() {
        let mut world = World::new(4, Rules::default());
        let id = world
            .join("gunner", Team::Orion, ShipClass::Cruiser, false)
            .expect("slot");
        tick(&mut world);
        // Open space
        world.planets.clear();
        world.ships[id].pos = Vec2::new(50_000.0, 50_000.0);
        world.ships[id].desired_speed = 0;
        world.ships[id].speed = 0;
        // Fire into empty space
        crate::sim::projectile::fire_torpedo(&mut world, id, 0.0).expect("fires");
        let fuse = world.projectiles[0].fuse;

        for _ in 0..fuse - 1 {
            tick(&mut world);
            assert!(world.projectiles[0].in_flight());
        }
        tick(&mut world);
        assert_eq!(world.projectiles[0].fuse, 0);
        assert_eq!(world.projectiles[0].status, ProjectileStatus::Exploding);
        let snapshot = WorldSnapshot::capture(&world, Vec::new());
        assert_eq!(snapshot.projectiles.len(), 1);

        tick(&mut world);
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn test_detonated_torpedo_visible_for_one_tick() {
        let mut world = World::new(6, Rules::default());
        let defender = world
            .join("defender", Team::Federation, ShipClass::Cruiser, false)
            .expect("slot");
        let attacker = world
            .join("attacker", Team::Klingon, ShipClass::Cruiser, false)
            .expect("slot");
        tick(&mut world);
        world.planets.clear();
        world.ships[defender].launch(Vec2::new(40_000.0, 40_000.0), 0);
        world.ships[attacker].launch(Vec2::new(48_000.0, 40_000.0), 128);
        crate::sim::projectile::fire_torpedo(&mut world, attacker, std::f32::consts::PI)
            .expect("fires");
        world.projectiles[0].pos = Vec2::new(41_000.0, 40_000.0);

        // Between ticks, as a client command would arrive
        crate::sim::command::apply(&mut world, defender, &crate::sim::Command::Detonate)
            .expect("detonates");
        tick(&mut world);
        let snapshot = WorldSnapshot::capture(&world, Vec::new());
        assert_eq!(snapshot.projectiles.len(), 1);
        assert_eq!(snapshot.projectiles[0].status, ProjectileStatus::Exploding);

        tick(&mut world);
        assert!(world.projectiles.is_empty());
        assert_eq!(world.ships[defender].hull_damage, 0);
    }

    #[test]
    fn test_projectiles_see_moved_ships() {
        let mut world = World::new(8, Rules::default());
        let gunner = world
            .join("gunner", Team::Federation, ShipClass::Cruiser, false)
            .expect("slot");
        let target = world
            .join("target", Team::Romulan, ShipClass::Cruiser, false)
            .expect("slot");
        tick(&mut world);
        world.ships[gunner].launch(Vec2::new(40_000.0, 40_000.0), 0);
        world.ships[target].launch(Vec2::new(45_000.0, 40_000.0), 64);

        crate::sim::projectile::fire_torpedo(&mut world, gunner, 0.0).expect("fires");
        // The target flies out of the path before the torpedo arrives
        world.ships[target].speed = 9;
        world.ships[target].desired_speed = 9;
        for _ in 0..20 {
            tick(&mut world);
        }
        assert_ne!(world.ships[target].last_attacker, Some(gunner));
    }
}
