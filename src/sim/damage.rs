//! Shared damage rule
//!
//! Torpedoes, phasers, plasmas, planets and explosions all land here so that
//! shields-then-hull semantics are the same everywhere.

use super::state::{BeamMode, Ship, ShipId, ShipStatus, SimEvent, World};
use crate::consts::EXPLODE_TICKS;

/// What a single hit did to a ship
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageReport {
    pub shield_absorbed: u32,
    pub hull_applied: u32,
    /// Hull reached the class maximum
    pub destroyed: bool,
}

impl DamageReport {
    /// Total damage taken (shields + hull)
    pub fn absorbed(&self) -> u32 {
        self.shield_absorbed + self.hull_applied
    }
}

/// Apply `amount` damage to `ship`.
///
/// Raised shields soak up to their current value; the rest goes to the hull.
/// The hull gauge saturates at the class maximum but `hull_applied` always
/// reports the full remainder so `absorbed() == amount`.
pub fn apply_damage(ship: &mut Ship, amount: u32) -> DamageReport {
    let max_damage = ship.stats().max_damage;
    let shield_absorbed = if ship.shields_up {
        amount.min(ship.shields)
    } else {
        0
    };
    ship.shields -= shield_absorbed;

    let hull_applied = amount - shield_absorbed;
    ship.hull_damage = ship.hull_damage.saturating_add(hull_applied).min(max_damage);

    DamageReport {
        shield_absorbed,
        hull_applied,
        destroyed: ship.hull_damage >= max_damage,
    }
}

/// Hit ship `victim` for `amount` on behalf of `attacker`.
///
/// `attacker` is `None` for planets. Resolves the kill when the hull gives
/// out. Ships that are not alive are left untouched.
pub fn strike(
    world: &mut World,
    victim: ShipId,
    attacker: Option<ShipId>,
    amount: u32,
) -> DamageReport {
    let tournament = world.tournament.active;
    let Some(ship) = world.ships.get_mut(victim) else {
        return DamageReport::default();
    };
    if !ship.is_alive() {
        return DamageReport::default();
    }
    let report = apply_damage(ship, amount);
    if attacker.is_some() {
        ship.last_attacker = attacker;
    }
    // Any hit knocks a ship out of repair mode
    ship.repairing = false;

    if tournament {
        if let Some(shooter) = attacker.and_then(|id| world.ships.get_mut(id)) {
            shooter.record.damage_dealt += report.absorbed();
        }
    }
    if report.destroyed {
        destroy(world, victim, attacker);
    }
    report
}

/// Put a ship into its explosion and credit the kill
pub fn destroy(world: &mut World, victim: ShipId, killer: Option<ShipId>) {
    let tournament = world.tournament.active;
    let Some(ship) = world.ships.get_mut(victim) else {
        return;
    };
    let victim_team = ship.team;
    ship.status = ShipStatus::Exploding;
    ship.explode_ticks = EXPLODE_TICKS;
    ship.deaths += 1;
    if tournament {
        ship.record.deaths += 1;
    }
    // Carried armies die with the ship
    ship.armies = 0;
    ship.clear_activity();
    ship.beam = BeamMode::Off;
    ship.cloaked = false;
    ship.shields_up = false;
    ship.desired_speed = 0;

    let credited = killer.filter(|&k| k != victim).and_then(|k| {
        let shooter = world.ships.get_mut(k)?;
        (shooter.team != victim_team).then(|| {
            shooter.kills += 1;
            if tournament {
                shooter.record.kills += 1;
            }
            k
        })
    });

    match credited {
        Some(k) => log::info!(
            "{} ({}) destroyed by {} ({})",
            world.ships[victim].name,
            victim,
            world.ships[k].name,
            k
        ),
        None => log::info!("{} ({}) destroyed", world.ships[victim].name, victim),
    }
    world.events.push(SimEvent::ShipDestroyed {
        victim,
        killer: credited,
    });
}

/// Damage falling off linearly from `full` at `inner` to zero at `outer`
pub fn falloff(full: u32, distance: f32, inner: f32, outer: f32) -> u32 {
    if distance <= inner {
        full
    } else if distance >= outer {
        0
    } else {
        (full as f32 * (outer - distance) / (outer - inner)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ship_class::ShipClass;
    use crate::sim::state::{Rules, Team};
    use glam::Vec2;
    use proptest::prelude::*;

    fn ship(class: ShipClass) -> Ship {
        let mut ship = Ship::free(0);
        ship.class = class;
        ship.launch(Vec2::splat(1000.0), 0);
        ship
    }

    #[test]
    fn test_shields_absorb_then_hull() {
        let mut s = ship(ShipClass::Cruiser);
        s.shields_up = true;
        s.shields = 20;
        let report = apply_damage(&mut s, 35);
        assert_eq!(s.shields, 0);
        assert_eq!(s.hull_damage, 15);
        assert_eq!(report.shield_absorbed, 20);
        assert_eq!(report.hull_applied, 15);
        assert_eq!(report.absorbed(), 35);
        assert!(!report.destroyed);
    }

    #[test]
    fn test_lowered_shields_do_not_absorb() {
        let mut s = ship(ShipClass::Destroyer);
        s.shields_up = false;
        let before = s.shields;
        let report = apply_damage(&mut s, 30);
        assert_eq!(s.shields, before);
        assert_eq!(report.hull_applied, 30);
    }

    #[test]
    fn test_overkill_saturates_hull() {
        let mut s = ship(ShipClass::Scout);
        let report = apply_damage(&mut s, 500);
        assert!(report.destroyed);
        assert_eq!(s.hull_damage, s.stats().max_damage);
        assert_eq!(report.absorbed(), 500);
    }

    fn duel() -> World {
        let mut world = World::new(3, Rules::default());
        world.ships[0].team = Team::Federation;
        world.ships[0].launch(Vec2::new(20_000.0, 20_000.0), 0);
        world.ships[1].team = Team::Klingon;
        world.ships[1].launch(Vec2::new(22_000.0, 20_000.0), 0);
        world
    }

    #[test]
    fn test_strike_credits_kill() {
        let mut world = duel();
        let report = strike(&mut world, 1, Some(0), 1000);
        assert!(report.destroyed);
        assert_eq!(world.ships[1].status, ShipStatus::Exploding);
        assert_eq!(world.ships[1].deaths, 1);
        assert_eq!(world.ships[0].kills, 1);
        assert_eq!(
            world.take_events(),
            vec![SimEvent::ShipDestroyed {
                victim: 1,
                killer: Some(0)
            }]
        );
    }

    #[test]
    fn test_strike_ignores_exploding_ship() {
        let mut world = duel();
        strike(&mut world, 1, Some(0), 1000);
        let report = strike(&mut world, 1, Some(0), 10);
        assert_eq!(report, DamageReport::default());
        assert_eq!(world.ships[0].kills, 1);
    }

    #[test]
    fn test_planet_kill_has_no_killer() {
        let mut world = duel();
        strike(&mut world, 0, None, 1000);
        assert_eq!(
            world.take_events(),
            vec![SimEvent::ShipDestroyed {
                victim: 0,
                killer: None
            }]
        );
    }

    #[test]
    fn test_falloff_bounds() {
        assert_eq!(falloff(100, 100.0, 350.0, 3000.0), 100);
        assert_eq!(falloff(100, 3000.0, 350.0, 3000.0), 0);
        let mid = falloff(100, 1675.0, 350.0, 3000.0);
        assert!(mid > 40 && mid < 60);
    }

    proptest! {
        #[test]
        fn prop_damage_conserved(
            shields in 0u32..=130,
            hull in 0u32..130,
            up in any::<bool>(),
            amount in 0u32..400,
        ) {
            let mut s = ship(ShipClass::Battleship);
            s.shields = shields;
            s.hull_damage = hull;
            s.shields_up = up;
            let report = apply_damage(&mut s, amount);
            prop_assert!(report.shield_absorbed <= shields);
            prop_assert_eq!(report.hull_applied, amount - report.shield_absorbed);
            prop_assert!(report.absorbed() <= amount);
            prop_assert!(s.hull_damage <= s.stats().max_damage);
            prop_assert_eq!(s.shields, shields - report.shield_absorbed);
        }
    }
}
