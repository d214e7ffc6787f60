//! Tournament gating and win conditions

use super::state::{Outcome, SimEvent, Team, World};

/// Latch tournament mode once two teams are big enough
pub fn update_tournament(world: &mut World) {
    if world.tournament.active {
        return;
    }
    let min = world.rules.tournament_min_per_team;
    let qualified = Team::ALL
        .iter()
        .filter(|&&team| world.team_players(team) >= min)
        .count();
    if qualified >= 2 {
        world.tournament.active = true;
        world.tournament.started_tick = Some(world.tick);
        log::info!("Tournament mode started at tick {}", world.tick);
        world.events.push(SimEvent::TournamentStarted);
    }
}

/// Evaluate the win conditions for the current state
pub fn evaluate(world: &World) -> Outcome {
    if !world.tournament.active {
        return Outcome::Ongoing;
    }

    // Conquest: one team owns every planet
    if let Some(first) = world.planets.first().and_then(|p| p.owner) {
        if world.planets.iter().all(|p| p.owner == Some(first)) {
            return Outcome::Conquest { winner: first };
        }
    }

    // Genocide: every active player is on one team
    let mut teams = world
        .ships
        .iter()
        .filter(|s| s.status.is_active())
        .map(|s| s.team);
    if let Some(first) = teams.next() {
        if teams.all(|t| t == first) {
            return Outcome::Genocide { winner: first };
        }
    }
    Outcome::Ongoing
}

/// Tournament latch plus win check; a win freezes the world
pub fn update(world: &mut World) {
    update_tournament(world);
    if world.outcome.is_terminal() {
        return;
    }
    let outcome = evaluate(world);
    if outcome.is_terminal() {
        log::info!("Game over at tick {}: {:?}", world.tick, outcome);
        world.outcome = outcome;
        world.events.push(SimEvent::Victory(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ship_class::ShipClass;
    use crate::sim::state::{Rules, ShipStatus};

    fn world_with(teams: &[(Team, usize)]) -> World {
        let rules = Rules {
            tournament_min_per_team: 2,
            ..Rules::default()
        };
        let mut world = World::new(31, rules);
        for &(team, count) in teams {
            for n in 0..count {
                world
                    .join(&format!("{team:?}{n}"), team, ShipClass::Destroyer, false)
                    .expect("slot");
            }
        }
        world
    }

    #[test]
    fn test_tournament_needs_two_teams() {
        let mut world = world_with(&[(Team::Federation, 3), (Team::Klingon, 1)]);
        update(&mut world);
        assert!(!world.tournament.active);

        world.join("late", Team::Klingon, ShipClass::Scout, false).expect("slot");
        update(&mut world);
        assert!(world.tournament.active);
        assert_eq!(world.events, vec![SimEvent::TournamentStarted]);
        assert_eq!(world.outcome, Outcome::Ongoing);
    }

    #[test]
    fn test_no_victory_outside_tournament() {
        let mut world = world_with(&[(Team::Federation, 1)]);
        for p in world.planets.iter_mut() {
            p.owner = Some(Team::Federation);
        }
        update(&mut world);
        assert_eq!(world.outcome, Outcome::Ongoing);
    }

    #[test]
    fn test_conquest() {
        let mut world = world_with(&[(Team::Federation, 2), (Team::Romulan, 2)]);
        update(&mut world);
        for p in world.planets.iter_mut() {
            p.owner = Some(Team::Romulan);
        }
        update(&mut world);
        assert_eq!(
            world.outcome,
            Outcome::Conquest {
                winner: Team::Romulan
            }
        );
    }

    #[test]
    fn test_genocide_counts_dead_players() {
        let mut world = world_with(&[(Team::Federation, 2), (Team::Orion, 2)]);
        update(&mut world);
        // Dead players still count as present
        world.ships[2].status = ShipStatus::Dead;
        update(&mut world);
        assert_eq!(world.outcome, Outcome::Ongoing);

        world.leave(2);
        world.leave(3);
        update(&mut world);
        assert_eq!(
            world.outcome,
            Outcome::Genocide {
                winner: Team::Federation
            }
        );
        assert!(world.events.contains(&SimEvent::Victory(world.outcome)));
    }

    #[test]
    fn test_tournament_stays_latched() {
        let mut world = world_with(&[(Team::Klingon, 2), (Team::Orion, 2)]);
        update(&mut world);
        world.leave(0);
        update(&mut world);
        assert!(world.tournament.active);
    }
}
