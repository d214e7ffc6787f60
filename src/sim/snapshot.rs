//! Immutable per-tick views of the world
//!
//! Snapshots are built while the tick still holds the write lock, then handed
//! to subscribers behind an `Arc`. Nothing in here borrows from the world.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ship_class::ShipClass;
use super::state::{
    BeamMode, ForceBeam, Outcome, Planet, PlanetId, Projectile, Ship, ShipId, ShipStatus,
    SimEvent, Team, TeamTally, TournamentRecord, World,
};

/// Public view of one occupied ship slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipView {
    pub id: ShipId,
    pub name: String,
    pub team: Team,
    pub class: ShipClass,
    pub status: ShipStatus,
    pub bot: bool,
    pub pos: Vec2,
    pub dir: u8,
    pub speed: u32,
    pub shields: u32,
    pub shields_up: bool,
    pub hull_damage: u32,
    pub fuel: u32,
    pub weapon_temp: u32,
    pub engine_temp: u32,
    pub cloaked: bool,
    pub repairing: bool,
    pub bombing: bool,
    pub beam: BeamMode,
    pub force_beam: Option<ForceBeam>,
    pub orbiting: Option<PlanetId>,
    pub armies: u32,
    pub kills: u32,
    pub deaths: u32,
    pub record: TournamentRecord,
}

impl From<&Ship> for ShipView {
    fn from(ship: &Ship) -> Self {
        Self {
            id: ship.id,
            name: ship.name.clone(),
            team: ship.team,
            class: ship.class,
            status: ship.status,
            bot: ship.is_bot(),
            pos: ship.pos,
            dir: ship.dir,
            speed: ship.speed,
            shields: ship.shields,
            shields_up: ship.shields_up,
            hull_damage: ship.hull_damage,
            fuel: ship.fuel,
            weapon_temp: ship.weapon_temp,
            engine_temp: ship.engine_temp,
            cloaked: ship.cloaked,
            repairing: ship.repairing,
            bombing: ship.bombing,
            beam: ship.beam,
            force_beam: ship.force_beam,
            orbiting: ship.orbiting,
            armies: ship.armies,
            kills: ship.kills,
            deaths: ship.deaths,
            record: ship.record,
        }
    }
}

/// Everything a client needs to draw one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub outcome: Outcome,
    pub tournament: bool,
    pub ships: Vec<ShipView>,
    pub planets: Vec<Planet>,
    pub projectiles: Vec<Projectile>,
    pub tallies: Vec<TeamTally>,
    pub events: Vec<SimEvent>,
}

impl WorldSnapshot {
    /// Copy out the visible state. Free slots are left out.
    pub fn capture(world: &World, events: Vec<SimEvent>) -> Self {
        Self {
            tick: world.tick,
            outcome: world.outcome,
            tournament: world.tournament.active,
            ships: world
                .ships
                .iter()
                .filter(|s| s.status != ShipStatus::Free)
                .map(ShipView::from)
                .collect(),
            planets: world.planets.clone(),
            projectiles: world.projectiles.clone(),
            tallies: world.tallies.clone(),
            events,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Aggregate per-team statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team: Team,
    pub players: u32,
    pub alive: u32,
    pub planets: u32,
    pub armies: u32,
    pub kills: u32,
    pub deaths: u32,
}

/// Team statistics from the current world state
pub fn team_stats(world: &World) -> Vec<TeamStats> {
    Team::ALL
        .iter()
        .map(|&team| {
            let tally = world.tallies.iter().find(|t| t.team == team);
            let members = world
                .ships
                .iter()
                .filter(|s| s.team == team && s.status.is_active());
            let (kills, deaths) = members.fold((0, 0), |(k, d), s| (k + s.kills, d + s.deaths));
            TeamStats {
                team,
                players: tally.map_or(0, |t| t.players),
                alive: tally.map_or(0, |t| t.alive),
                planets: tally.map_or(0, |t| t.planets),
                armies: tally.map_or(0, |t| t.armies),
                kills,
                deaths,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Rules;

    #[test]
    fn test_capture_skips_free_slots() {
        let mut world = World::new(2, Rules::default());
        world
            .join("pilot", Team::Orion, ShipClass::Cruiser, false)
            .expect("slot");
        let snapshot = WorldSnapshot::capture(&world, Vec::new());
        assert_eq!(snapshot.ships.len(), 1);
        assert_eq!(snapshot.ships[0].name, "pilot");
        assert_eq!(snapshot.planets.len(), 40);
    }

    #[test]
    fn test_snapshot_serializes() {
        let world = World::new(2, Rules::default());
        let snapshot = WorldSnapshot::capture(&world, vec![SimEvent::TournamentStarted]);
        let json = snapshot.to_json().expect("serializable");
        let back: WorldSnapshot = serde_json::from_str(&json).expect("parses");
        assert_eq!(back.tick, snapshot.tick);
        assert_eq!(back.events, snapshot.events);
        assert_eq!(back.planets.len(), snapshot.planets.len());
    }

    #[test]
    fn test_team_stats_sum_kills() {
        let mut world = World::new(2, Rules::default());
        let a = world
            .join("a", Team::Klingon, ShipClass::Scout, false)
            .expect("slot");
        let b = world
            .join("b", Team::Klingon, ShipClass::Scout, false)
            .expect("slot");
        world.ships[a].kills = 2;
        world.ships[b].kills = 3;
        world.ships[b].deaths = 1;
        world.refresh_tallies();
        let stats = team_stats(&world);
        let klingon = stats[Team::Klingon.index()];
        assert_eq!((klingon.players, klingon.kills, klingon.deaths), (2, 5, 1));
        assert_eq!(klingon.planets, 10);
    }
}
