//! Galaxy generation
//!
//! Forty planets, ten per team quadrant. Layout is fully determined by the
//! world seed.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::state::{Planet, PlanetFlags, Team};
use crate::consts::GALAXY_WIDTH;

pub const PLANETS_PER_TEAM: usize = 10;

/// Minimum distance between two planets of a quadrant
const MIN_SEPARATION: f32 = 7000.0;
/// Keep planets away from quadrant borders
const QUADRANT_INSET: f32 = 4000.0;
/// Placement attempts before falling back to a grid slot
const MAX_ATTEMPTS: u32 = 200;
/// Planets nearest home (including home) marked as core
const CORE_COUNT: usize = 4;

const NAMES: [[&str; PLANETS_PER_TEAM]; 4] = [
    [
        "Earth", "Rigel", "Canopus", "Beta Crucis", "Organia", "Deneb", "Ceti Alpha V",
        "Altair", "Vega", "Alpha Centauri",
    ],
    [
        "Romulus", "Eridani", "Aldeberan", "Regulus", "Capella", "Tauri", "Draconis",
        "Sirius", "Indi", "Hydrae",
    ],
    [
        "Klingus", "Pliedes V", "Andromeda", "Lalande", "Pollux", "Lyrae", "Scorpii", "Mira",
        "Cygni", "Castor",
    ],
    [
        "Orion", "Cassiopia", "El Nath", "Spica", "Procyon", "Polaris", "Arcturus",
        "Ursae Majoris", "Herculis", "Antares",
    ],
];

/// Lower-left corner of a team's quadrant
pub fn quadrant_origin(team: Team) -> Vec2 {
    let half = GALAXY_WIDTH / 2.0;
    match team {
        Team::Federation => Vec2::new(0.0, half),
        Team::Romulan => Vec2::new(0.0, 0.0),
        Team::Klingon => Vec2::new(half, 0.0),
        Team::Orion => Vec2::new(half, half),
    }
}

/// Home world position for a team
pub fn home_position(team: Team) -> Vec2 {
    let half = GALAXY_WIDTH / 2.0;
    // Homes sit 40% of the way into their quadrant, away from the center
    let offset = match team {
        Team::Federation => Vec2::new(0.4, 0.6),
        Team::Romulan => Vec2::new(0.4, 0.4),
        Team::Klingon => Vec2::new(0.6, 0.4),
        Team::Orion => Vec2::new(0.6, 0.6),
    };
    quadrant_origin(team) + offset * half
}

/// Generate all planets, ordered by team then index (ids 0..40)
pub fn generate_planets(rng: &mut Pcg32) -> Vec<Planet> {
    let mut planets = Vec::with_capacity(PLANETS_PER_TEAM * Team::ALL.len());
    for team in Team::ALL {
        let positions = place_quadrant(team, rng);
        let home = positions[0];

        // Core worlds: the ones closest to home
        let mut by_distance: Vec<usize> = (0..positions.len()).collect();
        by_distance.sort_by(|&a, &b| {
            home.distance(positions[a])
                .partial_cmp(&home.distance(positions[b]))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let core: Vec<usize> = by_distance.into_iter().take(CORE_COUNT).collect();
        // One agricultural world per team, the farthest from home
        let agri_index = positions
            .iter()
            .enumerate()
            .max_by(|a, b| {
                home.distance(*a.1)
                    .partial_cmp(&home.distance(*b.1))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(PLANETS_PER_TEAM - 1);

        for (i, pos) in positions.into_iter().enumerate() {
            let is_home = i == 0;
            let flags = PlanetFlags {
                repair: is_home || rng.random_bool(0.3),
                fuel: is_home || rng.random_bool(0.4),
                agri: !is_home && i == agri_index,
                home: is_home,
                core: core.contains(&i),
            };
            let armies = if is_home { 30 } else { rng.random_range(8..=20) };
            planets.push(Planet {
                id: planets.len(),
                name: NAMES[team.index()][i].to_string(),
                pos,
                owner: Some(team),
                armies,
                flags,
                info: team.bit(),
                home_of: is_home.then_some(team),
            });
        }
    }
    log::debug!("Generated {} planets", planets.len());
    planets
}

/// Positions for one quadrant, home first
fn place_quadrant(team: Team, rng: &mut Pcg32) -> Vec<Vec2> {
    let origin = quadrant_origin(team);
    let half = GALAXY_WIDTH / 2.0;
    let mut positions = vec![home_position(team)];

    for slot in 1..PLANETS_PER_TEAM {
        let mut placed = None;
        for _ in 0..MAX_ATTEMPTS {
            let candidate = origin
                + Vec2::new(
                    rng.random_range(QUADRANT_INSET..half - QUADRANT_INSET),
                    rng.random_range(QUADRANT_INSET..half - QUADRANT_INSET),
                );
            if positions
                .iter()
                .all(|p| p.distance(candidate) >= MIN_SEPARATION)
            {
                placed = Some(candidate);
                break;
            }
        }
        // Crowded quadrant: fall back to a fixed 3x3 grid cell
        let pos = placed.unwrap_or_else(|| {
            let cell = half / 3.0;
            let gx = ((slot - 1) % 3) as f32;
            let gy = ((slot - 1) / 3) as f32;
            origin + Vec2::new(cell * (gx + 0.5), cell * (gy + 0.5))
        });
        positions.push(pos);
    }
    positions
}
