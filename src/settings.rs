//! Server settings
//!
//! Defaults, optionally replaced by a JSON file, then overridden field by
//! field from `ARENA_*` environment variables. Out-of-range values are
//! reported and replaced by their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::TICKS_PER_SECOND;
use crate::sim::ship_class::ShipClass;
use crate::sim::state::{Rules, Team};

/// Failure to read or parse a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Simulation rate
    pub tick_hz: u32,
    /// Ship slots
    pub max_ships: usize,
    /// Active players each of two teams needs before tournament mode starts
    pub tournament_min_per_team: usize,
    /// Bots added to each team in `bot_teams` at startup
    pub bots_per_team: usize,
    pub bot_teams: Vec<Team>,
    pub bot_class: ShipClass,
    /// Bots re-plan every this many ticks
    pub bot_think_interval: u64,
    /// Ticks a destroyed ship waits before relaunching
    pub respawn_ticks: u32,
    /// World RNG seed
    pub seed: u64,
    /// Snapshots buffered per subscriber before it is dropped
    pub snapshot_queue: usize,
    /// How often the binary logs team statistics, in ticks
    pub stats_every: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let rules = Rules::default();
        Self {
            tick_hz: TICKS_PER_SECOND,
            max_ships: rules.max_ships,
            tournament_min_per_team: rules.tournament_min_per_team,
            bots_per_team: 2,
            bot_teams: vec![Team::Federation, Team::Klingon],
            bot_class: ShipClass::Cruiser,
            bot_think_interval: rules.bot_think_interval,
            respawn_ticks: rules.respawn_ticks,
            seed: 0x5EED,
            snapshot_queue: 64,
            stats_every: 100,
        }
    }
}

impl Settings {
    /// Read settings from `path` (if any), then apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(|name| std::env::var(name).ok());
        settings.sanitize();
        Ok(settings)
    }

    /// Parse a JSON settings file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply `ARENA_*` overrides from `lookup`. Unparseable values are ignored
    /// with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_from(&lookup, "ARENA_TICK_HZ", &mut self.tick_hz);
        override_from(&lookup, "ARENA_MAX_SHIPS", &mut self.max_ships);
        override_from(&lookup, "ARENA_TOURNAMENT_MIN", &mut self.tournament_min_per_team);
        override_from(&lookup, "ARENA_BOTS_PER_TEAM", &mut self.bots_per_team);
        override_from(&lookup, "ARENA_SEED", &mut self.seed);
        override_from(&lookup, "ARENA_SNAPSHOT_QUEUE", &mut self.snapshot_queue);
        override_from(&lookup, "ARENA_BOT_THINK_INTERVAL", &mut self.bot_think_interval);
        override_from(&lookup, "ARENA_RESPAWN_TICKS", &mut self.respawn_ticks);
        override_from(&lookup, "ARENA_STATS_EVERY", &mut self.stats_every);

        if let Some(raw) = lookup("ARENA_BOT_CLASS") {
            match ShipClass::from_str(&raw) {
                Some(class) => self.bot_class = class,
                None => log::warn!("ARENA_BOT_CLASS: unknown class {:?}, keeping {:?}", raw, self.bot_class),
            }
        }
        if let Some(raw) = lookup("ARENA_BOT_TEAMS") {
            let teams: Option<Vec<Team>> = raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| Team::from_str(s.trim()))
                .collect();
            match teams {
                Some(teams) => self.bot_teams = teams,
                None => log::warn!("ARENA_BOT_TEAMS: cannot parse {:?}, keeping {:?}", raw, self.bot_teams),
            }
        }
    }

    /// Replace out-of-range values with defaults
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(1..=100).contains(&self.tick_hz) {
            log::warn!("tick_hz {} out of range, using {}", self.tick_hz, defaults.tick_hz);
            self.tick_hz = defaults.tick_hz;
        }
        if !(2..=256).contains(&self.max_ships) {
            log::warn!("max_ships {} out of range, using {}", self.max_ships, defaults.max_ships);
            self.max_ships = defaults.max_ships;
        }
        if self.tournament_min_per_team == 0 {
            log::warn!("tournament_min_per_team must be positive, using {}", defaults.tournament_min_per_team);
            self.tournament_min_per_team = defaults.tournament_min_per_team;
        }
        if self.bot_think_interval == 0 {
            log::warn!("bot_think_interval must be positive, using {}", defaults.bot_think_interval);
            self.bot_think_interval = defaults.bot_think_interval;
        }
        if self.respawn_ticks == 0 {
            log::warn!("respawn_ticks must be positive, using {}", defaults.respawn_ticks);
            self.respawn_ticks = defaults.respawn_ticks;
        }
        if self.snapshot_queue == 0 {
            log::warn!("snapshot_queue must be positive, using {}", defaults.snapshot_queue);
            self.snapshot_queue = defaults.snapshot_queue;
        }
        if self.stats_every == 0 {
            self.stats_every = defaults.stats_every;
        }
        self.bot_teams.sort();
        self.bot_teams.dedup();
        let fit = self.max_ships / self.bot_teams.len().max(1);
        if self.bots_per_team > fit {
            log::warn!("{} bots per team do not fit in {} slots, using {}", self.bots_per_team, self.max_ships, fit);
            self.bots_per_team = fit;
        }
    }

    /// World rules derived from these settings
    pub fn rules(&self) -> Rules {
        Rules {
            max_ships: self.max_ships,
            tournament_min_per_team: self.tournament_min_per_team,
            bot_think_interval: self.bot_think_interval,
            respawn_ticks: self.respawn_ticks,
        }
    }

    /// Wall-clock time between ticks
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz.max(1) as f64)
    }
}

fn override_from<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, slot: &mut T)
where
    T: std::str::FromStr + std::fmt::Debug,
{
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => log::warn!("{}: cannot parse {:?}, keeping {:?}", name, raw, slot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_match_rules() {
        let settings = Settings::default();
        assert_eq!(settings.rules(), Rules::default());
        assert_eq!(settings.tick_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides(env(&[
            ("ARENA_TICK_HZ", "20"),
            ("ARENA_SEED", "42"),
            ("ARENA_BOT_CLASS", "dd"),
            ("ARENA_BOT_TEAMS", "rom, ori"),
        ]));
        settings.sanitize();
        assert_eq!(settings.tick_hz, 20);
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.bot_class, ShipClass::Destroyer);
        assert_eq!(settings.bot_teams, vec![Team::Romulan, Team::Orion]);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let mut settings = Settings::default();
        settings.apply_overrides(env(&[
            ("ARENA_TICK_HZ", "fast"),
            ("ARENA_MAX_SHIPS", "0"),
            ("ARENA_SNAPSHOT_QUEUE", "0"),
            ("ARENA_BOT_CLASS", "dreadnought"),
        ]));
        settings.sanitize();
        let defaults = Settings::default();
        assert_eq!(settings.tick_hz, defaults.tick_hz);
        assert_eq!(settings.max_ships, defaults.max_ships);
        assert_eq!(settings.snapshot_queue, defaults.snapshot_queue);
        assert_eq!(settings.bot_class, defaults.bot_class);
    }

    #[test]
    fn test_bots_clamped_to_slots() {
        let mut settings = Settings {
            max_ships: 8,
            bots_per_team: 10,
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.bots_per_team, 4);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"tick_hz": 5, "seed": 9}"#).expect("parses");
        assert_eq!(settings.tick_hz, 5);
        assert_eq!(settings.seed, 9);
        assert_eq!(settings.max_ships, Settings::default().max_ships);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Settings::from_file(Path::new("/nonexistent/arena.json")).expect_err("missing");
        assert!(matches!(err, SettingsError::Read { .. }));
    }
}
