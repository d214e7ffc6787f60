//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by ship slot, planet id, projectile id)
//! - No I/O, locking or async

pub mod collision;
pub mod command;
pub mod damage;
pub mod galaxy;
pub mod physics;
pub mod planet;
pub mod projectile;
pub mod ship_class;
pub mod snapshot;
pub mod state;
pub mod systems;
pub mod tick;
pub mod victory;

pub use command::{Command, CommandError, CommandOutcome};
pub use damage::{DamageReport, apply_damage, strike};
pub use projectile::PhaserOutcome;
pub use ship_class::{ClassStats, ShipClass, WeaponProfile};
pub use snapshot::{ShipView, TeamStats, WorldSnapshot, team_stats};
pub use state::{
    InvariantViolation, Outcome, Planet, PlanetId, Projectile, ProjectileKind, Rules, Ship,
    ShipId, ShipStatus, SimEvent, Team, World,
};
pub use tick::tick;
