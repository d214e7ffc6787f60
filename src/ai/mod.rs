//! Computer-controlled ships
//!
//! Bots read the world, decide, and act only through validated commands.

pub mod bot;
pub mod intercept;
pub mod targeting;

pub use bot::{BotBrain, Maneuver, run_bots, spread_volley, torpedo_solution};
pub use intercept::{FireSolution, Intercept, Withhold, aim_direct, aim_weapon, solve_intercept};
pub use targeting::{Target, select_target};
