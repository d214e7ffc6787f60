//! Ship classes and their immutable stat table
//!
//! Every class-dependent formula (physics, damage caps, weapon ranges, AI
//! safety margins) reads from one `ClassStats` record. There is no per-class
//! behavior beyond table lookup.

use serde::{Deserialize, Serialize};

use crate::consts::WARP1;

/// Closed set of hull types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShipClass {
    Scout,
    #[default]
    Destroyer,
    Cruiser,
    Battleship,
    Assault,
    Starbase,
}

/// Plasma launcher stats (not every class carries one)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlasmaStats {
    pub damage: u32,
    /// Warp of the plasma
    pub speed: u32,
    pub fuse: u32,
    pub cost: u32,
    /// Max heading change per tick (radians) while homing
    pub turn: f32,
}

/// Immutable per-class stat record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassStats {
    pub name: &'static str,
    pub abbrev: &'static str,
    pub max_speed: u32,
    pub max_fuel: u32,
    pub max_shields: u32,
    pub max_damage: u32,
    pub max_armies: u32,
    /// Armies carried per kill
    pub armies_per_kill: u32,

    pub torp_damage: u32,
    /// Warp of the torpedo
    pub torp_speed: u32,
    pub torp_fuse: u32,
    pub torp_cost: u32,
    pub phaser_damage: u32,
    pub phaser_cost: u32,
    pub plasma: Option<PlasmaStats>,

    /// Turn residue added per tick at warp 1
    pub turn_rate: u32,
    /// Speed residue step while accelerating
    pub accel: i32,
    /// Speed residue step while decelerating
    pub decel: i32,
    pub mass: u32,
    pub tractor_strength: u32,
    pub tractor_range: f32,

    pub max_weapon_temp: u32,
    pub max_engine_temp: u32,
    pub weapon_cool: u32,
    pub engine_cool: u32,

    /// Fuel per tick per warp
    pub warp_cost: u32,
    pub shield_cost: u32,
    pub cloak_cost: u32,
    pub tractor_cost: u32,
    pub detonate_cost: u32,
    pub recharge: u32,
    /// Repair residue added per tick
    pub repair: u32,

    /// Fraction of theoretical weapon range the AI will fire at
    pub safety_margin: f32,
}

const SCOUT: ClassStats = ClassStats {
    name: "Scout",
    abbrev: "SC",
    max_speed: 12,
    max_fuel: 5000,
    max_shields: 75,
    max_damage: 75,
    max_armies: 2,
    armies_per_kill: 2,
    torp_damage: 25,
    torp_speed: 16,
    torp_fuse: 16,
    torp_cost: 175,
    phaser_damage: 75,
    phaser_cost: 525,
    plasma: None,
    turn_rate: 57_000,
    accel: 200,
    decel: 270,
    mass: 1500,
    tractor_strength: 2000,
    tractor_range: 0.7,
    max_weapon_temp: 1000,
    max_engine_temp: 1000,
    weapon_cool: 2,
    engine_cool: 5,
    warp_cost: 2,
    shield_cost: 2,
    cloak_cost: 17,
    tractor_cost: 20,
    detonate_cost: 100,
    recharge: 8,
    repair: 80,
    safety_margin: 0.80,
};

const DESTROYER: ClassStats = ClassStats {
    name: "Destroyer",
    abbrev: "DD",
    max_speed: 10,
    max_fuel: 7000,
    max_shields: 85,
    max_damage: 85,
    max_armies: 5,
    armies_per_kill: 2,
    torp_damage: 30,
    torp_speed: 14,
    torp_fuse: 30,
    torp_cost: 210,
    phaser_damage: 85,
    phaser_cost: 595,
    plasma: Some(PlasmaStats {
        damage: 75,
        speed: 15,
        fuse: 30,
        cost: 2250,
        turn: 0.05,
    }),
    turn_rate: 31_000,
    accel: 200,
    decel: 300,
    mass: 1800,
    tractor_strength: 2500,
    tractor_range: 0.9,
    max_weapon_temp: 1000,
    max_engine_temp: 1000,
    weapon_cool: 2,
    engine_cool: 6,
    warp_cost: 3,
    shield_cost: 3,
    cloak_cost: 21,
    tractor_cost: 20,
    detonate_cost: 100,
    recharge: 11,
    repair: 110,
    safety_margin: 0.70,
};

const CRUISER: ClassStats = ClassStats {
    name: "Cruiser",
    abbrev: "CA",
    max_speed: 9,
    max_fuel: 10_000,
    max_shields: 100,
    max_damage: 100,
    max_armies: 10,
    armies_per_kill: 2,
    torp_damage: 40,
    torp_speed: 12,
    torp_fuse: 40,
    torp_cost: 280,
    phaser_damage: 100,
    phaser_cost: 700,
    plasma: Some(PlasmaStats {
        damage: 100,
        speed: 15,
        fuse: 35,
        cost: 3000,
        turn: 0.04,
    }),
    turn_rate: 17_000,
    accel: 150,
    decel: 200,
    mass: 2000,
    tractor_strength: 3000,
    tractor_range: 1.0,
    max_weapon_temp: 1000,
    max_engine_temp: 1000,
    weapon_cool: 3,
    engine_cool: 6,
    warp_cost: 4,
    shield_cost: 4,
    cloak_cost: 26,
    tractor_cost: 20,
    detonate_cost: 100,
    recharge: 12,
    repair: 112,
    safety_margin: 0.72,
};

const BATTLESHIP: ClassStats = ClassStats {
    name: "Battleship",
    abbrev: "BB",
    max_speed: 8,
    max_fuel: 14_000,
    max_shields: 130,
    max_damage: 130,
    max_armies: 6,
    armies_per_kill: 2,
    torp_damage: 40,
    torp_speed: 12,
    torp_fuse: 40,
    torp_cost: 280,
    phaser_damage: 105,
    phaser_cost: 735,
    plasma: Some(PlasmaStats {
        damage: 130,
        speed: 15,
        fuse: 35,
        cost: 3900,
        turn: 0.03,
    }),
    turn_rate: 7_500,
    accel: 80,
    decel: 180,
    mass: 2300,
    tractor_strength: 3700,
    tractor_range: 1.2,
    max_weapon_temp: 1000,
    max_engine_temp: 1000,
    weapon_cool: 3,
    engine_cool: 6,
    warp_cost: 6,
    shield_cost: 5,
    cloak_cost: 30,
    tractor_cost: 20,
    detonate_cost: 100,
    recharge: 14,
    repair: 125,
    safety_margin: 0.75,
};

const ASSAULT: ClassStats = ClassStats {
    name: "Assault",
    abbrev: "AS",
    max_speed: 8,
    max_fuel: 6000,
    max_shields: 80,
    max_damage: 200,
    max_armies: 20,
    armies_per_kill: 3,
    torp_damage: 30,
    torp_speed: 16,
    torp_fuse: 30,
    torp_cost: 270,
    phaser_damage: 80,
    phaser_cost: 560,
    plasma: None,
    turn_rate: 12_000,
    accel: 100,
    decel: 200,
    mass: 2300,
    tractor_strength: 2500,
    tractor_range: 0.7,
    max_weapon_temp: 1000,
    max_engine_temp: 1200,
    weapon_cool: 2,
    engine_cool: 6,
    warp_cost: 3,
    shield_cost: 3,
    cloak_cost: 17,
    tractor_cost: 20,
    detonate_cost: 100,
    recharge: 10,
    repair: 120,
    safety_margin: 0.70,
};

const STARBASE: ClassStats = ClassStats {
    name: "Starbase",
    abbrev: "SB",
    max_speed: 2,
    max_fuel: 60_000,
    max_shields: 500,
    max_damage: 600,
    max_armies: 25,
    armies_per_kill: 2,
    torp_damage: 30,
    torp_speed: 14,
    torp_fuse: 30,
    torp_cost: 270,
    phaser_damage: 120,
    phaser_cost: 840,
    plasma: Some(PlasmaStats {
        damage: 150,
        speed: 15,
        fuse: 25,
        cost: 3750,
        turn: 0.06,
    }),
    turn_rate: 5_000,
    accel: 100,
    decel: 200,
    mass: 5000,
    tractor_strength: 8000,
    tractor_range: 1.5,
    max_weapon_temp: 1300,
    max_engine_temp: 1000,
    weapon_cool: 4,
    engine_cool: 4,
    warp_cost: 10,
    shield_cost: 6,
    cloak_cost: 75,
    tractor_cost: 20,
    detonate_cost: 100,
    recharge: 35,
    repair: 140,
    safety_margin: 0.65,
};

impl ShipClass {
    pub const ALL: [ShipClass; 6] = [
        ShipClass::Scout,
        ShipClass::Destroyer,
        ShipClass::Cruiser,
        ShipClass::Battleship,
        ShipClass::Assault,
        ShipClass::Starbase,
    ];

    /// Stat record for this class
    pub fn stats(self) -> &'static ClassStats {
        match self {
            ShipClass::Scout => &SCOUT,
            ShipClass::Destroyer => &DESTROYER,
            ShipClass::Cruiser => &CRUISER,
            ShipClass::Battleship => &BATTLESHIP,
            ShipClass::Assault => &ASSAULT,
            ShipClass::Starbase => &STARBASE,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sc" | "scout" => Some(ShipClass::Scout),
            "dd" | "destroyer" => Some(ShipClass::Destroyer),
            "ca" | "cruiser" => Some(ShipClass::Cruiser),
            "bb" | "battleship" => Some(ShipClass::Battleship),
            "as" | "assault" => Some(ShipClass::Assault),
            "sb" | "starbase" => Some(ShipClass::Starbase),
            _ => None,
        }
    }
}

/// A projectile weapon reduced to what range and aim calculations need
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponProfile {
    /// Galaxy units per tick
    pub speed: f32,
    pub fuse: u32,
    pub safety_margin: f32,
}

impl WeaponProfile {
    /// Distance covered before the fuse runs out
    pub fn max_range(&self) -> f32 {
        self.speed * self.fuse as f32
    }

    /// Range the AI is allowed to fire at
    pub fn effective_range(&self) -> f32 {
        self.max_range() * self.safety_margin
    }
}

impl ClassStats {
    pub fn torpedo_profile(&self) -> WeaponProfile {
        WeaponProfile {
            speed: self.torp_speed as f32 * WARP1,
            fuse: self.torp_fuse,
            safety_margin: self.safety_margin,
        }
    }

    pub fn plasma_profile(&self) -> Option<WeaponProfile> {
        self.plasma.map(|p| WeaponProfile {
            speed: p.speed as f32 * WARP1,
            fuse: p.fuse,
            safety_margin: self.safety_margin,
        })
    }

    pub fn max_torp_range(&self) -> f32 {
        self.torpedo_profile().max_range()
    }

    pub fn phaser_range(&self) -> f32 {
        crate::consts::PHASER_BASE_RANGE * self.phaser_damage as f32 / 100.0
    }

    /// Farthest any of the ship's weapons reaches
    pub fn max_weapon_range(&self) -> f32 {
        let plasma = self.plasma_profile().map_or(0.0, |p| p.max_range());
        self.max_torp_range().max(plasma).max(self.phaser_range())
    }

    pub fn tractor_reach(&self) -> f32 {
        crate::consts::TRACTOR_BASE_RANGE * self.tractor_range
    }

    /// Max speed reachable with the given hull damage
    pub fn effective_max_speed(&self, damage: u32) -> u32 {
        let max = self.max_speed as f32;
        let fraction = damage as f32 / self.max_damage as f32;
        let speed = (max + 2.0) - (max + 1.0) * fraction;
        if speed <= 0.0 {
            0
        } else {
            (speed as u32).min(self.max_speed)
        }
    }

    /// Armies a ship with `kills` may carry
    pub fn army_capacity(&self, kills: u32) -> u32 {
        kills.saturating_mul(self.armies_per_kill).min(self.max_armies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroyer_torp_range() {
        let dd = ShipClass::Destroyer.stats();
        assert_eq!(dd.max_torp_range(), 8400.0);
        assert!((dd.torpedo_profile().effective_range() - 5880.0).abs() < 0.01);
    }

    #[test]
    fn test_effective_range_below_max_for_all_classes() {
        for class in ShipClass::ALL {
            let stats = class.stats();
            let torp = stats.torpedo_profile();
            assert_eq!(
                torp.max_range(),
                (stats.torp_speed as f32 * WARP1) * stats.torp_fuse as f32
            );
            assert!(torp.effective_range() < torp.max_range(), "{}", stats.name);
            assert!(stats.safety_margin > 0.0 && stats.safety_margin < 1.0);
            if let Some(plasma) = stats.plasma_profile() {
                assert!(plasma.effective_range() < plasma.max_range());
            }
        }
    }

    #[test]
    fn test_max_weapon_range_takes_the_longest_weapon() {
        let dd = ShipClass::Destroyer.stats();
        // Torpedoes outreach the 5100 phaser and there is no plasma
        assert_eq!(dd.max_weapon_range(), 8400.0);
        for class in ShipClass::ALL {
            let stats = class.stats();
            let range = stats.max_weapon_range();
            assert!(range >= stats.max_torp_range(), "{}", stats.name);
            assert!(range >= stats.phaser_range(), "{}", stats.name);
            if let Some(plasma) = stats.plasma_profile() {
                assert!(range >= plasma.max_range(), "{}", stats.name);
            }
        }
    }

    #[test]
    fn test_effective_max_speed_degrades_with_damage() {
        let dd = ShipClass::Destroyer.stats();
        assert_eq!(dd.effective_max_speed(0), 10);
        // (12) - 11 * 0.5 = 6.5 -> 6
        assert_eq!(dd.effective_max_speed(dd.max_damage / 2), 6);
        assert_eq!(dd.effective_max_speed(dd.max_damage), 1);
        assert_eq!(dd.effective_max_speed(dd.max_damage * 2), 0);
    }

    #[test]
    fn test_army_capacity_gated_by_kills() {
        let ca = ShipClass::Cruiser.stats();
        assert_eq!(ca.army_capacity(0), 0);
        assert_eq!(ca.army_capacity(2), 4);
        assert_eq!(ca.army_capacity(50), ca.max_armies);
        assert_eq!(ShipClass::Assault.stats().army_capacity(2), 6);
    }

    #[test]
    fn test_class_from_str() {
        assert_eq!(ShipClass::from_str("DD"), Some(ShipClass::Destroyer));
        assert_eq!(ShipClass::from_str("starbase"), Some(ShipClass::Starbase));
        assert_eq!(ShipClass::from_str("tug"), None);
    }
}
