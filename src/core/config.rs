//! Tunable parameters with documented defaults
//!
//! Every threshold the scheduler consults is looked up by name through a
//! [`Tunables`] source, falling back to the hardcoded default when the source
//! has no value (or when there is no source at all). The resolved values are
//! collected into [`StrategyConfig`] and [`UnitConfig`] so that the policy code
//! reads plain fields.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::core::error::{AiError, Result};
use crate::core::types::Tick;

/// Named-parameter source, usually the host's scripting layer
pub trait Tunables {
    fn get_int(&self, name: &str, default: i64) -> i64;
    fn get_float(&self, name: &str, default: f64) -> f64;
    fn get_string(&self, name: &str, default: &str) -> String;
}

/// Used when no scripting collaborator is present: always the default
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScripting;

impl Tunables for NoScripting {
    fn get_int(&self, _name: &str, default: i64) -> i64 {
        default
    }

    fn get_float(&self, _name: &str, default: f64) -> f64 {
        default
    }

    fn get_string(&self, _name: &str, default: &str) -> String {
        default.to_string()
    }
}

/// Tunables read from a flat TOML table
///
/// ```toml
/// producer_target = 4
/// expansion_timeout = 7200
/// tie_break = "oldest_first"
/// ```
#[derive(Debug, Clone, Default)]
pub struct TomlTunables {
    table: toml::Table,
}

impl FromStr for TomlTunables {
    type Err = AiError;

    fn from_str(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        Ok(Self { table })
    }
}

impl TomlTunables {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        contents.parse()
    }

    pub fn set(&mut self, name: &str, value: impl Into<toml::Value>) {
        self.table.insert(name.to_string(), value.into());
    }
}

impl Tunables for TomlTunables {
    fn get_int(&self, name: &str, default: i64) -> i64 {
        match self.table.get(name) {
            Some(toml::Value::Integer(v)) => *v,
            Some(toml::Value::Float(v)) => *v as i64,
            Some(other) => {
                tracing::warn!(name, ?other, "tunable is not an integer, using default");
                default
            }
            None => default,
        }
    }

    fn get_float(&self, name: &str, default: f64) -> f64 {
        match self.table.get(name) {
            Some(toml::Value::Float(v)) => *v,
            Some(toml::Value::Integer(v)) => *v as f64,
            Some(other) => {
                tracing::warn!(name, ?other, "tunable is not a number, using default");
                default
            }
            None => default,
        }
    }

    fn get_string(&self, name: &str, default: &str) -> String {
        match self.table.get(name) {
            Some(toml::Value::String(v)) => v.clone(),
            Some(other) => {
                tracing::warn!(name, ?other, "tunable is not a string, using default");
                default.to_string()
            }
            None => default.to_string(),
        }
    }
}

fn get_tick(t: &dyn Tunables, name: &str, default: Tick) -> Tick {
    t.get_int(name, default as i64).max(0) as Tick
}

fn get_f32(t: &dyn Tunables, name: &str, default: f32) -> f32 {
    t.get_float(name, default as f64) as f32
}

fn get_i32(t: &dyn Tunables, name: &str, default: i32) -> i32 {
    t.get_int(name, default as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Order in which equal-priority goals are visited during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Most recently added first
    #[default]
    NewestFirst,
    OldestFirst,
}

impl TieBreak {
    pub fn from_tunables(t: &dyn Tunables) -> Self {
        match t.get_string("tie_break", "newest_first").as_str() {
            "oldest_first" => TieBreak::OldestFirst,
            "newest_first" => TieBreak::NewestFirst,
            other => {
                tracing::warn!(value = other, "unknown tie_break, using newest_first");
                TieBreak::NewestFirst
            }
        }
    }
}

/// Strategic-tier policy values
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    // === CADENCE ===
    /// Ticks between re-derivations of the top-level goal set
    ///
    /// At 30 ticks per second the default re-derives every 10 seconds.
    pub find_goals_interval: Tick,

    /// Ticks between goal-stack sweeps of every processor (1 = every tick)
    pub sweep_interval: Tick,

    /// Visiting order for equal-priority goals
    pub tie_break: TieBreak,

    // === EXPANSION ===
    /// Host feature name that marks a resource site
    pub resource_feature: String,

    /// Lifetime of an expansion goal; stale opportunities expire after this
    ///
    /// Three minutes of game time.
    pub expansion_timeout: Tick,

    /// Priority of an expansion right next to a base with neutral influence
    pub expansion_base_priority: i32,

    /// Priority lost per world unit of path distance from the nearest base
    pub expansion_distance_penalty: f32,

    /// Priority gained per point of influence at the site
    ///
    /// Positive influence means friendly control, so safer sites win.
    pub expansion_influence_weight: f32,

    /// A structure within this radius of a site blocks it
    pub expansion_blocked_radius: f32,

    /// Movement profile passed to the host's path estimate for builders
    pub builder_path_profile: String,

    // === PRODUCTION ===
    /// Desired number of producer units (constructors)
    pub producer_target: usize,

    pub producer_priority: i32,

    // === BUILDER RETREAT ===
    pub retreat_priority: i32,

    /// Builders closer than this to the nearest base are not sent back
    pub retreat_deadband: f32,

    // === COMBAT POSTURE ===
    /// Battle-pool health needed before leaving the Gather posture
    pub attack_min_health: f32,

    /// Attack falls back to Gather when pool health drops below this
    /// fraction of the health recorded on entering Attack
    pub gather_health_ratio: f32,

    /// Minimum ticks between randomized posture toggles
    pub toggle_cooldown: Tick,

    /// Chance per re-derivation of a randomized toggle once cooled down
    pub toggle_chance: f32,

    /// Chance per re-derivation that a stronger assign pool swaps roles
    /// with the battle pool
    pub pool_swap_chance: f32,

    pub attack_priority: i32,
    pub gather_priority: i32,

    /// Radius passed to the influence collaborator's local-minima search
    pub minima_radius: f32,

    /// Radius around a contested area searched for a high-value target
    pub target_search_radius: f32,

    // === REACTIVE DEFENSE ===
    pub defend_priority: i32,

    /// Defend goals are short-lived: one second is 30 ticks
    pub defend_timeout: Tick,

    /// Per-victim re-trigger cooldown
    pub defend_cooldown: Tick,

    /// Damage below this does not raise a Defend goal
    pub defend_min_damage: f32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::from_tunables(&NoScripting)
    }
}

impl StrategyConfig {
    pub fn from_tunables(t: &dyn Tunables) -> Self {
        Self {
            find_goals_interval: get_tick(t, "find_goals_interval", 300).max(1),
            sweep_interval: get_tick(t, "sweep_interval", 1).max(1),
            tie_break: TieBreak::from_tunables(t),

            resource_feature: t.get_string("resource_feature", "geovent"),
            expansion_timeout: get_tick(t, "expansion_timeout", 3 * 60 * 30),
            expansion_base_priority: get_i32(t, "expansion_base_priority", 100),
            expansion_distance_penalty: get_f32(t, "expansion_distance_penalty", 0.02),
            expansion_influence_weight: get_f32(t, "expansion_influence_weight", 0.1),
            expansion_blocked_radius: get_f32(t, "expansion_blocked_radius", 64.0),
            builder_path_profile: t.get_string("builder_path_profile", "builder"),

            producer_target: t.get_int("producer_target", 3).max(0) as usize,
            producer_priority: get_i32(t, "producer_priority", 1),

            retreat_priority: get_i32(t, "retreat_priority", 50),
            retreat_deadband: get_f32(t, "retreat_deadband", 300.0),

            attack_min_health: get_f32(t, "attack_min_health", 2000.0),
            gather_health_ratio: get_f32(t, "gather_health_ratio", 0.5),
            toggle_cooldown: get_tick(t, "toggle_cooldown", 60 * 30),
            toggle_chance: get_f32(t, "toggle_chance", 0.1),
            pool_swap_chance: get_f32(t, "pool_swap_chance", 0.3),
            attack_priority: get_i32(t, "attack_priority", 20),
            gather_priority: get_i32(t, "gather_priority", 10),
            minima_radius: get_f32(t, "minima_radius", 512.0),
            target_search_radius: get_f32(t, "target_search_radius", 400.0),

            defend_priority: get_i32(t, "defend_priority", 40),
            defend_timeout: get_tick(t, "defend_timeout", 30 * 30),
            defend_cooldown: get_tick(t, "defend_cooldown", 10 * 30),
            defend_min_damage: get_f32(t, "defend_min_damage", 5.0),
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.gather_health_ratio) {
            return Err(AiError::InvalidConfig(format!(
                "gather_health_ratio ({}) must be within 0..=1",
                self.gather_health_ratio
            )));
        }

        for (name, chance) in [
            ("toggle_chance", self.toggle_chance),
            ("pool_swap_chance", self.pool_swap_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(AiError::InvalidConfig(format!(
                    "{name} ({chance}) must be a probability"
                )));
            }
        }

        if self.expansion_distance_penalty < 0.0 || self.retreat_deadband < 0.0 {
            return Err(AiError::InvalidConfig(
                "distance penalties and deadbands must be non-negative".into(),
            ));
        }

        Ok(())
    }
}

/// Leaf-tier micro-behavior values
#[derive(Debug, Clone)]
pub struct UnitConfig {
    /// Hostiles within this radius of a build site abort the build
    pub build_danger_radius: f32,

    /// Range in which a high-value enemy triggers an opportunistic attack
    pub opportunistic_range: f32,

    /// Ticks an opportunistic attack may hold the current goal suspended
    pub diversion_timeout: Tick,

    /// An idle unit this close to a producing structure is in the way
    pub base_block_radius: f32,

    /// How far a blocking unit is pushed away
    pub nudge_distance: f32,

    /// Consecutive blocking checks before the unit is nudged
    pub stuck_checks: u32,

    /// Ticks between micro-behavior checks
    pub micro_interval: Tick,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self::from_tunables(&NoScripting)
    }
}

impl UnitConfig {
    pub fn from_tunables(t: &dyn Tunables) -> Self {
        Self {
            build_danger_radius: get_f32(t, "build_danger_radius", 300.0),
            opportunistic_range: get_f32(t, "opportunistic_range", 250.0),
            diversion_timeout: get_tick(t, "diversion_timeout", 5 * 30),
            base_block_radius: get_f32(t, "base_block_radius", 96.0),
            nudge_distance: get_f32(t, "nudge_distance", 200.0),
            stuck_checks: t.get_int("stuck_checks", 3).max(1) as u32,
            micro_interval: get_tick(t, "micro_interval", 15).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_scripting_returns_defaults() {
        let t = NoScripting;
        assert_eq!(t.get_int("anything", 7), 7);
        assert_eq!(t.get_float("anything", 1.5), 1.5);
        assert_eq!(t.get_string("anything", "x"), "x");
    }

    #[test]
    fn test_toml_tunables_override() {
        let t: TomlTunables = r#"
            producer_target = 5
            gather_health_ratio = 0.25
            tie_break = "oldest_first"
            "#
        .parse()
        .expect("valid toml");

        let cfg = StrategyConfig::from_tunables(&t);
        assert_eq!(cfg.producer_target, 5);
        assert_eq!(cfg.gather_health_ratio, 0.25);
        assert_eq!(cfg.tie_break, TieBreak::OldestFirst);
        // untouched values keep their defaults
        assert_eq!(cfg.expansion_timeout, 5400);
    }

    #[test]
    fn test_wrong_type_falls_back_to_default() {
        let t = "producer_target = \"many\"".parse::<TomlTunables>().unwrap();
        assert_eq!(t.get_int("producer_target", 3), 3);
    }

    #[test]
    fn test_integer_readable_as_float() {
        let t = "retreat_deadband = 400".parse::<TomlTunables>().unwrap();
        assert_eq!(t.get_float("retreat_deadband", 1.0), 400.0);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_ratio() {
        let mut cfg = StrategyConfig::default();
        cfg.gather_health_ratio = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_intervals_never_zero() {
        let mut t = TomlTunables::default();
        t.set("sweep_interval", 0);
        t.set("find_goals_interval", -5);
        let cfg = StrategyConfig::from_tunables(&t);
        assert_eq!(cfg.sweep_interval, 1);
        assert_eq!(cfg.find_goals_interval, 1);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!("this is = = not toml".parse::<TomlTunables>().is_err());
    }
}
