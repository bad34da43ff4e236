//! Unit definition catalog
//!
//! Maps host unit-definition names to the roles the scheduler cares about and
//! to what each producer can build. Loaded from TOML; the built-in default
//! covers the three stock factions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// What a unit is for, as far as the scheduler is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Home base; produces constructors
    Base,
    /// Mobile builder; places expansions
    Constructor,
    /// Support structure built on a resource site
    Expansion,
    /// Static defense structure
    Defense,
    Combat,
    Other,
}

impl Role {
    /// Targets worth diverting a unit for
    pub fn is_high_value(&self) -> bool {
        matches!(self, Role::Base | Role::Expansion | Role::Constructor)
    }

    /// Structures that a Defend goal protects
    pub fn is_protected(&self) -> bool {
        matches!(self, Role::Base | Role::Expansion | Role::Constructor)
    }

    pub fn is_structure(&self) -> bool {
        matches!(self, Role::Base | Role::Expansion | Role::Defense)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCatalog {
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub constructors: Vec<String>,
    #[serde(default)]
    pub expansions: Vec<String>,
    #[serde(default)]
    pub defenses: Vec<String>,
    #[serde(default)]
    pub combat: Vec<String>,
    /// Constructor definition -> expansion it builds
    #[serde(default)]
    pub expansion_builds: BTreeMap<String, String>,
    /// Base definition -> constructor it produces
    #[serde(default)]
    pub producer_builds: BTreeMap<String, String>,
}

impl Default for UnitCatalog {
    fn default() -> Self {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let pairs = |list: &[(&str, &str)]| {
            list.iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect::<BTreeMap<_, _>>()
        };

        Self {
            bases: names(&["kernel", "hole", "carrier"]),
            constructors: names(&["assembler", "trojan", "gateway"]),
            expansions: names(&["socket", "window", "port"]),
            defenses: names(&["terminal", "obelisk", "firewall"]),
            combat: names(&[
                "bit", "bug", "exploit", "packet", "byte", "worm", "connection", "pointer",
                "dos", "flow",
            ]),
            expansion_builds: pairs(&[
                ("assembler", "socket"),
                ("trojan", "window"),
                ("gateway", "port"),
            ]),
            producer_builds: pairs(&[
                ("kernel", "assembler"),
                ("hole", "trojan"),
                ("carrier", "gateway"),
            ]),
        }
    }
}

impl UnitCatalog {
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn role_of(&self, def: &str) -> Role {
        let has = |list: &[String]| list.iter().any(|n| n == def);
        if has(&self.bases) {
            Role::Base
        } else if has(&self.constructors) {
            Role::Constructor
        } else if has(&self.expansions) {
            Role::Expansion
        } else if has(&self.defenses) {
            Role::Defense
        } else if has(&self.combat) {
            Role::Combat
        } else {
            Role::Other
        }
    }

    /// Expansion a constructor of this definition can place
    pub fn expansion_for(&self, builder_def: &str) -> Option<&str> {
        self.expansion_builds.get(builder_def).map(String::as_str)
    }

    /// Constructor a base of this definition can produce
    pub fn producer_for(&self, base_def: &str) -> Option<&str> {
        self.producer_builds.get(base_def).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles() {
        let catalog = UnitCatalog::default();
        assert_eq!(catalog.role_of("kernel"), Role::Base);
        assert_eq!(catalog.role_of("assembler"), Role::Constructor);
        assert_eq!(catalog.role_of("socket"), Role::Expansion);
        assert_eq!(catalog.role_of("firewall"), Role::Defense);
        assert_eq!(catalog.role_of("bug"), Role::Combat);
        assert_eq!(catalog.role_of("tree"), Role::Other);
    }

    #[test]
    fn test_build_options() {
        let catalog = UnitCatalog::default();
        assert_eq!(catalog.expansion_for("trojan"), Some("window"));
        assert_eq!(catalog.producer_for("carrier"), Some("gateway"));
        assert_eq!(catalog.expansion_for("kernel"), None);
    }

    #[test]
    fn test_load_from_toml() {
        let catalog = UnitCatalog::from_toml(
            r#"
            bases = ["hq"]
            constructors = ["worker"]
            [expansion_builds]
            worker = "outpost"
            "#,
        )
        .expect("valid catalog");

        assert_eq!(catalog.role_of("hq"), Role::Base);
        assert_eq!(catalog.expansion_for("worker"), Some("outpost"));
        assert!(catalog.combat.is_empty());
    }

    #[test]
    fn test_high_value_roles() {
        assert!(Role::Base.is_high_value());
        assert!(Role::Constructor.is_high_value());
        assert!(!Role::Combat.is_high_value());
        assert!(Role::Defense.is_structure());
    }
}
