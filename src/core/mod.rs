pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::{Role, UnitCatalog};
pub use config::{NoScripting, StrategyConfig, TieBreak, TomlTunables, Tunables, UnitConfig};
pub use error::{AiError, Result};
pub use types::{ActorId, Position, Tick};
