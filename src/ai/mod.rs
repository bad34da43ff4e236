//! Three-tier skirmish AI
//!
//! Architecture: one goal registry, three processors
//! - TopLevel re-derives strategic goals and hands them to groups
//! - UnitGroup admits goals to its members (one builder per sweep, or everyone)
//! - UnitAi turns a single accepted goal into a host command
//!
//! Commander wires the tiers to the host's notifications.

pub mod commander;
pub mod context;
pub mod group;
pub mod top_level;
pub mod unit;

pub use commander::{Commander, CommanderStats};
pub use context::{Ctx, UnitCtx, UnitTable};
pub use group::UnitGroup;
pub use top_level::{GroupKind, Posture, TopLevel};
pub use unit::{Diversion, UnitAi};
