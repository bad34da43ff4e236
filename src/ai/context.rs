//! Borrowed views handed to the processors during a sweep

use std::collections::BTreeMap;

use crate::ai::unit::UnitAi;
use crate::core::catalog::UnitCatalog;
use crate::core::config::{TieBreak, UnitConfig};
use crate::core::types::{ActorId, Tick};
use crate::goal::processor::SweepContext;
use crate::goal::registry::GoalRegistry;
use crate::host::Host;

/// Every leaf processor, keyed by the actor it drives
pub type UnitTable = BTreeMap<ActorId, UnitAi>;

/// Context for the strategic and group tiers
pub struct Ctx<'a> {
    pub registry: &'a mut GoalRegistry,
    pub host: &'a mut dyn Host,
    pub catalog: &'a UnitCatalog,
    pub units: &'a mut UnitTable,
    pub tick: Tick,
    pub tie_break: TieBreak,
}

impl SweepContext for Ctx<'_> {
    fn registry(&mut self) -> &mut GoalRegistry {
        self.registry
    }

    fn tick(&self) -> Tick {
        self.tick
    }

    fn tie_break(&self) -> TieBreak {
        self.tie_break
    }
}

/// Context for the per-actor tier
pub struct UnitCtx<'a> {
    pub registry: &'a mut GoalRegistry,
    pub host: &'a mut dyn Host,
    pub catalog: &'a UnitCatalog,
    pub config: &'a UnitConfig,
    pub tick: Tick,
    pub tie_break: TieBreak,
}

impl SweepContext for UnitCtx<'_> {
    fn registry(&mut self) -> &mut GoalRegistry {
        self.registry
    }

    fn tick(&self) -> Tick {
        self.tick
    }

    fn tie_break(&self) -> TieBreak {
        self.tie_break
    }
}
