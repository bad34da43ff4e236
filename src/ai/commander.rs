//! Commander - host-facing entry point of the skirmish AI
//!
//! Owns the goal registry and all three tiers, and turns host notifications
//! into goal lifecycle events. The host calls [`Commander::on_tick`] once per
//! simulation tick.

use ahash::AHashSet;
use serde::Serialize;

use crate::ai::context::{Ctx, UnitCtx, UnitTable};
use crate::ai::top_level::{Posture, TopLevel};
use crate::ai::unit::UnitAi;
use crate::core::catalog::{Role, UnitCatalog};
use crate::core::config::{StrategyConfig, TieBreak, Tunables, UnitConfig};
use crate::core::error::Result;
use crate::core::types::{ActorId, Tick};
use crate::goal::processor::GoalProcessor;
use crate::goal::registry::GoalRegistry;
use crate::goal::types::GoalId;
use crate::host::{Allegiance, Host};
use crate::influence::InfluenceField;

/// Running counters, dumped by the headless runner
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommanderStats {
    pub find_goals_runs: u64,
    pub sweeps: u64,
    pub goals_collected: u64,
    pub defend_goals: u64,
    pub units_lost: u64,
    pub enemies_destroyed: u64,
}

pub struct Commander<H: Host> {
    host: H,
    registry: GoalRegistry,
    tunables: Box<dyn Tunables>,
    catalog: UnitCatalog,
    unit_config: UnitConfig,
    tie_break: TieBreak,
    top: TopLevel,
    units: UnitTable,
    influence: Box<dyn InfluenceField>,
    known_enemies: AHashSet<ActorId>,
    stats: CommanderStats,
}

impl<H: Host> Commander<H> {
    pub fn new(
        host: H,
        tunables: Box<dyn Tunables>,
        catalog: UnitCatalog,
        influence: Box<dyn InfluenceField>,
    ) -> Result<Self> {
        Self::with_seed(host, tunables, catalog, influence, 42)
    }

    /// Create with specific RNG seed for deterministic behavior
    pub fn with_seed(
        host: H,
        tunables: Box<dyn Tunables>,
        catalog: UnitCatalog,
        influence: Box<dyn InfluenceField>,
        seed: u64,
    ) -> Result<Self> {
        let config = StrategyConfig::from_tunables(tunables.as_ref());
        config.validate()?;
        let unit_config = UnitConfig::from_tunables(tunables.as_ref());
        let tie_break = config.tie_break;

        let mut top = TopLevel::with_seed(config, seed);
        top.discover_sites(&host);

        Ok(Self {
            host,
            registry: GoalRegistry::new(),
            tunables,
            catalog,
            unit_config,
            tie_break,
            top,
            units: UnitTable::new(),
            influence,
            known_enemies: AHashSet::new(),
            stats: CommanderStats::default(),
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn registry(&self) -> &GoalRegistry {
        &self.registry
    }

    pub fn top(&self) -> &TopLevel {
        &self.top
    }

    pub fn unit_ai(&self, actor: ActorId) -> Option<&UnitAi> {
        self.units.get(&actor)
    }

    pub fn stats(&self) -> &CommanderStats {
        &self.stats
    }

    pub fn posture(&self) -> Posture {
        self.top.posture()
    }

    pub fn known_enemies(&self) -> &AHashSet<ActorId> {
        &self.known_enemies
    }

    /// Re-read every tunable; goals already created keep their values
    pub fn reload_config(&mut self) -> Result<()> {
        let config = StrategyConfig::from_tunables(self.tunables.as_ref());
        config.validate()?;
        self.unit_config = UnitConfig::from_tunables(self.tunables.as_ref());
        self.tie_break = config.tie_break;
        self.top.set_config(config);
        tracing::info!("tunables reloaded");
        Ok(())
    }

    /// Periodic update: re-derive, sweep and micro on their own cadences
    pub fn on_tick(&mut self) {
        let tick = self.host.current_tick();
        let config = self.top.config();
        let find = config.find_goals_interval.max(1);
        let sweep = config.sweep_interval.max(1);
        let micro = self.unit_config.micro_interval.max(1);

        if tick % find == 1 % find {
            self.find_goals(tick);
        }
        if tick % sweep == 0 {
            self.sweep(tick);
        }
        if tick % micro == 0 {
            self.run_micro(tick);
        }
    }

    fn find_goals(&mut self, tick: Tick) {
        let mut ctx = Ctx {
            registry: &mut self.registry,
            host: &mut self.host,
            catalog: &self.catalog,
            units: &mut self.units,
            tick,
            tie_break: self.tie_break,
        };
        self.top
            .find_goals(&mut ctx, self.influence.as_mut(), &self.known_enemies);
        self.stats.find_goals_runs += 1;

        let mut reachable: Vec<GoalId> = self.top.reachable_goals();
        for unit in self.units.values() {
            reachable.extend_from_slice(unit.stack());
        }
        let erased = self.registry.collect_garbage(reachable);
        self.stats.goals_collected += erased as u64;
        tracing::debug!(tick, erased, live = self.registry.len(), "goals re-derived");
    }

    /// One sweep of every processor, top-down so a chain of delegations can
    /// reach the host in a single tick
    fn sweep(&mut self, tick: Tick) {
        let mut ctx = Ctx {
            registry: &mut self.registry,
            host: &mut self.host,
            catalog: &self.catalog,
            units: &mut self.units,
            tick,
            tie_break: self.tie_break,
        };
        self.top.process_goal_stack(&mut ctx);
        for group in self.top.groups_mut() {
            group.process_goal_stack(&mut ctx);
        }

        let mut ctx = UnitCtx {
            registry: &mut self.registry,
            host: &mut self.host,
            catalog: &self.catalog,
            config: &self.unit_config,
            tick,
            tie_break: self.tie_break,
        };
        for unit in self.units.values_mut() {
            unit.update(&mut ctx);
        }
        self.stats.sweeps += 1;
    }

    fn run_micro(&mut self, tick: Tick) {
        let mut ctx = UnitCtx {
            registry: &mut self.registry,
            host: &mut self.host,
            catalog: &self.catalog,
            config: &self.unit_config,
            tick,
            tie_break: self.tie_break,
        };
        for unit in self.units.values_mut() {
            unit.run_micro(&mut ctx);
        }
    }

    /// Role of a friendly unit the host still knows about
    fn friendly_role(&self, actor: ActorId) -> Option<(String, Role)> {
        let Some(info) = self.host.unit(actor) else {
            tracing::debug!(%actor, "notification for unknown unit");
            return None;
        };
        if info.side != Allegiance::Friendly {
            return None;
        }
        let role = self.catalog.role_of(&info.def);
        Some((info.def, role))
    }

    fn ensure_unit(&mut self, actor: ActorId) -> Option<Role> {
        if let Some(unit) = self.units.get(&actor) {
            return Some(unit.role());
        }
        let (def, role) = self.friendly_role(actor)?;
        self.units.insert(actor, UnitAi::new(actor, def, role));
        Some(role)
    }

    pub fn on_actor_created(&mut self, actor: ActorId) {
        if let Some(role) = self.ensure_unit(actor) {
            tracing::debug!(%actor, ?role, "unit created");
        }
    }

    /// Construction done: the unit can take orders and joins its group
    pub fn on_actor_finished(&mut self, actor: ActorId) {
        let Some(role) = self.ensure_unit(actor) else {
            return;
        };
        if let Some(kind) = self.top.assign_unit(actor, role) {
            tracing::info!(%actor, ?role, group = ?kind, "unit ready");
        }
    }

    pub fn on_actor_destroyed(&mut self, actor: ActorId, attacker: Option<ActorId>) {
        self.top.remove_unit(actor);
        if let Some(mut unit) = self.units.remove(&actor) {
            tracing::info!(%actor, ?attacker, goals = unit.stack().len(), "unit destroyed");
            unit.on_destroyed(&mut self.registry);
            self.stats.units_lost += 1;
        }
    }

    pub fn on_actor_idle(&mut self, actor: ActorId) {
        if let Some(unit) = self.units.get_mut(&actor) {
            unit.on_idle(&mut self.registry);
        }
    }

    pub fn on_actor_damaged(&mut self, victim: ActorId, attacker: Option<ActorId>, damage: f32) {
        let tick = self.host.current_tick();
        let mut ctx = Ctx {
            registry: &mut self.registry,
            host: &mut self.host,
            catalog: &self.catalog,
            units: &mut self.units,
            tick,
            tie_break: self.tie_break,
        };
        if self
            .top
            .on_actor_damaged(&mut ctx, victim, attacker, damage)
            .is_some()
        {
            self.stats.defend_goals += 1;
        }
    }

    pub fn on_enemy_destroyed(&mut self, enemy: ActorId, attacker: Option<ActorId>) {
        self.known_enemies.remove(&enemy);
        tracing::debug!(%enemy, ?attacker, "enemy destroyed");
        for unit in self.units.values_mut() {
            unit.on_enemy_destroyed(&mut self.registry, enemy);
        }
        self.stats.enemies_destroyed += 1;
    }

    pub fn on_enemy_enter_los(&mut self, enemy: ActorId) {
        self.known_enemies.insert(enemy);
    }

    pub fn on_enemy_leave_los(&mut self, enemy: ActorId) {
        self.known_enemies.remove(&enemy);
    }
}
