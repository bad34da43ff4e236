//! Individual actor authority
//!
//! Leaf of the hierarchy. Turns one accepted goal at a time into a host
//! command, and drives that goal's lifecycle from the host's notifications
//! (idle, destroyed, target destroyed). Also runs a few micro-behaviors that
//! are not goals but may suspend or abort the current one.

use std::cell::Cell;
use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::ai::context::UnitCtx;
use crate::core::catalog::Role;
use crate::core::error::{AiError, Result};
use crate::core::types::{distance_2d, ActorId, Tick};
use crate::goal::processor::{GoalProcessor, Verdict};
use crate::goal::record::Reaction;
use crate::goal::registry::GoalRegistry;
use crate::goal::types::{GoalId, GoalState, GoalType, Transition};
use crate::host::{Allegiance, Command, UnitInfo};

/// Opportunistic attack holding the current goal suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diversion {
    pub target: ActorId,
    pub until: Tick,
    /// Goal suspended for the diversion, resumed by a later sweep
    pub resume: Option<GoalId>,
}

/// The accepted goal, kept up to date by its Complete/Abort reactions
#[derive(Debug, Clone, Copy, Default)]
struct CurrentSlot {
    goal: Option<GoalId>,
    /// The goal was aborted from outside; the actor still has to be stopped
    stop: bool,
}

#[derive(Debug)]
pub struct UnitAi {
    actor: ActorId,
    def: String,
    role: Role,
    goals: Vec<GoalId>,
    current: Rc<Cell<CurrentSlot>>,
    diversion: Option<Diversion>,
    stuck_in_base: u32,
}

impl UnitAi {
    pub fn new(actor: ActorId, def: impl Into<String>, role: Role) -> Self {
        Self {
            actor,
            def: def.into(),
            role,
            goals: Vec::new(),
            current: Rc::new(Cell::new(CurrentSlot::default())),
            diversion: None,
            stuck_in_base: 0,
        }
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn def(&self) -> &str {
        &self.def
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Goal ids queued on this actor
    pub fn stack(&self) -> &[GoalId] {
        &self.goals
    }

    pub fn diversion(&self) -> Option<&Diversion> {
        self.diversion.as_ref()
    }

    /// The goal this actor is acting on, if it is still live and unfinished
    pub fn current_goal(&self, registry: &GoalRegistry) -> Option<GoalId> {
        self.current.get().goal.filter(|id| registry.is_pending(*id))
    }

    /// Accept `id` as the current goal and subscribe to its end
    fn set_current(&mut self, registry: &mut GoalRegistry, id: GoalId) {
        self.current.set(CurrentSlot {
            goal: Some(id),
            stop: false,
        });
        for (transition, stop) in [(Transition::Complete, false), (Transition::Abort, true)] {
            let slot = Rc::clone(&self.current);
            registry.subscribe(
                id,
                transition,
                Reaction::Callback(Box::new(move |_, goal| {
                    if slot.get().goal == Some(goal) {
                        slot.set(CurrentSlot { goal: None, stop });
                    }
                })),
            );
        }
    }

    /// Forget the current goal without waiting for its reactions
    fn clear_current(&mut self) {
        self.current.set(CurrentSlot::default());
    }

    /// Whether a production order is queued or running on this actor
    pub fn is_producing(&self, registry: &GoalRegistry) -> bool {
        self.goals.iter().any(|id| {
            registry
                .get(*id)
                .is_some_and(|g| g.goal_type().is_build() && !g.is_finished())
        })
    }

    /// Per-sweep entry point: settle the bookkeeping, then sweep the stack
    pub fn update(&mut self, ctx: &mut UnitCtx<'_>) {
        self.settle(ctx);
        self.process_goal_stack(ctx);
    }

    /// Stop the actor if its current goal was aborted behind our back
    fn settle(&mut self, ctx: &mut UnitCtx<'_>) {
        let slot = self.current.get();
        if slot.stop {
            tracing::debug!(actor = %self.actor, "current goal aborted, stopping");
            ctx.host.give_order(self.actor, Command::Stop);
            self.current.set(CurrentSlot { stop: false, ..slot });
        }
    }

    /// Host reports the actor has nothing to do
    pub fn on_idle(&mut self, registry: &mut GoalRegistry) {
        if let Some(diversion) = self.diversion.take() {
            tracing::debug!(actor = %self.actor, target = %diversion.target, "diversion over");
            return;
        }
        if let Some(current) = self.current_goal(registry) {
            registry.complete(current);
        }
        self.clear_current();
    }

    /// Remove every goal on the stack; aborts propagate to the delegators
    pub fn on_destroyed(&mut self, registry: &mut GoalRegistry) {
        self.clear_current();
        for id in std::mem::take(&mut self.goals) {
            registry.remove(id);
        }
        self.diversion = None;
    }

    pub fn on_enemy_destroyed(&mut self, registry: &mut GoalRegistry, enemy: ActorId) {
        if self.diversion.is_some_and(|d| d.target == enemy) {
            self.diversion = None;
        }
        let done: Vec<GoalId> = self
            .goals
            .iter()
            .copied()
            .filter(|id| {
                registry.get(*id).is_some_and(|g| {
                    g.goal_type() == GoalType::AttackUnit
                        && !g.is_finished()
                        && g.actor(0) == Some(enemy)
                })
            })
            .collect();
        for id in done {
            registry.complete(id);
        }
    }

    /// Host command for a goal; `Ok(None)` means there is nothing left to do
    fn command_for(&self, ctx: &UnitCtx<'_>, id: GoalId) -> Result<Option<Command>> {
        let goal = ctx.registry.get(id).ok_or(AiError::GoalNotFound(id))?;
        let goal_type = goal.goal_type();
        let malformed = |reason: &str| AiError::MalformedParams {
            goal: id,
            goal_type,
            reason: reason.to_string(),
        };
        let point = || goal.point(0).ok_or_else(|| malformed("parameter 0 must be a point"));

        let command = match goal_type {
            GoalType::BuildExpansion => {
                if self.role != Role::Constructor {
                    return Err(malformed("issued to a non-constructor"));
                }
                let pos = point()?;
                let def = ctx
                    .catalog
                    .expansion_for(&self.def)
                    .ok_or_else(|| AiError::UnknownUnitDef(self.def.clone()))?;
                Command::Build {
                    def: def.to_string(),
                    pos,
                }
            }
            GoalType::BuildProducer => {
                if self.role != Role::Base {
                    return Err(malformed("issued to a non-base unit"));
                }
                let def = ctx
                    .catalog
                    .producer_for(&self.def)
                    .ok_or_else(|| AiError::UnknownUnitDef(self.def.clone()))?;
                Command::Produce {
                    def: def.to_string(),
                }
            }
            GoalType::Move | GoalType::Retreat => Command::Move(point()?),
            GoalType::AttackArea | GoalType::DefendArea => Command::Fight(point()?),
            GoalType::AttackUnit => {
                let target = goal
                    .actor(0)
                    .ok_or_else(|| malformed("parameter 0 must be an actor"))?;
                if ctx.host.unit(target).is_none() {
                    return Ok(None);
                }
                Command::Attack(target)
            }
        };
        Ok(Some(command))
    }

    /// Periodic checks that are not goals themselves
    pub fn run_micro(&mut self, ctx: &mut UnitCtx<'_>) {
        let Some(me) = ctx.host.unit(self.actor) else {
            return;
        };
        if let Some(diversion) = self.diversion {
            if ctx.tick >= diversion.until {
                tracing::debug!(actor = %self.actor, "diversion timed out");
                self.diversion = None;
            }
        }

        self.check_build_valid(ctx);
        self.check_opportunistic_targets(ctx, &me);
        self.check_standing_in_base(ctx, &me);
    }

    /// Abort a build whose site has hostiles on it
    fn check_build_valid(&mut self, ctx: &mut UnitCtx<'_>) {
        let Some(current) = self.current_goal(ctx.registry) else {
            return;
        };
        let Some(site) = ctx
            .registry
            .get(current)
            .filter(|g| g.goal_type() == GoalType::BuildExpansion && g.is_executing())
            .and_then(|g| g.point(0))
        else {
            return;
        };

        let hostiles = ctx
            .host
            .units_in_radius(Allegiance::Enemy, site, ctx.config.build_danger_radius);
        if !hostiles.is_empty() {
            tracing::warn!(
                actor = %self.actor,
                goal = %current,
                hostiles = hostiles.len(),
                "build site unsafe, aborting"
            );
            self.clear_current();
            ctx.registry.abort(current);
            ctx.host.give_order(self.actor, Command::Stop);
        }
    }

    /// Divert a combat unit onto a high-value enemy in weapon range
    fn check_opportunistic_targets(&mut self, ctx: &mut UnitCtx<'_>, me: &UnitInfo) {
        if self.role != Role::Combat || self.diversion.is_some() {
            return;
        }
        let current = self.current_goal(ctx.registry);
        let busy = current
            .and_then(|id| ctx.registry.get(id))
            .is_some_and(|g| matches!(g.goal_type(), GoalType::Retreat | GoalType::AttackUnit));
        if busy {
            return;
        }

        let target = ctx
            .host
            .units_in_radius(Allegiance::Enemy, me.pos, ctx.config.opportunistic_range)
            .into_iter()
            .filter_map(|id| ctx.host.unit(id))
            .filter(|u| ctx.catalog.role_of(&u.def).is_high_value())
            .min_by_key(|u| OrderedFloat(distance_2d(u.pos, me.pos)));
        let Some(target) = target else {
            return;
        };

        if !ctx.host.give_order(self.actor, Command::Attack(target.id)) {
            return;
        }
        if let Some(current) = current {
            ctx.registry.suspend(current);
        }
        tracing::info!(actor = %self.actor, target = %target.id, "opportunistic attack");
        self.clear_current();
        self.diversion = Some(Diversion {
            target: target.id,
            until: ctx.tick + ctx.config.diversion_timeout,
            resume: current,
        });
    }

    /// Push an idle unit out of a base's production area
    fn check_standing_in_base(&mut self, ctx: &mut UnitCtx<'_>, me: &UnitInfo) {
        if self.role.is_structure()
            || self.current_goal(ctx.registry).is_some()
            || self.diversion.is_some()
        {
            self.stuck_in_base = 0;
            return;
        }

        let blocking = ctx
            .host
            .units_in_radius(Allegiance::Friendly, me.pos, ctx.config.base_block_radius)
            .into_iter()
            .filter(|id| *id != self.actor)
            .filter_map(|id| ctx.host.unit(id))
            .find(|u| ctx.catalog.role_of(&u.def) == Role::Base);
        let Some(base) = blocking else {
            self.stuck_in_base = 0;
            return;
        };

        self.stuck_in_base += 1;
        if self.stuck_in_base < ctx.config.stuck_checks {
            return;
        }
        self.stuck_in_base = 0;

        let mut away = me.pos - base.pos;
        away.y = 0.0;
        let dir = away.try_normalize().unwrap_or(glam::Vec3::X);
        let mut dest = me.pos + dir * ctx.config.nudge_distance;
        dest.y = ctx.host.ground_height(dest.x, dest.z);
        tracing::debug!(actor = %self.actor, base = %base.id, "nudging unit out of base");
        ctx.host.give_order(self.actor, Command::Move(dest));
    }
}

impl<'a> GoalProcessor<UnitCtx<'a>> for UnitAi {
    fn goals(&self) -> &[GoalId] {
        &self.goals
    }

    fn goals_mut(&mut self) -> &mut Vec<GoalId> {
        &mut self.goals
    }

    fn process_goal(&mut self, ctx: &mut UnitCtx<'a>, id: GoalId) -> Verdict {
        let Some(goal) = ctx.registry.get(id) else {
            return Verdict::PopContinue;
        };
        if goal.is_finished() {
            return Verdict::PopContinue;
        }
        let (goal_type, priority, state) = (goal.goal_type(), goal.priority(), goal.state());

        let current = self.current_goal(ctx.registry);
        if current == Some(id) {
            return Verdict::Break;
        }

        if let Some(diversion) = self.diversion {
            let held = diversion
                .resume
                .and_then(|g| ctx.registry.get(g))
                .map_or(i32::MIN, |g| g.priority());
            if priority <= held {
                return Verdict::Break;
            }
            tracing::debug!(actor = %self.actor, goal = %id, "goal outranks diversion");
            self.diversion = None;
        }

        if let Some(current) = current {
            let held = ctx.registry.get(current).map_or(i32::MIN, |g| g.priority());
            if held >= priority {
                return Verdict::Break;
            }
            if ctx.registry.get(current).is_some_and(|g| g.is_executing()) {
                ctx.registry.suspend(current);
            }
            self.clear_current();
        }

        let command = match self.command_for(ctx, id) {
            Ok(Some(command)) => command,
            Ok(None) => {
                ctx.registry.complete(id);
                return Verdict::PopContinue;
            }
            Err(err @ AiError::MalformedParams { .. }) => {
                if cfg!(debug_assertions) {
                    panic!("malformed goal on actor {}: {err}", self.actor);
                }
                tracing::error!(actor = %self.actor, %err, "discarding malformed goal");
                return Verdict::PopContinue;
            }
            Err(err) => {
                tracing::error!(actor = %self.actor, %err, "discarding goal");
                return Verdict::PopContinue;
            }
        };

        if !ctx.host.give_order(self.actor, command) {
            tracing::debug!(actor = %self.actor, goal = %id, "host rejected order");
            return Verdict::Continue;
        }

        match state {
            GoalState::Idle => ctx.registry.start(id),
            GoalState::Suspended => ctx.registry.continue_(id),
            _ => true,
        };
        self.set_current(ctx.registry, id);
        tracing::info!(actor = %self.actor, goal = %id, ?goal_type, "order issued");

        if goal_type == GoalType::BuildProducer {
            // no progress callback for production; treat the order as done
            ctx.registry.complete(id);
        }
        Verdict::Break
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::UnitCatalog;
    use crate::core::config::{TieBreak, UnitConfig};
    use crate::goal::types::Param;
    use crate::host::Host;
    use crate::sandbox::Sandbox;
    use glam::Vec3;

    struct Fixture {
        registry: GoalRegistry,
        sandbox: Sandbox,
        catalog: UnitCatalog,
        config: UnitConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: GoalRegistry::new(),
                sandbox: Sandbox::new(),
                catalog: UnitCatalog::default(),
                config: UnitConfig::default(),
            }
        }

        fn unit(&mut self, def: &str, pos: Vec3) -> UnitAi {
            let id = self.sandbox.spawn(Allegiance::Friendly, def, pos);
            UnitAi::new(id, def, self.catalog.role_of(def))
        }

        fn ctx(&mut self, tick: Tick) -> UnitCtx<'_> {
            UnitCtx {
                registry: &mut self.registry,
                host: &mut self.sandbox,
                catalog: &self.catalog,
                config: &self.config,
                tick,
                tie_break: TieBreak::NewestFirst,
            }
        }

        fn goal(&mut self, unit: &mut UnitAi, priority: i32, ty: GoalType, params: Vec<Param>) -> GoalId {
            let id = self.registry.create_with(priority, ty, params);
            unit.add_goal(id);
            id
        }
    }

    #[test]
    fn test_build_issued_once() {
        let mut f = Fixture::new();
        let mut unit = f.unit("assembler", Vec3::ZERO);
        let site = Vec3::new(300.0, 0.0, 100.0);
        let id = f.goal(&mut unit, 1, GoalType::BuildExpansion, vec![Param::Point(site)]);

        unit.update(&mut f.ctx(0));
        unit.update(&mut f.ctx(1));

        assert_eq!(f.registry.state_of(id), Some(GoalState::Executing));
        assert_eq!(
            f.sandbox.orders_for(unit.actor()),
            vec![&Command::Build {
                def: "socket".into(),
                pos: site
            }]
        );
        assert!(unit.is_producing(&f.registry));
    }

    #[test]
    fn test_higher_priority_preempts_and_lower_resumes() {
        let mut f = Fixture::new();
        let mut unit = f.unit("bit", Vec3::ZERO);
        let low = f.goal(&mut unit, 1, GoalType::Move, vec![Param::Point(Vec3::X * 100.0)]);
        unit.update(&mut f.ctx(0));

        let high = f.goal(&mut unit, 9, GoalType::Retreat, vec![Param::Point(Vec3::Z * 100.0)]);
        unit.update(&mut f.ctx(1));
        assert_eq!(f.registry.state_of(low), Some(GoalState::Suspended));
        assert_eq!(f.registry.state_of(high), Some(GoalState::Executing));
        assert_eq!(unit.current_goal(&f.registry), Some(high));

        unit.on_idle(&mut f.registry);
        assert_eq!(f.registry.state_of(high), Some(GoalState::Completed));
        unit.update(&mut f.ctx(2));
        assert_eq!(f.registry.state_of(low), Some(GoalState::Executing));
        assert!(!f.registry.contains(high));
        assert_eq!(f.sandbox.orders_for(unit.actor()).len(), 3);
    }

    #[test]
    fn test_equal_priority_waits() {
        let mut f = Fixture::new();
        let mut unit = f.unit("bit", Vec3::ZERO);
        let first = f.goal(&mut unit, 5, GoalType::Move, vec![Param::Point(Vec3::X)]);
        unit.update(&mut f.ctx(0));
        let second = f.goal(&mut unit, 5, GoalType::Move, vec![Param::Point(Vec3::Z)]);
        unit.update(&mut f.ctx(1));

        assert_eq!(f.registry.state_of(first), Some(GoalState::Executing));
        assert_eq!(f.registry.state_of(second), Some(GoalState::Idle));
        assert_eq!(f.sandbox.orders_for(unit.actor()).len(), 1);
    }

    #[test]
    fn test_build_producer_completes_on_issue() {
        let mut f = Fixture::new();
        let mut base = f.unit("kernel", Vec3::ZERO);
        let id = f.goal(&mut base, 1, GoalType::BuildProducer, vec![]);
        base.update(&mut f.ctx(0));

        assert_eq!(
            f.sandbox.orders_for(base.actor()),
            vec![&Command::Produce {
                def: "assembler".into()
            }]
        );
        // erased by the same sweep's cleanup
        assert!(!f.registry.contains(id));
        assert!(base.stack().is_empty());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "malformed goal")]
    fn test_malformed_goal_fatal_in_debug() {
        let mut f = Fixture::new();
        let mut unit = f.unit("bit", Vec3::ZERO);
        f.goal(&mut unit, 1, GoalType::Move, vec![]);
        unit.update(&mut f.ctx(0));
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_malformed_goal_discarded() {
        let mut f = Fixture::new();
        let mut unit = f.unit("bit", Vec3::ZERO);
        let wrong_role = f.goal(&mut unit, 1, GoalType::BuildProducer, vec![]);
        let no_point = f.goal(&mut unit, 1, GoalType::Move, vec![]);
        unit.update(&mut f.ctx(0));
        unit.update(&mut f.ctx(1));

        assert!(!f.registry.contains(wrong_role));
        assert!(!f.registry.contains(no_point));
        assert!(f.sandbox.orders().is_empty());
    }

    #[test]
    fn test_attack_unit_completes_when_target_destroyed() {
        let mut f = Fixture::new();
        let enemy = f.sandbox.spawn(Allegiance::Enemy, "worm", Vec3::X * 500.0);
        let mut unit = f.unit("byte", Vec3::ZERO);
        let id = f.goal(&mut unit, 1, GoalType::AttackUnit, vec![Param::Actor(enemy)]);
        unit.update(&mut f.ctx(0));
        assert_eq!(f.registry.state_of(id), Some(GoalState::Executing));

        unit.on_enemy_destroyed(&mut f.registry, enemy);
        assert_eq!(f.registry.state_of(id), Some(GoalState::Completed));
    }

    #[test]
    fn test_unsafe_build_site_aborts() {
        let mut f = Fixture::new();
        let mut unit = f.unit("assembler", Vec3::ZERO);
        let site = Vec3::new(1000.0, 0.0, 0.0);
        let id = f.goal(&mut unit, 1, GoalType::BuildExpansion, vec![Param::Point(site)]);
        unit.update(&mut f.ctx(0));
        f.sandbox.spawn(Allegiance::Enemy, "bit", site + Vec3::X * 50.0);

        unit.run_micro(&mut f.ctx(15));
        assert_eq!(f.registry.state_of(id), Some(GoalState::Aborted));
        assert_eq!(f.sandbox.orders().last().map(|o| &o.command), Some(&Command::Stop));
        assert_eq!(unit.current_goal(&f.registry), None);
    }

    #[test]
    fn test_opportunistic_diversion_and_resume() {
        let mut f = Fixture::new();
        let mut unit = f.unit("bit", Vec3::ZERO);
        let id = f.goal(&mut unit, 1, GoalType::AttackArea, vec![Param::Point(Vec3::X * 2000.0)]);
        unit.update(&mut f.ctx(0));
        let target = f.sandbox.spawn(Allegiance::Enemy, "assembler", Vec3::Z * 100.0);

        unit.run_micro(&mut f.ctx(15));
        assert_eq!(f.registry.state_of(id), Some(GoalState::Suspended));
        assert_eq!(unit.diversion().map(|d| d.target), Some(target));

        // still diverted: the suspended goal waits
        unit.update(&mut f.ctx(16));
        assert_eq!(f.registry.state_of(id), Some(GoalState::Suspended));

        unit.on_enemy_destroyed(&mut f.registry, target);
        unit.update(&mut f.ctx(17));
        assert_eq!(f.registry.state_of(id), Some(GoalState::Executing));
        assert_eq!(
            f.sandbox.orders().last().map(|o| &o.command),
            Some(&Command::Fight(Vec3::X * 2000.0))
        );
    }

    #[test]
    fn test_diversion_expires() {
        let mut f = Fixture::new();
        let mut unit = f.unit("bit", Vec3::ZERO);
        f.sandbox.spawn(Allegiance::Enemy, "kernel", Vec3::Z * 100.0);
        unit.run_micro(&mut f.ctx(0));
        assert!(unit.diversion().is_some());

        // the enemy moves away so no new diversion starts
        let enemy = f.sandbox.units(Allegiance::Enemy)[0];
        f.sandbox.set_position(enemy, Vec3::Z * 5000.0);
        let until = unit.diversion().unwrap().until;
        unit.run_micro(&mut f.ctx(until));
        assert!(unit.diversion().is_none());
    }

    #[test]
    fn test_nudged_out_of_base() {
        let mut f = Fixture::new();
        f.sandbox.spawn(Allegiance::Friendly, "kernel", Vec3::ZERO);
        let mut unit = f.unit("bit", Vec3::X * 10.0);

        for tick in 0..3 {
            unit.run_micro(&mut f.ctx(tick * 15));
        }
        let orders = f.sandbox.orders_for(unit.actor());
        assert_eq!(orders.len(), 1);
        match orders[0] {
            Command::Move(dest) => assert!((dest.x - 210.0).abs() < 1e-3),
            other => panic!("unexpected order {other:?}"),
        }
    }

    #[test]
    fn test_destroyed_aborts_stack() {
        let mut f = Fixture::new();
        let mut unit = f.unit("bit", Vec3::ZERO);
        let a = f.goal(&mut unit, 1, GoalType::Move, vec![Param::Point(Vec3::X)]);
        let b = f.goal(&mut unit, 2, GoalType::Move, vec![Param::Point(Vec3::Z)]);
        unit.update(&mut f.ctx(0));

        unit.on_destroyed(&mut f.registry);
        assert!(!f.registry.contains(a));
        assert!(!f.registry.contains(b));
        assert!(unit.stack().is_empty());
    }

    #[test]
    fn test_completed_goal_clears_current_at_once() {
        let mut f = Fixture::new();
        let mut unit = f.unit("bit", Vec3::ZERO);
        let id = f.goal(&mut unit, 5, GoalType::Move, vec![Param::Point(Vec3::X * 50.0)]);
        unit.update(&mut f.ctx(0));
        assert_eq!(unit.current.get().goal, Some(id));

        f.registry.complete(id);
        assert_eq!(unit.current.get().goal, None);
        assert!(!unit.current.get().stop);

        let next = f.goal(&mut unit, 1, GoalType::Move, vec![Param::Point(Vec3::Z * 50.0)]);
        unit.update(&mut f.ctx(1));
        assert_eq!(unit.current_goal(&f.registry), Some(next));
        assert!(f.sandbox.orders().iter().all(|o| o.command != Command::Stop));
    }

    #[test]
    fn test_aborted_current_goal_stops_unit() {
        let mut f = Fixture::new();
        let mut unit = f.unit("bit", Vec3::ZERO);
        let id = f.goal(&mut unit, 1, GoalType::Move, vec![Param::Point(Vec3::X * 50.0)]);
        unit.update(&mut f.ctx(0));

        f.registry.abort(id);
        unit.update(&mut f.ctx(1));
        assert_eq!(f.sandbox.orders().last().map(|o| &o.command), Some(&Command::Stop));
        assert!(unit.stack().is_empty());
    }
}
