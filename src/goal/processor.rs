//! Goal processor contract shared by every tier
//!
//! A processor owns an ordered stack of goal ids. Once per sweep it visits
//! them in descending priority (ties: most recently added first, unless the
//! tie-break is configured otherwise), lets the tier decide what to do with
//! each, and finally drops ids that vanished, finished or timed out.

use crate::core::config::TieBreak;
use crate::core::types::Tick;
use crate::goal::registry::GoalRegistry;
use crate::goal::types::{GoalId, GoalType};

/// Per-goal decision returned by [`GoalProcessor::process_goal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Remove the goal, keep sweeping
    PopContinue,
    /// Remove the goal, stop the sweep
    PopBreak,
    /// Keep the goal, keep sweeping
    Continue,
    /// Keep the goal, stop the sweep
    Break,
}

impl Verdict {
    pub fn pops(&self) -> bool {
        matches!(self, Verdict::PopContinue | Verdict::PopBreak)
    }

    pub fn breaks(&self) -> bool {
        matches!(self, Verdict::PopBreak | Verdict::Break)
    }
}

/// What a sweep needs from its surroundings
pub trait SweepContext {
    fn registry(&mut self) -> &mut GoalRegistry;
    fn tick(&self) -> Tick;
    fn tie_break(&self) -> TieBreak {
        TieBreak::NewestFirst
    }
}

/// Bare sweep context: a registry and the current tick
pub struct RegistryContext<'a> {
    pub registry: &'a mut GoalRegistry,
    pub tick: Tick,
    pub tie_break: TieBreak,
}

impl SweepContext for RegistryContext<'_> {
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

/// Visiting order for a sweep over `stack`
///
/// Ids that no longer resolve are left out.
pub fn sweep_order(registry: &GoalRegistry, stack: &[GoalId], tie_break: TieBreak) -> Vec<GoalId> {
    let mut order: Vec<(usize, i32, GoalId)> = stack
        .iter()
        .enumerate()
        .filter_map(|(pos, id)| registry.get(*id).map(|g| (pos, g.priority(), *id)))
        .collect();

    order.sort_by(|a, b| {
        let by_priority = b.1.cmp(&a.1);
        match tie_break {
            TieBreak::NewestFirst => by_priority.then(b.0.cmp(&a.0)),
            TieBreak::OldestFirst => by_priority.then(a.0.cmp(&b.0)),
        }
    });
    order.into_iter().map(|(_, _, id)| id).collect()
}

/// Drop from `stack` every id that is absent, finished or timed out
///
/// Timed-out goals are removed from the registry (aborted, then erased) and
/// finished goals are erased. The stack is walked as a snapshot because the
/// abort of one goal may finish others in the same stack.
pub fn cleanup_stack(registry: &mut GoalRegistry, stack: &mut Vec<GoalId>, tick: Tick) {
    let snapshot = std::mem::take(stack);

    for id in &snapshot {
        if registry.get(*id).is_some_and(|g| !g.is_finished() && g.is_expired(tick)) {
            tracing::info!(goal = %id, tick, "goal timed out");
            registry.remove(*id);
        }
    }

    let mut kept = Vec::with_capacity(snapshot.len());
    for id in snapshot {
        match registry.get(id) {
            None => {}
            Some(goal) if goal.is_finished() => registry.remove(id),
            Some(_) => kept.push(id),
        }
    }

    // keep anything pushed while the stack was detached
    kept.append(stack);
    *stack = kept;
}

/// Capability implemented by the strategic, group and actor tiers
pub trait GoalProcessor<C: SweepContext> {
    fn goals(&self) -> &[GoalId];

    fn goals_mut(&mut self) -> &mut Vec<GoalId>;

    /// Tier-specific decision for one goal
    ///
    /// Must not re-issue work for a goal that is already executing.
    fn process_goal(&mut self, ctx: &mut C, goal: GoalId) -> Verdict;

    /// Reset per-sweep claim bookkeeping
    fn begin_sweep(&mut self) {}

    fn add_goal(&mut self, goal: GoalId) {
        self.goals_mut().push(goal);
    }

    /// One scheduling sweep followed by cleanup
    fn process_goal_stack(&mut self, ctx: &mut C) {
        self.begin_sweep();
        let tick = ctx.tick();
        let tie_break = ctx.tie_break();
        let order = sweep_order(ctx.registry(), self.goals(), tie_break);

        for id in order {
            let expired = match ctx.registry().get(id) {
                None => continue,
                Some(goal) => !goal.is_finished() && goal.is_expired(tick),
            };
            if expired {
                tracing::info!(goal = %id, tick, "goal timed out");
                ctx.registry().remove(id);
                continue;
            }

            let verdict = self.process_goal(ctx, id);
            if verdict.pops() {
                ctx.registry().remove(id);
                self.goals_mut().retain(|g| *g != id);
            }
            if verdict.breaks() {
                break;
            }
        }

        self.cleanup(ctx.registry(), tick);
    }

    fn cleanup(&mut self, registry: &mut GoalRegistry, tick: Tick) {
        cleanup_stack(registry, self.goals_mut(), tick);
    }

    /// Whether a live, unfinished goal of `goal_type` is on the stack
    fn has_goal_type(&self, registry: &GoalRegistry, goal_type: GoalType) -> bool {
        self.goals().iter().any(|id| {
            registry
                .get(*id)
                .is_some_and(|g| g.goal_type() == goal_type && !g.is_finished())
        })
    }
}
