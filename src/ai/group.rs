//! Group authority
//!
//! Owns a pool of actors of one kind (builders, bases, a combat pool) and
//! hands each incoming group goal to the members. Build goals go to one
//! eligible actor per sweep; group-wide orders go to every free member.

use crate::ai::context::Ctx;
use crate::core::catalog::Role;
use crate::core::types::{ActorId, Position};
use crate::goal::claims::ClaimSet;
use crate::goal::delegate::{delegate, ClaimPolicy};
use crate::goal::processor::{GoalProcessor, Verdict};
use crate::goal::types::{GoalId, GoalType, Param};
use crate::host::Host;

#[derive(Debug)]
pub struct UnitGroup {
    name: String,
    members: Vec<ActorId>,
    goals: Vec<GoalId>,
    used_units: ClaimSet<ActorId>,
    used_goals: ClaimSet<GoalId>,
}

impl UnitGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            goals: Vec::new(),
            used_units: ClaimSet::new(),
            used_goals: ClaimSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[ActorId] {
        &self.members
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.members.contains(&actor)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn stack(&self) -> &[GoalId] {
        &self.goals
    }

    /// Actors claimed during the current sweep
    pub fn used_units(&self) -> &ClaimSet<ActorId> {
        &self.used_units
    }

    /// Returns false if the actor was already a member
    pub fn assign(&mut self, actor: ActorId) -> bool {
        if self.contains(actor) {
            return false;
        }
        tracing::debug!(group = %self.name, %actor, "unit joined group");
        self.members.push(actor);
        true
    }

    pub fn remove_member(&mut self, actor: ActorId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != actor);
        before != self.members.len()
    }

    /// Exchange rosters; goal stacks stay where they are
    pub fn swap_members(&mut self, other: &mut UnitGroup) {
        std::mem::swap(&mut self.members, &mut other.members);
    }

    /// Total health of the members the host still knows about
    pub fn health(&self, host: &dyn Host) -> f32 {
        self.members
            .iter()
            .filter_map(|id| host.unit(*id))
            .map(|u| u.health)
            .sum()
    }

    pub fn centroid(&self, host: &dyn Host) -> Option<Position> {
        let positions: Vec<Position> = self
            .members
            .iter()
            .filter_map(|id| host.unit(*id))
            .map(|u| u.pos)
            .collect();
        if positions.is_empty() {
            return None;
        }
        Some(positions.iter().copied().sum::<Position>() / positions.len() as f32)
    }

    /// One actor per build goal per sweep
    fn assign_builder(&mut self, ctx: &mut Ctx<'_>, id: GoalId) -> Verdict {
        let Some(goal) = ctx.registry.get(id) else {
            return Verdict::PopContinue;
        };
        if goal.is_executing() {
            return Verdict::Continue;
        }
        let (goal_type, priority, params) = (goal.goal_type(), goal.priority(), goal.params().to_vec());
        let required = match goal_type {
            GoalType::BuildProducer => Role::Base,
            _ => Role::Constructor,
        };
        if !self.used_goals.claim(id) {
            return Verdict::Continue;
        }

        for actor in &self.members {
            if self.used_units.contains(*actor) {
                continue;
            }
            let Some(unit) = ctx.units.get(actor) else {
                continue;
            };
            if unit.role() != required || unit.is_producing(ctx.registry) {
                continue;
            }

            let Some(child) = delegate(
                ctx.registry,
                id,
                goal_type,
                priority,
                params,
                ClaimPolicy::Exclusive,
            ) else {
                return Verdict::PopContinue;
            };
            if let Some(unit) = ctx.units.get_mut(actor) {
                unit.add_goal(child);
            }
            self.used_units.claim(*actor);
            tracing::info!(group = %self.name, %actor, goal = %id, ?goal_type, "unit assigned");
            ctx.registry.start(id);
            return Verdict::Continue;
        }

        tracing::debug!(group = %self.name, goal = %id, "no eligible unit this sweep");
        Verdict::Continue
    }

    /// Every free member takes part; the goal completes once all of them
    /// are done
    fn assign_everyone(&mut self, ctx: &mut Ctx<'_>, id: GoalId) -> Verdict {
        let Some(goal) = ctx.registry.get(id) else {
            return Verdict::PopContinue;
        };
        if goal.is_executing() || goal.is_delegated() {
            return Verdict::Break;
        }
        let (goal_type, priority, params) = (goal.goal_type(), goal.priority(), goal.params().to_vec());
        let well_formed = match goal_type {
            GoalType::AttackUnit => matches!(params.first(), Some(Param::Actor(_))),
            _ => matches!(params.first(), Some(Param::Point(_))),
        };
        if !well_formed {
            if cfg!(debug_assertions) {
                panic!("malformed group goal {id}: {goal_type:?} without a target");
            }
            tracing::error!(group = %self.name, goal = %id, ?goal_type, "group order without a target, discarding");
            return Verdict::PopContinue;
        }
        if !self.used_goals.claim(id) {
            return Verdict::Break;
        }

        let mut claimed = 0;
        for actor in &self.members {
            if !ctx.units.contains_key(actor) || !self.used_units.claim(*actor) {
                continue;
            }
            let Some(child) = delegate(
                ctx.registry,
                id,
                goal_type,
                priority,
                params.clone(),
                ClaimPolicy::Shared { actor: *actor },
            ) else {
                return Verdict::PopContinue;
            };
            if let Some(unit) = ctx.units.get_mut(actor) {
                unit.add_goal(child);
            }
            claimed += 1;
        }

        if claimed == 0 {
            tracing::debug!(group = %self.name, goal = %id, "no free members this sweep");
            return Verdict::Continue;
        }
        if let Some(goal) = ctx.registry.get_mut(id) {
            goal.set_delegated(true);
        }
        ctx.registry.start(id);
        tracing::info!(group = %self.name, goal = %id, ?goal_type, claimed, "group order issued");
        Verdict::Break
    }
}

impl<'a> GoalProcessor<Ctx<'a>> for UnitGroup {
    fn goals(&self) -> &[GoalId] {
        &self.goals
    }

    fn goals_mut(&mut self) -> &mut Vec<GoalId> {
        &mut self.goals
    }

    fn begin_sweep(&mut self) {
        self.used_units.clear();
        self.used_goals.clear();
    }

    fn process_goal(&mut self, ctx: &mut Ctx<'a>, id: GoalId) -> Verdict {
        let Some(goal) = ctx.registry.get(id) else {
            return Verdict::PopContinue;
        };
        if goal.is_finished() {
            return Verdict::PopContinue;
        }
        let goal_type = goal.goal_type();
        if goal_type.is_build() {
            self.assign_builder(ctx, id)
        } else {
            self.assign_everyone(ctx, id)
        }
    }
}
