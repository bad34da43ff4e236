//! Goal registry - the single owner of every live goal
//!
//! All other structures hold goals by [`GoalId`]. A lookup that returns
//! `None` means the goal has already been removed; callers treat that as
//! "goal vanished" and move on.

use ahash::{AHashMap, AHashSet};

use crate::core::error::{AiError, Result};
use crate::goal::record::{Goal, Reaction};
use crate::goal::types::{GoalId, GoalState, GoalType, Param, Transition};

#[derive(Debug, Default)]
pub struct GoalRegistry {
    goals: AHashMap<GoalId, Goal>,
    next_id: u64,
}

impl GoalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an Idle goal and return its fresh id
    pub fn create(&mut self, priority: i32, goal_type: GoalType) -> GoalId {
        self.next_id += 1;
        let id = GoalId(self.next_id);
        self.goals.insert(id, Goal::new(id, priority, goal_type));
        tracing::debug!(goal = %id, ?goal_type, priority, "created goal");
        id
    }

    /// Allocate a goal with its parameters already attached
    pub fn create_with(
        &mut self,
        priority: i32,
        goal_type: GoalType,
        params: impl IntoIterator<Item = Param>,
    ) -> GoalId {
        let id = self.create(priority, goal_type);
        if let Some(goal) = self.goals.get_mut(&id) {
            goal.params.extend(params);
        }
        id
    }

    pub fn get(&self, id: GoalId) -> Option<&Goal> {
        self.goals.get(&id)
    }

    pub fn get_mut(&mut self, id: GoalId) -> Option<&mut Goal> {
        self.goals.get_mut(&id)
    }

    pub fn contains(&self, id: GoalId) -> bool {
        self.goals.contains_key(&id)
    }

    pub fn state_of(&self, id: GoalId) -> Option<GoalState> {
        self.goals.get(&id).map(|g| g.state)
    }

    /// Live and not yet finished
    pub fn is_pending(&self, id: GoalId) -> bool {
        self.goals.get(&id).is_some_and(|g| !g.is_finished())
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    /// Goals allocated over the registry's lifetime
    pub fn created(&self) -> u64 {
        self.next_id
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Goal> {
        self.goals.values()
    }

    /// Abort the goal if it is not finished, then erase it
    ///
    /// Subscribers always observe a terminal transition before erasure.
    /// Removing an absent id is a no-op.
    pub fn remove(&mut self, id: GoalId) {
        let Some(goal) = self.goals.get(&id) else {
            tracing::debug!(goal = %id, "remove: goal already gone");
            return;
        };
        if !goal.is_finished() {
            // cannot fail: the goal exists and Abort is legal from any unfinished state
            let _ = self.apply(id, Transition::Abort);
        }
        self.goals.remove(&id);
    }

    /// Append a reaction to one of the goal's transition lists
    ///
    /// Returns false if the goal no longer exists.
    pub fn subscribe(&mut self, id: GoalId, transition: Transition, reaction: Reaction) -> bool {
        match self.goals.get_mut(&id) {
            Some(goal) => {
                goal.subscribe(transition, reaction);
                true
            }
            None => false,
        }
    }

    pub fn start(&mut self, id: GoalId) -> bool {
        self.transition(id, Transition::Start)
    }

    pub fn suspend(&mut self, id: GoalId) -> bool {
        self.transition(id, Transition::Suspend)
    }

    pub fn continue_(&mut self, id: GoalId) -> bool {
        self.transition(id, Transition::Continue)
    }

    pub fn complete(&mut self, id: GoalId) -> bool {
        self.transition(id, Transition::Complete)
    }

    pub fn abort(&mut self, id: GoalId) -> bool {
        self.transition(id, Transition::Abort)
    }

    /// Checked transition: a vanished goal is routine, an out-of-graph
    /// transition is a programming error (panics in debug builds)
    fn transition(&mut self, id: GoalId, transition: Transition) -> bool {
        match self.apply(id, transition) {
            Ok(()) => true,
            Err(AiError::GoalNotFound(_)) => {
                tracing::debug!(goal = %id, ?transition, "transition on vanished goal");
                false
            }
            Err(err) => {
                tracing::error!(%err, "goal lifecycle invariant violated");
                debug_assert!(false, "{err}");
                false
            }
        }
    }

    /// Apply a transition and fire its subscriptions synchronously, in
    /// subscription order, before returning
    pub fn apply(&mut self, id: GoalId, transition: Transition) -> Result<()> {
        let goal = self.goals.get_mut(&id).ok_or(AiError::GoalNotFound(id))?;
        let next = goal
            .state
            .next(transition)
            .ok_or(AiError::InvalidTransition {
                goal: id,
                state: goal.state,
                transition,
            })?;

        goal.state = next;
        let goal_type = goal.goal_type;
        let mut reactions = goal.subscriptions.take(transition);
        tracing::info!(goal = %id, ?goal_type, "{} goal", transition.verb());

        for reaction in reactions.iter_mut() {
            self.react(reaction, id);
        }

        if let Some(goal) = self.goals.get_mut(&id) {
            goal.subscriptions.restore(transition, reactions);
        }
        Ok(())
    }

    fn react(&mut self, reaction: &mut Reaction, source: GoalId) {
        match reaction {
            Reaction::Start(target) => {
                let target = *target;
                if self.state_of(target) == Some(GoalState::Idle) {
                    tracing::debug!(goal = %target, from = %source, "StartGoal");
                    let _ = self.apply(target, Transition::Start);
                }
            }
            Reaction::Complete(target) => {
                let target = *target;
                if self.is_pending(target) {
                    tracing::debug!(goal = %target, from = %source, "CompleteGoal");
                    let _ = self.apply(target, Transition::Complete);
                }
            }
            Reaction::Abort(target) => {
                let target = *target;
                if self.is_pending(target) {
                    tracing::debug!(goal = %target, from = %source, "AbortGoal");
                    let _ = self.apply(target, Transition::Abort);
                }
            }
            Reaction::ClearDelegation(target) => {
                let target = *target;
                if let Some(goal) = self.goals.get_mut(&target) {
                    goal.delegated = false;
                }
            }
            Reaction::Release { goal, actor } => {
                let (target, actor) = (*goal, *actor);
                if let Some(goal) = self.goals.get_mut(&target) {
                    goal.claimants.release(actor);
                }
            }
            Reaction::CompleteWhenUnclaimed(target) => {
                let target = *target;
                let settle = self
                    .goals
                    .get(&target)
                    .is_some_and(|g| !g.is_finished() && g.claimants.is_empty());
                if settle {
                    tracing::debug!(goal = %target, from = %source, "last claimant released");
                    let _ = self.apply(target, Transition::Complete);
                }
            }
            Reaction::Callback(callback) => callback(self, source),
        }
    }

    /// Erase every goal that is neither `reachable` nor an ancestor of a
    /// reachable pending goal; returns how many were erased
    pub fn collect_garbage(&mut self, reachable: impl IntoIterator<Item = GoalId>) -> usize {
        let mut keep: AHashSet<GoalId> = AHashSet::new();

        for id in reachable {
            let Some(goal) = self.goals.get(&id) else {
                continue;
            };
            keep.insert(id);
            if goal.is_finished() {
                continue;
            }
            let mut ancestor = goal.parent;
            while let Some(parent) = ancestor {
                if !keep.insert(parent) {
                    break;
                }
                ancestor = self.goals.get(&parent).and_then(|g| g.parent);
            }
        }

        let mut garbage: Vec<GoalId> = self
            .goals
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        garbage.sort();

        for id in &garbage {
            tracing::debug!(goal = %id, "collecting unreachable goal");
            self.remove(*id);
        }
        garbage.len()
    }
}
