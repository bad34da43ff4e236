//! The goal record and its lifecycle subscriptions

use std::fmt;

use crate::core::types::{ActorId, Position, Tick};
use crate::goal::claims::ClaimSet;
use crate::goal::registry::GoalRegistry;
use crate::goal::types::{GoalId, GoalState, GoalType, Param, Transition};

/// Boxed observer invoked with the registry and the transitioning goal
pub type GoalCallback = Box<dyn FnMut(&mut GoalRegistry, GoalId)>;

/// What happens when a subscribed transition fires
///
/// Everything the scheduler itself wires up is one of the tagged variants;
/// `Callback` is for outside observers.
pub enum Reaction {
    /// Start the target if it is still Idle
    Start(GoalId),
    /// Complete the target unless it is already finished
    Complete(GoalId),
    /// Abort the target unless it is already finished
    Abort(GoalId),
    /// Clear the target's "delegation pending" marker
    ClearDelegation(GoalId),
    /// Drop `actor` from the target's claimant roster
    Release { goal: GoalId, actor: ActorId },
    /// Complete the target once its claimant roster is empty
    CompleteWhenUnclaimed(GoalId),
    Callback(GoalCallback),
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reaction::Start(id) => write!(f, "Start({id})"),
            Reaction::Complete(id) => write!(f, "Complete({id})"),
            Reaction::Abort(id) => write!(f, "Abort({id})"),
            Reaction::ClearDelegation(id) => write!(f, "ClearDelegation({id})"),
            Reaction::Release { goal, actor } => write!(f, "Release({goal}, {actor})"),
            Reaction::CompleteWhenUnclaimed(id) => write!(f, "CompleteWhenUnclaimed({id})"),
            Reaction::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

/// Per-transition ordered reaction lists
#[derive(Debug, Default)]
pub struct Subscriptions {
    on_start: Vec<Reaction>,
    on_suspend: Vec<Reaction>,
    on_continue: Vec<Reaction>,
    on_complete: Vec<Reaction>,
    on_abort: Vec<Reaction>,
}

impl Subscriptions {
    fn list_mut(&mut self, transition: Transition) -> &mut Vec<Reaction> {
        match transition {
            Transition::Start => &mut self.on_start,
            Transition::Suspend => &mut self.on_suspend,
            Transition::Continue => &mut self.on_continue,
            Transition::Complete => &mut self.on_complete,
            Transition::Abort => &mut self.on_abort,
        }
    }

    pub fn len(&self, transition: Transition) -> usize {
        match transition {
            Transition::Start => self.on_start.len(),
            Transition::Suspend => self.on_suspend.len(),
            Transition::Continue => self.on_continue.len(),
            Transition::Complete => self.on_complete.len(),
            Transition::Abort => self.on_abort.len(),
        }
    }

    pub(crate) fn push(&mut self, transition: Transition, reaction: Reaction) {
        self.list_mut(transition).push(reaction);
    }

    /// Detach a list so it can run while the registry is mutably borrowed
    pub(crate) fn take(&mut self, transition: Transition) -> Vec<Reaction> {
        std::mem::take(self.list_mut(transition))
    }

    /// Reattach a list taken with [`Subscriptions::take`]; reactions added
    /// while it was detached keep their place after it
    pub(crate) fn restore(&mut self, transition: Transition, mut taken: Vec<Reaction>) {
        let list = self.list_mut(transition);
        taken.append(list);
        *list = taken;
    }
}

/// A typed, prioritized unit of intent
///
/// Goals live only inside the [`GoalRegistry`]; everything else refers to
/// them by [`GoalId`]. State changes go through the registry so that
/// subscriptions fire.
#[derive(Debug)]
pub struct Goal {
    pub(crate) id: GoalId,
    pub(crate) goal_type: GoalType,
    pub(crate) priority: i32,
    pub(crate) params: Vec<Param>,
    pub(crate) state: GoalState,
    pub(crate) timeout: Option<Tick>,
    pub(crate) parent: Option<GoalId>,
    pub(crate) delegated: bool,
    pub(crate) claimants: ClaimSet<ActorId>,
    pub(crate) subscriptions: Subscriptions,
}

impl Goal {
    pub(crate) fn new(id: GoalId, priority: i32, goal_type: GoalType) -> Self {
        Self {
            id,
            goal_type,
            priority,
            params: Vec::new(),
            state: GoalState::Idle,
            timeout: None,
            parent: None,
            delegated: false,
            claimants: ClaimSet::new(),
            subscriptions: Subscriptions::default(),
        }
    }

    pub fn id(&self) -> GoalId {
        self.id
    }

    pub fn goal_type(&self) -> GoalType {
        self.goal_type
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn state(&self) -> GoalState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn is_executing(&self) -> bool {
        self.state == GoalState::Executing
    }

    pub fn is_suspended(&self) -> bool {
        self.state == GoalState::Suspended
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn push_param(&mut self, param: Param) {
        self.params.push(param);
    }

    /// Point parameter at `index`, if present and of that type
    pub fn point(&self, index: usize) -> Option<Position> {
        match self.params.get(index) {
            Some(Param::Point(p)) => Some(*p),
            _ => None,
        }
    }

    /// Actor parameter at `index`, if present and of that type
    pub fn actor(&self, index: usize) -> Option<ActorId> {
        match self.params.get(index) {
            Some(Param::Actor(a)) => Some(*a),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Option<Tick> {
        self.timeout
    }

    /// Absolute tick after which the goal is forcibly removed
    pub fn set_timeout(&mut self, tick: Option<Tick>) {
        self.timeout = tick;
    }

    pub fn is_expired(&self, now: Tick) -> bool {
        self.timeout.is_some_and(|t| now >= t)
    }

    pub fn parent(&self) -> Option<GoalId> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<GoalId>) {
        self.parent = parent;
    }

    /// Set after the first delegation attempt until the subordinate finishes
    pub fn is_delegated(&self) -> bool {
        self.delegated
    }

    pub fn set_delegated(&mut self, delegated: bool) {
        self.delegated = delegated;
    }

    /// Actors currently acting on this goal
    pub fn claimants(&self) -> &ClaimSet<ActorId> {
        &self.claimants
    }

    pub fn claimants_mut(&mut self) -> &mut ClaimSet<ActorId> {
        &mut self.claimants
    }

    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// Append a reaction to the list for `transition`
    pub fn subscribe(&mut self, transition: Transition, reaction: Reaction) {
        self.subscriptions.push(transition, reaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_new_goal_is_idle() {
        let goal = Goal::new(GoalId(1), 5, GoalType::Move);
        assert_eq!(goal.state(), GoalState::Idle);
        assert!(!goal.is_finished());
        assert_eq!(goal.parent(), None);
        assert!(goal.claimants().is_empty());
    }

    #[test]
    fn test_typed_param_access() {
        let mut goal = Goal::new(GoalId(1), 0, GoalType::AttackUnit);
        goal.push_param(Param::Actor(ActorId(9)));
        goal.push_param(Param::Point(Vec3::ONE));

        assert_eq!(goal.actor(0), Some(ActorId(9)));
        assert_eq!(goal.point(0), None);
        assert_eq!(goal.point(1), Some(Vec3::ONE));
        assert_eq!(goal.point(2), None);
    }

    #[test]
    fn test_expiry() {
        let mut goal = Goal::new(GoalId(1), 0, GoalType::DefendArea);
        assert!(!goal.is_expired(u64::MAX));
        goal.set_timeout(Some(100));
        assert!(!goal.is_expired(99));
        assert!(goal.is_expired(100));
    }

    #[test]
    fn test_restore_keeps_order() {
        let mut subs = Subscriptions::default();
        subs.push(Transition::Complete, Reaction::Complete(GoalId(1)));
        let taken = subs.take(Transition::Complete);
        subs.push(Transition::Complete, Reaction::Abort(GoalId(2)));
        subs.restore(Transition::Complete, taken);

        let list = subs.take(Transition::Complete);
        assert!(matches!(list[0], Reaction::Complete(GoalId(1))));
        assert!(matches!(list[1], Reaction::Abort(GoalId(2))));
    }
}
