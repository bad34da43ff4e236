//! Parent/child delegation wiring
//!
//! A tier hands work down by creating a subordinate goal and linking the
//! two lifecycles. The link is always the same four subscriptions; only the
//! child's terminal reactions depend on how the parent is claimed.

use crate::core::types::ActorId;
use crate::goal::record::Reaction;
use crate::goal::registry::GoalRegistry;
use crate::goal::types::{GoalId, GoalType, Param, Transition};

/// How a finished child feeds back into its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimPolicy {
    /// One child per parent. The child's completion completes the parent and
    /// its abort aborts the parent, re-arming delegation either way.
    Exclusive,
    /// One child per participating actor. Each finished child releases its
    /// actor and the parent completes once no claimant is left.
    Shared { actor: ActorId },
}

/// Create a child goal under `parent` and wire the lifecycles together
///
/// Returns None if the parent is gone or already finished.
pub fn delegate(
    registry: &mut GoalRegistry,
    parent: GoalId,
    child_type: GoalType,
    priority: i32,
    params: Vec<Param>,
    policy: ClaimPolicy,
) -> Option<GoalId> {
    if !registry.is_pending(parent) {
        return None;
    }

    let child = registry.create_with(priority, child_type, params);
    if let Some(goal) = registry.get_mut(child) {
        goal.set_parent(Some(parent));
    }

    // parent -> child
    registry.subscribe(parent, Transition::Abort, Reaction::Abort(child));
    registry.subscribe(parent, Transition::Complete, Reaction::Complete(child));

    // child -> parent
    registry.subscribe(child, Transition::Start, Reaction::Start(parent));
    match policy {
        ClaimPolicy::Exclusive => {
            if let Some(goal) = registry.get_mut(parent) {
                goal.set_delegated(true);
            }
            registry.subscribe(child, Transition::Complete, Reaction::ClearDelegation(parent));
            registry.subscribe(child, Transition::Complete, Reaction::Complete(parent));
            registry.subscribe(child, Transition::Abort, Reaction::ClearDelegation(parent));
            registry.subscribe(child, Transition::Abort, Reaction::Abort(parent));
        }
        ClaimPolicy::Shared { actor } => {
            if let Some(goal) = registry.get_mut(parent) {
                goal.claimants_mut().claim(actor);
            }
            for transition in [Transition::Complete, Transition::Abort] {
                registry.subscribe(child, transition, Reaction::Release { goal: parent, actor });
                registry.subscribe(child, transition, Reaction::CompleteWhenUnclaimed(parent));
            }
        }
    }

    tracing::debug!(%parent, %child, ?child_type, ?policy, "delegated goal");
    Some(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::types::GoalState;
    use glam::Vec3;

    #[test]
    fn test_child_start_starts_parent() {
        let mut registry = GoalRegistry::new();
        let parent = registry.create(1, GoalType::BuildExpansion);
        let child = delegate(
            &mut registry,
            parent,
            GoalType::BuildExpansion,
            1,
            vec![Param::Point(Vec3::ZERO)],
            ClaimPolicy::Exclusive,
        )
        .unwrap();

        assert_eq!(registry.get(child).unwrap().parent(), Some(parent));
        assert!(registry.get(parent).unwrap().is_delegated());
        registry.start(child);
        assert_eq!(registry.state_of(parent), Some(GoalState::Executing));
    }

    #[test]
    fn test_exclusive_completion_propagates_up() {
        let mut registry = GoalRegistry::new();
        let parent = registry.create(1, GoalType::BuildProducer);
        let child = delegate(
            &mut registry,
            parent,
            GoalType::BuildProducer,
            1,
            vec![],
            ClaimPolicy::Exclusive,
        )
        .unwrap();

        registry.start(child);
        registry.complete(child);
        assert_eq!(registry.state_of(parent), Some(GoalState::Completed));
        assert!(!registry.get(parent).unwrap().is_delegated());
    }

    #[test]
    fn test_exclusive_abort_propagates_up() {
        let mut registry = GoalRegistry::new();
        let parent = registry.create(1, GoalType::BuildProducer);
        let child = delegate(
            &mut registry,
            parent,
            GoalType::BuildProducer,
            1,
            vec![],
            ClaimPolicy::Exclusive,
        )
        .unwrap();

        registry.remove(child);
        assert_eq!(registry.state_of(parent), Some(GoalState::Aborted));
    }

    #[test]
    fn test_parent_abort_propagates_down() {
        let mut registry = GoalRegistry::new();
        let parent = registry.create(1, GoalType::Retreat);
        let a = delegate(
            &mut registry,
            parent,
            GoalType::Retreat,
            1,
            vec![],
            ClaimPolicy::Shared { actor: ActorId(1) },
        )
        .unwrap();
        let b = delegate(
            &mut registry,
            parent,
            GoalType::Retreat,
            1,
            vec![],
            ClaimPolicy::Shared { actor: ActorId(2) },
        )
        .unwrap();

        registry.abort(parent);
        assert_eq!(registry.state_of(a), Some(GoalState::Aborted));
        assert_eq!(registry.state_of(b), Some(GoalState::Aborted));
    }

    #[test]
    fn test_shared_parent_completes_after_last_claimant() {
        let mut registry = GoalRegistry::new();
        let parent = registry.create(1, GoalType::Retreat);
        let children: Vec<GoalId> = (1..=3)
            .map(|n| {
                delegate(
                    &mut registry,
                    parent,
                    GoalType::Retreat,
                    1,
                    vec![],
                    ClaimPolicy::Shared { actor: ActorId(n) },
                )
                .unwrap()
            })
            .collect();
        assert_eq!(registry.get(parent).unwrap().claimants().len(), 3);

        for child in &children {
            registry.start(*child);
        }
        registry.complete(children[0]);
        registry.abort(children[1]);
        assert_eq!(registry.state_of(parent), Some(GoalState::Executing));

        registry.complete(children[2]);
        assert_eq!(registry.state_of(parent), Some(GoalState::Completed));
    }

    #[test]
    fn test_delegate_to_finished_parent_refused() {
        let mut registry = GoalRegistry::new();
        let parent = registry.create(1, GoalType::Move);
        registry.abort(parent);
        let child = delegate(
            &mut registry,
            parent,
            GoalType::Move,
            1,
            vec![],
            ClaimPolicy::Exclusive,
        );
        assert!(child.is_none());
        assert_eq!(registry.len(), 1);
    }
}
