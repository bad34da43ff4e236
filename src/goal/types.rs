//! Goal identity, kind, lifecycle state and parameters

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, Position};

/// Process-wide goal identity, assigned monotonically by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoalId(pub u64);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goal#{}", self.0)
    }
}

/// Kind of intent; decides which tier accepts the goal and its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalType {
    /// params: `[Actor(target)]`
    AttackUnit,
    /// Attack-move; params: `[Point(destination)]`
    AttackArea,
    /// params: `[Point(area)]`
    DefendArea,
    /// Produce one constructor from a base; no params
    BuildProducer,
    /// params: `[Point(resource site)]`
    BuildExpansion,
    /// params: `[Point(destination)]`
    Move,
    /// params: `[Point(destination)]`
    Retreat,
}

impl GoalType {
    /// Production orders: one actor per goal, actor flagged as producing
    pub fn is_build(&self) -> bool {
        matches!(self, GoalType::BuildProducer | GoalType::BuildExpansion)
    }

    /// Group-wide orders: every free member of the group takes part
    pub fn is_group_order(&self) -> bool {
        matches!(
            self,
            GoalType::AttackUnit
                | GoalType::AttackArea
                | GoalType::DefendArea
                | GoalType::Move
                | GoalType::Retreat
        )
    }

    /// Whether parameter 0 must be a point
    pub fn needs_point(&self) -> bool {
        matches!(
            self,
            GoalType::AttackArea
                | GoalType::DefendArea
                | GoalType::BuildExpansion
                | GoalType::Move
                | GoalType::Retreat
        )
    }
}

/// Lifecycle transition requested on a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    Start,
    Suspend,
    Continue,
    Complete,
    Abort,
}

impl Transition {
    pub const ALL: [Transition; 5] = [
        Transition::Start,
        Transition::Suspend,
        Transition::Continue,
        Transition::Complete,
        Transition::Abort,
    ];

    pub fn verb(&self) -> &'static str {
        match self {
            Transition::Start => "starting",
            Transition::Suspend => "suspending",
            Transition::Continue => "continuing",
            Transition::Complete => "completing",
            Transition::Abort => "aborting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GoalState {
    #[default]
    Idle,
    Executing,
    Suspended,
    Completed,
    Aborted,
}

impl GoalState {
    /// Completed or Aborted; terminal
    pub fn is_finished(&self) -> bool {
        matches!(self, GoalState::Completed | GoalState::Aborted)
    }

    /// State reached by applying `transition`, or None if the transition is
    /// not part of the lifecycle graph from this state
    pub fn next(&self, transition: Transition) -> Option<GoalState> {
        use GoalState::*;
        match (self, transition) {
            (Completed | Aborted, _) => None,
            (Idle, Transition::Start) => Some(Executing),
            (Executing, Transition::Suspend) => Some(Suspended),
            (Suspended, Transition::Continue) => Some(Executing),
            (_, Transition::Complete) => Some(Completed),
            (_, Transition::Abort) => Some(Aborted),
            _ => None,
        }
    }
}

/// Typed goal parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Param {
    Actor(ActorId),
    Point(Position),
    Text(String),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Actor(id) => write!(f, "{id}"),
            Param::Point(p) => write!(f, "{} {} {}", p.x, p.y, p.z),
            Param::Text(s) => write!(f, "{s:?}"),
        }
    }
}
