//! Goal scheduling core: registry, lifecycle and processor contract

pub mod claims;
pub mod delegate;
pub mod processor;
pub mod record;
pub mod registry;
pub mod types;

pub use claims::ClaimSet;
pub use delegate::{delegate, ClaimPolicy};
pub use processor::{GoalProcessor, RegistryContext, SweepContext, Verdict};
pub use record::{Goal, GoalCallback, Reaction, Subscriptions};
pub use registry::GoalRegistry;
pub use types::{GoalId, GoalState, GoalType, Param, Transition};
