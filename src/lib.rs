//! Skirmish AI - hierarchical goal scheduler for a real-time strategy agent

pub mod ai;
pub mod core;
pub mod goal;
pub mod host;
pub mod influence;
pub mod sandbox;
