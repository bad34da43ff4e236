//! Core type definitions used throughout the codebase

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Host simulation frame counter (30 per second of game time)
pub type Tick = u64;

/// World-space position: x/z on the map plane, y is terrain height
pub type Position = Vec3;

/// Identifier of a simulated actor (unit or structure) as assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Squared distance on the map plane, ignoring height
pub fn sq_distance_2d(a: Position, b: Position) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

/// Distance on the map plane, ignoring height
pub fn distance_2d(a: Position, b: Position) -> f32 {
    sq_distance_2d(a, b).sqrt()
}
