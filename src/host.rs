//! Host engine surface
//!
//! Everything the scheduler learns about the world, and every command it
//! gives, goes through [`Host`]. Queries return immediately; a missing
//! unit is reported as `None` and treated as "already gone".

use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, Position, Tick};

/// Which side a unit belongs to, from the agent's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Allegiance {
    Friendly,
    Enemy,
    Neutral,
}

/// Snapshot of one unit as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub id: ActorId,
    /// Unit definition name
    pub def: String,
    pub side: Allegiance,
    pub pos: Position,
    pub health: f32,
    pub max_health: f32,
    /// False while still under construction
    pub finished: bool,
}

/// Map feature (resource sites are features)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: u32,
    pub name: String,
    pub pos: Position,
}

/// Concrete order for one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Place a structure of `def` at `pos`
    Build { def: String, pos: Position },
    /// Queue production of one `def` at a factory
    Produce { def: String },
    Move(Position),
    /// Attack-move: engage anything met on the way
    Fight(Position),
    Attack(ActorId),
    Stop,
}

/// A command as it was handed to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub actor: ActorId,
    pub command: Command,
    pub issued_at: Tick,
}

impl Order {
    pub fn new(actor: ActorId, command: Command, tick: Tick) -> Self {
        Self {
            actor,
            command,
            issued_at: tick,
        }
    }
}

/// Engine/world query and command surface
pub trait Host {
    fn current_tick(&self) -> Tick;

    /// Every unit on `side` the agent can see
    fn units(&self, side: Allegiance) -> Vec<ActorId>;

    /// Units on `side` within `radius` (2D) of `center`
    fn units_in_radius(&self, side: Allegiance, center: Position, radius: f32) -> Vec<ActorId>;

    fn unit(&self, id: ActorId) -> Option<UnitInfo>;

    fn features(&self) -> Vec<Feature>;

    /// Estimated travel distance for a movement profile, or None if there
    /// is no path
    fn path_length(&self, from: Position, to: Position, profile: &str) -> Option<f32>;

    fn ground_height(&self, x: f32, z: f32) -> f32;

    /// Returns false if the host rejected the command
    fn give_order(&mut self, actor: ActorId, command: Command) -> bool;
}
