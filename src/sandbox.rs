//! In-memory host
//!
//! A flat, obstacle-free skirmish: units move in straight lines, builds and
//! production finish instantly on arrival or after a fixed delay, and armed
//! units chip away at whatever hostile unit is in range. Drives the headless
//! runner and the integration tests.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::types::{distance_2d, ActorId, Position, Tick};
use crate::host::{Allegiance, Command, Feature, Host, Order, UnitInfo};

/// Host notification produced by [`Sandbox::step`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SandboxEvent {
    Created(ActorId),
    Finished(ActorId),
    Idle(ActorId),
    Damaged {
        victim: ActorId,
        attacker: ActorId,
        damage: f32,
    },
    Destroyed {
        unit: ActorId,
        attacker: Option<ActorId>,
    },
    EnemyDestroyed {
        enemy: ActorId,
        attacker: ActorId,
    },
}

#[derive(Debug, Clone)]
enum Task {
    None,
    MoveTo(Position),
    Build { def: String, pos: Position },
    Produce { def: String, ready_at: Tick },
    Attack(ActorId),
}

#[derive(Debug, Clone)]
struct SandboxUnit {
    info: UnitInfo,
    task: Task,
    /// Damage dealt per tick to a hostile in range; 0 = unarmed
    weapon: f32,
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    tick: Tick,
    next_id: u32,
    units: BTreeMap<ActorId, SandboxUnit>,
    features: Vec<Feature>,
    orders: Vec<Order>,
    unreachable: Vec<Position>,
    height: f32,
    /// World units per tick
    pub speed: f32,
    pub weapon_range: f32,
    pub produce_ticks: Tick,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            tick: 0,
            next_id: 0,
            units: BTreeMap::new(),
            features: Vec::new(),
            orders: Vec::new(),
            unreachable: Vec::new(),
            height: 0.0,
            speed: 4.0,
            weapon_range: 60.0,
            produce_ticks: 90,
        }
    }

    /// Add a finished unit with 100 health
    pub fn spawn(&mut self, side: Allegiance, def: &str, pos: Position) -> ActorId {
        self.spawn_with(side, def, pos, 100.0, true)
    }

    pub fn spawn_with(
        &mut self,
        side: Allegiance,
        def: &str,
        pos: Position,
        health: f32,
        finished: bool,
    ) -> ActorId {
        self.next_id += 1;
        let id = ActorId(self.next_id);
        let info = UnitInfo {
            id,
            def: def.to_string(),
            side,
            pos,
            health,
            max_health: health,
            finished,
        };
        self.units.insert(
            id,
            SandboxUnit {
                info,
                task: Task::None,
                weapon: 0.0,
            },
        );
        id
    }

    /// Give a unit a weapon dealing `damage` per tick
    pub fn arm(&mut self, id: ActorId, damage: f32) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.weapon = damage;
        }
    }

    pub fn finish(&mut self, id: ActorId) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.info.finished = true;
        }
    }

    pub fn add_feature(&mut self, name: &str, pos: Position) -> u32 {
        let id = self.features.len() as u32 + 1;
        self.features.push(Feature {
            id,
            name: name.to_string(),
            pos,
        });
        id
    }

    pub fn kill(&mut self, id: ActorId) -> Option<UnitInfo> {
        self.units.remove(&id).map(|u| u.info)
    }

    pub fn set_position(&mut self, id: ActorId, pos: Position) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.info.pos = pos;
        }
    }

    pub fn set_health(&mut self, id: ActorId, health: f32) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.info.health = health;
        }
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
    }

    /// Make every point within 1 unit of `pos` unreachable
    pub fn block_path_to(&mut self, pos: Position) {
        self.unreachable.push(pos);
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn take_orders(&mut self) -> Vec<Order> {
        std::mem::take(&mut self.orders)
    }

    pub fn orders_for(&self, actor: ActorId) -> Vec<&Command> {
        self.orders
            .iter()
            .filter(|o| o.actor == actor)
            .map(|o| &o.command)
            .collect()
    }

    /// Advance one tick and report what happened
    pub fn step(&mut self) -> Vec<SandboxEvent> {
        self.tick += 1;
        let mut events = Vec::new();
        let mut spawns: Vec<(String, Position)> = Vec::new();
        let ids: Vec<ActorId> = self.units.keys().copied().collect();

        for id in &ids {
            let Some(unit) = self.units.get(id) else {
                continue;
            };
            let pos = unit.info.pos;
            match unit.task.clone() {
                Task::None => {}
                Task::MoveTo(dest) => {
                    if self.advance_towards(*id, dest) {
                        self.set_task(*id, Task::None);
                        events.push(SandboxEvent::Idle(*id));
                    }
                }
                Task::Build { def, pos: site } => {
                    if self.advance_towards(*id, site) {
                        spawns.push((def, site));
                        self.set_task(*id, Task::None);
                        events.push(SandboxEvent::Idle(*id));
                    }
                }
                Task::Produce { def, ready_at } => {
                    if self.tick >= ready_at {
                        spawns.push((def, pos + Position::new(48.0, 0.0, 48.0)));
                        self.set_task(*id, Task::None);
                        events.push(SandboxEvent::Idle(*id));
                    }
                }
                Task::Attack(target) => match self.units.get(&target).map(|t| t.info.pos) {
                    None => {
                        self.set_task(*id, Task::None);
                        events.push(SandboxEvent::Idle(*id));
                    }
                    Some(target_pos) => {
                        if distance_2d(pos, target_pos) > self.weapon_range {
                            self.advance_towards(*id, target_pos);
                        }
                    }
                },
            }
        }

        for (def, pos) in spawns {
            let id = self.spawn(Allegiance::Friendly, &def, pos);
            events.push(SandboxEvent::Created(id));
            events.push(SandboxEvent::Finished(id));
        }

        self.resolve_fire(&ids, &mut events);
        events
    }

    /// Armed units hit the closest hostile in range
    fn resolve_fire(&mut self, ids: &[ActorId], events: &mut Vec<SandboxEvent>) {
        let mut hits: Vec<(ActorId, ActorId, f32)> = Vec::new();
        for id in ids {
            let Some(shooter) = self.units.get(id) else {
                continue;
            };
            if shooter.weapon <= 0.0 {
                continue;
            }
            let hostile = match shooter.info.side {
                Allegiance::Friendly => Allegiance::Enemy,
                Allegiance::Enemy => Allegiance::Friendly,
                Allegiance::Neutral => continue,
            };
            let preferred = match shooter.task {
                Task::Attack(target) => Some(target),
                _ => None,
            };
            let in_range = self.units_in_radius(hostile, shooter.info.pos, self.weapon_range);
            let target = preferred
                .filter(|t| in_range.contains(t))
                .or_else(|| in_range.first().copied());
            if let Some(target) = target {
                hits.push((*id, target, shooter.weapon));
            }
        }

        for (attacker, victim, damage) in hits {
            let Some(unit) = self.units.get_mut(&victim) else {
                continue;
            };
            unit.info.health -= damage;
            let side = unit.info.side;
            let dead = unit.info.health <= 0.0;
            match side {
                Allegiance::Friendly => {
                    events.push(SandboxEvent::Damaged {
                        victim,
                        attacker,
                        damage,
                    });
                    if dead {
                        self.units.remove(&victim);
                        events.push(SandboxEvent::Destroyed {
                            unit: victim,
                            attacker: Some(attacker),
                        });
                    }
                }
                _ => {
                    if dead {
                        self.units.remove(&victim);
                        events.push(SandboxEvent::EnemyDestroyed {
                            enemy: victim,
                            attacker,
                        });
                    }
                }
            }
        }
    }

    fn set_task(&mut self, id: ActorId, task: Task) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.task = task;
        }
    }

    /// Move one step towards `dest`; true once arrived
    fn advance_towards(&mut self, id: ActorId, dest: Position) -> bool {
        let speed = self.speed;
        let Some(unit) = self.units.get_mut(&id) else {
            return false;
        };
        let mut delta = dest - unit.info.pos;
        delta.y = 0.0;
        let dist = delta.length();
        if dist <= speed {
            unit.info.pos = Position::new(dest.x, unit.info.pos.y, dest.z);
            true
        } else {
            unit.info.pos += delta / dist * speed;
            false
        }
    }
}

impl Host for Sandbox {
    fn current_tick(&self) -> Tick {
        self.tick
    }

    fn units(&self, side: Allegiance) -> Vec<ActorId> {
        self.units
            .values()
            .filter(|u| u.info.side == side)
            .map(|u| u.info.id)
            .collect()
    }

    fn units_in_radius(&self, side: Allegiance, center: Position, radius: f32) -> Vec<ActorId> {
        self.units
            .values()
            .filter(|u| u.info.side == side && distance_2d(u.info.pos, center) <= radius)
            .map(|u| u.info.id)
            .collect()
    }

    fn unit(&self, id: ActorId) -> Option<UnitInfo> {
        self.units.get(&id).map(|u| u.info.clone())
    }

    fn features(&self) -> Vec<Feature> {
        self.features.clone()
    }

    fn path_length(&self, from: Position, to: Position, _profile: &str) -> Option<f32> {
        if self.unreachable.iter().any(|p| distance_2d(*p, to) < 1.0) {
            return None;
        }
        Some(distance_2d(from, to))
    }

    fn ground_height(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }

    fn give_order(&mut self, actor: ActorId, command: Command) -> bool {
        let tick = self.tick;
        let produce_at = tick + self.produce_ticks;
        let Some(unit) = self.units.get_mut(&actor) else {
            return false;
        };
        if unit.info.side != Allegiance::Friendly || !unit.info.finished {
            return false;
        }

        unit.task = match &command {
            Command::Build { def, pos } => Task::Build {
                def: def.clone(),
                pos: *pos,
            },
            Command::Produce { def } => Task::Produce {
                def: def.clone(),
                ready_at: produce_at,
            },
            Command::Move(pos) | Command::Fight(pos) => Task::MoveTo(*pos),
            Command::Attack(target) => Task::Attack(*target),
            Command::Stop => Task::None,
        };
        self.orders.push(Order::new(actor, command, tick));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_move_reports_idle_on_arrival() {
        let mut sb = Sandbox::new();
        let id = sb.spawn(Allegiance::Friendly, "bit", Vec3::ZERO);
        assert!(sb.give_order(id, Command::Move(Vec3::new(8.0, 0.0, 0.0))));

        assert!(sb.step().is_empty());
        assert_eq!(sb.step(), vec![SandboxEvent::Idle(id)]);
        assert_eq!(sb.unit(id).unwrap().pos.x, 8.0);
    }

    #[test]
    fn test_build_spawns_structure() {
        let mut sb = Sandbox::new();
        let id = sb.spawn(Allegiance::Friendly, "assembler", Vec3::ZERO);
        sb.give_order(
            id,
            Command::Build {
                def: "socket".into(),
                pos: Vec3::new(2.0, 0.0, 0.0),
            },
        );

        let events = sb.step();
        assert!(events.contains(&SandboxEvent::Idle(id)));
        assert_eq!(sb.units(Allegiance::Friendly).len(), 2);
    }

    #[test]
    fn test_orders_to_enemies_rejected() {
        let mut sb = Sandbox::new();
        let id = sb.spawn(Allegiance::Enemy, "bit", Vec3::ZERO);
        assert!(!sb.give_order(id, Command::Stop));
        assert!(sb.orders().is_empty());
    }

    #[test]
    fn test_blocked_path() {
        let mut sb = Sandbox::new();
        let site = Vec3::new(100.0, 0.0, 0.0);
        sb.block_path_to(site);
        assert_eq!(sb.path_length(Vec3::ZERO, site, "builder"), None);
        assert_eq!(sb.path_length(Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0), "builder"), Some(5.0));
    }

    #[test]
    fn test_armed_enemy_damages_and_destroys() {
        let mut sb = Sandbox::new();
        let victim = sb.spawn_with(Allegiance::Friendly, "kernel", Vec3::ZERO, 15.0, true);
        let enemy = sb.spawn(Allegiance::Enemy, "bit", Vec3::new(10.0, 0.0, 0.0));
        sb.arm(enemy, 10.0);

        let events = sb.step();
        assert!(events.contains(&SandboxEvent::Damaged {
            victim,
            attacker: enemy,
            damage: 10.0
        }));
        let events = sb.step();
        assert!(events.contains(&SandboxEvent::Destroyed {
            unit: victim,
            attacker: Some(enemy)
        }));
        assert!(sb.unit(victim).is_none());
    }
}
