//! Spatial influence field
//!
//! Friendly units push the field up and enemy units push it down, each
//! contributing a per-definition peak that falls off linearly to its
//! radius. Negative areas are enemy-held; the strategic tier looks for local
//! minima to pick where to attack.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{Position, Tick};
use crate::host::{Allegiance, Host};

/// Spatial influence collaborator
///
/// Implementations recompute at most once per tick, and repeated queries
/// within one tick return identical results.
pub trait InfluenceField {
    /// Recompute from the host's unit roster unless already done this tick
    fn refresh(&mut self, host: &dyn Host, tick: Tick);

    /// Signed influence at `point`; positive is friendly
    fn value_at(&self, point: Position) -> i32;

    /// Cells whose value is negative and lowest within `radius`
    fn local_minima(&mut self, radius: f32) -> Vec<(i32, Position)>;
}

/// Influence contribution of one unit definition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitWeight {
    pub max: i32,
    #[serde(default)]
    pub min: i32,
    pub radius: i32,
}

impl UnitWeight {
    fn at_distance(&self, dist: f32) -> f32 {
        if self.radius <= 0 || dist > self.radius as f32 {
            return 0.0;
        }
        let falloff = 1.0 - dist / self.radius as f32;
        self.min as f32 + (self.max - self.min) as f32 * falloff
    }
}

/// Per-definition weights, keyed by unit definition name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitWeights(pub BTreeMap<String, UnitWeight>);

impl Default for UnitWeights {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        let mut put = |names: &[&str], max: i32, radius: i32| {
            for name in names {
                map.insert(name.to_string(), UnitWeight { max, min: 0, radius });
            }
        };
        // home bases
        put(&["kernel", "hole", "carrier"], 100, 1024);
        // support structures
        put(
            &["socket", "terminal", "window", "obelisk", "port", "firewall"],
            75,
            768,
        );
        // spam
        put(&["bit", "bug", "exploit", "packet"], 5, 256);
        // heavy
        put(&["byte", "worm", "connection"], 40, 384);
        // artillery
        put(&["pointer", "dos", "flow"], 20, 512);
        Self(map)
    }
}

impl UnitWeights {
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn get(&self, def: &str) -> Option<&UnitWeight> {
        self.0.get(def)
    }
}

/// Grid-backed [`InfluenceField`]
#[derive(Debug, Clone)]
pub struct InfluenceMap {
    weights: UnitWeights,
    cell_size: f32,
    width: usize,
    depth: usize,
    cells: Vec<i32>,
    computed_at: Option<Tick>,
    minima_cache: AHashMap<OrderedFloat<f32>, Vec<(i32, Position)>>,
    recomputes: usize,
}

impl InfluenceMap {
    /// Grid covering `map_width` x `map_depth` world units
    pub fn new(map_width: f32, map_depth: f32, cell_size: f32, weights: UnitWeights) -> Self {
        let cell_size = cell_size.max(1.0);
        let width = (map_width / cell_size).ceil().max(1.0) as usize;
        let depth = (map_depth / cell_size).ceil().max(1.0) as usize;
        Self {
            weights,
            cell_size,
            width,
            depth,
            cells: vec![0; width * depth],
            computed_at: None,
            minima_cache: AHashMap::new(),
            recomputes: 0,
        }
    }

    /// Number of full recomputations so far
    pub fn recomputes(&self) -> usize {
        self.recomputes
    }

    fn cell_center(&self, cx: usize, cz: usize) -> Position {
        Position::new(
            (cx as f32 + 0.5) * self.cell_size,
            0.0,
            (cz as f32 + 0.5) * self.cell_size,
        )
    }

    fn cell_of(&self, point: Position) -> Option<(usize, usize)> {
        if point.x < 0.0 || point.z < 0.0 {
            return None;
        }
        let cx = (point.x / self.cell_size) as usize;
        let cz = (point.z / self.cell_size) as usize;
        (cx < self.width && cz < self.depth).then_some((cx, cz))
    }

    fn stamp(&mut self, pos: Position, weight: UnitWeight, sign: f32) {
        let reach = (weight.radius as f32 / self.cell_size).ceil() as i64;
        let (ux, uz) = (
            (pos.x / self.cell_size) as i64,
            (pos.z / self.cell_size) as i64,
        );
        for cz in (uz - reach).max(0)..=(uz + reach).min(self.depth as i64 - 1) {
            for cx in (ux - reach).max(0)..=(ux + reach).min(self.width as i64 - 1) {
                let center = self.cell_center(cx as usize, cz as usize);
                let dist = crate::core::types::distance_2d(center, pos);
                let value = weight.at_distance(dist);
                if value != 0.0 {
                    self.cells[cz as usize * self.width + cx as usize] +=
                        (sign * value).round() as i32;
                }
            }
        }
    }
}

impl InfluenceField for InfluenceMap {
    fn refresh(&mut self, host: &dyn Host, tick: Tick) {
        if self.computed_at == Some(tick) {
            return;
        }
        self.computed_at = Some(tick);
        self.minima_cache.clear();
        self.cells.iter_mut().for_each(|c| *c = 0);
        self.recomputes += 1;

        for (side, sign) in [(Allegiance::Friendly, 1.0), (Allegiance::Enemy, -1.0)] {
            for id in host.units(side) {
                let Some(info) = host.unit(id) else {
                    continue;
                };
                let Some(weight) = self.weights.get(&info.def).copied() else {
                    continue;
                };
                self.stamp(info.pos, weight, sign);
            }
        }
        tracing::debug!(tick, recomputes = self.recomputes, "influence map refreshed");
    }

    fn value_at(&self, point: Position) -> i32 {
        self.cell_of(point)
            .map(|(cx, cz)| self.cells[cz * self.width + cx])
            .unwrap_or(0)
    }

    fn local_minima(&mut self, radius: f32) -> Vec<(i32, Position)> {
        let key = OrderedFloat(radius);
        if let Some(cached) = self.minima_cache.get(&key) {
            return cached.clone();
        }

        let reach = (radius / self.cell_size).ceil().max(1.0) as i64;
        let mut minima = Vec::new();
        for cz in 0..self.depth {
            for cx in 0..self.width {
                let value = self.cells[cz * self.width + cx];
                if value >= 0 {
                    continue;
                }
                let index = cz * self.width + cx;
                let mut lowest = true;
                'scan: for nz in (cz as i64 - reach).max(0)..=(cz as i64 + reach).min(self.depth as i64 - 1) {
                    for nx in (cx as i64 - reach).max(0)..=(cx as i64 + reach).min(self.width as i64 - 1) {
                        let other = nz as usize * self.width + nx as usize;
                        let v = self.cells[other];
                        // plateaus: only the first cell in scan order counts
                        if v < value || (v == value && other < index) {
                            lowest = false;
                            break 'scan;
                        }
                    }
                }
                if lowest {
                    minima.push((value, self.cell_center(cx, cz)));
                }
            }
        }

        self.minima_cache.insert(key, minima.clone());
        minima
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::Sandbox;
    use glam::Vec3;

    fn map() -> InfluenceMap {
        InfluenceMap::new(2048.0, 2048.0, 64.0, UnitWeights::default())
    }

    #[test]
    fn test_friendly_positive_enemy_negative() {
        let mut sb = Sandbox::new();
        sb.spawn(Allegiance::Friendly, "kernel", Vec3::new(100.0, 0.0, 100.0));
        sb.spawn(Allegiance::Enemy, "kernel", Vec3::new(1900.0, 0.0, 1900.0));
        let mut field = map();
        field.refresh(&sb, 1);

        assert!(field.value_at(Vec3::new(100.0, 0.0, 100.0)) > 90);
        assert!(field.value_at(Vec3::new(1900.0, 0.0, 1900.0)) < -90);
        assert_eq!(field.value_at(Vec3::new(-5.0, 0.0, 0.0)), 0);
    }

    #[test]
    fn test_refresh_once_per_tick() {
        let mut sb = Sandbox::new();
        sb.spawn(Allegiance::Enemy, "bit", Vec3::new(500.0, 0.0, 500.0));
        let mut field = map();

        field.refresh(&sb, 7);
        let before = field.value_at(Vec3::new(500.0, 0.0, 500.0));
        sb.spawn(Allegiance::Enemy, "worm", Vec3::new(500.0, 0.0, 500.0));
        field.refresh(&sb, 7);

        assert_eq!(field.recomputes(), 1);
        assert_eq!(field.value_at(Vec3::new(500.0, 0.0, 500.0)), before);

        field.refresh(&sb, 8);
        assert_eq!(field.recomputes(), 2);
        assert!(field.value_at(Vec3::new(500.0, 0.0, 500.0)) < before);
    }

    #[test]
    fn test_local_minima_stable_within_tick() {
        let mut sb = Sandbox::new();
        sb.spawn(Allegiance::Enemy, "kernel", Vec3::new(1500.0, 0.0, 1500.0));
        let mut field = map();
        field.refresh(&sb, 3);

        let first = field.local_minima(512.0);
        let second = field.local_minima(512.0);
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        let (value, point) = first[0];
        assert!(value < 0);
        assert!(crate::core::types::distance_2d(point, Vec3::new(1500.0, 0.0, 1500.0)) < 64.0);
    }

    #[test]
    fn test_weights_json() {
        let json = r#"{ "kernel": { "max": 5, "min": 0, "radius": 10 } }"#;
        let weights = UnitWeights::from_json(json).unwrap();
        assert_eq!(weights.get("kernel").unwrap().max, 5);
        assert!(weights.get("bit").is_none());

        let defaults = UnitWeights::default();
        assert_eq!(defaults.get("carrier").unwrap().radius, 1024);
        assert_eq!(defaults.get("dos").unwrap().max, 20);
    }
}
