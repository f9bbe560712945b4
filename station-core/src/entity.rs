use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::layer;
use crate::math::{Aabb, Vec2};

/// Stable identifier for an entity.
///
/// The simulation core never holds references into the host's entity storage;
/// everything is addressed through this handle. Deterministic ticking relies
/// on its `Ord` for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId(u64);

impl EntityId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Numeric form, for logs and seeds only.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntityKind {
    Player,
    Enemy,
    Wall,
    Item,
    Other,
}

/// Read-only view of one entity, captured from the host registry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub size: Vec2,
    pub layer: u32,
    pub active: bool,
    pub kind: EntityKind,
}

impl EntitySnapshot {
    pub fn new(id: EntityId, kind: EntityKind, position: Vec2, size: Vec2) -> Self {
        Self {
            id,
            position,
            size,
            layer: layer::layer_for_kind(kind),
            active: true,
            kind,
        }
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.size)
    }
}

/// The host boundary for entity state.
///
/// The core reads snapshots and mutates entities only through `set_position`
/// and `apply_damage`; everything else the host keeps to itself.
pub trait EntityRegistry {
    fn snapshot(&self, id: EntityId) -> Option<EntitySnapshot>;

    fn for_each_active(&self, f: &mut dyn FnMut(&EntitySnapshot));

    fn set_position(&mut self, id: EntityId, position: Vec2);

    fn apply_damage(&mut self, id: EntityId, amount: f32);

    /// Remaining health in `[0, 1]`. Hosts without a health model may keep the
    /// default, which reports full health for everything.
    fn health_fraction(&self, id: EntityId) -> f32 {
        let _ = id;
        1.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    snapshot: EntitySnapshot,
    health: f32,
    max_health: f32,
}

/// Reference in-memory registry.
///
/// Iteration is in handle order, which keeps every consumer deterministic.
#[derive(Debug, Default)]
pub struct WorldState {
    entities: BTreeMap<EntityId, Entry>,
}

impl WorldState {
    pub const DEFAULT_HEALTH: f32 = 100.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, snapshot: EntitySnapshot) {
        self.insert_with_health(snapshot, Self::DEFAULT_HEALTH);
    }

    pub fn insert_with_health(&mut self, snapshot: EntitySnapshot, max_health: f32) {
        let max_health = max_health.max(0.0);
        self.entities.insert(
            snapshot.id,
            Entry {
                snapshot,
                health: max_health,
                max_health,
            },
        );
    }

    pub fn remove(&mut self, id: EntityId) {
        self.entities.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) {
        if let Some(entry) = self.entities.get_mut(&id) {
            entry.snapshot.active = active;
        }
    }

    pub fn set_health(&mut self, id: EntityId, health: f32) {
        if let Some(entry) = self.entities.get_mut(&id) {
            entry.health = health.clamp(0.0, entry.max_health);
        }
    }

    pub fn health(&self, id: EntityId) -> Option<f32> {
        self.entities.get(&id).map(|e| e.health)
    }
}

impl EntityRegistry for WorldState {
    fn snapshot(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.entities.get(&id).map(|e| e.snapshot)
    }

    fn for_each_active(&self, f: &mut dyn FnMut(&EntitySnapshot)) {
        for entry in self.entities.values() {
            if entry.snapshot.active {
                f(&entry.snapshot);
            }
        }
    }

    fn set_position(&mut self, id: EntityId, position: Vec2) {
        if let Some(entry) = self.entities.get_mut(&id) {
            entry.snapshot.position = position;
        }
    }

    fn apply_damage(&mut self, id: EntityId, amount: f32) {
        if let Some(entry) = self.entities.get_mut(&id) {
            entry.health = (entry.health - amount.max(0.0)).max(0.0);
            if entry.health <= 0.0 {
                entry.snapshot.active = false;
            }
        }
    }

    fn health_fraction(&self, id: EntityId) -> f32 {
        match self.entities.get(&id) {
            Some(entry) if entry.max_health > 0.0 => entry.health / entry.max_health,
            _ => 1.0,
        }
    }
}
