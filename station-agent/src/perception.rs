use std::collections::BTreeMap;

use station_collision::CollisionWorld;
use station_core::{layer, EntityId, EntityRegistry, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MIN_DIRECTION_LENGTH: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PerceptionKind {
    Sight,
    Hearing,
    Proximity,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerceptionEvent {
    pub kind: PerceptionKind,
    pub source: Option<EntityId>,
    pub position: Vec2,
    /// Detection strength in `[0, 1]`, falling off linearly with distance.
    pub intensity: f32,
    pub timestamp: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PerceptionConfig {
    pub sight_range: f32,
    /// Full cone angle, degrees.
    pub sight_angle_deg: f32,
    pub hearing_range: f32,
    pub proximity_range: f32,
    pub memory_duration: f32,
    pub requires_los: bool,
    pub sight_layer_mask: u32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            sight_range: 200.0,
            sight_angle_deg: 65.0,
            hearing_range: 150.0,
            proximity_range: 32.0,
            memory_duration: 10.0,
            requires_los: true,
            sight_layer_mask: layer::ALL,
        }
    }
}

impl PerceptionConfig {
    pub fn sanitized(mut self) -> Self {
        self.sight_range = self.sight_range.max(0.0);
        self.sight_angle_deg = self.sight_angle_deg.clamp(0.0, 360.0);
        self.hearing_range = self.hearing_range.max(0.0);
        self.proximity_range = self.proximity_range.max(0.0);
        self.memory_duration = self.memory_duration.max(0.0);
        self
    }
}

/// Last-known position of one remembered subject.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryRecord {
    pub last_position: Vec2,
    pub recorded_at: f32,
}

/// Per-agent senses: sight cone, hearing, proximity, and bounded memory.
///
/// Memory TTLs are measured against the monotonic simulation clock, never
/// against per-state timers.
#[derive(Debug)]
pub struct Perception {
    config: PerceptionConfig,
    memory: BTreeMap<EntityId, MemoryRecord>,
}

/// Unsigned angle between two directions, radians. Degenerate inputs count as
/// aligned.
fn angle_between(a: Vec2, b: Vec2) -> f32 {
    let len_a = a.length();
    let len_b = b.length();
    if len_a < MIN_DIRECTION_LENGTH || len_b < MIN_DIRECTION_LENGTH {
        return 0.0;
    }
    (a.dot(b) / (len_a * len_b)).clamp(-1.0, 1.0).acos()
}

impl Perception {
    pub fn new(config: PerceptionConfig) -> Self {
        Self {
            config: config.sanitized(),
            memory: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// Run all senses for one tick and report what was detected.
    pub fn update(
        &mut self,
        observer: EntityId,
        observer_pos: Vec2,
        facing: Vec2,
        registry: &dyn EntityRegistry,
        world: &CollisionWorld,
        now: f32,
    ) -> Vec<PerceptionEvent> {
        let mut events = Vec::new();

        let radius = self
            .config
            .sight_range
            .max(self.config.hearing_range)
            .max(self.config.proximity_range);

        let mut candidates: Vec<(EntityId, Vec2)> = Vec::new();
        registry.for_each_active(&mut |snapshot| {
            if snapshot.id == observer {
                return;
            }
            if observer_pos.distance(snapshot.position) <= radius {
                candidates.push((snapshot.id, snapshot.position));
            }
        });

        for (target, target_pos) in candidates {
            let distance = observer_pos.distance(target_pos);

            if distance <= self.config.sight_range
                && self.can_see(observer, observer_pos, facing, target_pos, world)
            {
                events.push(PerceptionEvent {
                    kind: PerceptionKind::Sight,
                    source: Some(target),
                    position: target_pos,
                    intensity: 1.0 - distance / self.config.sight_range,
                    timestamp: now,
                    duration: 0.0,
                });
                self.remember(target, target_pos, now);
            }

            if distance <= self.config.hearing_range {
                events.push(PerceptionEvent {
                    kind: PerceptionKind::Hearing,
                    source: Some(target),
                    position: target_pos,
                    intensity: 1.0 - distance / self.config.hearing_range,
                    timestamp: now,
                    duration: 0.0,
                });
            }

            if distance <= self.config.proximity_range {
                events.push(PerceptionEvent {
                    kind: PerceptionKind::Proximity,
                    source: Some(target),
                    position: target_pos,
                    intensity: 1.0 - distance / self.config.proximity_range,
                    timestamp: now,
                    duration: 0.0,
                });
            }
        }

        self.memory
            .retain(|_, record| now - record.recorded_at <= self.config.memory_duration);
        for (subject, record) in &self.memory {
            events.push(PerceptionEvent {
                kind: PerceptionKind::Memory,
                source: Some(*subject),
                position: record.last_position,
                intensity: 0.5,
                timestamp: now,
                duration: self.config.memory_duration,
            });
        }

        events
    }

    /// Distance, cone, and (optionally) line-of-sight test.
    pub fn can_see(
        &self,
        observer: EntityId,
        observer_pos: Vec2,
        facing: Vec2,
        target_pos: Vec2,
        world: &CollisionWorld,
    ) -> bool {
        if observer_pos.distance(target_pos) > self.config.sight_range {
            return false;
        }
        let half_cone = self.config.sight_angle_deg.to_radians() * 0.5;
        if angle_between(facing, target_pos - observer_pos) > half_cone {
            return false;
        }
        if self.config.requires_los {
            return !world.segment_intersects_any(
                observer_pos,
                target_pos,
                Some(observer),
                self.config.sight_layer_mask,
            );
        }
        true
    }

    pub fn can_hear(&self, observer_pos: Vec2, sound_pos: Vec2) -> bool {
        observer_pos.distance(sound_pos) <= self.config.hearing_range
    }

    pub fn in_proximity(&self, observer_pos: Vec2, target_pos: Vec2) -> bool {
        observer_pos.distance(target_pos) <= self.config.proximity_range
    }

    pub fn remember(&mut self, subject: EntityId, position: Vec2, now: f32) {
        self.memory.insert(
            subject,
            MemoryRecord {
                last_position: position,
                recorded_at: now,
            },
        );
    }

    pub fn last_known(&self, subject: EntityId) -> Option<Vec2> {
        self.memory.get(&subject).map(|r| r.last_position)
    }

    pub fn has_valid_memory(&self, subject: EntityId, now: f32) -> bool {
        self.memory
            .get(&subject)
            .map(|r| now - r.recorded_at <= self.config.memory_duration)
            .unwrap_or(false)
    }

    pub fn forget(&mut self, subject: EntityId) {
        self.memory.remove(&subject);
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }
}

impl Default for Perception {
    fn default() -> Self {
        Self::new(PerceptionConfig::default())
    }
}
