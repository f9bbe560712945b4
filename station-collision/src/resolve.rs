use std::collections::BTreeSet;

use station_core::{layer, Aabb, EntityId, EntityRegistry, Vec2};

use crate::world::{CollisionWorld, Contact};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    Enter,
    Stay,
    Exit,
}

/// Receiver for collision pair lifecycle events.
pub trait PairEventSink {
    fn on_pair(&mut self, kind: PairKind, a: EntityId, b: EntityId, dt: f32);
}

#[derive(Debug, Default)]
pub struct NullPairSink;

impl PairEventSink for NullPairSink {
    fn on_pair(&mut self, _kind: PairKind, _a: EntityId, _b: EntityId, _dt: f32) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEvent {
    pub kind: PairKind,
    pub a: EntityId,
    pub b: EntityId,
    pub dt: f32,
}

/// Sink that records every event, for tests and tooling.
#[derive(Debug, Default)]
pub struct VecPairSink {
    pub events: Vec<PairEvent>,
}

impl PairEventSink for VecPairSink {
    fn on_pair(&mut self, kind: PairKind, a: EntityId, b: EntityId, dt: f32) {
        self.events.push(PairEvent { kind, a, b, dt });
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// Largest correction applied in one frame; anything bigger is skipped.
    pub max_correction_distance: f32,
    pub enable_events: bool,
    pub enable_continuous: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_correction_distance: 50.0,
            enable_events: true,
            enable_continuous: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Resolution {
    pub correction: Vec2,
    pub normal: Vec2,
    pub penetration: f32,
    pub applied: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolverStats {
    pub total_resolutions: u64,
    pub events_emitted: u64,
    pub total_correction_distance: f32,
    pub continuous_tests: u64,
}

/// Applies clamped positional corrections and tracks pair lifecycles.
///
/// Pair state is keyed on sorted handle pairs and updated once per entity per
/// tick, at the end of that entity's `resolve` call.
pub struct Resolver {
    config: ResolverConfig,
    prev_pairs: BTreeSet<(EntityId, EntityId)>,
    stats: ResolverStats,
}

fn pair_key(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Smallest displacement separating `a` from `b`: along the axis of lesser
/// overlap, signed to push `a` away from `b`.
pub fn minimum_translation(a: Aabb, b: Aabb) -> Vec2 {
    let overlap_x = a.max().x.min(b.max().x) - a.min().x.max(b.min().x);
    let overlap_y = a.max().y.min(b.max().y) - a.min().y.max(b.min().y);

    if overlap_x < overlap_y {
        if a.position.x < b.position.x {
            Vec2::new(-overlap_x, 0.0)
        } else {
            Vec2::new(overlap_x, 0.0)
        }
    } else if a.position.y < b.position.y {
        Vec2::new(0.0, -overlap_y)
    } else {
        Vec2::new(0.0, overlap_y)
    }
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            prev_pairs: BTreeSet::new(),
            stats: ResolverStats::default(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ResolverStats::default();
    }

    /// Resolve `id`'s current overlaps: apply the clamped MTV for the first
    /// solid contact, then run the pair-event pass for this entity.
    pub fn resolve(
        &mut self,
        id: EntityId,
        dt: f32,
        world: &mut CollisionWorld,
        registry: &mut dyn EntityRegistry,
        sink: &mut dyn PairEventSink,
    ) -> Resolution {
        let contacts = world.check_detailed(id);

        let mut resolution = Resolution::default();
        if let Some(primary) = contacts.iter().find(|c| !c.is_trigger) {
            resolution = self.correct(id, primary, world, registry);
        }

        if self.config.enable_events {
            self.update_pairs(id, &contacts, dt, sink);
        }

        resolution
    }

    pub fn resolve_many(
        &mut self,
        ids: &[EntityId],
        dt: f32,
        world: &mut CollisionWorld,
        registry: &mut dyn EntityRegistry,
        sink: &mut dyn PairEventSink,
    ) {
        for &id in ids {
            let active = registry.snapshot(id).map(|s| s.active).unwrap_or(false);
            if active {
                self.resolve(id, dt, world, registry, sink);
            }
        }
    }

    /// First swept contact for a fast mover, for pre-move short-circuiting.
    pub fn sweep_test(
        &mut self,
        id: EntityId,
        velocity: Vec2,
        dt: f32,
        world: &CollisionWorld,
    ) -> Option<Contact> {
        if !self.config.enable_continuous {
            return None;
        }
        self.stats.continuous_tests += 1;
        let bounds = world.collider(id)?.bounds();
        world
            .sweep(id, bounds, velocity, dt, layer::ALL)
            .into_iter()
            .find(|c| !c.is_trigger)
    }

    fn correct(
        &mut self,
        id: EntityId,
        primary: &Contact,
        world: &mut CollisionWorld,
        registry: &mut dyn EntityRegistry,
    ) -> Resolution {
        let (Some(subject), Some(other)) = (world.collider(id), world.collider(primary.b)) else {
            return Resolution::default();
        };
        let mtv = minimum_translation(subject.bounds(), other.bounds());
        let penetration = mtv.length();
        let mut resolution = Resolution {
            correction: mtv,
            normal: primary.normal,
            penetration,
            applied: false,
        };

        let both_active = registry.snapshot(id).map(|s| s.active).unwrap_or(false)
            && registry
                .snapshot(primary.b)
                .map(|s| s.active)
                .unwrap_or(false);
        if !both_active {
            return resolution;
        }

        if penetration <= self.config.max_correction_distance {
            if let Some(snapshot) = registry.snapshot(id) {
                registry.set_position(id, snapshot.position + mtv);
            }
            world.translate(id, mtv);
            self.stats.total_resolutions += 1;
            self.stats.total_correction_distance += penetration;
            resolution.applied = true;
        } else {
            tracing::warn!(
                entity = id.raw(),
                penetration,
                cap = self.config.max_correction_distance,
                "collision correction exceeds cap, skipping"
            );
        }
        resolution
    }

    fn update_pairs(
        &mut self,
        id: EntityId,
        contacts: &[Contact],
        dt: f32,
        sink: &mut dyn PairEventSink,
    ) {
        let curr: BTreeSet<(EntityId, EntityId)> =
            contacts.iter().map(|c| pair_key(c.a, c.b)).collect();

        for &(a, b) in &curr {
            let kind = if self.prev_pairs.contains(&(a, b)) {
                PairKind::Stay
            } else {
                PairKind::Enter
            };
            sink.on_pair(kind, a, b, dt);
            self.stats.events_emitted += 1;
        }

        let exited: Vec<(EntityId, EntityId)> = self
            .prev_pairs
            .iter()
            .copied()
            .filter(|&(a, b)| (a == id || b == id) && !curr.contains(&(a, b)))
            .collect();
        for (a, b) in exited {
            self.prev_pairs.remove(&(a, b));
            sink.on_pair(PairKind::Exit, a, b, dt);
            self.stats.events_emitted += 1;
        }

        self.prev_pairs.extend(curr);
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}
