use station_collision::{
    ColliderShape, CollisionWorld, NullPairSink, PairKind, Resolver, ResolverConfig, Shape,
    VecPairSink,
};
use station_core::{EntityId, EntityKind, EntityRegistry, EntitySnapshot, Vec2, WorldState};

fn spawn(
    registry: &mut WorldState,
    world: &mut CollisionWorld,
    id: u64,
    kind: EntityKind,
    position: Vec2,
    size: Vec2,
) -> EntityId {
    let snapshot = EntitySnapshot::new(EntityId::new(id), kind, position, size);
    registry.insert(snapshot);
    world.upsert_bounds(&snapshot, snapshot.bounds());
    snapshot.id
}

#[test]
fn mtv_pushes_along_axis_of_least_overlap() {
    let mut registry = WorldState::new();
    let mut world = CollisionWorld::default();
    let a = spawn(&mut registry, &mut world, 1, EntityKind::Enemy, Vec2::ZERO, Vec2::splat(10.0));
    let _b = spawn(
        &mut registry,
        &mut world,
        2,
        EntityKind::Wall,
        Vec2::new(8.0, 0.0),
        Vec2::splat(10.0),
    );

    let mut resolver = Resolver::default();
    let resolution = resolver.resolve(a, 0.1, &mut world, &mut registry, &mut NullPairSink);

    assert!(resolution.applied);
    assert_eq!(resolution.correction, Vec2::new(-2.0, 0.0));
    assert!((resolution.penetration - 2.0).abs() < 1e-6);
    assert_eq!(
        registry.snapshot(a).expect("snapshot").position,
        Vec2::new(-2.0, 0.0)
    );
    // The collider moved with the entity; the overlap is gone.
    assert!(world.check(a).is_empty());
    assert_eq!(resolver.stats().total_resolutions, 1);
}

#[test]
fn oversized_correction_is_skipped() {
    let mut registry = WorldState::new();
    let mut world = CollisionWorld::default();
    let a = spawn(&mut registry, &mut world, 1, EntityKind::Enemy, Vec2::ZERO, Vec2::splat(100.0));
    let _b = spawn(
        &mut registry,
        &mut world,
        2,
        EntityKind::Wall,
        Vec2::new(10.0, 0.0),
        Vec2::splat(100.0),
    );

    let mut resolver = Resolver::new(ResolverConfig {
        max_correction_distance: 50.0,
        ..ResolverConfig::default()
    });
    let resolution = resolver.resolve(a, 0.1, &mut world, &mut registry, &mut NullPairSink);

    assert!(!resolution.applied);
    assert!((resolution.penetration - 90.0).abs() < 1e-4);
    assert_eq!(registry.snapshot(a).expect("snapshot").position, Vec2::ZERO);
    assert_eq!(resolver.stats().total_resolutions, 0);
}

#[test]
fn trigger_contacts_skip_correction_but_emit_events() {
    let mut registry = WorldState::new();
    let mut world = CollisionWorld::default();
    let a = spawn(&mut registry, &mut world, 1, EntityKind::Player, Vec2::ZERO, Vec2::splat(10.0));

    let sensor = EntitySnapshot::new(
        EntityId::new(2),
        EntityKind::Item,
        Vec2::new(5.0, 0.0),
        Vec2::splat(10.0),
    );
    registry.insert(sensor);
    world.upsert_shapes(
        &sensor,
        vec![ColliderShape::named(
            "sensor",
            Shape::Rect { size: Vec2::splat(10.0) },
            Vec2::ZERO,
            true,
        )],
    );

    let mut resolver = Resolver::default();
    let mut sink = VecPairSink::default();
    let resolution = resolver.resolve(a, 0.1, &mut world, &mut registry, &mut sink);

    assert!(!resolution.applied);
    assert_eq!(registry.snapshot(a).expect("snapshot").position, Vec2::ZERO);
    assert_eq!(sink.events.len(), 1);
    assert_eq!(sink.events[0].kind, PairKind::Enter);
}

#[test]
fn pair_events_follow_enter_stay_exit() {
    let mut registry = WorldState::new();
    let mut world = CollisionWorld::default();
    let a = spawn(&mut registry, &mut world, 1, EntityKind::Player, Vec2::ZERO, Vec2::splat(10.0));

    let sensor = EntitySnapshot::new(
        EntityId::new(2),
        EntityKind::Item,
        Vec2::new(5.0, 0.0),
        Vec2::splat(10.0),
    );
    registry.insert(sensor);
    world.upsert_shapes(
        &sensor,
        vec![ColliderShape::named(
            "sensor",
            Shape::Rect { size: Vec2::splat(10.0) },
            Vec2::ZERO,
            true,
        )],
    );

    let mut resolver = Resolver::default();
    let mut sink = VecPairSink::default();

    resolver.resolve(a, 0.1, &mut world, &mut registry, &mut sink);
    resolver.resolve(a, 0.1, &mut world, &mut registry, &mut sink);

    // Walk out of the sensor, then resolve once more.
    let moved = EntitySnapshot {
        position: Vec2::new(100.0, 0.0),
        ..registry.snapshot(a).expect("snapshot")
    };
    registry.set_position(a, moved.position);
    world.upsert_bounds(&moved, moved.bounds());
    resolver.resolve(a, 0.1, &mut world, &mut registry, &mut sink);

    let kinds: Vec<PairKind> = sink.events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![PairKind::Enter, PairKind::Stay, PairKind::Exit]);
}

#[test]
fn sweep_test_reports_first_solid_hit() {
    let mut registry = WorldState::new();
    let mut world = CollisionWorld::default();
    let a = spawn(&mut registry, &mut world, 1, EntityKind::Enemy, Vec2::ZERO, Vec2::splat(10.0));
    let wall = spawn(
        &mut registry,
        &mut world,
        2,
        EntityKind::Wall,
        Vec2::new(60.0, 0.0),
        Vec2::splat(10.0),
    );

    let mut resolver = Resolver::default();
    let hit = resolver
        .sweep_test(a, Vec2::new(100.0, 0.0), 1.0, &world)
        .expect("sweep hit");
    assert_eq!(hit.b, wall);
    assert_eq!(resolver.stats().continuous_tests, 1);

    let mut disabled = Resolver::new(ResolverConfig {
        enable_continuous: false,
        ..ResolverConfig::default()
    });
    assert!(disabled.sweep_test(a, Vec2::new(100.0, 0.0), 1.0, &world).is_none());
}
