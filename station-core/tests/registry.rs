use station_core::{EntityId, EntityKind, EntityRegistry, EntitySnapshot, Vec2, WorldState};

fn snapshot(id: u64, kind: EntityKind, position: Vec2) -> EntitySnapshot {
    EntitySnapshot::new(EntityId::new(id), kind, position, Vec2::splat(16.0))
}

#[test]
fn damage_clamps_at_zero_and_deactivates() {
    let mut world = WorldState::new();
    let id = EntityId::new(1);
    world.insert_with_health(snapshot(1, EntityKind::Player, Vec2::ZERO), 30.0);

    world.apply_damage(id, 10.0);
    assert_eq!(world.health(id), Some(20.0));
    assert!((world.health_fraction(id) - 2.0 / 3.0).abs() < 1e-6);

    world.apply_damage(id, 100.0);
    assert_eq!(world.health(id), Some(0.0));
    assert!(!world.snapshot(id).expect("snapshot").active);
}

#[test]
fn negative_damage_is_ignored() {
    let mut world = WorldState::new();
    let id = EntityId::new(1);
    world.insert(snapshot(1, EntityKind::Enemy, Vec2::ZERO));

    world.apply_damage(id, -50.0);
    assert_eq!(world.health(id), Some(WorldState::DEFAULT_HEALTH));
}

#[test]
fn for_each_active_skips_inactive() {
    let mut world = WorldState::new();
    world.insert(snapshot(1, EntityKind::Enemy, Vec2::ZERO));
    world.insert(snapshot(2, EntityKind::Item, Vec2::new(10.0, 0.0)));
    world.set_active(EntityId::new(2), false);

    let mut seen = Vec::new();
    world.for_each_active(&mut |s| seen.push(s.id));
    assert_eq!(seen, vec![EntityId::new(1)]);
}

#[test]
fn set_position_updates_snapshot() {
    let mut world = WorldState::new();
    let id = EntityId::new(7);
    world.insert(snapshot(7, EntityKind::Player, Vec2::ZERO));

    world.set_position(id, Vec2::new(42.0, -8.0));
    assert_eq!(
        world.snapshot(id).expect("snapshot").position,
        Vec2::new(42.0, -8.0)
    );
}

#[test]
fn unknown_entity_queries_return_none() {
    let world = WorldState::new();
    assert!(world.snapshot(EntityId::new(99)).is_none());
    assert_eq!(world.health_fraction(EntityId::new(99)), 1.0);
}
