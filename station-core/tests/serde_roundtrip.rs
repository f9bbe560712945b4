#![cfg(feature = "serde")]

use station_core::{Aabb, EntityId, EntityKind, EntitySnapshot, Vec2};

#[test]
fn snapshot_roundtrips_via_serde() {
    let snapshot = EntitySnapshot::new(
        EntityId::new(42),
        EntityKind::Enemy,
        Vec2::new(12.5, -3.0),
        Vec2::splat(16.0),
    );

    let json = serde_json::to_string(&snapshot).expect("serialize snapshot");
    let parsed: EntitySnapshot = serde_json::from_str(&json).expect("deserialize snapshot");
    assert_eq!(snapshot, parsed);
}

#[test]
fn aabb_roundtrips_via_serde() {
    let aabb = Aabb::new(Vec2::new(-4.0, 8.0), Vec2::new(32.0, 24.0));

    let json = serde_json::to_string(&aabb).expect("serialize aabb");
    let parsed: Aabb = serde_json::from_str(&json).expect("deserialize aabb");
    assert_eq!(aabb, parsed);
}
