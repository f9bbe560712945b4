use criterion::{black_box, criterion_group, criterion_main, Criterion};
use station_collision::CollisionWorld;
use station_core::{EntityId, EntityKind, EntitySnapshot, Vec2};
use station_nav::NavPlanner;

/// Wall columns with staggered gaps, forcing a serpentine route.
fn corridor_world() -> CollisionWorld {
    let mut world = CollisionWorld::default();
    let mut id = 0u64;
    for col in 0..6 {
        let x = 96.0 + col as f32 * 128.0;
        let gap = if col % 2 == 0 { 8 } else { 1 };
        for row in 0..10 {
            if row == gap {
                continue;
            }
            let snapshot = EntitySnapshot::new(
                EntityId::new(id),
                EntityKind::Wall,
                Vec2::new(x, row as f32 * 32.0),
                Vec2::splat(32.0),
            );
            world.upsert_bounds(&snapshot, snapshot.bounds());
            id += 1;
        }
    }
    world
}

fn bench_find_path(c: &mut Criterion) {
    let world = corridor_world();
    let mut planner = NavPlanner::default();
    let start = Vec2::new(16.0, 16.0);
    let goal = Vec2::new(912.0, 16.0);

    let mut group = c.benchmark_group("station-nav/planner");

    group.bench_function("serpentine", |b| {
        b.iter(|| {
            let result = planner.find_path(start, goal, &world, None);
            black_box(result.waypoints.len());
        })
    });

    group.bench_function("short_circuit", |b| {
        b.iter(|| {
            let result = planner.find_path(start, Vec2::new(16.0, 300.0), &world, None);
            black_box(result.iterations);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_find_path);
criterion_main!(benches);
