use station_core::{Aabb, Vec2};

#[test]
fn intersection_is_symmetric() {
    let a = Aabb::new(Vec2::ZERO, Vec2::splat(10.0));
    let b = Aabb::new(Vec2::new(5.0, 5.0), Vec2::splat(10.0));

    assert!(a.intersects(b));
    assert!(b.intersects(a));
    assert_eq!(a.intersection(b), b.intersection(a));

    let overlap = a.intersection(b).expect("overlap");
    assert_eq!(overlap.position, Vec2::new(5.0, 5.0));
    assert_eq!(overlap.size, Vec2::splat(5.0));
}

#[test]
fn touching_boxes_do_not_intersect() {
    let a = Aabb::new(Vec2::ZERO, Vec2::splat(10.0));
    let b = Aabb::new(Vec2::new(10.0, 0.0), Vec2::splat(10.0));
    assert!(!a.intersects(b));
    assert!(a.intersection(b).is_none());
}

#[test]
fn union_covers_both_boxes() {
    let a = Aabb::new(Vec2::ZERO, Vec2::splat(4.0));
    let b = Aabb::new(Vec2::new(10.0, -2.0), Vec2::splat(4.0));
    let u = a.union(b);

    assert!(u.contains_point(a.min()) && u.contains_point(a.max()));
    assert!(u.contains_point(b.min()) && u.contains_point(b.max()));
}

#[test]
fn expanded_toward_encloses_start_and_end() {
    let start = Aabb::new(Vec2::new(10.0, 10.0), Vec2::splat(10.0));
    let delta = Vec2::new(-30.0, 40.0);
    let swept = start.expanded_toward(delta);

    let end = Aabb::new(start.position + delta, start.size);
    assert!(swept.contains_point(start.min()) && swept.contains_point(start.max()));
    assert!(swept.contains_point(end.min()) && swept.contains_point(end.max()));
}
