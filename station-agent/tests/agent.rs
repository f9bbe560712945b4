use station_agent::{Agent, AgentConfig, BehaviorProfile, FsmState, PerceptionConfig, Priority};
use station_collision::CollisionWorld;
use station_core::{
    layer, EntityId, EntityKind, EntityRegistry, EntitySnapshot, TickContext, Vec2, WorldState,
};

const ENEMY: u64 = 1;
const PLAYER: u64 = 2;

fn enemy_id() -> EntityId {
    EntityId::new(ENEMY)
}

fn player_id() -> EntityId {
    EntityId::new(PLAYER)
}

fn setup(player_pos: Vec2) -> (WorldState, CollisionWorld) {
    let mut registry = WorldState::new();
    registry.insert(EntitySnapshot::new(
        enemy_id(),
        EntityKind::Enemy,
        Vec2::ZERO,
        Vec2::splat(16.0),
    ));
    registry.insert(EntitySnapshot::new(
        player_id(),
        EntityKind::Player,
        player_pos,
        Vec2::splat(16.0),
    ));
    (registry, CollisionWorld::default())
}

fn agent_config(profile: BehaviorProfile) -> AgentConfig {
    AgentConfig {
        profile,
        perception: PerceptionConfig {
            sight_angle_deg: 90.0,
            sight_layer_mask: layer::WALL,
            ..PerceptionConfig::default()
        },
        ..AgentConfig::default()
    }
}

fn tick(
    agent: &mut Agent,
    registry: &mut WorldState,
    world: &mut CollisionWorld,
    ctx: &mut TickContext,
) {
    agent.update(ctx, registry, world);
    *ctx = ctx.advanced(ctx.dt_seconds);
}

#[test]
fn sighted_player_becomes_high_priority_target() {
    let (mut registry, mut world) = setup(Vec2::new(50.0, 0.0));
    let mut agent = Agent::new(enemy_id(), agent_config(BehaviorProfile::Guard));
    let mut ctx = TickContext::first(0.1);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);

    assert_eq!(agent.targets().get(&player_id()), Some(&Priority::High));
    assert_eq!(agent.primary_target(), Some(player_id()));
    assert_eq!(agent.last_seen_player(), Vec2::new(50.0, 0.0));
    assert_eq!(agent.time_since_seen(), 0.0);
}

#[test]
fn unseen_player_leaves_targets_empty() {
    // 90 degrees off the default facing.
    let (mut registry, mut world) = setup(Vec2::new(0.0, 50.0));
    let mut agent = Agent::new(enemy_id(), agent_config(BehaviorProfile::Aggressive));
    let mut ctx = TickContext::first(0.1);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);

    assert!(agent.targets().is_empty());
    assert_eq!(agent.primary_target(), None);
}

#[test]
fn aggressive_agent_attacks_player_in_range() {
    let (mut registry, mut world) = setup(Vec2::new(20.0, 0.0));
    let mut agent = Agent::new(
        enemy_id(),
        AgentConfig {
            aggression: 1.0,
            ..agent_config(BehaviorProfile::Aggressive)
        },
    );
    let mut ctx = TickContext::first(0.1);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);
    tick(&mut agent, &mut registry, &mut world, &mut ctx);

    assert_eq!(agent.state(), FsmState::Attack);
    assert_eq!(registry.health(player_id()), Some(90.0));
    assert!(agent.cooldowns().attack > 0.0);
}

#[test]
fn aggressive_agent_chases_distant_player() {
    let (mut registry, mut world) = setup(Vec2::new(150.0, 0.0));
    let mut agent = Agent::new(
        enemy_id(),
        AgentConfig {
            aggression: 1.0,
            ..agent_config(BehaviorProfile::Aggressive)
        },
    );
    let mut ctx = TickContext::first(0.1);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);

    assert_eq!(agent.state(), FsmState::Chase);
    // The chase executor moved the enemy toward the player.
    let position = registry.snapshot(enemy_id()).expect("snapshot").position;
    assert!(position.x > 0.0);
    assert_eq!(registry.health(player_id()), Some(100.0));
}

#[test]
fn low_health_cautious_agent_flees_away_from_player() {
    let (mut registry, mut world) = setup(Vec2::new(50.0, 0.0));
    registry.set_health(enemy_id(), 10.0);

    let mut agent = Agent::new(
        enemy_id(),
        AgentConfig {
            caution: 1.0,
            health_threshold: 0.2,
            flee_distance: 150.0,
            ..agent_config(BehaviorProfile::Aggressive)
        },
    );
    let mut ctx = TickContext::first(0.1);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);

    assert_eq!(agent.state(), FsmState::Flee);
    let target = agent.target_position();
    assert!((target.x - (-150.0)).abs() < 1e-3, "fled toward {target:?}");
    assert!(target.y.abs() < 1e-3);
}

#[test]
fn passive_agent_flees_instead_of_fighting() {
    let (mut registry, mut world) = setup(Vec2::new(20.0, 0.0));
    let mut agent = Agent::new(enemy_id(), agent_config(BehaviorProfile::Passive));
    let mut ctx = TickContext::first(0.1);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);

    assert_eq!(agent.state(), FsmState::Flee);
    assert_eq!(registry.health(player_id()), Some(100.0));
}

#[test]
fn scout_queues_alert_broadcast() {
    let (mut registry, mut world) = setup(Vec2::new(100.0, 0.0));
    let mut agent = Agent::new(enemy_id(), agent_config(BehaviorProfile::Scout));
    let mut ctx = TickContext::first(0.1);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);

    // With no investigation timer armed, the investigate executor hands off
    // to Alert within the same tick.
    assert_eq!(agent.state(), FsmState::Alert);
    assert_eq!(agent.prev_state(), FsmState::Investigate);
    assert_eq!(agent.target_position(), Vec2::new(100.0, 0.0));
    assert_eq!(agent.take_pending_alert(), Some(Vec2::new(100.0, 0.0)));
    assert_eq!(agent.take_pending_alert(), None);
}

#[test]
fn idle_agent_with_patrol_points_starts_patrolling_nearest() {
    let (mut registry, mut world) = setup(Vec2::new(5000.0, 5000.0));
    registry.set_position(enemy_id(), Vec2::new(100.0, 0.0));

    let mut agent = Agent::new(enemy_id(), agent_config(BehaviorProfile::Guard));
    agent.set_patrol_points(vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(60.0, 0.0),
        Vec2::new(200.0, 0.0),
    ]);
    let mut ctx = TickContext::first(0.1);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);

    assert_eq!(agent.state(), FsmState::Patrol);
    assert_eq!(agent.patrol_idx(), 1);
}

#[test]
fn stun_restores_previous_state_after_timeout() {
    let (mut registry, mut world) = setup(Vec2::new(5000.0, 5000.0));
    let mut agent = Agent::new(
        enemy_id(),
        AgentConfig {
            stunned_duration: 0.25,
            ..agent_config(BehaviorProfile::Guard)
        },
    );
    let mut ctx = TickContext::first(0.1);

    agent.stun();
    assert_eq!(agent.state(), FsmState::Stunned);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);
    tick(&mut agent, &mut registry, &mut world, &mut ctx);
    assert_eq!(agent.state(), FsmState::Stunned);

    tick(&mut agent, &mut registry, &mut world, &mut ctx);
    assert_eq!(agent.state(), FsmState::Idle);
}

#[test]
fn dead_is_absorbing() {
    let (mut registry, mut world) = setup(Vec2::new(20.0, 0.0));
    let mut agent = Agent::new(enemy_id(), agent_config(BehaviorProfile::Aggressive));
    let mut ctx = TickContext::first(0.1);

    agent.kill();
    assert_eq!(agent.state(), FsmState::Dead);

    agent.set_state(FsmState::Patrol);
    assert_eq!(agent.state(), FsmState::Dead);

    let before = registry.snapshot(enemy_id()).expect("snapshot").position;
    for _ in 0..5 {
        tick(&mut agent, &mut registry, &mut world, &mut ctx);
    }
    assert_eq!(agent.state(), FsmState::Dead);
    assert_eq!(
        registry.snapshot(enemy_id()).expect("snapshot").position,
        before
    );
    assert_eq!(registry.health(player_id()), Some(100.0));
}

#[test]
fn damage_event_arms_alert_and_targets_attacker() {
    let (mut registry, mut world) = setup(Vec2::new(5000.0, 5000.0));
    let mut agent = Agent::new(enemy_id(), agent_config(BehaviorProfile::Guard));
    let mut ctx = TickContext::first(0.1);

    agent.on_damage_received(5.0, Some(player_id()));
    assert_eq!(agent.state(), FsmState::Alert);
    assert_eq!(agent.targets().get(&player_id()), Some(&Priority::Critical));
    assert!(agent.cooldowns().alert > 0.0);

    // The alert decays tick by tick and the agent eventually stands down.
    for _ in 0..120 {
        tick(&mut agent, &mut registry, &mut world, &mut ctx);
    }
    assert_eq!(agent.state(), FsmState::Idle);
}

#[test]
fn loud_sound_triggers_investigation() {
    let (mut registry, mut world) = setup(Vec2::new(5000.0, 5000.0));
    let mut agent = Agent::new(enemy_id(), agent_config(BehaviorProfile::Guard));

    agent.on_sound_heard(Vec2::new(80.0, 80.0), 0.9);
    assert_eq!(agent.state(), FsmState::Investigate);
    assert_eq!(agent.target_position(), Vec2::new(80.0, 80.0));

    let mut quiet = Agent::new(enemy_id(), agent_config(BehaviorProfile::Guard));
    quiet.on_sound_heard(Vec2::new(80.0, 80.0), 0.3);
    assert_eq!(quiet.state(), FsmState::Idle);
    let _ = (&mut registry, &mut world);
}

#[test]
fn cooldowns_never_go_negative_and_primary_stays_maximal() {
    let (mut registry, mut world) = setup(Vec2::new(60.0, 0.0));
    let mut agent = Agent::new(
        enemy_id(),
        AgentConfig {
            aggression: 1.0,
            max_targets: 2,
            ..agent_config(BehaviorProfile::Aggressive)
        },
    );
    agent.add_target(EntityId::new(50), Priority::Low);
    agent.add_target(EntityId::new(51), Priority::Medium);
    let mut ctx = TickContext::first(0.05);

    for _ in 0..100 {
        tick(&mut agent, &mut registry, &mut world, &mut ctx);

        let cooldowns = agent.cooldowns();
        assert!(cooldowns.attack >= 0.0);
        assert!(cooldowns.flee >= 0.0);
        assert!(cooldowns.alert >= 0.0);
        assert!(cooldowns.investigation >= 0.0);
        assert!(cooldowns.stunned >= 0.0);

        match agent.primary_target() {
            Some(primary) => {
                let top = agent.targets().values().copied().max().expect("targets");
                assert_eq!(agent.targets().get(&primary), Some(&top));
            }
            None => assert!(agent.targets().is_empty()),
        }
        assert!(agent.targets().len() <= 2);
    }
}

#[test]
fn target_cap_evicts_weakest() {
    let (_registry, _world) = setup(Vec2::ZERO);
    let mut agent = Agent::new(
        enemy_id(),
        AgentConfig {
            max_targets: 2,
            ..agent_config(BehaviorProfile::Neutral)
        },
    );

    agent.add_target(EntityId::new(10), Priority::Low);
    agent.add_target(EntityId::new(11), Priority::Medium);
    agent.add_target(EntityId::new(12), Priority::Critical);

    assert_eq!(agent.targets().len(), 2);
    assert!(!agent.targets().contains_key(&EntityId::new(10)));
    assert_eq!(agent.primary_target(), Some(EntityId::new(12)));

    agent.remove_target(EntityId::new(12));
    assert_eq!(agent.primary_target(), Some(EntityId::new(11)));
}
