use std::collections::BTreeMap;

use station_collision::{movement, CollisionWorld, MoveMode};
use station_core::{EntityId, EntityKind, EntityRegistry, EntitySnapshot, TickContext, Vec2};
use station_nav::NavPlanner;

use crate::config::{AgentConfig, BehaviorProfile, Priority};
use crate::perception::{Perception, PerceptionEvent, PerceptionKind};

/// Distance at which a patrol point or investigation site counts as reached.
const ARRIVAL_RADIUS: f32 = 32.0;
/// Distance at which the head waypoint is popped.
const WAYPOINT_RADIUS: f32 = 16.0;
/// Replan when the destination is farther than this from the agent.
const REPATH_DISTANCE: f32 = 64.0;
/// Lockout after a successful flee.
const FLEE_REARM_SECONDS: f32 = 5.0;
/// Sounds quieter than this are ignored.
const SOUND_INTENSITY_GATE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FsmState {
    Idle,
    Patrol,
    Chase,
    Attack,
    Flee,
    Return,
    Investigate,
    Alert,
    Stunned,
    Dead,
}

impl FsmState {
    pub fn is_terminal(self) -> bool {
        self == FsmState::Dead
    }

    /// States that move along a planned path; the rest hold position.
    fn keeps_path(self) -> bool {
        matches!(
            self,
            FsmState::Patrol | FsmState::Chase | FsmState::Flee | FsmState::Return | FsmState::Investigate
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            FsmState::Idle => "idle",
            FsmState::Patrol => "patrol",
            FsmState::Chase => "chase",
            FsmState::Attack => "attack",
            FsmState::Flee => "flee",
            FsmState::Return => "return",
            FsmState::Investigate => "investigate",
            FsmState::Alert => "alert",
            FsmState::Stunned => "stunned",
            FsmState::Dead => "dead",
        }
    }
}

/// Remaining lockout seconds; each only decreases with `dt` until re-armed by
/// its triggering event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cooldowns {
    pub attack: f32,
    pub flee: f32,
    pub alert: f32,
    pub investigation: f32,
    pub stunned: f32,
}

impl Cooldowns {
    fn advance(&mut self, dt: f32) {
        self.attack = (self.attack - dt).max(0.0);
        self.flee = (self.flee - dt).max(0.0);
        self.alert = (self.alert - dt).max(0.0);
        self.investigation = (self.investigation - dt).max(0.0);
        self.stunned = (self.stunned - dt).max(0.0);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerfStats {
    pub perception_checks: u64,
    pub path_requests: u64,
    pub state_changes: u64,
}

struct Decision {
    new_state: FsmState,
    priority: Priority,
    target_position: Option<Vec2>,
    broadcast: Option<Vec2>,
    reason: &'static str,
}

/// One autonomous agent: senses, decides, and moves its owner entity.
pub struct Agent {
    owner: EntityId,
    config: AgentConfig,

    state: FsmState,
    prev_state: FsmState,
    time_in_state: f32,

    patrol_points: Vec<Vec2>,
    patrol_idx: usize,
    current_path: Vec<Vec2>,
    target_position: Vec2,

    targets: BTreeMap<EntityId, Priority>,
    primary_target: Option<EntityId>,
    last_seen_player: Vec2,
    time_since_seen: f32,

    cooldowns: Cooldowns,
    position: Vec2,
    facing: Vec2,
    pending_alert: Option<Vec2>,

    perception: Perception,
    planner: NavPlanner,
    perf: PerfStats,
}

impl Agent {
    pub fn new(owner: EntityId, config: AgentConfig) -> Self {
        let config = config.sanitized();
        Self {
            owner,
            state: FsmState::Idle,
            prev_state: FsmState::Idle,
            time_in_state: 0.0,
            patrol_points: Vec::new(),
            patrol_idx: 0,
            current_path: Vec::new(),
            target_position: Vec2::ZERO,
            targets: BTreeMap::new(),
            primary_target: None,
            last_seen_player: Vec2::ZERO,
            time_since_seen: 0.0,
            cooldowns: Cooldowns::default(),
            position: Vec2::ZERO,
            facing: Vec2::new(1.0, 0.0),
            pending_alert: None,
            perception: Perception::new(config.perception),
            planner: NavPlanner::new(config.pathfinding),
            perf: PerfStats::default(),
            config,
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> FsmState {
        self.state
    }

    pub fn prev_state(&self) -> FsmState {
        self.prev_state
    }

    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    pub fn facing(&self) -> Vec2 {
        self.facing
    }

    pub fn target_position(&self) -> Vec2 {
        self.target_position
    }

    pub fn current_path(&self) -> &[Vec2] {
        &self.current_path
    }

    pub fn patrol_points(&self) -> &[Vec2] {
        &self.patrol_points
    }

    pub fn patrol_idx(&self) -> usize {
        self.patrol_idx
    }

    pub fn targets(&self) -> &BTreeMap<EntityId, Priority> {
        &self.targets
    }

    pub fn primary_target(&self) -> Option<EntityId> {
        self.primary_target
    }

    pub fn last_seen_player(&self) -> Vec2 {
        self.last_seen_player
    }

    pub fn time_since_seen(&self) -> f32 {
        self.time_since_seen
    }

    pub fn cooldowns(&self) -> &Cooldowns {
        &self.cooldowns
    }

    pub fn perception(&self) -> &Perception {
        &self.perception
    }

    pub fn perf(&self) -> &PerfStats {
        &self.perf
    }

    pub fn reset_perf(&mut self) {
        self.perf = PerfStats::default();
    }

    pub fn set_patrol_points(&mut self, points: Vec<Vec2>) {
        self.patrol_points = points;
        self.patrol_idx = 0;
    }

    pub fn add_patrol_point(&mut self, point: Vec2) {
        self.patrol_points.push(point);
    }

    /// Force a state, bypassing the decision step. Dead stays absorbing.
    pub fn set_state(&mut self, state: FsmState) {
        self.change_state(state, "forced");
    }

    pub fn stun(&mut self) {
        self.cooldowns.stunned = self.config.stunned_duration;
        self.change_state(FsmState::Stunned, "stunned");
    }

    pub fn kill(&mut self) {
        self.change_state(FsmState::Dead, "died");
    }

    /// Alert position queued by a Scout decision, consumed by the manager.
    pub fn take_pending_alert(&mut self) -> Option<Vec2> {
        self.pending_alert.take()
    }

    /// One decision tick: timers, perception, decision, state execution.
    pub fn update(
        &mut self,
        ctx: &TickContext,
        registry: &mut dyn EntityRegistry,
        world: &mut CollisionWorld,
    ) {
        if self.state == FsmState::Dead {
            return;
        }
        let Some(snapshot) = registry.snapshot(self.owner) else {
            return;
        };
        if !snapshot.active {
            return;
        }
        self.position = snapshot.position;

        let dt = ctx.dt_seconds;
        self.time_in_state += dt;
        self.time_since_seen += dt;
        self.cooldowns.advance(dt);

        if self.cooldowns.stunned > 0.0 {
            self.execute_stunned();
            return;
        }

        self.perf.perception_checks += 1;
        let events = self.perception.update(
            self.owner,
            snapshot.position,
            self.facing,
            &*registry,
            world,
            ctx.now_seconds,
        );

        for event in &events {
            if event.kind != PerceptionKind::Sight {
                continue;
            }
            let Some(source) = event.source else {
                continue;
            };
            let is_player = registry
                .snapshot(source)
                .map(|s| s.kind == EntityKind::Player)
                .unwrap_or(false);
            if is_player {
                self.last_seen_player = event.position;
                self.time_since_seen = 0.0;
                self.add_target(source, Priority::High);
            }
        }

        let decision = self.decide(&events, &*registry, &snapshot);
        if decision.new_state != self.state {
            self.change_state(decision.new_state, decision.reason);
        }
        if let Some(position) = decision.target_position {
            self.target_position = position;
        }
        if self.config.can_alert_others && decision.broadcast.is_some() {
            self.pending_alert = decision.broadcast;
        }

        match self.state {
            FsmState::Idle | FsmState::Dead => {}
            FsmState::Patrol => self.execute_patrol(ctx, registry, world),
            FsmState::Chase => self.execute_chase(ctx, registry, world),
            FsmState::Attack => self.execute_attack(registry),
            FsmState::Flee => self.execute_flee(ctx, registry, world),
            FsmState::Return => self.execute_return(ctx, registry, world),
            FsmState::Investigate => self.execute_investigate(ctx, registry, world),
            FsmState::Alert => self.execute_alert(),
            FsmState::Stunned => self.execute_stunned(),
        }
    }

    fn decide(
        &self,
        events: &[PerceptionEvent],
        registry: &dyn EntityRegistry,
        snapshot: &EntitySnapshot,
    ) -> Decision {
        let mut decision = Decision {
            new_state: self.state,
            priority: Priority::Low,
            target_position: None,
            broadcast: None,
            reason: "",
        };

        if registry.health_fraction(self.owner) < self.config.health_threshold
            && self.config.caution > 0.5
        {
            decision.new_state = FsmState::Flee;
            decision.priority = Priority::Critical;
            decision.reason = "low health";

            let mut away = Vec2::ZERO;
            for event in events {
                if event.kind == PerceptionKind::Sight && event.source.is_some() {
                    away += (snapshot.position - event.position).normalize_or_zero();
                }
            }
            let away = away.normalize_or_zero();
            decision.target_position = Some(if away == Vec2::ZERO {
                snapshot.position
            } else {
                snapshot.position + away * self.config.flee_distance
            });
            return decision;
        }

        let mut best: Option<(EntitySnapshot, Priority)> = None;
        for event in events {
            if event.kind == PerceptionKind::Memory {
                continue;
            }
            let Some(source) = event.source else {
                continue;
            };
            let Some(target) = registry.snapshot(source) else {
                continue;
            };
            let priority = self.target_priority(&target, snapshot.position);
            if best.as_ref().map(|(_, p)| priority > *p).unwrap_or(true) {
                best = Some((target, priority));
            }
        }

        if let Some((target, priority)) = best {
            let distance = snapshot.position.distance(target.position);
            let in_reach = distance <= self.config.attack_range;

            match self.config.profile {
                BehaviorProfile::Aggressive => {
                    if in_reach && self.should_attack(&target) {
                        decision.new_state = FsmState::Attack;
                        decision.priority = Priority::High;
                        decision.reason = "aggressive: attacking";
                    } else if priority >= Priority::Medium {
                        decision.new_state = FsmState::Chase;
                        decision.priority = Priority::High;
                        decision.target_position = Some(target.position);
                        decision.reason = "aggressive: chasing";
                    }
                }
                BehaviorProfile::Defensive => {
                    if priority >= Priority::High {
                        if distance <= self.config.attack_range * 2.0 {
                            decision.new_state = FsmState::Flee;
                            decision.priority = Priority::High;
                            decision.reason = "defensive: fleeing";
                        } else {
                            decision.new_state = FsmState::Alert;
                            decision.priority = Priority::Medium;
                            decision.reason = "defensive: on alert";
                        }
                    }
                }
                BehaviorProfile::Neutral => {
                    if in_reach && self.should_attack(&target) {
                        decision.new_state = FsmState::Attack;
                        decision.priority = Priority::Medium;
                        decision.reason = "neutral: self-defense";
                    } else if priority >= Priority::High {
                        decision.new_state = FsmState::Chase;
                        decision.priority = Priority::Medium;
                        decision.target_position = Some(target.position);
                        decision.reason = "neutral: investigating threat";
                    }
                }
                BehaviorProfile::Passive => {
                    if priority >= Priority::High {
                        decision.new_state = FsmState::Flee;
                        decision.priority = Priority::High;
                        decision.reason = "passive: avoiding conflict";
                    }
                }
                BehaviorProfile::Guard => {
                    if in_reach && self.should_attack(&target) {
                        decision.new_state = FsmState::Attack;
                        decision.priority = Priority::High;
                        decision.reason = "guard: defending position";
                    } else if priority >= Priority::Medium {
                        decision.new_state = FsmState::Alert;
                        decision.priority = Priority::Medium;
                        decision.reason = "guard: heightened awareness";
                    }
                }
                BehaviorProfile::Scout => {
                    if priority >= Priority::Medium {
                        decision.new_state = FsmState::Investigate;
                        decision.priority = Priority::Medium;
                        decision.target_position = Some(target.position);
                        decision.broadcast = Some(target.position);
                        decision.reason = "scout: investigating";
                    }
                }
            }
        }

        if decision.new_state == self.state && decision.priority == Priority::Low {
            match self.state {
                FsmState::Idle => {
                    if !self.patrol_points.is_empty() {
                        decision.new_state = FsmState::Patrol;
                        decision.reason = "starting patrol";
                    }
                }
                FsmState::Chase | FsmState::Investigate => {
                    if self.time_since_seen > self.config.investigation_time {
                        decision.new_state = FsmState::Return;
                        decision.reason = "lost target";
                    }
                }
                FsmState::Alert => {
                    if self.cooldowns.alert <= 0.0 {
                        decision.new_state = if self.patrol_points.is_empty() {
                            FsmState::Idle
                        } else {
                            FsmState::Patrol
                        };
                        decision.reason = "alert timeout";
                    }
                }
                FsmState::Return => {
                    if self.patrol_points.is_empty() {
                        decision.new_state = FsmState::Idle;
                        decision.reason = "no patrol points";
                    } else if snapshot
                        .position
                        .distance(self.patrol_points[self.patrol_idx])
                        < ARRIVAL_RADIUS
                    {
                        decision.new_state = FsmState::Patrol;
                        decision.reason = "reached patrol point";
                    }
                }
                _ => {}
            }
        }

        decision
    }

    fn should_attack(&self, target: &EntitySnapshot) -> bool {
        target.kind == EntityKind::Player && self.config.aggression > 0.3
    }

    fn target_priority(&self, target: &EntitySnapshot, own_position: Vec2) -> Priority {
        if target.kind == EntityKind::Player && self.config.prioritize_player {
            return Priority::High;
        }
        let distance = own_position.distance(target.position);
        if distance < self.config.attack_range {
            Priority::High
        } else if distance < self.config.perception.sight_range * 0.5 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    fn change_state(&mut self, new_state: FsmState, reason: &'static str) {
        if new_state == self.state || self.state == FsmState::Dead {
            return;
        }
        self.prev_state = self.state;
        self.state = new_state;
        self.time_in_state = 0.0;
        self.perf.state_changes += 1;

        if !new_state.keeps_path() {
            self.current_path.clear();
        }
        if new_state == FsmState::Patrol && !self.patrol_points.is_empty() {
            self.patrol_idx = self.nearest_patrol_point();
        }

        tracing::info!(
            entity = self.owner.raw(),
            from = self.prev_state.name(),
            to = new_state.name(),
            reason,
            "agent state change"
        );
    }

    fn nearest_patrol_point(&self) -> usize {
        let mut nearest = 0;
        let mut nearest_distance = f32::MAX;
        for (idx, point) in self.patrol_points.iter().enumerate() {
            let distance = self.position.distance(*point);
            if distance < nearest_distance {
                nearest_distance = distance;
                nearest = idx;
            }
        }
        nearest
    }

    pub fn add_target(&mut self, target: EntityId, priority: Priority) {
        if target == self.owner {
            return;
        }
        match self.targets.get(&target) {
            Some(&existing) => {
                if priority > existing {
                    self.targets.insert(target, priority);
                }
            }
            None => {
                if self.targets.len() >= self.config.max_targets as usize {
                    let weakest = self
                        .targets
                        .iter()
                        .min_by_key(|(id, p)| (**p, **id))
                        .map(|(id, p)| (*id, *p));
                    match weakest {
                        Some((weakest_id, weakest_priority)) if priority > weakest_priority => {
                            self.targets.remove(&weakest_id);
                            self.targets.insert(target, priority);
                        }
                        _ => {}
                    }
                } else {
                    self.targets.insert(target, priority);
                }
            }
        }
        self.refresh_primary();
    }

    pub fn remove_target(&mut self, target: EntityId) {
        self.targets.remove(&target);
        self.refresh_primary();
    }

    pub fn clear_targets(&mut self) {
        self.targets.clear();
        self.primary_target = None;
    }

    fn refresh_primary(&mut self) {
        // Highest priority wins; the smaller handle breaks ties.
        self.primary_target = self
            .targets
            .iter()
            .max_by_key(|(id, p)| (**p, core::cmp::Reverse(**id)))
            .map(|(id, _)| *id);
    }

    pub fn on_damage_received(&mut self, _amount: f32, source: Option<EntityId>) {
        if let Some(source) = source {
            self.add_target(source, Priority::Critical);
        }
        self.cooldowns.alert = self.config.alert_duration;
        if matches!(self.state, FsmState::Idle | FsmState::Patrol) {
            self.change_state(FsmState::Alert, "received damage");
        }
    }

    pub fn on_sound_heard(&mut self, position: Vec2, intensity: f32) {
        if intensity > SOUND_INTENSITY_GATE
            && matches!(self.state, FsmState::Idle | FsmState::Patrol)
        {
            self.target_position = position;
            self.cooldowns.investigation = self.config.investigation_time;
            self.change_state(FsmState::Investigate, "heard sound");
        }
    }

    pub fn on_alert_received(&mut self, position: Vec2, _source: Option<EntityId>) {
        if matches!(self.state, FsmState::Idle | FsmState::Patrol) {
            self.target_position = position;
            self.cooldowns.alert = self.config.alert_duration;
            self.change_state(FsmState::Alert, "received alert");
        }
    }

    pub fn on_entity_died(&mut self, entity: EntityId) {
        self.remove_target(entity);
    }

    fn valid_target(
        &self,
        registry: &dyn EntityRegistry,
    ) -> Option<EntitySnapshot> {
        self.primary_target
            .and_then(|t| registry.snapshot(t))
            .filter(|s| s.active)
    }

    fn execute_patrol(
        &mut self,
        ctx: &TickContext,
        registry: &mut dyn EntityRegistry,
        world: &mut CollisionWorld,
    ) {
        if self.patrol_points.is_empty() {
            self.change_state(FsmState::Idle, "no patrol points");
            return;
        }
        let mut destination = self.patrol_points[self.patrol_idx];
        if self.position.distance(destination) < ARRIVAL_RADIUS {
            self.patrol_idx = (self.patrol_idx + 1) % self.patrol_points.len();
            destination = self.patrol_points[self.patrol_idx];
        }
        self.update_path(destination, world);
        self.follow_path(ctx, registry, world);
    }

    fn execute_chase(
        &mut self,
        ctx: &TickContext,
        registry: &mut dyn EntityRegistry,
        world: &mut CollisionWorld,
    ) {
        let Some(target) = self.valid_target(&*registry) else {
            self.change_state(FsmState::Return, "lost chase target");
            return;
        };
        self.update_path(target.position, world);
        self.follow_path(ctx, registry, world);
    }

    fn execute_attack(&mut self, registry: &mut dyn EntityRegistry) {
        let Some(target) = self.valid_target(&*registry) else {
            self.change_state(FsmState::Return, "lost attack target");
            return;
        };
        if self.position.distance(target.position) > self.config.attack_range {
            self.change_state(FsmState::Chase, "target out of attack range");
            return;
        }
        if self.cooldowns.attack <= 0.0 {
            registry.apply_damage(target.id, self.config.attack_damage);
            self.cooldowns.attack = self.config.attack_cooldown;
            tracing::info!(
                entity = self.owner.raw(),
                target = target.id.raw(),
                damage = self.config.attack_damage,
                "agent attacked target"
            );
        }
    }

    fn execute_flee(
        &mut self,
        ctx: &TickContext,
        registry: &mut dyn EntityRegistry,
        world: &mut CollisionWorld,
    ) {
        if self.cooldowns.flee > 0.0 {
            return;
        }
        self.update_path(self.target_position, world);
        self.follow_path(ctx, registry, world);

        let mut distance_from_danger: f32 = 0.0;
        for target in self.targets.keys() {
            if let Some(snapshot) = registry.snapshot(*target) {
                distance_from_danger =
                    distance_from_danger.max(self.position.distance(snapshot.position));
            }
        }
        if !self.targets.is_empty() && distance_from_danger >= self.config.flee_distance {
            self.cooldowns.flee = FLEE_REARM_SECONDS;
            self.change_state(FsmState::Alert, "fled to safety");
        }
    }

    fn execute_return(
        &mut self,
        ctx: &TickContext,
        registry: &mut dyn EntityRegistry,
        world: &mut CollisionWorld,
    ) {
        if self.patrol_points.is_empty() {
            self.change_state(FsmState::Idle, "no return point");
            return;
        }
        let return_point = self.patrol_points[self.nearest_patrol_point()];
        if self.position.distance(return_point) < ARRIVAL_RADIUS {
            self.change_state(FsmState::Patrol, "returned to patrol");
            return;
        }
        self.update_path(return_point, world);
        self.follow_path(ctx, registry, world);
    }

    fn execute_investigate(
        &mut self,
        ctx: &TickContext,
        registry: &mut dyn EntityRegistry,
        world: &mut CollisionWorld,
    ) {
        if self.position.distance(self.target_position) < ARRIVAL_RADIUS
            || self.cooldowns.investigation <= 0.0
        {
            self.cooldowns.alert = self.config.alert_duration;
            self.change_state(FsmState::Alert, "investigation complete");
            return;
        }
        self.update_path(self.target_position, world);
        self.follow_path(ctx, registry, world);
    }

    fn execute_alert(&mut self) {
        if self.cooldowns.alert <= 0.0 {
            let next = if self.patrol_points.is_empty() {
                FsmState::Idle
            } else {
                FsmState::Patrol
            };
            self.change_state(next, "alert timeout");
        }
    }

    fn execute_stunned(&mut self) {
        if self.cooldowns.stunned <= 0.0 {
            let prev = self.prev_state;
            self.change_state(prev, "recovered from stun");
        }
    }

    /// Replan when there is no path, or the destination is far enough that
    /// the stored path is stale.
    fn update_path(&mut self, destination: Vec2, world: &CollisionWorld) {
        if self.current_path.is_empty() || self.position.distance(destination) > REPATH_DISTANCE {
            self.perf.path_requests += 1;
            let result = self
                .planner
                .find_path(self.position, destination, world, Some(self.owner));
            if result.success {
                self.current_path = result.waypoints;
            }
        }
    }

    /// Step toward the head waypoint through the movement helper, sliding
    /// along obstacles.
    fn follow_path(
        &mut self,
        ctx: &TickContext,
        registry: &mut dyn EntityRegistry,
        world: &mut CollisionWorld,
    ) {
        if self.current_path.is_empty() {
            return;
        }
        let Some(snapshot) = registry.snapshot(self.owner) else {
            return;
        };
        let position = snapshot.position;

        if position.distance(self.current_path[0]) < WAYPOINT_RADIUS {
            self.current_path.remove(0);
            if self.current_path.is_empty() {
                return;
            }
        }
        let waypoint = self.current_path[0];

        let direction = (waypoint - position).normalize_or_zero();
        if direction == Vec2::ZERO {
            return;
        }
        self.facing = direction;

        let intended = position + direction * self.config.speed * ctx.dt_seconds;
        let result = movement::compute_move(
            world,
            self.owner,
            position,
            snapshot.size,
            intended,
            MoveMode::Slide,
            movement::DEFAULT_MAX_STEPS,
            self.config.pathfinding.obstacle_mask,
        );

        registry.set_position(self.owner, result.final_pos);
        world.translate(self.owner, result.final_pos - position);
        self.position = result.final_pos;
    }
}
