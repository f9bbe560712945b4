use std::collections::BTreeMap;

use station_collision::{CollisionWorld, PairEventSink, Resolver};
use station_core::{EntityId, EntityRegistry, TickContext, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::config::{AgentConfig, Priority};

/// World units of alert reach per unit of sound intensity.
const SOUND_RADIUS_PER_INTENSITY: f32 = 150.0;
/// Alert history high-water mark; the oldest half is dropped past it.
const MAX_RECENT_ALERTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoordinationConfig {
    pub enable_coordination: bool,
    pub alert_radius: f32,
    pub coordination_update_interval: f32,
    pub share_target_information: bool,
    /// Reserved; no effect yet.
    pub enable_group_behaviors: bool,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            enable_coordination: true,
            alert_radius: 200.0,
            coordination_update_interval: 0.1,
            share_target_information: true,
            enable_group_behaviors: true,
        }
    }
}

impl CoordinationConfig {
    pub fn sanitized(mut self) -> Self {
        self.alert_radius = self.alert_radius.max(0.0);
        self.coordination_update_interval = self.coordination_update_interval.max(0.0);
        self
    }
}

/// Aggregate counters, recomputed once per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub total_agents: usize,
    pub active_agents: usize,
    pub perception_checks: u64,
    pub path_requests: u64,
    pub state_changes: u64,
}

/// Owns every agent and routes all cross-agent effects.
///
/// Agents are ticked in insertion order; each observes the mutations of the
/// agents before it in the same tick. Alerts, sounds, damage, and deaths flow
/// through here rather than between agents directly.
pub struct AgentManager {
    config: CoordinationConfig,
    agents: BTreeMap<EntityId, Agent>,
    order: Vec<EntityId>,
    active: Vec<EntityId>,
    shared_targets: BTreeMap<EntityId, Vec2>,
    recent_alerts: Vec<Vec2>,
    coordination_timer: f32,
    metrics_timer: f32,
    metrics: Metrics,
}

impl AgentManager {
    pub fn new(config: CoordinationConfig) -> Self {
        Self {
            config: config.sanitized(),
            agents: BTreeMap::new(),
            order: Vec::new(),
            active: Vec::new(),
            shared_targets: BTreeMap::new(),
            recent_alerts: Vec::new(),
            coordination_timer: 0.0,
            metrics_timer: 0.0,
            metrics: Metrics::default(),
        }
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agent(&self, id: EntityId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent_mut(&mut self, id: EntityId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn shared_targets(&self) -> &BTreeMap<EntityId, Vec2> {
        &self.shared_targets
    }

    pub fn recent_alerts(&self) -> &[Vec2] {
        &self.recent_alerts
    }

    pub fn add_agent(&mut self, owner: EntityId, config: AgentConfig) {
        if !self.agents.contains_key(&owner) {
            self.order.push(owner);
        }
        self.agents.insert(owner, Agent::new(owner, config));
        self.refresh_active();
        tracing::info!(entity = owner.raw(), "added agent");
    }

    pub fn remove_agent(&mut self, owner: EntityId) {
        if self.agents.remove(&owner).is_some() {
            self.order.retain(|id| *id != owner);
            self.refresh_active();
            tracing::info!(entity = owner.raw(), "removed agent");
        }
    }

    pub fn clear(&mut self) {
        self.agents.clear();
        self.order.clear();
        self.active.clear();
        self.shared_targets.clear();
        self.recent_alerts.clear();
    }

    fn refresh_active(&mut self) {
        self.active = self
            .order
            .iter()
            .copied()
            .filter(|id| self.agents.contains_key(id))
            .collect();
    }

    /// Tick every agent, then resolve its residual overlaps.
    pub fn update_all(
        &mut self,
        ctx: &TickContext,
        registry: &mut dyn EntityRegistry,
        world: &mut CollisionWorld,
        resolver: &mut Resolver,
        sink: &mut dyn PairEventSink,
    ) {
        if self.config.enable_coordination {
            self.run_coordination(ctx.dt_seconds, registry);
        }

        let ids = self.active.clone();
        for id in ids {
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.update(ctx, registry, world);
            }

            let pending = self
                .agents
                .get_mut(&id)
                .and_then(|agent| agent.take_pending_alert());
            if let Some(position) = pending {
                let radius = self
                    .agents
                    .get(&id)
                    .map(|agent| agent.config().alert_radius)
                    .unwrap_or(self.config.alert_radius);
                self.alert_in_radius(position, radius, Some(id), registry);
            }

            let movable = registry.snapshot(id).map(|s| s.active).unwrap_or(false)
                && world.collider(id).is_some();
            if movable {
                resolver.resolve(id, ctx.dt_seconds, world, registry, sink);
            }
        }

        self.metrics_timer += ctx.dt_seconds;
        if self.metrics_timer >= 1.0 {
            self.metrics_timer = 0.0;
            self.recompute_metrics();
        }
    }

    fn run_coordination(&mut self, dt: f32, registry: &dyn EntityRegistry) {
        self.coordination_timer += dt;
        if self.coordination_timer < self.config.coordination_update_interval {
            return;
        }
        self.coordination_timer = 0.0;

        if self.config.share_target_information {
            let mut published: Vec<(EntityId, Vec2)> = Vec::new();
            for id in &self.active {
                let Some(agent) = self.agents.get(id) else {
                    continue;
                };
                let Some(target) = agent.primary_target() else {
                    continue;
                };
                if let Some(snapshot) = registry.snapshot(target) {
                    published.push((target, snapshot.position));
                }
            }
            for (target, position) in published {
                self.share_target(target, position);
            }
        }

        if self.recent_alerts.len() > MAX_RECENT_ALERTS {
            self.recent_alerts.drain(..MAX_RECENT_ALERTS / 2);
        }
    }

    /// Gossip a target's last known position to every active agent.
    pub fn share_target(&mut self, target: EntityId, last_known: Vec2) {
        if !self.config.share_target_information {
            return;
        }
        self.shared_targets.insert(target, last_known);
        for id in &self.active {
            if *id == target {
                continue;
            }
            if let Some(agent) = self.agents.get_mut(id) {
                agent.add_target(target, Priority::Medium);
            }
        }
    }

    pub fn on_damaged(
        &mut self,
        victim: EntityId,
        amount: f32,
        source: Option<EntityId>,
        registry: &dyn EntityRegistry,
    ) {
        if let Some(agent) = self.agents.get_mut(&victim) {
            agent.on_damage_received(amount, source);
        }
        if self.config.enable_coordination && source.is_some() {
            if let Some(snapshot) = registry.snapshot(victim) {
                self.alert_in_radius(snapshot.position, self.config.alert_radius, source, registry);
            }
        }
    }

    pub fn on_died(&mut self, entity: EntityId) {
        self.shared_targets.remove(&entity);
        for id in self.active.clone() {
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.on_entity_died(entity);
            }
        }
        if let Some(agent) = self.agents.get_mut(&entity) {
            agent.kill();
        }
        self.remove_agent(entity);
        tracing::info!(entity = entity.raw(), "entity died, agents notified");
    }

    pub fn on_sound(
        &mut self,
        position: Vec2,
        intensity: f32,
        _source: Option<EntityId>,
        registry: &dyn EntityRegistry,
    ) {
        if !self.config.enable_coordination {
            return;
        }
        let radius = intensity.max(0.0) * SOUND_RADIUS_PER_INTENSITY;
        let mut heard = 0usize;
        for id in self.active.clone() {
            let Some(snapshot) = registry.snapshot(id) else {
                continue;
            };
            if snapshot.position.distance(position) > radius {
                continue;
            }
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.on_sound_heard(position, intensity);
                heard += 1;
            }
        }
        tracing::info!(x = position.x, y = position.y, intensity, heard, "sound broadcast");
    }

    pub fn alert_in_radius(
        &mut self,
        position: Vec2,
        radius: f32,
        source: Option<EntityId>,
        registry: &dyn EntityRegistry,
    ) {
        self.recent_alerts.push(position);
        let mut alerted = 0usize;
        for id in self.active.clone() {
            let Some(snapshot) = registry.snapshot(id) else {
                continue;
            };
            if snapshot.position.distance(position) > radius {
                continue;
            }
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.on_alert_received(position, source);
                alerted += 1;
            }
        }
        tracing::info!(x = position.x, y = position.y, alerted, "alert broadcast");
    }

    pub fn broadcast_alert(
        &mut self,
        position: Vec2,
        source: Option<EntityId>,
        registry: &dyn EntityRegistry,
    ) {
        self.alert_in_radius(position, self.config.alert_radius, source, registry);
    }

    fn recompute_metrics(&mut self) {
        let mut metrics = Metrics {
            total_agents: self.agents.len(),
            active_agents: self.active.len(),
            ..Metrics::default()
        };
        for id in &self.active {
            if let Some(agent) = self.agents.get(id) {
                let perf = agent.perf();
                metrics.perception_checks += perf.perception_checks;
                metrics.path_requests += perf.path_requests;
                metrics.state_changes += perf.state_changes;
            }
        }
        self.metrics = metrics;
    }

    pub fn reset_metrics(&mut self) {
        self.metrics = Metrics::default();
        for agent in self.agents.values_mut() {
            agent.reset_perf();
        }
    }
}

impl Default for AgentManager {
    fn default() -> Self {
        Self::new(CoordinationConfig::default())
    }
}
