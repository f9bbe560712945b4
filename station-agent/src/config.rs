use station_nav::NavConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::perception::PerceptionConfig;

/// Target priority, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BehaviorProfile {
    Aggressive,
    Defensive,
    #[default]
    Neutral,
    Passive,
    Guard,
    Scout,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentConfig {
    pub profile: BehaviorProfile,
    pub perception: PerceptionConfig,
    pub pathfinding: NavConfig,

    /// Health fraction below which the agent considers fleeing.
    pub health_threshold: f32,
    pub aggression: f32,
    pub caution: f32,
    pub investigation_time: f32,
    pub alert_duration: f32,
    pub stunned_duration: f32,

    pub speed: f32,
    pub attack_range: f32,
    pub attack_damage: f32,
    pub attack_cooldown: f32,
    pub flee_distance: f32,

    pub can_alert_others: bool,
    pub alert_radius: f32,

    pub max_targets: u8,
    pub prioritize_player: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            profile: BehaviorProfile::Neutral,
            perception: PerceptionConfig::default(),
            pathfinding: NavConfig::default(),
            health_threshold: 0.2,
            aggression: 0.5,
            caution: 0.5,
            investigation_time: 5.0,
            alert_duration: 10.0,
            stunned_duration: 3.0,
            speed: 100.0,
            attack_range: 32.0,
            attack_damage: 10.0,
            attack_cooldown: 1.0,
            flee_distance: 150.0,
            can_alert_others: true,
            alert_radius: 200.0,
            max_targets: 3,
            prioritize_player: true,
        }
    }
}

impl AgentConfig {
    /// Clamp every field into its valid domain; out-of-range input is never
    /// fatal.
    pub fn sanitized(mut self) -> Self {
        self.perception = self.perception.sanitized();
        self.pathfinding = self.pathfinding.sanitized();
        self.health_threshold = self.health_threshold.clamp(0.0, 1.0);
        self.aggression = self.aggression.clamp(0.0, 1.0);
        self.caution = self.caution.clamp(0.0, 1.0);
        self.investigation_time = self.investigation_time.max(0.0);
        self.alert_duration = self.alert_duration.max(0.0);
        self.stunned_duration = self.stunned_duration.max(0.0);
        self.speed = self.speed.max(0.0);
        self.attack_range = self.attack_range.max(0.0);
        self.attack_damage = self.attack_damage.max(0.0);
        self.attack_cooldown = self.attack_cooldown.max(0.0);
        self.flee_distance = self.flee_distance.max(0.0);
        self.alert_radius = self.alert_radius.max(0.0);
        self.max_targets = self.max_targets.max(1);
        self
    }
}
