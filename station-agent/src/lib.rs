//! Agent perception, decision state machines, and coordination.
//!
//! Agents never hold references to one another; every cross-agent effect is a
//! message routed through the [`AgentManager`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod config;
pub mod manager;
pub mod perception;

pub use agent::{Agent, Cooldowns, FsmState, PerfStats};
pub use config::{AgentConfig, BehaviorProfile, Priority};
pub use manager::{AgentManager, CoordinationConfig, Metrics};
pub use perception::{MemoryRecord, Perception, PerceptionConfig, PerceptionEvent, PerceptionKind};
