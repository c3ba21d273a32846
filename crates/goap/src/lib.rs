//! Umbrella crate that re-exports the `goap-*` building blocks.
//!
//! - [`core`]: world keys and state, action and goal contracts, the completion channel.
//! - [`planner`]: regressive A* search and the per-agent planning loop.
//! - [`tools`]: trace events for tests and debug tooling.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use goap_core as core;

#[cfg(feature = "planner")]
#[cfg_attr(docsrs, doc(cfg(feature = "planner")))]
pub use goap_planner as planner;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use goap_tools as tools;

#[cfg(feature = "core")]
pub use goap_core::world_keys;

/// The names most agents need.
#[cfg(feature = "planner")]
#[cfg_attr(docsrs, doc(cfg(feature = "planner")))]
pub mod prelude {
    pub use goap_core::{
        AbortResult, Action, ActionContext, ActionDef, ActionId, ActionOutcome, FinishHandle,
        Goal, GoalId, ScoredGoal, ScriptedAction, StartResult, SymEffect, TickContext, WorldKey,
        WorldProperty, WorldState,
    };
    pub use goap_planner::{FnSensor, Planner, PlannerAsset, PlannerConfig, PlannerState};
    pub use goap_tools::{TraceLog, TRACE_LOG};
}
