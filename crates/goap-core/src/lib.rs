//! Symbolic world model and plan-participant contracts for GOAP agents.
//!
//! This crate owns the vocabulary every other `goap-*` crate speaks: world keys and state
//! vectors, properties and effects, the action and goal contracts, and the completion channel
//! actions use to report back to their planner.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod blackboard;
pub mod goal;
pub mod scripted;
pub mod tick;
pub mod world;

pub use action::{
    AbortResult, Action, ActionContext, ActionDef, ActionId, ActionOutcome, Completion,
    CompletionQueue, CompletionSender, FinishHandle, StartResult,
};
pub use blackboard::{BbKey, Blackboard};
pub use goal::{Goal, GoalId, ScoredGoal};
pub use scripted::ScriptedAction;
pub use tick::TickContext;
pub use world::{EffectOp, Regression, SymEffect, WorldKey, WorldProperty, WorldState, UNSET};
