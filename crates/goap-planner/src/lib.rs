//! Regressive A* planning and plan execution for GOAP agents.
//!
//! [`Planner`] is the per-agent loop: it ranks goals, asks [`search::RegressiveSearch`] for the
//! cheapest action sequence toward the most insistent one, runs the plan step by step, and
//! replans when the world stops matching what the plan predicted.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod plan;
pub mod planner;
pub mod registry;
pub mod search;
pub mod sensor;
pub mod snapshot;

pub use config::{ActionTemplate, GoalTemplate, PlannerAsset, PlannerConfig, PLAN_LENGTH_LIMIT};
pub use error::{ConfigError, PlanError};
pub use plan::PlanInstance;
pub use planner::{Planner, PlannerState};
pub use registry::{ActionSet, EdgeTable};
pub use search::{RegressiveSearch, SearchLimits, SearchPlan, SearchStats};
pub use sensor::{FnSensor, Sensor, SensorWrites};
pub use snapshot::{GoalSnapshot, PlannerSnapshot, WorldValue};
