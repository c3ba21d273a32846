use goap_core::ActionId;
use thiserror::Error;

/// Failures the planner detects while searching or executing.
///
/// Everything except [`PlanError::MalformedPlanBuffer`] is absorbed by the control loop: it is
/// logged, traced, and turned into a state transition (abort, replan, idle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no plan satisfies goal `{goal}`")]
    SearchExhausted { goal: String },

    #[error("preconditions of `{action}` do not hold in the live world")]
    PreconditionViolation { action: String },

    #[error("world key `{key}` changed to {actual} (predicted {expected:?})")]
    PredictionMismatch {
        key: &'static str,
        expected: Option<u8>,
        actual: u8,
    },

    #[error("edge table references removed action {action:?}")]
    DanglingEdgeReference { action: ActionId },

    #[error("plan buffer out of sync (head={head}, tail={tail}, len={len})")]
    MalformedPlanBuffer { head: usize, tail: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown world key `{name}`")]
    UnknownWorldKey { name: String },

    #[error("max_plan_length must be at least 1 (got {0})")]
    InvalidMaxPlanLength(usize),

    #[error("max_plan_length {got} exceeds the limit of {limit}")]
    PlanLengthTooLong { got: usize, limit: usize },

    #[error("max_expansions must be at least 1")]
    InvalidMaxExpansions,
}
