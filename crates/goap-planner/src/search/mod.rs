//! Regressive A* over symbolic world state.
//!
//! The search starts from the goal condition and works backwards through action effects until
//! every remaining requirement holds in the initial world.

pub mod astar;
pub mod node;

pub use astar::{RegressiveSearch, SearchLimits, SearchPlan, SearchStats};
pub use node::{NodeId, NodePool, RegressionState, SearchNode};
