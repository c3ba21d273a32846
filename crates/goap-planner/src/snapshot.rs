use core::fmt;

use serde::{Deserialize, Serialize};

use crate::PlannerState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSnapshot {
    pub name: String,
    pub valid: bool,
    pub insistence: f32,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldValue {
    pub key: String,
    pub value: u8,
}

/// Read-only view of one planner for debug overlays and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSnapshot {
    pub agent: u64,
    pub state: PlannerState,
    pub goals: Vec<GoalSnapshot>,
    pub world: Vec<WorldValue>,
    /// Every registered action by name, in registration order.
    pub actions: Vec<String>,
    /// Remaining plan steps by action name, head first.
    pub plan: Vec<String>,
    pub predictions: Vec<WorldValue>,
}

impl fmt::Display for PlannerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "agent {} ({:?})", self.agent, self.state)?;

        writeln!(f, "goals:")?;
        for goal in &self.goals {
            let marker = if goal.current { '>' } else { ' ' };
            let validity = if goal.valid { "valid" } else { "invalid" };
            writeln!(
                f,
                " {marker} {:<24} {validity:<8} {:.2}",
                goal.name, goal.insistence
            )?;
        }

        writeln!(f, "world:")?;
        for entry in &self.world {
            writeln!(f, "   {:<24} {}", entry.key, entry.value)?;
        }

        writeln!(f, "actions: {}", self.actions.join(", "))?;

        if self.plan.is_empty() {
            writeln!(f, "plan: <none>")?;
        } else {
            writeln!(f, "plan: {}", self.plan.join(" -> "))?;
        }

        for entry in &self.predictions {
            writeln!(f, "expecting {} = {}", entry.key, entry.value)?;
        }
        Ok(())
    }
}
