//! Planner configuration and shared agent templates.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use goap_core::{Action, Goal, WorldKey, WorldState};

use crate::search::SearchLimits;
use crate::ConfigError;

/// Per-agent planner settings, usually loaded from YAML.
///
/// ```yaml
/// max_plan_length: 6
/// world_defaults:
///   Hunger: 80
/// reprioritize_on_world_change: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Longest plan the search may return.
    #[serde(default = "default_max_plan_length")]
    pub max_plan_length: usize,

    /// Node expansions per search before it gives up.
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,

    /// Initial world values by key name. Keys not listed start unset.
    pub world_defaults: BTreeMap<String, u8>,

    /// Replan when a world change moves a different goal to the top.
    pub reprioritize_on_world_change: bool,
}

/// Upper bound on `max_plan_length`; the plan buffer and search depth are sized from it.
pub const PLAN_LENGTH_LIMIT: usize = 64;

fn default_max_plan_length() -> usize {
    8
}
fn default_max_expansions() -> usize {
    4096
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_plan_length: default_max_plan_length(),
            max_expansions: default_max_expansions(),
            world_defaults: BTreeMap::new(),
            reprioritize_on_world_change: false,
        }
    }
}

impl PlannerConfig {
    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read planner config from {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to load planner config from {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Failed to parse planner config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_plan_length == 0 {
            return Err(ConfigError::InvalidMaxPlanLength(self.max_plan_length));
        }
        if self.max_plan_length > PLAN_LENGTH_LIMIT {
            return Err(ConfigError::PlanLengthTooLong {
                got: self.max_plan_length,
                limit: PLAN_LENGTH_LIMIT,
            });
        }
        if self.max_expansions == 0 {
            return Err(ConfigError::InvalidMaxExpansions);
        }
        Ok(())
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            max_plan_length: self.max_plan_length,
            max_expansions: self.max_expansions,
        }
    }

    /// The starting world state described by `world_defaults`.
    pub fn initial_world<K: WorldKey>(&self) -> Result<WorldState<K>, ConfigError> {
        let mut world = WorldState::new();
        for (name, &value) in &self.world_defaults {
            let key = K::from_name(name).ok_or_else(|| ConfigError::UnknownWorldKey {
                name: name.clone(),
            })?;
            world.set(key, value);
        }
        Ok(world)
    }
}

pub type ActionTemplate<K> = Arc<dyn Fn() -> Box<dyn Action<K>> + Send + Sync>;
pub type GoalTemplate<K> = Arc<dyn Fn() -> Box<dyn Goal<K>> + Send + Sync>;

/// Configuration plus the action and goal templates shared by every agent of one kind.
///
/// Templates are factories: each agent built from the asset owns fresh action and goal
/// instances, so per-agent state never leaks between agents.
pub struct PlannerAsset<K: WorldKey> {
    pub config: PlannerConfig,
    actions: Vec<ActionTemplate<K>>,
    goals: Vec<GoalTemplate<K>>,
}

impl<K: WorldKey> PlannerAsset<K> {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            actions: Vec::new(),
            goals: Vec::new(),
        }
    }

    pub fn with_action(
        mut self,
        make: impl Fn() -> Box<dyn Action<K>> + Send + Sync + 'static,
    ) -> Self {
        self.actions.push(Arc::new(make));
        self
    }

    pub fn with_goal(mut self, make: impl Fn() -> Box<dyn Goal<K>> + Send + Sync + 'static) -> Self {
        self.goals.push(Arc::new(make));
        self
    }

    pub fn action_templates(&self) -> &[ActionTemplate<K>] {
        &self.actions
    }

    pub fn goal_templates(&self) -> &[GoalTemplate<K>] {
        &self.goals
    }
}

impl<K: WorldKey> Clone for PlannerAsset<K> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            actions: self.actions.clone(),
            goals: self.goals.clone(),
        }
    }
}
