use std::borrow::Cow;

use crate::{WorldKey, WorldProperty, WorldState};

/// Stable identifier of a goal inside one agent's goal set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GoalId(pub u32);

impl GoalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub trait Goal<K: WorldKey>: 'static {
    fn name(&self) -> &str;

    /// Conjunctive condition: every clause must hold for the goal to be met.
    fn condition(&self) -> &[WorldProperty<K>];

    /// Current priority. Zero, negative and NaN all mean "inactive".
    fn insistence(&self) -> f32;

    fn is_valid(&self) -> bool {
        let insistence = self.insistence();
        !insistence.is_nan() && insistence > 0.0
    }

    /// Recompute insistence and validity. Only ever called with live state, never during search.
    fn on_world_state_changed(&mut self, world: &WorldState<K>);
}

/// A goal whose insistence is scored from the world state by a closure.
pub struct ScoredGoal<K: WorldKey> {
    name: Cow<'static, str>,
    condition: Vec<WorldProperty<K>>,
    insistence: f32,
    score_fn: Box<dyn FnMut(&WorldState<K>) -> f32>,
}

impl<K: WorldKey> ScoredGoal<K> {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        condition: Vec<WorldProperty<K>>,
        score_fn: impl FnMut(&WorldState<K>) -> f32 + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            condition,
            insistence: 0.0,
            score_fn: Box::new(score_fn),
        }
    }

    /// A goal with constant insistence.
    pub fn constant(
        name: impl Into<Cow<'static, str>>,
        condition: Vec<WorldProperty<K>>,
        insistence: f32,
    ) -> Self {
        let mut goal = Self::new(name, condition, move |_| insistence);
        goal.insistence = insistence;
        goal
    }
}

impl<K: WorldKey> Goal<K> for ScoredGoal<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn condition(&self) -> &[WorldProperty<K>] {
        &self.condition
    }

    fn insistence(&self) -> f32 {
        self.insistence
    }

    fn on_world_state_changed(&mut self, world: &WorldState<K>) {
        let score = (self.score_fn)(world);
        self.insistence = if score.is_nan() { 0.0 } else { score };
    }
}
