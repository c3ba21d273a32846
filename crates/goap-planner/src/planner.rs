use core::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use serde::{Deserialize, Serialize};

use goap_core::{
    AbortResult, Action, ActionContext, ActionId, ActionOutcome, Blackboard, Completion,
    CompletionQueue, CompletionSender, Goal, GoalId, StartResult, TickContext, WorldKey,
    WorldState,
};
use goap_tools::{emit as trace_emit, TraceEvent};

use crate::config::{PlannerAsset, PlannerConfig};
use crate::plan::PlanInstance;
use crate::registry::{ActionSet, EdgeTable};
use crate::search::{RegressiveSearch, SearchPlan, SearchStats};
use crate::sensor::{Sensor, SensorWrites};
use crate::snapshot::{GoalSnapshot, PlannerSnapshot, WorldValue};
use crate::{ConfigError, PlanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlannerState {
    /// No plan.
    Idle,
    /// A plan is loaded and its head step has not been started yet.
    PlanRunning,
    /// The head step is running.
    ActionActive,
    /// The head step was asked to abort and has not acknowledged yet.
    ActionAborting,
}

#[derive(Debug, Clone, Copy)]
struct RankedGoal {
    insistence: f32,
    id: GoalId,
}

impl Ord for RankedGoal {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on insistence; on a tie the earlier-registered goal ranks higher.
        self.insistence
            .total_cmp(&other.insistence)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for RankedGoal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankedGoal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedGoal {}

/// One agent's planning and execution loop.
///
/// The planner owns the authoritative world state, the agent's actions, goals and sensors, and
/// the active plan. Drive it by calling [`Planner::tick`] once per frame; push outside knowledge
/// in with [`Planner::set_world_property`].
pub struct Planner<K: WorldKey> {
    agent: u64,
    config: PlannerConfig,
    world: WorldState<K>,
    blackboard: Blackboard,

    actions: ActionSet<K>,
    edges: EdgeTable<K>,
    goals: Vec<Box<dyn Goal<K>>>,
    sensors: Vec<Box<dyn Sensor<K>>>,
    search: RegressiveSearch<K>,

    plan: PlanInstance,
    state: PlannerState,
    current_goal: Option<GoalId>,
    top_goal: Option<GoalId>,
    active_run: Option<(ActionId, u64)>,
    next_run: u64,
    predicted: BTreeMap<K, u8>,
    completions: CompletionQueue,

    replan_requested: bool,
    execution_update_requested: bool,
    world_changed: bool,
    warned_idle: bool,
    last_tick: TickContext,
}

impl<K: WorldKey> Planner<K> {
    pub fn new(agent: u64, config: PlannerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let world = config.initial_world()?;
        Ok(Self {
            agent,
            world,
            blackboard: Blackboard::new(),
            actions: ActionSet::new(),
            edges: EdgeTable::new(),
            goals: Vec::new(),
            sensors: Vec::new(),
            search: RegressiveSearch::new(config.limits()),
            plan: PlanInstance::for_plan_length(config.max_plan_length),
            state: PlannerState::Idle,
            current_goal: None,
            top_goal: None,
            active_run: None,
            next_run: 0,
            predicted: BTreeMap::new(),
            completions: CompletionQueue::new(),
            replan_requested: false,
            execution_update_requested: false,
            world_changed: true,
            warned_idle: false,
            last_tick: TickContext::default(),
            config,
        })
    }

    /// Build an agent from shared templates. Every action and goal is a fresh instance.
    pub fn from_asset(agent: u64, asset: &PlannerAsset<K>) -> Result<Self, ConfigError> {
        let mut planner = Self::new(agent, asset.config.clone())?;
        for make in asset.action_templates() {
            planner.actions.insert(make());
        }
        planner.rebuild_edges();
        for make in asset.goal_templates() {
            planner.add_goal(make());
        }
        Ok(planner)
    }

    pub fn agent(&self) -> u64 {
        self.agent
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn world(&self) -> &WorldState<K> {
        &self.world
    }

    pub fn plan(&self) -> &PlanInstance {
        &self.plan
    }

    pub fn current_goal(&self) -> Option<GoalId> {
        self.current_goal
    }

    pub fn goal(&self, id: GoalId) -> Option<&dyn Goal<K>> {
        self.goals.get(id.index()).map(Box::as_ref)
    }

    pub fn actions(&self) -> &ActionSet<K> {
        &self.actions
    }

    pub fn edges(&self) -> &EdgeTable<K> {
        &self.edges
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn is_running_plan(&self) -> bool {
        self.state != PlannerState::Idle
    }

    pub fn replan_requested(&self) -> bool {
        self.replan_requested
    }

    /// Values the running plan expects an outside writer to confirm.
    pub fn predicted(&self) -> &BTreeMap<K, u8> {
        &self.predicted
    }

    pub fn search_stats(&self) -> SearchStats {
        self.search.stats()
    }

    /// A sender into this planner's completion queue, for hosts that finish actions themselves.
    pub fn completion_sender(&self) -> CompletionSender {
        self.completions.sender()
    }

    pub fn add_action(&mut self, action: Box<dyn Action<K>>) -> ActionId {
        let id = self.actions.insert(action);
        self.rebuild_edges();
        id
    }

    /// Remove an action, leaving its id tombstoned.
    ///
    /// The edge table is not rebuilt: searches log and skip the stale edges until
    /// [`Planner::rebuild_edges`] runs. A plan that still references the action is aborted.
    pub fn remove_action(&mut self, id: ActionId) -> Option<Box<dyn Action<K>>> {
        if self.plan.iter().any(|step| step == id) {
            self.abort_plan();
            self.request_replan();
        }
        self.actions.remove(id)
    }

    pub fn rebuild_edges(&mut self) {
        self.edges = EdgeTable::build(&self.actions);
    }

    pub fn add_goal(&mut self, goal: Box<dyn Goal<K>>) -> GoalId {
        let id = GoalId(self.goals.len() as u32);
        self.goals.push(goal);
        self.world_changed = true;
        id
    }

    pub fn add_sensor(&mut self, sensor: Box<dyn Sensor<K>>) {
        self.sensors.push(sensor);
    }

    pub fn request_replan(&mut self) {
        self.replan_requested = true;
    }

    /// Advance the loop by one frame.
    pub fn tick(&mut self, ctx: &TickContext) {
        self.last_tick = *ctx;

        if !self.sensors.is_empty() {
            let mut writes = SensorWrites::new();
            for sensor in &mut self.sensors {
                sensor.tick(ctx, &self.world, &mut writes);
            }
            for write in writes.drain() {
                self.set_world_property(write.key, write.value);
            }
        }

        for completion in self.completions.drain() {
            self.on_completion(completion);
        }

        if self.state == PlannerState::ActionActive {
            if let Some((id, _)) = self.active_run {
                let mut action_ctx = ActionContext {
                    tick: *ctx,
                    agent: self.agent,
                    world: &self.world,
                    blackboard: &mut self.blackboard,
                };
                if let Some(action) = self.actions.get_mut(id) {
                    action.tick(&mut action_ctx);
                }
            }
        }

        if self.world_changed {
            self.notify_goals();
        }

        if self.execution_update_requested {
            self.update_execution();
        }

        if self.replan_requested || self.state == PlannerState::Idle {
            self.replan();
            // A freshly committed plan starts this frame.
            if self.execution_update_requested {
                self.update_execution();
            }
        }
    }

    /// The single entry point for outside writes to the world state.
    ///
    /// Returns whether the stored value changed. A write that confirms a pending prediction is
    /// absorbed; any other change while a plan runs aborts the plan and requests a replan.
    pub fn set_world_property(&mut self, key: K, value: u8) -> bool {
        let changed = self.world.set(key, value);
        let expected = self.predicted.get(&key).copied();
        if changed {
            self.world_changed = true;
        }

        if expected == Some(value) {
            self.predicted.remove(&key);
            tracing::trace!(agent = self.agent, key = key.name(), value, "prediction confirmed");
            return changed;
        }
        if !changed || !self.is_running_plan() {
            return changed;
        }

        let err = PlanError::PredictionMismatch {
            key: key.name(),
            expected,
            actual: value,
        };
        tracing::info!(agent = self.agent, error = %err, "world diverged from plan");
        trace_emit(
            &mut self.blackboard,
            TraceEvent::new(self.last_tick.tick, "goap.mismatch")
                .with_a(key.index() as u64)
                .with_b(u64::from(value))
                .with_label(key.name()),
        );
        self.abort_plan();
        self.request_replan();
        true
    }

    /// Abort the running plan.
    ///
    /// A step that aborts asynchronously keeps the planner in
    /// [`PlannerState::ActionAborting`] until its acknowledgment arrives; every other step is
    /// dropped immediately.
    pub fn abort_plan(&mut self) {
        self.predicted.clear();
        self.execution_update_requested = false;
        self.current_goal = None;

        match self.state {
            PlannerState::Idle => {
                self.plan.clear(false);
                return;
            }
            PlannerState::PlanRunning => {
                self.plan.clear(false);
                self.state = PlannerState::Idle;
            }
            PlannerState::ActionAborting => {
                self.plan.clear(true);
            }
            PlannerState::ActionActive => {
                let Some((id, _)) = self.active_run else {
                    self.plan.clear(false);
                    self.state = PlannerState::Idle;
                    return;
                };
                let mut ctx = ActionContext {
                    tick: self.last_tick,
                    agent: self.agent,
                    world: &self.world,
                    blackboard: &mut self.blackboard,
                };
                let result = match self.actions.get_mut(id) {
                    Some(action) => action.abort(&mut ctx),
                    None => AbortResult::Aborted,
                };
                match result {
                    AbortResult::Aborted => {
                        self.emit_action("goap.action.aborted", id);
                        self.active_run = None;
                        self.plan.clear(false);
                        self.state = PlannerState::Idle;
                    }
                    AbortResult::Running => {
                        self.plan.clear(true);
                        self.state = PlannerState::ActionAborting;
                    }
                }
            }
        }

        tracing::debug!(agent = self.agent, state = ?self.state, "plan aborted");
        trace_emit(
            &mut self.blackboard,
            TraceEvent::new(self.last_tick.tick, "goap.plan.abort").with_a(self.plan.len() as u64),
        );
    }

    /// Debug helper: run every registered action once, in registration order, as one plan.
    pub fn run_all_actions(&mut self) {
        let steps: Vec<ActionId> = self.actions.ids().collect();
        if steps.is_empty() {
            return;
        }
        tracing::debug!(agent = self.agent, steps = steps.len(), "running all actions");
        if self.state != PlannerState::ActionAborting {
            self.abort_plan();
        }
        self.load_plan(steps);
    }

    pub fn snapshot(&self) -> PlannerSnapshot {
        let name_of = |id: ActionId| {
            self.actions
                .get(id)
                .map_or_else(|| format!("<removed {}>", id.0), |action| action.name().to_owned())
        };
        PlannerSnapshot {
            agent: self.agent,
            state: self.state,
            goals: self
                .goals
                .iter()
                .enumerate()
                .map(|(index, goal)| GoalSnapshot {
                    name: goal.name().to_owned(),
                    valid: goal.is_valid(),
                    insistence: goal.insistence(),
                    current: self.current_goal == Some(GoalId(index as u32)),
                })
                .collect(),
            world: self
                .world
                .iter()
                .map(|(key, value)| WorldValue {
                    key: key.name().to_owned(),
                    value,
                })
                .collect(),
            actions: self
                .actions
                .iter()
                .map(|(_, action)| action.name().to_owned())
                .collect(),
            plan: self.plan.iter().map(name_of).collect(),
            predictions: self
                .predicted
                .iter()
                .map(|(key, &value)| WorldValue {
                    key: key.name().to_owned(),
                    value,
                })
                .collect(),
        }
    }

    fn notify_goals(&mut self) {
        self.world_changed = false;
        for goal in &mut self.goals {
            goal.on_world_state_changed(&self.world);
        }

        let top = self.ranked_goals().first().copied();
        let reprioritized = top != self.top_goal;
        self.top_goal = top;
        if reprioritized
            && self.config.reprioritize_on_world_change
            && self.is_running_plan()
            && top != self.current_goal
        {
            tracing::debug!(agent = self.agent, "top goal changed; replanning");
            self.request_replan();
        }
    }

    /// Goals worth pursuing, most insistent first.
    fn ranked_goals(&self) -> Vec<GoalId> {
        let mut heap: BinaryHeap<RankedGoal> = self
            .goals
            .iter()
            .enumerate()
            .filter(|(_, goal)| {
                goal.is_valid() && goal.insistence() > 0.0 && !self.world.all_match(goal.condition())
            })
            .map(|(index, goal)| RankedGoal {
                insistence: goal.insistence(),
                id: GoalId(index as u32),
            })
            .collect();
        std::iter::from_fn(|| heap.pop()).map(|ranked| ranked.id).collect()
    }

    fn replan(&mut self) {
        self.replan_requested = false;
        let tick = self.last_tick.tick;

        for goal_id in self.ranked_goals() {
            if self.is_running_plan() && self.current_goal == Some(goal_id) {
                tracing::trace!(agent = self.agent, goal = goal_id.0, "current plan still best");
                trace_emit(
                    &mut self.blackboard,
                    TraceEvent::new(tick, "goap.plan.keep").with_a(u64::from(goal_id.0)),
                );
                return;
            }

            let Some(goal) = self.goals.get(goal_id.index()) else {
                continue;
            };
            let name = goal.name().to_owned();
            trace_emit(
                &mut self.blackboard,
                TraceEvent::new(tick, "goap.plan.call")
                    .with_a(u64::from(goal_id.0))
                    .with_label(name.clone()),
            );

            let ctx = ActionContext {
                tick: self.last_tick,
                agent: self.agent,
                world: &self.world,
                blackboard: &mut self.blackboard,
            };
            let result = self
                .search
                .plan(&name, goal.condition(), &self.actions, &self.edges, &ctx);

            let found = match result {
                Ok(found) => found,
                Err(err) => {
                    tracing::debug!(agent = self.agent, error = %err, "goal skipped");
                    trace_emit(
                        &mut self.blackboard,
                        TraceEvent::new(tick, "goap.plan.result")
                            .with_a(u64::from(goal_id.0))
                            .with_b(0)
                            .with_label(name),
                    );
                    continue;
                }
            };

            trace_emit(
                &mut self.blackboard,
                TraceEvent::new(tick, "goap.plan.result")
                    .with_a(u64::from(goal_id.0))
                    .with_b(found.steps.len() as u64)
                    .with_label(name.clone()),
            );
            self.commit_plan(goal_id, name, found);
            return;
        }

        if self.is_running_plan() {
            self.abort_plan();
        }
        trace_emit(&mut self.blackboard, TraceEvent::new(tick, "goap.plan.none"));
        if self.warned_idle {
            tracing::debug!(agent = self.agent, "no active goal can be satisfied");
        } else {
            tracing::warn!(agent = self.agent, "no active goal can be satisfied");
            self.warned_idle = true;
        }
    }

    fn commit_plan(&mut self, goal_id: GoalId, name: String, found: SearchPlan) {
        tracing::info!(
            agent = self.agent,
            goal = %name,
            steps = found.steps.len(),
            cost = found.cost,
            "plan committed"
        );
        trace_emit(
            &mut self.blackboard,
            TraceEvent::new(self.last_tick.tick, "goap.plan.start")
                .with_a(u64::from(goal_id.0))
                .with_b(found.steps.len() as u64)
                .with_label(name),
        );

        if matches!(
            self.state,
            PlannerState::PlanRunning | PlannerState::ActionActive
        ) {
            self.abort_plan();
        }
        self.load_plan(found.steps);
        self.current_goal = Some(goal_id);
        self.warned_idle = false;
    }

    /// Install `steps` as the plan. Behind a still-aborting head they queue up and start once
    /// the abort is acknowledged.
    fn load_plan(&mut self, steps: Vec<ActionId>) {
        if self.state == PlannerState::ActionAborting {
            self.plan.clear(true);
            for step in steps {
                self.plan.add_step(step);
            }
        } else {
            self.plan.start_new_plan(steps);
            self.state = PlannerState::PlanRunning;
            self.execution_update_requested = true;
        }
        debug_assert!(self.plan.check_invariants().is_ok());
    }

    fn update_execution(&mut self) {
        self.execution_update_requested = false;
        if self.state != PlannerState::PlanRunning {
            return;
        }

        let Some(id) = self.plan.current() else {
            tracing::debug!(agent = self.agent, "plan complete");
            trace_emit(
                &mut self.blackboard,
                TraceEvent::new(self.last_tick.tick, "goap.plan.complete")
                    .with_a(self.current_goal.map_or(u64::MAX, |goal| u64::from(goal.0))),
            );
            self.plan.clear(false);
            self.predicted.clear();
            self.current_goal = None;
            self.state = PlannerState::Idle;
            self.request_replan();
            return;
        };

        let Some(action) = self.actions.get(id) else {
            let err = PlanError::DanglingEdgeReference { action: id };
            tracing::warn!(agent = self.agent, error = %err, "plan step no longer exists");
            self.abort_plan();
            self.request_replan();
            return;
        };

        if !action.validate_preconditions(&self.world) {
            let err = PlanError::PreconditionViolation {
                action: action.name().to_owned(),
            };
            tracing::info!(agent = self.agent, error = %err, "plan step is no longer valid");
            self.emit_action("goap.precondition.violation", id);
            self.abort_plan();
            self.request_replan();
            return;
        }

        let mut scratch = self.world.clone();
        for effect in action.def().effects() {
            scratch.apply_effect(effect);
        }
        for effect in action.def().effects().iter().filter(|effect| effect.expected) {
            self.predicted.insert(effect.key, scratch.get(effect.key));
        }

        let run = self.next_run;
        self.next_run += 1;
        self.active_run = Some((id, run));
        self.state = PlannerState::ActionActive;
        self.emit_action("goap.action.start", id);

        let finish = self.completions.sender().handle(id, run);
        let mut ctx = ActionContext {
            tick: self.last_tick,
            agent: self.agent,
            world: &self.world,
            blackboard: &mut self.blackboard,
        };
        let result = match self.actions.get_mut(id) {
            Some(action) => action.start(&mut ctx, finish),
            None => StartResult::Failed,
        };

        match result {
            StartResult::Running => {}
            StartResult::Success => self.on_completion(Completion {
                action: id,
                run,
                outcome: ActionOutcome::Success,
            }),
            StartResult::Failed => {
                tracing::info!(agent = self.agent, action = id.0, "action failed to start");
                self.emit_action("goap.action.failure", id);
                self.active_run = None;
                self.state = PlannerState::PlanRunning;
                self.abort_plan();
                self.request_replan();
            }
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        if self.active_run != Some((completion.action, completion.run)) {
            tracing::debug!(
                agent = self.agent,
                action = completion.action.0,
                run = completion.run,
                "ignoring stale completion"
            );
            return;
        }
        let id = completion.action;
        self.active_run = None;

        if self.state == PlannerState::ActionAborting {
            self.emit_action("goap.action.aborted", id);
            self.plan.advance();
            self.resume_after_step();
            return;
        }

        match completion.outcome {
            ActionOutcome::Success => {
                self.emit_action("goap.action.success", id);
                if let Some(action) = self.actions.get(id) {
                    for effect in action.def().effects().iter().filter(|e| !e.expected) {
                        if self.world.apply_effect(effect) {
                            self.world_changed = true;
                        }
                    }
                }
                if self.world_changed {
                    self.notify_goals();
                }
                self.plan.advance();
                self.state = PlannerState::PlanRunning;
                self.execution_update_requested = true;
            }
            ActionOutcome::Aborted => {
                self.emit_action("goap.action.aborted", id);
                self.predicted.clear();
                self.plan.advance();
                self.state = PlannerState::PlanRunning;
                self.execution_update_requested = true;
            }
            ActionOutcome::Failure => {
                tracing::info!(agent = self.agent, action = id.0, "action failed");
                self.emit_action("goap.action.failure", id);
                self.state = PlannerState::PlanRunning;
                self.abort_plan();
                self.request_replan();
            }
        }
    }

    /// After an aborted head is gone: continue with whatever plan was queued behind it.
    fn resume_after_step(&mut self) {
        if self.plan.is_empty() {
            self.plan.clear(false);
            self.state = PlannerState::Idle;
        } else {
            self.state = PlannerState::PlanRunning;
            self.execution_update_requested = true;
        }
    }

    fn emit_action(&mut self, tag: &'static str, id: ActionId) {
        let name = self
            .actions
            .get(id)
            .map(|action| action.name().to_owned())
            .unwrap_or_default();
        trace_emit(
            &mut self.blackboard,
            TraceEvent::new(self.last_tick.tick, tag)
                .with_a(u64::from(id.0))
                .with_label(name),
        );
    }
}
