use std::borrow::Cow;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Blackboard, SymEffect, TickContext, WorldKey, WorldProperty, WorldState};

/// Result of [`Action::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StartResult {
    /// Finished synchronously.
    Success,
    /// Will finish later through its [`FinishHandle`].
    Running,
    Failed,
}

/// Result of [`Action::abort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AbortResult {
    Aborted,
    /// The abort is asynchronous; an [`ActionOutcome::Aborted`] completion follows.
    Running,
}

/// Terminal outcome of one action run, delivered through the completion channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActionOutcome {
    Success,
    Failure,
    Aborted,
}

/// Stable identifier of an action inside one agent's action set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActionId(pub u32);

impl ActionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declarative part of an action: what the planner reasons about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDef<K> {
    name: Cow<'static, str>,
    cost: u32,
    preconditions: Vec<WorldProperty<K>>,
    effects: Vec<SymEffect<K>>,
}

impl<K: WorldKey> ActionDef<K> {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            cost: 1,
            preconditions: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_precondition(mut self, key: K, value: u8) -> Self {
        self.preconditions.push(WorldProperty::new(key, value));
        self
    }

    pub fn with_effect(mut self, effect: SymEffect<K>) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn preconditions(&self) -> &[WorldProperty<K>] {
        &self.preconditions
    }

    pub fn effects(&self) -> &[SymEffect<K>] {
        &self.effects
    }

    /// Whether any effect writes `key`.
    pub fn affects(&self, key: K) -> bool {
        self.effects.iter().any(|effect| effect.key == key)
    }
}

/// What an action sees when it is checked, started, ticked or aborted.
///
/// The world state is read-only: actions change the world only through their declared effects.
pub struct ActionContext<'a, K: WorldKey> {
    pub tick: TickContext,
    pub agent: u64,
    pub world: &'a WorldState<K>,
    pub blackboard: &'a mut Blackboard,
}

pub trait Action<K: WorldKey>: 'static {
    fn def(&self) -> &ActionDef<K>;

    fn name(&self) -> &str {
        self.def().name()
    }

    /// Run-time check beyond the symbolic model (targets, cooldowns, cached queries).
    ///
    /// Must not have side effects visible to the search. Defaults to `false` so an action that
    /// never says otherwise is never scheduled.
    fn verify_context(&self, _ctx: &ActionContext<'_, K>) -> bool {
        false
    }

    fn validate_preconditions(&self, world: &WorldState<K>) -> bool {
        world.all_match(self.def().preconditions())
    }

    fn start(&mut self, ctx: &mut ActionContext<'_, K>, finish: FinishHandle) -> StartResult;

    /// Called once per planner tick while this action is the active step.
    fn tick(&mut self, _ctx: &mut ActionContext<'_, K>) {}

    fn abort(&mut self, _ctx: &mut ActionContext<'_, K>) -> AbortResult {
        AbortResult::Aborted
    }
}

/// A finish signal from one action run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub action: ActionId,
    pub run: u64,
    pub outcome: ActionOutcome,
}

/// Capability to report the outcome of one action run.
///
/// Finishing consumes the handle, so a run reports at most once. The handle is `Send`: work that
/// completes on another thread can carry it there.
#[derive(Debug)]
pub struct FinishHandle {
    action: ActionId,
    run: u64,
    tx: Sender<Completion>,
}

impl FinishHandle {
    pub fn action(&self) -> ActionId {
        self.action
    }

    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn finish(self, outcome: ActionOutcome) {
        // A closed receiver means the planner is gone; nobody is left to tell.
        let _ = self.tx.send(Completion {
            action: self.action,
            run: self.run,
            outcome,
        });
    }

    pub fn succeed(self) {
        self.finish(ActionOutcome::Success);
    }

    pub fn fail(self) {
        self.finish(ActionOutcome::Failure);
    }

    pub fn aborted(self) {
        self.finish(ActionOutcome::Aborted);
    }
}

/// Cloneable sending side of a [`CompletionQueue`].
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: Sender<Completion>,
}

impl CompletionSender {
    pub fn handle(&self, action: ActionId, run: u64) -> FinishHandle {
        FinishHandle {
            action,
            run,
            tx: self.tx.clone(),
        }
    }
}

/// Receiving side of the completion channel, drained by the control loop.
#[derive(Debug)]
pub struct CompletionQueue {
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl CompletionQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> CompletionSender {
        CompletionSender {
            tx: self.tx.clone(),
        }
    }

    pub fn try_next(&self) -> Option<Completion> {
        match self.rx.try_recv() {
            Ok(completion) => Some(completion),
            // The queue owns a sender, so it can never observe a disconnect.
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn drain(&self) -> Vec<Completion> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}
