use core::fmt::Debug;
use core::marker::PhantomData;
use std::collections::HashMap;

use goap_core::{ActionDef, ActionId, Regression, WorldKey, WorldProperty, WorldState};

/// What must hold at one point in time for the rest of the plan to succeed.
///
/// One slot per world key: `Some(v)` requires the key to read `v`, `None` means "don't care".
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RegressionState<K: WorldKey> {
    required: Box<[Option<u8>]>,
    _keys: PhantomData<fn() -> K>,
}

impl<K: WorldKey> RegressionState<K> {
    pub fn unconstrained() -> Self {
        Self {
            required: vec![None; K::COUNT].into_boxed_slice(),
            _keys: PhantomData,
        }
    }

    /// Build the requirement set of a conjunctive condition.
    ///
    /// Returns `None` when the condition asks for two different values of one key.
    pub fn from_condition(condition: &[WorldProperty<K>]) -> Option<Self> {
        let mut state = Self::unconstrained();
        for clause in condition {
            if !state.require(clause.key, clause.value) {
                return None;
            }
        }
        Some(state)
    }

    pub fn required(&self, key: K) -> Option<u8> {
        self.required.get(key.index()).copied().flatten()
    }

    /// Add a clause. Returns `false` if it contradicts an existing one.
    pub fn require(&mut self, key: K, value: u8) -> bool {
        let Some(slot) = self.required.get_mut(key.index()) else {
            debug_assert!(false, "world key {key:?} outside the vocabulary");
            return false;
        };
        match *slot {
            Some(existing) => existing == value,
            None => {
                *slot = Some(value);
                true
            }
        }
    }

    pub fn release(&mut self, key: K) {
        if let Some(slot) = self.required.get_mut(key.index()) {
            *slot = None;
        }
    }

    pub fn clauses(&self) -> impl Iterator<Item = WorldProperty<K>> + '_ {
        self.required.iter().enumerate().filter_map(|(index, slot)| {
            let value = (*slot)?;
            K::from_index(index).map(|key| WorldProperty::new(key, value))
        })
    }

    pub fn clause_count(&self) -> usize {
        self.required.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn unsatisfied_keys<'a>(&'a self, world: &'a WorldState<K>) -> impl Iterator<Item = K> + 'a {
        self.clauses()
            .filter(|clause| !world.matches(clause))
            .map(|clause| clause.key)
    }

    /// Number of clauses `world` does not satisfy. This is the search heuristic.
    pub fn unsatisfied_in(&self, world: &WorldState<K>) -> usize {
        self.unsatisfied_keys(world).count()
    }

    pub fn is_satisfied_by(&self, world: &WorldState<K>) -> bool {
        self.unsatisfied_in(world) == 0
    }

    /// The requirements that must hold before `action` runs for `self` to hold after it.
    ///
    /// Effects are undone last-to-first. `None` if an effect can never produce a required value,
    /// or a precondition contradicts a requirement that survives the effects.
    pub fn regress(&self, action: &ActionDef<K>) -> Option<Self> {
        let mut before = self.clone();
        for effect in action.effects().iter().rev() {
            let Some(required) = before.required(effect.key) else {
                continue;
            };
            match effect.op.regress(required) {
                Regression::Satisfied => before.release(effect.key),
                Regression::Requires(value) => {
                    before.release(effect.key);
                    before.require(effect.key, value);
                }
                Regression::Conflict => return None,
            }
        }
        for precondition in action.preconditions() {
            if !before.require(precondition.key, precondition.value) {
                return None;
            }
        }
        Some(before)
    }
}

impl<K: WorldKey> Debug for RegressionState<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.clauses().map(|clause| (clause.key.name(), clause.value)))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct SearchNode<K: WorldKey> {
    pub state: RegressionState<K>,
    pub depth: usize,
    pub g: u32,
    pub h: u32,
    pub parent: Option<NodeId>,
    /// Action that turns this node's state into the parent's.
    pub action: Option<ActionId>,
    pub open: bool,
    /// Set once the node's children have been generated.
    pub expanded: bool,
}

impl<K: WorldKey> SearchNode<K> {
    pub fn f(&self) -> u32 {
        self.g.saturating_add(self.h)
    }
}

/// Arena of search nodes, deduplicated by regression state.
///
/// A state maps to exactly one node no matter whether that node is open or closed.
#[derive(Debug)]
pub struct NodePool<K: WorldKey> {
    nodes: Vec<SearchNode<K>>,
    index: HashMap<RegressionState<K>, NodeId>,
}

impl<K: WorldKey> NodePool<K> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Drop every node but keep the allocations for the next run.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
    }

    pub fn insert(&mut self, node: SearchNode<K>) -> NodeId {
        debug_assert!(!self.index.contains_key(&node.state), "duplicate search node");
        let id = NodeId(self.nodes.len() as u32);
        self.index.insert(node.state.clone(), id);
        self.nodes.push(node);
        id
    }

    pub fn find(&self, state: &RegressionState<K>) -> Option<NodeId> {
        self.index.get(state).copied()
    }

    pub fn get(&self, id: NodeId) -> Option<&SearchNode<K>> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SearchNode<K>> {
        self.nodes.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SearchNode<K>)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index as u32), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<K: WorldKey> Default for NodePool<K> {
    fn default() -> Self {
        Self::new()
    }
}
