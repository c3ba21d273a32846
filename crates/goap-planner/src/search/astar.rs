use core::cmp::Ordering;
use std::collections::BinaryHeap;

use goap_core::{ActionContext, ActionId, WorldKey, WorldProperty};

use super::node::{NodeId, NodePool, RegressionState, SearchNode};
use crate::registry::{ActionSet, EdgeTable};
use crate::PlanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// No plan longer than this is ever returned.
    pub max_plan_length: usize,
    pub max_expansions: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_plan_length: 8,
            max_expansions: 4096,
        }
    }
}

/// Ordered action ids, earliest-executed first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub steps: Vec<ActionId>,
    pub cost: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub expanded: usize,
    pub generated: usize,
    pub reparented: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    seq: u64,
    node: NodeId,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap behave like a min-heap; equal f pops FIFO.
        (other.f, other.seq).cmp(&(self.f, self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reusable regressive A* search.
///
/// The node pool survives a run so callers (and tests) can inspect what was explored; it is
/// cleared at the start of the next run.
#[derive(Debug)]
pub struct RegressiveSearch<K: WorldKey> {
    limits: SearchLimits,
    pool: NodePool<K>,
    stats: SearchStats,
}

impl<K: WorldKey> RegressiveSearch<K> {
    pub fn new(limits: SearchLimits) -> Self {
        Self {
            limits,
            pool: NodePool::new(),
            stats: SearchStats::default(),
        }
    }

    pub fn limits(&self) -> SearchLimits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: SearchLimits) {
        self.limits = limits;
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn pool(&self) -> &NodePool<K> {
        &self.pool
    }

    /// Find the cheapest action sequence that takes `ctx.world` to a state satisfying
    /// `condition`.
    ///
    /// `ctx` is what candidate actions see in [`Action::verify_context`](goap_core::Action);
    /// its world is the initial state of the search.
    pub fn plan(
        &mut self,
        goal: &str,
        condition: &[WorldProperty<K>],
        actions: &ActionSet<K>,
        edges: &EdgeTable<K>,
        ctx: &ActionContext<'_, K>,
    ) -> Result<SearchPlan, PlanError> {
        self.pool.clear();
        self.stats = SearchStats::default();
        let exhausted = || PlanError::SearchExhausted {
            goal: goal.to_owned(),
        };

        let Some(root) = RegressionState::from_condition(condition) else {
            tracing::debug!(goal, "goal condition contradicts itself");
            return Err(exhausted());
        };

        let world = ctx.world;
        let mut open = BinaryHeap::<OpenEntry>::new();
        let mut seq: u64 = 0;
        let mut push = |open: &mut BinaryHeap<OpenEntry>, node: NodeId, f: u32| {
            open.push(OpenEntry { f, seq, node });
            seq += 1;
        };

        let h = root.unsatisfied_in(world) as u32;
        let root_id = self.pool.insert(SearchNode {
            state: root,
            depth: 0,
            g: 0,
            h,
            parent: None,
            action: None,
            open: true,
            expanded: false,
        });
        push(&mut open, root_id, h);

        let mut candidates: Vec<ActionId> = Vec::new();

        while let Some(entry) = open.pop() {
            let Some(node) = self.pool.get_mut(entry.node) else {
                continue;
            };
            if !node.open || node.f() != entry.f {
                continue; // stale heap entry
            }
            node.open = false;
            let (h, depth, parent_g) = (node.h, node.depth, node.g);

            if h == 0 {
                return Ok(self.reconstruct(entry.node));
            }

            if depth >= self.limits.max_plan_length {
                continue;
            }
            if self.stats.expanded >= self.limits.max_expansions {
                tracing::debug!(
                    goal,
                    expansions = self.stats.expanded,
                    "search hit the expansion budget"
                );
                return Err(exhausted());
            }
            self.stats.expanded += 1;

            let Some(parent_state) = self.pool.get_mut(entry.node).map(|n| {
                n.expanded = true;
                n.state.clone()
            }) else {
                continue;
            };
            let child_depth = depth + 1;

            candidates.clear();
            for key in parent_state.unsatisfied_keys(world) {
                for &id in edges.producers(key) {
                    if !candidates.contains(&id) {
                        candidates.push(id);
                    }
                }
            }

            for &action_id in &candidates {
                let Some(action) = actions.get(action_id) else {
                    let err = PlanError::DanglingEdgeReference { action: action_id };
                    tracing::warn!(goal, error = %err, "skipping dangling edge");
                    continue;
                };
                if !action.verify_context(ctx) {
                    continue;
                }
                let Some(child) = parent_state.regress(action.def()) else {
                    continue;
                };
                if child == parent_state {
                    continue; // no progress
                }
                self.stats.generated += 1;

                let g = parent_g.saturating_add(action.def().cost());
                match self.pool.find(&child) {
                    Some(existing) => {
                        let Some(known) = self.pool.get_mut(existing) else {
                            continue;
                        };
                        if g >= known.g {
                            continue;
                        }
                        // A deeper route must not strand the node (or nodes already built on
                        // it) beyond the depth bound.
                        if child_depth > known.depth
                            && (known.expanded
                                || (known.h > 0 && child_depth >= self.limits.max_plan_length))
                        {
                            continue;
                        }
                        known.g = g;
                        known.depth = child_depth;
                        known.parent = Some(entry.node);
                        known.action = Some(action_id);
                        known.open = true;
                        self.stats.reparented += 1;
                        let f = known.f();
                        push(&mut open, existing, f);
                    }
                    None => {
                        let h = child.unsatisfied_in(world) as u32;
                        let id = self.pool.insert(SearchNode {
                            state: child,
                            depth: child_depth,
                            g,
                            h,
                            parent: Some(entry.node),
                            action: Some(action_id),
                            open: true,
                            expanded: false,
                        });
                        push(&mut open, id, g.saturating_add(h));
                    }
                }
            }
        }

        tracing::debug!(goal, expanded = self.stats.expanded, "open set exhausted");
        Err(exhausted())
    }

    /// Walk parent links from the node that holds in the initial world back to the goal.
    ///
    /// That node describes the earliest point in time, so the walk already yields actions in
    /// execution order. Re-parenting never deepens a node with descendants, so a stored depth
    /// never understates the real path length and the walk stays within the bound.
    fn reconstruct(&self, from: NodeId) -> SearchPlan {
        let mut steps = Vec::new();
        let mut cost = 0;
        let mut next = self.pool.get(from);
        if let Some(start) = next {
            steps.reserve(start.depth);
            cost = start.g;
        }
        while let Some(node) = next {
            let (Some(action), Some(parent)) = (node.action, node.parent) else {
                break;
            };
            steps.push(action);
            next = self.pool.get(parent);
        }
        debug_assert!(steps.len() <= self.limits.max_plan_length);
        SearchPlan { steps, cost }
    }
}

impl<K: WorldKey> Default for RegressiveSearch<K> {
    fn default() -> Self {
        Self::new(SearchLimits::default())
    }
}
