use goap_core::{Action, ActionId, WorldKey};

/// The actions one agent owns, addressed by stable [`ActionId`]s.
///
/// Removing an action leaves a tombstone so ids handed out earlier never alias a different
/// action. An edge table built before the removal still mentions the old id; lookups of it
/// return `None`.
pub struct ActionSet<K: WorldKey> {
    slots: Vec<Option<Box<dyn Action<K>>>>,
}

impl<K: WorldKey> ActionSet<K> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn insert(&mut self, action: Box<dyn Action<K>>) -> ActionId {
        let id = ActionId(self.slots.len() as u32);
        self.slots.push(Some(action));
        id
    }

    pub fn remove(&mut self, id: ActionId) -> Option<Box<dyn Action<K>>> {
        self.slots.get_mut(id.index())?.take()
    }

    pub fn get(&self, id: ActionId) -> Option<&dyn Action<K>> {
        self.slots.get(id.index())?.as_deref()
    }

    pub fn get_mut(&mut self, id: ActionId) -> Option<&mut dyn Action<K>> {
        self.slots.get_mut(id.index())?.as_deref_mut()
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.get(id).is_some()
    }

    /// Live actions, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &dyn Action<K>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| Some((ActionId(index as u32), slot.as_deref()?)))
    }

    pub fn ids(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: WorldKey> Default for ActionSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// World key -> actions with an effect on that key.
///
/// Built from an [`ActionSet`]; per key, ids are in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeTable<K: WorldKey> {
    producers: Vec<Vec<ActionId>>,
    _keys: core::marker::PhantomData<fn() -> K>,
}

impl<K: WorldKey> EdgeTable<K> {
    pub fn new() -> Self {
        Self {
            producers: vec![Vec::new(); K::COUNT],
            _keys: core::marker::PhantomData,
        }
    }

    pub fn build(actions: &ActionSet<K>) -> Self {
        let mut table = Self::new();
        let keys = (0..K::COUNT).filter_map(K::from_index);
        for (list, key) in table.producers.iter_mut().zip(keys) {
            list.extend(
                actions
                    .iter()
                    .filter(|(_, action)| action.def().affects(key))
                    .map(|(id, _)| id),
            );
        }
        table
    }

    pub fn producers(&self, key: K) -> &[ActionId] {
        self.producers
            .get(key.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.producers.iter().map(Vec::len).sum()
    }
}

impl<K: WorldKey> Default for EdgeTable<K> {
    fn default() -> Self {
        Self::new()
    }
}
