use std::borrow::Cow;

use goap_core::{TickContext, WorldKey, WorldProperty, WorldState};

/// Writes collected from sensors during one tick.
///
/// The planner applies them in order through
/// [`Planner::set_world_property`](crate::Planner::set_world_property), so sensor writes are
/// checked against pending predictions like any other external write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorWrites<K> {
    writes: Vec<WorldProperty<K>>,
}

impl<K: WorldKey> SensorWrites<K> {
    pub fn new() -> Self {
        Self { writes: Vec::new() }
    }

    pub fn write(&mut self, key: K, value: u8) {
        self.writes.push(WorldProperty::new(key, value));
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = WorldProperty<K>> + '_ {
        self.writes.drain(..)
    }
}

impl<K: WorldKey> Default for SensorWrites<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Sensor<K: WorldKey>: 'static {
    fn name(&self) -> &str;

    fn tick(&mut self, ctx: &TickContext, world: &WorldState<K>, out: &mut SensorWrites<K>);
}

type SenseFn<K> = Box<dyn FnMut(&TickContext, &WorldState<K>, &mut SensorWrites<K>)>;

/// A sensor backed by a closure.
pub struct FnSensor<K: WorldKey> {
    name: Cow<'static, str>,
    sense: SenseFn<K>,
}

impl<K: WorldKey> FnSensor<K> {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        sense: impl FnMut(&TickContext, &WorldState<K>, &mut SensorWrites<K>) + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            sense: Box::new(sense),
        }
    }
}

impl<K: WorldKey> Sensor<K> for FnSensor<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, ctx: &TickContext, world: &WorldState<K>, out: &mut SensorWrites<K>) {
        (self.sense)(ctx, world, out);
    }
}
