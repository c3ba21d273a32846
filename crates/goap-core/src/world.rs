use core::fmt::Debug;
use core::hash::Hash;
use core::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The fixed symbolic vocabulary of a domain.
///
/// Implement this with [`world_keys!`](crate::world_keys) rather than by hand: the macro keeps
/// `COUNT`, `index` and `from_index` in sync with the enum declaration.
pub trait WorldKey: Copy + Eq + Ord + Hash + Debug + 'static {
    const COUNT: usize;

    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;

    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        (0..Self::COUNT)
            .filter_map(Self::from_index)
            .find(|key| key.name() == name)
    }
}

/// Declare a world key enum and implement [`WorldKey`] for it.
///
/// ```
/// goap_core::world_keys! {
///     pub enum Key {
///         Hunger,
///         HasFood,
///     }
/// }
///
/// use goap_core::WorldKey;
/// assert_eq!(Key::COUNT, 2);
/// assert_eq!(Key::from_name("HasFood"), Some(Key::HasFood));
/// ```
#[macro_export]
macro_rules! world_keys {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::WorldKey for $name {
            const COUNT: usize = [$(stringify!($variant)),+].len();

            fn index(self) -> usize {
                self as usize
            }

            fn from_index(index: usize) -> Option<Self> {
                const ALL: &[$name] = &[$($name::$variant),+];
                ALL.get(index).copied()
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }
    };
}

/// Value every key holds until something writes it.
pub const UNSET: u8 = 0;

/// One value per world key.
///
/// Values are plain `u8`s: booleans are `0`/`1`, small enumerations and clamped counters fit
/// without further encoding. Cloning is a deep copy, which is what the search relies on when it
/// explores hypothetical futures.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct WorldState<K: WorldKey> {
    values: Box<[u8]>,
    _keys: PhantomData<fn() -> K>,
}

impl<K: WorldKey> WorldState<K> {
    pub fn new() -> Self {
        Self {
            values: vec![UNSET; K::COUNT].into_boxed_slice(),
            _keys: PhantomData,
        }
    }

    pub fn from_properties<'a>(properties: impl IntoIterator<Item = &'a WorldProperty<K>>) -> Self {
        let mut state = Self::new();
        for property in properties {
            state.set(property.key, property.value);
        }
        state
    }

    pub fn get(&self, key: K) -> u8 {
        let index = key.index();
        debug_assert!(
            index < K::COUNT,
            "world key {key:?} has index {index} outside the vocabulary of {} keys",
            K::COUNT
        );
        self.values.get(index).copied().unwrap_or(UNSET)
    }

    /// Store `value` under `key`, returning whether the stored value changed.
    pub fn set(&mut self, key: K, value: u8) -> bool {
        let index = key.index();
        debug_assert!(
            index < K::COUNT,
            "world key {key:?} has index {index} outside the vocabulary of {} keys",
            K::COUNT
        );
        match self.values.get_mut(index) {
            Some(slot) if *slot != value => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Apply the forward transform of `effect`, returning whether the value changed.
    pub fn apply_effect(&mut self, effect: &SymEffect<K>) -> bool {
        let next = effect.op.apply(self.get(effect.key));
        self.set(effect.key, next)
    }

    pub fn matches(&self, property: &WorldProperty<K>) -> bool {
        self.get(property.key) == property.value
    }

    pub fn all_match(&self, conditions: &[WorldProperty<K>]) -> bool {
        conditions.iter().all(|property| self.matches(property))
    }

    /// Number of clauses in `conditions` this state does not satisfy.
    pub fn unsatisfied(&self, conditions: &[WorldProperty<K>]) -> usize {
        conditions.iter().filter(|p| !self.matches(p)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, u8)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(index, value)| K::from_index(index).map(|key| (key, *value)))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.values
    }
}

impl<K: WorldKey> Default for WorldState<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: WorldKey> Debug for WorldState<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(key, value)| (key.name(), value)))
            .finish()
    }
}

/// A required `(key, value)` pair: a precondition, or one clause of a goal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldProperty<K> {
    pub key: K,
    pub value: u8,
}

impl<K> WorldProperty<K> {
    pub const fn new(key: K, value: u8) -> Self {
        Self { key, value }
    }
}

/// Forward transform of a symbolic effect.
///
/// Arithmetic wraps so every transform has an exact inverse, which regression needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EffectOp {
    Set(u8),
    Add(u8),
    Sub(u8),
}

/// What a required value looks like before an effect ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regression {
    /// The effect produces the required value from anything.
    Satisfied,
    /// The requirement holds afterwards iff the key held this value before.
    Requires(u8),
    /// The effect can never produce the required value.
    Conflict,
}

impl EffectOp {
    pub fn apply(self, current: u8) -> u8 {
        match self {
            EffectOp::Set(value) => value,
            EffectOp::Add(delta) => current.wrapping_add(delta),
            EffectOp::Sub(delta) => current.wrapping_sub(delta),
        }
    }

    pub fn regress(self, required: u8) -> Regression {
        match self {
            EffectOp::Set(value) if value == required => Regression::Satisfied,
            EffectOp::Set(_) => Regression::Conflict,
            EffectOp::Add(delta) => Regression::Requires(required.wrapping_sub(delta)),
            EffectOp::Sub(delta) => Regression::Requires(required.wrapping_add(delta)),
        }
    }
}

/// A declared effect of an action on one key.
///
/// `expected` effects are confirmed by an outside writer (usually a sensor). The control loop
/// predicts them but leaves the live state alone until the confirming write arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymEffect<K> {
    pub key: K,
    pub op: EffectOp,
    pub expected: bool,
}

impl<K> SymEffect<K> {
    pub const fn new(key: K, op: EffectOp) -> Self {
        Self {
            key,
            op,
            expected: false,
        }
    }

    pub const fn set(key: K, value: u8) -> Self {
        Self::new(key, EffectOp::Set(value))
    }

    pub const fn add(key: K, delta: u8) -> Self {
        Self::new(key, EffectOp::Add(delta))
    }

    pub const fn sub(key: K, delta: u8) -> Self {
        Self::new(key, EffectOp::Sub(delta))
    }

    /// Mark this effect as sensor-confirmed.
    pub const fn expected(mut self) -> Self {
        self.expected = true;
        self
    }
}
