use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// Typed key into an agent's [`Blackboard`].
///
/// The name is only used in diagnostics; identity is the numeric id.
#[derive(Debug)]
pub struct BbKey<T: 'static> {
    id: u64,
    name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(id: u64, name: &'static str) -> Self {
        Self {
            id,
            name,
            _phantom: PhantomData,
        }
    }

    pub fn id(self) -> u64 {
        self.id
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

/// Per-agent run-time memory that lives outside the symbolic world state.
///
/// Context checks read cached targets, cooldowns and query results from here; tooling stores its
/// trace log and sink here. Every write bumps [`revision`](Self::revision) so callers can tell
/// whether anything changed since they last looked.
#[derive(Default)]
pub struct Blackboard {
    values: BTreeMap<u64, Box<dyn Any>>,
    revision: u64,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn contains<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.values.contains_key(&key.id)
    }

    pub fn set<T: 'static>(&mut self, key: BbKey<T>, value: T) {
        self.values.insert(key.id, Box::new(value));
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn get<T: 'static>(&self, key: BbKey<T>) -> Option<&T> {
        let value = self.values.get(&key.id)?;
        Some(value.downcast_ref::<T>().unwrap_or_else(|| mismatch(key)))
    }

    pub fn get_copied<T: Copy + 'static>(&self, key: BbKey<T>) -> Option<T> {
        self.get(key).copied()
    }

    pub fn get_mut<T: 'static>(&mut self, key: BbKey<T>) -> Option<&mut T> {
        let value = self.values.get_mut(&key.id)?;
        self.revision = self.revision.wrapping_add(1);
        Some(value.downcast_mut::<T>().unwrap_or_else(|| mismatch(key)))
    }

    pub fn get_or_insert_with<T: 'static>(&mut self, key: BbKey<T>, make: impl FnOnce() -> T) -> &mut T {
        self.revision = self.revision.wrapping_add(1);
        self.values
            .entry(key.id)
            .or_insert_with(|| Box::new(make()))
            .downcast_mut::<T>()
            .unwrap_or_else(|| mismatch(key))
    }

    pub fn remove<T: 'static>(&mut self, key: BbKey<T>) -> Option<T> {
        let value = self.values.remove(&key.id)?;
        self.revision = self.revision.wrapping_add(1);
        Some(*value.downcast::<T>().unwrap_or_else(|_| mismatch(key)))
    }
}

fn mismatch<T: 'static>(key: BbKey<T>) -> ! {
    panic!(
        "blackboard type mismatch for key {} (id={}): stored type differs from requested",
        key.name, key.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: BbKey<u32> = BbKey::new(1, "target");
    const LABEL: BbKey<String> = BbKey::new(2, "label");

    #[test]
    fn set_get_remove_roundtrip() {
        let mut bb = Blackboard::new();
        assert!(!bb.contains(TARGET));

        bb.set(TARGET, 7);
        bb.set(LABEL, "cover".to_string());
        assert_eq!(bb.get_copied(TARGET), Some(7));
        assert_eq!(bb.get(LABEL).map(String::as_str), Some("cover"));

        assert_eq!(bb.remove(TARGET), Some(7));
        assert_eq!(bb.get(TARGET), None);
    }

    #[test]
    fn writes_bump_revision() {
        let mut bb = Blackboard::new();
        let start = bb.revision();
        bb.set(TARGET, 1);
        assert!(bb.revision() > start);

        let before = bb.revision();
        let _ = bb.get(TARGET);
        assert_eq!(bb.revision(), before);

        *bb.get_or_insert_with(TARGET, || 0) += 1;
        assert_eq!(bb.get_copied(TARGET), Some(2));
        assert!(bb.revision() > before);
    }

    #[test]
    #[should_panic(expected = "blackboard type mismatch for key target")]
    fn type_mismatch_panics_with_key_name() {
        let mut bb = Blackboard::new();
        bb.set(TARGET, 1);
        let _ = bb.get(BbKey::<i64>::new(1, "target"));
    }
}
