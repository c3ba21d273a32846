use goap_core::ActionId;

use crate::PlanError;

/// The active plan: a circular buffer of steps, head first.
///
/// The head is the step that is (or is about to be) running. Appending to a full buffer doubles
/// its capacity.
#[derive(Debug, Clone)]
pub struct PlanInstance<T: Copy = ActionId> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    full: bool,
    running: bool,
}

impl<T: Copy> PlanInstance<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            head: 0,
            tail: 0,
            full: false,
            running: false,
        }
    }

    /// Buffer sized for the longest plan a search with `max_plan_length` returns.
    pub fn for_plan_length(max_plan_length: usize) -> Self {
        Self::with_capacity(max_plan_length.saturating_add(1))
    }

    pub fn start_new_plan(&mut self, steps: impl IntoIterator<Item = T>) {
        self.clear(false);
        for step in steps {
            self.add_step(step);
        }
        self.running = true;
    }

    pub fn add_step(&mut self, step: T) {
        if self.full {
            self.grow();
        }
        self.slots[self.tail] = Some(step);
        self.tail = (self.tail + 1) % self.capacity();
        self.full = self.tail == self.head;
    }

    pub fn current(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.head]
    }

    /// Drop the head step. Returns `true` once nothing is left.
    pub fn advance(&mut self) -> bool {
        if self.is_empty() {
            return true;
        }
        self.slots[self.head] = None;
        self.head = (self.head + 1) % self.capacity();
        self.full = false;
        let drained = self.is_empty();
        if drained {
            self.running = false;
        }
        drained
    }

    pub fn has_reached_end(&self) -> bool {
        self.is_empty()
    }

    /// Drop every step. With `leave_current`, the head survives (its abort is still pending)
    /// and only future steps are discarded.
    pub fn clear(&mut self, leave_current: bool) {
        let keep = if leave_current { self.current() } else { None };
        self.slots.iter_mut().for_each(|slot| *slot = None);
        match keep {
            Some(step) => {
                self.slots[self.head] = Some(step);
                self.tail = (self.head + 1) % self.capacity();
                self.full = self.tail == self.head;
            }
            None => {
                self.head = 0;
                self.tail = 0;
                self.full = false;
                self.running = false;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail && !self.full
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            (self.tail + self.capacity() - self.head) % self.capacity()
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Steps from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let capacity = self.capacity();
        (0..self.len()).filter_map(move |offset| self.slots[(self.head + offset) % capacity])
    }

    /// Every live step sits between head and tail, and nothing else is occupied.
    pub fn check_invariants(&self) -> Result<(), PlanError> {
        let malformed = || PlanError::MalformedPlanBuffer {
            head: self.head,
            tail: self.tail,
            len: self.len(),
        };
        let capacity = self.capacity();
        if self.head >= capacity || self.tail >= capacity {
            return Err(malformed());
        }
        let len = self.len();
        for offset in 0..capacity {
            let occupied = self.slots[(self.head + offset) % capacity].is_some();
            if occupied != (offset < len) {
                return Err(malformed());
            }
        }
        Ok(())
    }

    fn grow(&mut self) {
        let steps: Vec<T> = self.iter().collect();
        let capacity = self.capacity() * 2;
        self.slots = vec![None; capacity];
        for (slot, step) in self.slots.iter_mut().zip(&steps) {
            *slot = Some(*step);
        }
        self.head = 0;
        self.tail = steps.len() % capacity;
        self.full = false;
        debug_assert!(self.check_invariants().is_ok());
    }
}

impl<T: Copy> Default for PlanInstance<T> {
    fn default() -> Self {
        Self::for_plan_length(8)
    }
}
