use std::cell::{Cell, RefCell};

use serde_json::Value;

use crate::{
    domain::State,
    storage::{Store, StoreError},
};

/// An in-process store.
///
/// Can be made unavailable to simulate a remote that cannot be reached.
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: RefCell<Option<Value>>,
    unavailable: Cell<bool>,
    saves: Cell<usize>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with a raw state document.
    #[must_use]
    pub fn with_value(value: Value) -> Self {
        Self {
            value: RefCell::new(Some(value)),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    /// The raw document currently held.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.value.borrow().clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.get()
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Option<Value> {
        self.value()
    }

    fn save(&self, state: &State) -> Result<(), StoreError> {
        if self.unavailable.get() {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        *self.value.borrow_mut() = Some(serde_json::to_value(state)?);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
