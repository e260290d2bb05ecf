//! Global name table.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

/// Shared string-to-value table carried across executions.
///
/// The table lives for the lifetime of the owning [`Vm`](crate::Vm); cloning
/// the handle shares the same table, so several executors in one embedding
/// can see the same bindings. Insertion order is preserved, keeping
/// diagnostics deterministic.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    table: Rc<RefCell<IndexMap<String, Value>>>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a binding.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.table.borrow_mut().insert(name.into(), value);
    }

    /// Look up a binding, cloning the stored value.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.table.borrow().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }
}
