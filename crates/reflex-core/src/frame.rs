use std::collections::BTreeMap;

use crate::Value;

/// Local variable bindings scoped to one behavior instance.
///
/// A frame is populated once when its instance spawns (from precondition
/// bindings and spawn arguments) and read by child steps and leaf actions.
/// Leaf actions may also write locals the template left unbound, e.g.
/// timers that accumulate across ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarFrame {
    vars: BTreeMap<&'static str, Value>,
}

impl VarFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<Value>) {
        self.vars.insert(name, value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate bindings in stable (name) order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.vars.iter().map(|(k, v)| (*k, v))
    }
}
