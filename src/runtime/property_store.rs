use std::rc::Rc;

use crate::runtime::{layout::Layout, value::Value};

/// Ordered key/value storage owned by one object.
///
/// Keys live in the shared [`Layout`]; values live in a slot vector indexed
/// by the layout's slot numbers. Insertion order is slot order.
#[derive(Debug)]
pub struct PropertyStore {
    layout: Rc<Layout>,
    values: Vec<Value>,
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyStore {
    pub fn new() -> Self {
        Self {
            layout: Layout::empty(),
            values: Vec::new(),
        }
    }

    /// Returns the stored value, or `None` when `key` is absent.
    ///
    /// A stored `Value::Undefined` is returned as `Some`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.layout.slot_of(key).map(|slot| &self.values[slot])
    }

    /// Inserts or overwrites `key`.
    ///
    /// A new key is appended at the next slot and the store moves to the
    /// extended layout. An existing key keeps its slot and the layout is
    /// left untouched.
    pub fn put(&mut self, key: &str, value: Value) {
        match self.layout.slot_of(key) {
            Some(slot) => self.values[slot] = value,
            None => {
                self.layout = self.layout.with_key(key);
                self.values.push(value);
            }
        }
    }

    /// Reads a slot without consulting the layout.
    ///
    /// Only meaningful when the caller already checked that its cached slot
    /// numbering belongs to [`Self::layout`]. Panics when `slot` is past the
    /// last value.
    #[inline]
    pub fn fast_access(&self, slot: usize) -> &Value {
        &self.values[slot]
    }

    pub fn layout(&self) -> &Rc<Layout> {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.layout.keys().iter().zip(self.values.iter())
    }
}

#[cfg(test)]
#[path = "property_store_test.rs"]
mod property_store_test;
