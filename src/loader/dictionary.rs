use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::runtime::object::ObjectRef;

/// What the session knows about one compiled function.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub parameters: Vec<String>,
    function: Option<ObjectRef>,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, parameters: &[&str]) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            function: None,
        }
    }

    /// The function object, once a unit for this descriptor was loaded.
    pub fn function(&self) -> Option<&ObjectRef> {
        self.function.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.function.is_some()
    }
}

/// Session-wide table from function identifiers to descriptors.
///
/// Shared by `Rc` between the compiler side, the loader and every loaded
/// unit. Units resolve calls through it at execution time, so a unit may
/// reference a function whose own unit is loaded later.
#[derive(Debug, Default)]
pub struct Dictionary {
    entries: RefCell<HashMap<String, FunctionDescriptor>>,
}

impl Dictionary {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Records what the compiler knows about `id` before its unit exists.
    ///
    /// Replaces an earlier declaration that was not loaded yet. Once `id` is
    /// bound to a function the entry is left untouched and `false` is
    /// returned.
    pub fn declare(&self, id: &str, descriptor: FunctionDescriptor) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.get(id).is_some_and(FunctionDescriptor::is_loaded) {
            return false;
        }
        entries.insert(
            id.to_string(),
            FunctionDescriptor {
                function: None,
                ..descriptor
            },
        );
        true
    }

    pub fn descriptor(&self, id: &str) -> Option<FunctionDescriptor> {
        self.entries.borrow().get(id).cloned()
    }

    /// The loaded function object for `id`, if any.
    pub fn resolve(&self, id: &str) -> Option<ObjectRef> {
        self.entries
            .borrow()
            .get(id)
            .and_then(|descriptor| descriptor.function.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.borrow().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Identifiers in sorted order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn bind(&self, id: &str, name: &str, parameters: &[String], function: ObjectRef) {
        let mut entries = self.entries.borrow_mut();
        let descriptor = entries
            .entry(id.to_string())
            .or_insert_with(|| FunctionDescriptor {
                name: name.to_string(),
                parameters: parameters.to_vec(),
                function: None,
            });
        descriptor.function = Some(function);
    }
}
