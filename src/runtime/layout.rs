//! Shared, immutable shape descriptors.
//!
//! A [`Layout`] is the ordered list of property names an object currently
//! has, each mapped to the slot index its value occupies. Layouts form a
//! transition tree rooted at the empty layout:
//!
//! ```text
//!     [empty]
//!       | + "x"
//!     [x]
//!       | + "y"          + "z"
//!     [x, y]   <---------------- [x] ----> [x, z]
//! ```
//!
//! Adding a key to a layout always yields the child for that key, creating
//! it on first use. Two objects that register the same keys in the same
//! order therefore end up sharing the same `Rc<Layout>`, and a call site can
//! check "same shape as last time" with a single pointer comparison.
//!
//! Children hold their parent strongly and parents hold children weakly, so
//! a layout lives exactly as long as some store or descendant uses it. A
//! dropped layout unlinks itself from its parent's transition table.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use crate::runtime::leak_detector;

pub struct Layout {
    keys: Vec<Rc<str>>,
    slots: HashMap<Rc<str>, usize>,
    parent: Option<Rc<Layout>>,
    transitions: RefCell<HashMap<Rc<str>, Weak<Layout>>>,
}

thread_local! {
    static EMPTY_LAYOUT: Rc<Layout> = Rc::new(Layout::root());
}

impl Layout {
    fn root() -> Self {
        leak_detector::record_layout();
        Self {
            keys: Vec::new(),
            slots: HashMap::new(),
            parent: None,
            transitions: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the shared empty layout every fresh store starts from.
    pub fn empty() -> Rc<Layout> {
        EMPTY_LAYOUT.with(Rc::clone)
    }

    /// Returns the layout with `key` appended after the current keys.
    ///
    /// While the child is alive, repeated transitions with the same key
    /// return the identical `Rc`. `key` must not already be present.
    pub fn with_key(self: &Rc<Self>, key: &str) -> Rc<Layout> {
        debug_assert!(!self.slots.contains_key(key), "key already in layout");

        let cached = self.transitions.borrow().get(key).and_then(Weak::upgrade);
        if let Some(next) = cached {
            return next;
        }

        leak_detector::record_layout();
        let key: Rc<str> = key.into();
        let mut keys = Vec::with_capacity(self.keys.len() + 1);
        keys.extend(self.keys.iter().cloned());
        keys.push(Rc::clone(&key));
        let mut slots = self.slots.clone();
        slots.insert(Rc::clone(&key), self.keys.len());

        let next = Rc::new(Layout {
            keys,
            slots,
            parent: Some(Rc::clone(self)),
            transitions: RefCell::new(HashMap::new()),
        });
        self.transitions
            .borrow_mut()
            .insert(key, Rc::downgrade(&next));
        next
    }

    /// Number of transitions out of this layout whose child is still alive.
    pub fn transition_count(&self) -> usize {
        self.transitions
            .borrow()
            .values()
            .filter(|child| child.strong_count() > 0)
            .count()
    }

    pub fn slot_of(&self, key: &str) -> Option<usize> {
        self.slots.get(key).copied()
    }

    /// Property names in slot order.
    pub fn keys(&self) -> &[Rc<str>] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl PartialEq for Layout {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl Eq for Layout {}

impl Drop for Layout {
    fn drop(&mut self) {
        let (Some(parent), Some(key)) = (&self.parent, self.keys.last()) else {
            return;
        };
        if let Ok(mut transitions) = parent.transitions.try_borrow_mut() {
            if transitions.get(key).is_some_and(|child| child.strong_count() == 0) {
                transitions.remove(key);
            }
        }
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys.iter()).finish()
    }
}
