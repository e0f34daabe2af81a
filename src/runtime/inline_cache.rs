use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use tracing::trace;

use crate::runtime::{
    layout::Layout,
    object::{JsObject, ObjectRef},
    token::Token,
    value::Value,
};

/// Monomorphic property cache for one call site reading one key.
///
/// - Own property: guarded by the receiver's layout identity alone. Layouts
///   never change, so "same layout" means "same slot".
/// - Inherited property or miss: guarded by receiver identity plus the
///   tokens of every object walked before the holder (the receiver
///   included). Registering the key on any of them invalidates a token and
///   forces a fresh lookup.
pub struct LookupCache {
    key: Rc<str>,
    entry: RefCell<Option<CacheEntry>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

enum CacheEntry {
    Own {
        layout: Rc<Layout>,
        slot: usize,
    },
    Inherited {
        receiver: Weak<JsObject>,
        guards: Vec<Token>,
        holder: ObjectRef,
        slot: usize,
    },
    Absent {
        receiver: Weak<JsObject>,
        guards: Vec<Token>,
    },
}

impl CacheEntry {
    fn probe(&self, receiver: &ObjectRef) -> Option<Value> {
        match self {
            CacheEntry::Own { layout, slot } => {
                let store = receiver.store();
                Rc::ptr_eq(store.layout(), layout).then(|| store.fast_access(*slot).clone())
            }
            CacheEntry::Inherited {
                receiver: cached,
                guards,
                holder,
                slot,
            } => (same_receiver(cached, receiver) && guards.iter().all(Token::is_valid))
                .then(|| holder.fast_access(*slot)),
            CacheEntry::Absent {
                receiver: cached,
                guards,
            } => (same_receiver(cached, receiver) && guards.iter().all(Token::is_valid))
                .then_some(Value::UNDEFINED),
        }
    }
}

// The weak reference keeps the allocation alive, so a matching address is
// the same object.
fn same_receiver(cached: &Weak<JsObject>, receiver: &ObjectRef) -> bool {
    std::ptr::eq(cached.as_ptr(), Rc::as_ptr(receiver))
}

impl LookupCache {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.into(),
            entry: RefCell::new(None),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Same result as `receiver.lookup(key)`, served from the cache when the
    /// guards still hold.
    pub fn lookup(&self, receiver: &ObjectRef) -> Value {
        if let Some(value) = self
            .entry
            .borrow()
            .as_ref()
            .and_then(|entry| entry.probe(receiver))
        {
            self.hits.set(self.hits.get() + 1);
            return value;
        }

        self.misses.set(self.misses.get() + 1);
        trace!(key = %self.key, receiver = receiver.name(), "lookup cache miss");
        let (value, entry) = self.resolve(receiver);
        *self.entry.borrow_mut() = Some(entry);
        value
    }

    fn resolve(&self, receiver: &ObjectRef) -> (Value, CacheEntry) {
        let mut guards = Vec::new();
        let mut current = Rc::clone(receiver);
        loop {
            let slot = current.store().layout().slot_of(&self.key);
            if let Some(slot) = slot {
                let value = current.fast_access(slot);
                let entry = if Rc::ptr_eq(&current, receiver) {
                    CacheEntry::Own {
                        layout: current.layout(),
                        slot,
                    }
                } else {
                    CacheEntry::Inherited {
                        receiver: Rc::downgrade(receiver),
                        guards,
                        holder: current,
                        slot,
                    }
                };
                return (value, entry);
            }

            guards.push(current.token());
            let next = match current.proto() {
                Some(proto) => Rc::clone(proto),
                None => {
                    let entry = CacheEntry::Absent {
                        receiver: Rc::downgrade(receiver),
                        guards,
                    };
                    return (Value::UNDEFINED, entry);
                }
            };
            current = next;
        }
    }

    /// Drops the cached decision.
    pub fn reset(&self) {
        self.entry.borrow_mut().take();
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }
}
