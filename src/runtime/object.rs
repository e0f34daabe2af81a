use std::{
    cell::{Ref, RefCell},
    fmt,
    rc::Rc,
};

use crate::runtime::{
    callable::CallableHandle,
    error::RuntimeError,
    layout::Layout,
    leak_detector,
    property_store::PropertyStore,
    token::{Generation, Token},
    value::Value,
};

/// Shared reference to an object. Prototypes, property values and scope
/// chains all hold objects through this type.
pub type ObjectRef = Rc<JsObject>;

/// The single runtime entity behind plain objects, scope frames and
/// functions.
///
/// Instances only come out of [`JsObject::new_object`],
/// [`JsObject::new_env`] and [`JsObject::new_function`], so the
/// name/prototype/handle combination is fixed at birth. The prototype is
/// shared, never exclusively owned.
///
/// Mutation goes through `&self` and is single-writer: the store sits in a
/// `RefCell` and the type is neither `Send` nor `Sync`.
pub struct JsObject {
    proto: Option<ObjectRef>,
    name: String,
    store: RefCell<PropertyStore>,
    generation: Generation,
    handle: CallableHandle,
}

impl JsObject {
    fn with_parts(proto: Option<ObjectRef>, name: String, handle: CallableHandle) -> ObjectRef {
        leak_detector::record_object();
        Rc::new(Self {
            proto,
            name,
            store: RefCell::new(PropertyStore::new()),
            generation: Generation::new(),
            handle,
        })
    }

    /// Plain object delegating to `proto`.
    pub fn new_object(proto: Option<ObjectRef>) -> ObjectRef {
        Self::with_parts(proto, "object".to_string(), CallableHandle::NoInvoker)
    }

    /// Lexical scope frame. Name resolution walks to `parent` through the
    /// ordinary prototype mechanism.
    pub fn new_env(parent: Option<ObjectRef>) -> ObjectRef {
        Self::with_parts(parent, "env".to_string(), CallableHandle::NoInvoker)
    }

    /// Callable object with no prototype.
    ///
    /// The function registers itself under `"apply"`, so `f.apply(...)` and
    /// `f(...)` reach the same handle. That self reference is an `Rc` cycle;
    /// function objects live for as long as the session that made them.
    pub fn new_function(name: &str, handle: CallableHandle) -> ObjectRef {
        leak_detector::record_function();
        let function = Self::with_parts(None, format!("function {}", name), handle);
        function.register("apply", Value::Object(Rc::clone(&function)));
        function
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn proto(&self) -> Option<&ObjectRef> {
        self.proto.as_ref()
    }

    pub fn handle(&self) -> &CallableHandle {
        &self.handle
    }

    /// The currently live invalidation token.
    pub fn token(&self) -> Token {
        self.generation.current()
    }

    pub fn layout(&self) -> Rc<Layout> {
        Rc::clone(self.store.borrow().layout())
    }

    /// Slot read for callers that already validated the layout.
    pub fn fast_access(&self, slot: usize) -> Value {
        self.store.borrow().fast_access(slot).clone()
    }

    pub(crate) fn store(&self) -> Ref<'_, PropertyStore> {
        self.store.borrow()
    }

    /// Number of own properties.
    pub fn length(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn own_keys(&self) -> Vec<Rc<str>> {
        self.store.borrow().layout().keys().to_vec()
    }

    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.store.borrow().get(key).cloned()
    }

    pub(crate) fn own_entries(&self) -> Vec<(Rc<str>, Value)> {
        self.store
            .borrow()
            .iter()
            .map(|(key, value)| (Rc::clone(key), value.clone()))
            .collect()
    }

    /// Resolves `key` on this object, then along the prototype chain.
    ///
    /// Returns [`Value::UNDEFINED`] when no object on the chain binds `key`.
    /// Cyclic chains are not detected.
    pub fn lookup(&self, key: &str) -> Value {
        let mut current = self;
        loop {
            if let Some(value) = current.store.borrow().get(key) {
                return value.clone();
            }
            match &current.proto {
                Some(proto) => current = proto.as_ref(),
                None => return Value::UNDEFINED,
            }
        }
    }

    /// Inserts or overwrites an own property and replaces the invalidation
    /// token, whether or not the layout changed.
    ///
    /// Not thread safe.
    pub fn register(&self, key: &str, value: Value) {
        self.store.borrow_mut().put(key, value);
        self.generation.advance();
    }

    /// Calls this object with `receiver` bound as the first parameter.
    pub fn invoke(&self, receiver: Value, args: &[Value]) -> Result<Value, RuntimeError> {
        if let Some(arity) = self.handle.arity() {
            let expected = arity.saturating_sub(1);
            if arity == 0 || args.len() != expected {
                return Err(RuntimeError::ArityMismatch {
                    got: args.len(),
                    expected,
                });
            }
        }

        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(receiver);
        full.extend_from_slice(args);
        self.handle.dispatch(&full)
    }

    /// Prototype-less copy of the own properties with every value passed
    /// through `mapper`. Inherited properties are not copied.
    pub fn mirror<F>(&self, mut mapper: F) -> ObjectRef
    where
        F: FnMut(&Value) -> Value,
    {
        let mirror = Self::new_object(None);
        for (key, value) in self.own_entries() {
            mirror.register(&key, mapper(&value));
        }
        mirror
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObject")
            .field("name", &self.name)
            .field("keys", &self.own_keys())
            .field("proto", &self.proto.as_ref().map(|p| p.name().to_string()))
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
#[path = "object_test.rs"]
mod object_test;
