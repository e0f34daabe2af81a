//! Turns opaque compiled payloads into invocable function objects.
//!
//! A [`Loader`] is bound to one session: a dictionary of function
//! identifiers, a global environment and a [`LoaderConfig`]. Every unit it
//! produces runs against that same session.

use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    rc::Rc,
};

use tracing::{debug, warn};

use crate::{
    bytecode::payload::decode_unit,
    config::LoaderConfig,
    runtime::{
        callable::CallableHandle,
        error::{LoadError, RuntimeError},
        object::{JsObject, ObjectRef},
    },
};

pub mod dictionary;
pub mod interp;

use dictionary::Dictionary;
use interp::LoadedUnit;

/// State shared by the loader and every unit it loaded.
pub(crate) struct SessionContext {
    pub(crate) dictionary: Rc<Dictionary>,
    pub(crate) global: ObjectRef,
    pub(crate) config: LoaderConfig,
    depth: Cell<usize>,
}

impl SessionContext {
    /// Enters one level of interpreted call nesting.
    pub(crate) fn enter(&self) -> Result<DepthGuard<'_>, RuntimeError> {
        let depth = self.depth.get();
        if depth >= self.config.max_call_depth {
            return Err(RuntimeError::failure(format!(
                "maximum call depth {} exceeded",
                self.config.max_call_depth
            )));
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard { depth: &self.depth })
    }
}

pub(crate) struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

pub struct Loader {
    context: Rc<SessionContext>,
    loaded: RefCell<HashSet<String>>,
}

impl Loader {
    pub fn new(config: LoaderConfig, dictionary: Rc<Dictionary>, global: ObjectRef) -> Self {
        Self {
            context: Rc::new(SessionContext {
                dictionary,
                global,
                config,
                depth: Cell::new(0),
            }),
            loaded: RefCell::new(HashSet::new()),
        }
    }

    /// Decodes `payload` and binds the resulting function under `id`.
    ///
    /// Each id loads at most once per session. If the dictionary already
    /// declares `id`, the unit must take the declared number of parameters.
    pub fn load(&self, id: &str, payload: &[u8]) -> Result<ObjectRef, LoadError> {
        self.ensure_unloaded(id)?;

        let unit = decode_unit(payload, self.context.config.verify_checksum)?;
        self.check_signature(id, unit.parameters.len())?;

        let name = unit.name.clone();
        let parameters = unit.parameters.clone();
        let loaded = Rc::new(LoadedUnit::new(id, unit, Rc::clone(&self.context)));
        let function = JsObject::new_function(&name, CallableHandle::Interpreted { unit: loaded });

        self.bind(id, &name, &parameters, Rc::clone(&function));
        debug!(id, name = %name, parameters = parameters.len(), "loaded unit");
        Ok(function)
    }

    /// Registers a precompiled entry point under `id`.
    ///
    /// A fixed-arity handle must take the declared number of parameters
    /// plus the receiver. Variadic handles match any declaration.
    pub fn define_native(
        &self,
        id: &str,
        name: &str,
        handle: CallableHandle,
    ) -> Result<ObjectRef, LoadError> {
        self.ensure_unloaded(id)?;

        let parameters = match handle.arity() {
            Some(arity) => {
                let count = arity.saturating_sub(1);
                self.check_signature(id, count)?;
                (1..=count).map(|i| format!("arg{}", i)).collect()
            }
            None => Vec::new(),
        };

        let function = JsObject::new_function(name, handle);
        self.bind(id, name, &parameters, Rc::clone(&function));
        debug!(id, name, "defined native");
        Ok(function)
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.borrow().contains(id)
    }

    pub fn dictionary(&self) -> &Rc<Dictionary> {
        &self.context.dictionary
    }

    pub fn global(&self) -> &ObjectRef {
        &self.context.global
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.context.config
    }

    fn ensure_unloaded(&self, id: &str) -> Result<(), LoadError> {
        if self.is_loaded(id) {
            return Err(LoadError::DuplicateUnit(id.to_string()));
        }
        Ok(())
    }

    fn check_signature(&self, id: &str, found: usize) -> Result<(), LoadError> {
        let Some(descriptor) = self.context.dictionary.descriptor(id) else {
            return Ok(());
        };
        let expected = descriptor.parameters.len();
        if expected != found {
            warn!(id, expected, found, "signature mismatch");
            return Err(LoadError::SignatureMismatch {
                id: id.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }

    fn bind(&self, id: &str, name: &str, parameters: &[String], function: ObjectRef) {
        self.context
            .dictionary
            .bind(id, name, parameters, function);
        self.loaded.borrow_mut().insert(id.to_string());
    }
}
