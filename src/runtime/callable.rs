use std::{fmt, rc::Rc};

use crate::{
    loader::interp::LoadedUnit,
    runtime::{
        error::{BoxError, RuntimeError},
        value::Value,
    },
};

/// Native entry point. `args[0]` is the receiver.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, BoxError>;

/// How an object is invoked.
///
/// Arity and variadic-ness are explicit so [`crate::runtime::object::JsObject::invoke`]
/// can check them before dispatching.
#[derive(Clone, Default)]
pub enum CallableHandle {
    /// Assigned to every object not built as a function; always fails.
    #[default]
    NoInvoker,
    /// Native entry taking exactly `arity` values, receiver included.
    Fixed { arity: usize, entry: Rc<NativeFn> },
    /// Native entry taking the receiver plus any number of arguments.
    Variadic { entry: Rc<NativeFn> },
    /// A unit produced by the loader.
    Interpreted { unit: Rc<LoadedUnit> },
}

impl CallableHandle {
    pub fn fixed<F>(arity: usize, entry: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, BoxError> + 'static,
    {
        CallableHandle::Fixed {
            arity,
            entry: Rc::new(entry),
        }
    }

    pub fn variadic<F>(entry: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, BoxError> + 'static,
    {
        CallableHandle::Variadic {
            entry: Rc::new(entry),
        }
    }

    /// Total parameter count including the receiver, `None` when variadic.
    pub fn arity(&self) -> Option<usize> {
        match self {
            CallableHandle::NoInvoker | CallableHandle::Variadic { .. } => None,
            CallableHandle::Fixed { arity, .. } => Some(*arity),
            CallableHandle::Interpreted { unit } => Some(unit.parameter_count() + 1),
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.arity().is_none()
    }

    pub fn is_invocable(&self) -> bool {
        !matches!(self, CallableHandle::NoInvoker)
    }

    /// Runs the handle on an already receiver-prefixed argument list.
    pub(crate) fn dispatch(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        match self {
            CallableHandle::NoInvoker => Err(RuntimeError::NotInvocable),
            CallableHandle::Fixed { entry, .. } | CallableHandle::Variadic { entry } => {
                entry(args).map_err(RuntimeError::from_native)
            }
            CallableHandle::Interpreted { unit } => match args.split_first() {
                Some((receiver, rest)) => unit.execute(receiver, rest),
                None => unit.execute(&Value::UNDEFINED, &[]),
            },
        }
    }
}

impl fmt::Debug for CallableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallableHandle::NoInvoker => write!(f, "NoInvoker"),
            CallableHandle::Fixed { arity, .. } => write!(f, "Fixed({})", arity),
            CallableHandle::Variadic { .. } => write!(f, "Variadic"),
            CallableHandle::Interpreted { unit } => write!(f, "Interpreted({})", unit.name()),
        }
    }
}
