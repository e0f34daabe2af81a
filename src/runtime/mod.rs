//! Object model: values, shapes, invalidation tokens and invocation.
//!
//! # Ownership
//! Objects are shared through `Rc` and mutated through `&self` behind
//! `RefCell`/`Cell`. Nothing in this module is `Send` or `Sync`; the
//! single-writer contract for `register` is therefore enforced by the type
//! system rather than by locks.
//!
//! Reference cycles are allowed and are not collected:
//! - every function object references itself through `apply`;
//! - loaded units reference the session that holds them;
//! - user code may build cyclic property graphs.
//!
//! A session is expected to live as long as the process (or the embedding
//! test) that created it.
//!
//! Prototype chains are not checked for cycles either. A cyclic chain makes
//! `lookup` of a missing key loop forever.

pub mod callable;
pub mod error;
pub mod inline_cache;
pub mod layout;
pub mod leak_detector;
pub mod object;
pub mod property_store;
mod render;
pub mod token;
pub mod value;

pub use callable::CallableHandle;
pub use error::{BoxError, LoadError, RuntimeError};
pub use inline_cache::LookupCache;
pub use layout::Layout;
pub use object::{JsObject, ObjectRef};
pub use token::Token;
pub use value::Value;
