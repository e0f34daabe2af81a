//! Prototype-based object model with a dynamic loader for compiled units.

pub mod bytecode;
pub mod config;
pub mod loader;
pub mod runtime;
