//! Textual dump of objects.
//!
//! ```text
//! { // object
//!   x: 1
//!   proto: null
//! }
//! ```
//!
//! An object that is already being rendered further up the current path is
//! printed as `... // <name>` instead of being entered again, so cyclic
//! graphs (every function references itself through `apply`) terminate.

use std::fmt;

use crate::runtime::{object::JsObject, value::Value};

impl fmt::Display for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = Vec::new();
        render_object(self, f, &mut path)
    }
}

fn render_value(
    value: &Value,
    f: &mut fmt::Formatter<'_>,
    path: &mut Vec<*const JsObject>,
) -> fmt::Result {
    match value {
        Value::Object(obj) => render_object(obj, f, path),
        other => write!(f, "{}", other),
    }
}

fn render_object(
    obj: &JsObject,
    f: &mut fmt::Formatter<'_>,
    path: &mut Vec<*const JsObject>,
) -> fmt::Result {
    let ptr = obj as *const JsObject;
    if path.contains(&ptr) {
        return write!(f, "... // {}", obj.name());
    }

    path.push(ptr);
    writeln!(f, "{{ // {}", obj.name())?;
    for (key, value) in obj.own_entries() {
        write!(f, "  {}: ", key)?;
        render_value(&value, f, path)?;
        writeln!(f)?;
    }
    write!(f, "  proto: ")?;
    match obj.proto() {
        Some(proto) => render_object(proto, f, path)?,
        None => write!(f, "null")?,
    }
    writeln!(f)?;
    write!(f, "}}")?;
    path.pop();
    Ok(())
}
