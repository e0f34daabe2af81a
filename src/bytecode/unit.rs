use std::rc::Rc;

use crate::{
    bytecode::op_code::{Instructions, OpCode, make},
    runtime::value::Value,
};

/// Constant-pool entry of a code unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bool(bool),
    Undefined,
}

impl Constant {
    pub fn to_value(&self) -> Value {
        match self {
            Constant::Int(v) => Value::Int(*v),
            Constant::Float(v) => Value::Float(*v),
            Constant::Str(v) => Value::Str(Rc::clone(v)),
            Constant::Bool(v) => Value::Bool(*v),
            Constant::Undefined => Value::Undefined,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Int(_) => "Int",
            Constant::Float(_) => "Float",
            Constant::Str(_) => "Str",
            Constant::Bool(_) => "Bool",
            Constant::Undefined => "Undefined",
        }
    }
}

/// Decoded body of one compiled function: what a payload carries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeUnit {
    pub name: String,
    pub parameters: Vec<String>,
    pub constants: Vec<Constant>,
    pub instructions: Instructions,
}

impl CodeUnit {
    pub fn new(name: impl Into<String>, parameters: &[&str]) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            constants: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// Adds a constant, reusing an equal entry when present, and returns its
    /// pool index.
    pub fn add_constant(&mut self, constant: Constant) -> usize {
        if let Some(index) = self.constants.iter().position(|c| *c == constant) {
            return index;
        }
        self.constants.push(constant);
        self.constants.len() - 1
    }

    pub fn add_name(&mut self, name: &str) -> usize {
        self.add_constant(Constant::Str(name.into()))
    }

    /// Appends one instruction and returns its offset.
    pub fn emit(&mut self, op: OpCode, operands: &[usize]) -> usize {
        let offset = self.instructions.len();
        self.instructions.extend(make(op, operands));
        offset
    }

    /// Rewrites the `u16` operand of the jump at `offset`.
    pub fn patch_jump(&mut self, offset: usize, target: usize) {
        self.instructions[offset + 1] = (target >> 8) as u8;
        self.instructions[offset + 2] = target as u8;
    }
}
