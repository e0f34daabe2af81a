use std::{collections::HashMap, rc::Rc};

use tracing::trace;

use crate::{
    bytecode::{
        op_code::{OpCode, disassemble, instruction_len, read_u8, read_u16},
        unit::{CodeUnit, Constant},
    },
    runtime::{
        error::RuntimeError,
        inline_cache::LookupCache,
        leak_detector,
        object::{JsObject, ObjectRef},
        value::Value,
    },
};

use super::SessionContext;

/// A code unit bound into a session and ready to run.
///
/// Every `OpGetProperty` in the code gets its own [`LookupCache`], keyed by
/// instruction offset.
pub struct LoadedUnit {
    id: String,
    unit: CodeUnit,
    constants: Vec<Value>,
    caches: HashMap<usize, LookupCache>,
    session: Rc<SessionContext>,
}

impl LoadedUnit {
    /// `unit` must have passed [`crate::bytecode::payload::verify_code`].
    pub(crate) fn new(id: &str, unit: CodeUnit, session: Rc<SessionContext>) -> Self {
        leak_detector::record_unit();
        let constants = unit.constants.iter().map(Constant::to_value).collect();

        let mut caches = HashMap::new();
        let code = &unit.instructions;
        let mut ip = 0;
        while ip < code.len() {
            let Ok(op) = OpCode::try_from(code[ip]) else {
                break;
            };
            if op == OpCode::OpGetProperty {
                let index = read_u16(code, ip + 1) as usize;
                if let Some(key) = unit.constants.get(index).and_then(Constant::as_str) {
                    caches.insert(ip, LookupCache::new(key));
                }
            }
            ip += instruction_len(op);
        }

        Self {
            id: id.to_string(),
            unit,
            constants,
            caches,
            session,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.unit.name
    }

    pub fn parameters(&self) -> &[String] {
        &self.unit.parameters
    }

    pub fn parameter_count(&self) -> usize {
        self.unit.parameters.len()
    }

    pub fn code_unit(&self) -> &CodeUnit {
        &self.unit
    }

    pub fn disassemble(&self) -> String {
        disassemble(&self.unit.instructions)
    }

    /// Property cache of the `OpGetProperty` at `offset`.
    pub fn cache_at(&self, offset: usize) -> Option<&LookupCache> {
        self.caches.get(&offset)
    }

    fn name_operand(&self, ip: usize) -> Result<&str, RuntimeError> {
        let index = read_u16(&self.unit.instructions, ip + 1) as usize;
        self.unit
            .constants
            .get(index)
            .and_then(Constant::as_str)
            .ok_or_else(|| RuntimeError::failure(format!("constant {} is not a name", index)))
    }

    /// Runs the unit in a fresh scope frame whose parent is the session's
    /// global object. `this` and the parameters are bound in that frame.
    pub(crate) fn execute(&self, receiver: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        let _depth = self.session.enter()?;
        trace!(unit = %self.id, args = args.len(), "execute");

        let env = JsObject::new_env(Some(Rc::clone(&self.session.global)));
        env.register("this", receiver.clone());
        for (parameter, arg) in self.unit.parameters.iter().zip(args) {
            env.register(parameter, arg.clone());
        }

        let mut stack = OperandStack::new(self.session.config.max_stack);
        let code = &self.unit.instructions;
        let mut ip = 0;

        while ip < code.len() {
            let op = OpCode::try_from(code[ip])
                .map_err(|byte| RuntimeError::failure(format!("unknown opcode {}", byte)))?;

            match op {
                OpCode::OpConstant => {
                    let index = read_u16(code, ip + 1) as usize;
                    stack.push(self.constants[index].clone())?;
                }
                OpCode::OpUndefined => stack.push(Value::UNDEFINED)?,
                OpCode::OpReceiver => stack.push(receiver.clone())?,
                OpCode::OpGetName => {
                    let name = self.name_operand(ip)?;
                    stack.push(env.lookup(name))?;
                }
                OpCode::OpSetName => {
                    let name = self.name_operand(ip)?;
                    let value = stack.pop()?;
                    env.register(name, value);
                }
                OpCode::OpSetGlobal => {
                    let name = self.name_operand(ip)?;
                    let value = stack.pop()?;
                    self.session.global.register(name, value);
                }
                OpCode::OpGetProperty => {
                    let key = self.name_operand(ip)?;
                    let target = expect_object(stack.pop()?, "read", key)?;
                    let value = match self.caches.get(&ip) {
                        Some(cache) => cache.lookup(&target),
                        None => target.lookup(key),
                    };
                    stack.push(value)?;
                }
                OpCode::OpSetProperty => {
                    let key = self.name_operand(ip)?;
                    let value = stack.pop()?;
                    let target = expect_object(stack.pop()?, "write", key)?;
                    target.register(key, value);
                }
                OpCode::OpNewObject => {
                    let proto = match stack.pop()? {
                        Value::Undefined => None,
                        Value::Object(proto) => Some(proto),
                        other => {
                            return Err(RuntimeError::failure(format!(
                                "prototype must be an object or undefined, found {}",
                                other.type_name()
                            )));
                        }
                    };
                    stack.push(Value::Object(JsObject::new_object(proto)))?;
                }
                OpCode::OpFunction => {
                    let id = self.name_operand(ip)?;
                    let function = self.session.dictionary.resolve(id).ok_or_else(|| {
                        RuntimeError::failure(format!("function `{}` is not loaded", id))
                    })?;
                    stack.push(Value::Object(function))?;
                }
                OpCode::OpCall => {
                    let argc = read_u8(code, ip + 1) as usize;
                    let args = stack.pop_n(argc)?;
                    let call_receiver = stack.pop()?;
                    let result = match stack.pop()? {
                        Value::Object(callee) => callee.invoke(call_receiver, &args)?,
                        _ => return Err(RuntimeError::NotInvocable),
                    };
                    stack.push(result)?;
                }
                OpCode::OpPop => {
                    stack.pop()?;
                }
                OpCode::OpDup => {
                    let top = stack.peek()?.clone();
                    stack.push(top)?;
                }
                OpCode::OpAdd | OpCode::OpSub | OpCode::OpMul => {
                    let right = stack.pop()?;
                    let left = stack.pop()?;
                    stack.push(arithmetic(op, left, right)?)?;
                }
                OpCode::OpLessThan => {
                    let right = stack.pop()?;
                    let left = stack.pop()?;
                    stack.push(Value::Bool(less_than(&left, &right)?))?;
                }
                OpCode::OpEqual => {
                    let right = stack.pop()?;
                    let left = stack.pop()?;
                    stack.push(Value::Bool(left == right))?;
                }
                OpCode::OpNot => {
                    let value = stack.pop()?;
                    stack.push(Value::Bool(!value.is_truthy()))?;
                }
                OpCode::OpJump => {
                    ip = read_u16(code, ip + 1) as usize;
                    continue;
                }
                OpCode::OpJumpIfFalse => {
                    let condition = stack.pop()?;
                    if !condition.is_truthy() {
                        ip = read_u16(code, ip + 1) as usize;
                        continue;
                    }
                }
                OpCode::OpReturn => return stack.pop(),
            }

            ip += instruction_len(op);
        }

        Ok(Value::UNDEFINED)
    }
}

struct OperandStack {
    values: Vec<Value>,
    limit: usize,
}

impl OperandStack {
    fn new(limit: usize) -> Self {
        Self {
            values: Vec::new(),
            limit,
        }
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.values.len() >= self.limit {
            return Err(RuntimeError::failure("stack overflow"));
        }
        self.values.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.values
            .pop()
            .ok_or_else(|| RuntimeError::failure("stack underflow"))
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        if n > self.values.len() {
            return Err(RuntimeError::failure("stack underflow"));
        }
        Ok(self.values.split_off(self.values.len() - n))
    }

    fn peek(&self) -> Result<&Value, RuntimeError> {
        self.values
            .last()
            .ok_or_else(|| RuntimeError::failure("stack underflow"))
    }
}

fn expect_object(value: Value, action: &str, key: &str) -> Result<ObjectRef, RuntimeError> {
    match value {
        Value::Object(obj) => Ok(obj),
        other => Err(RuntimeError::failure(format!(
            "cannot {} property `{}` of {}",
            action,
            key,
            other.type_name()
        ))),
    }
}

fn arithmetic(op: OpCode, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                OpCode::OpAdd => a.checked_add(*b),
                OpCode::OpSub => a.checked_sub(*b),
                _ => a.checked_mul(*b),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::failure("integer overflow"))
        }
        (Value::Str(a), _) if op == OpCode::OpAdd => Ok(Value::Str(format!("{}{}", a, right).into())),
        (_, Value::Str(b)) if op == OpCode::OpAdd => Ok(Value::Str(format!("{}{}", left, b).into())),
        _ => match (as_float(&left), as_float(&right)) {
            (Some(a), Some(b)) => Ok(Value::Float(match op {
                OpCode::OpAdd => a + b,
                OpCode::OpSub => a - b,
                _ => a * b,
            })),
            _ => Err(RuntimeError::failure(format!(
                "unsupported operand types for {}: {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn less_than(left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a < b),
        (Value::Str(a), Value::Str(b)) => Ok(a < b),
        _ => match (as_float(left), as_float(right)) {
            (Some(a), Some(b)) => Ok(a < b),
            _ => Err(RuntimeError::failure(format!(
                "cannot compare {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
#[path = "interp_test.rs"]
mod interp_test;
