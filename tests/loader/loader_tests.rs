use std::{fmt, rc::Rc};

use kestrel::{
    bytecode::{
        op_code::OpCode,
        payload::encode_unit,
        unit::{CodeUnit, Constant},
    },
    config::LoaderConfig,
    loader::{
        Loader,
        dictionary::{Dictionary, FunctionDescriptor},
    },
    runtime::{CallableHandle, JsObject, LoadError, RuntimeError, Value, leak_detector},
};

fn new_loader() -> Loader {
    Loader::new(
        LoaderConfig::default(),
        Dictionary::new(),
        JsObject::new_object(None),
    )
}

/// fn name() { return id() + 1 }
fn calls_other(name: &str, callee: &str) -> CodeUnit {
    let mut unit = CodeUnit::new(name, &[]);
    let callee = unit.add_name(callee);
    let one = unit.add_constant(Constant::Int(1));
    unit.emit(OpCode::OpFunction, &[callee]);
    unit.emit(OpCode::OpUndefined, &[]);
    unit.emit(OpCode::OpCall, &[0]);
    unit.emit(OpCode::OpConstant, &[one]);
    unit.emit(OpCode::OpAdd, &[]);
    unit.emit(OpCode::OpReturn, &[]);
    unit
}

fn returns(name: &str, value: i64) -> CodeUnit {
    let mut unit = CodeUnit::new(name, &[]);
    let c = unit.add_constant(Constant::Int(value));
    unit.emit(OpCode::OpConstant, &[c]);
    unit.emit(OpCode::OpReturn, &[]);
    unit
}

#[test]
fn loaded_unit_is_bound_in_dictionary() {
    let loader = new_loader();
    let f = loader.load("u1", &encode_unit(&returns("one", 1))).unwrap();

    assert!(loader.is_loaded("u1"));
    assert!(Rc::ptr_eq(&loader.dictionary().resolve("u1").unwrap(), &f));
    assert_eq!(f.name(), "function one");
    assert_eq!(f.invoke(Value::UNDEFINED, &[]).unwrap(), Value::Int(1));

    let descriptor = loader.dictionary().descriptor("u1").unwrap();
    assert_eq!(descriptor.name, "one");
    assert!(descriptor.is_loaded());
}

#[test]
fn later_unit_is_visible_to_earlier_one() {
    let loader = new_loader();
    let caller = loader
        .load("caller", &encode_unit(&calls_other("caller", "callee")))
        .unwrap();

    let err = caller.invoke(Value::UNDEFINED, &[]).unwrap_err();
    assert_eq!(err.to_string(), "function `callee` is not loaded");

    loader
        .load("callee", &encode_unit(&returns("callee", 41)))
        .unwrap();
    assert_eq!(
        caller.invoke(Value::UNDEFINED, &[]).unwrap(),
        Value::Int(42)
    );
}

#[test]
fn units_share_the_global_environment() {
    let global = JsObject::new_object(None);
    let loader = Loader::new(LoaderConfig::default(), Dictionary::new(), Rc::clone(&global));

    let mut writer = CodeUnit::new("writer", &["v"]);
    let v = writer.add_name("v");
    let counter = writer.add_name("counter");
    writer.emit(OpCode::OpGetName, &[v]);
    writer.emit(OpCode::OpSetGlobal, &[counter]);

    let mut reader = CodeUnit::new("reader", &[]);
    let counter = reader.add_name("counter");
    reader.emit(OpCode::OpGetName, &[counter]);
    reader.emit(OpCode::OpReturn, &[]);

    let writer = loader.load("writer", &encode_unit(&writer)).unwrap();
    let reader = loader.load("reader", &encode_unit(&reader)).unwrap();

    assert_eq!(reader.invoke(Value::UNDEFINED, &[]).unwrap(), Value::UNDEFINED);
    writer.invoke(Value::UNDEFINED, &[Value::Int(3)]).unwrap();
    assert_eq!(reader.invoke(Value::UNDEFINED, &[]).unwrap(), Value::Int(3));
    assert_eq!(global.get_own("counter"), Some(Value::Int(3)));
    assert!(Rc::ptr_eq(loader.global(), &global));
}

#[test]
fn duplicate_load_is_rejected() {
    let loader = new_loader();
    let payload = encode_unit(&returns("one", 1));
    let first = loader.load("u1", &payload).unwrap();

    let err = loader.load("u1", &payload).unwrap_err();
    assert!(matches!(&err, LoadError::DuplicateUnit(id) if id == "u1"));
    assert_eq!(err.to_string(), "unit `u1` is already loaded in this session");
    assert!(Rc::ptr_eq(&loader.dictionary().resolve("u1").unwrap(), &first));
}

#[test]
fn native_and_loaded_ids_share_one_namespace() {
    let loader = new_loader();
    loader
        .define_native("n", "native", CallableHandle::variadic(|_| Ok(Value::Int(1))))
        .unwrap();

    assert!(matches!(
        loader.load("n", &encode_unit(&returns("n", 2))),
        Err(LoadError::DuplicateUnit(_))
    ));
    assert!(matches!(
        loader.define_native("n", "again", CallableHandle::NoInvoker),
        Err(LoadError::DuplicateUnit(_))
    ));
}

#[test]
fn declared_signature_must_match() {
    let dictionary = Dictionary::new();
    dictionary.declare("pair", FunctionDescriptor::new("pair", &["a", "b"]));
    let loader = Loader::new(
        LoaderConfig::default(),
        Rc::clone(&dictionary),
        JsObject::new_object(None),
    );

    let err = loader
        .load("pair", &encode_unit(&CodeUnit::new("pair", &["a"])))
        .unwrap_err();
    assert!(matches!(
        err,
        LoadError::SignatureMismatch {
            expected: 2,
            found: 1,
            ..
        }
    ));
    assert!(!loader.is_loaded("pair"));
    assert!(dictionary.resolve("pair").is_none());

    loader
        .load("pair", &encode_unit(&CodeUnit::new("pair", &["a", "b"])))
        .unwrap();
    assert!(dictionary.resolve("pair").is_some());
}

#[test]
fn corrupt_payload_is_rejected_before_binding() {
    let loader = new_loader();
    let mut payload = encode_unit(&returns("one", 1));
    let last = payload.len() - 1;
    payload[last] ^= 0x01;

    assert!(matches!(
        loader.load("u1", &payload),
        Err(LoadError::ChecksumMismatch)
    ));
    assert!(!loader.is_loaded("u1"));
}

#[test]
fn checksum_verification_follows_config() {
    let loader = Loader::new(
        LoaderConfig::from_json_str(r#"{"verify_checksum": false}"#).unwrap(),
        Dictionary::new(),
        JsObject::new_object(None),
    );
    let mut payload = encode_unit(&returns("one", 1));
    let last = payload.len() - 1;
    payload[last] ^= 0x01;

    assert!(!loader.config().verify_checksum);
    assert!(loader.load("u1", &payload).is_ok());
}

#[test]
fn native_receives_receiver_first() {
    let loader = new_loader();
    let first = loader
        .define_native(
            "first",
            "first",
            CallableHandle::fixed(2, |args| Ok(args[0].clone())),
        )
        .unwrap();

    let receiver = JsObject::new_object(None);
    let result = first
        .invoke(Value::from(&receiver), &[Value::Int(1)])
        .unwrap();
    assert_eq!(result, Value::from(&receiver));
    assert_eq!(first.name(), "function first");
}

#[derive(Debug)]
struct HostError(&'static str);

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for HostError {}

#[test]
fn native_errors_are_wrapped_with_cause() {
    let loader = new_loader();
    let failing = loader
        .define_native(
            "fail",
            "fail",
            CallableHandle::variadic(|_| Err(HostError("disk full").into())),
        )
        .unwrap();

    let err = failing.invoke(Value::UNDEFINED, &[]).unwrap_err();
    assert_eq!(err.to_string(), "disk full");
    let cause = std::error::Error::source(&err).unwrap();
    assert!(cause.downcast_ref::<HostError>().is_some());
}

#[test]
fn runtime_errors_from_natives_pass_through() {
    let loader = new_loader();
    let failing = loader
        .define_native(
            "strict",
            "strict",
            CallableHandle::variadic(|_| Err(RuntimeError::NotInvocable.into())),
        )
        .unwrap();

    assert!(matches!(
        failing.invoke(Value::UNDEFINED, &[]).unwrap_err(),
        RuntimeError::NotInvocable
    ));
}

#[test]
fn method_call_through_property() {
    let loader = new_loader();

    // fn get(o) { return o.double(o.n) }
    let mut unit = CodeUnit::new("get", &["o"]);
    let o = unit.add_name("o");
    let double = unit.add_name("double");
    let n = unit.add_name("n");
    unit.emit(OpCode::OpGetName, &[o]);
    unit.emit(OpCode::OpGetProperty, &[double]);
    unit.emit(OpCode::OpGetName, &[o]);
    unit.emit(OpCode::OpGetName, &[o]);
    unit.emit(OpCode::OpGetProperty, &[n]);
    unit.emit(OpCode::OpCall, &[1]);
    unit.emit(OpCode::OpReturn, &[]);
    let get = loader.load("get", &encode_unit(&unit)).unwrap();

    let double = loader
        .define_native(
            "double",
            "double",
            CallableHandle::fixed(2, |args| match &args[1] {
                Value::Int(n) => Ok(Value::Int(n * 2)),
                other => Err(format!("expected number, got {}", other.type_name()).into()),
            }),
        )
        .unwrap();
    let proto = JsObject::new_object(None);
    proto.register("double", Value::from(&double));
    let obj = JsObject::new_object(Some(proto));
    obj.register("n", Value::Int(21));

    assert_eq!(
        get.invoke(Value::UNDEFINED, &[Value::from(&obj)]).unwrap(),
        Value::Int(42)
    );

    obj.register("n", Value::from("x"));
    let err = get.invoke(Value::UNDEFINED, &[Value::from(&obj)]).unwrap_err();
    assert_eq!(err.to_string(), "expected number, got string");
}

#[test]
fn allocation_counters_track_loads() {
    let before = leak_detector::snapshot();
    let loader = new_loader();
    loader.load("u1", &encode_unit(&returns("one", 1))).unwrap();
    let after = leak_detector::snapshot();

    assert!(after.units > before.units);
    assert!(after.functions > before.functions);
    assert!(after.objects > before.objects);
}

#[test]
fn late_declaration_keeps_loaded_function() {
    let loader = new_loader();
    let callee = loader
        .load("callee", &encode_unit(&returns("callee", 41)))
        .unwrap();
    let caller = loader
        .load("caller", &encode_unit(&calls_other("caller", "callee")))
        .unwrap();

    assert!(!loader
        .dictionary()
        .declare("callee", FunctionDescriptor::new("other", &[])));

    assert!(Rc::ptr_eq(&loader.dictionary().resolve("callee").unwrap(), &callee));
    assert_eq!(
        caller.invoke(Value::UNDEFINED, &[]).unwrap(),
        Value::Int(42)
    );
}

#[test]
fn native_fixed_arity_must_match_declaration() {
    let dictionary = Dictionary::new();
    dictionary.declare("pair", FunctionDescriptor::new("pair", &["a", "b"]));
    let loader = Loader::new(
        LoaderConfig::default(),
        Rc::clone(&dictionary),
        JsObject::new_object(None),
    );

    let err = loader
        .define_native("pair", "pair", CallableHandle::fixed(2, |_| Ok(Value::UNDEFINED)))
        .unwrap_err();
    assert!(matches!(
        err,
        LoadError::SignatureMismatch {
            expected: 2,
            found: 1,
            ..
        }
    ));
    assert!(!loader.is_loaded("pair"));

    loader
        .define_native("pair", "pair", CallableHandle::fixed(3, |_| Ok(Value::UNDEFINED)))
        .unwrap();
    assert_eq!(dictionary.descriptor("pair").unwrap().parameters.len(), 2);
}

#[test]
fn native_variadic_matches_any_declaration() {
    let dictionary = Dictionary::new();
    dictionary.declare("many", FunctionDescriptor::new("many", &["a"]));
    let loader = Loader::new(
        LoaderConfig::default(),
        Rc::clone(&dictionary),
        JsObject::new_object(None),
    );

    loader
        .define_native("many", "many", CallableHandle::variadic(|_| Ok(Value::UNDEFINED)))
        .unwrap();
    assert!(dictionary.resolve("many").is_some());
}

#[test]
fn undeclared_native_records_its_arity() {
    let loader = new_loader();
    loader
        .define_native("add", "add", CallableHandle::fixed(3, |_| Ok(Value::UNDEFINED)))
        .unwrap();

    let descriptor = loader.dictionary().descriptor("add").unwrap();
    assert_eq!(descriptor.name, "add");
    assert_eq!(descriptor.parameters.len(), 2);
}
