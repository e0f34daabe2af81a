use std::rc::Rc;

use kestrel::runtime::{JsObject, LookupCache, Value};

#[test]
fn own_hit_is_guarded_by_layout() {
    let obj = JsObject::new_object(None);
    obj.register("x", Value::Int(1));
    let cache = LookupCache::new("x");

    assert_eq!(cache.lookup(&obj), Value::Int(1));
    assert_eq!(cache.lookup(&obj), Value::Int(1));
    assert_eq!((cache.hits(), cache.misses()), (1, 1));

    // overwrite keeps the layout, so the slot read stays valid
    obj.register("x", Value::Int(2));
    assert_eq!(cache.lookup(&obj), Value::Int(2));
    assert_eq!(cache.hits(), 2);
}

#[test]
fn own_hit_serves_other_objects_with_same_layout() {
    let a = JsObject::new_object(None);
    let b = JsObject::new_object(None);
    a.register("x", Value::Int(1));
    b.register("x", Value::Int(2));
    let cache = LookupCache::new("x");

    assert_eq!(cache.lookup(&a), Value::Int(1));
    assert_eq!(cache.lookup(&b), Value::Int(2));
    assert_eq!((cache.hits(), cache.misses()), (1, 1));
}

#[test]
fn layout_change_forces_miss() {
    let obj = JsObject::new_object(None);
    obj.register("x", Value::Int(1));
    let cache = LookupCache::new("x");
    cache.lookup(&obj);

    obj.register("y", Value::Int(2));
    assert_eq!(cache.lookup(&obj), Value::Int(1));
    assert_eq!(cache.misses(), 2);
}

#[test]
fn inherited_hit_sees_holder_updates() {
    let proto = JsObject::new_object(None);
    proto.register("x", Value::Int(1));
    let child = JsObject::new_object(Some(Rc::clone(&proto)));
    let cache = LookupCache::new("x");

    assert_eq!(cache.lookup(&child), Value::Int(1));
    proto.register("x", Value::Int(5));
    assert_eq!(cache.lookup(&child), Value::Int(5));
    assert_eq!((cache.hits(), cache.misses()), (1, 1));
}

#[test]
fn shadowing_invalidates_inherited_entry() {
    let proto = JsObject::new_object(None);
    proto.register("x", Value::Int(1));
    let child = JsObject::new_object(Some(Rc::clone(&proto)));
    let cache = LookupCache::new("x");
    cache.lookup(&child);

    child.register("x", Value::Int(9));
    assert_eq!(cache.lookup(&child), Value::Int(9));
    assert_eq!(cache.misses(), 2);
}

#[test]
fn shadowing_in_middle_of_chain_is_seen() {
    let root = JsObject::new_object(None);
    root.register("x", Value::Int(1));
    let middle = JsObject::new_object(Some(Rc::clone(&root)));
    let leaf = JsObject::new_object(Some(Rc::clone(&middle)));
    let cache = LookupCache::new("x");

    assert_eq!(cache.lookup(&leaf), Value::Int(1));
    middle.register("x", Value::Int(2));
    assert_eq!(cache.lookup(&leaf), Value::Int(2));
}

#[test]
fn inherited_entry_is_per_receiver() {
    let proto = JsObject::new_object(None);
    proto.register("x", Value::Int(1));
    let a = JsObject::new_object(Some(Rc::clone(&proto)));
    let other_proto = JsObject::new_object(None);
    other_proto.register("x", Value::Int(2));
    let b = JsObject::new_object(Some(other_proto));
    let cache = LookupCache::new("x");

    assert_eq!(cache.lookup(&a), Value::Int(1));
    assert_eq!(cache.lookup(&b), Value::Int(2));
    assert_eq!(cache.misses(), 2);
}

#[test]
fn absent_key_is_cached_until_defined() {
    let proto = JsObject::new_object(None);
    let child = JsObject::new_object(Some(Rc::clone(&proto)));
    let cache = LookupCache::new("late");

    assert_eq!(cache.lookup(&child), Value::UNDEFINED);
    assert_eq!(cache.lookup(&child), Value::UNDEFINED);
    assert_eq!(cache.hits(), 1);

    proto.register("late", Value::from("here"));
    assert_eq!(cache.lookup(&child), Value::from("here"));
}

#[test]
fn reset_drops_entry() {
    let obj = JsObject::new_object(None);
    obj.register("x", Value::Int(1));
    let cache = LookupCache::new("x");
    cache.lookup(&obj);

    cache.reset();
    cache.lookup(&obj);
    assert_eq!((cache.hits(), cache.misses()), (0, 2));
}

#[test]
fn cached_results_match_plain_lookup() {
    let root = JsObject::new_object(None);
    let middle = JsObject::new_object(Some(Rc::clone(&root)));
    let leaf = JsObject::new_object(Some(Rc::clone(&middle)));
    let cache = LookupCache::new("k");

    let steps: [(&_, i64); 5] = [(&root, 1), (&leaf, 2), (&middle, 3), (&root, 4), (&leaf, 5)];
    for (target, value) in steps {
        target.register("k", Value::Int(value));
        for receiver in [&root, &middle, &leaf] {
            assert_eq!(cache.lookup(receiver), receiver.lookup("k"));
        }
    }
}
