//! Tests for resource capsules

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use host_bridge_core_rs::capsule::{
    create, create_point, get_point, is_capsule, name, unwrap, Point, CAPSULE_NAME_MAX_LEN, POINT_TAG,
};
use host_bridge_core_rs::{CallContext, ErrorKind, Owned};

#[derive(Debug, PartialEq)]
struct Counter {
    hits: u32,
}

// ========================================================================
// Point capsule
// ========================================================================

#[test]
fn test_create_and_get_point() {
    let ctx = CallContext::new();
    let capsule = create_point(&ctx, 10, 20, "origin").unwrap();
    assert!(is_capsule(&capsule));
    assert_eq!(capsule.type_name(), "capsule");

    let data = get_point(&capsule).unwrap();
    let expected = Owned::dict([
        ("x", Owned::from(10)),
        ("y", Owned::from(20)),
        ("name", Owned::from("origin")),
    ]);
    assert_eq!(data, expected);
}

#[test]
fn test_point_negative_coordinates() {
    let ctx = CallContext::new();
    let capsule = create_point(&ctx, -5, -10, "negative").unwrap();
    let point = unwrap::<Point>(&capsule, POINT_TAG).unwrap();
    assert_eq!((point.x, point.y), (-5, -10));
}

#[test]
fn test_long_name_is_truncated_silently() {
    let ctx = CallContext::new();
    let long_name = "x".repeat(100);
    let capsule = create_point(&ctx, 0, 0, &long_name).unwrap();

    let stored = name(&capsule).unwrap();
    assert_eq!(stored.len(), CAPSULE_NAME_MAX_LEN);
    assert!(long_name.starts_with(&stored));

    let data = get_point(&capsule).unwrap();
    let expected = Owned::dict([
        ("x", Owned::from(0)),
        ("y", Owned::from(0)),
        ("name", Owned::str(stored)),
    ]);
    assert_eq!(data, expected);
}

#[test]
fn test_name_with_multibyte_characters() {
    let ctx = CallContext::new();
    let text = "é".repeat(30); // 60 bytes
    let capsule = create_point(&ctx, 1, 2, &text).unwrap();

    let stored = name(&capsule).unwrap();
    assert!(stored.len() <= CAPSULE_NAME_MAX_LEN);
    assert_eq!(stored, "é".repeat(24));
}

#[test]
fn test_name_with_nul_is_argument_error() {
    let ctx = CallContext::new();
    let err = create_point(&ctx, 0, 0, "bad\0name").unwrap_err();
    assert!(err.matches(&ErrorKind::Argument));
}

#[test]
fn test_get_point_from_non_capsule() {
    let err = get_point(&Owned::from("not a capsule")).unwrap_err();
    assert!(err.matches(&ErrorKind::CapsuleType));

    let err = get_point(&Owned::from(123)).unwrap_err();
    assert!(err.matches(&ErrorKind::CapsuleType));
}

// ========================================================================
// Tags and types
// ========================================================================

#[test]
fn test_tag_mismatch_is_capsule_type_error() {
    let ctx = CallContext::new();
    let capsule = create(&ctx, "Counter", Counter { hits: 0 }, "counter", None).unwrap();

    let err = get_point(&capsule).unwrap_err();
    assert!(err.matches(&ErrorKind::CapsuleType));

    let err = unwrap::<Counter>(&capsule, "Other").unwrap_err();
    assert!(err.matches(&ErrorKind::CapsuleType));
}

#[test]
fn test_type_mismatch_under_same_tag() {
    let ctx = CallContext::new();
    let capsule = create(&ctx, "Counter", Counter { hits: 3 }, "counter", None).unwrap();

    let err = unwrap::<u64>(&capsule, "Counter").unwrap_err();
    assert!(err.matches(&ErrorKind::CapsuleType));
    assert_eq!(unwrap::<Counter>(&capsule, "Counter").unwrap().hits, 3);
}

// ========================================================================
// Lifecycle
// ========================================================================

#[test]
fn test_destructor_runs_once_after_last_handle() {
    let ctx = CallContext::new();
    let released = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&released);

    let capsule = create(
        &ctx,
        "Counter",
        Counter { hits: 7 },
        "counter",
        Some(Box::new(move |counter: &Counter| log.borrow_mut().push(counter.hits))),
    )
    .unwrap();

    let copies: Vec<Owned> = (0..10).map(|_| capsule.clone()).collect();
    let list = Owned::list(copies);
    drop(capsule);
    assert!(released.borrow().is_empty());

    drop(list);
    assert_eq!(*released.borrow(), vec![7]);
    assert_eq!(ctx.capsules().live_count(), 0);
    assert_eq!(ctx.capsules().destroyed_count(), 1);
}

#[test]
fn test_data_outlives_capsule_while_unwrapped() {
    let ctx = CallContext::new();
    let capsule = create(&ctx, "Counter", Counter { hits: 1 }, "counter", None).unwrap();
    let data = unwrap::<Counter>(&capsule, "Counter").unwrap();
    drop(capsule);
    assert_eq!(data.hits, 1);
}

#[test]
fn test_destructor_may_create_and_release_capsules() {
    let ctx = Rc::new(CallContext::new());
    let created = Rc::new(Cell::new(false));
    let flag = Rc::clone(&created);
    let inner_ctx = Rc::clone(&ctx);

    let capsule = create(
        &ctx,
        "Counter",
        Counter { hits: 0 },
        "outer",
        Some(Box::new(move |_: &Counter| {
            let replacement = create_point(&inner_ctx, 1, 1, "replacement").unwrap();
            flag.set(true);
            drop(replacement);
        })),
    )
    .unwrap();

    drop(capsule);
    assert!(created.get());
    assert_eq!(ctx.capsules().live_count(), 0);
    assert_eq!(ctx.capsules().destroyed_count(), 2);
}

#[test]
fn test_capsules_are_independent() {
    let ctx = CallContext::new();
    let a = create_point(&ctx, 1, 2, "a").unwrap();
    let b = create_point(&ctx, 3, 4, "b").unwrap();
    drop(a);
    assert_eq!(ctx.capsules().live_count(), 1);
    assert_eq!(name(&b).unwrap(), "b");
}
