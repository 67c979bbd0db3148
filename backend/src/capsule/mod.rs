//! Resource Capsule
//!
//! Opaque host values wrapping native data under a type tag. The data is
//! recovered only by naming the same tag and Rust type it was created with.
//!
//! # Example
//!
//! ```rust
//! use host_bridge_core_rs::CallContext;
//! use host_bridge_core_rs::capsule::{create, name, unwrap};
//!
//! let ctx = CallContext::new();
//! let handle = create(&ctx, "Counter", 7_u64, "counter", None).unwrap();
//!
//! assert_eq!(*unwrap::<u64>(&handle, "Counter").unwrap(), 7);
//! assert!(unwrap::<u64>(&handle, "Other").is_err());
//! assert_eq!(name(&handle).unwrap(), "counter");
//! ```

pub mod arena;

use std::any::Any;
use std::rc::Rc;

use tracing::trace;

use crate::core::CallContext;
use crate::exceptions::HostError;
use crate::models::{HostObject, Owned};

pub use arena::{
    CapsuleArena, CapsuleId, CapsuleName, CapsuleRef, Destructor, CAPSULE_NAME_CAPACITY,
    CAPSULE_NAME_MAX_LEN,
};

/// Wrap `data` in a new capsule owned by `ctx`'s arena
///
/// `name` is truncated silently when longer than [`CAPSULE_NAME_MAX_LEN`]
/// bytes. `destructor` runs exactly once, after the last handle is dropped.
///
/// # Errors
///
/// `ArgumentError` if `name` contains a NUL byte.
pub fn create<T: Any>(
    ctx: &CallContext,
    tag: &str,
    data: T,
    name: &str,
    destructor: Option<Box<dyn FnOnce(&T)>>,
) -> Result<Owned, HostError> {
    let name = CapsuleName::new(name)?;
    let destructor = destructor.map(|destructor| -> Destructor {
        Box::new(move |data: &dyn Any| {
            if let Some(data) = data.downcast_ref::<T>() {
                destructor(data);
            }
        })
    });
    trace!(tag, name = %name, "creating capsule");
    let handle = ctx.capsules().insert(tag, Rc::new(data), name, destructor);
    Ok(Owned::new(HostObject::Capsule(handle)))
}

fn capsule_ref(handle: &Owned) -> Result<&CapsuleRef, HostError> {
    match handle.object() {
        HostObject::Capsule(capsule) => Ok(capsule),
        _ => Err(HostError::capsule_type(format!(
            "expected a capsule, got {}",
            handle.type_name()
        ))),
    }
}

/// Recover the data of a capsule created with `tag` and type `T`
///
/// # Errors
///
/// `CapsuleTypeError` if `handle` is not a capsule, carries another tag, or
/// holds data of another type.
pub fn unwrap<T: Any>(handle: &Owned, tag: &str) -> Result<Rc<T>, HostError> {
    let (stored_tag, data) = capsule_ref(handle)?
        .contents()
        .ok_or_else(|| HostError::capsule_type("capsule has been destroyed"))?;
    if stored_tag != tag {
        return Err(HostError::capsule_type(format!(
            "expected capsule of type '{}', got '{}'",
            tag, stored_tag
        )));
    }
    data.downcast::<T>().map_err(|_| {
        HostError::capsule_type(format!(
            "capsule '{}' does not hold a {}",
            tag,
            std::any::type_name::<T>()
        ))
    })
}

/// Stored (possibly truncated) name of a capsule
pub fn name(handle: &Owned) -> Result<String, HostError> {
    capsule_ref(handle)?
        .name()
        .map(|name| name.to_string())
        .ok_or_else(|| HostError::capsule_type("capsule has been destroyed"))
}

pub fn is_capsule(handle: &Owned) -> bool {
    matches!(handle.object(), HostObject::Capsule(_))
}

// ============================================================================
// Point capsule
// ============================================================================

/// Tag of capsules produced by [`create_point`]
pub const POINT_TAG: &str = "Point";

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub name: CapsuleName,
}

/// Capsule holding a named point
pub fn create_point(ctx: &CallContext, x: i32, y: i32, name: &str) -> Result<Owned, HostError> {
    let point = Point {
        x,
        y,
        name: CapsuleName::new(name)?,
    };
    let label = point.name.to_string();
    create(
        ctx,
        POINT_TAG,
        point,
        &label,
        Some(Box::new(|point: &Point| {
            trace!(x = point.x, y = point.y, "point released");
        })),
    )
}

/// Host dict `{x, y, name}` for a point capsule
pub fn get_point(handle: &Owned) -> Result<Owned, HostError> {
    let point = unwrap::<Point>(handle, POINT_TAG)?;
    Ok(Owned::dict([
        ("x", Owned::from(i64::from(point.x))),
        ("y", Owned::from(i64::from(point.y))),
        ("name", Owned::str(point.name.as_str())),
    ]))
}
