//! Builtin methods of host containers and iterators
//!
//! Resolved on demand: each lookup yields a fresh native function with the
//! receiver captured, so nothing is cached on the receiver itself.

use std::cell::RefCell;

use crate::core::CallContext;
use crate::exceptions::{ErrorKind, HostError};
use crate::iteration;
use crate::models::{BoundArgs, HostObject, NativeFunction, Owned, Signature};

fn method<F>(receiver: &Owned, name: &str, signature: Signature, body: F) -> Owned
where
    F: Fn(&CallContext, &Owned, BoundArgs) -> Result<Owned, HostError> + 'static,
{
    let qualified = format!("{}.{}", receiver.type_name(), name);
    let receiver = receiver.clone();
    Owned::function(NativeFunction::new(qualified, signature, move |ctx, args| {
        body(ctx, &receiver, args)
    }))
}

/// Builtin method `name` of `receiver`, if its shape has one
pub(crate) fn builtin_method(receiver: &Owned, name: &str) -> Option<Owned> {
    let resolved = match (receiver.object(), name) {
        (HostObject::List(_), "append") => method(receiver, name, Signature::new().required("item"), |_, list, args| {
            list_items(list)?.borrow_mut().push(args.arg(0)?);
            Ok(Owned::none())
        }),
        (HostObject::List(_), "pop") => method(receiver, name, Signature::new().optional("index", -1_i64), |_, list, args| {
            let index: i64 = args.arg(0)?;
            let mut items = list_items(list)?.borrow_mut();
            if items.is_empty() {
                return Err(HostError::index_error("pop from empty list"));
            }
            let position = normalize_index(index, items.len())
                .ok_or_else(|| HostError::index_error("pop index out of range"))?;
            Ok(items.remove(position))
        }),
        (HostObject::List(_), "extend") => method(receiver, name, Signature::new().required("iterable"), |ctx, list, args| {
            // Drain before borrowing: the source may be this list or call back
            let values = iteration::drain(ctx, &args.arg::<Owned>(0)?)?;
            list_items(list)?.borrow_mut().extend(values);
            Ok(Owned::none())
        }),
        (HostObject::List(_), "insert") => method(
            receiver,
            name,
            Signature::new().required("index").required("item"),
            |_, list, args| {
                let index: i64 = args.arg(0)?;
                let item: Owned = args.arg(1)?;
                let mut items = list_items(list)?.borrow_mut();
                let len = items.len() as i64;
                let position = if index < 0 { (index + len).max(0) } else { index.min(len) };
                items.insert(position as usize, item);
                Ok(Owned::none())
            },
        ),
        (HostObject::List(_), "reverse") => method(receiver, name, Signature::new(), |_, list, _| {
            list_items(list)?.borrow_mut().reverse();
            Ok(Owned::none())
        }),
        (HostObject::Str(_), "upper") => method(receiver, name, Signature::new(), |_, text, _| {
            Ok(Owned::str(text.extract::<String>()?.to_uppercase()))
        }),
        (HostObject::Str(_), "lower") => method(receiver, name, Signature::new(), |_, text, _| {
            Ok(Owned::str(text.extract::<String>()?.to_lowercase()))
        }),
        (HostObject::Str(_), "strip") => method(receiver, name, Signature::new(), |_, text, _| {
            Ok(Owned::str(text.extract::<String>()?.trim()))
        }),
        (HostObject::Str(_), "startswith") => method(receiver, name, Signature::new().required("prefix"), |_, text, args| {
            let prefix: String = args.arg(0)?;
            Ok(Owned::from(text.extract::<String>()?.starts_with(&prefix)))
        }),
        (HostObject::Str(_), "join") => method(receiver, name, Signature::new().required("iterable"), |ctx, separator, args| {
            let separator: String = separator.extract()?;
            let parts = iteration::drain(ctx, &args.arg::<Owned>(0)?)?;
            let mut pieces = Vec::with_capacity(parts.len());
            for (index, part) in parts.iter().enumerate() {
                match part.object() {
                    HostObject::Str(piece) => pieces.push(piece.clone()),
                    _ => {
                        return Err(HostError::type_error(format!(
                            "sequence item {}: expected str instance, {} found",
                            index,
                            part.type_name()
                        )))
                    }
                }
            }
            Ok(Owned::str(pieces.join(&separator)))
        }),
        (HostObject::Dict(_), "get") => method(
            receiver,
            name,
            Signature::new().required("key").optional("default", Owned::none()),
            |_, dict, args| {
                let key: String = args.arg(0)?;
                let HostObject::Dict(entries) = dict.object() else {
                    return Err(receiver_mismatch("dict", dict));
                };
                Ok(entries.get(&key).unwrap_or(args.arg(1)?))
            },
        ),
        (HostObject::Dict(_), "keys") => method(receiver, name, Signature::new(), |_, dict, _| {
            let HostObject::Dict(entries) = dict.object() else {
                return Err(receiver_mismatch("dict", dict));
            };
            Ok(Owned::list(entries.keys().into_iter().map(Owned::str).collect()))
        }),
        (HostObject::Dict(_), "pop") => method(
            receiver,
            name,
            Signature::new().required("key").var_positional(),
            |_, dict, args| {
                let key: String = args.arg(0)?;
                if args.extra_positional().len() > 1 {
                    return Err(HostError::argument(format!(
                        "pop expected at most 2 arguments, got {}",
                        1 + args.extra_positional().len()
                    )));
                }
                let HostObject::Dict(entries) = dict.object() else {
                    return Err(receiver_mismatch("dict", dict));
                };
                match (entries.remove(&key), args.extra_positional().first()) {
                    (Some(value), _) => Ok(value),
                    (None, Some(default)) => Ok(default.clone()),
                    (None, None) => Err(HostError::key_error(format!("'{}'", key))),
                }
            },
        ),
        (HostObject::Generator(_) | HostObject::RangeIterator(_), "next" | "__next__") => {
            method(receiver, name, Signature::new(), |ctx, iterator, _| {
                iteration::next(ctx, iterator)?.ok_or_else(|| HostError::new(ErrorKind::StopIteration, ""))
            })
        }
        (HostObject::Generator(_) | HostObject::RangeIterator(_), "__iter__") => {
            method(receiver, name, Signature::new(), |_, iterator, _| Ok(iterator.clone()))
        }
        _ => return None,
    };
    Some(resolved)
}

fn receiver_mismatch(expected: &str, receiver: &Owned) -> HostError {
    HostError::type_error(format!(
        "descriptor requires a '{}' object but received a '{}'",
        expected,
        receiver.type_name()
    ))
}

fn list_items(list: &Owned) -> Result<&RefCell<Vec<Owned>>, HostError> {
    match list.object() {
        HostObject::List(items) => Ok(items),
        _ => Err(receiver_mismatch("list", list)),
    }
}

/// Map a possibly negative index onto `0..len`
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let position = if index < 0 { index + len } else { index };
    if (0..len).contains(&position) {
        usize::try_from(position).ok()
    } else {
        None
    }
}
