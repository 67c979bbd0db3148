//! Capsule handle table
//!
//! Entries live in generation-tagged slots. A [`CapsuleRef`] retains its entry
//! on clone and releases it on drop; the last release removes the entry, frees
//! the slot, and only then runs the destructor, outside any arena borrow.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::exceptions::HostError;

/// Size of the fixed name buffer, terminator included
pub const CAPSULE_NAME_CAPACITY: usize = 50;

/// Longest name that fits, in bytes
pub const CAPSULE_NAME_MAX_LEN: usize = CAPSULE_NAME_CAPACITY - 1;

/// Runs once with the capsule's data when its last reference is released
pub type Destructor = Box<dyn FnOnce(&dyn Any)>;

/// Capsule name stored in a fixed NUL-terminated buffer
///
/// Longer names are cut to [`CAPSULE_NAME_MAX_LEN`] bytes, backed off to the
/// nearest character boundary.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CapsuleName {
    buf: [u8; CAPSULE_NAME_CAPACITY],
    len: usize,
}

impl CapsuleName {
    /// # Errors
    ///
    /// `ArgumentError` if `name` contains a NUL byte.
    pub fn new(name: &str) -> Result<Self, HostError> {
        if name.contains('\0') {
            return Err(HostError::argument("capsule name contains an embedded null byte"));
        }
        let mut len = name.len().min(CAPSULE_NAME_MAX_LEN);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        let mut buf = [0u8; CAPSULE_NAME_CAPACITY];
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        Ok(Self { buf, len })
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stored bytes followed by the terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..=self.len]
    }
}

impl fmt::Display for CapsuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CapsuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapsuleId {
    index: usize,
    generation: u32,
}

struct Entry {
    tag: String,
    name: CapsuleName,
    data: Rc<dyn Any>,
    destructor: Option<Destructor>,
    refs: usize,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct ArenaInner {
    slots: Vec<Slot>,
    free: Vec<usize>,
    destroyed: usize,
}

impl ArenaInner {
    fn entry(&self, id: CapsuleId) -> Option<&Entry> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: CapsuleId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }
}

/// Shared handle table of one call context
#[derive(Clone, Default)]
pub struct CapsuleArena {
    inner: Rc<RefCell<ArenaInner>>,
}

impl CapsuleArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new entry holding one reference
    pub fn insert(
        &self,
        tag: impl Into<String>,
        data: Rc<dyn Any>,
        name: CapsuleName,
        destructor: Option<Destructor>,
    ) -> CapsuleRef {
        let entry = Entry {
            tag: tag.into(),
            name,
            data,
            destructor,
            refs: 1,
        };
        let mut inner = self.inner.borrow_mut();
        let index = match inner.free.pop() {
            Some(index) => index,
            None => {
                inner.slots.push(Slot::default());
                inner.slots.len() - 1
            }
        };
        let slot = &mut inner.slots[index];
        slot.entry = Some(entry);
        let id = CapsuleId {
            index,
            generation: slot.generation,
        };
        drop(inner);
        CapsuleRef {
            arena: self.clone(),
            id,
        }
    }

    /// Number of entries not yet destroyed
    pub fn live_count(&self) -> usize {
        self.inner
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.entry.is_some())
            .count()
    }

    /// Number of entries whose last reference has been released
    pub fn destroyed_count(&self) -> usize {
        self.inner.borrow().destroyed
    }

    fn retain(&self, id: CapsuleId) {
        if let Some(entry) = self.inner.borrow_mut().entry_mut(id) {
            entry.refs += 1;
        }
    }

    fn release(&self, id: CapsuleId) {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let Some(entry) = inner.entry_mut(id) else {
                return;
            };
            entry.refs -= 1;
            if entry.refs > 0 {
                return;
            }
            let slot = &mut inner.slots[id.index];
            let removed = slot.entry.take();
            slot.generation = slot.generation.wrapping_add(1);
            inner.free.push(id.index);
            inner.destroyed += 1;
            removed
        };

        // The destructor may create or release capsules of this arena
        if let Some(mut entry) = removed {
            debug!(tag = %entry.tag, name = %entry.name, "destroying capsule");
            if let Some(destructor) = entry.destructor.take() {
                destructor(entry.data.as_ref());
            }
        }
    }

    fn with_entry<R>(&self, id: CapsuleId, f: impl FnOnce(&Entry) -> R) -> Option<R> {
        self.inner.borrow().entry(id).map(f)
    }
}

impl fmt::Debug for CapsuleArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapsuleArena")
            .field("live", &self.live_count())
            .field("destroyed", &self.destroyed_count())
            .finish()
    }
}

/// Counted reference to one capsule entry
pub struct CapsuleRef {
    arena: CapsuleArena,
    id: CapsuleId,
}

impl CapsuleRef {
    pub fn id(&self) -> CapsuleId {
        self.id
    }

    pub fn tag(&self) -> Option<String> {
        self.arena.with_entry(self.id, |entry| entry.tag.clone())
    }

    pub fn name(&self) -> Option<CapsuleName> {
        self.arena.with_entry(self.id, |entry| entry.name)
    }

    pub fn ref_count(&self) -> usize {
        self.arena.with_entry(self.id, |entry| entry.refs).unwrap_or(0)
    }

    /// Tag and data of the entry
    pub fn contents(&self) -> Option<(String, Rc<dyn Any>)> {
        self.arena
            .with_entry(self.id, |entry| (entry.tag.clone(), Rc::clone(&entry.data)))
    }
}

impl Clone for CapsuleRef {
    fn clone(&self) -> Self {
        self.arena.retain(self.id);
        Self {
            arena: self.arena.clone(),
            id: self.id,
        }
    }
}

impl Drop for CapsuleRef {
    fn drop(&mut self) {
        self.arena.release(self.id);
    }
}

impl fmt::Debug for CapsuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapsuleRef")
            .field("id", &self.id)
            .field("tag", &self.tag())
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_name_truncates_to_buffer() {
        let long = "x".repeat(80);
        let name = CapsuleName::new(&long).unwrap();
        assert_eq!(name.len(), CAPSULE_NAME_MAX_LEN);
        assert_eq!(name.as_bytes_with_nul().len(), CAPSULE_NAME_CAPACITY);
        assert_eq!(name.as_bytes_with_nul().last(), Some(&0));
    }

    #[test]
    fn test_name_truncates_at_char_boundary() {
        // 48 ASCII bytes then a 2-byte char straddling the limit
        let text = format!("{}é", "a".repeat(48));
        let name = CapsuleName::new(&text).unwrap();
        assert_eq!(name.as_str(), "a".repeat(48));
    }

    #[test]
    fn test_name_rejects_nul() {
        assert!(CapsuleName::new("bad\0name").is_err());
    }

    #[test]
    fn test_destructor_runs_once_after_last_release() {
        let arena = CapsuleArena::new();
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let first = arena.insert(
            "T",
            Rc::new(5_i32),
            CapsuleName::new("n").unwrap(),
            Some(Box::new(move |_: &dyn Any| counter.set(counter.get() + 1))),
        );
        let second = first.clone();
        assert_eq!(first.ref_count(), 2);

        drop(first);
        assert_eq!(runs.get(), 0);
        drop(second);
        assert_eq!(runs.get(), 1);
        assert_eq!(arena.live_count(), 0);
        assert_eq!(arena.destroyed_count(), 1);
    }

    #[test]
    fn test_reused_slot_gets_new_generation() {
        let arena = CapsuleArena::new();
        let first = arena.insert("T", Rc::new(()), CapsuleName::new("a").unwrap(), None);
        let stale = first.id();
        drop(first);
        let second = arena.insert("T", Rc::new(()), CapsuleName::new("b").unwrap(), None);
        assert_ne!(second.id(), stale);
        assert_eq!(second.name().unwrap().as_str(), "b");
    }

    #[test]
    fn test_destructor_may_release_other_capsules() {
        let arena = CapsuleArena::new();
        let inner = arena.insert("T", Rc::new(()), CapsuleName::new("inner").unwrap(), None);
        let holder = RefCell::new(Some(inner));
        let outer = arena.insert(
            "T",
            Rc::new(()),
            CapsuleName::new("outer").unwrap(),
            Some(Box::new(move |_: &dyn Any| {
                holder.borrow_mut().take();
            })),
        );
        drop(outer);
        assert_eq!(arena.live_count(), 0);
        assert_eq!(arena.destroyed_count(), 2);
    }
}
