//! Root table for engine objects held by host wrappers.
//!
//! Every [`Object`](crate::Object) and [`Array`](crate::Array) owns a
//! [`Root`]: an id into its context's [`RootTable`]. The table entry holds the
//! engine object, which keeps it reachable for the engine's collector, plus
//! the callback table used by trampolines.
//!
//! Roots are registered when a wrapper is built and released exactly once,
//! either by an explicit dispose or when the last wrapper clone is dropped.
//! The global object's root is pinned: it is never released before its
//! context is dropped.

use boa_engine::JsObject;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::accessors::CallbackTable;
use crate::error::{JsbindError, Result};
use crate::runtime::Context;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RootId(u64);

pub(crate) const GLOBAL_ROOT: RootId = RootId(0);

pub(crate) struct RootEntry {
    pub(crate) object: JsObject,
    /// `None` for pinned entries.
    owner: Option<Weak<Root>>,
    pub(crate) callbacks: Option<CallbackTable>,
}

pub(crate) struct RootTable {
    next_id: u64,
    entries: HashMap<RootId, RootEntry>,
}

impl RootTable {
    pub(crate) fn with_global(global: JsObject) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            GLOBAL_ROOT,
            RootEntry {
                object: global,
                owner: None,
                callbacks: None,
            },
        );
        Self { next_id: 1, entries }
    }

    pub(crate) fn get(&self, id: RootId) -> Option<&RootEntry> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: RootId) -> Option<&mut RootEntry> {
        self.entries.get_mut(&id)
    }

    /// Number of live roots, the pinned global included.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Detach every callback table, the global's included.
    pub(crate) fn take_callbacks(&mut self) -> Vec<CallbackTable> {
        self.entries
            .values_mut()
            .filter_map(|entry| entry.callbacks.take())
            .collect()
    }

    /// Recover a wrapper handle for the entry `id`.
    ///
    /// Returns `None` once the last wrapper for a non-pinned entry is gone.
    pub(crate) fn handle(&self, cx: &Context, id: RootId) -> Option<Rc<Root>> {
        let entry = self.entries.get(&id)?;
        match &entry.owner {
            Some(owner) => owner.upgrade(),
            None => Some(Rc::new(Root::pinned(cx.detached(), id))),
        }
    }
}

/// A registered root, shared by every clone of one wrapper.
///
/// Holds a detached context: a wrapper keeps the engine alive but not the
/// host callbacks.
pub(crate) struct Root {
    id: RootId,
    cx: Context,
    pinned: bool,
    released: Cell<bool>,
}

impl Root {
    fn pinned(cx: Context, id: RootId) -> Self {
        Self {
            id,
            cx,
            pinned: true,
            released: Cell::new(false),
        }
    }

    pub(crate) fn id(&self) -> RootId {
        self.id
    }

    pub(crate) fn context(&self) -> &Context {
        &self.cx
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.get()
    }

    /// Clone the rooted engine object.
    ///
    /// The caller must hold the runtime lock for as long as it keeps the
    /// returned handle.
    pub(crate) fn object(&self) -> Result<JsObject> {
        if self.is_released() {
            return Err(JsbindError::Disposed);
        }
        self.cx.with_roots(|table| {
            table
                .get(self.id)
                .map(|entry| entry.object.clone())
                .ok_or(JsbindError::Disposed)
        })
    }

    /// Release the root. Only the first call has an effect.
    pub(crate) fn release(&self) -> bool {
        if self.released.replace(true) {
            return false;
        }
        if self.pinned {
            return true;
        }

        // The entry (and the engine handle and callbacks it holds) is dropped
        // after the table borrow ends but still under the lock.
        let _guard = self.cx.lock();
        let removed = self.cx.with_roots(|table| table.entries.remove(&self.id));
        tracing::trace!(context = self.cx.id(), root = self.id.0, "released root");
        drop(removed);
        true
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        self.release();
    }
}

/// Register `object` as a new root owned by the returned handle.
pub(crate) fn register(cx: &Context, object: JsObject) -> Rc<Root> {
    cx.with_roots(|table| {
        let id = RootId(table.next_id);
        table.next_id += 1;

        Rc::new_cyclic(|owner| {
            table.entries.insert(
                id,
                RootEntry {
                    object,
                    owner: Some(owner.clone()),
                    callbacks: None,
                },
            );
            tracing::trace!(context = cx.id(), root = id.0, "registered root");
            Root {
                id,
                cx: cx.detached(),
                pinned: false,
                released: Cell::new(false),
            }
        })
    })
}

/// A handle on the context's pinned global root.
pub(crate) fn global(cx: &Context) -> Rc<Root> {
    Rc::new(Root::pinned(cx.detached(), GLOBAL_ROOT))
}

#[cfg(test)]
mod tests {
    use crate::Runtime;

    #[test]
    fn test_wrapping_registers_one_root() {
        let rt = Runtime::new();
        let cx = rt.new_context();
        let before = cx.with_roots(|t| t.len());

        let obj = cx.new_object();
        assert_eq!(cx.with_roots(|t| t.len()), before + 1);

        drop(obj);
        assert_eq!(cx.with_roots(|t| t.len()), before);
    }

    #[test]
    fn test_clones_share_a_root() {
        let rt = Runtime::new();
        let cx = rt.new_context();
        let before = cx.with_roots(|t| t.len());

        let obj = cx.new_object();
        let clone = obj.clone();
        assert_eq!(cx.with_roots(|t| t.len()), before + 1);

        drop(obj);
        assert_eq!(cx.with_roots(|t| t.len()), before + 1, "clone still holds the root");
        drop(clone);
        assert_eq!(cx.with_roots(|t| t.len()), before);
    }

    #[test]
    fn test_dispose_then_drop_releases_once() {
        let rt = Runtime::new();
        let cx = rt.new_context();
        let before = cx.with_roots(|t| t.len());

        let keep = cx.new_object();
        let obj = cx.new_object();
        assert!(obj.dispose());
        assert!(!obj.dispose(), "second dispose is a no-op");
        assert_eq!(cx.with_roots(|t| t.len()), before + 1);

        drop(obj);
        assert_eq!(cx.with_roots(|t| t.len()), before + 1);
        drop(keep);
        assert_eq!(cx.with_roots(|t| t.len()), before);
    }

    #[test]
    fn test_global_root_is_pinned() {
        let rt = Runtime::new();
        let cx = rt.new_context();
        let before = cx.with_roots(|t| t.len());

        let global = cx.global();
        assert!(global.dispose());
        drop(global);

        assert_eq!(cx.with_roots(|t| t.len()), before);
        assert!(cx.global().get_property("Object").is_ok());
    }
}
