//! Listener registries with explicit unsubscribe handles
//!
//! Listeners are plain `Arc<dyn Fn(&T)>` callbacks, executed synchronously on
//! the thread that emits. The registry clones the callbacks out before
//! calling them, so a listener may register or unsubscribe listeners
//! (including itself) without deadlocking.
//!
//! # Example
//!
//! ```
//! use obsync_ws::listeners::ListenerSet;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let set: Arc<ListenerSet<u32>> = Arc::new(ListenerSet::new());
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let counter = seen.clone();
//! let handle = ListenerSet::subscribe(&set, move |n: &u32| {
//!     counter.fetch_add(*n as usize, Ordering::SeqCst);
//! });
//!
//! set.emit(&2);
//! handle.unsubscribe();
//! set.emit(&5);
//!
//! assert_eq!(seen.load(Ordering::SeqCst), 2);
//! ```

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Type alias for listener callbacks
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An ordered set of listeners for one event type
pub struct ListenerSet<T> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(u64, Listener<T>)>>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.entries.read().len())
            .finish()
    }
}

impl<T> ListenerSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener, returning its id
    pub fn add(&self, listener: Listener<T>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push((id, listener));
        id
    }

    /// Remove a listener by id. Returns false if it was already gone.
    pub fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Call every listener registered at the time of the call, in registration order
    pub fn emit(&self, event: &T) {
        let listeners: Vec<Listener<T>> =
            self.entries.read().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nobody is listening
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every listener
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<T: 'static> ListenerSet<T> {
    /// Register a closure and get a handle that removes it again
    pub fn subscribe<F>(set: &Arc<Self>, listener: F) -> ListenerHandle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = set.add(Arc::new(listener));
        let weak: Weak<Self> = Arc::downgrade(set);
        ListenerHandle::new(move || {
            if let Some(set) = weak.upgrade() {
                set.remove(id);
            }
        })
    }
}

/// Unsubscribe handle returned by every `on_*`/`subscribe` registration
///
/// Dropping the handle does not unsubscribe; call [`ListenerHandle::unsubscribe`].
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct ListenerHandle {
    unsubscribe: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ListenerHandle {
    /// Wrap an unsubscribe action
    pub fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            unsubscribe: Mutex::new(Some(Box::new(unsubscribe))),
        }
    }

    /// Combine several handles into one
    pub fn merge(handles: Vec<ListenerHandle>) -> Self {
        Self::new(move || {
            for handle in handles {
                handle.unsubscribe();
            }
        })
    }

    /// Remove the listener. Takes effect before the next emitted event.
    pub fn unsubscribe(&self) {
        let action = self.unsubscribe.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    /// False once `unsubscribe` has run
    pub fn is_active(&self) -> bool {
        self.unsubscribe.lock().is_some()
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("active", &self.is_active())
            .finish()
    }
}
