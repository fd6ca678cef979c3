//! Named-channel callback registry with copy-on-write dispatch.
//!
//! Every observable owner constructs its own bus, so channel names never
//! collide across types. Dispatch runs against a snapshot of the channel:
//! callbacks registered or removed while a dispatch is running affect the
//! next trigger, never the one in flight, so a callback may freely unbind
//! itself or its siblings without skipping or duplicating anyone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Continue-or-stop signal returned by event callbacks.
///
/// A callback returning [`Flow::Halt`] stops the remaining callbacks of the
/// dispatch it is running in. It has no effect on later triggers, and a
/// halted trigger is still a successful one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

impl Flow {
    /// True when a dispatch was stopped early by a callback.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self, Self::Halt)
    }
}

/// Opaque token identifying one registration across every channel it was
/// bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding(u64);

type Callback<P> = Arc<dyn Fn(&P) -> Flow + Send + Sync>;

struct Listener<P> {
    binding: Binding,
    callback: Callback<P>,
}

impl<P> Clone for Listener<P> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding,
            callback: Arc::clone(&self.callback),
        }
    }
}

struct BusInner<P> {
    channels: HashMap<String, Arc<Vec<Listener<P>>>>,
    next_binding: u64,
}

impl<P> BusInner<P> {
    fn mint(&mut self) -> Binding {
        let binding = Binding(self.next_binding);
        self.next_binding += 1;
        binding
    }

    fn append(&mut self, name: &str, binding: Binding, callback: Callback<P>) {
        let listeners = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Vec::new()));
        Arc::make_mut(listeners).push(Listener { binding, callback });
    }

    fn remove_binding(&mut self, binding: Binding) {
        self.channels.retain(|_, listeners| {
            if listeners.iter().any(|l| l.binding == binding) {
                Arc::make_mut(listeners).retain(|l| l.binding != binding);
            }
            !listeners.is_empty()
        });
    }
}

/// A named-channel callback registry.
///
/// Cloning the bus clones a handle to the same registry. The bus never
/// holds its lock while a callback runs, so callbacks may re-enter any
/// bus operation.
pub struct EventBus<P> {
    inner: Arc<Mutex<BusInner<P>>>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> EventBus<P> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                channels: HashMap::new(),
                next_binding: 0,
            })),
        }
    }

    /// Registers `callback` under each whitespace-separated name in
    /// `names`, after any callbacks already bound there.
    ///
    /// The returned [`Binding`] identifies this registration on every
    /// channel it was added to.
    pub fn bind(
        &self,
        names: &str,
        callback: impl Fn(&P) -> Flow + Send + Sync + 'static,
    ) -> Binding {
        let callback: Callback<P> = Arc::new(callback);
        let mut inner = self.inner.lock().unwrap();
        let binding = inner.mint();
        for name in names.split_whitespace() {
            inner.append(name, binding, Arc::clone(&callback));
        }
        binding
    }

    /// Registers `callback` like [`EventBus::bind`], except the
    /// registration removes itself from every channel before its first
    /// invocation.
    pub fn one(
        &self,
        names: &str,
        callback: impl Fn(&P) -> Flow + Send + Sync + 'static,
    ) -> Binding {
        let registry = self.downgrade();
        let mut inner = self.inner.lock().unwrap();
        let binding = inner.mint();
        let fired = AtomicBool::new(false);
        let wrapper: Callback<P> = Arc::new(move |payload: &P| {
            // An overlapping dispatch may hold a snapshot that still
            // carries this wrapper after removal; the latch keeps the
            // callback at one invocation.
            if fired.swap(true, Ordering::SeqCst) {
                return Flow::Continue;
            }
            if let Some(bus) = registry.upgrade() {
                bus.unbind_binding(binding);
            }
            callback(payload)
        });
        for name in names.split_whitespace() {
            inner.append(name, binding, Arc::clone(&wrapper));
        }
        binding
    }

    /// Invokes the callbacks currently bound to `name`, in bind order,
    /// stopping early when one returns [`Flow::Halt`].
    ///
    /// Triggering a channel with no callbacks is a no-op.
    pub fn trigger(&self, name: &str, payload: &P) -> Flow {
        let snapshot = self.inner.lock().unwrap().channels.get(name).cloned();
        let Some(listeners) = snapshot else {
            return Flow::Continue;
        };
        for listener in listeners.iter() {
            if (listener.callback)(payload).is_halted() {
                return Flow::Halt;
            }
        }
        Flow::Continue
    }

    /// Removes every callback bound to each whitespace-separated name.
    pub fn unbind(&self, names: &str) {
        let mut inner = self.inner.lock().unwrap();
        for name in names.split_whitespace() {
            inner.channels.remove(name);
        }
    }

    /// Removes every callback on every channel.
    pub fn unbind_all(&self) {
        self.inner.lock().unwrap().channels.clear();
    }

    /// Removes one registration from every channel it was bound to.
    /// Unknown or already-removed bindings are ignored.
    pub fn unbind_binding(&self, binding: Binding) {
        self.inner.lock().unwrap().remove_binding(binding);
    }

    /// Number of callbacks currently bound to `name`.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .channels
            .get(name)
            .map_or(0, |listeners| listeners.len())
    }

    /// True when no channel has a callback bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().channels.is_empty()
    }

    /// A non-owning handle to the same registry.
    ///
    /// Callbacks that need to reach back into their own bus should hold
    /// this instead of an [`EventBus`], otherwise the registry owns a
    /// callback that owns the registry and neither is ever dropped.
    #[must_use]
    pub fn downgrade(&self) -> WeakEventBus<P> {
        WeakEventBus {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning counterpart of [`EventBus`], created by
/// [`EventBus::downgrade`].
pub struct WeakEventBus<P> {
    inner: Weak<Mutex<BusInner<P>>>,
}

impl<P> Clone for WeakEventBus<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<P> WeakEventBus<P> {
    /// An owning handle, while the registry is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<EventBus<P>> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }
}
