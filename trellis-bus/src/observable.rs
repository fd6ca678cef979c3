//! The `Observable` seam.
//!
//! Any type becomes observable by owning an [`EventBus`] and pointing
//! `events()` at it; the provided methods delegate. Composition replaces
//! inheritance here: there is no base type, and the seam resolves
//! statically.

use crate::bus::{Binding, EventBus, Flow};

/// Implemented by types that announce their state changes on an owned
/// event bus.
pub trait Observable {
    /// Payload delivered to every callback on this type's bus.
    type Payload: 'static;

    /// The bus this type announces on.
    fn events(&self) -> &EventBus<Self::Payload>;

    /// Registers `callback` under each whitespace-separated channel name.
    fn bind(
        &self,
        names: &str,
        callback: impl Fn(&Self::Payload) -> Flow + Send + Sync + 'static,
    ) -> Binding {
        self.events().bind(names, callback)
    }

    /// Registers `callback` for a single invocation.
    fn one(
        &self,
        names: &str,
        callback: impl Fn(&Self::Payload) -> Flow + Send + Sync + 'static,
    ) -> Binding {
        self.events().one(names, callback)
    }

    /// Announces `payload` on the named channel.
    fn trigger(&self, name: &str, payload: &Self::Payload) -> Flow {
        self.events().trigger(name, payload)
    }

    /// Removes every callback bound to each whitespace-separated name.
    fn unbind(&self, names: &str) {
        self.events().unbind(names);
    }

    /// Removes every callback on every channel.
    fn unbind_all(&self) {
        self.events().unbind_all();
    }

    /// Removes one registration wherever it is bound.
    fn unbind_binding(&self, binding: Binding) {
        self.events().unbind_binding(binding);
    }
}
