//! Event registry and capability composition for Trellis.
//!
//! This crate provides the two mechanisms everything observable in the
//! data layer is built from:
//! - [`EventBus`] is a named-channel callback registry with copy-on-write
//!   dispatch, owned per observable type (never global)
//! - [`Observable`] is the trait a type implements by pointing at its bus
//! - [`Capability`] with [`include`] / [`extend`] composes capability
//!   bundles in place of inheritance
//!
//! Payloads are opaque to this crate; the model layer defines them.

mod bus;
mod compose;
mod observable;

pub use bus::{Binding, EventBus, Flow, WeakEventBus};
pub use compose::{bound, extend, include, Capability, ComposeError};
pub use observable::Observable;
