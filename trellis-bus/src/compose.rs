//! Capability composition for observable hosts.
//!
//! Behavior is shared by installing capability bundles onto a host rather
//! than through a type hierarchy. [`include`] targets the host's
//! instance-facing surface, [`extend`] its type-facing surface; after each
//! bundle installs, its matching hook runs with the host as receiver. The
//! hook names are reserved: a bundle runs `included`/`extended`, it never
//! installs them.

use crate::bus::Flow;
use std::sync::Arc;

/// Errors from capability composition.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// [`include`] or [`extend`] was called with no bundles.
    #[error("no capability bundles provided")]
    MissingCapability,
}

/// A bundle of behavior that can be installed onto a host.
///
/// Hosts expose interior-mutable surfaces (registries, buses), so
/// installation goes through `&H`. The bundle receives itself as [`Arc`]
/// so it can hand clones of itself to the host.
pub trait Capability<H: ?Sized>: Send + Sync {
    /// Adds this bundle's hooks, callbacks, or subscriptions to the host.
    fn install(self: Arc<Self>, host: &H);

    /// Runs after [`include`] installs this bundle.
    fn included(&self, host: &H) {
        let _ = host;
    }

    /// Runs after [`extend`] installs this bundle.
    fn extended(&self, host: &H) {
        let _ = host;
    }
}

/// Installs `capabilities` onto the host's instance-facing surface, in
/// order, running each bundle's `included` hook right after it installs.
pub fn include<H: ?Sized>(
    host: &H,
    capabilities: Vec<Arc<dyn Capability<H>>>,
) -> Result<(), ComposeError> {
    if capabilities.is_empty() {
        return Err(ComposeError::MissingCapability);
    }
    for capability in capabilities {
        let hook = Arc::clone(&capability);
        capability.install(host);
        hook.included(host);
    }
    Ok(())
}

/// Installs `capabilities` onto the host's type-facing surface, in order,
/// running each bundle's `extended` hook right after it installs.
pub fn extend<H: ?Sized>(
    host: &H,
    capabilities: Vec<Arc<dyn Capability<H>>>,
) -> Result<(), ComposeError> {
    if capabilities.is_empty() {
        return Err(ComposeError::MissingCapability);
    }
    for capability in capabilities {
        let hook = Arc::clone(&capability);
        capability.install(host);
        hook.extended(host);
    }
    Ok(())
}

/// Fixes `receiver` as the subject of `action`, yielding a callback that
/// runs against that receiver no matter where it is later invoked from.
/// The result satisfies the [`EventBus::bind`](crate::EventBus::bind)
/// callback bounds.
pub fn bound<R, P>(
    receiver: R,
    action: impl Fn(&R, &P) -> Flow + Send + Sync + 'static,
) -> impl Fn(&P) -> Flow + Send + Sync + 'static
where
    R: Send + Sync + 'static,
{
    move |payload| action(&receiver, payload)
}
