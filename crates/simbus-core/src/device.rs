//! Device backend interface and constructor registry.
//!
//! A backend implements the register-level behavior of one virtual device
//! kind. Backends own their internal state behind their own lock(s); the
//! engine acquires the bus lock before dispatching into a backend, and a
//! backend must never reach back into the bus registry. The background
//! updater calls [`DeviceBackend::advance`] while holding no bus lock, so a
//! backend's internal lock is the only serialization between transaction
//! reads and state advancement.
//!
//! A backend that cannot serve a capability reports [`BusError::IoFault`]
//! rather than panicking, matching how a real device NAKs an unsupported
//! access.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BusError;

/// Capability set implemented by one virtual device kind.
pub trait DeviceBackend: Send + Sync {
    /// Read a single register.
    fn read_register(&self, register: u8) -> Result<u8, BusError>;

    /// Write a single register.
    fn write_register(&self, register: u8, value: u8) -> Result<(), BusError>;

    /// Read `buf.len()` consecutive registers starting at `register`.
    ///
    /// The default implementation falls back to sequential single-register
    /// reads, stopping at the first failure. Register addresses wrap at
    /// `0xFF`. Backends with a dedicated burst path override this.
    fn read_burst(&self, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let mut reg = register;
        for slot in buf {
            *slot = self.read_register(reg)?;
            reg = reg.wrapping_add(1);
        }
        Ok(())
    }

    /// Advance internal virtual state by one tick of the background updater.
    ///
    /// Called at a fixed cadence independent of transaction traffic. The
    /// default is a no-op for devices with time-invariant state.
    fn advance(&self) {}
}

impl std::fmt::Debug for dyn DeviceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DeviceBackend")
    }
}

type BackendCtor = Box<dyn Fn(u8) -> Result<Arc<dyn DeviceBackend>, BusError> + Send + Sync>;

/// Maps device-kind tags to backend constructors.
///
/// This is the extension point concrete sensor models plug into: a crate
/// providing a backend registers a constructor under its kind tag, and
/// `add_device` resolves the tag through the simulator's registry.
#[derive(Default)]
pub struct BackendRegistry {
    ctors: HashMap<String, BackendCtor>,
}

impl BackendRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `kind` to a constructor. Re-registering a kind replaces the
    /// previous constructor.
    pub fn register<F>(&mut self, kind: impl Into<String>, ctor: F)
    where
        F: Fn(u8) -> Result<Arc<dyn DeviceBackend>, BusError> + Send + Sync + 'static,
    {
        self.ctors.insert(kind.into(), Box::new(ctor));
    }

    /// Whether a constructor is registered for `kind`.
    #[must_use]
    pub fn supports(&self, kind: &str) -> bool {
        self.ctors.contains_key(kind)
    }

    pub(crate) fn construct(
        &self,
        kind: &str,
        address: u8,
    ) -> Result<Arc<dyn DeviceBackend>, BusError> {
        let ctor =
            self.ctors.get(kind).ok_or_else(|| BusError::Unsupported { kind: kind.to_owned() })?;
        ctor(address)
    }
}
