//! Bus error taxonomy.
//!
//! Every public entry point returns one of these kinds. Errors produced by a
//! transaction are counted in the performance metrics before being returned,
//! so statistics stay accurate even when callers ignore return values. None
//! of these conditions is fatal to the process: callers see ordinary error
//! returns indistinguishable in shape from a real bus failure.

/// Errors reported by the simulator and by device backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// Malformed caller input: bad bus index, zero-length burst, noise level
    /// outside `[0, 1]`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No present device at this address on the addressed bus.
    #[error("no device at address 0x{address:02X}")]
    NotFound {
        /// Bus-unique device address.
        address: u8,
    },

    /// A present device already occupies this address on the bus.
    #[error("device already registered at address 0x{address:02X}")]
    AlreadyExists {
        /// Bus-unique device address.
        address: u8,
    },

    /// The bus device table is full.
    #[error("device table full ({capacity} slots)")]
    OutOfCapacity {
        /// Maximum number of device slots per bus.
        capacity: usize,
    },

    /// No backend constructor is registered for this device kind, or the
    /// backend does not implement the requested capability.
    #[error("unsupported device kind: {kind}")]
    Unsupported {
        /// Device kind tag as passed to `add_device`.
        kind: String,
    },

    /// Injected or backend-reported communication failure.
    #[error("simulated I/O fault")]
    IoFault,

    /// Backend-reported stall.
    #[error("simulated device timeout")]
    Timeout,
}

impl BusError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }
}
