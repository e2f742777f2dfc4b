//! Port selection for launch batches.
//!
//! [`PortOracle`] answers "is this port taken right now", [`PortAllocator`]
//! turns those answers into ports that are unique within one session, and
//! [`PortConflict`] explains who is sitting on a port when one is taken.

pub mod allocator;
pub mod conflict;
pub mod oracle;

pub use allocator::{PortAllocator, PortRange, ReservedPorts};
pub use conflict::{PortConflict, ProcessInfo};
pub use oracle::{PortOracle, SystemPortOracle, DEFAULT_PROBE_TIMEOUT};
