//! Application core: pure domain logic, zero I/O.
//!
//! The sampler (producer), the snapshot reader (consumer) and the service
//! that wires the sampler to the event queue.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod reader;
pub mod sampler;
pub mod service;
