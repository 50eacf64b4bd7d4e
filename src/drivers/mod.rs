//! Peripheral drivers.

pub mod hw_timer;
