//! Temperature history firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod history;

// Hardware- and stack-facing modules; simulation stand-ins are used on
// non-espidf targets.
pub mod adapters;
pub mod drivers;
pub mod sensors;
