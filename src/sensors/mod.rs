//! Sensor drivers.
//!
//! Only the on-die temperature sensor is fitted; it feeds the
//! [`Sampler`](crate::app::sampler::Sampler) through the
//! [`TemperatureSource`](crate::app::ports::TemperatureSource) port.

pub mod temperature;
