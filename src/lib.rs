//! Driver for the MAX17055 fuel gauge.
//!
//! The MAX17055 estimates battery state of charge with Maxim's ModelGauge m5
//! EZ algorithm and exposes its results through 16-bit registers on I²C.
//! This crate covers the EZ configuration flow (power-on-reset detection,
//! model load, threshold setup) and typed access to the measurement
//! registers, scaled to physical units from the external sense resistor.
//!
//! The bus and the wait primitive are injected through the `embedded-hal`
//! 1.0 `i2c::I2c` and `delay::DelayNs` traits, so the driver runs unchanged
//! against any HAL, or against a fake bus in tests.
//!
//! Enable the `defmt` feature for `defmt::Format` on the public types and
//! trace output from the initialization path.

#![no_std]

pub mod conv;
pub mod regs;
pub mod types;

mod device;

pub use conv::ConversionProfile;
pub use device::{Max17055, DEFAULT_RSENSE_OHMS};
pub use types::{CellConfig, Error, LearnedParams, ModelId};
