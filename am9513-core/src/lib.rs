//! Board-agnostic core logic for Am9513 counter/timer instruments
//!
//! This crate contains everything that does not touch an I/O port:
//!
//! - Counter mode register model (gating, count source, output control)
//! - Frequency-divider selection for step rates and timer presets
//! - Capability traits for motors, scalers and timers
//! - Error taxonomy shared by all drivers
//! - Configuration type definitions and loaders
//!
//! # Features
//!
//! - `defmt` - `defmt::Format` for errors and configuration types
//! - `serde` - serde derives plus postcard persistence of configurations
//! - `toml` - the TOML configuration loader (implies `serde`)
//!
//! The loader and persistence tests are gated on these features, so run the
//! full suite with `cargo test -p am9513-core --features toml`.

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod divider;
pub mod error;
pub mod mode;
pub mod traits;

pub use error::{Error, ErrorKind, Label, Operation};

/// Number of counters on one Am9513 chip
pub const NUM_COUNTERS: usize = 5;
