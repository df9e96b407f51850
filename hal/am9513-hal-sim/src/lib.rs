//! Simulated Am9513 backend
//!
//! A behavioural model of one Am9513 sitting behind a pair of I/O ports. It
//! decodes the command set the drivers use, keeps the mode/load/hold/counter
//! registers of all five counters, and counts edges delivered by
//! [`SimChip::clock`] (internal F1..F5 sources) or [`SimChip::pulse_source`]
//! (SRC pins).
//!
//! Board wiring that the drivers rely on, such as a counter's gate tied to
//! another counter's output, is described with [`SimChip::wire_gate`].
//!
//! Also provided:
//!
//! - [`SimOutputRegister`] - a digital output register for direction lines
//! - [`SimDelay`] - a delay that only records how long it was asked to wait

#![no_std]
#![deny(unsafe_code)]

pub mod chip;
pub mod delay;
pub mod dio;

pub use chip::{BusStats, CounterView, GateInput, SimChip};
pub use delay::SimDelay;
pub use dio::SimOutputRegister;
