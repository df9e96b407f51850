//! Am9513 chip interface and logical drivers
//!
//! This crate provides:
//!
//! - [`chip::Am9513`] - register-level access to one chip, with shadow
//!   copies of every register and a table of which device holds each counter
//! - [`motor::Am9513Motor`] - a stepper motor from two adjacent counters
//! - [`scaler::Am9513Scaler`] - a wide event counter from cascaded counters
//! - [`timer::Am9513Timer`] - a countdown timer from one counter
//!
//! Drivers hold shared references to the chips they use. All access is
//! single-threaded and blocking.

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod chip;
pub mod motor;
pub mod scaler;
pub mod timer;

pub use chip::{Am9513, ChipSnapshot, CounterRef, SharedChip};
pub use motor::Am9513Motor;
pub use scaler::Am9513Scaler;
pub use timer::Am9513Timer;
