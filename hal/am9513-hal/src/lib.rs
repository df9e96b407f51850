//! Am9513 Hardware Abstraction Layer
//!
//! This crate defines the transport traits the Am9513 drivers are written
//! against. A backend crate implements them for a concrete bus (Linux
//! `/dev/port`, a simulated chip, an ISA bridge on a microcontroller, ...),
//! so the same driver code runs on all of them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  am9513-drivers (chip, motor, scaler)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  am9513-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  am9513-hal-  │       │  am9513-hal-  │
//! │    devport    │       │      sim      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`portio::PortIo`] - 8/16-bit I/O port access with region reservation
//! - [`dio::DigitalOutput`] - Multi-bit digital output register

#![no_std]
#![deny(unsafe_code)]

pub mod dio;
pub mod portio;

pub use dio::{DigitalOutput, PinOutput};
pub use portio::{HalError, PortIo};
