//! Capability traits
//!
//! Each logical instrument built from Am9513 counters implements [`Device`]
//! plus one capability trait. Callers drive motors, scalers and timers through
//! these traits without knowing which counters back them.

pub mod device;
pub mod motor;
pub mod scaler;
pub mod timer;

pub use device::Device;
pub use motor::{Direction, StepperMotor};
pub use scaler::{Scaler, ScalerMode};
pub use timer::{Timer, TimerMode};
