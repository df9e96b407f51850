//! Countdown timer trait

use crate::error::Error;

use super::Device;

/// Timer operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerMode {
    /// Count down a preset interval
    #[default]
    Preset,
    /// Count elapsed time freely
    Counter,
}

/// A countdown timer measured in seconds
pub trait Timer: Device {
    /// Whether the preset interval is still running
    fn is_busy(&mut self) -> Result<bool, Error>;

    /// Begin counting down `seconds`; negative values count as zero
    fn start(&mut self, seconds: f64) -> Result<(), Error>;

    /// Halt the timer and return the seconds left on the counter
    fn stop(&mut self) -> Result<f64, Error>;

    fn clear(&mut self) -> Result<(), Error>;

    /// Read the timer without stopping it
    fn read(&mut self) -> Result<f64, Error>;

    fn mode(&self) -> TimerMode;

    fn set_mode(&mut self, mode: TimerMode) -> Result<(), Error>;
}
