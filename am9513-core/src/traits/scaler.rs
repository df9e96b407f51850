//! Event scaler trait

use crate::error::Error;

use super::Device;

/// Scaler operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScalerMode {
    /// Count freely until read
    #[default]
    Counter,
    /// Count down from a preset and stop
    Preset,
}

/// An event counter
pub trait Scaler: Device {
    /// Zero the count and resume counting
    fn clear(&mut self) -> Result<(), Error>;

    /// Whether the highest counter has wrapped
    fn overflow_set(&mut self) -> Result<bool, Error>;

    /// Stop counting and return the accumulated value
    fn read(&mut self) -> Result<u64, Error>;

    fn mode(&self) -> ScalerMode;

    fn set_mode(&mut self, mode: ScalerMode) -> Result<(), Error>;
}
