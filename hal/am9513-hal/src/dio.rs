//! Digital output abstractions
//!
//! The motor driver toggles a direction line that lives on some other
//! device's output register. It reads the register, changes one bit and
//! writes the whole value back, leaving the other bits alone.

use embedded_hal::digital::StatefulOutputPin;

use crate::portio::HalError;

/// Multi-bit digital output register
pub trait DigitalOutput {
    /// Read back the value currently driven on the outputs
    fn read(&mut self) -> Result<u32, HalError>;

    /// Drive a new value on the outputs
    fn write(&mut self, value: u32) -> Result<(), HalError>;

    /// Set or clear a single bit, preserving the others
    fn write_bit(&mut self, bit: u8, high: bool) -> Result<(), HalError> {
        let mask = 1u32 << (bit & 31);
        let value = self.read()?;
        let value = if high { value | mask } else { value & !mask };
        self.write(value)
    }
}

impl<T: DigitalOutput + ?Sized> DigitalOutput for &mut T {
    fn read(&mut self) -> Result<u32, HalError> {
        (**self).read()
    }

    fn write(&mut self, value: u32) -> Result<(), HalError> {
        (**self).write(value)
    }
}

/// A single `embedded-hal` output pin presented as one bit of an output register
///
/// Only `bit` is driven; every other bit reads back as zero and is ignored
/// on write.
pub struct PinOutput<P> {
    pin: P,
    bit: u8,
}

impl<P: StatefulOutputPin> PinOutput<P> {
    /// Wrap `pin` so it appears at position `bit`
    pub fn new(pin: P, bit: u8) -> Self {
        Self { pin, bit: bit & 31 }
    }

    /// Give back the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: StatefulOutputPin> DigitalOutput for PinOutput<P> {
    fn read(&mut self) -> Result<u32, HalError> {
        let high = self.pin.is_set_high().map_err(|_| HalError::Io)?;
        Ok(if high { 1 << self.bit } else { 0 })
    }

    fn write(&mut self, value: u32) -> Result<(), HalError> {
        if value & (1 << self.bit) != 0 {
            self.pin.set_high().map_err(|_| HalError::Io)
        } else {
            self.pin.set_low().map_err(|_| HalError::Io)
        }
    }
}
