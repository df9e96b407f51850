//! Simulated digital output register

use am9513_hal::{DigitalOutput, HalError};

/// A 32-bit output register that counts its writes
#[derive(Debug, Default)]
pub struct SimOutputRegister {
    value: u32,
    writes: u32,
}

impl SimOutputRegister {
    pub const fn new(value: u32) -> Self {
        Self { value, writes: 0 }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn bit(&self, bit: u8) -> bool {
        self.value & (1 << (bit & 31)) != 0
    }

    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl DigitalOutput for SimOutputRegister {
    fn read(&mut self) -> Result<u32, HalError> {
        Ok(self.value)
    }

    fn write(&mut self, value: u32) -> Result<(), HalError> {
        self.value = value;
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bit_keeps_neighbours() {
        let mut reg = SimOutputRegister::new(0b1000_0001);
        reg.write_bit(3, true).unwrap();
        assert_eq!(reg.value(), 0b1000_1001);
        assert!(reg.bit(3));
        reg.write_bit(0, false).unwrap();
        assert_eq!(reg.value(), 0b1000_1000);
        assert_eq!(reg.writes(), 2);
    }
}
