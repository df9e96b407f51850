//! Register addressing and command bytes

use am9513_core::NUM_COUNTERS;

/// Offset of the data port from the chip base address
pub const DATA_PORT: u16 = 0;

/// Offset of the command port from the chip base address
pub const COMMAND_PORT: u16 = 1;

/// Number of ports the chip occupies
pub const PORT_SPAN: u16 = 2;

/// Master reset
pub const CMD_RESET: u8 = 0xFF;

/// Load all counters; required once after reset
pub const CMD_LOAD_ALL: u8 = 0x5F;

const CMD_ARM: u8 = 0x20;
const CMD_LOAD: u8 = 0x40;
const CMD_DISARM: u8 = 0x80;
const CMD_SAVE: u8 = 0xA0;
const CMD_CLEAR_OUTPUT: u8 = 0xE1;
const CMD_SET_OUTPUT: u8 = 0xE9;

/// A register reachable through the data pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    Mode(usize),
    Load(usize),
    Hold(usize),
    MasterMode,
    Status,
}

impl Register {
    /// "Load data pointer" command selecting this register
    pub const fn select(self) -> u8 {
        match self {
            Register::Mode(i) => 0x01 + (i % NUM_COUNTERS) as u8,
            Register::Load(i) => 0x09 + (i % NUM_COUNTERS) as u8,
            Register::Hold(i) => 0x11 + (i % NUM_COUNTERS) as u8,
            Register::MasterMode => 0x17,
            Register::Status => 0x1F,
        }
    }
}

/// Per-counter commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Copy the load register into the counter
    Load(usize),
    Arm(usize),
    Disarm(usize),
    /// Latch the counter into the hold register
    Save(usize),
    /// Force the output high
    SetOutput(usize),
    /// Force the output low
    ClearOutput(usize),
}

impl Command {
    pub const fn byte(self) -> u8 {
        match self {
            Command::Load(i) => CMD_LOAD | bit(i),
            Command::Arm(i) => CMD_ARM | bit(i),
            Command::Disarm(i) => CMD_DISARM | bit(i),
            Command::Save(i) => CMD_SAVE | bit(i),
            Command::SetOutput(i) => CMD_SET_OUTPUT + (i % NUM_COUNTERS) as u8,
            Command::ClearOutput(i) => CMD_CLEAR_OUTPUT + (i % NUM_COUNTERS) as u8,
        }
    }
}

const fn bit(index: usize) -> u8 {
    1 << (index % NUM_COUNTERS)
}

/// Status byte bit carrying the output level of counter `index`
pub const fn status_bit(index: usize) -> u8 {
    1 << ((index % NUM_COUNTERS) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_bytes() {
        assert_eq!(Register::Mode(0).select(), 0x01);
        assert_eq!(Register::Mode(4).select(), 0x05);
        assert_eq!(Register::Load(2).select(), 0x0B);
        assert_eq!(Register::Hold(4).select(), 0x15);
        assert_eq!(Register::MasterMode.select(), 0x17);
        assert_eq!(Register::Status.select(), 0x1F);
    }

    #[test]
    fn test_command_bytes() {
        assert_eq!(Command::Load(0).byte(), 0x41);
        assert_eq!(Command::Arm(3).byte(), 0x28);
        assert_eq!(Command::Disarm(4).byte(), 0x90);
        assert_eq!(Command::Save(1).byte(), 0xA2);
        assert_eq!(Command::SetOutput(0).byte(), 0xE9);
        assert_eq!(Command::ClearOutput(4).byte(), 0xE5);
    }

    #[test]
    fn test_status_bits() {
        assert_eq!(status_bit(0), 0x02);
        assert_eq!(status_bit(4), 0x20);
    }
}
