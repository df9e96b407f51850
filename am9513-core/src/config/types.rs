//! Configuration type definitions
//!
//! One entry per chip and per logical device. Counters are referenced by chip
//! name and their 1-based number on that chip, matching the pin labels on the
//! part.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{label, Error, Label, Operation};
use crate::mode::{CountSource, Gating};
use crate::NUM_COUNTERS;

/// Maximum chips per system
pub const MAX_CHIPS: usize = 4;

/// Maximum devices of each kind
pub const MAX_DEVICES: usize = 8;

/// Maximum counters listed for one device
pub const MAX_DEVICE_COUNTERS: usize = NUM_COUNTERS;

/// Most counters a scaler can combine into a 64-bit value
pub const MAX_SCALER_COUNTERS: usize = 4;

/// Master mode bit selecting a 16-bit data bus
pub const MASTER_MODE_16BIT_BUS: u16 = 0x2000;

/// One Am9513 chip on the I/O bus
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChipConfig {
    pub name: Label,
    /// Data port; the command port is at `base_address + 1`
    pub base_address: u16,
    /// Value written to the master mode register at open
    #[cfg_attr(feature = "serde", serde(default))]
    pub master_mode: u16,
}

impl ChipConfig {
    pub fn new(name: &str, base_address: u16, master_mode: u16) -> Self {
        Self {
            name: label(name),
            base_address,
            master_mode,
        }
    }

    /// Whether the chip is strapped for 16-bit data transfers
    pub fn sixteen_bit_bus(&self) -> bool {
        self.master_mode & MASTER_MODE_16BIT_BUS != 0
    }
}

/// Reference to one counter on a named chip
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CounterSpec {
    pub chip: Label,
    /// Counter number, 1 through 5
    pub counter: u8,
}

impl CounterSpec {
    pub fn new(chip: &str, counter: u8) -> Self {
        Self {
            chip: label(chip),
            counter,
        }
    }

    /// Zero-based counter index
    pub fn index(&self) -> Result<usize, Error> {
        match self.counter {
            1..=5 => Ok(self.counter as usize - 1),
            number => Err(Error::InvalidCounterNumber { number }),
        }
    }
}

/// Stepper motor built from two adjacent counters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotorConfig {
    pub name: Label,
    /// Low order (step rate) counter, then high order (step count) counter
    pub counters: Vec<CounterSpec, MAX_DEVICE_COUNTERS>,
    /// Bit of the direction output that selects positive travel
    pub direction_bit: u8,
    /// Steps per second
    pub step_frequency: f64,
    /// Frequency of the chip's F1 source in Hz
    pub clock_frequency: f64,
    /// Extra polls that must see the output low before a move counts as done
    #[cfg_attr(feature = "serde", serde(default))]
    pub busy_retries: u32,
    /// Position reported right after open
    #[cfg_attr(feature = "serde", serde(default))]
    pub initial_position: i64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            name: Label::new(),
            counters: Vec::new(),
            direction_bit: 0,
            step_frequency: 100.0,
            clock_frequency: 5.0e6,
            busy_retries: 0,
            initial_position: 0,
        }
    }
}

impl MotorConfig {
    /// Checks that need no knowledge of the chips
    pub fn validate(&self) -> Result<(), Error> {
        if self.counters.len() != 2 {
            return Err(Error::WrongCounterCount {
                expected: 2,
                found: self.counters.len() as u8,
            });
        }
        let low = &self.counters[0];
        let high = &self.counters[1];
        low.index()?;
        high.index()?;
        if low.chip != high.chip {
            return Err(Error::CountersOnDifferentChips);
        }
        if high.counter != low.counter + 1 {
            return Err(Error::CountersNotAdjacent {
                low: low.counter,
                high: high.counter,
            });
        }
        if !(self.step_frequency > 0.0) {
            return Err(Error::InvalidStepFrequency);
        }
        if !(self.clock_frequency > 0.0) {
            return Err(Error::InvalidClockFrequency);
        }
        Ok(())
    }
}

/// Event scaler built from one or more cascaded counters
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScalerConfig {
    pub name: Label,
    /// Least significant counter first
    pub counters: Vec<CounterSpec, MAX_DEVICE_COUNTERS>,
    /// Gating code for the first counter (0-7)
    #[cfg_attr(feature = "serde", serde(default))]
    pub gating_control: u8,
    /// Count source code for the first counter (0-15)
    #[cfg_attr(feature = "serde", serde(default))]
    pub count_source: u8,
}

impl ScalerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.counters.is_empty() {
            return Err(Error::NoCounters);
        }
        if self.counters.len() > MAX_SCALER_COUNTERS {
            return Err(Error::TooManyCounters {
                max: MAX_SCALER_COUNTERS as u8,
            });
        }
        for spec in &self.counters {
            spec.index()?;
        }
        Gating::from_code(self.gating_control)?;
        CountSource::from_code(self.count_source)?;
        Ok(())
    }
}

/// Countdown timer built from one counter
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimerConfig {
    pub name: Label,
    pub counters: Vec<CounterSpec, MAX_DEVICE_COUNTERS>,
    /// Frequency of the chip's F1 source in Hz
    pub clock_frequency: f64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            name: Label::new(),
            counters: Vec::new(),
            clock_frequency: 5.0e6,
        }
    }
}

impl TimerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        match self.counters.len() {
            0 => return Err(Error::NoCounters),
            1 => {}
            _ => return Err(Error::NotYetImplemented(Operation::MultiCounterTimer)),
        }
        self.counters[0].index()?;
        if !(self.clock_frequency > 0.0) {
            return Err(Error::InvalidClockFrequency);
        }
        Ok(())
    }
}
