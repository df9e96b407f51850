//! Counter mode register model
//!
//! Layout of the 16-bit counter mode register:
//!
//! ```text
//!  15..13   12    11..8    7       6       5      4     3      2..0
//! +------+------+--------+-------+-------+------+-----+------+--------+
//! |gating| edge | source |special|reload |repeat| BCD |count | output |
//! |      |      |        | gate  |source |      |     |  up  |control |
//! +------+------+--------+-------+-------+------+-----+------+--------+
//! ```

use crate::error::Error;

/// Gating control field (bits 15..13)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gating {
    /// Count regardless of any gate
    None,
    /// Active high on TCN-1
    HighTcnMinus1,
    /// Active high level on GATE N+1
    HighGateNext,
    /// Active high level on GATE N-1
    HighGatePrevious,
    /// Active high level on GATE N
    HighLevel,
    /// Active low level on GATE N
    LowLevel,
    /// Active high edge on GATE N
    HighEdge,
    /// Active low edge on GATE N
    LowEdge,
}

impl Gating {
    /// Decode a 3-bit gating code
    pub fn from_code(code: u8) -> Result<Self, Error> {
        Ok(match code {
            0 => Gating::None,
            1 => Gating::HighTcnMinus1,
            2 => Gating::HighGateNext,
            3 => Gating::HighGatePrevious,
            4 => Gating::HighLevel,
            5 => Gating::LowLevel,
            6 => Gating::HighEdge,
            7 => Gating::LowEdge,
            _ => return Err(Error::InvalidGatingControl { code }),
        })
    }

    /// The 3-bit gating code
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Count source field (bits 11..8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CountSource {
    /// Terminal count of the counter below (counter 1 follows counter 5)
    TcnMinus1,
    /// SRC 1..5 input pin
    Source(u8),
    /// GATE 1..5 input pin
    Gate(u8),
    /// Internal frequency divider F1..F5
    Frequency(FrequencyScaler),
}

impl CountSource {
    /// Decode a 4-bit count source code
    pub fn from_code(code: u8) -> Result<Self, Error> {
        Ok(match code {
            0 => CountSource::TcnMinus1,
            1..=5 => CountSource::Source(code),
            6..=10 => CountSource::Gate(code - 5),
            11..=15 => CountSource::Frequency(FrequencyScaler::ALL[(code - 11) as usize]),
            _ => return Err(Error::InvalidCountSource { code }),
        })
    }

    /// The 4-bit count source code
    pub fn code(self) -> u8 {
        match self {
            CountSource::TcnMinus1 => 0,
            CountSource::Source(n) => n.clamp(1, 5),
            CountSource::Gate(n) => n.clamp(1, 5) + 5,
            CountSource::Frequency(f) => f.code(),
        }
    }
}

/// Output control field (bits 2..0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputControl {
    /// Output held low
    InactiveLow,
    /// Active high pulse at terminal count
    PulseHigh,
    /// Output toggles at terminal count
    Toggle,
    /// Output held high impedance
    HighImpedance,
    /// Active low pulse at terminal count
    PulseLow,
}

impl OutputControl {
    const fn bits(self) -> u16 {
        match self {
            OutputControl::InactiveLow => 0b000,
            OutputControl::PulseHigh => 0b001,
            OutputControl::Toggle => 0b010,
            OutputControl::HighImpedance => 0b100,
            OutputControl::PulseLow => 0b101,
        }
    }
}

/// Internal frequency divider feeding sources F1..F5
///
/// F1 is the raw clock; each next source divides by another 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrequencyScaler {
    F1,
    F2,
    F3,
    F4,
    F5,
}

impl FrequencyScaler {
    /// All dividers, smallest ratio first
    pub const ALL: [FrequencyScaler; 5] = [
        FrequencyScaler::F1,
        FrequencyScaler::F2,
        FrequencyScaler::F3,
        FrequencyScaler::F4,
        FrequencyScaler::F5,
    ];

    /// Clock ticks per count
    pub const fn ratio(self) -> u32 {
        1 << (4 * self as u32)
    }

    /// 4-bit count source code (0xB..=0xF)
    pub const fn code(self) -> u8 {
        0xB + self as u8
    }

    /// Count source bits in mode register position
    pub const fn source_bits(self) -> u16 {
        (self.code() as u16) << 8
    }

    /// Recover the divider from the count source bits of a mode register
    pub fn from_mode(mode: u16) -> Result<Self, Error> {
        match CountSource::from_code(((mode >> 8) & 0xF) as u8)? {
            CountSource::Frequency(f) => Ok(f),
            _ => Err(Error::InvalidFrequencyDivider { mode }),
        }
    }
}

/// A counter mode register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CounterMode(u16);

impl CounterMode {
    /// Mask selecting everything except the count source field
    pub const SOURCE_MASK: u16 = 0xF0FF;

    /// Mask that drops gating and repetition, used to fire a single pulse
    pub const SINGLE_SHOT_MASK: u16 = 0x1FCF;

    const FALLING_EDGE: u16 = 1 << 12;
    const SPECIAL_GATE: u16 = 1 << 7;
    const RELOAD_FROM_HOLD: u16 = 1 << 6;
    const REPEAT: u16 = 1 << 5;
    const BCD: u16 = 1 << 4;
    const COUNT_UP: u16 = 1 << 3;

    /// Mode written to every counter when the chip is opened
    pub const POWER_ON: CounterMode = CounterMode(Self::REPEAT | Self::COUNT_UP);

    /// All fields zero: ungated, rising edge, TCN-1, once, binary, down, output low
    pub const fn new() -> Self {
        CounterMode(0)
    }

    /// Wrap a raw register value
    pub const fn from_bits(bits: u16) -> Self {
        CounterMode(bits)
    }

    /// Raw register value
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn gating(self, gating: Gating) -> Self {
        CounterMode((self.0 & 0x1FFF) | ((gating.code() as u16) << 13))
    }

    #[must_use]
    pub const fn falling_edge(self) -> Self {
        CounterMode(self.0 | Self::FALLING_EDGE)
    }

    #[must_use]
    pub fn source(self, source: CountSource) -> Self {
        CounterMode((self.0 & Self::SOURCE_MASK) | ((source.code() as u16) << 8))
    }

    #[must_use]
    pub const fn special_gate(self) -> Self {
        CounterMode(self.0 | Self::SPECIAL_GATE)
    }

    #[must_use]
    pub const fn reload_from_hold(self) -> Self {
        CounterMode(self.0 | Self::RELOAD_FROM_HOLD)
    }

    #[must_use]
    pub const fn repeat(self) -> Self {
        CounterMode(self.0 | Self::REPEAT)
    }

    #[must_use]
    pub const fn bcd(self) -> Self {
        CounterMode(self.0 | Self::BCD)
    }

    #[must_use]
    pub const fn count_up(self) -> Self {
        CounterMode(self.0 | Self::COUNT_UP)
    }

    #[must_use]
    pub const fn output(self, output: OutputControl) -> Self {
        CounterMode((self.0 & !0b111) | output.bits())
    }

    /// Whether the counter reloads and keeps counting after terminal count
    pub const fn is_repeating(self) -> bool {
        self.0 & Self::REPEAT != 0
    }

    /// Whether the counter counts up
    pub const fn is_counting_up(self) -> bool {
        self.0 & Self::COUNT_UP != 0
    }
}

impl From<CounterMode> for u16 {
    fn from(mode: CounterMode) -> u16 {
        mode.bits()
    }
}
