//! Error taxonomy
//!
//! Every fallible operation in the workspace returns [`Error`]. Each variant
//! names one condition and carries the values needed to describe it;
//! [`Error::kind`] groups them into the broad classes callers dispatch on.

use core::fmt;

use am9513_hal::HalError;
use heapless::String;

/// Maximum label length for chip and device names
pub const MAX_LABEL_LEN: usize = 16;

/// Name of a chip or logical device
pub type Label = String<MAX_LABEL_LEN>;

/// Broad error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// A caller-supplied value or configuration is unusable
    IllegalArgument,
    /// A required cross-reference is missing (construction-order bug)
    CorruptState,
    /// A counter is already held by another device
    AlreadyInUse,
    /// A counter being released is not held
    NotOwned,
    /// The operation exists but has not been implemented for this device
    NotYetImplemented,
    /// The device cannot perform this operation at all
    Unsupported,
    /// The port transport reported a failure
    Io,
}

/// Operations that some devices refuse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// Re-open a device in place
    Resynchronize,
    /// Zero a timer
    ClearTimer,
    /// Read a timer without stopping it
    ReadTimer,
    /// Build a timer from more than one counter
    MultiCounterTimer,
    /// Search for a motor home switch
    HomeSearch,
    /// Switch a scaler out of counter mode
    ScalerPresetMode,
    /// Switch a timer out of preset mode
    TimerCounterMode,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operation::Resynchronize => "resynchronize",
            Operation::ClearTimer => "clearing a timer",
            Operation::ReadTimer => "reading a running timer",
            Operation::MultiCounterTimer => "combining more than one counter into a timer",
            Operation::HomeSearch => "home search",
            Operation::ScalerPresetMode => "preset mode for a scaler",
            Operation::TimerCounterMode => "counter mode for a timer",
        };
        f.write_str(text)
    }
}

/// Errors raised by the chip interface and the logical drivers
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Counter numbers are 1 through 5
    InvalidCounterNumber { number: u8 },
    /// A device was configured with the wrong number of counters
    WrongCounterCount { expected: u8, found: u8 },
    /// A device needs at least one counter
    NoCounters,
    /// A device was configured with more counters than it can combine
    TooManyCounters { max: u8 },
    /// A counter reference names a chip that does not exist
    UnknownChip { name: Label },
    /// Two entries share one name
    DuplicateName { name: Label },
    /// Motor counters must live on one chip
    CountersOnDifferentChips,
    /// The motor's high order counter must sit directly above the low order one
    CountersNotAdjacent { low: u8, high: u8 },
    /// Step frequency must be a positive number
    InvalidStepFrequency,
    /// Clock frequency must be a positive number
    InvalidClockFrequency,
    /// The requested interval does not fit any frequency divider
    IntervalTooLong,
    /// The requested interval is shorter than one clock tick
    IntervalTooShort,
    /// Relative moves are limited to 65534 steps
    MoveTooLarge { steps: i64 },
    /// Gating control codes are 0 through 7
    InvalidGatingControl { code: u8 },
    /// Count source codes are 0 through 15
    InvalidCountSource { code: u8 },
    /// A mode register holds a source that is not a frequency divider
    InvalidFrequencyDivider { mode: u16 },
    /// A required reference is missing
    CorruptState { what: &'static str },
    /// The counter is already held by another device
    CounterInUse {
        chip: Label,
        counter: u8,
        owner: Label,
    },
    /// The counter being released is not held by the caller
    CounterNotOwned { chip: Label, counter: u8 },
    /// The operation is not implemented yet
    NotYetImplemented(Operation),
    /// The operation is not supported
    Unsupported(Operation),
    /// The port transport failed
    Io(HalError),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CorruptState { .. } => ErrorKind::CorruptState,
            Error::CounterInUse { .. } => ErrorKind::AlreadyInUse,
            Error::CounterNotOwned { .. } => ErrorKind::NotOwned,
            Error::NotYetImplemented(_) => ErrorKind::NotYetImplemented,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Io(_) => ErrorKind::Io,
            _ => ErrorKind::IllegalArgument,
        }
    }
}

impl From<HalError> for Error {
    fn from(e: HalError) -> Self {
        Error::Io(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCounterNumber { number } => {
                write!(f, "counter number {} is outside the range 1-5", number)
            }
            Error::WrongCounterCount { expected, found } => write!(
                f,
                "the number of counters ({}) should be equal to {}",
                found, expected
            ),
            Error::NoCounters => f.write_str("the number of counters should be greater than zero"),
            Error::TooManyCounters { max } => {
                write!(f, "at most {} counters can be combined", max)
            }
            Error::UnknownChip { name } => write!(f, "no Am9513 chip named '{}'", name),
            Error::DuplicateName { name } => write!(f, "the name '{}' is used twice", name),
            Error::CountersOnDifferentChips => {
                f.write_str("the counters used for a motor must be from the same chip")
            }
            Error::CountersNotAdjacent { low, high } => write!(
                f,
                "the low order counter {} is not immediately below the high order counter {}",
                low, high
            ),
            Error::InvalidStepFrequency => {
                f.write_str("the motor step frequency must be a positive number")
            }
            Error::InvalidClockFrequency => {
                f.write_str("the clock frequency must be a positive number")
            }
            Error::IntervalTooLong => {
                f.write_str("the requested interval is too long for the clock frequency")
            }
            Error::IntervalTooShort => {
                f.write_str("the requested interval is shorter than one clock tick")
            }
            Error::MoveTooLarge { steps } => write!(
                f,
                "a relative move of {} steps was requested; the maximum is 65534 steps",
                steps
            ),
            Error::InvalidGatingControl { code } => {
                write!(f, "gating control code {} is outside the range 0-7", code)
            }
            Error::InvalidCountSource { code } => {
                write!(f, "count source code {} is outside the range 0-15", code)
            }
            Error::InvalidFrequencyDivider { mode } => write!(
                f,
                "illegal frequency divider found in counter mode register {:#06x}",
                mode
            ),
            Error::CorruptState { what } => write!(f, "the {} is missing", what),
            Error::CounterInUse {
                chip,
                counter,
                owner,
            } => write!(
                f,
                "counter {} in interface '{}' is already in use by '{}'",
                counter, chip, owner
            ),
            Error::CounterNotOwned { chip, counter } => write!(
                f,
                "counter {} in interface '{}' is not held by this device",
                counter, chip
            ),
            Error::NotYetImplemented(op) => write!(f, "{} is not yet implemented", op),
            Error::Unsupported(op) => write!(f, "{} is not supported", op),
            Error::Io(e) => write!(f, "port I/O error: {}", e),
        }
    }
}

/// Build a [`Label`] from a string, truncating at [`MAX_LABEL_LEN`] bytes
pub fn label(name: &str) -> Label {
    let mut out = Label::new();
    for c in name.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::MoveTooLarge { steps: 65535 }.kind(),
            ErrorKind::IllegalArgument
        );
        assert_eq!(
            Error::CounterInUse {
                chip: label("am9513"),
                counter: 2,
                owner: label("mtr"),
            }
            .kind(),
            ErrorKind::AlreadyInUse
        );
        assert_eq!(
            Error::CounterNotOwned {
                chip: label("am9513"),
                counter: 2,
            }
            .kind(),
            ErrorKind::NotOwned
        );
        assert_eq!(
            Error::NotYetImplemented(Operation::ClearTimer).kind(),
            ErrorKind::NotYetImplemented
        );
        assert_eq!(Error::from(HalError::AccessDenied).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_messages_name_the_culprit() {
        let e = Error::CounterInUse {
            chip: label("ctc0"),
            counter: 3,
            owner: label("theta"),
        };
        assert_eq!(
            e.to_string(),
            "counter 3 in interface 'ctc0' is already in use by 'theta'"
        );

        let e = Error::MoveTooLarge { steps: -70000 };
        assert!(e.to_string().contains("-70000"));
    }

    #[test]
    fn test_label_truncates() {
        let l = label("a_very_long_device_name_indeed");
        assert_eq!(l.len(), MAX_LABEL_LEN);
        assert_eq!(l.as_str(), "a_very_long_devi");
    }
}
