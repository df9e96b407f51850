//! Stepper motor trait

use crate::error::{Error, Operation};

use super::Device;

/// Direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Increasing step count
    Positive,
    /// Decreasing step count
    Negative,
}

impl Direction {
    /// +1 or -1
    pub const fn sign(self) -> i64 {
        match self {
            Direction::Positive => 1,
            Direction::Negative => -1,
        }
    }

    /// Direction of a signed step offset; zero counts as positive
    pub const fn of(steps: i64) -> Self {
        if steps >= 0 {
            Direction::Positive
        } else {
            Direction::Negative
        }
    }
}

/// A constant-speed stepper motor addressed in whole steps
pub trait StepperMotor: Device {
    /// Start a move to an absolute step position
    ///
    /// Returns once the move is programmed; poll [`StepperMotor::is_busy`]
    /// for completion.
    fn move_absolute(&mut self, destination: i64) -> Result<(), Error>;

    /// Current step position
    fn position(&mut self) -> Result<i64, Error>;

    /// Redefine the current position without moving
    fn set_position(&mut self, position: i64) -> Result<(), Error>;

    /// Whether a move is still in progress
    fn is_busy(&mut self) -> Result<bool, Error>;

    /// Emit exactly one step in `direction`
    fn jog(&mut self, direction: Direction) -> Result<(), Error>;

    /// Stop as soon as possible
    fn immediate_abort(&mut self) -> Result<(), Error>;

    /// Stop, decelerating if the hardware can
    fn soft_abort(&mut self) -> Result<(), Error> {
        self.immediate_abort()
    }

    fn positive_limit_hit(&mut self) -> Result<bool, Error> {
        Ok(false)
    }

    fn negative_limit_hit(&mut self) -> Result<bool, Error> {
        Ok(false)
    }

    /// Search for a home switch
    fn find_home(&mut self, _direction: Direction) -> Result<(), Error> {
        Err(Error::Unsupported(Operation::HomeSearch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_of_offset() {
        assert_eq!(Direction::of(5), Direction::Positive);
        assert_eq!(Direction::of(0), Direction::Positive);
        assert_eq!(Direction::of(-1), Direction::Negative);
        assert_eq!(Direction::Negative.sign(), -1);
    }
}
