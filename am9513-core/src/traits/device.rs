//! Behaviour common to every logical device

use crate::error::{Error, Operation};

/// A named device that owns one or more counters
pub trait Device {
    /// Name the device registers its counters under
    fn name(&self) -> &str;

    /// Re-open the device in place
    fn resynchronize(&mut self) -> Result<(), Error> {
        Err(Error::NotYetImplemented(Operation::Resynchronize))
    }
}
