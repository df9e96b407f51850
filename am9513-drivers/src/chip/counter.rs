//! Handle to one counter on a shared chip

use am9513_core::config::CounterSpec;
use am9513_core::Error;
use am9513_hal::PortIo;

use super::{Am9513, SharedChip};

/// One counter on a shared chip, as used by a logical driver
pub struct CounterRef<'a, P> {
    chip: &'a SharedChip<P>,
    index: usize,
}

impl<P> Clone for CounterRef<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for CounterRef<'_, P> {}

impl<'a, P: PortIo> CounterRef<'a, P> {
    pub fn new(chip: &'a SharedChip<P>, index: usize) -> Self {
        Self { chip, index }
    }

    /// Find the chip a counter spec names among `chips`
    ///
    /// The chip must be open.
    pub fn resolve(spec: &CounterSpec, chips: &'a [SharedChip<P>]) -> Result<Self, Error> {
        let index = spec.index()?;
        for chip in chips {
            let c = chip.try_borrow().map_err(|_| busy())?;
            if c.name() == spec.chip.as_str() {
                if !c.is_open() {
                    return Err(Error::CorruptState {
                        what: "open chip interface",
                    });
                }
                return Ok(Self::new(chip, index));
            }
        }
        Err(Error::UnknownChip {
            name: spec.chip.clone(),
        })
    }

    /// 0-based counter index
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based counter number
    pub fn number(&self) -> u8 {
        self.index as u8 + 1
    }

    pub fn chip(&self) -> &'a SharedChip<P> {
        self.chip
    }

    pub fn same_chip(&self, other: &CounterRef<'_, P>) -> bool {
        core::ptr::eq(self.chip, other.chip)
    }

    /// Run `f` with exclusive access to the chip
    pub fn with<T>(&self, f: impl FnOnce(&mut Am9513<P>, usize) -> Result<T, Error>) -> Result<T, Error> {
        let mut chip = self.chip.try_borrow_mut().map_err(|_| busy())?;
        f(&mut *chip, self.index)
    }

    pub fn mode(&self) -> Result<u16, Error> {
        self.with(|c, i| c.counter_mode(i))
    }

    pub fn set_mode(&self, mode: u16) -> Result<(), Error> {
        self.with(|c, i| c.set_counter_mode(i, mode))
    }

    pub fn load_register(&self) -> Result<u16, Error> {
        self.with(|c, i| c.load_register(i))
    }

    pub fn set_load_register(&self, value: u16) -> Result<(), Error> {
        self.with(|c, i| c.set_load_register(i, value))
    }

    pub fn load(&self, value: u16) -> Result<(), Error> {
        self.with(|c, i| c.load_counter(i, value))
    }

    pub fn read(&self) -> Result<u16, Error> {
        self.with(|c, i| c.read_counter(i))
    }

    pub fn arm(&self) -> Result<(), Error> {
        self.with(|c, i| c.arm_counter(i))
    }

    pub fn disarm(&self) -> Result<(), Error> {
        self.with(|c, i| c.disarm_counter(i))
    }

    pub fn set_tc(&self) -> Result<(), Error> {
        self.with(|c, i| c.set_tc(i))
    }

    pub fn clear_tc(&self) -> Result<(), Error> {
        self.with(|c, i| c.clear_tc(i))
    }

    /// Output level from a fresh status read
    pub fn output_high(&self) -> Result<bool, Error> {
        self.with(|c, i| c.output_high(i))
    }
}

fn busy() -> Error {
    Error::CorruptState {
        what: "exclusive access to the chip interface",
    }
}

/// Mark every counter as held by `owner`, giving all of them back on failure
pub(crate) fn acquire_all<P: PortIo>(owner: &str, counters: &[CounterRef<'_, P>]) -> Result<(), Error> {
    for (n, counter) in counters.iter().enumerate() {
        if let Err(e) = counter.with(|c, i| c.acquire_counters(owner, &[i])) {
            for taken in &counters[..n] {
                taken.with(|c, i| c.release_counters(owner, &[i]))?;
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Give back every counter held by `owner`
pub(crate) fn release_all<P: PortIo>(owner: &str, counters: &[CounterRef<'_, P>]) -> Result<(), Error> {
    for counter in counters {
        counter.with(|c, i| c.release_counters(owner, &[i]))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use am9513_core::config::ChipConfig;
    use am9513_core::ErrorKind;
    use am9513_hal_sim::SimChip;

    fn chips() -> [SharedChip<SimChip>; 2] {
        [
            Am9513::open_with(&ChipConfig::new("a", 0x300, 0), SimChip::new(0x300))
                .unwrap()
                .shared(),
            Am9513::open_with(&ChipConfig::new("b", 0x310, 0), SimChip::new(0x310))
                .unwrap()
                .shared(),
        ]
    }

    #[test]
    fn test_resolve() {
        let chips = chips();
        let c = CounterRef::resolve(&CounterSpec::new("b", 3), &chips).unwrap();
        assert_eq!(c.index(), 2);
        assert!(core::ptr::eq(c.chip(), &chips[1]));

        assert_eq!(
            CounterRef::resolve(&CounterSpec::new("z", 1), &chips).err(),
            Some(Error::UnknownChip {
                name: am9513_core::error::label("z")
            })
        );
        assert_eq!(
            CounterRef::resolve(&CounterSpec::new("a", 0), &chips).err(),
            Some(Error::InvalidCounterNumber { number: 0 })
        );
    }

    #[test]
    fn test_resolve_closed_chip() {
        let chips = chips();
        chips[0].borrow_mut().close().unwrap();
        let err = CounterRef::resolve(&CounterSpec::new("a", 1), &chips).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::CorruptState);
    }

    #[test]
    fn test_acquire_all_rolls_back_across_chips() {
        let chips = chips();
        chips[1].borrow_mut().acquire_counters("other", &[0]).unwrap();

        let counters = [CounterRef::new(&chips[0], 4), CounterRef::new(&chips[1], 0)];
        let err = acquire_all("i0", &counters).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyInUse);
        assert_eq!(chips[0].borrow().owner(4).unwrap(), None);
    }

    #[test]
    fn test_same_chip() {
        let chips = chips();
        let a1 = CounterRef::new(&chips[0], 0);
        let a2 = CounterRef::new(&chips[0], 1);
        let b1 = CounterRef::new(&chips[1], 0);
        assert!(a1.same_chip(&a2));
        assert!(!a1.same_chip(&b1));
    }
}
