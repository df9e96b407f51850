//! Am9513 chip interface
//!
//! [`Am9513`] owns the port pair of one chip. It keeps shadow copies of the
//! master mode, every counter's mode/load/hold registers and the status
//! byte, and records which logical device holds each counter.
//!
//! Register transfers go through a single pair of helpers that honour the
//! bus width: on a 16-bit bus a register moves as one word, otherwise as two
//! bytes, low byte first.

pub(crate) mod counter;
pub mod register;

use core::cell::RefCell;
use core::fmt;

use am9513_core::config::{ChipConfig, MASTER_MODE_16BIT_BUS};
use am9513_core::error::label;
use am9513_core::mode::CounterMode;
use am9513_core::{Error, Label, NUM_COUNTERS};
use am9513_hal::PortIo;

pub use counter::CounterRef;
use register::{
    status_bit, Command, Register, CMD_LOAD_ALL, CMD_RESET, COMMAND_PORT, DATA_PORT, PORT_SPAN,
};

/// A chip shared by the drivers that use its counters
pub type SharedChip<P> = RefCell<Am9513<P>>;

/// One Am9513 behind a data/command port pair
#[derive(Debug)]
pub struct Am9513<P> {
    name: Label,
    port: P,
    base_address: u16,
    master_mode: u16,
    mode: [u16; NUM_COUNTERS],
    load: [u16; NUM_COUNTERS],
    hold: [u16; NUM_COUNTERS],
    status: u8,
    owners: [Option<Label>; NUM_COUNTERS],
    is_open: bool,
}

impl<P: PortIo> Am9513<P> {
    /// Create a closed chip interface
    pub fn new(config: &ChipConfig, port: P) -> Self {
        Self {
            name: config.name.clone(),
            port,
            base_address: config.base_address,
            master_mode: config.master_mode,
            mode: [0; NUM_COUNTERS],
            load: [0; NUM_COUNTERS],
            hold: [0; NUM_COUNTERS],
            status: 0,
            owners: [None, None, None, None, None],
            is_open: false,
        }
    }

    /// Create the interface and open it
    pub fn open_with(config: &ChipConfig, port: P) -> Result<Self, Error> {
        let mut chip = Self::new(config, port);
        chip.open()?;
        Ok(chip)
    }

    /// Wrap for sharing between drivers
    pub fn shared(self) -> SharedChip<P> {
        RefCell::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_address(&self) -> u16 {
        self.base_address
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn sixteen_bit_bus(&self) -> bool {
        self.master_mode & MASTER_MODE_16BIT_BUS != 0
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Claim the ports, reset the chip and put every counter in a known state
    ///
    /// Each counter is left counting up repetitively from zero with a zero
    /// hold register, disarmed. The ports are given back if any transfer
    /// fails.
    pub fn open(&mut self) -> Result<(), Error> {
        self.port.request_region(self.base_address, PORT_SPAN)?;
        if let Err(e) = self.initialize() {
            let _ = self.port.release_region(self.base_address, PORT_SPAN);
            return Err(e);
        }

        self.is_open = true;
        info!(
            "Am9513 '{}' open at {=u16:#x}, master mode {=u16:#x}",
            self.name.as_str(),
            self.base_address,
            self.master_mode
        );
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), Error> {
        if self.sixteen_bit_bus() {
            warn!("Am9513 '{}': 16-bit bus support is untested", self.name.as_str());
        }

        self.command(CMD_RESET)?;
        self.command(CMD_LOAD_ALL)?;

        // The chip is in 8-bit mode after reset, so the master mode goes
        // out a byte at a time regardless of the configured bus width.
        self.command(Register::MasterMode.select())?;
        let [low, high] = self.master_mode.to_le_bytes();
        let data = self.base_address + DATA_PORT;
        if self.sixteen_bit_bus() {
            self.port.outp16(data, low as u16)?;
            self.port.outp16(data, high as u16)?;
        } else {
            self.port.outp8(data, low)?;
            self.port.outp8(data, high)?;
        }

        for i in 0..NUM_COUNTERS {
            self.set_counter_mode(i, CounterMode::POWER_ON.bits())?;
            self.load_counter(i, 0)?;
            self.set_hold_register(i, 0)?;
        }
        Ok(())
    }

    /// Release the ports and forget every counter assignment
    pub fn close(&mut self) -> Result<(), Error> {
        self.owners = [None, None, None, None, None];
        self.is_open = false;
        self.port.release_region(self.base_address, PORT_SPAN)?;
        info!("Am9513 '{}' closed", self.name.as_str());
        Ok(())
    }

    /// Close and reopen the chip
    pub fn resynchronize(&mut self) -> Result<(), Error> {
        self.close()?;
        self.open()
    }

    fn command(&mut self, cmd: u8) -> Result<(), Error> {
        trace!("Am9513 {=u16:#x} command {=u8:#x}", self.base_address, cmd);
        let port = self.base_address + COMMAND_PORT;
        if self.sixteen_bit_bus() {
            self.port.outp16(port, 0xFF00 | cmd as u16)?;
        } else {
            self.port.outp8(port, cmd)?;
        }
        Ok(())
    }

    fn read_register(&mut self, register: Register) -> Result<u16, Error> {
        self.command(register.select())?;
        let port = self.base_address + DATA_PORT;
        let value = if self.sixteen_bit_bus() {
            self.port.inp16(port)?
        } else {
            let low = self.port.inp8(port)?;
            let high = self.port.inp8(port)?;
            u16::from_le_bytes([low, high])
        };
        trace!("Am9513 {=u16:#x} read {} = {=u16:#x}", self.base_address, register, value);
        Ok(value)
    }

    fn write_register(&mut self, register: Register, value: u16) -> Result<(), Error> {
        trace!("Am9513 {=u16:#x} write {} = {=u16:#x}", self.base_address, register, value);
        self.command(register.select())?;
        let port = self.base_address + DATA_PORT;
        if self.sixteen_bit_bus() {
            self.port.outp16(port, value)?;
        } else {
            let [low, high] = value.to_le_bytes();
            self.port.outp8(port, low)?;
            self.port.outp8(port, high)?;
        }
        Ok(())
    }

    fn counter_command(&mut self, command: Command) -> Result<(), Error> {
        self.command(command.byte())
    }

    /// Read the master mode register from the chip
    pub fn get_master_mode(&mut self) -> Result<u16, Error> {
        self.master_mode = self.read_register(Register::MasterMode)?;
        Ok(self.master_mode)
    }

    pub fn set_counter_mode(&mut self, counter: usize, mode: u16) -> Result<(), Error> {
        let i = check_index(counter)?;
        self.mode[i] = mode;
        self.write_register(Register::Mode(i), mode)
    }

    pub fn get_counter_mode(&mut self, counter: usize) -> Result<u16, Error> {
        let i = check_index(counter)?;
        self.mode[i] = self.read_register(Register::Mode(i))?;
        Ok(self.mode[i])
    }

    pub fn set_load_register(&mut self, counter: usize, value: u16) -> Result<(), Error> {
        let i = check_index(counter)?;
        self.load[i] = value;
        self.write_register(Register::Load(i), value)
    }

    pub fn get_load_register(&mut self, counter: usize) -> Result<u16, Error> {
        let i = check_index(counter)?;
        self.load[i] = self.read_register(Register::Load(i))?;
        Ok(self.load[i])
    }

    pub fn set_hold_register(&mut self, counter: usize, value: u16) -> Result<(), Error> {
        let i = check_index(counter)?;
        self.hold[i] = value;
        self.write_register(Register::Hold(i), value)
    }

    pub fn get_hold_register(&mut self, counter: usize) -> Result<u16, Error> {
        let i = check_index(counter)?;
        self.hold[i] = self.read_register(Register::Hold(i))?;
        Ok(self.hold[i])
    }

    /// Write the load register and transfer it into the counter
    pub fn load_counter(&mut self, counter: usize, value: u16) -> Result<(), Error> {
        self.set_load_register(counter, value)?;
        self.counter_command(Command::Load(counter))
    }

    /// Latch the counter into its hold register and read it back
    pub fn read_counter(&mut self, counter: usize) -> Result<u16, Error> {
        let i = check_index(counter)?;
        self.counter_command(Command::Save(i))?;
        self.get_hold_register(i)
    }

    pub fn arm_counter(&mut self, counter: usize) -> Result<(), Error> {
        let i = check_index(counter)?;
        self.counter_command(Command::Arm(i))
    }

    pub fn disarm_counter(&mut self, counter: usize) -> Result<(), Error> {
        let i = check_index(counter)?;
        self.counter_command(Command::Disarm(i))
    }

    /// Force the counter output high
    pub fn set_tc(&mut self, counter: usize) -> Result<(), Error> {
        let i = check_index(counter)?;
        self.counter_command(Command::SetOutput(i))
    }

    /// Force the counter output low
    pub fn clear_tc(&mut self, counter: usize) -> Result<(), Error> {
        let i = check_index(counter)?;
        self.counter_command(Command::ClearOutput(i))
    }

    /// Read the status byte; bit `counter + 1` is the output of `counter`
    pub fn get_status(&mut self) -> Result<u8, Error> {
        self.command(Register::Status.select())?;
        self.status = self.port.inp8(self.base_address + DATA_PORT)?;
        Ok(self.status)
    }

    /// Output level of one counter, from a fresh status read
    pub fn output_high(&mut self, counter: usize) -> Result<bool, Error> {
        let i = check_index(counter)?;
        Ok(self.get_status()? & status_bit(i) != 0)
    }

    /// Shadow copy of a counter's mode register
    pub fn counter_mode(&self, counter: usize) -> Result<u16, Error> {
        Ok(self.mode[check_index(counter)?])
    }

    /// Shadow copy of a counter's load register
    pub fn load_register(&self, counter: usize) -> Result<u16, Error> {
        Ok(self.load[check_index(counter)?])
    }

    /// Shadow copy of a counter's hold register
    pub fn hold_register(&self, counter: usize) -> Result<u16, Error> {
        Ok(self.hold[check_index(counter)?])
    }

    /// Device currently holding a counter
    pub fn owner(&self, counter: usize) -> Result<Option<&str>, Error> {
        Ok(self.owners[check_index(counter)?].as_deref())
    }

    /// Mark counters as held by `owner`
    ///
    /// Counters are taken in order. If one is already held, the ones taken
    /// by this call are given back before the error is returned.
    pub fn acquire_counters(&mut self, owner: &str, counters: &[usize]) -> Result<(), Error> {
        for (n, &counter) in counters.iter().enumerate() {
            if let Err(e) = self.acquire_one(owner, counter) {
                for &taken in &counters[..n] {
                    self.owners[taken] = None;
                }
                return Err(e);
            }
        }
        debug!("Am9513 '{}': counters {} acquired by '{}'", self.name.as_str(), counters, owner);
        Ok(())
    }

    fn acquire_one(&mut self, owner: &str, counter: usize) -> Result<(), Error> {
        let i = check_index(counter)?;
        if let Some(holder) = &self.owners[i] {
            return Err(Error::CounterInUse {
                chip: self.name.clone(),
                counter: i as u8 + 1,
                owner: holder.clone(),
            });
        }
        self.owners[i] = Some(label(owner));
        Ok(())
    }

    /// Give back counters held by `owner`
    ///
    /// Nothing is released unless every listed counter is held by `owner`.
    pub fn release_counters(&mut self, owner: &str, counters: &[usize]) -> Result<(), Error> {
        for &counter in counters {
            let i = check_index(counter)?;
            match &self.owners[i] {
                Some(holder) if holder.as_str() == label(owner).as_str() => {}
                _ => {
                    return Err(Error::CounterNotOwned {
                        chip: self.name.clone(),
                        counter: i as u8 + 1,
                    })
                }
            }
        }
        for &counter in counters {
            self.owners[counter] = None;
        }
        debug!("Am9513 '{}': counters {} released by '{}'", self.name.as_str(), counters, owner);
        Ok(())
    }

    /// Snapshot of every register
    ///
    /// With `inquire` set, the master mode, all counter registers and the
    /// status byte are read back from the chip first; otherwise the shadow
    /// copies are reported.
    pub fn dump(&mut self, inquire: bool) -> Result<ChipSnapshot, Error> {
        if inquire {
            self.get_master_mode()?;
            for i in 0..NUM_COUNTERS {
                self.get_counter_mode(i)?;
            }
            for i in 0..NUM_COUNTERS {
                self.get_load_register(i)?;
            }
            for i in 0..NUM_COUNTERS {
                self.get_hold_register(i)?;
            }
            self.get_status()?;
        }

        Ok(ChipSnapshot {
            master_mode: self.master_mode,
            mode: self.mode,
            load: self.load,
            hold: self.hold,
            status: self.status,
        })
    }
}

fn check_index(counter: usize) -> Result<usize, Error> {
    if counter < NUM_COUNTERS {
        Ok(counter)
    } else {
        Err(Error::InvalidCounterNumber {
            number: counter.saturating_add(1).min(u8::MAX as usize) as u8,
        })
    }
}

/// Register contents of one chip at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipSnapshot {
    pub master_mode: u16,
    pub mode: [u16; NUM_COUNTERS],
    pub load: [u16; NUM_COUNTERS],
    pub hold: [u16; NUM_COUNTERS],
    pub status: u8,
}

impl fmt::Display for ChipSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Master mode reg = {:04x}", self.master_mode)?;
        for (i, mode) in self.mode.iter().enumerate() {
            writeln!(f, "Counter[{}] mode = {:04x}", i, mode)?;
        }
        for (i, load) in self.load.iter().enumerate() {
            writeln!(f, "Counter[{}] load = {:04x}", i, load)?;
        }
        for (i, hold) in self.hold.iter().enumerate() {
            writeln!(f, "Counter[{}] hold = {:04x}", i, hold)?;
        }
        writeln!(f, "Status          = {:02x}", self.status)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use am9513_core::ErrorKind;
    use am9513_hal::HalError;
    use am9513_hal_sim::SimChip;
    use std::string::ToString;

    const BASE: u16 = 0x300;

    fn config(master_mode: u16) -> ChipConfig {
        ChipConfig::new("ctc0", BASE, master_mode)
    }

    fn open_chip() -> Am9513<SimChip> {
        Am9513::open_with(&config(0x4000), SimChip::new(BASE)).unwrap()
    }

    #[test]
    fn test_open_programs_defaults() {
        let chip = open_chip();
        let sim = chip.port();
        assert!(sim.region_claimed());
        assert_eq!(sim.master_mode(), 0x4000);
        for i in 0..NUM_COUNTERS {
            let c = sim.counter(i);
            assert_eq!(c.mode, 0x0028);
            assert_eq!(c.load, 0);
            assert_eq!(c.hold, 0);
            assert_eq!(c.value, 0);
            assert!(!c.armed);
        }
    }

    #[test]
    fn test_failed_open_gives_ports_back() {
        let mut sim = SimChip::new(BASE);
        sim.fail_writes_after(5);
        let mut chip = Am9513::new(&config(0x4000), sim);

        assert_eq!(chip.open(), Err(Error::Io(HalError::Io)));
        assert!(!chip.is_open());
        assert!(!chip.port().region_claimed());

        chip.port_mut().clear_fault();
        chip.open().unwrap();
        assert!(chip.port().region_claimed());
        assert_eq!(chip.port().master_mode(), 0x4000);
    }

    #[test]
    fn test_open_fails_when_region_taken() {
        let mut sim = SimChip::new(BASE);
        sim.request_region(BASE, 2).unwrap();
        let err = Am9513::open_with(&config(0), sim).unwrap_err();
        assert_eq!(err, Error::Io(HalError::RegionUnavailable));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_register_round_trip_through_chip() {
        let mut chip = open_chip();
        chip.set_counter_mode(2, 0x8B02).unwrap();
        chip.set_load_register(2, 0x1234).unwrap();
        assert_eq!(chip.port().counter(2).mode, 0x8B02);
        assert_eq!(chip.get_load_register(2).unwrap(), 0x1234);
        assert_eq!(chip.get_counter_mode(2).unwrap(), 0x8B02);
        assert_eq!(chip.get_master_mode().unwrap(), 0x4000);
    }

    #[test]
    fn test_sixteen_bit_bus() {
        let mut chip = Am9513::open_with(&config(0x6000), SimChip::new(BASE)).unwrap();
        assert!(chip.sixteen_bit_bus());
        assert_eq!(chip.port().master_mode(), 0x6000);
        assert_eq!(chip.port().counter(4).mode, 0x0028);

        chip.load_counter(4, 0xBEEF).unwrap();
        assert_eq!(chip.port().counter(4).value, 0xBEEF);
        assert_eq!(chip.read_counter(4).unwrap(), 0xBEEF);
    }

    #[test]
    fn test_load_and_read_counter() {
        let mut chip = open_chip();
        chip.set_counter_mode(0, 0x0B00).unwrap();
        chip.load_counter(0, 50).unwrap();
        chip.arm_counter(0).unwrap();
        chip.port_mut().clock(20);
        assert_eq!(chip.read_counter(0).unwrap(), 30);
        assert_eq!(chip.hold_register(0).unwrap(), 30);

        chip.disarm_counter(0).unwrap();
        chip.port_mut().clock(20);
        assert_eq!(chip.read_counter(0).unwrap(), 30);
    }

    #[test]
    fn test_outputs_and_status() {
        let mut chip = open_chip();
        chip.set_tc(3).unwrap();
        assert_eq!(chip.get_status().unwrap(), 0x10);
        assert!(chip.output_high(3).unwrap());
        assert!(!chip.output_high(2).unwrap());
        chip.clear_tc(3).unwrap();
        assert_eq!(chip.get_status().unwrap(), 0);
    }

    #[test]
    fn test_bad_counter_index() {
        let mut chip = open_chip();
        assert_eq!(
            chip.arm_counter(5),
            Err(Error::InvalidCounterNumber { number: 6 })
        );
    }

    #[test]
    fn test_ownership() {
        let mut chip = open_chip();
        chip.acquire_counters("theta", &[0, 1]).unwrap();
        assert_eq!(chip.owner(1).unwrap(), Some("theta"));

        let err = chip.acquire_counters("i0", &[2, 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyInUse);
        assert_eq!(
            err.to_string(),
            "counter 2 in interface 'ctc0' is already in use by 'theta'"
        );
        // counter 2 was taken and then rolled back
        assert_eq!(chip.owner(2).unwrap(), None);

        assert_eq!(
            chip.release_counters("theta", &[1, 3]).unwrap_err().kind(),
            ErrorKind::NotOwned
        );
        assert_eq!(chip.owner(1).unwrap(), Some("theta"));
        assert_eq!(
            chip.release_counters("i0", &[0]).unwrap_err().kind(),
            ErrorKind::NotOwned
        );

        chip.release_counters("theta", &[0, 1]).unwrap();
        chip.acquire_counters("i0", &[0, 1]).unwrap();
    }

    #[test]
    fn test_close_clears_ownership() {
        let mut chip = open_chip();
        chip.acquire_counters("theta", &[0, 1]).unwrap();
        chip.close().unwrap();
        assert!(!chip.port().region_claimed());
        assert_eq!(chip.owner(0).unwrap(), None);

        chip.open().unwrap();
        chip.acquire_counters("other", &[0, 1]).unwrap();
    }

    #[test]
    fn test_resynchronize_reprograms() {
        let mut chip = open_chip();
        chip.set_counter_mode(1, 0x1002).unwrap();
        chip.resynchronize().unwrap();
        assert!(chip.port().region_claimed());
        assert_eq!(chip.port().counter(1).mode, 0x0028);
    }

    #[test]
    fn test_dump() {
        let mut chip = open_chip();
        chip.port_mut().outp8(BASE + 1, 0x09).unwrap();
        chip.port_mut().outp8(BASE, 0x34).unwrap();
        chip.port_mut().outp8(BASE, 0x12).unwrap();
        chip.set_tc(0).unwrap();

        let shadow = chip.dump(false).unwrap();
        assert_eq!(shadow.load[0], 0);

        let snap = chip.dump(true).unwrap();
        assert_eq!(snap.master_mode, 0x4000);
        assert_eq!(snap.load[0], 0x1234);
        assert_eq!(snap.mode[3], 0x0028);
        assert_eq!(snap.status, 0x02);

        let text = snap.to_string();
        assert!(text.starts_with("Master mode reg = 4000\n"));
        assert!(text.contains("Counter[0] load = 1234\n"));
        assert!(text.ends_with("Status          = 02\n"));
    }
}
