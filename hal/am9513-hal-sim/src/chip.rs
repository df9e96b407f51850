//! Behavioural model of one Am9513
//!
//! Modelled:
//!
//! - data pointer commands for the mode, load and hold registers of each
//!   counter, the master mode register and the status byte
//! - byte-sequenced 8-bit transfers (low byte first) and, once master mode
//!   bit 13 is set, whole-word 16-bit transfers
//! - arm, load, load and arm, disarm, save, disarm and save, set and clear
//!   toggle output, load all and reset
//! - counting up or down on F1..F5, SRC1..5 or TCN-1, once or repetitively
//! - level gating (codes 4 and 5) from a fixed level or another counter's
//!   output
//! - toggled outputs at terminal count
//! - a failing bus, for exercising error paths
//!
//! Not modelled: BCD, special gate, reload from hold, alarm registers,
//! edge gating, gate pins used as count sources, pulse-shaped outputs
//! (they read back low).

use am9513_hal::{HalError, PortIo};

const NUM_COUNTERS: usize = 5;

/// Mode register value after a reset command
const RESET_MODE: u16 = 0x0B00;
const MASTER_MODE_16BIT: u16 = 0x2000;
const COUNT_UP: u16 = 1 << 3;
const REPEAT: u16 = 1 << 5;
const OUTPUT_TOGGLE: u16 = 0b010;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pointer {
    Mode(usize),
    Load(usize),
    Hold(usize),
    MasterMode,
    Status,
    Unused,
}

/// Where a counter's GATE pin is tied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GateInput {
    /// Fixed logic level
    Level(bool),
    /// OUT pin of the given counter (0-based)
    Output(usize),
}

/// Registers and live state of one counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CounterView {
    pub mode: u16,
    pub load: u16,
    pub hold: u16,
    /// Live counter contents
    pub value: u16,
    pub armed: bool,
    /// Level on the OUT pin
    pub output: bool,
}

/// Bus traffic seen by the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStats {
    pub commands: u32,
    pub data_reads: u32,
    pub data_writes: u32,
    /// Commands that armed at least one counter
    pub arms: u32,
}

/// Simulated Am9513 at a fixed base port
#[derive(Debug)]
pub struct SimChip {
    base: u16,
    claimed: bool,
    master_mode: u16,
    counters: [CounterView; NUM_COUNTERS],
    gates: [GateInput; NUM_COUNTERS],
    pointer: Pointer,
    pending_low: Option<u8>,
    read_high: bool,
    prescaler: u64,
    stats: BusStats,
    /// Writes left before the bus starts failing
    writes_before_fault: Option<u32>,
}

impl SimChip {
    /// A chip in its reset state answering at `base` (data) and `base + 1` (command)
    pub fn new(base: u16) -> Self {
        let mut chip = Self {
            base,
            claimed: false,
            master_mode: 0,
            counters: [CounterView::default(); NUM_COUNTERS],
            gates: [GateInput::Level(true); NUM_COUNTERS],
            pointer: Pointer::Unused,
            pending_low: None,
            read_high: false,
            prescaler: 0,
            stats: BusStats::default(),
            writes_before_fault: None,
        };
        chip.reset();
        chip
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    /// Whether the port region is currently requested
    pub fn region_claimed(&self) -> bool {
        self.claimed
    }

    pub fn master_mode(&self) -> u16 {
        self.master_mode
    }

    /// Snapshot of counter `index` (0-based)
    pub fn counter(&self, index: usize) -> CounterView {
        self.counters[index % NUM_COUNTERS]
    }

    /// Status byte: bit `index + 1` is the OUT level of counter `index`
    pub fn status(&self) -> u8 {
        self.counters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.output)
            .fold(0, |acc, (i, _)| acc | (1 << (i + 1)))
    }

    pub fn stats(&self) -> BusStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = BusStats::default();
    }

    /// Let `writes` more port writes through, then fail every one after
    pub fn fail_writes_after(&mut self, writes: u32) {
        self.writes_before_fault = Some(writes);
    }

    pub fn clear_fault(&mut self) {
        self.writes_before_fault = None;
    }

    /// Tie the GATE pin of counter `index`
    pub fn wire_gate(&mut self, index: usize, input: GateInput) {
        self.gates[index % NUM_COUNTERS] = input;
    }

    /// Advance the input clock by `ticks` periods
    ///
    /// Counters sourced from F1..F5 see one edge every 1, 16, 256, 4096 or
    /// 65536 ticks.
    pub fn clock(&mut self, ticks: u64) {
        let clocked = self
            .counters
            .iter()
            .any(|c| c.armed && frequency_ratio(c.mode).is_some());
        if !clocked {
            self.prescaler = self.prescaler.wrapping_add(ticks);
            return;
        }

        for _ in 0..ticks {
            self.prescaler = self.prescaler.wrapping_add(1);
            for i in 0..NUM_COUNTERS {
                if let Some(ratio) = frequency_ratio(self.counters[i].mode) {
                    if self.prescaler % ratio == 0 {
                        self.count_edge(i);
                    }
                }
            }
        }
    }

    /// Deliver `count` edges on input pin SRC `source` (1-5)
    pub fn pulse_source(&mut self, source: u8, count: u32) {
        for _ in 0..count {
            for i in 0..NUM_COUNTERS {
                if source_code(self.counters[i].mode) == source {
                    self.count_edge(i);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.master_mode = 0;
        for c in self.counters.iter_mut() {
            *c = CounterView {
                mode: RESET_MODE,
                ..CounterView::default()
            };
        }
        self.pointer = Pointer::Unused;
        self.pending_low = None;
        self.read_high = false;
    }

    fn sixteen_bit(&self) -> bool {
        self.master_mode & MASTER_MODE_16BIT != 0
    }

    fn command(&mut self, cmd: u8) {
        self.stats.commands += 1;
        let mask = cmd & 0x1F;

        match cmd {
            0x00..=0x1F => self.load_pointer(cmd),
            0x20..=0x3F => {
                self.stats.arms += 1;
                self.each(mask, |c| c.armed = true);
            }
            0x40..=0x5F => self.each(mask, |c| c.value = c.load),
            0x60..=0x7F => {
                self.stats.arms += 1;
                self.each(mask, |c| {
                    c.value = c.load;
                    c.armed = true;
                });
            }
            0x80..=0x9F => self.each(mask, |c| c.armed = false),
            0xA0..=0xBF => self.each(mask, |c| c.hold = c.value),
            0xC0..=0xDF => self.each(mask, |c| {
                c.armed = false;
                c.hold = c.value;
            }),
            0xE1..=0xE5 => self.counters[(cmd - 0xE1) as usize].output = false,
            0xE9..=0xED => self.counters[(cmd - 0xE9) as usize].output = true,
            0xFF => self.reset(),
            _ => {}
        }
    }

    fn each(&mut self, mask: u8, mut f: impl FnMut(&mut CounterView)) {
        for (i, c) in self.counters.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                f(c);
            }
        }
    }

    fn load_pointer(&mut self, cmd: u8) {
        let element = (cmd >> 3) & 0b11;
        let group = (cmd & 0b111) as usize;

        self.pointer = match (element, group) {
            (0, 1..=5) => Pointer::Mode(group - 1),
            (1, 1..=5) => Pointer::Load(group - 1),
            (2, 1..=5) => Pointer::Hold(group - 1),
            (2, 7) => Pointer::MasterMode,
            (3, 7) => Pointer::Status,
            _ => Pointer::Unused,
        };
        self.pending_low = None;
        self.read_high = false;
    }

    fn read_word(&self) -> u16 {
        match self.pointer {
            Pointer::Mode(i) => self.counters[i].mode,
            Pointer::Load(i) => self.counters[i].load,
            Pointer::Hold(i) => self.counters[i].hold,
            Pointer::MasterMode => self.master_mode,
            Pointer::Status => self.status() as u16,
            Pointer::Unused => 0,
        }
    }

    fn write_word(&mut self, word: u16) {
        match self.pointer {
            Pointer::Mode(i) => self.counters[i].mode = word,
            Pointer::Load(i) => self.counters[i].load = word,
            Pointer::Hold(i) => self.counters[i].hold = word,
            Pointer::MasterMode => self.master_mode = word,
            Pointer::Status | Pointer::Unused => {}
        }
    }

    fn read_data_byte(&mut self) -> u8 {
        self.stats.data_reads += 1;
        if self.pointer == Pointer::Status {
            return self.status();
        }
        let [low, high] = self.read_word().to_le_bytes();
        self.read_high = !self.read_high;
        if self.read_high {
            low
        } else {
            high
        }
    }

    fn write_data_byte(&mut self, byte: u8) {
        self.stats.data_writes += 1;
        match self.pending_low.take() {
            None => self.pending_low = Some(byte),
            Some(low) => self.write_word(u16::from_le_bytes([low, byte])),
        }
    }

    fn gate_open(&self, i: usize) -> bool {
        let level = match self.gates[i] {
            GateInput::Level(level) => level,
            GateInput::Output(j) => self.counters[j % NUM_COUNTERS].output,
        };
        match self.counters[i].mode >> 13 {
            4 => level,
            5 => !level,
            _ => true,
        }
    }

    /// Count one edge on counter `i`, following TCN-1 cascades
    fn count_edge(&mut self, i: usize) {
        let mut next = Some(i);
        let mut hops = 0;
        while let Some(i) = next.take() {
            if hops == NUM_COUNTERS {
                break;
            }
            hops += 1;
            if self.step(i) {
                let j = (i + 1) % NUM_COUNTERS;
                if source_code(self.counters[j].mode) == 0 {
                    next = Some(j);
                }
            }
        }
    }

    /// Returns true at terminal count
    fn step(&mut self, i: usize) -> bool {
        if !self.counters[i].armed || !self.gate_open(i) {
            return false;
        }

        let c = &mut self.counters[i];
        let terminal = if c.mode & COUNT_UP != 0 {
            if c.value == 0xFFFF {
                c.value = c.load;
                true
            } else {
                c.value += 1;
                false
            }
        } else if c.value == 0 {
            c.value = c.load.wrapping_sub(1);
            true
        } else {
            c.value -= 1;
            false
        };

        if terminal {
            if c.mode & 0b111 == OUTPUT_TOGGLE {
                c.output = !c.output;
            }
            if c.mode & REPEAT == 0 {
                c.armed = false;
            }
        }
        terminal
    }

    fn spend_write(&mut self) -> Result<(), HalError> {
        match self.writes_before_fault {
            Some(0) => Err(HalError::Io),
            Some(n) => {
                self.writes_before_fault = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn port(&self, port: u16) -> Result<bool, HalError> {
        if !self.claimed {
            return Err(HalError::RegionNotRequested);
        }
        match port.wrapping_sub(self.base) {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(HalError::Io),
        }
    }
}

fn source_code(mode: u16) -> u8 {
    ((mode >> 8) & 0xF) as u8
}

fn frequency_ratio(mode: u16) -> Option<u64> {
    match source_code(mode) {
        code @ 0xB..=0xF => Some(1 << (4 * (code - 0xB))),
        _ => None,
    }
}

impl PortIo for SimChip {
    fn inp8(&mut self, port: u16) -> Result<u8, HalError> {
        if self.port(port)? {
            Ok(self.status())
        } else {
            Ok(self.read_data_byte())
        }
    }

    fn inp16(&mut self, port: u16) -> Result<u16, HalError> {
        if self.port(port)? {
            return Ok(self.status() as u16);
        }
        if self.sixteen_bit() && self.pointer != Pointer::Status {
            self.stats.data_reads += 1;
            Ok(self.read_word())
        } else {
            Ok(self.read_data_byte() as u16)
        }
    }

    fn outp8(&mut self, port: u16, value: u8) -> Result<(), HalError> {
        let command = self.port(port)?;
        self.spend_write()?;
        if command {
            self.command(value);
        } else {
            self.write_data_byte(value);
        }
        Ok(())
    }

    fn outp16(&mut self, port: u16, value: u16) -> Result<(), HalError> {
        let command = self.port(port)?;
        self.spend_write()?;
        if command {
            self.command((value & 0xFF) as u8);
        } else if self.sixteen_bit() {
            self.stats.data_writes += 1;
            self.write_word(value);
        } else {
            self.write_data_byte((value & 0xFF) as u8);
        }
        Ok(())
    }

    fn request_region(&mut self, base: u16, len: u16) -> Result<(), HalError> {
        if base != self.base || len < 2 {
            return Err(HalError::AccessDenied);
        }
        if self.claimed {
            return Err(HalError::RegionUnavailable);
        }
        self.claimed = true;
        Ok(())
    }

    fn release_region(&mut self, base: u16, _len: u16) -> Result<(), HalError> {
        if base != self.base || !self.claimed {
            return Err(HalError::RegionNotRequested);
        }
        self.claimed = false;
        Ok(())
    }
}
