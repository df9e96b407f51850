//! Blocking delay on the host

use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Delay that puts the calling thread to sleep
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}
