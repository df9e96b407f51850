//! Linux `/dev/port` backend
//!
//! Drives a chip on an ISA or PC/104 bus from user space. Each byte offset
//! of `/dev/port` is one I/O port; reads and writes there become `inb` and
//! `outb` in the kernel. Opening the file needs `CAP_SYS_RAWIO`.
//!
//! `/dev/port` has no word access, so 16-bit transfers are refused and the
//! chip must be run with an 8-bit bus.

pub mod delay;
pub mod port;

pub use delay::StdDelay;
pub use port::DevPort;
