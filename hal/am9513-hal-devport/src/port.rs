//! Port access through a file of byte-addressed ports

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use am9513_hal::{HalError, PortIo};

/// Default device node
pub const DEV_PORT: &str = "/dev/port";

/// I/O ports reached through `/dev/port`
///
/// Regions are tracked per handle: a port may only be touched once a
/// region covering it has been requested, and two requests on the same
/// handle may not overlap.
#[derive(Debug)]
pub struct DevPort {
    file: File,
    regions: Vec<(u16, u16)>,
}

impl DevPort {
    /// Open `/dev/port` for reading and writing
    pub fn open() -> Result<Self, HalError> {
        Self::open_path(DEV_PORT)
    }

    /// Open some other file laid out like `/dev/port`
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, HalError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(io_error)?;
        Ok(Self {
            file,
            regions: Vec::new(),
        })
    }

    /// Port ranges currently requested, as (base, length)
    pub fn regions(&self) -> &[(u16, u16)] {
        &self.regions
    }

    fn check(&self, port: u16) -> Result<u64, HalError> {
        let claimed = self
            .regions
            .iter()
            .any(|&(base, len)| port >= base && (port - base) < len);
        if claimed {
            Ok(port as u64)
        } else {
            Err(HalError::RegionNotRequested)
        }
    }
}

fn io_error(e: io::Error) -> HalError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => HalError::AccessDenied,
        _ => HalError::Io,
    }
}

fn overlaps(a: (u16, u16), b: (u16, u16)) -> bool {
    let end = |(base, len): (u16, u16)| base as u32 + len as u32;
    (a.0 as u32) < end(b) && (b.0 as u32) < end(a)
}

impl PortIo for DevPort {
    fn inp8(&mut self, port: u16) -> Result<u8, HalError> {
        let offset = self.check(port)?;
        let mut buf = [0u8; 1];
        self.file.read_exact_at(&mut buf, offset).map_err(io_error)?;
        Ok(buf[0])
    }

    fn inp16(&mut self, _port: u16) -> Result<u16, HalError> {
        Err(HalError::Unsupported)
    }

    fn outp8(&mut self, port: u16, value: u8) -> Result<(), HalError> {
        let offset = self.check(port)?;
        self.file.write_all_at(&[value], offset).map_err(io_error)
    }

    fn outp16(&mut self, _port: u16, _value: u16) -> Result<(), HalError> {
        Err(HalError::Unsupported)
    }

    fn request_region(&mut self, base: u16, len: u16) -> Result<(), HalError> {
        if len == 0 || base as u32 + len as u32 > 0x1_0000 {
            return Err(HalError::AccessDenied);
        }
        if self.regions.iter().any(|&r| overlaps(r, (base, len))) {
            return Err(HalError::RegionUnavailable);
        }
        self.regions.push((base, len));
        Ok(())
    }

    fn release_region(&mut self, base: u16, len: u16) -> Result<(), HalError> {
        let i = self
            .regions
            .iter()
            .position(|&r| r == (base, len))
            .ok_or(HalError::RegionNotRequested)?;
        self.regions.swap_remove(i);
        Ok(())
    }
}
