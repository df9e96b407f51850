//! I/O port abstractions
//!
//! The Am9513 sits behind two consecutive I/O ports: a data port and a
//! command port. Backends provide byte and word access to arbitrary port
//! numbers plus a request/release pair that asserts exclusive use of a
//! port range.

/// Errors reported by a transport backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// The requested port range is already claimed
    RegionUnavailable,
    /// The port range was never requested
    RegionNotRequested,
    /// The process lacks permission to touch the ports
    AccessDenied,
    /// The backend cannot perform this access width
    Unsupported,
    /// Low-level read or write failed
    Io,
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::RegionUnavailable => f.write_str("port region is already in use"),
            HalError::RegionNotRequested => f.write_str("port region was not requested"),
            HalError::AccessDenied => f.write_str("permission denied for port access"),
            HalError::Unsupported => f.write_str("access width not supported by backend"),
            HalError::Io => f.write_str("port I/O failed"),
        }
    }
}

/// 8/16-bit I/O port access
///
/// Port numbers are absolute. Callers address a device as a base port plus
/// a small fixed offset.
pub trait PortIo {
    /// Read one byte from `port`
    fn inp8(&mut self, port: u16) -> Result<u8, HalError>;

    /// Read one 16-bit word from `port`
    fn inp16(&mut self, port: u16) -> Result<u16, HalError>;

    /// Write one byte to `port`
    fn outp8(&mut self, port: u16, value: u8) -> Result<(), HalError>;

    /// Write one 16-bit word to `port`
    fn outp16(&mut self, port: u16, value: u16) -> Result<(), HalError>;

    /// Claim exclusive use of `len` ports starting at `base`
    fn request_region(&mut self, base: u16, len: u16) -> Result<(), HalError>;

    /// Give back a range previously claimed with [`PortIo::request_region`]
    fn release_region(&mut self, base: u16, len: u16) -> Result<(), HalError>;
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
    fn inp8(&mut self, port: u16) -> Result<u8, HalError> {
        (**self).inp8(port)
    }

    fn inp16(&mut self, port: u16) -> Result<u16, HalError> {
        (**self).inp16(port)
    }

    fn outp8(&mut self, port: u16, value: u8) -> Result<(), HalError> {
        (**self).outp8(port, value)
    }

    fn outp16(&mut self, port: u16, value: u16) -> Result<(), HalError> {
        (**self).outp16(port, value)
    }

    fn request_region(&mut self, base: u16, len: u16) -> Result<(), HalError> {
        (**self).request_region(base, len)
    }

    fn release_region(&mut self, base: u16, len: u16) -> Result<(), HalError> {
        (**self).release_region(base, len)
    }
}
