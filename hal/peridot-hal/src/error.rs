//! Error taxonomy shared by every bus and driver
//!
//! Errors are kinds, not types: a bus transaction, a checksum check and a
//! graphics bounds check all report through the same enum so drivers can
//! propagate with `?` across layers.
//!
//! After a driver returns any of these, the device is in an unknown state.
//! Recovery is `reset`/`configure` on that driver.

use core::fmt;

/// Driver and bus errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// I2C device did not acknowledge its address or a data byte
    NoAck,
    /// SDA/SCL stuck or framing corrupted on a bus
    BusError,
    /// 1-Wire reset saw no presence pulse
    NoPresence,
    /// 1-Wire ROM/scratchpad CRC-8 or ATECC CRC-16 mismatch
    CrcMismatch,
    /// Chip did not signal ready within its documented window
    Timeout,
    /// ATECC wake token mismatch
    WakeFailed,
    /// Zone-lock command returned a non-zero status
    LockFailed,
    /// Graphics coordinate outside the current rotated surface
    OutOfBounds,
    /// Caller-supplied configuration out of documented range
    InvalidParam,
    /// Chip ID / WHO_AM_I byte did not match
    InvalidId,
    /// Uploaded configuration readback differs from what was written
    ConfigMismatch,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::NoAck => "device did not acknowledge",
            Error::BusError => "bus error",
            Error::NoPresence => "no device present on 1-wire bus",
            Error::CrcMismatch => "CRC mismatch",
            Error::Timeout => "timed out waiting for device",
            Error::WakeFailed => "wake token mismatch",
            Error::LockFailed => "zone lock failed",
            Error::OutOfBounds => "coordinates outside surface",
            Error::InvalidParam => "invalid parameter",
            Error::InvalidId => "unexpected chip id",
            Error::ConfigMismatch => "configuration readback mismatch",
        };
        f.write_str(msg)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            Error::NoAck => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Error::BusError => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

impl embedded_hal::spi::Error for Error {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::Timeout => embedded_io::ErrorKind::TimedOut,
            Error::InvalidParam => embedded_io::ErrorKind::InvalidInput,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

/// Map an `embedded-hal` I2C error onto the taxonomy
pub fn from_i2c_kind(kind: embedded_hal::i2c::ErrorKind) -> Error {
    match kind {
        embedded_hal::i2c::ErrorKind::NoAcknowledge(_) => Error::NoAck,
        _ => Error::BusError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{Error as _, ErrorKind, NoAcknowledgeSource};

    #[test]
    fn test_i2c_kind_roundtrip() {
        assert_eq!(from_i2c_kind(Error::NoAck.kind()), Error::NoAck);
        assert_eq!(from_i2c_kind(Error::BusError.kind()), Error::BusError);
        assert_eq!(
            from_i2c_kind(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
            Error::NoAck
        );
        assert_eq!(from_i2c_kind(ErrorKind::ArbitrationLoss), Error::BusError);
    }

    #[test]
    fn test_display_messages() {
        use std::string::ToString;
        assert_eq!(Error::CrcMismatch.to_string(), "CRC mismatch");
        assert_eq!(Error::OutOfBounds.to_string(), "coordinates outside surface");
    }
}
