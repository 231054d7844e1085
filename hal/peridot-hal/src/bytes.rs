//! Integer decoding from register bytes
//!
//! One function per width and sign; callers say which one they mean.

/// Unsigned big-endian 16-bit value
#[inline]
pub fn read_u16_be(b: [u8; 2]) -> u16 {
    u16::from_be_bytes(b)
}

/// Signed big-endian 16-bit value
#[inline]
pub fn read_i16_be(b: [u8; 2]) -> i16 {
    i16::from_be_bytes(b)
}

/// Unsigned little-endian 16-bit value
#[inline]
pub fn read_u16_le(b: [u8; 2]) -> u16 {
    u16::from_le_bytes(b)
}

/// Signed little-endian 16-bit value
#[inline]
pub fn read_i16_le(b: [u8; 2]) -> i16 {
    i16::from_le_bytes(b)
}
