//! ATECCx08 command and response framing
//!
//! Command (master to device), little-endian:
//! ```text
//! ┌──────┬────────┬────────┬────┬───────┬───────┬─────────┬────────┬────────┐
//! │ 0x03 │ LENGTH │ OPCODE │ P1 │ P2_LO │ P2_HI │ PAYLOAD │ CRC_LO │ CRC_HI │
//! └──────┴────────┴────────┴────┴───────┴───────┴─────────┴────────┴────────┘
//!          LENGTH = 7 + payload, counts itself through CRC
//!          CRC-16 covers LENGTH .. last payload byte
//! ```
//!
//! Response (device to master):
//! ```text
//! ┌────────┬─────────┬────────┬────────┐
//! │ LENGTH │ DATA    │ CRC_LO │ CRC_HI │
//! └────────┴─────────┴────────┴────────┘
//!   CRC-16 covers LENGTH .. last data byte
//! ```
//!
//! The leading 0x03 of a command is the I2C word address, not part of the
//! CRC.

use heapless::Vec;

/// Largest command payload carried in one frame
pub const MAX_PAYLOAD_SIZE: usize = 64;

/// Largest complete command frame
pub const MAX_FRAME_SIZE: usize = 1 + 7 + MAX_PAYLOAD_SIZE;

/// Largest response (`Random` returns 32 bytes plus length and CRC)
pub const MAX_RESPONSE_SIZE: usize = 35;

/// Status byte returned in a 4-byte response right after wake
pub const STATUS_AFTER_WAKE: u8 = 0x11;

/// First byte of an I2C write, selecting what the write means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WordAddress {
    /// Reset the I/O buffer pointer
    Command = 0x00,
    /// Enter sleep, losing volatile state
    Sleep = 0x01,
    /// Enter idle, keeping volatile state
    Idle = 0x02,
    /// Command follows / read back the response buffer
    Response = 0x03,
}

/// Command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    Read = 0x02,
    Lock = 0x17,
    Random = 0x1B,
    Info = 0x30,
}

impl Opcode {
    /// Longest time the device may take to execute the command
    pub fn max_execution_ms(&self) -> u32 {
        match self {
            Opcode::Random => 23,
            Opcode::Lock => 32,
            Opcode::Read => 5,
            Opcode::Info => 250,
        }
    }
}

/// Memory zone, as used by `Read` and `Lock`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Zone {
    Config,
    Data,
    /// One data slot (0..=15)
    Slot(u8),
}

impl Zone {
    /// Zone selector byte for `Read` (param1)
    pub fn read_code(&self) -> u8 {
        match self {
            Zone::Config => 0x00,
            Zone::Data | Zone::Slot(_) => 0x02,
        }
    }

    /// Lock mode byte (before the skip-CRC flag)
    pub fn lock_code(&self) -> u8 {
        match self {
            Zone::Config => 0x00,
            Zone::Data => 0x01,
            Zone::Slot(n) => 0x02 | ((n & 0x0F) << 2),
        }
    }

    /// `Lock` param1: zone code with the "ignore summary CRC" bit
    pub fn lock_param(&self) -> u8 {
        self.lock_code() | 0x80
    }
}

/// Framing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// CRC-16 mismatch
    InvalidChecksum,
    /// Fewer bytes than the length byte announced
    Incomplete,
    /// Length byte out of range
    InvalidFrame,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// ATECC CRC-16: polynomial 0x8005, init 0, data bits fed LSB first
///
/// Returns the little-endian trailer `[lo, hi]`.
pub fn crc16(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0;
    for &byte in data {
        for bit in 0..8 {
            let data_bit = (byte >> bit) & 1;
            let crc_bit = (crc >> 15) as u8;
            crc <<= 1;
            if data_bit != crc_bit {
                crc ^= 0x8005;
            }
        }
    }
    crc.to_le_bytes()
}

/// One command to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoFrame {
    pub opcode: Opcode,
    pub param1: u8,
    pub param2: u16,
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl CryptoFrame {
    /// Create a command with a payload
    pub fn new(opcode: Opcode, param1: u8, param2: u16, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self {
            opcode,
            param1,
            param2,
            payload: payload_vec,
        })
    }

    /// Create a command with no payload
    pub fn command(opcode: Opcode, param1: u8, param2: u16) -> Self {
        Self {
            opcode,
            param1,
            param2,
            payload: Vec::new(),
        }
    }

    /// Value of the LENGTH byte
    pub fn length(&self) -> u8 {
        (7 + self.payload.len()) as u8
    }

    /// Encode into `buffer`, word address first
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let body = 5 + self.payload.len();
        let frame_len = 1 + body + 2;
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let [p2_lo, p2_hi] = self.param2.to_le_bytes();
        buffer[0] = WordAddress::Response as u8;
        buffer[1] = self.length();
        buffer[2] = self.opcode as u8;
        buffer[3] = self.param1;
        buffer[4] = p2_lo;
        buffer[5] = p2_hi;
        buffer[6..6 + self.payload.len()].copy_from_slice(&self.payload);

        let crc = crc16(&buffer[1..1 + body]);
        buffer[1 + body..frame_len].copy_from_slice(&crc);
        Ok(frame_len)
    }

    /// Encode into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Decode an encoded command (as a device would)
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < 2 {
            return Err(FrameError::Incomplete);
        }
        if bytes[0] != WordAddress::Response as u8 {
            return Err(FrameError::InvalidFrame);
        }
        let length = bytes[1] as usize;
        if !(7..=7 + MAX_PAYLOAD_SIZE).contains(&length) {
            return Err(FrameError::InvalidFrame);
        }
        if bytes.len() < 1 + length {
            return Err(FrameError::Incomplete);
        }

        let frame = &bytes[1..1 + length];
        let (body, crc) = frame.split_at(length - 2);
        if crc16(body) != [crc[0], crc[1]] {
            return Err(FrameError::InvalidChecksum);
        }

        let opcode = match body[1] {
            0x02 => Opcode::Read,
            0x17 => Opcode::Lock,
            0x1B => Opcode::Random,
            0x30 => Opcode::Info,
            _ => return Err(FrameError::InvalidFrame),
        };
        Self::new(
            opcode,
            body[2],
            u16::from_le_bytes([body[3], body[4]]),
            &body[5..],
        )
    }
}

/// Validate a complete response and return its data bytes
///
/// `raw` starts with the length byte; bytes past the announced length are
/// ignored.
pub fn parse_response(raw: &[u8]) -> Result<&[u8], FrameError> {
    let length = *raw.first().ok_or(FrameError::Incomplete)? as usize;
    if !(3..=MAX_RESPONSE_SIZE).contains(&length) {
        return Err(FrameError::InvalidFrame);
    }
    if raw.len() < length {
        return Err(FrameError::Incomplete);
    }

    let (body, crc) = raw[..length].split_at(length - 2);
    if crc16(body) != [crc[0], crc[1]] {
        return Err(FrameError::InvalidChecksum);
    }
    Ok(&body[1..])
}

/// Build a response frame around `data` (for device simulators)
pub fn encode_response(data: &[u8]) -> Result<Vec<u8, MAX_RESPONSE_SIZE>, FrameError> {
    let length = data.len() + 3;
    if length > MAX_RESPONSE_SIZE {
        return Err(FrameError::PayloadTooLarge);
    }
    let mut out: Vec<u8, MAX_RESPONSE_SIZE> = Vec::new();
    out.push(length as u8)
        .map_err(|_| FrameError::BufferTooSmall)?;
    out.extend_from_slice(data)
        .map_err(|_| FrameError::BufferTooSmall)?;
    let crc = crc16(&out);
    out.extend_from_slice(&crc)
        .map_err(|_| FrameError::BufferTooSmall)?;
    Ok(out)
}
