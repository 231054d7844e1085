//! Wire formats for Peridot drivers
//!
//! Two small protocols live here so drivers and simulators can share them:
//!
//! - [`atecc`]: command and response packets for Microchip ATECC508A/608A
//!   secure elements, protected by a CRC-16 (poly 0x8005, LSB-first).
//! - [`radio`]: LoRa IRQ flags decoded into events and handed from the
//!   interrupt context to the main loop through a lock-free queue.
//!
//! # ATECC command packet
//! ```text
//! ┌──────┬────────┬────────┬────────┬──────────┬───────────┬────────┐
//! │ WORD │ LENGTH │ OPCODE │ PARAM1 │ PARAM2   │ PAYLOAD   │ CRC16  │
//! │ 0x03 │ 1B     │ 1B     │ 1B     │ 2B (LE)  │ 0–64B     │ 2B     │
//! └──────┴────────┴────────┴────────┴──────────┴───────────┴────────┘
//!          └──────────── covered by CRC ──────────────────┘
//! ```
//!
//! LENGTH counts itself, the opcode, both params, the payload and the CRC.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod atecc;
pub mod radio;

pub use atecc::{
    crc16, parse_response, CryptoFrame, FrameError, Opcode, WordAddress, Zone,
    MAX_PAYLOAD_SIZE, STATUS_AFTER_WAKE,
};
pub use radio::{EventReceiver, EventSender, IrqMasks, RadioEvent, RadioEventKind, RadioQueue};
