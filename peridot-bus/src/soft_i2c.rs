//! Bit-banged I2C master
//!
//! Provides an [`I2cBus`] over two open-drain lines when the platform has no
//! hardware I2C on the needed pins, or needs another bus.
//!
//! # Signalling
//!
//! ```text
//!         START        bit         bit    ACK        STOP
//!  SDA  ──┐      ╳═════════╳═══════╳─────┐     ┌─────────
//!         └──────╳═════════╳═══════╳     └─────┘
//!  SCL  ────┐      ┌───┐     ┌───┐    ┌───┐     ┌──────
//!           └──────┘   └─────┘   └────┘   └─────┘
//! ```
//!
//! - Idle: both lines released (pulled high).
//! - START: SDA falls while SCL is high. Repeated START releases SDA and
//!   SCL first, then issues START.
//! - STOP: SDA rises while SCL is high.
//! - Data changes only while SCL is low; the receiver samples near the end
//!   of the high phase.
//! - ACK is the ninth clock; the receiver holds SDA low to acknowledge.
//!
//! Slaves may stretch the clock by holding SCL low. Every SCL release waits
//! for the line to actually rise, bounded by [`STRETCH_POLLS`] half-cycles.
//!
//! Any failure issues STOP and releases both lines before returning.

use embedded_hal::i2c::{Operation, SevenBitAddress};
use peridot_hal::delay::{Cpu, SpinDelay};
use peridot_hal::{Error, I2cBus, I2cConfig, OpenDrainPin};

/// Half-cycles to wait for a stretched clock before giving up
pub const STRETCH_POLLS: u32 = 1_000;

/// Software I2C master over two open-drain lines
pub struct SoftI2c<SDA, SCL> {
    sda: SDA,
    scl: SCL,
    delay: SpinDelay,
}

impl<SDA: OpenDrainPin, SCL: OpenDrainPin> SoftI2c<SDA, SCL> {
    /// Create a bus clocked at `config.frequency` on the given core
    ///
    /// Returns `InvalidParam` when the calibration table has no entry for
    /// the core and frequency.
    pub fn new(sda: SDA, scl: SCL, cpu: Cpu, config: I2cConfig) -> Result<Self, Error> {
        let delay = SpinDelay::for_bus(cpu, config.frequency)?;
        Ok(Self::with_delay(sda, scl, delay))
    }

    /// Create a bus with an explicit half-cycle delay
    pub fn with_delay(mut sda: SDA, mut scl: SCL, delay: SpinDelay) -> Self {
        sda.release();
        scl.release();
        Self { sda, scl, delay }
    }

    /// Release the pins
    pub fn free(mut self) -> (SDA, SCL) {
        self.idle();
        (self.sda, self.scl)
    }

    /// Address-only write; `Ok` if a device acknowledges
    pub fn probe(&mut self, address: u8) -> Result<(), Error> {
        self.check_address(address)?;
        let result = self.start().and_then(|_| self.send_address(address, false));
        self.finish(result)
    }

    /// Clock SCL until a slave stuck mid-byte lets go of SDA
    ///
    /// Issues up to nine clocks followed by STOP. Returns `BusError` if SDA
    /// is still held low.
    pub fn recover(&mut self) -> Result<(), Error> {
        self.sda.release();
        for _ in 0..9 {
            if self.sda.is_high() {
                break;
            }
            self.scl.drive_low();
            self.delay.half_cycle();
            self.scl_high()?;
            self.delay.half_cycle();
        }
        self.stop();
        self.idle();
        if self.sda.is_high() {
            Ok(())
        } else {
            Err(Error::BusError)
        }
    }

    #[inline(always)]
    fn idle(&mut self) {
        self.sda.release();
        self.scl.release();
    }

    /// Release SCL and wait for it to rise
    #[inline]
    fn scl_high(&mut self) -> Result<(), Error> {
        self.scl.release();
        let mut polls = 0;
        while self.scl.is_low() {
            polls += 1;
            if polls > STRETCH_POLLS {
                return Err(Error::BusError);
            }
            self.delay.half_cycle();
        }
        Ok(())
    }

    /// START, or repeated START when SCL is currently low
    fn start(&mut self) -> Result<(), Error> {
        self.sda.release();
        self.delay.half_cycle();
        self.scl_high()?;
        self.delay.half_cycle();
        if self.sda.is_low() {
            #[cfg(feature = "defmt")]
            defmt::debug!("i2c: SDA held low before START");
            return Err(Error::BusError);
        }
        self.sda.drive_low();
        self.delay.half_cycle();
        self.scl.drive_low();
        self.delay.half_cycle();
        Ok(())
    }

    fn stop(&mut self) {
        self.sda.drive_low();
        self.delay.half_cycle();
        // A stuck clock is already reported by whatever step failed
        let _ = self.scl_high();
        self.delay.half_cycle();
        self.sda.release();
        self.delay.half_cycle();
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), Error> {
        if bit {
            self.sda.release();
        } else {
            self.sda.drive_low();
        }
        self.delay.half_cycle();
        self.scl_high()?;
        self.delay.half_cycle();
        self.scl.drive_low();
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, Error> {
        self.sda.release();
        self.delay.half_cycle();
        self.scl_high()?;
        self.delay.half_cycle();
        let bit = self.sda.is_high();
        self.scl.drive_low();
        Ok(bit)
    }

    /// Shift a byte out MSB first; `NoAck` if the receiver did not ACK
    fn send(&mut self, byte: u8) -> Result<(), Error> {
        for i in (0..8).rev() {
            self.write_bit((byte >> i) & 1 != 0)?;
        }
        if self.read_bit()? {
            return Err(Error::NoAck);
        }
        Ok(())
    }

    /// Shift a byte in MSB first, then ACK (or NACK the last byte)
    fn receive(&mut self, ack: bool) -> Result<u8, Error> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | self.read_bit()? as u8;
        }
        self.write_bit(!ack)?;
        Ok(byte)
    }

    #[inline]
    fn send_address(&mut self, address: u8, read: bool) -> Result<(), Error> {
        self.send((address << 1) | read as u8)
    }

    fn check_address(&self, address: u8) -> Result<(), Error> {
        if address > 0x7F {
            return Err(Error::InvalidParam);
        }
        Ok(())
    }

    /// STOP, force idle, pass the result through
    fn finish<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        self.stop();
        self.idle();
        result
    }

    fn run_transact(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Error> {
        if !write.is_empty() {
            self.start()?;
            self.send_address(address, false)?;
            for &b in write {
                self.send(b)?;
            }
        }

        if !read.is_empty() {
            self.start()?;
            self.send_address(address, true)?;
            let last = read.len() - 1;
            for (i, b) in read.iter_mut().enumerate() {
                *b = self.receive(i < last)?;
            }
        }

        Ok(())
    }

    fn run_operations(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        let mut previous: Option<bool> = None;
        for i in 0..operations.len() {
            let is_read = matches!(operations[i], Operation::Read(_));
            let next_same = operations
                .get(i + 1)
                .map(|op| matches!(op, Operation::Read(_)) == is_read)
                .unwrap_or(false);

            if previous != Some(is_read) {
                self.start()?;
                self.send_address(address, is_read)?;
            }

            match &mut operations[i] {
                Operation::Write(bytes) => {
                    for &b in bytes.iter() {
                        self.send(b)?;
                    }
                }
                Operation::Read(buf) => {
                    let len = buf.len();
                    for (j, b) in buf.iter_mut().enumerate() {
                        let last = j + 1 == len && !next_same;
                        *b = self.receive(!last)?;
                    }
                }
            }
            previous = Some(is_read);
        }
        Ok(())
    }
}

impl<SDA: OpenDrainPin, SCL: OpenDrainPin> I2cBus for SoftI2c<SDA, SCL> {
    fn transact(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Error> {
        if write.is_empty() && read.is_empty() {
            return self.probe(address);
        }
        self.check_address(address)?;
        let result = self.run_transact(address, write, read);
        self.finish(result)
    }
}

impl<SDA: OpenDrainPin, SCL: OpenDrainPin> embedded_hal::i2c::ErrorType for SoftI2c<SDA, SCL> {
    type Error = Error;
}

impl<SDA: OpenDrainPin, SCL: OpenDrainPin> embedded_hal::i2c::I2c<SevenBitAddress>
    for SoftI2c<SDA, SCL>
{
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if operations.is_empty() {
            return self.probe(address);
        }
        self.check_address(address)?;
        let result = self.run_operations(address, operations);
        self.finish(result)
    }
}

#[cfg(test)]
pub(crate) mod sim {
    //! Edge-driven I2C slave simulator
    //!
    //! Both lines are wired-AND of master and slave. The slave reacts to
    //! every level change the master makes and records what it decoded.

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    use peridot_hal::OpenDrainPin;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Event {
        Start,
        Stop,
        /// Byte on the wire and whether its ninth clock was an ACK
        Byte(u8, bool),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum State {
        Idle,
        Address,
        Writing,
        Reading,
        Ignore,
    }

    pub struct Wire {
        pub master_sda_low: bool,
        pub master_scl_low: bool,
        slave_sda_low: bool,
        /// Slave holds SDA low regardless of protocol state
        pub stuck_sda: bool,
        /// SCL polls that still read low after a release
        pub stretch: u32,
        /// Data bytes accepted before NACKing the next one
        pub nack_after: Option<usize>,
        pub address: u8,
        pub mem: [u8; 256],
        pointer: u8,
        pointer_set: bool,
        written: usize,
        pub events: Vec<Event>,
        state: State,
        bits: u8,
        byte: u8,
        ack: bool,
        tx: u8,
        prev_sda: bool,
        prev_scl: bool,
    }

    impl Wire {
        pub fn new(address: u8) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                master_sda_low: false,
                master_scl_low: false,
                slave_sda_low: false,
                stuck_sda: false,
                stretch: 0,
                nack_after: None,
                address,
                mem: [0; 256],
                pointer: 0,
                pointer_set: false,
                written: 0,
                events: Vec::new(),
                state: State::Idle,
                bits: 0,
                byte: 0,
                ack: false,
                tx: 0,
                prev_sda: true,
                prev_scl: true,
            }))
        }

        fn sda(&self) -> bool {
            !(self.master_sda_low || self.slave_sda_low || self.stuck_sda)
        }

        fn scl(&self) -> bool {
            !self.master_scl_low
        }

        fn next_tx(&mut self) {
            self.tx = self.mem[self.pointer as usize];
            self.pointer = self.pointer.wrapping_add(1);
        }

        fn update(&mut self) {
            let (sda, scl) = (self.sda(), self.scl());
            let (psda, pscl) = (self.prev_sda, self.prev_scl);
            self.prev_sda = sda;
            self.prev_scl = scl;

            if scl && pscl && sda != psda {
                if !sda {
                    self.events.push(Event::Start);
                    self.state = State::Address;
                    self.pointer_set = false;
                    self.written = 0;
                } else {
                    self.events.push(Event::Stop);
                    self.state = State::Idle;
                }
                self.bits = 0;
                self.byte = 0;
                self.slave_sda_low = false;
                return;
            }

            if scl && !pscl {
                self.rising(sda);
            } else if !scl && pscl {
                self.falling();
            }
            // Slave output may have changed the wired level
            self.prev_sda = self.sda();
        }

        fn rising(&mut self, sda: bool) {
            match self.state {
                State::Address | State::Writing => {
                    if self.bits < 8 {
                        self.byte = (self.byte << 1) | sda as u8;
                        self.bits += 1;
                    } else if self.bits == 8 {
                        self.bits = 9;
                    }
                }
                State::Reading => {
                    if self.bits < 8 {
                        self.bits += 1;
                    } else if self.bits == 8 {
                        self.ack = !sda;
                        self.bits = 9;
                    }
                }
                State::Idle | State::Ignore => {}
            }
        }

        fn falling(&mut self) {
            match self.state {
                State::Address | State::Writing => {
                    if self.bits == 8 {
                        self.ack = if self.state == State::Address {
                            self.byte >> 1 == self.address
                        } else {
                            self.nack_after.map_or(true, |n| self.written < n)
                        };
                        self.slave_sda_low = self.ack;
                    } else if self.bits == 9 {
                        self.slave_sda_low = false;
                        self.events.push(Event::Byte(self.byte, self.ack));
                        self.accept();
                        self.bits = 0;
                        self.byte = 0;
                    }
                }
                State::Reading => {
                    if self.bits < 8 {
                        self.slave_sda_low = (self.tx >> (7 - self.bits)) & 1 == 0;
                    } else if self.bits == 8 {
                        self.slave_sda_low = false;
                    } else {
                        self.events.push(Event::Byte(self.tx, self.ack));
                        self.bits = 0;
                        if self.ack {
                            self.next_tx();
                            self.slave_sda_low = self.tx & 0x80 == 0;
                        } else {
                            self.state = State::Ignore;
                        }
                    }
                }
                State::Idle | State::Ignore => {}
            }
        }

        fn accept(&mut self) {
            if !self.ack {
                self.state = State::Ignore;
                return;
            }
            match self.state {
                State::Address if self.byte & 1 == 1 => {
                    self.state = State::Reading;
                    self.next_tx();
                    self.slave_sda_low = self.tx & 0x80 == 0;
                }
                State::Address => self.state = State::Writing,
                State::Writing => {
                    if !self.pointer_set {
                        self.pointer = self.byte;
                        self.pointer_set = true;
                    } else {
                        self.mem[self.pointer as usize] = self.byte;
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                    self.written += 1;
                }
                _ => {}
            }
        }
    }

    #[derive(Clone, Copy)]
    pub enum Line {
        Sda,
        Scl,
    }

    pub struct SimPin {
        pub wire: Rc<RefCell<Wire>>,
        pub line: Line,
    }

    impl SimPin {
        pub fn pair(wire: &Rc<RefCell<Wire>>) -> (SimPin, SimPin) {
            (
                SimPin {
                    wire: wire.clone(),
                    line: Line::Sda,
                },
                SimPin {
                    wire: wire.clone(),
                    line: Line::Scl,
                },
            )
        }

        fn set(&mut self, low: bool) {
            let mut w = self.wire.borrow_mut();
            match self.line {
                Line::Sda => w.master_sda_low = low,
                Line::Scl => w.master_scl_low = low,
            }
            w.update();
        }
    }

    impl OpenDrainPin for SimPin {
        fn drive_low(&mut self) {
            self.set(true);
        }

        fn release(&mut self) {
            self.set(false);
        }

        fn is_high(&self) -> bool {
            let mut w = self.wire.borrow_mut();
            match self.line {
                Line::Sda => w.sda(),
                Line::Scl => {
                    if !w.master_scl_low && w.stretch > 0 {
                        w.stretch -= 1;
                        return false;
                    }
                    w.scl()
                }
            }
        }
    }
}
