//! BMA421 / BMA425 accelerometer (I2C)
//!
//! The chip boots without its feature engine. Before the accelerometer
//! reports anything, a vendor config file (about 6 kB) has to be streamed
//! into the `FEATURES_IN` window, 32 bytes at a time, each chunk placed by
//! setting the window address in 16-bit words:
//!
//! ```text
//! for each chunk at byte offset i:
//!   0x5B <- (i / 2) & 0x0F
//!   0x5C <- (i / 2) >> 4
//!   0x5E <- chunk
//! ```
//!
//! The config files are vendor binaries and are not shipped here. The
//! application links them as `static` arrays (typically `include_bytes!`)
//! and hands them over in [`ConfigFiles`]. A variant left as `None` is never
//! referenced, so its file is dropped from the image at link time.

use embedded_hal::delay::DelayNs;
use peridot_hal::bytes::read_i16_le;
use peridot_hal::i2c::MAX_REGISTER_WRITE;
use peridot_hal::{Error, I2cBus};

/// Fixed I2C address (SDO low)
pub const ADDRESS: u8 = 0x18;

/// Register map
pub mod reg {
    pub const CHIP_ID: u8 = 0x00;
    /// ACC_X LSB; six bytes of X/Y/Z follow
    pub const DATA_8: u8 = 0x12;
    pub const STEP_COUNTER_0: u8 = 0x1E;
    pub const TEMPERATURE: u8 = 0x22;
    pub const INTERNAL_STATUS: u8 = 0x2A;
    pub const ACC_CONF: u8 = 0x40;
    pub const INIT_CTRL: u8 = 0x59;
    pub const CONFIG_ADDR_LSB: u8 = 0x5B;
    pub const CONFIG_ADDR_MSB: u8 = 0x5C;
    pub const FEATURES_IN: u8 = 0x5E;
    pub const PWR_CONF: u8 = 0x7C;
    pub const PWR_CTRL: u8 = 0x7D;
    pub const CMD: u8 = 0x7E;
}

const SOFT_RESET: u8 = 0xB6;
const ACC_ENABLE: u8 = 0x04;
/// Power-saving performance mode, no averaging, 50 Hz
const ACC_CONF_50HZ: u8 = 0x07;
/// Advanced power save with FIFO self-wakeup
const PWR_CONF_SAVE: u8 = 0x03;

/// `INTERNAL_STATUS` message field
const STATUS_MESSAGE: u8 = 0x0F;
const STATUS_INIT_OK: u8 = 0x01;

const RESET_DELAY_MS: u32 = 200;
const POWER_UP_DELAY_US: u32 = 450;
/// Polls of `INTERNAL_STATUS`, one per millisecond, before `Timeout`
pub const INIT_POLLS: u32 = 150;

/// Chip family, from `CHIP_ID`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Model {
    Bma421,
    Bma425,
}

impl Model {
    pub fn from_chip_id(id: u8) -> Option<Self> {
        match id {
            0x11 => Some(Self::Bma421),
            0x13 => Some(Self::Bma425),
            _ => None,
        }
    }
}

/// Config files available to [`Bma42x::configure`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigFiles {
    pub bma421: Option<&'static [u8]>,
    pub bma425: Option<&'static [u8]>,
}

impl ConfigFiles {
    fn for_model(&self, model: Model) -> Option<&'static [u8]> {
        match model {
            Model::Bma421 => self.bma421,
            Model::Bma425 => self.bma425,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Bma42xConfig {
    pub files: ConfigFiles,
    /// Read the uploaded file back and compare it byte for byte
    pub verify_upload: bool,
}

impl Bma42xConfig {
    pub const fn new(files: ConfigFiles) -> Self {
        Self {
            files,
            verify_upload: true,
        }
    }
}

pub struct Bma42x<B> {
    bus: B,
    address: u8,
    model: Option<Model>,
}

impl<B: I2cBus> Bma42x<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            address: ADDRESS,
            model: None,
        }
    }

    pub fn free(self) -> B {
        self.bus
    }

    /// Model found by the last successful [`configure`](Self::configure)
    pub fn model(&self) -> Option<Model> {
        self.model
    }

    pub fn chip_id(&mut self) -> Result<u8, Error> {
        self.read_u8(reg::CHIP_ID)
    }

    pub fn connected(&mut self) -> bool {
        matches!(self.chip_id().map(Model::from_chip_id), Ok(Some(_)))
    }

    /// Reset the chip, upload its config file and enable the accelerometer
    ///
    /// Fails with `InvalidId` for an unknown chip and `InvalidParam` when
    /// `config.files` has no file for the chip found. A readback that
    /// differs from the file, or a chip that rejects it, is `ConfigMismatch`.
    pub fn configure<D: DelayNs>(
        &mut self,
        config: &Bma42xConfig,
        delay: &mut D,
    ) -> Result<(), Error> {
        let model = Model::from_chip_id(self.chip_id()?).ok_or(Error::InvalidId)?;
        let file = config.files.for_model(model).ok_or(Error::InvalidParam)?;
        if file.is_empty() || file.len() % 2 != 0 {
            return Err(Error::InvalidParam);
        }

        self.write_u8(reg::CMD, SOFT_RESET)?;
        delay.delay_ms(RESET_DELAY_MS);
        self.write_u8(reg::PWR_CONF, 0x00)?;
        delay.delay_us(POWER_UP_DELAY_US);

        self.write_u8(reg::INIT_CTRL, 0x00)?;
        self.upload(file)?;
        if config.verify_upload {
            self.verify(file)?;
        }
        self.write_u8(reg::INIT_CTRL, 0x01)?;
        self.wait_init(delay)?;

        self.write_u8(reg::PWR_CTRL, ACC_ENABLE)?;
        self.write_u8(reg::ACC_CONF, ACC_CONF_50HZ)?;
        self.write_u8(reg::PWR_CONF, PWR_CONF_SAVE)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("bma42x: {} configured, {} byte file", model, file.len());
        self.model = Some(model);
        Ok(())
    }

    /// Acceleration in micro-g per axis
    pub fn acceleration(&mut self) -> Result<(i32, i32, i32), Error> {
        let mut data = [0u8; 6];
        self.bus.read_register(self.address, reg::DATA_8, &mut data)?;
        // 12-bit left-justified; 512 counts per g at the default 4 g range
        let axis = |lo: u8, hi: u8| (read_i16_le([lo, hi]) >> 4) as i32 * 15_625 / 8;
        Ok((
            axis(data[0], data[1]),
            axis(data[2], data[3]),
            axis(data[4], data[5]),
        ))
    }

    /// Die temperature in millicelsius (1 K resolution)
    pub fn temperature(&mut self) -> Result<i32, Error> {
        let raw = self.read_u8(reg::TEMPERATURE)? as i8;
        Ok((raw as i32 + 23) * 1000)
    }

    /// Steps counted since the feature engine started
    pub fn steps(&mut self) -> Result<u32, Error> {
        let mut data = [0u8; 4];
        self.bus
            .read_register(self.address, reg::STEP_COUNTER_0, &mut data)?;
        Ok(u32::from_le_bytes(data))
    }

    fn set_window(&mut self, offset: usize) -> Result<(), Error> {
        let word = offset / 2;
        self.write_u8(reg::CONFIG_ADDR_LSB, (word & 0x0F) as u8)?;
        self.write_u8(reg::CONFIG_ADDR_MSB, (word >> 4) as u8)
    }

    fn upload(&mut self, file: &[u8]) -> Result<(), Error> {
        for (i, chunk) in file.chunks(MAX_REGISTER_WRITE).enumerate() {
            self.set_window(i * MAX_REGISTER_WRITE)?;
            self.bus
                .write_register(self.address, reg::FEATURES_IN, chunk)?;
        }
        Ok(())
    }

    fn verify(&mut self, file: &[u8]) -> Result<(), Error> {
        let mut readback = [0u8; MAX_REGISTER_WRITE];
        for (i, chunk) in file.chunks(MAX_REGISTER_WRITE).enumerate() {
            self.set_window(i * MAX_REGISTER_WRITE)?;
            let got = &mut readback[..chunk.len()];
            self.bus.read_register(self.address, reg::FEATURES_IN, got)?;
            if got != chunk {
                #[cfg(feature = "defmt")]
                defmt::warn!("bma42x: config readback differs in chunk {}", i);
                return Err(Error::ConfigMismatch);
            }
        }
        Ok(())
    }

    fn wait_init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        for _ in 0..INIT_POLLS {
            match self.read_u8(reg::INTERNAL_STATUS)? & STATUS_MESSAGE {
                0 => delay.delay_ms(1),
                STATUS_INIT_OK => return Ok(()),
                // init_err: the feature engine refused the file
                _ => return Err(Error::ConfigMismatch),
            }
        }
        Err(Error::Timeout)
    }

    fn read_u8(&mut self, register: u8) -> Result<u8, Error> {
        let mut buf = [0u8];
        self.bus.read_register(self.address, register, &mut buf)?;
        Ok(buf[0])
    }

    fn write_u8(&mut self, register: u8, value: u8) -> Result<(), Error> {
        self.bus.write_register(self.address, register, &[value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    const FILE_LEN: usize = 70;

    const fn pattern() -> [u8; FILE_LEN] {
        let mut out = [0u8; FILE_LEN];
        let mut i = 0;
        while i < FILE_LEN {
            out[i] = (i as u8).wrapping_mul(37) ^ 0xA5;
            i += 1;
        }
        out
    }

    static FILE: [u8; FILE_LEN] = pattern();

    /// Register file plus the feature-engine config RAM
    struct Chip {
        regs: [u8; 0x80],
        ram: Vec<u8>,
        window: [u8; 2],
        /// Status reported once INIT_CTRL is set
        init_status: u8,
        /// RAM offset that stores the wrong byte
        corrupt_at: Option<usize>,
        writes: Vec<(u8, u8)>,
        chunks: Vec<(usize, usize)>,
    }

    impl Chip {
        fn new(chip_id: u8) -> Self {
            let mut regs = [0u8; 0x80];
            regs[reg::CHIP_ID as usize] = chip_id;
            Self {
                regs,
                ram: vec![0; 256],
                window: [0; 2],
                init_status: STATUS_INIT_OK,
                corrupt_at: None,
                writes: Vec::new(),
                chunks: Vec::new(),
            }
        }

        fn offset(&self) -> usize {
            ((self.window[1] as usize) << 4 | self.window[0] as usize) * 2
        }
    }

    impl I2cBus for Chip {
        fn transact(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Error> {
            if address != ADDRESS {
                return Err(Error::NoAck);
            }
            let register = write[0];
            if read.is_empty() {
                let data = &write[1..];
                match register {
                    reg::CONFIG_ADDR_LSB => self.window[0] = data[0],
                    reg::CONFIG_ADDR_MSB => self.window[1] = data[0],
                    reg::FEATURES_IN => {
                        let at = self.offset();
                        self.chunks.push((at, data.len()));
                        self.ram[at..at + data.len()].copy_from_slice(data);
                        if let Some(bad) = self.corrupt_at {
                            if (at..at + data.len()).contains(&bad) {
                                self.ram[bad] ^= 0xFF;
                            }
                        }
                    }
                    _ => {
                        self.writes.push((register, data[0]));
                        self.regs[register as usize] = data[0];
                        if register == reg::INIT_CTRL && data[0] == 0x01 {
                            self.regs[reg::INTERNAL_STATUS as usize] = self.init_status;
                        }
                    }
                }
                return Ok(());
            }
            if register == reg::FEATURES_IN {
                let at = self.offset();
                read.copy_from_slice(&self.ram[at..at + read.len()]);
            } else {
                let at = register as usize;
                read.copy_from_slice(&self.regs[at..at + read.len()]);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Clock {
        us: u64,
    }

    impl DelayNs for Clock {
        fn delay_ns(&mut self, ns: u32) {
            self.us += ns as u64 / 1000;
        }
        fn delay_us(&mut self, us: u32) {
            self.us += us as u64;
        }
        fn delay_ms(&mut self, ms: u32) {
            self.us += ms as u64 * 1000;
        }
    }

    fn files() -> ConfigFiles {
        ConfigFiles {
            bma421: Some(&FILE),
            bma425: None,
        }
    }

    #[test]
    fn test_configure_uploads_and_enables() {
        let mut dev = Bma42x::new(Chip::new(0x11));
        let mut clock = Clock::default();
        dev.configure(&Bma42xConfig::new(files()), &mut clock).unwrap();
        assert_eq!(dev.model(), Some(Model::Bma421));

        let chip = dev.free();
        assert_eq!(&chip.ram[..FILE_LEN], &FILE[..]);
        assert_eq!(chip.chunks, [(0, 32), (32, 32), (64, 6)]);
        assert_eq!(
            chip.writes,
            [
                (reg::CMD, SOFT_RESET),
                (reg::PWR_CONF, 0x00),
                (reg::INIT_CTRL, 0x00),
                (reg::INIT_CTRL, 0x01),
                (reg::PWR_CTRL, ACC_ENABLE),
                (reg::ACC_CONF, ACC_CONF_50HZ),
                (reg::PWR_CONF, PWR_CONF_SAVE),
            ]
        );
        assert_eq!(clock.us, 200_000 + 450);
    }

    #[test]
    fn test_readback_mismatch() {
        let mut chip = Chip::new(0x11);
        chip.corrupt_at = Some(40);
        let mut dev = Bma42x::new(chip);
        assert_eq!(
            dev.configure(&Bma42xConfig::new(files()), &mut Clock::default()),
            Err(Error::ConfigMismatch)
        );
        assert_eq!(dev.model(), None);
        let chip = dev.free();
        assert!(!chip.writes.contains(&(reg::INIT_CTRL, 0x01)));
    }

    #[test]
    fn test_unverified_upload_skips_readback() {
        let mut chip = Chip::new(0x11);
        chip.corrupt_at = Some(40);
        let mut dev = Bma42x::new(chip);
        let config = Bma42xConfig {
            verify_upload: false,
            ..Bma42xConfig::new(files())
        };
        assert_eq!(dev.configure(&config, &mut Clock::default()), Ok(()));
    }

    #[test]
    fn test_rejected_file() {
        let mut chip = Chip::new(0x11);
        chip.init_status = 0x02;
        let mut dev = Bma42x::new(chip);
        assert_eq!(
            dev.configure(&Bma42xConfig::new(files()), &mut Clock::default()),
            Err(Error::ConfigMismatch)
        );
    }

    #[test]
    fn test_init_timeout() {
        let mut chip = Chip::new(0x11);
        chip.init_status = 0x00;
        let mut dev = Bma42x::new(chip);
        let mut clock = Clock::default();
        assert_eq!(
            dev.configure(&Bma42xConfig::new(files()), &mut clock),
            Err(Error::Timeout)
        );
        assert_eq!(clock.us, 200_000 + 450 + INIT_POLLS as u64 * 1000);
    }

    #[test]
    fn test_unknown_chip_and_missing_file() {
        let mut dev = Bma42x::new(Chip::new(0x42));
        assert!(!dev.connected());
        assert_eq!(
            dev.configure(&Bma42xConfig::new(files()), &mut Clock::default()),
            Err(Error::InvalidId)
        );

        let mut dev = Bma42x::new(Chip::new(0x13));
        assert!(dev.connected());
        assert_eq!(
            dev.configure(&Bma42xConfig::new(files()), &mut Clock::default()),
            Err(Error::InvalidParam)
        );
        assert!(dev.free().writes.is_empty());
    }

    #[test]
    fn test_odd_length_file_rejected() {
        static ODD: [u8; 3] = [1, 2, 3];
        let config = Bma42xConfig::new(ConfigFiles {
            bma421: Some(&ODD),
            bma425: None,
        });
        let mut dev = Bma42x::new(Chip::new(0x11));
        assert_eq!(
            dev.configure(&config, &mut Clock::default()),
            Err(Error::InvalidParam)
        );
    }

    #[test]
    fn test_readings() {
        let mut chip = Chip::new(0x13);
        // X = +512 counts (1 g), Y = -512, Z = 0
        chip.regs[0x12..0x18].copy_from_slice(&[0x00, 0x20, 0x00, 0xE0, 0x00, 0x00]);
        chip.regs[0x1E..0x22].copy_from_slice(&[0x39, 0x30, 0x00, 0x00]);
        chip.regs[0x22] = 0xFE;
        let mut dev = Bma42x::new(chip);

        assert_eq!(dev.acceleration(), Ok((1_000_000, -1_000_000, 0)));
        assert_eq!(dev.steps(), Ok(12_345));
        assert_eq!(dev.temperature(), Ok(21_000));
    }
}
