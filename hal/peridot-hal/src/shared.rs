//! Shared buses
//!
//! A bus is a shared resource; a driver borrows it for one operation. When
//! several drivers (or an interrupt handler and the main loop) use the same
//! bus, wrap it in a [`BusMutex`] and hand each driver a [`SharedI2c`] or
//! [`SharedSpi`]. Every transaction then runs under the lock, so two
//! drivers can never interleave halves of their transfers.
//!
//! | Mutex                                           | When                  |
//! |-------------------------------------------------|-----------------------|
//! | `core::cell::RefCell<T>`                        | single context        |
//! | `std::sync::Mutex<T>`                           | `std` feature, host   |
//! | `cortex_m::interrupt::Mutex<RefCell<T>>`        | `cortex-m` feature    |

use core::cell::RefCell;
use core::marker::PhantomData;

use crate::error::Error;
use crate::i2c::I2cBus;
use crate::spi::SpiBus;

/// A lock that owns a bus and runs closures against it exclusively
pub trait BusMutex<T> {
    /// Construct the mutex around `v`
    fn new(v: T) -> Self;

    /// Lock, run `f` on the guarded value, unlock. Returns what `f` returns.
    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R;
}

impl<T> BusMutex<T> for RefCell<T> {
    fn new(v: T) -> Self {
        RefCell::new(v)
    }

    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        f(&mut self.borrow_mut())
    }
}

#[cfg(any(test, feature = "std"))]
impl<T> BusMutex<T> for std::sync::Mutex<T> {
    fn new(v: T) -> Self {
        std::sync::Mutex::new(v)
    }

    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        // A panic in another holder does not leave the bus itself invalid
        let mut guard = match std::sync::Mutex::lock(self) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[cfg(feature = "cortex-m")]
impl<T> BusMutex<T> for cortex_m::interrupt::Mutex<RefCell<T>> {
    fn new(v: T) -> Self {
        cortex_m::interrupt::Mutex::new(RefCell::new(v))
    }

    fn lock<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        cortex_m::interrupt::free(|cs| f(&mut self.borrow(cs).borrow_mut()))
    }
}

/// Per-driver handle onto an I2C bus behind a mutex
pub struct SharedI2c<'a, M, B> {
    mutex: &'a M,
    _bus: PhantomData<B>,
}

impl<'a, M, B> SharedI2c<'a, M, B> {
    pub fn new(mutex: &'a M) -> Self {
        Self {
            mutex,
            _bus: PhantomData,
        }
    }
}

impl<M, B> Clone for SharedI2c<'_, M, B> {
    fn clone(&self) -> Self {
        Self::new(self.mutex)
    }
}

impl<B: I2cBus, M: BusMutex<B>> I2cBus for SharedI2c<'_, M, B> {
    fn transact(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Error> {
        self.mutex.lock(|bus| bus.transact(address, write, read))
    }
}

/// Per-driver handle onto an SPI bus behind a mutex
///
/// Each transfer holds the lock only for itself. A driver that needs CS held
/// across several transfers must batch them into one `write`.
pub struct SharedSpi<'a, M, B> {
    mutex: &'a M,
    _bus: PhantomData<B>,
}

impl<'a, M, B> SharedSpi<'a, M, B> {
    pub fn new(mutex: &'a M) -> Self {
        Self {
            mutex,
            _bus: PhantomData,
        }
    }
}

impl<B: SpiBus, M: BusMutex<B>> SpiBus for SharedSpi<'_, M, B> {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Error> {
        self.mutex.lock(|bus| bus.transfer(tx, rx))
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.mutex.lock(|bus| bus.write(data))
    }
}
