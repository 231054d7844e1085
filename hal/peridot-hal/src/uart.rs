//! UART serial communication abstractions
//!
//! UART drivers see a byte stream with a bounded receive buffer.
//! [`BufferedUart`] builds that out of any `embedded-io` serial port.

use heapless::Deque;

use crate::error::Error;

/// Byte-stream serial port with a bounded receive buffer
pub trait UartBus {
    /// Write every byte of `data`, blocking until done
    fn write_all(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Next received byte, blocking until one arrives
    fn read_byte(&mut self) -> Result<u8, Error>;

    /// Number of bytes already received and waiting
    fn buffered_count(&mut self) -> usize;

    /// Fill `buf` with received bytes
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        for b in buf.iter_mut() {
            *b = self.read_byte()?;
        }
        Ok(())
    }
}

/// [`UartBus`] over an `embedded-io` port with an `N`-byte receive ring
///
/// Call [`poll`](Self::poll) from the main loop (or an RX interrupt) to move
/// bytes from the port into the ring. When the ring is full, new bytes are
/// left in the port.
pub struct BufferedUart<T, const N: usize> {
    port: T,
    rx: Deque<u8, N>,
}

impl<T, const N: usize> BufferedUart<T, N>
where
    T: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write,
{
    /// Wrap a port with an empty receive buffer
    pub fn new(port: T) -> Self {
        Self {
            port,
            rx: Deque::new(),
        }
    }

    /// Drain whatever the port has ready into the ring
    ///
    /// Returns the number of bytes moved.
    pub fn poll(&mut self) -> Result<usize, Error> {
        let mut moved = 0;
        let mut chunk = [0u8; 16];
        while !self.rx.is_full() && self.port.read_ready().map_err(|_| Error::BusError)? {
            let room = (N - self.rx.len()).min(chunk.len());
            let n = self
                .port
                .read(&mut chunk[..room])
                .map_err(|_| Error::BusError)?;
            if n == 0 {
                break;
            }
            for &b in &chunk[..n] {
                // Cannot fail: `room` bounds `n`
                let _ = self.rx.push_back(b);
            }
            moved += n;
        }
        Ok(moved)
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.rx.clear();
    }

    /// Return the wrapped port
    pub fn into_inner(self) -> T {
        self.port
    }
}

impl<T, const N: usize> UartBus for BufferedUart<T, N>
where
    T: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write,
{
    fn write_all(&mut self, data: &[u8]) -> Result<(), Error> {
        self.port.write_all(data).map_err(|_| Error::BusError)?;
        self.port.flush().map_err(|_| Error::BusError)
    }

    fn read_byte(&mut self) -> Result<u8, Error> {
        if let Some(b) = self.rx.pop_front() {
            return Ok(b);
        }
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte).map_err(|_| Error::BusError)? {
            0 => Err(Error::Timeout),
            _ => Ok(byte[0]),
        }
    }

    fn buffered_count(&mut self) -> usize {
        // A failing port simply reports what is already buffered
        let _ = self.poll();
        self.rx.len()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// In-memory serial port
    pub struct MockPort {
        pub incoming: VecDeque<u8>,
        pub written: Vec<u8>,
    }

    impl MockPort {
        pub fn new(incoming: &[u8]) -> Self {
            Self {
                incoming: incoming.iter().copied().collect(),
                written: Vec::new(),
            }
        }
    }

    impl embedded_io::ErrorType for MockPort {
        type Error = core::convert::Infallible;
    }

    impl embedded_io::Read for MockPort {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let mut n = 0;
            while n < buf.len() {
                match self.incoming.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl embedded_io::ReadReady for MockPort {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.incoming.is_empty())
        }
    }

    impl embedded_io::Write for MockPort {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }
}
