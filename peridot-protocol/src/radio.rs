//! Radio interrupt events as messages
//!
//! A LoRa transceiver signals completion through a DIO interrupt. The ISR
//! reads and clears the IRQ flags, turns them into [`RadioEvent`]s and
//! pushes them into a single-producer single-consumer queue. The main loop
//! polls the other end.
//!
//! ```text
//!   DIO ISR ──▶ EventSender ──▶ [ spsc::Queue ] ──▶ EventReceiver ──▶ main loop
//! ```
//!
//! A full queue drops the new event; the ISR never blocks.

use heapless::spsc::{Consumer, Producer, Queue};
use heapless::Vec;

/// Largest payload carried with an event
pub const MAX_RADIO_PAYLOAD: usize = 64;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioEventKind {
    RxDone,
    TxDone,
    Timeout,
    CrcError,
}

/// One radio interrupt, decoded
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioEvent {
    pub kind: RadioEventKind,
    /// Raw IRQ flags as read from the chip
    pub irq_status: u16,
    pub payload: Vec<u8, MAX_RADIO_PAYLOAD>,
}

impl RadioEvent {
    /// Event without payload
    pub fn new(kind: RadioEventKind, irq_status: u16) -> Self {
        Self {
            kind,
            irq_status,
            payload: Vec::new(),
        }
    }

    /// Event with payload; payloads over [`MAX_RADIO_PAYLOAD`] are truncated
    pub fn with_payload(kind: RadioEventKind, irq_status: u16, payload: &[u8]) -> Self {
        let n = payload.len().min(MAX_RADIO_PAYLOAD);
        let mut v = Vec::new();
        // Cannot fail: `n` is within capacity
        let _ = v.extend_from_slice(&payload[..n]);
        Self {
            kind,
            irq_status,
            payload: v,
        }
    }
}

/// IRQ flag bit for each event kind on a given transceiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqMasks {
    pub rx_done: u16,
    pub tx_done: u16,
    pub timeout: u16,
    pub crc_error: u16,
}

impl IrqMasks {
    /// SX1276/77/78/79 `RegIrqFlags`
    pub const SX127X: Self = Self {
        rx_done: 0x40,
        tx_done: 0x08,
        timeout: 0x80,
        crc_error: 0x20,
    };

    /// SX1261/62 `GetIrqStatus`
    pub const SX126X: Self = Self {
        rx_done: 0x0002,
        tx_done: 0x0001,
        timeout: 0x0200,
        crc_error: 0x0040,
    };

    /// Event kinds flagged in `status`, in delivery order
    pub fn decode(&self, status: u16) -> impl Iterator<Item = RadioEventKind> {
        [
            (self.rx_done, RadioEventKind::RxDone),
            (self.tx_done, RadioEventKind::TxDone),
            (self.timeout, RadioEventKind::Timeout),
            (self.crc_error, RadioEventKind::CrcError),
        ]
        .into_iter()
        .filter(move |(mask, _)| status & mask != 0)
        .map(|(_, kind)| kind)
    }
}

/// Backing storage for an event channel holding `N - 1` events
pub type RadioQueue<const N: usize> = Queue<RadioEvent, N>;

/// Split a queue into the ISR end and the main-loop end
pub fn split<const N: usize>(
    queue: &mut RadioQueue<N>,
) -> (EventSender<'_, N>, EventReceiver<'_, N>) {
    let (producer, consumer) = queue.split();
    (EventSender { producer }, EventReceiver { consumer })
}

/// Interrupt-side end of the channel
pub struct EventSender<'a, const N: usize> {
    producer: Producer<'a, RadioEvent, N>,
}

impl<const N: usize> EventSender<'_, N> {
    /// Queue an event; returns false (dropping it) when the queue is full
    pub fn send(&mut self, event: RadioEvent) -> bool {
        match self.producer.enqueue(event) {
            Ok(()) => true,
            Err(_dropped) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("radio: event queue full, dropping {}", _dropped.kind);
                false
            }
        }
    }

    /// Decode an IRQ status word and queue one event per flagged kind
    ///
    /// Returns how many events were queued.
    pub fn send_irq(&mut self, masks: &IrqMasks, status: u16) -> usize {
        masks
            .decode(status)
            .filter(|&kind| self.send(RadioEvent::new(kind, status)))
            .count()
    }
}

/// Polling end of the channel
pub struct EventReceiver<'a, const N: usize> {
    consumer: Consumer<'a, RadioEvent, N>,
}

impl<const N: usize> EventReceiver<'_, N> {
    /// Next pending event, if any
    pub fn poll(&mut self) -> Option<RadioEvent> {
        self.consumer.dequeue()
    }

    /// Drain events until one of `kind` arrives; others are discarded
    pub fn poll_for(&mut self, kind: RadioEventKind) -> Option<RadioEvent> {
        while let Some(event) = self.consumer.dequeue() {
            if event.kind == kind {
                return Some(event);
            }
        }
        None
    }

    /// Number of events waiting
    pub fn pending(&self) -> usize {
        self.consumer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sx127x_flags() {
        let kinds: std::vec::Vec<_> = IrqMasks::SX127X.decode(0x40 | 0x20).collect();
        assert_eq!(kinds, [RadioEventKind::RxDone, RadioEventKind::CrcError]);
        assert_eq!(IrqMasks::SX127X.decode(0x01).count(), 0);
    }

    #[test]
    fn test_isr_to_main_loop() {
        let mut queue: RadioQueue<4> = Queue::new();
        let (mut tx, mut rx) = split(&mut queue);

        assert_eq!(tx.send_irq(&IrqMasks::SX126X, 0x0001), 1);
        assert!(tx.send(RadioEvent::with_payload(
            RadioEventKind::RxDone,
            0x0002,
            &[1, 2, 3]
        )));
        assert_eq!(rx.pending(), 2);

        let first = rx.poll().unwrap();
        assert_eq!(first.kind, RadioEventKind::TxDone);
        assert_eq!(first.irq_status, 0x0001);

        let second = rx.poll().unwrap();
        assert_eq!(second.payload.as_slice(), &[1, 2, 3]);
        assert!(rx.poll().is_none());
    }

    #[test]
    fn test_full_queue_drops() {
        let mut queue: RadioQueue<3> = Queue::new();
        let (mut tx, mut rx) = split(&mut queue);

        // Capacity is N - 1
        assert_eq!(tx.send_irq(&IrqMasks::SX127X, 0x80 | 0x40 | 0x08), 2);
        assert_eq!(rx.pending(), 2);
        assert_eq!(rx.poll_for(RadioEventKind::TxDone).unwrap().kind, RadioEventKind::TxDone);
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn test_payload_truncated() {
        let big = [0xAAu8; MAX_RADIO_PAYLOAD + 10];
        let e = RadioEvent::with_payload(RadioEventKind::RxDone, 0, &big);
        assert_eq!(e.payload.len(), MAX_RADIO_PAYLOAD);
    }
}
