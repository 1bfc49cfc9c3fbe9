//! Mock bus transport for testing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::traits::{BusTransport, TransportError};
use crate::protocol::Register;

/// One completed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub write: Vec<u8>,
    pub read_len: usize,
}

impl Transaction {
    pub fn register(&self) -> Option<Register> {
        self.write.first().copied().and_then(Register::from_u8)
    }
}

#[derive(Default)]
struct MockState {
    open: Option<(u8, u16)>,
    open_fails: bool,
    /// Queued one-shot responses per register byte.
    queued: HashMap<u8, VecDeque<Vec<u8>>>,
    /// Responses returned whenever the queue for a register is empty.
    sticky: HashMap<u8, Vec<u8>>,
    /// Number of upcoming transfers that fail.
    fail_next: usize,
    /// Registers whose transfers always fail.
    failing: HashSet<u8>,
    log: Vec<Transaction>,
}

/// Mock transport for unit testing the driver and update engine.
///
/// Clones share state, so a test can keep a handle after moving the
/// transport into a `Bus`.
#[derive(Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
    written: Arc<Condvar>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response returned by the next transfer to `register`.
    pub fn queue_response(&self, register: Register, data: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .queued
            .entry(register.as_u8())
            .or_default()
            .push_back(data.to_vec());
    }

    /// Respond to every transfer to `register` with `data` once its queue is empty.
    pub fn set_response(&self, register: Register, data: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .sticky
            .insert(register.as_u8(), data.to_vec());
    }

    /// Make the next `count` transfers fail.
    pub fn fail_next_transfers(&self, count: usize) {
        self.state.lock().unwrap().fail_next = count;
    }

    /// Make every transfer to `register` fail until cleared.
    pub fn set_register_fails(&self, register: Register, fails: bool) {
        let mut state = self.state.lock().unwrap();
        if fails {
            state.failing.insert(register.as_u8());
        } else {
            state.failing.remove(&register.as_u8());
        }
    }

    /// Make `open` fail.
    pub fn set_open_fails(&self, fails: bool) {
        self.state.lock().unwrap().open_fails = fails;
    }

    /// Bus index and address passed to the last successful `open`.
    pub fn opened_with(&self) -> Option<(u8, u16)> {
        self.state.lock().unwrap().open
    }

    /// All successful transactions so far.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().log.clone()
    }

    /// Written bytes of every successful transaction to `register`.
    pub fn writes_to(&self, register: Register) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|t| t.register() == Some(register))
            .map(|t| t.write.clone())
            .collect()
    }

    pub fn count(&self, register: Register) -> usize {
        self.writes_to(register).len()
    }

    /// Forget captured transactions.
    pub fn clear_transactions(&self) {
        self.state.lock().unwrap().log.clear();
    }

    /// Block until at least `count` transactions to `register` happened.
    ///
    /// Returns false on timeout.
    pub fn wait_for_writes(&self, register: Register, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        loop {
            let seen = state
                .log
                .iter()
                .filter(|t| t.register() == Some(register))
                .count();
            if seen >= count {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self.written.wait_timeout(state, deadline - now).unwrap().0;
        }
    }
}

impl BusTransport for MockBus {
    fn open(&mut self, bus: u8, address: u16) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.open_fails {
            return Err(TransportError::OpenFailed {
                bus,
                address,
                message: "mock open failure".into(),
            });
        }
        state.open = Some((bus, address));
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open.is_some()
    }

    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.open.is_none() {
            return Err(TransportError::NotOpen);
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(TransportError::TransferFailed("mock transfer failure".into()));
        }

        let reg = write.first().copied().unwrap_or_default();
        if state.failing.contains(&reg) {
            return Err(TransportError::TransferFailed(format!(
                "mock failure for register 0x{:02X}",
                reg
            )));
        }
        let queued = state.queued.get_mut(&reg).and_then(|q| q.pop_front());
        let response = queued.or_else(|| state.sticky.get(&reg).cloned());

        read.fill(0);
        match response {
            Some(data) => {
                let n = data.len().min(read.len());
                read[..n].copy_from_slice(&data[..n]);
            }
            // A one-byte read is the dummy read of a write-only command.
            None if read.len() <= 1 => {}
            None => {
                return Err(TransportError::TransferFailed(format!(
                    "no response for register 0x{:02X}",
                    reg
                )));
            }
        }

        state.log.push(Transaction {
            write: write.to_vec(),
            read_len: read.len(),
        });
        self.written.notify_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_response_queue() {
        let mut mock = MockBus::new();
        mock.open(0, 0x42).unwrap();
        mock.queue_response(Register::ReadWakeupReason, &[2]);
        mock.set_response(Register::ReadWakeupReason, &[7]);

        let mut buf = [0u8; 1];
        mock.transfer(&[Register::ReadWakeupReason.as_u8()], &mut buf)
            .unwrap();
        assert_eq!(buf, [2]);
        mock.transfer(&[Register::ReadWakeupReason.as_u8()], &mut buf)
            .unwrap();
        assert_eq!(buf, [7]);
    }

    #[test]
    fn test_mock_requires_open() {
        let mut mock = MockBus::new();
        let mut buf = [0u8; 1];
        assert!(matches!(
            mock.transfer(&[0x00], &mut buf),
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    fn test_mock_missing_response_fails() {
        let mut mock = MockBus::new();
        mock.open(0, 0x42).unwrap();
        let mut buf = [0u8; 4];
        assert!(mock.transfer(&[0xFF], &mut buf).is_err());
        assert!(mock.transactions().is_empty());
    }

    #[test]
    fn test_mock_fail_next() {
        let mut mock = MockBus::new();
        mock.open(0, 0x42).unwrap();
        mock.fail_next_transfers(1);
        let mut buf = [0u8; 1];
        assert!(mock.transfer(&[0x10], &mut buf).is_err());
        assert!(mock.transfer(&[0x10], &mut buf).is_ok());
        assert_eq!(mock.count(Register::SetLed), 1);
    }

    #[test]
    fn test_wait_for_writes_times_out() {
        let mock = MockBus::new();
        assert!(!mock.wait_for_writes(
            Register::PushFirmwareUpdate,
            1,
            Duration::from_millis(10)
        ));
    }
}
