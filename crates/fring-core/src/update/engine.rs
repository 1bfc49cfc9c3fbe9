//! Firmware transfer worker.
//!
//! The image is pushed in chunks of at most 32 bytes. After each chunk the
//! worker blocks until the interrupt dispatcher delivers the MCU's verdict
//! through the acknowledgment channel, so chunk N+1 is never sent before
//! chunk N has been acknowledged.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::crc::{self, CRC_INIT};
use crate::bus::Bus;
use crate::events::{FringEvent, FringObserver};
use crate::protocol::constants::MAX_CHUNK_SIZE;
use crate::protocol::{FirmwareChunk, UpdateResult, WriteCommand};
use crate::transport::{BusTransport, TransportError};

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Unable to open firmware image {}: {source}", .path.display())]
    OpenImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to read firmware image: {0}")]
    ReadImage(#[source] io::Error),
    #[error("Firmware image too large: {0} bytes")]
    ImageTooLarge(u64),
    #[error("Unable to transmit chunk at offset {offset}: {source}")]
    Transfer {
        offset: u32,
        #[source]
        source: TransportError,
    },
    #[error("MCU rejected chunk at offset {offset}: {result}")]
    Rejected { offset: u32, result: UpdateResult },
    #[error("No acknowledgment for chunk at offset {offset} within {timeout:?}")]
    AckTimeout { offset: u32, timeout: Duration },
    #[error("Update superseded")]
    Cancelled,
    #[error("Unable to spawn update worker: {0}")]
    Spawn(#[source] io::Error),
}

/// States of an update job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Opening,
    Transmitting { offset: u32 },
    AwaitingAck { offset: u32 },
    Succeeded,
    Failed,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateState::Idle => write!(f, "IDLE"),
            UpdateState::Opening => write!(f, "OPENING"),
            UpdateState::Transmitting { offset } => write!(f, "TRANSMITTING({})", offset),
            UpdateState::AwaitingAck { offset } => write!(f, "AWAITING_ACK({})", offset),
            UpdateState::Succeeded => write!(f, "SUCCEEDED"),
            UpdateState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Progress reporting in 1% steps.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: f64,
}

impl ProgressTracker {
    /// Returns the fraction to report, or `None` if it has not changed.
    pub fn update(&mut self, offset: u64, size: u64) -> Option<f64> {
        let fraction = if size == 0 {
            1.0
        } else {
            (offset as f64 / size as f64).clamp(0.0, 1.0)
        };
        let fraction = (fraction * 100.0).round() / 100.0;
        if fraction == self.last {
            return None;
        }
        self.last = fraction;
        Some(fraction)
    }
}

/// Read until `buf` is full or the file ends.
fn read_chunk(file: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// One firmware transfer, owned by the worker thread.
struct UpdateJob<T: BusTransport, O: FringObserver> {
    path: PathBuf,
    bus: Arc<Bus<T>>,
    observer: Arc<O>,
    acks: Receiver<UpdateResult>,
    ack_timeout: Option<Duration>,
    cancel: Arc<AtomicBool>,
    state: UpdateState,
    offset: u32,
    crc: u32,
    progress: ProgressTracker,
}

impl<T: BusTransport, O: FringObserver> UpdateJob<T, O> {
    fn goto(&mut self, state: UpdateState) {
        debug!(from = %self.state, to = %state, "Update state transition");
        self.state = state;
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn run(&mut self) -> Result<(), UpdateError> {
        let result = self.transmit();
        self.goto(match result {
            Ok(()) => UpdateState::Succeeded,
            Err(_) => UpdateState::Failed,
        });
        result
    }

    fn transmit(&mut self) -> Result<(), UpdateError> {
        self.goto(UpdateState::Opening);
        let mut file = File::open(&self.path).map_err(|source| UpdateError::OpenImage {
            path: self.path.clone(),
            source,
        })?;
        let size = file.metadata().map_err(UpdateError::ReadImage)?.len();
        if size > u64::from(u32::MAX) {
            return Err(UpdateError::ImageTooLarge(size));
        }

        info!(path = %self.path.display(), size, "Transmitting firmware file");

        let mut payload = [0u8; MAX_CHUNK_SIZE];
        loop {
            if self.cancelled() {
                return Err(UpdateError::Cancelled);
            }

            // Padding of the final partial chunk is zero.
            payload.fill(0);
            let read = read_chunk(&mut file, &mut payload).map_err(UpdateError::ReadImage)?;
            if read == 0 {
                break;
            }
            let length = read.next_multiple_of(4);
            let offset = self.offset;

            self.goto(UpdateState::Transmitting { offset });
            self.crc = crc::update(self.crc, &payload[..length]);
            let chunk = FirmwareChunk {
                offset,
                length: length as u32,
                crc: self.crc,
                payload,
            };

            self.discard_stale_acks();
            self.bus
                .command(&WriteCommand::PushFirmwareUpdate(chunk))
                .map_err(|source| UpdateError::Transfer { offset, source })?;

            self.goto(UpdateState::AwaitingAck { offset });
            let result = self.wait_for_ack(offset)?;
            if !result.is_ok() {
                warn!(offset, result = %result, "Firmware returned bad code in response to update command");
                return Err(UpdateError::Rejected { offset, result });
            }

            self.offset += length as u32;
            if let Some(fraction) = self.progress.update(u64::from(self.offset), size) {
                self.observer
                    .on_event(&FringEvent::FirmwareUpdateProgress { fraction });
            }
        }

        info!(bytes = self.offset, crc = %format!("0x{:08X}", self.crc), "Firmware transmitted");
        Ok(())
    }

    /// Drop acknowledgments that arrived before the chunk they would answer.
    fn discard_stale_acks(&self) {
        while let Ok(stale) = self.acks.try_recv() {
            warn!(result = %stale, offset = self.offset, "Discarding unsolicited update acknowledgment");
        }
    }

    fn wait_for_ack(&self, offset: u32) -> Result<UpdateResult, UpdateError> {
        let result = match self.ack_timeout {
            Some(timeout) => self.acks.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => UpdateError::AckTimeout { offset, timeout },
                RecvTimeoutError::Disconnected => UpdateError::Cancelled,
            }),
            None => self.acks.recv().map_err(|_| UpdateError::Cancelled),
        }?;

        if self.cancelled() {
            return Err(UpdateError::Cancelled);
        }
        Ok(result)
    }
}

/// Controlling-context side of a running update.
///
/// Holds the sending half of the acknowledgment channel and receives the
/// job's outcome once the worker exits.
pub struct UpdateHandle {
    path: PathBuf,
    acks: Option<Sender<UpdateResult>>,
    outcome: Receiver<Result<(), UpdateError>>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl UpdateHandle {
    /// Start a worker thread transmitting the image at `path`.
    pub fn spawn<T, O>(
        path: &Path,
        bus: Arc<Bus<T>>,
        observer: Arc<O>,
        ack_timeout: Option<Duration>,
    ) -> Result<Self, UpdateError>
    where
        T: BusTransport + 'static,
        O: FringObserver + 'static,
    {
        let (ack_tx, ack_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let mut job = UpdateJob {
            path: path.to_path_buf(),
            bus,
            observer,
            acks: ack_rx,
            ack_timeout,
            cancel: Arc::clone(&cancel),
            state: UpdateState::Idle,
            offset: 0,
            crc: CRC_INIT,
            progress: ProgressTracker::default(),
        };

        let thread = thread::Builder::new()
            .name("fring-update".into())
            .spawn(move || {
                let result = job.run();
                match &result {
                    Ok(()) => job.observer.on_event(&FringEvent::FirmwareUpdateSucceeded),
                    Err(UpdateError::Cancelled) => info!("Update job stopped"),
                    Err(e) => job.observer.on_event(&FringEvent::FirmwareUpdateFailed {
                        reason: e.to_string(),
                    }),
                }
                let _ = outcome_tx.send(result);
            })
            .map_err(UpdateError::Spawn)?;

        Ok(Self {
            path: path.to_path_buf(),
            acks: Some(ack_tx),
            outcome: outcome_rx,
            cancel,
            thread: Some(thread),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hand the MCU's verdict on the last chunk to the worker.
    ///
    /// Returns false if the worker is no longer listening.
    pub fn deliver_ack(&self, result: UpdateResult) -> bool {
        self.acks.as_ref().is_some_and(|tx| tx.send(result).is_ok())
    }

    /// The job's outcome, if the worker has finished.
    pub fn try_outcome(&mut self) -> Option<Result<(), UpdateError>> {
        match self.outcome.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(UpdateError::Cancelled))
            }
        }
    }

    /// Block until the worker finishes or `timeout` passes.
    pub fn wait_outcome(&mut self, timeout: Duration) -> Option<Result<(), UpdateError>> {
        match self.outcome.recv_timeout(timeout) {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.join();
                Some(Err(UpdateError::Cancelled))
            }
        }
    }

    /// Stop the worker and wait for its thread to exit.
    ///
    /// A chunk already on the bus completes; the worker then sees the
    /// closed acknowledgment channel and stops.
    pub fn stop(mut self) {
        self.cancel.store(true, Ordering::Release);
        self.acks = None;
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("Update worker panicked");
        }
    }
}

impl Drop for UpdateHandle {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
    }
}
