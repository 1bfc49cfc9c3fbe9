//! Fring driver - owns the bus, the cached device state and the update job.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::bus::{Bus, BusError};
use crate::config::DriverConfig;
use crate::dispatch::{self, InterruptKind};
use crate::events::{FringEvent, FringObserver, TracingObserver};
use crate::init::{self, DeviceIdentity, InitError};
use crate::interrupt::{InterruptError, InterruptSource};
use crate::protocol::{BootSlot, Register, Response, WriteCommand};
use crate::state::{DeviceStateCache, LedId, LedState};
use crate::telemetry::BatteryLog;
use crate::transport::{BusTransport, TransportError};
use crate::update::{UpdateError, UpdateHandle, find_newer_image};

/// Outcome of [`Fring::set_led`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedWrite {
    /// The command went out on the bus.
    Sent,
    /// The LED already shows this state; nothing was written.
    Cached,
}

/// Host-side driver for the Fring MCU.
///
/// All methods run on the controlling context. Only the firmware update
/// worker runs elsewhere, sharing the bus through [`Bus`].
pub struct Fring<T: BusTransport + 'static, O: FringObserver + 'static> {
    config: DriverConfig,
    bus: Arc<Bus<T>>,
    observer: Arc<O>,
    cache: DeviceStateCache,
    update: Option<UpdateHandle>,
    firmware_updates: bool,
    reinit_at: Option<Instant>,
    battery_log: Option<BatteryLog>,
}

impl<T: BusTransport + 'static> Fring<T, TracingObserver> {
    /// Create a driver logging its events through tracing.
    pub fn new(transport: T, config: DriverConfig) -> Self {
        Self::with_observer(transport, config, Arc::new(TracingObserver))
    }
}

impl<T: BusTransport + 'static, O: FringObserver + 'static> Fring<T, O> {
    /// Create a driver with a custom observer.
    pub fn with_observer(transport: T, config: DriverConfig, observer: Arc<O>) -> Self {
        let battery_log = config
            .battery_log_dir
            .as_deref()
            .and_then(|dir| match BatteryLog::create_in(dir) {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Unable to create battery log");
                    None
                }
            });

        Self {
            firmware_updates: config.firmware_updates,
            config,
            bus: Arc::new(Bus::new(transport)),
            observer,
            cache: DeviceStateCache::new(),
            update: None,
            reinit_at: None,
            battery_log,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn observer(&self) -> &Arc<O> {
        &self.observer
    }

    /// Identify the MCU and, if enabled, start a pending firmware update.
    ///
    /// On failure the driver is left unidentified; calling this again
    /// retries the whole sequence.
    #[instrument(skip(self))]
    pub fn initialize(&mut self) -> Result<(), InitError> {
        let identity = match init::identify(
            &self.bus,
            self.config.i2c_bus,
            self.config.i2c_address,
        ) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Initialization failed");
                self.cache.set_identity(None);
                return Err(e);
            }
        };

        // The MCU may have restarted; its LEDs no longer show what we sent.
        self.cache.leds.invalidate();

        self.observer.on_event(&FringEvent::DeviceIdentified {
            firmware_version: identity.firmware_version,
            slot: identity.slot,
            beta: identity.beta,
            serial: identity.serial_hex(),
        });

        let (version, slot) = (identity.firmware_version, identity.slot);
        self.cache.set_identity(Some(identity));

        if self.firmware_updates {
            self.check_for_update(version, slot);
        }
        Ok(())
    }

    fn check_for_update(&mut self, version: u32, slot: BootSlot) {
        let dir = self.config.firmware_dir.clone();
        match find_newer_image(&dir, version, slot) {
            Ok(Some(candidate)) => {
                info!(
                    path = %candidate.path.display(),
                    version = candidate.version,
                    "Newer firmware available, starting update"
                );
                if let Err(e) = self.start_firmware_update(&candidate.path) {
                    warn!(error = %e, "Unable to start firmware update");
                }
            }
            Ok(None) => debug!(dir = %dir.display(), version, "Firmware is up to date"),
            Err(e) => warn!(dir = %dir.display(), error = %e, "Unable to scan firmware directory"),
        }
    }

    /// Service one interrupt edge.
    pub fn on_interrupt(&mut self) {
        let status = match self.bus.query(&WriteCommand::ReadInterruptStatus) {
            Ok(Response::InterruptStatus(status)) => status,
            Ok(_) => {
                warn!("Unexpected response to interrupt status read");
                return;
            }
            // Already logged by the bus; the next edge retries.
            Err(_) => return,
        };
        debug!(status = %format!("0x{:08x}", status.0), "Interrupt status");

        for kind in dispatch::pending(status) {
            let result = match kind {
                InterruptKind::DeviceStatus => self.read_device_status(),
                InterruptKind::BatteryStatus => self.read_battery_status(),
                InterruptKind::LogMessage => self.read_log_message(),
                InterruptKind::FirmwareUpdate => self.forward_update_result(),
                InterruptKind::WakeupReason => self.read_wakeup_reason(),
            };
            if let Err(e) = result {
                warn!(interrupt = %kind, error = %e, "Interrupt handler failed");
            }
        }
    }

    fn emit(&self, event: FringEvent) {
        self.observer.on_event(&event);
    }

    fn read_device_status(&mut self) -> Result<(), BusError> {
        let Response::DeviceStatus(status) = self.bus.query(&WriteCommand::ReadDeviceStatus)?
        else {
            return Err(BusError::UnexpectedResponse(Register::ReadDeviceStatus));
        };
        debug!(
            status = %format!("0x{:08x}", status.status),
            hardware_errors = %status.hardware_errors,
            ambient_light = status.ambient_light,
            temp0 = status.temperatures[0],
            temp1 = status.temperatures[1],
            temp2 = status.temperatures[2],
            "Device status update"
        );

        for event in self.cache.apply_device_status(status) {
            self.emit(event);
        }
        Ok(())
    }

    fn read_battery_status(&mut self) -> Result<(), BusError> {
        let Response::BatteryStatus(status) = self.bus.query(&WriteCommand::ReadBatteryStatus)?
        else {
            return Err(BusError::UnexpectedResponse(Register::ReadBatteryStatus));
        };
        debug!(
            current = %format!("{:.2} A", status.current_amps()),
            level = status.level,
            temperature = status.temperature,
            capacity_mah = status.remaining_capacity,
            cycles = status.cycle_count,
            to_full = status.time_to_full,
            to_empty = status.time_to_empty,
            status = %format!("0x{:04x}", status.status),
            "Battery status update"
        );

        if let Some(event) = self.cache.apply_battery_status(status) {
            self.emit(event);
        }
        if let Some(log) = &mut self.battery_log {
            log.append(&status);
        }
        Ok(())
    }

    fn read_log_message(&mut self) -> Result<(), BusError> {
        let Response::LogMessage(message) = self.bus.query(&WriteCommand::ReadLogMessage)? else {
            return Err(BusError::UnexpectedResponse(Register::ReadLogMessage));
        };
        self.emit(FringEvent::LogMessageReceived { message });
        Ok(())
    }

    fn read_wakeup_reason(&mut self) -> Result<(), BusError> {
        let Response::WakeupReason(reason) = self.bus.query(&WriteCommand::ReadWakeupReason)?
        else {
            return Err(BusError::UnexpectedResponse(Register::ReadWakeupReason));
        };
        self.emit(FringEvent::WakeupReasonChanged { reason });
        Ok(())
    }

    /// Read the verdict on the last chunk and hand it to the update worker.
    fn forward_update_result(&mut self) -> Result<(), BusError> {
        let Some(job) = &self.update else {
            warn!("Firmware update interrupt with no update in progress");
            return Ok(());
        };

        let Response::UpdateResult(result) =
            self.bus.query(&WriteCommand::ReadFirmwareUpdateResult)?
        else {
            return Err(BusError::UnexpectedResponse(Register::ReadFirmwareUpdateResult));
        };
        debug!(result = %result, "Firmware update acknowledgment");

        if !job.deliver_ack(result) {
            warn!(result = %result, "Update worker is no longer waiting for acknowledgments");
        }
        Ok(())
    }

    /// Set one LED, skipping the write if it already shows `state`.
    pub fn set_led(&mut self, id: LedId, state: LedState) -> Result<LedWrite, TransportError> {
        let cmd = state.to_command(id);
        if self.cache.leds.is_current(&cmd) {
            return Ok(LedWrite::Cached);
        }
        self.bus.command(&WriteCommand::SetLed(cmd))?;
        self.cache.leds.store(&cmd);
        Ok(LedWrite::Sent)
    }

    /// Ask the MCU to wake the host after `milliseconds`.
    pub fn set_wakeup_ms(&self, milliseconds: u32) -> Result<(), TransportError> {
        self.bus
            .command(&WriteCommand::SetWakeupTime { milliseconds })
    }

    /// Start flashing `path`, replacing any running update.
    #[instrument(skip(self))]
    pub fn start_firmware_update(&mut self, path: &Path) -> Result<(), UpdateError> {
        if let Some(previous) = self.update.take() {
            info!(path = %previous.path().display(), "Superseding running firmware update");
            previous.stop();
        }

        let handle = UpdateHandle::spawn(
            path,
            Arc::clone(&self.bus),
            Arc::clone(&self.observer),
            self.config.ack_timeout(),
        )?;
        self.update = Some(handle);
        Ok(())
    }

    pub fn update_in_progress(&self) -> bool {
        self.update.is_some()
    }

    /// Whether initialization still looks for firmware updates.
    pub fn firmware_updates_enabled(&self) -> bool {
        self.firmware_updates
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.cache.identity()
    }

    /// Serial number as lowercase hex, once identified.
    pub fn device_serial(&self) -> Option<String> {
        self.identity().map(DeviceIdentity::serial_hex)
    }

    /// Last-known device state.
    pub fn state(&self) -> &DeviceStateCache {
        &self.cache
    }

    /// When a re-identification is scheduled, if any.
    pub fn reinit_deadline(&self) -> Option<Instant> {
        self.reinit_at
    }

    /// Apply finished update outcomes and run scheduled re-identification.
    pub fn service(&mut self) {
        let outcome = self.update.as_mut().and_then(UpdateHandle::try_outcome);
        if let Some(outcome) = outcome {
            self.update = None;
            self.firmware_updates = false;
            match outcome {
                Ok(()) => {
                    info!(
                        settle_ms = self.config.update_settle_ms,
                        "Update succeeded, waiting for Fring to reappear"
                    );
                    self.reinit_at = Some(Instant::now() + self.config.update_settle());
                }
                Err(e) => info!(error = %e, "Update failed"),
            }
        }

        if let Some(at) = self.reinit_at
            && Instant::now() >= at
        {
            self.reinit_at = None;
            match self.initialize() {
                Ok(()) => info!("Successfully restarted fring"),
                Err(e) => warn!(error = %e, "Error restarting fring"),
            }
        }
    }

    /// Wait up to `timeout` for one interrupt, service it and pending work.
    pub fn poll_once<I: InterruptSource>(
        &mut self,
        source: &mut I,
        timeout: Duration,
    ) -> Result<(), InterruptError> {
        let timeout = match self.reinit_at {
            Some(at) => timeout.min(at.saturating_duration_since(Instant::now())),
            None => timeout,
        };
        if source.wait_edge(Some(timeout))? {
            self.on_interrupt();
        }
        self.service();
        Ok(())
    }

    /// Run the interrupt loop until `stop` is set.
    pub fn run<I: InterruptSource>(
        &mut self,
        source: &mut I,
        stop: &AtomicBool,
    ) -> Result<(), InterruptError> {
        info!("Entering interrupt loop");
        while !stop.load(Ordering::Relaxed) {
            self.poll_once(source, self.config.poll_interval())?;
        }
        if let Some(job) = self.update.take() {
            job.stop();
        }
        info!("Interrupt loop stopped");
        Ok(())
    }
}
