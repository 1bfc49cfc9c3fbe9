use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use fring_core::{
    Color, DriverConfig, Fring, FringEvent, FringObserver, LedId, LedState, LinuxI2cTransport,
    SysfsGpio, TracingObserver,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fring companion MCU daemon", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Identify the MCU and service its interrupts
    Run,
    /// Print the MCU identity
    Info,
    /// Set one LED
    Led {
        /// LED index (0 or 1)
        #[arg(long, default_value_t = 0)]
        id: u8,
        #[arg(value_enum)]
        mode: LedMode,
        /// Color as r,g,b in 0..1
        #[arg(long, value_parser = parse_color, default_value = "1,1,1")]
        color: Color,
        /// Flashing on phase in milliseconds
        #[arg(long, default_value_t = 500)]
        on_ms: u64,
        /// Flashing off phase in milliseconds
        #[arg(long, default_value_t = 500)]
        off_ms: u64,
        /// Pulsating frequency in Hz
        #[arg(long, default_value_t = 1.0)]
        frequency: f64,
    },
    /// Wake the host after the given number of milliseconds
    Wakeup { milliseconds: u32 },
    /// Flash a firmware image into the inactive bank
    Update { image: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LedMode {
    Off,
    On,
    Flashing,
    Pulsating,
}

fn parse_color(s: &str) -> Result<Color, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [r, g, b] => Ok(Color::new(*r, *g, *b)),
        _ => Err(format!("expected r,g,b, got {:?}", s)),
    }
}

/// Logs events and remembers whether a firmware update failed.
#[derive(Default)]
struct CliObserver {
    update_failed: AtomicBool,
}

impl FringObserver for CliObserver {
    fn on_event(&self, event: &FringEvent) {
        if let FringEvent::FirmwareUpdateFailed { .. } = event {
            self.update_failed.store(true, Ordering::Relaxed);
        }
        TracingObserver.on_event(event);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<DriverConfig> {
    let mut config = match path {
        Some(path) => DriverConfig::load_from_file(path)
            .with_context(|| format!("Unable to load {}", path.display()))?,
        None => DriverConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;

    // Only the daemon flashes images it finds on its own.
    if !matches!(args.command, Command::Run) {
        config.firmware_updates = false;
    }

    let gpio = config.interrupt_gpio;
    let observer = Arc::new(CliObserver::default());
    let mut fring = Fring::with_observer(LinuxI2cTransport::default(), config, observer.clone());
    fring.initialize().context("Fring not found")?;

    match args.command {
        Command::Run => {
            info!("Starting Fring daemon");
            let mut source = SysfsGpio::open(gpio)?;
            let stop = AtomicBool::new(false);
            fring.run(&mut source, &stop)?;
        }
        Command::Info => {
            if let Some(identity) = fring.identity() {
                println!("Firmware version : {}", identity.firmware_version);
                println!("Boot slot        : {}", identity.slot);
                println!("Beta             : {}", identity.beta);
                println!("Serial           : {}", identity.serial_hex());
                println!(
                    "Board revision   : {} / {}",
                    identity.board_revision_a, identity.board_revision_b
                );
            }
        }
        Command::Led {
            id,
            mode,
            color,
            on_ms,
            off_ms,
            frequency,
        } => {
            let state = match mode {
                LedMode::Off => LedState::Off,
                LedMode::On => LedState::On(color),
                LedMode::Flashing => LedState::Flashing {
                    color,
                    on: Duration::from_millis(on_ms),
                    off: Duration::from_millis(off_ms),
                },
                LedMode::Pulsating => {
                    if frequency <= 0.0 {
                        bail!("Frequency must be positive");
                    }
                    LedState::Pulsating { color, frequency }
                }
            };
            fring.set_led(LedId::new(id), state)?;
        }
        Command::Wakeup { milliseconds } => {
            fring.set_wakeup_ms(milliseconds)?;
            info!(milliseconds, "Wakeup timer set");
        }
        Command::Update { image } => {
            let mut source = SysfsGpio::open(gpio)?;
            fring.start_firmware_update(&image)?;
            while fring.update_in_progress() {
                fring.poll_once(&mut source, Duration::from_millis(200))?;
            }
            if observer.update_failed.load(Ordering::Relaxed) {
                bail!("Firmware update failed");
            }
            info!("Firmware update complete");
        }
    }

    Ok(())
}
