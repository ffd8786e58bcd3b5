//! Mavic Mini RC <-> virtual joystick bridge
//!
//! Main entry point: CLI parsing, device setup, and the run loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use mavic_rc_bridge::bridge::Bridge;
use mavic_rc_bridge::joystick::{Sink, VirtualJoystick};
use mavic_rc_bridge::mapper::{AxisMapper, InvertSet};
use mavic_rc_bridge::transport::{SerialTransport, Transport};
use mavic_rc_bridge::trigger::{KeyTrigger, NoTrigger, TriggerSource};

#[derive(Parser)]
#[command(name = "mavic-rc-bridge")]
#[command(about = "Mavic Mini RC <-> virtual joystick bridge")]
struct Cli {
    /// RC serial port (e.g. /dev/ttyUSB0)
    #[arg(short, long)]
    port: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,

    /// Virtual joystick device name
    #[arg(short, long, default_value = "Mavic Mini RC Bridge")]
    device_name: String,

    /// Invert lv, lh, rv, rh, or cam axis
    #[arg(short, long, num_args = 0.., default_values_t = ["lv".to_string(), "rv".to_string()])]
    invert: Vec<String>,

    /// Keyboard key that toggles button 1 (e.g. grave, f13)
    #[arg(short = '1', long)]
    button1: Option<String>,

    /// Serial read timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    read_timeout_ms: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let invert = InvertSet::parse(&cli.invert)?;

    // Stop flag raised by Ctrl+C, observed at every blocking point
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Relaxed);
        })?;
    }

    info!("Mavic Mini RC <-> virtual joystick bridge");

    // Open serial
    let transport = match SerialTransport::open(
        &cli.port,
        cli.baud,
        Duration::from_millis(cli.read_timeout_ms),
    ) {
        Ok(t) => {
            info!(
                "Opened serial device: {}",
                t.name().unwrap_or_else(|| cli.port.clone())
            );
            Some(t)
        }
        Err(e) => {
            error!("No controller connected: {e}");
            None
        }
    };

    // Create virtual joystick
    let joystick = match VirtualJoystick::new(&cli.device_name) {
        Ok(mut j) => {
            match j.device_path() {
                Some(path) => info!("Opened virtual joystick: {}", path.display()),
                None => info!("Opened virtual joystick: {}", cli.device_name),
            }
            Some(j)
        }
        Err(e) => {
            error!("No virtual joystick: {e}");
            None
        }
    };

    // Both must be open before polling starts; otherwise wait idle so the
    // operator can plug the controller in and restart at their leisure.
    let (transport, joystick) = match (transport, joystick) {
        (Some(t), Some(j)) => (t, j),
        _ => {
            info!("No controller connected. Press Ctrl+C to exit.");
            while running.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_secs(1));
            }
            info!("Stopping.");
            return Ok(());
        }
    };

    // Hotkey trigger; degrade to disabled rather than refusing to start
    let trigger: Box<dyn TriggerSource> = match &cli.button1 {
        Some(key_name) => match KeyTrigger::open(key_name) {
            Ok(t) => {
                info!("Press '{key_name}' to toggle Button 1.");
                Box::new(t)
            }
            Err(e) => {
                warn!("Button 1 hotkey disabled: {e}");
                Box::new(NoTrigger)
            }
        },
        None => Box::new(NoTrigger),
    };

    info!("Press Ctrl+C to stop.");

    let mapper = AxisMapper::new(invert);
    let mut bridge = Bridge::new(transport, joystick, trigger, mapper, running.clone());

    match bridge.run() {
        Ok(()) => info!("Detected interrupt."),
        // Mid-loop I/O failure: report, clean up, exit normally
        Err(e) => error!("Could not read/write: {e}"),
    }

    // Clean up: neutralize outputs and release the port unconditionally
    let (mut transport, mut joystick, _) = bridge.into_parts();
    if let Err(e) = joystick.reset() {
        warn!("Failed to reset joystick: {e}");
    }
    if let Err(e) = transport.close() {
        warn!("Failed to close serial port: {e}");
    }
    info!("Stopping.");
    Ok(())
}
