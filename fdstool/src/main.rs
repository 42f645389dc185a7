mod cli;
mod progress;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, EraseTarget};
use fdstool_lib::progress::ProgressHelper;
use fdstool_lib::session::{SerialSession, SessionConfig};
use fdstool_lib::slot::SlotGuard;
use fdstool_lib::update::{CancelToken, FirmwareUpdater, UpdateOptions};
use fdstool_lib::{DeviceSession, Error};
use std::process;
use std::time::Duration;

/// Convert macOS /dev/tty.* ports to /dev/cu.* ports; the tty variants
/// block on carrier detect.
fn normalize_mac_port_name(port_name: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        if port_name.starts_with("/dev/tty.") {
            return port_name.replace("/dev/tty.", "/dev/cu.");
        }
    }
    port_name.to_string()
}

/// Check that the named serial port exists before opening a session, and
/// list the available ones when it does not.
fn check_port_available(port_name: &str) -> Result<(), String> {
    match serialport::available_ports() {
        Ok(ports) => {
            let filtered_ports: Vec<_> = ports
                .into_iter()
                .filter(|p| {
                    #[cfg(target_os = "macos")]
                    {
                        !p.port_name.starts_with("/dev/tty.")
                    }
                    #[cfg(not(target_os = "macos"))]
                    {
                        true
                    }
                })
                .collect();

            if filtered_ports.iter().any(|p| p.port_name == port_name) {
                Ok(())
            } else {
                let available: Vec<String> =
                    filtered_ports.iter().map(|p| p.port_name.clone()).collect();
                Err(format!(
                    "no FDSemu bridge on '{}'; detected serial ports: {}",
                    port_name,
                    if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    }
                ))
            }
        }
        Err(e) => Err(format!("could not enumerate serial ports: {}", e)),
    }
}

fn run_command(
    session: &mut SerialSession,
    progress: &ProgressHelper,
    args: &Cli,
) -> Result<()> {
    match &args.command {
        Commands::UpdateFirmware(params) => {
            let options = UpdateOptions {
                recovery_wait: Duration::from_millis(args.recovery_wait),
                cancel: CancelToken::new(),
            };
            let report = FirmwareUpdater::new(session, progress, options).run(&params.file)?;
            println!("Updated to build {}", report.version);
        }
        Commands::UpdateLoader(params) => {
            let candidate =
                std::fs::read(&params.file).map_err(|source| Error::FileOpen {
                    path: params.file.clone(),
                    source,
                })?;
            let info = SlotGuard::new(session, progress).write_loader(&candidate)?;
            println!("Loader updated to version {}", info);
        }
        Commands::Erase(params) => {
            let mut guard = SlotGuard::new(session, progress);
            match params.target {
                EraseTarget::All => guard.erase_all()?,
                EraseTarget::Slot(slot) => guard.erase_slot(slot)?,
            }
        }
        Commands::SelfTest => {
            if !session.self_test()? {
                return Err(Error::protocol("device self test failed").into());
            }
        }
    }
    Ok(())
}

fn main() {
    // Log level is controlled by RUST_LOG, e.g. RUST_LOG=fdstool_lib=debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut args = Cli::parse();
    args.port = normalize_mac_port_name(&args.port);

    if let Err(e) = check_port_available(&args.port) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let progress = ProgressHelper::new(progress::create_progress_callback(args.quiet));
    let mut session = SerialSession::new(SessionConfig::new(&args.port, args.baud));

    let result = session
        .open()
        .map_err(anyhow::Error::from)
        .and_then(|_| run_command(&mut session, &progress, &args));

    let code = match result {
        Ok(()) => {
            println!("Ok.");
            0
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            match err.downcast_ref::<Error>() {
                // The only outcomes where device state is unknown: the
                // update may have fully, partially, or not at all applied.
                Some(Error::DeviceUnreachable(_)) | Some(Error::Cancelled) => {
                    eprintln!("Update outcome unknown; reconnect the device and check its firmware version.");
                }
                _ => {
                    eprintln!("Device reports: {}", session.last_error());
                }
            }
            println!("Failed.");
            1
        }
    };

    // Session is closed exactly once, success or failure.
    session.close();
    process::exit(code);
}
