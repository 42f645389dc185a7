use clap::{Parser, Subcommand};
use fdstool_lib::Error;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(author, version, about = "FDSemu flash cartridge utility", long_about = None)]
pub struct Cli {
    /// Serial port device
    #[arg(short = 'p', long = "port")]
    pub port: String,

    /// Serial port baud rate
    #[arg(short = 'b', long = "baud", default_value = "115200")]
    pub baud: u32,

    /// How long to wait for the device to reboot after a firmware update,
    /// in milliseconds
    #[arg(long = "recovery-wait", default_value_t = 5000)]
    pub recovery_wait: u64,

    /// Suppress progress output
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update the device firmware from a raw binary file
    #[command(name = "update_firmware")]
    UpdateFirmware(UpdateFirmware),

    /// Update the loader in slot 0 from an FDS image file
    #[command(name = "update_loader")]
    UpdateLoader(UpdateLoader),

    /// Erase a flash slot, or every slot with `all`
    #[command(name = "erase")]
    Erase(Erase),

    /// Run the device's built-in self test
    #[command(name = "self_test")]
    SelfTest,
}

#[derive(Parser, Debug)]
pub struct UpdateFirmware {
    /// Firmware binary
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct UpdateLoader {
    /// Loader image
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct Erase {
    /// Slot index (1..n), or `all`
    pub target: EraseTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseTarget {
    All,
    Slot(u32),
}

impl FromStr for EraseTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<u32>().map(Self::Slot).map_err(|_| {
            Error::invalid_input(format!("expected a slot index or 'all', got '{}'", s))
        })
    }
}
