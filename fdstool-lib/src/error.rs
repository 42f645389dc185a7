use std::path::PathBuf;
use thiserror::Error;

/// Convenient result type for `fdstool-lib`.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serial(#[from] serialport::Error),

    #[error("unable to open '{path}': {source}")]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("firmware image too large: {len} bytes, maximum is {max}")]
    ImageTooLarge { len: usize, max: usize },

    #[error("flash write failed at 0x{address:08X}")]
    WriteFailure { address: u32 },

    #[error("device unreachable after update: {0}")]
    DeviceUnreachable(String),

    #[error("image does not appear to be the loader")]
    NotALoaderImage,

    #[error("slot {slot} is protected and cannot be erased")]
    SlotProtected { slot: u32 },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("timeout while {0}")]
    Timeout(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
