use crate::{Error, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use strum::Display;

/// Command set of the FDSemu bridge firmware. Commands are ASCII lines;
/// the device answers with a terminal `OK` or `Fail` token, optionally
/// preceded by a value.
#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    #[strum(to_string = "fds_write 0x{address:08x} 0x{len:08x}\r")]
    Write { address: u32, len: u32 },

    #[strum(to_string = "fds_erase_page 0x{address:08x}\r")]
    ErasePage { address: u32 },

    /// Apply the staged firmware image. The device resets itself and
    /// never answers on this link.
    #[strum(to_string = "fds_update\r")]
    Update,

    #[strum(to_string = "fds_version\r")]
    Version,

    #[strum(to_string = "fds_size\r")]
    FlashSize,

    #[strum(to_string = "fds_selftest\r")]
    SelfTest,

    #[strum(to_string = "fds_lasterror\r")]
    LastError,

    #[strum(to_string = "fds_ping\r")]
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ok,
    Fail,
}

/// Terminal tokens scanned for in the receive stream.
const RESPONSE_STR_TABLE: [(&str, Response); 2] = [("OK", Response::Ok), ("Fail", Response::Fail)];

/// Blocking command/response plumbing shared by every session operation.
pub struct LinkOps;

impl LinkOps {
    const DEFAULT_TIMEOUT_MS: u128 = 4000;
    const ERASE_TIMEOUT_MS: u128 = 30 * 1000;

    /// Send a command and wait for its terminal token. Returns the raw
    /// text that preceded the token so callers can parse query values.
    pub fn command(port: &mut Box<dyn SerialPort>, cmd: Command) -> Result<(Response, String)> {
        tracing::debug!("command: {:?}", cmd);

        port.write_all(cmd.to_string().as_bytes())?;
        port.flush()?;

        let timeout = match cmd {
            Command::ErasePage { .. } => Self::ERASE_TIMEOUT_MS,
            _ => Self::DEFAULT_TIMEOUT_MS,
        };

        Self::wait_for_response(port, timeout)
    }

    /// Send a command that is fire-and-forget by contract. Nothing is
    /// read back; link errors are logged and swallowed because the caller
    /// has no way to undo the command once it is on the wire.
    pub fn command_no_response(port: &mut Box<dyn SerialPort>, cmd: Command) {
        tracing::debug!("command (no response): {:?}", cmd);

        if let Err(err) = port
            .write_all(cmd.to_string().as_bytes())
            .and_then(|_| port.flush())
        {
            tracing::warn!("link error sending {:?}: {}", cmd, err);
        }
    }

    /// Stream a data payload after a `Write` command and wait for the
    /// device to acknowledge it.
    pub fn send_data(port: &mut Box<dyn SerialPort>, data: &[u8]) -> Result<Response> {
        port.write_all(data)?;
        port.flush()?;
        Self::wait_for_response(port, Self::DEFAULT_TIMEOUT_MS).map(|(response, _)| response)
    }

    fn wait_for_response(
        port: &mut Box<dyn SerialPort>,
        timeout_ms: u128,
    ) -> Result<(Response, String)> {
        let mut buffer: Vec<u8> = Vec::new();
        let start = std::time::Instant::now();

        loop {
            if start.elapsed().as_millis() > timeout_ms {
                return Err(Error::timeout("waiting for device response"));
            }

            let mut byte = [0u8; 1];
            match port.read(&mut byte) {
                Ok(0) => continue,
                Ok(_) => buffer.push(byte[0]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }

            let text = String::from_utf8_lossy(&buffer);
            for (token, response) in RESPONSE_STR_TABLE {
                if let Some(pos) = text.rfind(token) {
                    let preceding = text[..pos].trim().to_string();
                    return Ok((response, preceding));
                }
            }
        }
    }
}
