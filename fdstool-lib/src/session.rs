use crate::link::{Command, LinkOps, Response};
use crate::{DeviceSession, Error, FlashTransport, Result};
use serialport::SerialPort;
use std::time::Duration;

/// Connection parameters for a [`SerialSession`].
#[derive(Clone)]
pub struct SessionConfig {
    pub port_name: String,
    pub baud: u32,
}

impl SessionConfig {
    pub fn new(port_name: impl Into<String>, baud: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud,
        }
    }
}

/// Serial-backed session with the FDSemu bridge. Single owner: opened
/// once per process, used by exactly one command path, closed once on
/// exit. Reopened only by the firmware updater's reacquire step.
pub struct SerialSession {
    config: SessionConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config, port: None }
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| Error::protocol("session is not open"))
    }

    fn query_u32(&mut self, cmd: Command) -> Result<u32> {
        let port = self.port()?;
        let (response, text) = LinkOps::command(port, cmd.clone())?;
        if response != Response::Ok {
            return Err(Error::protocol(format!("{:?} failed", cmd)));
        }
        text.trim()
            .parse::<u32>()
            .map_err(|_| Error::protocol(format!("unparseable {:?} reply: '{}'", cmd, text)))
    }
}

impl DeviceSession for SerialSession {
    fn open(&mut self) -> Result<()> {
        self.port = None;

        let mut port = serialport::new(&self.config.port_name, self.config.baud)
            .timeout(Duration::from_millis(100))
            .open()?;
        port.write_request_to_send(false)?;
        // Let the bridge settle before the first command.
        std::thread::sleep(Duration::from_millis(100));

        let (response, _) = LinkOps::command(&mut port, Command::Ping)?;
        if response != Response::Ok {
            return Err(Error::protocol("device did not answer ping"));
        }

        tracing::debug!("session open on {}", self.config.port_name);
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::debug!("session closed");
        }
    }

    fn trigger_self_update(&mut self) {
        // Irreversible once sent; the device resets itself without
        // answering, so there is nothing to check here.
        if let Ok(port) = self.port() {
            LinkOps::command_no_response(port, Command::Update);
        }
    }

    fn firmware_version(&mut self) -> Result<u32> {
        self.query_u32(Command::Version)
    }

    fn flash_size(&mut self) -> Result<u32> {
        self.query_u32(Command::FlashSize)
    }

    fn self_test(&mut self) -> Result<bool> {
        let port = self.port()?;
        let (response, _) = LinkOps::command(port, Command::SelfTest)?;
        Ok(response == Response::Ok)
    }

    fn last_error(&mut self) -> String {
        let Ok(port) = self.port() else {
            return "(device not reachable)".to_string();
        };
        match LinkOps::command(port, Command::LastError) {
            Ok((Response::Ok, text)) => text,
            _ => "(device did not report an error)".to_string(),
        }
    }
}

impl FlashTransport for SerialSession {
    fn write(&mut self, data: &[u8], address: u32) -> Result<()> {
        let port = self.port()?;
        let (response, _) = LinkOps::command(
            port,
            Command::Write {
                address,
                len: data.len() as u32,
            },
        )?;
        if response != Response::Ok {
            return Err(Error::WriteFailure { address });
        }
        if LinkOps::send_data(port, data)? != Response::Ok {
            return Err(Error::WriteFailure { address });
        }
        Ok(())
    }

    fn erase_page(&mut self, address: u32) -> Result<()> {
        let port = self.port()?;
        let (response, _) = LinkOps::command(port, Command::ErasePage { address })?;
        if response != Response::Ok {
            return Err(Error::protocol(format!(
                "erase failed at 0x{:08X}",
                address
            )));
        }
        Ok(())
    }
}
