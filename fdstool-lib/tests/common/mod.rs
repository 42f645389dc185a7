use fdstool_lib::{DeviceSession, Error, FlashTransport, Result};

/// In-memory stand-in for the serial session, recording every device
/// operation so tests can assert on call order and arguments.
#[derive(Default)]
pub struct MockDevice {
    pub writes: Vec<(u32, Vec<u8>)>,
    pub write_attempts: u32,
    pub erases: Vec<u32>,
    pub open_calls: u32,
    pub trigger_calls: u32,
    pub fail_write: bool,
    pub fail_open: bool,
    pub fail_erase_at: Option<u32>,
    pub version: u32,
    pub flash_size: u32,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            version: 792,
            flash_size: 0x80000,
            ..Default::default()
        }
    }
}

impl DeviceSession for MockDevice {
    fn open(&mut self) -> Result<()> {
        self.open_calls += 1;
        if self.fail_open {
            Err(Error::protocol("open refused"))
        } else {
            Ok(())
        }
    }

    fn close(&mut self) {}

    fn trigger_self_update(&mut self) {
        self.trigger_calls += 1;
    }

    fn firmware_version(&mut self) -> Result<u32> {
        Ok(self.version)
    }

    fn flash_size(&mut self) -> Result<u32> {
        Ok(self.flash_size)
    }

    fn self_test(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn last_error(&mut self) -> String {
        String::new()
    }
}

impl FlashTransport for MockDevice {
    fn write(&mut self, data: &[u8], address: u32) -> Result<()> {
        self.write_attempts += 1;
        if self.fail_write {
            return Err(Error::WriteFailure { address });
        }
        self.writes.push((address, data.to_vec()));
        Ok(())
    }

    fn erase_page(&mut self, address: u32) -> Result<()> {
        if self.fail_erase_at == Some(address) {
            return Err(Error::protocol("erase refused"));
        }
        self.erases.push(address);
        Ok(())
    }
}
