pub mod error;
pub mod image;
pub mod link;
pub mod loader;
pub mod progress;
pub mod session;
pub mod slot;
pub mod update;

pub use error::{Error, Result};
pub use image::{FirmwareImage, IMAGE_MAGIC, IMAGE_SIZE, MAX_PAYLOAD};
pub use loader::{LOADER_SCAN_BOUND, LOADER_SIGNATURE, LoaderInfo, detect_loader};
pub use slot::SLOT_SIZE;

/// Session with an FDSemu device: lifecycle, self-update trigger and
/// device-side queries. The serial implementation lives in [`session`];
/// tests substitute their own.
pub trait DeviceSession {
    /// Open (or reopen) the session. Blocking; a failed open leaves the
    /// session closed.
    fn open(&mut self) -> Result<()>;

    /// Close the session. Idempotent.
    fn close(&mut self);

    /// Tell the device to apply the firmware image staged in flash. The
    /// device resets itself; there is no failure return by contract and
    /// nothing can be read back on this link until it has rebooted.
    fn trigger_self_update(&mut self);

    /// Build number of the firmware currently running on the device.
    fn firmware_version(&mut self) -> Result<u32>;

    /// Total device flash size in bytes.
    fn flash_size(&mut self) -> Result<u32>;

    /// Run the device's built-in self test.
    fn self_test(&mut self) -> Result<bool>;

    /// Last error text recorded by the device, for failure reports.
    fn last_error(&mut self) -> String;
}

/// Raw byte-range flash primitives over the link. Both operations are
/// single blocking transfers with no internal retry; any error means the
/// flash was not (or not reliably) updated.
pub trait FlashTransport {
    fn write(&mut self, data: &[u8], address: u32) -> Result<()>;
    fn erase_page(&mut self, address: u32) -> Result<()>;
}
