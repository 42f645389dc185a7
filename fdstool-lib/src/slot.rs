use crate::loader::{LoaderInfo, detect_loader};
use crate::progress::ProgressHelper;
use crate::{DeviceSession, Error, FlashTransport, Result};

/// Size of one flash slot. Slot 0 holds the loader; firmware and disk
/// images live in the slots above it.
pub const SLOT_SIZE: u32 = 0x10000;

/// Policy layer in front of the raw erase/write primitives: slot 0 is the
/// loader and only reachable through the validated loader-write path.
pub struct SlotGuard<'a, D: DeviceSession + FlashTransport> {
    device: &'a mut D,
    progress: &'a ProgressHelper,
}

impl<'a, D: DeviceSession + FlashTransport> SlotGuard<'a, D> {
    pub fn new(device: &'a mut D, progress: &'a ProgressHelper) -> Self {
        Self { device, progress }
    }

    /// Write a loader image into slot 0. Refuses with
    /// [`Error::NotALoaderImage`] before touching the device unless the
    /// candidate carries the loader signature.
    pub fn write_loader(&mut self, candidate: &[u8]) -> Result<LoaderInfo> {
        let info = detect_loader(candidate).ok_or(Error::NotALoaderImage)?;
        tracing::info!("valid loader image found, version {}", info);

        let spinner = self
            .progress
            .create_spinner(format!("Writing loader {} to slot 0 ...", info));
        self.write_slot(0, candidate)?;
        spinner.finish_with_message("Loader written");
        Ok(info)
    }

    /// Generic write-image-to-slot operation.
    fn write_slot(&mut self, slot: u32, data: &[u8]) -> Result<()> {
        self.device.write(data, SLOT_SIZE * slot)
    }

    /// Erase one slot. Slot 0 is refused unconditionally with
    /// [`Error::SlotProtected`]; the erase primitive is never invoked for
    /// it through this path.
    pub fn erase_slot(&mut self, slot: u32) -> Result<()> {
        if slot == 0 {
            return Err(Error::SlotProtected { slot });
        }

        let spinner = self
            .progress
            .create_spinner(format!("Erasing slot {} ...", slot));
        self.device.erase_page(SLOT_SIZE * slot)?;
        spinner.finish_with_message(format!("Slot {} erased", slot));
        Ok(())
    }

    /// Erase every slot across the whole flash, slot 0 included. Keeps
    /// going past individual failures and reports the first failing
    /// address at the end.
    ///
    /// TODO: confirm with the loader maintainers whether slot 0 should be
    /// skipped here the way `erase_slot` refuses it; the device has
    /// always erased it on full wipes.
    pub fn erase_all(&mut self) -> Result<()> {
        let flash_size = self.device.flash_size()?;

        let spinner = self
            .progress
            .create_spinner(format!("Erasing all slots ({} bytes) ...", flash_size));

        let mut first_failure = None;
        let mut address = 0u32;
        while address < flash_size {
            if let Err(err) = self.device.erase_page(address) {
                tracing::warn!("erase failed at 0x{:08X}: {}", address, err);
                first_failure.get_or_insert((address, err));
            }
            // A flash size near the top of the address space must not
            // wrap the sweep back to zero.
            match address.checked_add(SLOT_SIZE) {
                Some(next) => address = next,
                None => break,
            }
        }

        match first_failure {
            None => {
                spinner.finish_with_message("Flash erased");
                Ok(())
            }
            Some((address, _)) => {
                spinner.finish_with_message("Erase incomplete");
                Err(Error::protocol(format!(
                    "erase failed starting at 0x{:08X}",
                    address
                )))
            }
        }
    }
}
