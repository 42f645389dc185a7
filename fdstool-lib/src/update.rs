use crate::image::{FirmwareImage, IMAGE_SIZE};
use crate::progress::ProgressHelper;
use crate::{DeviceSession, Error, FlashTransport, Result};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Flash address the firmware image is staged at; the loader picks it up
/// from there when the self-update trigger fires.
pub const STAGING_ADDRESS: u32 = IMAGE_SIZE as u32;

/// Default recovery window: self-reprogramming plus reboot time.
pub const DEFAULT_RECOVERY_WAIT: Duration = Duration::from_millis(5000);

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag that aborts the recovery wait from another thread (for
/// example a Ctrl-C handler). Cancellation does not undo the update; it
/// only stops the host from waiting for the device to come back.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct UpdateOptions {
    /// How long to wait after the apply trigger before the single reopen
    /// attempt.
    pub recovery_wait: Duration,
    pub cancel: CancelToken,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            recovery_wait: DEFAULT_RECOVERY_WAIT,
            cancel: CancelToken::new(),
        }
    }
}

/// Outcome of a successful firmware update, for the operator report.
#[derive(Debug, Clone, Copy)]
pub struct UpdateReport {
    pub payload_len: usize,
    pub checksum: u32,
    /// Build number the device reported after reacquire. Advisory; there
    /// is no comparison against an expected value and no rollback.
    pub version: u32,
}

/// Sequences the firmware self-update protocol. Strictly sequential and
/// terminal on first failure: load, build, write to the staging area,
/// trigger, recovery wait, one reopen, version report.
///
/// Failures before the trigger leave the device untouched and still
/// running its old firmware. After the trigger the operation cannot be
/// aborted; a failed reopen ([`Error::DeviceUnreachable`]) or a cancelled
/// wait ([`Error::Cancelled`]) leaves the actual outcome unknown to the
/// host.
pub struct FirmwareUpdater<'a, D: DeviceSession + FlashTransport> {
    device: &'a mut D,
    progress: &'a ProgressHelper,
    options: UpdateOptions,
}

impl<'a, D: DeviceSession + FlashTransport> FirmwareUpdater<'a, D> {
    pub fn new(device: &'a mut D, progress: &'a ProgressHelper, options: UpdateOptions) -> Self {
        Self {
            device,
            progress,
            options,
        }
    }

    pub fn run(&mut self, path: &Path) -> Result<UpdateReport> {
        let payload = std::fs::read(path).map_err(|source| Error::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let image = FirmwareImage::build(&payload)?;

        tracing::info!(
            "firmware is {} bytes, checksum 0x{:08X}",
            image.payload_len(),
            image.checksum()
        );

        // The transport moves the image in one blocking transfer, so the
        // bar fills when it returns.
        let bar = self.progress.create_bar(
            IMAGE_SIZE as u64,
            format!(
                "Uploading firmware ({} bytes, checksum 0x{:08X}) ...",
                image.payload_len(),
                image.checksum()
            ),
        );
        self.device.write(image.as_bytes(), STAGING_ADDRESS)?;
        bar.inc(IMAGE_SIZE as u64);
        bar.finish_with_message("Firmware uploaded");

        // Point of no return: the device resets itself to reprogram.
        self.device.trigger_self_update();

        let spinner = self
            .progress
            .create_spinner("Waiting for device to reboot ...");
        self.wait_for_recovery()?;

        if let Err(err) = self.device.open() {
            spinner.finish_with_message("Device did not come back");
            return Err(Error::DeviceUnreachable(err.to_string()));
        }
        spinner.finish_with_message("Device reacquired");

        let version = self.device.firmware_version()?;
        tracing::info!("updated to build {}", version);

        Ok(UpdateReport {
            payload_len: image.payload_len(),
            checksum: image.checksum(),
            version,
        })
    }

    /// Time-boxed, cancellable wait. By default this blocks for the full
    /// window; there is no polling of the device and no early exit when
    /// it comes back sooner.
    fn wait_for_recovery(&self) -> Result<()> {
        let deadline = Instant::now() + self.options.recovery_wait;
        loop {
            if self.options.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(CANCEL_POLL_INTERVAL.min(deadline - now));
        }
    }
}
