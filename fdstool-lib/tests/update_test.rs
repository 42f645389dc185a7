mod common;

use common::MockDevice;
use fdstool_lib::image::{IMAGE_SIZE, MAX_PAYLOAD};
use fdstool_lib::progress::{
    ProgressCallback, ProgressHelper, ProgressId, ProgressInfo, ProgressType,
    no_op_progress_callback,
};
use fdstool_lib::update::{CancelToken, FirmwareUpdater, STAGING_ADDRESS, UpdateOptions};
use fdstool_lib::Error;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn progress() -> ProgressHelper {
    ProgressHelper::new(no_op_progress_callback())
}

fn zero_wait_options() -> UpdateOptions {
    UpdateOptions {
        recovery_wait: Duration::ZERO,
        cancel: CancelToken::new(),
    }
}

fn firmware_file(len: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let payload: Vec<u8> = (0..len).map(|i| (i % 255) as u8).collect();
    file.write_all(&payload).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn successful_update_runs_the_full_protocol() {
    let mut device = MockDevice::new();
    device.version = 801;
    let progress = progress();
    let file = firmware_file(100);

    let report = FirmwareUpdater::new(&mut device, &progress, zero_wait_options())
        .run(file.path())
        .unwrap();

    assert_eq!(report.payload_len, 100);
    assert_eq!(report.version, 801);

    // One full-image write to the staging area, then the trigger, then a
    // single reopen.
    assert_eq!(device.writes.len(), 1);
    let (address, data) = &device.writes[0];
    assert_eq!(*address, STAGING_ADDRESS);
    assert_eq!(data.len(), IMAGE_SIZE);
    assert_eq!(device.trigger_calls, 1);
    assert_eq!(device.open_calls, 1);
}

/// Records every bar the updater starts, as (total, incremented) pairs.
#[derive(Default)]
struct RecordingProgress {
    bars: Mutex<Vec<(u64, u64)>>,
}

impl ProgressCallback for RecordingProgress {
    fn start(&self, info: ProgressInfo) -> ProgressId {
        match info.progress_type {
            ProgressType::Bar { total } => {
                let mut bars = self.bars.lock().unwrap();
                bars.push((total, 0));
                ProgressId(bars.len() as u64)
            }
            ProgressType::Spinner => ProgressId(0),
        }
    }

    fn increment(&self, id: ProgressId, delta: u64) {
        if id.0 == 0 {
            return;
        }
        let mut bars = self.bars.lock().unwrap();
        if let Some((_, incremented)) = bars.get_mut(id.0 as usize - 1) {
            *incremented += delta;
        }
    }

    fn finish(&self, _id: ProgressId, _final_message: String) {}
}

#[test]
fn staging_write_is_reported_as_a_full_byte_bar() {
    let mut device = MockDevice::new();
    let recorder = Arc::new(RecordingProgress::default());
    let progress = ProgressHelper::new(recorder.clone());
    let file = firmware_file(100);

    FirmwareUpdater::new(&mut device, &progress, zero_wait_options())
        .run(file.path())
        .unwrap();

    let bars = recorder.bars.lock().unwrap();
    assert_eq!(bars.as_slice(), &[(IMAGE_SIZE as u64, IMAGE_SIZE as u64)]);
}

#[test]
fn missing_file_aborts_before_any_device_call() {
    let mut device = MockDevice::new();
    let progress = progress();

    let err = FirmwareUpdater::new(&mut device, &progress, zero_wait_options())
        .run("/nonexistent/firmware.bin".as_ref())
        .unwrap_err();

    assert!(matches!(err, Error::FileOpen { .. }));
    assert_eq!(device.write_attempts, 0);
    assert_eq!(device.trigger_calls, 0);
}

#[test]
fn oversized_firmware_aborts_before_any_device_call() {
    let mut device = MockDevice::new();
    let progress = progress();
    let file = firmware_file(MAX_PAYLOAD + 1);

    let err = FirmwareUpdater::new(&mut device, &progress, zero_wait_options())
        .run(file.path())
        .unwrap_err();

    assert!(matches!(err, Error::ImageTooLarge { .. }));
    assert_eq!(device.write_attempts, 0);
    assert_eq!(device.trigger_calls, 0);
}

#[test]
fn write_failure_never_triggers_the_update() {
    let mut device = MockDevice::new();
    device.fail_write = true;
    let progress = progress();
    let file = firmware_file(100);

    let err = FirmwareUpdater::new(&mut device, &progress, zero_wait_options())
        .run(file.path())
        .unwrap_err();

    assert!(matches!(err, Error::WriteFailure { .. }));
    assert_eq!(device.trigger_calls, 0);
    assert_eq!(device.open_calls, 0);
}

#[test]
fn failed_reacquire_is_device_unreachable() {
    let mut device = MockDevice::new();
    device.fail_open = true;
    let progress = progress();
    let file = firmware_file(100);

    let err = FirmwareUpdater::new(&mut device, &progress, zero_wait_options())
        .run(file.path())
        .unwrap_err();

    assert!(matches!(err, Error::DeviceUnreachable(_)));
    // The trigger went out and exactly one reopen was attempted.
    assert_eq!(device.trigger_calls, 1);
    assert_eq!(device.open_calls, 1);
}

#[test]
fn cancelled_recovery_wait_stops_before_the_reopen() {
    let mut device = MockDevice::new();
    let progress = progress();
    let file = firmware_file(100);

    let cancel = CancelToken::new();
    cancel.cancel();
    let options = UpdateOptions {
        recovery_wait: Duration::from_secs(60),
        cancel,
    };

    let err = FirmwareUpdater::new(&mut device, &progress, options)
        .run(file.path())
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(device.trigger_calls, 1);
    assert_eq!(device.open_calls, 0);
}
