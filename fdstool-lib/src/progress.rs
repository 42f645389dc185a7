//! Progress callback seam.
//!
//! The library reports long-running operation progress through this trait
//! so that different frontends (CLI, tests) can render it their own way.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

#[derive(Debug, Clone)]
pub enum ProgressType {
    /// Indeterminate-duration operation.
    Spinner,
    /// Operation with a known total, in bytes.
    Bar { total: u64 },
}

#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub progress_type: ProgressType,
    /// Step prefix, a hex step number shared across one command.
    pub prefix: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressId(pub u64);

pub trait ProgressCallback: Send + Sync {
    fn start(&self, info: ProgressInfo) -> ProgressId;
    fn increment(&self, id: ProgressId, delta: u64);
    fn finish(&self, id: ProgressId, final_message: String);
}

/// Silent default, for tests and `--quiet`.
#[derive(Debug, Default)]
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn start(&self, _info: ProgressInfo) -> ProgressId {
        ProgressId(0)
    }

    fn increment(&self, _id: ProgressId, _delta: u64) {}

    fn finish(&self, _id: ProgressId, _final_message: String) {}
}

pub type ProgressCallbackArc = Arc<dyn ProgressCallback>;

pub fn no_op_progress_callback() -> ProgressCallbackArc {
    Arc::new(NoOpProgressCallback)
}

/// Hands out numbered spinners and bars over one shared callback.
pub struct ProgressHelper {
    callback: ProgressCallbackArc,
    step_counter: AtomicI32,
}

impl ProgressHelper {
    pub fn new(callback: ProgressCallbackArc) -> Self {
        Self {
            callback,
            step_counter: AtomicI32::new(0),
        }
    }

    fn next_prefix(&self) -> String {
        let step = self.step_counter.fetch_add(1, Ordering::SeqCst);
        format!("0x{:02X}", step)
    }

    pub fn create_spinner(&self, message: impl Into<String>) -> ProgressHandler<'_> {
        self.start(ProgressType::Spinner, message.into())
    }

    pub fn create_bar(&self, total: u64, message: impl Into<String>) -> ProgressHandler<'_> {
        self.start(ProgressType::Bar { total }, message.into())
    }

    fn start(&self, progress_type: ProgressType, message: String) -> ProgressHandler<'_> {
        let id = self.callback.start(ProgressInfo {
            progress_type,
            prefix: self.next_prefix(),
            message,
        });
        ProgressHandler { helper: self, id }
    }
}

pub struct ProgressHandler<'a> {
    helper: &'a ProgressHelper,
    id: ProgressId,
}

impl ProgressHandler<'_> {
    pub fn inc(&self, delta: u64) {
        self.helper.callback.increment(self.id, delta);
    }

    pub fn finish_with_message(self, message: impl Into<String>) {
        self.helper.callback.finish(self.id, message.into());
    }
}
