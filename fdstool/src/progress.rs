//! Progress rendering for the CLI, on top of the library's callback seam.

use fdstool_lib::progress::{
    ProgressCallback, ProgressCallbackArc, ProgressId, ProgressInfo, ProgressType,
    no_op_progress_callback,
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// indicatif-backed renderer for interactive terminals.
pub struct IndicatifProgressCallback {
    multi_progress: MultiProgress,
    progress_bars: Mutex<HashMap<u64, ProgressBar>>,
    next_id: Mutex<u64>,
}

impl IndicatifProgressCallback {
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            progress_bars: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }
}

impl Default for IndicatifProgressCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for IndicatifProgressCallback {
    fn start(&self, info: ProgressInfo) -> ProgressId {
        let id = self.next_id();

        let bar = match info.progress_type {
            ProgressType::Spinner => {
                let spinner = self.multi_progress.add(ProgressBar::new_spinner());
                spinner.enable_steady_tick(Duration::from_millis(100));
                spinner.set_style(
                    ProgressStyle::with_template(&format!("[{}] {{spinner}} {{msg}}", info.prefix))
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner.set_message(info.message);
                spinner
            }
            ProgressType::Bar { total } => {
                let bar = self.multi_progress.add(ProgressBar::new(total));
                bar.set_style(
                    ProgressStyle::with_template(&format!(
                        "[{}] {{msg}} {{wide_bar}} {{bytes_per_sec}} {{percent_precise}}%",
                        info.prefix
                    ))
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
                );
                bar.set_message(info.message);
                bar
            }
        };

        self.progress_bars.lock().unwrap().insert(id, bar);
        ProgressId(id)
    }

    fn increment(&self, id: ProgressId, delta: u64) {
        if let Ok(bars) = self.progress_bars.lock()
            && let Some(bar) = bars.get(&id.0)
        {
            bar.inc(delta);
        }
    }

    fn finish(&self, id: ProgressId, final_message: String) {
        if let Ok(mut bars) = self.progress_bars.lock()
            && let Some(bar) = bars.remove(&id.0)
        {
            bar.finish_with_message(final_message);
        }
    }
}

/// Line-per-event renderer for piped output.
pub struct PlainProgressCallback;

impl PlainProgressCallback {
    fn print_line(line: &str) {
        let mut stdout = io::stdout();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }
}

impl ProgressCallback for PlainProgressCallback {
    fn start(&self, info: ProgressInfo) -> ProgressId {
        Self::print_line(&format!("[{}] {}", info.prefix, info.message));
        ProgressId(0)
    }

    fn increment(&self, _id: ProgressId, _delta: u64) {}

    fn finish(&self, _id: ProgressId, final_message: String) {
        Self::print_line(&final_message);
    }
}

pub fn create_progress_callback(quiet: bool) -> ProgressCallbackArc {
    if quiet {
        no_op_progress_callback()
    } else if io::stdout().is_terminal() {
        Arc::new(IndicatifProgressCallback::new())
    } else {
        Arc::new(PlainProgressCallback)
    }
}
