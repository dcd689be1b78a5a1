//! Terminal progress bars for running transfers.

use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use modelfetch::transfer::{EntryId, EntryKind, TransferObserver, TransferOutcome};
use tracing_subscriber::fmt::MakeWriter;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {prefix:.bold} {wide_msg}";
const BAR_TEMPLATE: &str =
    "{spinner:.cyan} {prefix:.bold} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const TICK: Duration = Duration::from_millis(120);

/// One bar per active entry, drawn on stderr.
///
/// Entries start as spinners and switch to a byte bar once the server
/// reports a length. Finished entries leave a single status line above the
/// remaining bars.
pub struct ProgressObserver {
    multi: MultiProgress,
    bars: Mutex<HashMap<EntryId, ProgressBar>>,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Observer that draws nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(HashMap::new()),
        }
    }

    /// Log writer that clears the bars around each log line.
    pub fn log_writer(&self) -> LogWriter {
        LogWriter {
            multi: self.multi.clone(),
        }
    }

    fn bar(&self, id: EntryId) -> Option<ProgressBar> {
        self.bars.lock().ok()?.get(&id).cloned()
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

/// `MakeWriter` for the stderr log layer.
///
/// Each event is buffered and written in one piece while the bars are
/// suspended, so log lines land above the bars instead of through them.
#[derive(Clone)]
pub struct LogWriter {
    multi: MultiProgress,
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogLine;

    fn make_writer(&'a self) -> Self::Writer {
        LogLine {
            multi: self.multi.clone(),
            buffer: Vec::new(),
        }
    }
}

/// One buffered log event; written to stderr on drop.
pub struct LogLine {
    multi: MultiProgress,
    buffer: Vec<u8>,
}

impl Write for LogLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogLine {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let line = mem::take(&mut self.buffer);
        self.multi.suspend(|| {
            let _ = io::stderr().write_all(&line);
        });
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn prefix(id: EntryId, name: &str) -> String {
    match id.kind {
        EntryKind::Model => name.to_string(),
        EntryKind::Node => format!("{} (node)", name),
    }
}

impl TransferObserver for ProgressObserver {
    fn on_start(&self, id: EntryId, name: &str) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_prefix(prefix(id, name));
        bar.set_message(match id.kind {
            EntryKind::Model => "connecting",
            EntryKind::Node => "cloning",
        });
        bar.enable_steady_tick(TICK);

        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(id, bar);
        }
    }

    fn on_progress(&self, id: EntryId, bytes: u64, total: Option<u64>) {
        let Some(bar) = self.bar(id) else {
            return;
        };

        match total {
            Some(total) if bar.length() != Some(total) => {
                bar.set_length(total);
                bar.set_style(bar_style());
            }
            None => bar.set_message(indicatif::HumanBytes(bytes).to_string()),
            _ => {}
        }
        bar.set_position(bytes);
    }

    fn on_message(&self, id: EntryId, message: &str) {
        if let Some(bar) = self.bar(id) {
            let _ = self
                .multi
                .println(format!("{} {}: {}", style("!").yellow(), bar.prefix(), message));
        }
    }

    fn on_finish(&self, id: EntryId, outcome: &TransferOutcome) {
        let bar = match self.bars.lock() {
            Ok(mut bars) => bars.remove(&id),
            Err(_) => None,
        };
        let Some(bar) = bar else {
            return;
        };

        let mark = if outcome.is_success() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        let _ = self
            .multi
            .println(format!("{} {}: {}", mark, bar.prefix(), outcome));
        bar.finish_and_clear();
        self.multi.remove(&bar);
    }
}
