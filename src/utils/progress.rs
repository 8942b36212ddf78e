use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Observer for long-running crawl and sync passes.
///
/// Counters are monotonically increasing and 1-based; `on_complete` fires
/// once after the final record. Notifications are fire-and-forget, so every
/// method defaults to a no-op.
pub trait ProgressSink {
    fn on_progress(&self, _counter: u64) {}
    fn on_complete(&self) {}
}

/// Sink for callers that don't want notifications.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}

pub struct ProgressReporter {
    progress_bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new_spinner(message: &str, silent: bool) -> Self {
        if silent {
            Self { progress_bar: None }
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} {pos}")
                    .unwrap(),
            );
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));

            Self {
                progress_bar: Some(pb),
            }
        }
    }

    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    pub fn finish_with_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl ProgressSink for ProgressReporter {
    fn on_progress(&self, counter: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_position(counter);
        }
    }

    fn on_complete(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish();
        }
    }
}
