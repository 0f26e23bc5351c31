use indicatif::{ProgressBar, ProgressStyle};
use tvsrc::pipeline::ProgressReporter;

/// Renders pipeline progress as a terminal progress bar.
pub struct ConsoleReporter {
    bar: ProgressBar,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{spinner:.blue} [{bar:30.cyan/white}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }

    /// Clear the bar if the run ended without a final report.
    pub fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn report(&self, message: &str, percent: u8, done: bool) {
        self.bar.set_position(u64::from(percent.min(100)));
        if done {
            self.bar.finish_with_message(message.to_string());
        } else {
            self.bar.set_message(message.to_string());
        }
    }
}
