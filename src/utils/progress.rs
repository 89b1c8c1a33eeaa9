use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const LEVEL_BAR_TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} levels";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";

/// Terminal progress for the CLI: a bar stepping across geography levels, or
/// a spinner for a single stage. A quiet reporter draws nothing and swallows
/// `println` output.
pub struct ProgressReporter {
    progress_bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// Bar over `levels` geography levels.
    pub fn levels(levels: usize, message: &str, quiet: bool) -> Self {
        let style = ProgressStyle::default_bar()
            .template(LEVEL_BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        Self::start(quiet, message, || ProgressBar::new(levels as u64), style)
    }

    pub fn spinner(message: &str, quiet: bool) -> Self {
        let style = ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        Self::start(quiet, message, ProgressBar::new_spinner, style)
    }

    fn start(
        quiet: bool,
        message: &str,
        make: impl FnOnce() -> ProgressBar,
        style: ProgressStyle,
    ) -> Self {
        if quiet {
            return Self { progress_bar: None };
        }

        let pb = make();
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self {
            progress_bar: Some(pb),
        }
    }

    pub fn advance(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
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

    /// Print above the bar so the line is not overdrawn.
    pub fn println(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.println(message);
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(ref pb) = self.progress_bar {
            if !pb.is_finished() {
                pb.finish();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_reporter_is_inert() {
        let progress = ProgressReporter::levels(3, "Aggregating", true);
        assert!(progress.progress_bar.is_none());
        progress.set_message("state");
        progress.advance();
        progress.println("not shown");
        progress.finish_with_message("done");
    }

    #[test]
    fn test_level_bar_counts_levels() {
        let progress = ProgressReporter::levels(2, "Aggregating", false);
        assert!(progress.progress_bar.is_some());
        progress.advance();
        progress.advance();
        if let Some(ref pb) = progress.progress_bar {
            assert_eq!(pb.position(), 2);
            assert_eq!(pb.length(), Some(2));
        }
        progress.finish_with_message("done");
    }
}
