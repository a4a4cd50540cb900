//! Progress bar for commands that walk many packages.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use std::fmt::Write;
use std::time::Duration;

/// Package-count progress bar drawn on stderr.
///
/// Shows the package currently being resolved and an ETA. Clears itself
/// on drop so the listing that follows starts on a clean line.
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Creates a bar over `total` packages.
    #[must_use]
    pub fn new(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64);

        // Template: "Resolving [████████░░░░] 42/100 packages (12s) com.example"
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{bar:40.cyan/blue}] {pos}/{len} packages ({eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_duration(state.eta())).unwrap_or(());
                })
                .progress_chars("█▓░"),
        );
        bar.set_prefix(message.to_string());

        Self { bar }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show(suppressed: bool) -> bool {
        !suppressed && Term::stderr().is_term()
    }

    /// Marks `package` as the one being worked on.
    pub fn start(&self, package: &str) {
        self.bar.set_message(package.to_string());
    }

    /// Counts one package as done.
    pub fn finish_one(&self) {
        self.bar.inc(1);
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(Duration::from_secs(0)), "0s");
        assert_eq!(humanize_duration(Duration::from_secs(45)), "45s");
        assert_eq!(humanize_duration(Duration::from_secs(125)), "2m5s");
        assert_eq!(humanize_duration(Duration::from_secs(7260)), "2h1m");
    }

    #[test]
    fn test_counts_packages() {
        let progress = CliProgress::new(3, "Resolving");
        progress.start("com.example.a");
        progress.finish_one();
        progress.start("com.example.b");
        progress.finish_one();
        assert_eq!(progress.position(), 2);
    }

    #[test]
    fn test_suppressed_never_shows() {
        assert!(!CliProgress::should_show(true));
    }
}
