//! Progress bars for the profiling and hashing phases.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use sortwise_core::{Phase, ProgressEvent};

/// Draws one bar per [`Phase`], driven by [`ProgressEvent`]s.
///
/// A bar is created on the first event of its phase; an event from a
/// different phase clears the previous bar first.
pub struct PhaseProgress {
    quiet: bool,
    current: Option<(Phase, ProgressBar)>,
}

impl PhaseProgress {
    /// Create a reporter. A quiet reporter never draws anything.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            current: None,
        }
    }

    /// Move the bar of the event's phase.
    pub fn update(&mut self, event: &ProgressEvent) {
        if self.quiet {
            return;
        }
        if !matches!(&self.current, Some((phase, _)) if *phase == event.phase) {
            self.finish();
            self.current = Some((event.phase, phase_bar(event.phase)));
        }
        let Some((_, bar)) = &self.current else {
            return;
        };

        bar.set_length(event.total);
        bar.set_position(event.completed);
        if event.errors_count > 0 {
            bar.set_message(format!("{} error(s)", event.errors_count));
        }
    }

    /// Clear the active bar, if any.
    pub fn finish(&mut self) {
        if let Some((_, bar)) = self.current.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for PhaseProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

fn phase_style(phase: Phase) -> ProgressStyle {
    let template = match phase {
        Phase::Profiling => {
            "{prefix:>9} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} dirs {msg}"
        }
        Phase::Hashing => {
            "{prefix:>9} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} files \
             ({percent}%) {msg} (ETA: {eta})"
        }
    };
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
}

fn phase_bar(phase: Phase) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(phase_style(phase));
    bar.set_prefix(phase.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(phase: Phase, completed: u64, total: u64, errors_count: u64) -> ProgressEvent {
        ProgressEvent {
            phase,
            completed,
            total,
            current_path: None,
            errors_count,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_bar_follows_events() {
        let mut progress = PhaseProgress::new(false);
        progress.update(&event(Phase::Profiling, 1, 4, 0));
        progress.update(&event(Phase::Profiling, 3, 9, 2));

        let (phase, bar) = progress.current.as_ref().unwrap();
        assert_eq!(*phase, Phase::Profiling);
        assert_eq!(bar.length(), Some(9));
        assert_eq!(bar.position(), 3);
        assert_eq!(bar.message(), "2 error(s)");
    }

    #[test]
    fn test_new_phase_replaces_bar() {
        let mut progress = PhaseProgress::new(false);
        progress.update(&event(Phase::Profiling, 4, 4, 0));
        let (_, first) = progress.current.clone().unwrap();

        progress.update(&event(Phase::Hashing, 1, 10, 0));
        assert!(first.is_finished());
        let (phase, bar) = progress.current.as_ref().unwrap();
        assert_eq!(*phase, Phase::Hashing);
        assert_eq!(bar.length(), Some(10));

        progress.finish();
        assert!(progress.current.is_none());
    }

    #[test]
    fn test_quiet_draws_nothing() {
        let mut progress = PhaseProgress::new(true);
        progress.update(&event(Phase::Hashing, 1, 2, 0));
        assert!(progress.current.is_none());
    }
}
