//! Phase-scoped progress tracking and indicatif bar constructors
//!
//! The wrapped tools report no real progress, so each phase owns a slice of
//! the overall 0-100 scale and advances a fixed estimated step per output
//! line. The estimate never has to be right: progress is clamped inside the
//! slice and snapped to its end when the phase closes.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A contiguous slice of the 0-100 progress scale owned by one phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseRange {
    start: f64,
    end: f64,
}

impl PhaseRange {
    /// Panics when the range is malformed. A backwards or out-of-scale
    /// range is a programmer error, not a runtime condition.
    pub fn new(start: f64, end: f64) -> Self {
        assert!(
            (0.0..=100.0).contains(&start) && (0.0..=100.0).contains(&end) && start <= end,
            "malformed phase range {start}..{end}"
        );
        Self { start, end }
    }

    /// The whole scale, for standalone single-phase runs
    pub fn full() -> Self {
        Self::new(0.0, 100.0)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

/// Maps an unbounded event stream onto one `PhaseRange`.
///
/// `advance` moves forward by a per-event step of `span / nominal_events`,
/// clamped to the range end; it never moves backwards. `complete` snaps to
/// the end unconditionally so a phase always visually finishes, however many
/// events actually arrived.
#[derive(Debug)]
pub struct PhaseTracker {
    range: PhaseRange,
    current: f64,
    step: f64,
}

impl PhaseTracker {
    pub fn new(range: PhaseRange, nominal_events: u64) -> Self {
        let step = range.span() / nominal_events.max(1) as f64;
        Self {
            range,
            current: range.start(),
            step,
        }
    }

    pub fn advance(&mut self, weight: u64) -> f64 {
        self.current = (self.current + self.step * weight as f64).min(self.range.end());
        self.current
    }

    pub fn complete(&mut self) -> f64 {
        self.current = self.range.end();
        self.current
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn range(&self) -> PhaseRange {
        self.range
    }
}

/// Create a spinner for indeterminate progress
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Create the live bar used while an external command streams output. The
/// steady tick keeps the spinner and elapsed time moving even when the
/// process is quiet.
pub fn create_live_bar(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {msg} [{elapsed_precise}]")
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Finish and clear a bar or spinner
pub fn finish_and_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic_and_clamped() {
        let mut tracker = PhaseTracker::new(PhaseRange::new(0.0, 40.0), 4);
        let mut last = tracker.current();
        for _ in 0..20 {
            let now = tracker.advance(1);
            assert!(now >= last);
            assert!(now <= 40.0);
            last = now;
        }
        assert_eq!(tracker.current(), 40.0);
    }

    #[test]
    fn test_complete_snaps_to_end_with_few_events() {
        let mut tracker = PhaseTracker::new(PhaseRange::new(40.0, 80.0), 50);
        tracker.advance(1);
        tracker.advance(1);
        assert!(tracker.current() < 80.0);
        assert_eq!(tracker.complete(), 80.0);
    }

    #[test]
    fn test_complete_without_events() {
        let mut tracker = PhaseTracker::new(PhaseRange::new(80.0, 100.0), 10);
        assert_eq!(tracker.current(), 80.0);
        assert_eq!(tracker.complete(), 100.0);
    }

    #[test]
    fn test_weighted_advance() {
        let mut tracker = PhaseTracker::new(PhaseRange::new(0.0, 100.0), 10);
        tracker.advance(5);
        assert_eq!(tracker.current(), 50.0);
    }

    #[test]
    fn test_zero_nominal_is_safe() {
        let mut tracker = PhaseTracker::new(PhaseRange::new(0.0, 10.0), 0);
        tracker.advance(1);
        assert_eq!(tracker.current(), 10.0);
    }

    #[test]
    fn test_empty_range_is_valid() {
        let mut tracker = PhaseTracker::new(PhaseRange::new(30.0, 30.0), 5);
        tracker.advance(3);
        assert_eq!(tracker.complete(), 30.0);
    }

    #[test]
    #[should_panic(expected = "malformed phase range")]
    fn test_backwards_range_panics() {
        PhaseRange::new(50.0, 40.0);
    }

    #[test]
    #[should_panic(expected = "malformed phase range")]
    fn test_out_of_scale_range_panics() {
        PhaseRange::new(0.0, 150.0);
    }
}
