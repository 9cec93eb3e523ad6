//! Render surfaces: where progress values and live log lines go
//!
//! The live engine never talks to the terminal directly; it hands full
//! snapshots (progress, title, rolling log) to a surface. The console
//! surface turns those into an indicatif bar with the log scrolling above
//! it, the null surface swallows everything in quiet mode, and tests use an
//! in-memory surface to assert on what would have been drawn.

use crate::progress;
use colored::Colorize;
use indicatif::ProgressBar;

pub trait RenderSurface {
    /// Called before any output arrives so feedback is immediate
    fn begin(&mut self, title: &str, start: f64);

    /// Full snapshot: progress in [0,100], phase title, rolling log contents.
    /// Called at least once per received line and on every idle tick, so it
    /// must stay cheap.
    fn render(&mut self, progress: f64, title: &str, log: &[String]);

    /// The operation is over; leave the terminal in a sane state
    fn finish(&mut self);
}

/// Live console rendering: one indicatif bar pinned at the bottom, fresh
/// log lines printed above it. The bar's steady tick keeps the elapsed-time
/// display moving from its own timer thread even when no snapshot arrives.
pub struct ConsoleSurface {
    bar: Option<ProgressBar>,
    last_log: Vec<String>,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self {
            bar: None,
            last_log: Vec::new(),
        }
    }
}

impl Default for ConsoleSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for ConsoleSurface {
    fn begin(&mut self, title: &str, start: f64) {
        // Sequential phases share one bar; only the first phase creates it.
        match &self.bar {
            Some(bar) => bar.set_message(title.to_string()),
            None => {
                let bar = progress::create_live_bar(title);
                bar.set_position(start.round() as u64);
                self.bar = Some(bar);
            }
        }
        self.last_log.clear();
    }

    fn render(&mut self, progress: f64, title: &str, log: &[String]) {
        let Some(bar) = &self.bar else {
            return;
        };
        for line in fresh_tail(&self.last_log, log) {
            bar.println(format!("  {}", line.dimmed()));
        }
        bar.set_position(progress.round() as u64);
        if bar.message() != title {
            bar.set_message(title.to_string());
        }
        self.last_log = log.to_vec();
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
        self.last_log.clear();
    }
}

/// Surface for quiet mode: accepts everything, draws nothing
pub struct NullSurface;

impl RenderSurface for NullSurface {
    fn begin(&mut self, _title: &str, _start: f64) {}
    fn render(&mut self, _progress: f64, _title: &str, _log: &[String]) {}
    fn finish(&mut self) {}
}

/// Lines in `now` that have not been printed yet. `now` is the previous
/// snapshot with zero or more lines appended at the back and zero or more
/// evicted from the front, so the largest old-tail/new-head overlap marks
/// where the fresh lines start.
fn fresh_tail<'a>(prev: &[String], now: &'a [String]) -> &'a [String] {
    let max_overlap = prev.len().min(now.len());
    for overlap in (0..=max_overlap).rev() {
        if prev[prev.len() - overlap..] == now[..overlap] {
            return &now[overlap..];
        }
    }
    now
}


#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fresh_tail_plain_append() {
        let prev = lines(&["a", "b"]);
        let now = lines(&["a", "b", "c"]);
        assert_eq!(fresh_tail(&prev, &now), &lines(&["c"])[..]);
    }

    #[test]
    fn test_fresh_tail_with_eviction() {
        let prev = lines(&["a", "b", "c"]);
        let now = lines(&["b", "c", "d"]);
        assert_eq!(fresh_tail(&prev, &now), &lines(&["d"])[..]);
    }

    #[test]
    fn test_fresh_tail_everything_new() {
        let prev = lines(&["a", "b"]);
        let now = lines(&["x", "y"]);
        assert_eq!(fresh_tail(&prev, &now), &now[..]);
    }

    #[test]
    fn test_fresh_tail_no_change() {
        let prev = lines(&["a", "b"]);
        let now = lines(&["a", "b"]);
        assert!(fresh_tail(&prev, &now).is_empty());
    }

    #[test]
    fn test_fresh_tail_from_empty() {
        let prev: Vec<String> = Vec::new();
        let now = lines(&["a"]);
        assert_eq!(fresh_tail(&prev, &now), &now[..]);
    }
}
