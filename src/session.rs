//! The live session: one external command under the live surface
//!
//! A session owns the rolling log, the phase tracker and the spawned
//! process for exactly one command. Lines are consumed from the reader's
//! channel with a short poll so the surface gets a frame at least every
//! tick, whether or not the process said anything.

use crate::context::AppContext;
use crate::exec::{ExecError, ExternalCommand, LinePoll, LineReader, ProcessResult};
use crate::parser::RowParser;
use crate::progress::{PhaseRange, PhaseTracker};
use crate::rows::ParsedRow;
use std::collections::VecDeque;
use std::time::Duration;

/// Cadence of the render loop; also bounds how stale the elapsed display
/// can get while waiting on a quiet process
const RENDER_TICK: Duration = Duration::from_millis(80);

/// How much captured output gets mirrored into the durable log per run
const SINK_OUTPUT_LIMIT: usize = 8000;

/// Fixed-capacity FIFO of recently displayed lines. Inserting beyond
/// capacity evicts the oldest entry; `len <= capacity` holds after every
/// mutation. Lifetime is one live session.
#[derive(Debug)]
pub struct RollingLog {
    buf: VecDeque<String>,
    capacity: usize,
}

impl RollingLog {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "rolling log capacity must be positive");
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(line.into());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current contents, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.buf.iter().cloned().collect()
    }
}

/// What one session run produced
#[derive(Debug)]
pub struct SessionOutput {
    pub result: ProcessResult,
    pub rows: Vec<ParsedRow>,
    /// Candidate rows the parser rejected; informational only
    pub dropped: usize,
}

/// Run one command live inside the given progress range.
///
/// The surface gets its first frame (range start, seeded log) before the
/// process is even spawned. Every received line is appended to the rolling
/// log, fed to the parser and counted as one progress event, blank
/// heartbeat lines included. A missing executable or a timeout degrades to
/// a flagged result, never to an error: the caller always gets whatever
/// rows and output were collected.
pub fn run(
    ctx: &mut AppContext,
    cmd: &ExternalCommand,
    parser: RowParser,
    range: PhaseRange,
    timeout: Option<Duration>,
    log_capacity: usize,
) -> SessionOutput {
    let title = cmd.title().to_string();
    let mut tracker = PhaseTracker::new(range, cmd.soft_total());
    let mut log = RollingLog::new(log_capacity);
    let mut parser = parser;

    // Seed the log with the title so the user immediately sees what is
    // being prepared.
    log.push(title.clone());
    ctx.render.begin(&title, range.start());
    ctx.render.render(tracker.current(), &title, &log.snapshot());

    let mut reader = match LineReader::spawn(cmd, timeout) {
        Ok(reader) => reader,
        Err(err) => {
            let msg = err.to_string();
            log.push(msg.clone());
            ctx.render.render(tracker.complete(), &title, &log.snapshot());
            ctx.sink
                .append(&format!("[run] {} -> {}", cmd.display_line(), msg));
            let result = match err {
                ExecError::CommandNotFound(program) => ProcessResult::not_found(&program),
                ExecError::Spawn { .. } => ProcessResult::spawn_failed(&msg),
            };
            return SessionOutput {
                result,
                rows: Vec::new(),
                dropped: 0,
            };
        }
    };

    loop {
        match reader.poll(RENDER_TICK) {
            LinePoll::Line(line) => {
                log.push(line.trim_end());
                parser.push_line(&line);
                tracker.advance(1);
                ctx.render.render(tracker.current(), &title, &log.snapshot());
            }
            LinePoll::Idle => {
                // Quiet process: re-render anyway so the surface never
                // looks frozen.
                ctx.render.render(tracker.current(), &title, &log.snapshot());
            }
            LinePoll::Finished => break,
        }
    }

    let result = reader.finish();
    if result.timed_out {
        log.push(format!("{title}: timed out, continuing with partial output."));
    }
    ctx.render.render(tracker.complete(), &title, &log.snapshot());

    let report = parser.finish();
    ctx.sink.append(&format!(
        "[run] {} -> rc={}{}",
        cmd.display_line(),
        result.exit_code,
        if result.timed_out { " (timed out)" } else { "" }
    ));
    if report.dropped > 0 {
        ctx.sink
            .append(&format!("[run] {title}: {} row(s) dropped", report.dropped));
    }
    if !result.output.trim().is_empty() {
        ctx.sink.append(truncate_chars(&result.output, SINK_OUTPUT_LIMIT));
    }

    SessionOutput {
        result,
        rows: report.rows,
        dropped: report.dropped,
    }
}

/// Standalone single-phase run across the whole 0-100 scale (upgrades,
/// uninstalls, exports). Closes the surface when the command ends.
pub fn run_full(
    ctx: &mut AppContext,
    cmd: &ExternalCommand,
    parser: RowParser,
    timeout: Option<Duration>,
) -> SessionOutput {
    let log_capacity = ctx.config.ui.log_lines;
    let output = run(ctx, cmd, parser, PhaseRange::full(), timeout, log_capacity);
    ctx.render.finish();
    output
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::EXIT_NOT_FOUND;
    use crate::parser::ShapeHint;
    use crate::render::memory::MemorySurface;
    use crate::rows::RowKind;

    fn test_context() -> (AppContext, std::rc::Rc<std::cell::RefCell<Vec<crate::render::memory::Frame>>>) {
        let surface = MemorySurface::new();
        let frames = surface.frames_handle();
        (AppContext::for_tests(Box::new(surface)), frames)
    }

    #[test]
    fn test_rolling_log_keeps_last_capacity_lines_in_order() {
        let mut log = RollingLog::new(3);
        for i in 0..10 {
            log.push(format!("line {i}"));
            assert!(log.len() <= log.capacity());
        }
        assert_eq!(log.snapshot(), vec!["line 7", "line 8", "line 9"]);
    }

    #[test]
    fn test_rolling_log_under_capacity() {
        let mut log = RollingLog::new(5);
        log.push("a");
        log.push("b");
        assert_eq!(log.snapshot(), vec!["a", "b"]);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_rolling_log_zero_capacity_panics() {
        RollingLog::new(0);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_command_not_found_yields_127_and_no_rows() {
        let (mut ctx, frames) = test_context();
        let cmd = ExternalCommand::new("definitely-not-a-real-binary-upkeep")
            .with_title("Missing tool");
        let parser = RowParser::new(RowKind::AppUpgrade, ShapeHint::ColumnTable);
        let out = run(
            &mut ctx,
            &cmd,
            parser,
            PhaseRange::full(),
            None,
            20,
        );
        assert_eq!(out.result.exit_code, EXIT_NOT_FOUND);
        assert!(out.rows.is_empty());
        // the failure is reported on the surface, not thrown
        let frames = frames.borrow();
        let last = frames.last().unwrap();
        assert_eq!(last.progress, 100.0);
        assert!(last.log.iter().any(|l| l.contains("not found")));
    }

    #[cfg(unix)]
    #[test]
    fn test_live_run_parses_rows_and_progress_is_monotonic() {
        let (mut ctx, frames) = test_context();
        let script = "echo 'Name  Id  Version  Available'; \
                      echo '----------------------------'; \
                      echo 'Foo   Foo.App   1.0   2.0'; \
                      echo 'Bar   Bar.App   2.0   2.5'";
        let cmd = ExternalCommand::new("sh")
            .args(["-c", script])
            .with_title("Scanning apps")
            .with_soft_total(50);
        let parser = RowParser::new(RowKind::AppUpgrade, ShapeHint::ColumnTable);
        let out = run(
            &mut ctx,
            &cmd,
            parser,
            PhaseRange::new(0.0, 40.0),
            Some(Duration::from_secs(20)),
            20,
        );
        assert_eq!(out.result.exit_code, 0);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].as_app().unwrap().id, "Foo.App");

        let frames = frames.borrow();
        assert!(frames.len() >= 2);
        // first frame appears before any output, at the range start
        assert_eq!(frames[0].progress, 0.0);
        assert_eq!(frames[0].title, "Scanning apps");
        let mut last = 0.0;
        for frame in frames.iter() {
            assert!(frame.progress >= last, "progress went backwards");
            assert!(frame.progress <= 40.0, "progress overshot the phase");
            last = frame.progress;
        }
        // the phase is snapped to its end on exit
        assert_eq!(frames.last().unwrap().progress, 40.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_rolling_log_capacity_is_respected_in_session() {
        let (mut ctx, frames) = test_context();
        let cmd = ExternalCommand::new("sh")
            .args(["-c", "for i in $(seq 1 30); do echo line $i; done"])
            .with_title("Chatty tool");
        let parser = RowParser::new(RowKind::AppUpgrade, ShapeHint::ColumnTable);
        let out = run(
            &mut ctx,
            &cmd,
            parser,
            PhaseRange::full(),
            Some(Duration::from_secs(20)),
            5,
        );
        assert_eq!(out.result.exit_code, 0);
        let frames = frames.borrow();
        for frame in frames.iter() {
            assert!(frame.log.len() <= 5);
        }
        let last = frames.last().unwrap();
        assert_eq!(last.log.last().unwrap(), "line 30");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_flag_and_partial_rows_survive() {
        let (mut ctx, _frames) = test_context();
        let script = "echo 'Name  Id  Version  Available'; \
                      echo '----------------------------'; \
                      echo 'Foo   Foo.App   1.0   2.0'; \
                      sleep 30";
        let cmd = ExternalCommand::new("sh")
            .args(["-c", script])
            .with_title("Hanging scan");
        let parser = RowParser::new(RowKind::AppUpgrade, ShapeHint::ColumnTable);
        let out = run(
            &mut ctx,
            &cmd,
            parser,
            PhaseRange::full(),
            Some(Duration::from_millis(400)),
            20,
        );
        assert!(out.result.timed_out);
        assert_eq!(out.rows.len(), 1);
        assert!(out.result.output.contains("Foo.App"));
    }

    #[cfg(unix)]
    #[test]
    fn test_blank_lines_still_advance_progress() {
        let (mut ctx, frames) = test_context();
        let cmd = ExternalCommand::new("sh")
            .args(["-c", "echo; echo; echo"])
            .with_title("Heartbeats")
            .with_soft_total(3);
        let parser = RowParser::new(RowKind::AppUpgrade, ShapeHint::ColumnTable);
        let out = run(
            &mut ctx,
            &cmd,
            parser,
            PhaseRange::new(0.0, 30.0),
            Some(Duration::from_secs(20)),
            20,
        );
        assert_eq!(out.result.exit_code, 0);
        let frames = frames.borrow();
        // three blank lines at soft total 3 walk the full phase span
        assert!(frames.iter().any(|f| f.progress > 0.0 && f.progress < 30.0));
        assert_eq!(frames.last().unwrap().progress, 30.0);
    }
}
