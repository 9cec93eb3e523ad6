//! External process spawning and live line streaming
//!
//! One `LineReader` owns one OS process for its whole lifetime: it spawns
//! the tool with both output pipes captured, merges them into a single line
//! stream via a channel, enforces an optional deadline, and always reaps the
//! child, including when the caller bails out early.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Exit code used when the executable could not be located
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code standing in for a missing or signal-terminated status
pub const EXIT_ABNORMAL: i32 = 255;

/// An external tool invocation: program, ordered arguments, a display title
/// for the live UI, and a soft total (the nominal line count used as the
/// progress denominator). Immutable once built.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    title: String,
    soft_total: u64,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            title: program.clone(),
            program,
            args: Vec::new(),
            soft_total: 100,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_soft_total(mut self, soft_total: u64) -> Self {
        self.soft_total = soft_total.max(1);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn soft_total(&self) -> u64 {
        self.soft_total
    }

    /// Full argv as one line, for the durable log
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Outcome of one external command run. Immutable after creation.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Verbatim OS exit code, 127 when the command was not found, 255 when
    /// the real code was missing or negative
    pub exit_code: i32,
    /// Captured lines (stdout and stderr merged) joined with newlines
    pub output: String,
    /// The process was killed because it exceeded its deadline. Partial
    /// output up to that point is still in `output`.
    pub timed_out: bool,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    pub fn not_found(program: &str) -> Self {
        Self {
            exit_code: EXIT_NOT_FOUND,
            output: format!("Command not found: {program}"),
            timed_out: false,
        }
    }

    pub fn spawn_failed(message: &str) -> Self {
        Self {
            exit_code: EXIT_ABNORMAL,
            output: message.to_string(),
            timed_out: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    /// The executable could not be located. Callers surface this as exit
    /// code 127 and keep going.
    #[error("Command not found: {0}")]
    CommandNotFound(String),
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// What the caller got out of one poll tick
#[derive(Debug)]
pub enum LinePoll {
    /// A merged output line arrived
    Line(String),
    /// Nothing arrived within the wait; the process is still going (or its
    /// remaining output has not been flushed yet)
    Idle,
    /// Both pipes reached end of stream; call `finish`
    Finished,
}

/// Streams a spawned process's merged output as lines
pub struct LineReader {
    child: Child,
    rx: Receiver<String>,
    readers: Vec<JoinHandle<()>>,
    captured: Vec<String>,
    started: Instant,
    timeout: Option<Duration>,
    timed_out: bool,
    reaped: bool,
}

impl LineReader {
    /// Spawn the command with stdout and stderr piped. Each pipe gets its
    /// own reader thread feeding a shared channel, so the merged stream
    /// arrives in near-delivery order without blocking either pipe.
    pub fn spawn(cmd: &ExternalCommand, timeout: Option<Duration>) -> Result<Self, ExecError> {
        let mut child = Command::new(cmd.program())
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    ExecError::CommandNotFound(cmd.program().to_string())
                } else {
                    ExecError::Spawn {
                        program: cmd.program().to_string(),
                        source: err,
                    }
                }
            })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_pipe_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_pipe_reader(stderr, tx.clone()));
        }
        // The channel must disconnect once the pipes close.
        drop(tx);

        Ok(Self {
            child,
            rx,
            readers,
            captured: Vec::new(),
            started: Instant::now(),
            timeout,
            timed_out: false,
            reaped: false,
        })
    }

    /// Wait up to `wait` for the next line. This is the only suspension
    /// point in the pipeline; callers use the `Idle` returns as render
    /// ticks.
    ///
    /// When the deadline passes the child is killed, the lines already
    /// buffered are folded into the captured output and the stream ends
    /// immediately. Waiting for a real end-of-stream would be wrong here: a
    /// grandchild of the killed process can keep the pipe open arbitrarily
    /// long.
    pub fn poll(&mut self, wait: Duration) -> LinePoll {
        if let Some(limit) = self.timeout {
            if !self.timed_out && self.started.elapsed() >= limit {
                self.timed_out = true;
                let _ = self.child.kill();
                while let Ok(line) = self.rx.try_recv() {
                    self.captured.push(line);
                }
                return LinePoll::Finished;
            }
        }
        if self.timed_out {
            return LinePoll::Finished;
        }
        match self.rx.recv_timeout(wait) {
            Ok(line) => {
                self.captured.push(line.clone());
                LinePoll::Line(line)
            }
            Err(RecvTimeoutError::Timeout) => LinePoll::Idle,
            Err(RecvTimeoutError::Disconnected) => LinePoll::Finished,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Reap the child and assemble the result. Intended after `poll`
    /// returned `Finished`; a caller cancelling early gets the same
    /// treatment, with the child killed first so nothing is left running.
    pub fn finish(&mut self) -> ProcessResult {
        if let Ok(None) = self.child.try_wait() {
            // Early cancellation, or a tool that closed its pipes and kept
            // running. Either way the process must not outlive the reader.
            if !self.timed_out {
                let _ = self.child.kill();
            }
        }
        if self.timed_out {
            // The pipe threads may be blocked on a pipe a grandchild of the
            // killed process still holds open. They are left to exit with
            // it instead of being joined.
            self.readers.clear();
        } else {
            for handle in self.readers.drain(..) {
                let _ = handle.join();
            }
        }
        while let Ok(line) = self.rx.try_recv() {
            self.captured.push(line);
        }
        let exit_code = match self.child.wait() {
            Ok(status) => status.code().filter(|code| *code >= 0).unwrap_or(EXIT_ABNORMAL),
            Err(_) => EXIT_ABNORMAL,
        };
        self.reaped = true;
        ProcessResult {
            exit_code,
            output: self.captured.join("\n"),
            timed_out: self.timed_out,
        }
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn spawn_pipe_reader<R>(pipe: R, tx: Sender<String>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(pipe);
        for line in reader.lines() {
            match line {
                Ok(text) => {
                    if tx.send(text).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    })
}

/// Run a command to completion without live rendering, capturing merged
/// output. Used for quick probes (version checks, help output, driver
/// enumeration). A missing executable comes back as a 127 result rather
/// than an error.
pub fn run_capture(cmd: &ExternalCommand, timeout: Option<Duration>) -> ProcessResult {
    let mut reader = match LineReader::spawn(cmd, timeout) {
        Ok(reader) => reader,
        Err(ExecError::CommandNotFound(program)) => return ProcessResult::not_found(&program),
        Err(err @ ExecError::Spawn { .. }) => return ProcessResult::spawn_failed(&err.to_string()),
    };
    loop {
        if let LinePoll::Finished = reader.poll(Duration::from_millis(25)) {
            break;
        }
    }
    reader.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let cmd = ExternalCommand::new("winget")
            .args(["upgrade", "--include-unknown"])
            .with_title("Scanning apps")
            .with_soft_total(50);
        assert_eq!(cmd.program(), "winget");
        assert_eq!(cmd.title(), "Scanning apps");
        assert_eq!(cmd.soft_total(), 50);
        assert_eq!(cmd.display_line(), "winget upgrade --include-unknown");
    }

    #[test]
    fn test_soft_total_never_zero() {
        let cmd = ExternalCommand::new("true").with_soft_total(0);
        assert_eq!(cmd.soft_total(), 1);
    }

    #[test]
    fn test_command_not_found_is_127() {
        let cmd = ExternalCommand::new("definitely-not-a-real-binary-upkeep");
        let result = run_capture(&cmd, Some(Duration::from_secs(5)));
        assert_eq!(result.exit_code, EXIT_NOT_FOUND);
        assert!(!result.timed_out);
        assert!(result.output.contains("not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_lines_arrive_in_order() {
        let cmd = ExternalCommand::new("sh").args(["-c", "echo one; echo two; echo three"]);
        let result = run_capture(&cmd, Some(Duration::from_secs(10)));
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "one\ntwo\nthree");
    }

    #[cfg(unix)]
    #[test]
    fn test_stderr_is_merged() {
        let cmd = ExternalCommand::new("sh").args(["-c", "echo noise 1>&2"]);
        let result = run_capture(&cmd, Some(Duration::from_secs(10)));
        assert!(result.output.contains("noise"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_code_is_verbatim() {
        let cmd = ExternalCommand::new("sh").args(["-c", "exit 3"]);
        let result = run_capture(&cmd, Some(Duration::from_secs(10)));
        assert_eq!(result.exit_code, 3);
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_and_keeps_partial_output() {
        let cmd = ExternalCommand::new("sh").args(["-c", "echo early; sleep 30; echo late"]);
        let started = Instant::now();
        let result = run_capture(&cmd, Some(Duration::from_millis(300)));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(result.timed_out);
        assert!(result.output.contains("early"));
        assert!(!result.output.contains("late"));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_death_normalizes_to_sentinel() {
        let cmd = ExternalCommand::new("sh").args(["-c", "kill -9 $$"]);
        let result = run_capture(&cmd, Some(Duration::from_secs(10)));
        assert_eq!(result.exit_code, EXIT_ABNORMAL);
    }

    #[cfg(unix)]
    #[test]
    fn test_drop_reaps_running_child() {
        let cmd = ExternalCommand::new("sh").args(["-c", "sleep 30"]);
        let reader = LineReader::spawn(&cmd, None).unwrap();
        drop(reader);
        // Nothing to assert directly; the drop must neither hang nor leave
        // the child unreaped (which would trip process leak detectors).
    }
}
