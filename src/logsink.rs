//! Append-only durable log
//!
//! Every external command run and notable event gets a timestamped line
//! here, so there is history beyond the in-memory rolling log. Writes are
//! best-effort: a full disk or locked file must never take the console down.

use chrono::Local;
use directories::ProjectDirs;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    /// Sink in the platform data directory, falling back to the system temp
    /// dir when that cannot be created.
    pub fn open_default() -> Self {
        let dir = ProjectDirs::from("", "", "upkeep")
            .map(|dirs| dirs.data_local_dir().to_path_buf())
            .filter(|dir| fs::create_dir_all(dir).is_ok())
            .unwrap_or_else(std::env::temp_dir);
        Self {
            path: dir.join("upkeep.log"),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line. Failures are swallowed.
    pub fn append(&self, msg: &str) {
        let line = format!("{} | {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
        let _ = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
    }

    /// Last `n` lines of the log, empty string if it cannot be read.
    pub fn tail(&self, n: usize) -> String {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let lines: Vec<&str> = text.lines().collect();
                let start = lines.len().saturating_sub(n);
                lines[start..].join("\n")
            }
            Err(_) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_tail() {
        let dir = TempDir::new().unwrap();
        let sink = LogSink::at(dir.path().join("upkeep.log"));
        sink.append("first");
        sink.append("second");
        sink.append("third");

        let tail = sink.tail(2);
        assert!(!tail.contains("first"));
        assert!(tail.contains("second"));
        assert!(tail.contains("third"));
    }

    #[test]
    fn test_lines_are_timestamped() {
        let dir = TempDir::new().unwrap();
        let sink = LogSink::at(dir.path().join("upkeep.log"));
        sink.append("hello");
        let tail = sink.tail(1);
        assert!(tail.contains(" | hello"));
    }

    #[test]
    fn test_tail_of_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let sink = LogSink::at(dir.path().join("nope.log"));
        assert_eq!(sink.tail(10), "");
    }

    #[test]
    fn test_append_to_unwritable_path_is_swallowed() {
        let sink = LogSink::at(PathBuf::from("/definitely/not/a/real/dir/upkeep.log"));
        sink.append("dropped on the floor");
    }
}
