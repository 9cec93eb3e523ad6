//! First-run consent
//!
//! The console elevates, rewrites system state and drives package managers,
//! so the first interactive run asks for explicit agreement and records it
//! as a small JSON blob. Non-interactive runs (scripts, CI) auto-agree.

use crate::logsink::LogSink;
use crate::output::OutputMode;
use crate::theme::Theme;
use anyhow::Result;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

pub const CONSENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub version: u32,
    pub agreed_at: DateTime<Utc>,
}

pub fn consent_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "upkeep").map(|dirs| dirs.data_local_dir().join("consent.json"))
}

fn permissions_text(sink: &LogSink) -> String {
    format!(
        "This tool will:\n\
         \u{2022} Use the OS package manager to scan/update/uninstall apps you choose.\n\
         \u{2022} Use PowerShell modules (PSWindowsUpdate) for Windows/driver updates.\n\
         \u{2022} Clean junk (temp folders, caches, recycle bin).\n\
         \u{2022} Switch power plans and roll back driver packages on request.\n\
         \u{2022} Write logs to: {}",
        sink.path().display()
    )
}

fn is_granted() -> bool {
    consent_path().map(|path| path.exists()).unwrap_or(false)
}

fn record(path: &PathBuf) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let blob = ConsentRecord {
        version: CONSENT_VERSION,
        agreed_at: Utc::now(),
    };
    // best effort; asking again next run is fine
    if let Ok(json) = serde_json::to_string(&blob) {
        let _ = fs::write(path, json);
    }
}

/// Returns true when the user has agreed (now or previously). A declined
/// prompt returns false and the caller exits without doing anything.
pub fn ensure_consent(mode: OutputMode, sink: &LogSink) -> Result<bool> {
    if is_granted() {
        return Ok(true);
    }
    let Some(path) = consent_path() else {
        return Ok(true);
    };

    // Non-interactive environments auto-agree (scripts, CI).
    if !io::stdin().is_terminal() {
        record(&path);
        return Ok(true);
    }

    if mode != OutputMode::Quiet {
        println!("{}\n", Theme::header("=== Upkeep: Permissions Required ==="));
        println!("{}", permissions_text(sink));
    }
    print!("\nType AGREE to continue, or anything else to cancel: ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    if answer.trim().to_uppercase() != "AGREE" {
        println!("Cancelled by user.");
        return Ok(false);
    }
    record(&path);
    println!("Thanks. Proceeding…");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("consent.json");
        record(&path);
        let text = fs::read_to_string(&path).unwrap();
        let blob: ConsentRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(blob.version, CONSENT_VERSION);
    }

    #[test]
    fn test_permissions_text_names_log_file() {
        let sink = LogSink::at(PathBuf::from("/tmp/upkeep-test.log"));
        let text = permissions_text(&sink);
        assert!(text.contains("upkeep-test.log"));
    }
}
