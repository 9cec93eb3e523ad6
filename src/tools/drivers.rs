//! pnputil integration: driver store enumeration, rollback and export

use crate::context::AppContext;
use crate::exec::{run_capture, ExternalCommand};
use crate::parser::{RowParser, ShapeHint};
use crate::rows::{DriverRow, ParsedRow, RowKind, UpdateRow};
use crate::session;
use crate::tools::windows_update;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Driver packages currently in the driver store
pub fn list_installed(ctx: &mut AppContext) -> Vec<DriverRow> {
    let cmd = ExternalCommand::new("pnputil").arg("/enum-drivers");
    let result = run_capture(&cmd, Some(Duration::from_secs(30)));
    if !result.success() {
        ctx.sink.append("[drivers] pnputil failed to enumerate drivers");
        return Vec::new();
    }
    parse_driver_blocks(&result.output)
        .into_iter()
        .filter_map(|row| row.as_driver().cloned())
        .collect()
}

/// Pending driver updates via the update module
pub fn scan_updates(ctx: &mut AppContext) -> Vec<UpdateRow> {
    windows_update::scan(ctx, true)
}

pub fn rollback(ctx: &mut AppContext, published_name: &str) {
    let cmd = ExternalCommand::new("pnputil")
        .args(["/delete-driver"])
        .arg(published_name)
        .args(["/uninstall", "/force"])
        .with_title(format!("Rollback {published_name}"))
        .with_soft_total(60);
    let parser = RowParser::new(RowKind::InstalledDriver, ShapeHint::ColumnTable);
    session::run_full(ctx, &cmd, parser, None);
}

pub fn export_all(ctx: &mut AppContext, target_dir: &Path) {
    let _ = fs::create_dir_all(target_dir);
    let cmd = ExternalCommand::new("pnputil")
        .args(["/export-driver", "*"])
        .arg(target_dir.display().to_string())
        .with_title(format!("Exporting drivers to {}", target_dir.display()))
        .with_soft_total(100);
    let parser = RowParser::new(RowKind::InstalledDriver, ShapeHint::ColumnTable);
    session::run_full(ctx, &cmd, parser, None);
}

/// pnputil reports one blank-line-separated block per driver package:
///
/// ```text
/// Published Name:     oem42.inf
/// Driver Package Provider:   Intel
/// Driver Date and Version:   01/01/2024 31.0.101.5122
/// ```
///
/// A block missing any of the four fields is skipped.
pub fn parse_driver_blocks(text: &str) -> Vec<ParsedRow> {
    let mut rows = Vec::new();
    for block in text.split("\n\n") {
        let mut published_name = None;
        let mut provider = None;
        let mut date = None;
        let mut version = None;
        for line in block.lines() {
            let lowered = line.to_lowercase();
            let value = || line.splitn(2, ':').nth(1).map(|v| v.trim().to_string());
            if lowered.starts_with("published name") {
                published_name = value();
            } else if lowered.starts_with("driver package provider") {
                provider = value();
            } else if lowered.starts_with("driver date and version") {
                if let Some(tail) = value() {
                    let mut parts = tail.split_whitespace();
                    date = parts.next().map(str::to_string);
                    let rest: Vec<&str> = parts.collect();
                    if !rest.is_empty() {
                        version = Some(rest.join(" "));
                    }
                }
            }
        }
        if let (Some(published_name), Some(provider), Some(version), Some(date)) =
            (published_name, provider, version, date)
        {
            rows.push(ParsedRow::InstalledDriver(DriverRow {
                published_name,
                provider,
                version,
                date,
            }));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Microsoft PnP Utility

Published Name:     oem42.inf
Original Name:      iigd_dch.inf
Driver Package Provider:   Intel Corporation
Class Name:         Display adapters
Driver Date and Version:   01/15/2024 31.0.101.5122
Signer Name:        Microsoft Windows

Published Name:     oem7.inf
Driver Package Provider:   Realtek
Driver Date and Version:   11/02/2023 6.0.9525.1

Published Name:     oem9.inf
Driver Package Provider:   Broken Vendor
";

    #[test]
    fn test_parse_driver_blocks() {
        let rows = parse_driver_blocks(SAMPLE);
        assert_eq!(rows.len(), 2);
        let first = rows[0].as_driver().unwrap();
        assert_eq!(first.published_name, "oem42.inf");
        assert_eq!(first.provider, "Intel Corporation");
        assert_eq!(first.date, "01/15/2024");
        assert_eq!(first.version, "31.0.101.5122");
        let second = rows[1].as_driver().unwrap();
        assert_eq!(second.published_name, "oem7.inf");
    }

    #[test]
    fn test_incomplete_block_is_skipped() {
        let rows = parse_driver_blocks("Published Name: oem1.inf\n");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_driver_blocks("").is_empty());
    }
}
